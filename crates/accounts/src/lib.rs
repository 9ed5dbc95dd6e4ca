//! User accounts for Questlog
//!
//! Registration rules, password hashing, session tokens and the user store.

pub mod error;
pub mod models;
pub mod password;
pub mod store;
pub mod token;

pub use error::{AccountError, CreateUserError};
pub use models::{
    NewUser, NotificationPreferences, NotificationUpdate, Preferences, PreferencesUpdate,
    ProfileUpdate, Theme, User, UserStats,
};
pub use password::{hash_password, verify_password};
pub use store::{Store, DEFAULT_SEARCH_LIMIT};
pub use token::{Claims, TokenIssuer};
