//! User documents and the requests that modify them

use gamification::Profile;
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::error::AccountError;
use crate::password::{hash_password, verify_password};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 30;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub sound: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sound: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            notifications: NotificationPreferences::default(),
            timezone: default_timezone(),
        }
    }
}

/// Running totals over a user's tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    /// Minutes tracked on completed tasks
    pub total_time_spent: u64,
    /// Mean minutes per completed task
    pub average_completion_time: u64,
    /// Completed tasks as a percentage of created ones
    pub productivity_score: u8,
}

impl UserStats {
    fn refresh_derived(&mut self) {
        self.average_completion_time = match self.completed_tasks {
            0 => 0,
            n => self.total_time_spent / u64::from(n),
        };
        self.productivity_score = match self.total_tasks {
            0 => 0,
            n => {
                let ratio = f64::from(self.completed_tasks) / f64::from(n);
                (ratio * 100.0).round().min(100.0) as u8
            }
        };
    }
}

/// A user document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (set by database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub gamification: Profile,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Bumped on every save; a write must match the revision it read
    #[serde(default)]
    pub revision: u64,
    pub last_login: Datetime,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Get the user ID as a string
    pub fn id_str(&self) -> Option<String> {
        self.id.as_ref().map(|t| t.id.to_raw())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// Replace the password after confirming the current one
    pub fn change_password(&mut self, current: &str, new: &str) -> Result<(), AccountError> {
        if !self.check_password(current) {
            return Err(AccountError::WrongPassword);
        }
        validate_password(new)?;
        self.password_hash = hash_password(new)?;
        Ok(())
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), AccountError> {
        if let Some(first_name) = update.first_name {
            self.first_name = required("first_name", &first_name)?;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = required("last_name", &last_name)?;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = avatar.trim().to_string();
        }
        Ok(())
    }

    pub fn set_preferences(&mut self, update: PreferencesUpdate) -> Result<(), AccountError> {
        if let Some(theme) = update.theme {
            self.preferences.theme = theme;
        }
        if let Some(timezone) = update.timezone {
            self.preferences.timezone = required("timezone", &timezone)?;
        }
        if let Some(notifications) = update.notifications {
            let current = &mut self.preferences.notifications;
            if let Some(email) = notifications.email {
                current.email = email;
            }
            if let Some(push) = notifications.push {
                current.push = push;
            }
            if let Some(sound) = notifications.sound {
                current.sound = sound;
            }
        }
        Ok(())
    }

    pub fn record_task_created(&mut self) {
        self.stats.total_tasks = self.stats.total_tasks.saturating_add(1);
        self.stats.refresh_derived();
    }

    /// Count a completed task and the minutes tracked on it
    pub fn record_task_completed(&mut self, actual_minutes: u32) {
        self.stats.completed_tasks = self.stats.completed_tasks.saturating_add(1);
        self.stats.total_time_spent = self
            .stats
            .total_time_spent
            .saturating_add(u64::from(actual_minutes));
        self.stats.refresh_derived();
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    /// Validate the request and build a user with a hashed password
    pub fn into_user(self) -> Result<User, AccountError> {
        let username = self.username.trim().to_string();
        validate_username(&username)?;
        let email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        let first_name = required("first_name", &self.first_name)?;
        let last_name = required("last_name", &self.last_name)?;

        let now = Datetime::default();
        Ok(User {
            id: None,
            username,
            email,
            password_hash: hash_password(&self.password)?,
            first_name,
            last_name,
            avatar: String::new(),
            preferences: Preferences::default(),
            gamification: Profile::default(),
            stats: UserStats::default(),
            is_active: true,
            revision: 0,
            last_login: now.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationUpdate {
    pub email: Option<bool>,
    pub push: Option<bool>,
    pub sound: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub notifications: Option<NotificationUpdate>,
    pub timezone: Option<String>,
}

fn required(field: &'static str, value: &str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::validation(field, "is required"));
    }
    Ok(value.to_string())
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AccountError::validation(
            "username",
            format!(
                "must be between {} and {} characters",
                MIN_USERNAME_LEN, MAX_USERNAME_LEN
            ),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AccountError::validation(
            "username",
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

/// Trim and lowercase an email, checking it has a local part and a domain
pub fn normalize_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(AccountError::validation("email", "is not a valid address")),
    }
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}
