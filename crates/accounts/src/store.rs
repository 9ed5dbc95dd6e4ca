//! Database store for user accounts

use anyhow::{Context, Result};
use db::{Database, MAX_WRITE_ATTEMPTS};
use surrealdb::engine::any::Any;
use surrealdb::sql::{Datetime, Thing};
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{AccountError, CreateUserError};
use crate::models::{normalize_email, User};

const TABLE: &str = "user";

/// Default number of rows returned by a user search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Field named by a unique index violation on the user table
fn unique_conflict(err: &surrealdb::Error) -> Option<&'static str> {
    let message = err.to_string();
    if !message.contains("already contains") {
        return None;
    }
    if message.contains("user_username") {
        Some("username")
    } else if message.contains("user_email") {
        Some("email")
    } else {
        None
    }
}

/// Database store for users
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn client(&self) -> &Surreal<Any> {
        self.db.client()
    }

    /// Record link for a raw user id
    pub fn thing(id: &str) -> Thing {
        Thing::from((TABLE, id))
    }

    /// Insert a new user, refusing taken usernames and emails
    pub async fn create_user(&self, user: User) -> std::result::Result<User, CreateUserError> {
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(CreateUserError::Account(AccountError::Conflict("username")));
        }
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(CreateUserError::Account(AccountError::Conflict("email")));
        }

        // The unique indexes still catch a registration racing this one
        let created: Option<User> = match self.client().create(TABLE).content(user).await {
            Ok(created) => created,
            Err(e) => {
                return Err(match unique_conflict(&e) {
                    Some(field) => AccountError::Conflict(field).into(),
                    None => anyhow::Error::new(e).context("Failed to create user").into(),
                })
            }
        };

        let created = created.context("User creation returned no result")?;
        info!(
            "Registered user {} ({})",
            created.username,
            created.id_str().unwrap_or_default()
        );
        Ok(created)
    }

    /// Get a user by raw ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user: Option<User> = self
            .client()
            .select((TABLE, id))
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Look a user up by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };

        let mut response = self
            .client()
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email))
            .await
            .context("Failed to query user by email")?;

        let users: Vec<User> = response.take(0).context("Failed to parse users")?;
        Ok(users.into_iter().next())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut response = self
            .client()
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username.trim().to_string()))
            .await
            .context("Failed to query user by username")?;

        let users: Vec<User> = response.take(0).context("Failed to parse users")?;
        Ok(users.into_iter().next())
    }

    /// Persist a modified user if nobody saved it since it was loaded
    ///
    /// Returns `None` when the user is gone or its stored revision moved on.
    pub async fn save_user(&self, mut user: User) -> Result<Option<User>> {
        let id = user.id.clone().context("Cannot save a user without an id")?;
        let expected = user.revision;
        user.revision = expected.saturating_add(1);
        user.updated_at = Datetime::default();

        let updated = self
            .db
            .replace_if_revision(id, user, expected)
            .await
            .context("Failed to update user")?;

        if let Some(user) = &updated {
            debug!("Saved user {}", user.id_str().unwrap_or_default());
        }
        Ok(updated)
    }

    /// Apply `change` to the stored user and save it, starting over from a
    /// fresh copy when a concurrent write wins the race
    ///
    /// Returns `None` if the user does not exist. Errors from `change` abort
    /// without writing.
    pub async fn update_user<T, E, F>(
        &self,
        id: &str,
        mut change: F,
    ) -> std::result::Result<Option<(User, T)>, E>
    where
        F: FnMut(&mut User) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut user) = self.get_user(id).await? else {
                return Ok(None);
            };
            let output = change(&mut user)?;
            if let Some(saved) = self.save_user(user).await? {
                return Ok(Some((saved, output)));
            }
            debug!("User {} changed during update, retrying", id);
        }

        Err(anyhow::anyhow!("User {} kept changing during update", id).into())
    }

    /// Active users whose username or name contains `query`
    pub async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut users = self.list_active_users().await?;
        users.retain(|u| {
            u.username.to_lowercase().contains(&needle)
                || u.first_name.to_lowercase().contains(&needle)
                || u.last_name.to_lowercase().contains(&needle)
        });
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit);

        Ok(users)
    }

    /// Every user with `is_active` set
    pub async fn list_active_users(&self) -> Result<Vec<User>> {
        let mut response = self
            .client()
            .query("SELECT * FROM user WHERE is_active = true")
            .await
            .context("Failed to query users")?;

        let users: Vec<User> = response.take(0).context("Failed to parse users")?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    async fn store() -> Store {
        Store::new(Database::memory("questlog").await.unwrap())
    }

    fn new_user(username: &str, email: &str) -> User {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "password1".to_string(),
            first_name: "Test".to_string(),
            last_name: username.to_string(),
        }
        .into_user()
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = store().await;
        let created = store
            .create_user(new_user("grace", "grace@example.com"))
            .await
            .unwrap();
        let id = created.id_str().unwrap();

        let by_id = store.get_user(&id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "grace");

        let by_email = store.find_by_email("  GRACE@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(store.find_by_email("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let store = store().await;
        store
            .create_user(new_user("grace", "grace@example.com"))
            .await
            .unwrap();

        let dup_name = store.create_user(new_user("grace", "other@example.com")).await;
        assert!(matches!(
            dup_name,
            Err(CreateUserError::Account(AccountError::Conflict("username")))
        ));

        let dup_email = store.create_user(new_user("hopper", "grace@example.com")).await;
        assert!(matches!(
            dup_email,
            Err(CreateUserError::Account(AccountError::Conflict("email")))
        ));
    }

    #[tokio::test]
    async fn test_save_user_persists_changes() {
        let store = store().await;
        let mut user = store
            .create_user(new_user("linus", "linus@example.com"))
            .await
            .unwrap();

        user.gamification.add_experience(150);
        user.record_task_created();
        let saved = store.save_user(user).await.unwrap().unwrap();
        assert_eq!(saved.gamification.level, 2);

        let fetched = store.get_user(&saved.id_str().unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.gamification.experience, 150);
        assert_eq!(fetched.stats.total_tasks, 1);
    }

    #[tokio::test]
    async fn test_unique_index_conflict_maps_to_field() {
        let store = store().await;
        store
            .create_user(new_user("grace", "grace@example.com"))
            .await
            .unwrap();

        // Skip the lookups create_user does, as a concurrent request would
        let result: std::result::Result<Option<User>, surrealdb::Error> = store
            .client()
            .create(TABLE)
            .content(new_user("grace", "second@example.com"))
            .await;
        let err = result.err().expect("duplicate username must be refused");
        assert_eq!(unique_conflict(&err), Some("username"));

        let result: std::result::Result<Option<User>, surrealdb::Error> = store
            .client()
            .create(TABLE)
            .content(new_user("hopper", "grace@example.com"))
            .await;
        let err = result.err().expect("duplicate email must be refused");
        assert_eq!(unique_conflict(&err), Some("email"));
    }

    #[tokio::test]
    async fn test_stale_user_copy_is_not_saved() {
        let store = store().await;
        let user = store
            .create_user(new_user("ada", "ada@example.com"))
            .await
            .unwrap();
        let id = user.id_str().unwrap();

        let mut first = user.clone();
        first.gamification.add_experience(30);
        store.save_user(first).await.unwrap().unwrap();

        let mut second = user;
        second.gamification.add_experience(50);
        assert!(store.save_user(second).await.unwrap().is_none());

        let (saved, level_up) = store
            .update_user(&id, |user| Ok::<_, anyhow::Error>(user.gamification.add_experience(80)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.gamification.experience, 110);
        assert!(level_up.leveled_up);
        assert_eq!(saved.revision, 2);

        let missing = store
            .update_user("nobody", |_| Ok::<_, anyhow::Error>(()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_search_skips_inactive_users() {
        let store = store().await;
        store.create_user(new_user("margaret", "m@example.com")).await.unwrap();
        let mut retired = store
            .create_user(new_user("marvin", "marvin@example.com"))
            .await
            .unwrap();
        retired.is_active = false;
        store.save_user(retired).await.unwrap();
        store.create_user(new_user("ken", "ken@example.com")).await.unwrap();

        let found = store.search_users("MAR", DEFAULT_SEARCH_LIMIT).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["margaret"]);

        assert!(store.search_users("  ", DEFAULT_SEARCH_LIMIT).await.unwrap().is_empty());
    }
}
