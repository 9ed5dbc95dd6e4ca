//! Database store for tasks
//!
//! Tasks are stored as whole documents: time entries, subtasks, notes and
//! assignees live inside the task record.

use anyhow::{Context, Result};
use db::{Database, MAX_WRITE_ATTEMPTS};
use surrealdb::engine::any::Any;
use surrealdb::sql::{Datetime, Thing};
use surrealdb::Surreal;
use tracing::debug;

use crate::models::Task;
use crate::query::{sort_tasks, SortKey, SortOrder, TaskFilter};

const TABLE: &str = "task";

/// Database store for task management
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

    /// Create a new task
    pub async fn create_task(&self, task: Task) -> Result<Task> {
        let created: Option<Task> = self
            .client()
            .create(TABLE)
            .content(task)
            .await
            .context("Failed to create task")?;

        let created = created.context("Task creation returned no result")?;
        debug!("Created task {}", created.id_str().unwrap_or_default());
        Ok(created)
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task: Option<Task> = self
            .client()
            .select((TABLE, id))
            .await
            .context("Failed to get task")?;

        Ok(task)
    }

    /// List an owner's board, excluding archived tasks
    pub async fn list_tasks(
        &self,
        owner: &Thing,
        filter: &TaskFilter,
        sort: SortKey,
        order: SortOrder,
    ) -> Result<Vec<Task>> {
        let mut query = String::from("SELECT * FROM task WHERE created_by = $owner AND is_archived = false");

        if filter.status.is_some() {
            query.push_str(" AND status = $status");
        }
        if filter.priority.is_some() {
            query.push_str(" AND priority = $priority");
        }
        if filter.category.is_some() {
            query.push_str(" AND category = $category");
        }

        let mut stmt = self.client().query(&query).bind(("owner", owner.clone()));

        if let Some(s) = filter.status {
            stmt = stmt.bind(("status", s.to_string()));
        }
        if let Some(p) = filter.priority {
            stmt = stmt.bind(("priority", p.to_string()));
        }
        if let Some(c) = filter.category {
            stmt = stmt.bind(("category", c.to_string()));
        }

        let mut response = stmt.await.context("Failed to query tasks")?;
        let tasks: Vec<Task> = response.take(0).context("Failed to parse tasks")?;

        let mut tasks: Vec<Task> = tasks.into_iter().filter(|t| filter.matches(t)).collect();
        sort_tasks(&mut tasks, sort, order);

        Ok(tasks)
    }

    /// Every non-archived task created by `owner`
    pub async fn tasks_for_user(&self, owner: &Thing) -> Result<Vec<Task>> {
        self.list_tasks(owner, &TaskFilter::default(), SortKey::default(), SortOrder::default())
            .await
    }

    /// Tasks `user` created, is assigned to, or was rewarded for, archived
    /// ones included
    pub async fn tasks_involving(&self, user: &Thing) -> Result<Vec<Task>> {
        let mut response = self
            .client()
            .query(
                "SELECT * FROM task WHERE created_by = $user \
                 OR assignees.user_id CONTAINS $user \
                 OR reward.user_id = $user",
            )
            .bind(("user", user.clone()))
            .await
            .context("Failed to query tasks for user")?;

        let tasks: Vec<Task> = response.take(0).context("Failed to parse tasks")?;
        Ok(tasks)
    }

    /// Persist a modified task if nobody saved it since it was loaded
    ///
    /// Returns `None` when the task is gone or its stored revision moved on.
    pub async fn save_task(&self, mut task: Task) -> Result<Option<Task>> {
        let id = task.id.clone().context("Cannot save a task without an id")?;
        let expected = task.revision;
        task.revision = expected.saturating_add(1);
        task.updated_at = Datetime::default();

        self.db
            .replace_if_revision(id, task, expected)
            .await
            .context("Failed to update task")
    }

    /// Apply `change` to the stored task and save it, starting over from a
    /// fresh copy when a concurrent write wins the race
    ///
    /// Returns `None` if the task does not exist. Errors from `change` abort
    /// without writing.
    pub async fn update_task<T, E, F>(
        &self,
        id: &str,
        mut change: F,
    ) -> std::result::Result<Option<(Task, T)>, E>
    where
        F: FnMut(&mut Task) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut task) = self.get_task(id).await? else {
                return Ok(None);
            };
            let output = change(&mut task)?;
            if let Some(saved) = self.save_task(task).await? {
                return Ok(Some((saved, output)));
            }
            debug!("Task {} changed during update, retrying", id);
        }

        Err(anyhow::anyhow!("Task {} kept changing during update", id).into())
    }

    /// Delete a task
    pub async fn delete_task(&self, id: &str) -> Result<Option<Task>> {
        let deleted: Option<Task> = self
            .client()
            .delete((TABLE, id))
            .await
            .context("Failed to delete task")?;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignee, AssigneeRole, Priority, TaskStatus};
    use chrono::Utc;

    async fn store() -> Store {
        Store::new(Database::memory("questlog").await.unwrap())
    }

    fn alice() -> Thing {
        Thing::from(("user", "alice"))
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let store = store().await;
        let created = store
            .create_task(Task::new("Plan sprint", alice()).with_priority(Priority::High))
            .await
            .unwrap();

        let id = created.id_str().unwrap();
        let fetched = store.get_task(&id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Plan sprint");
        assert_eq!(fetched.priority, Priority::High);
        assert_eq!(fetched.created_by, alice());

        assert!(store.get_task("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_owner_status_and_archived() {
        let store = store().await;
        let bob = Thing::from(("user", "bob"));

        store.create_task(Task::new("alpha", alice())).await.unwrap();
        let mut doing = Task::new("beta", alice());
        doing.set_status(TaskStatus::InProgress, Utc::now()).unwrap();
        store.create_task(doing).await.unwrap();
        let mut archived = Task::new("gamma", alice());
        archived.archive(Utc::now());
        store.create_task(archived).await.unwrap();
        store.create_task(Task::new("delta", bob)).await.unwrap();

        let all = store.tasks_for_user(&alice()).await.unwrap();
        let mut titles: Vec<_> = all.iter().map(|t| t.title.clone()).collect();
        titles.sort();
        assert_eq!(titles, vec!["alpha", "beta"]);

        let filter = TaskFilter {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let doing = store
            .list_tasks(&alice(), &filter, SortKey::Title, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(doing.len(), 1);
        assert_eq!(doing[0].title, "beta");
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let store = store().await;
        let task = store.create_task(Task::new("Contested", alice())).await.unwrap();
        let id = task.id_str().unwrap();

        let mut first = task.clone();
        first.title = "First".to_string();
        let saved = store.save_task(first).await.unwrap().unwrap();
        assert_eq!(saved.revision, 1);

        let mut second = task;
        second.title = "Second".to_string();
        assert!(store.save_task(second).await.unwrap().is_none());

        let stored = store.get_task(&id).await.unwrap().unwrap();
        assert_eq!(stored.title, "First");
    }

    #[tokio::test]
    async fn test_update_task_sees_latest_copy() {
        let store = store().await;
        let task = store.create_task(Task::new("Counter", alice())).await.unwrap();
        let id = task.id_str().unwrap();

        // Another writer lands between our load and our save
        let mut other = store.get_task(&id).await.unwrap().unwrap();
        other.tags = vec!["theirs".to_string()];
        store.save_task(other).await.unwrap().unwrap();

        let (updated, previous_tags) = store
            .update_task(&id, |task| {
                let tags = task.tags.clone();
                task.tags.push("ours".to_string());
                Ok::<_, anyhow::Error>(tags)
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous_tags, vec!["theirs".to_string()]);
        assert_eq!(updated.tags, vec!["theirs".to_string(), "ours".to_string()]);
        assert_eq!(updated.revision, 2);

        let missing = store
            .update_task("missing", |_| Ok::<_, anyhow::Error>(()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_tasks_involving_assignees_and_rewarded_users() {
        let store = store().await;
        let bob = Thing::from(("user", "bob"));
        let carol = Thing::from(("user", "carol"));

        store
            .create_task(Task::new("shared", alice()).with_assignees(vec![
                Assignee::new(alice(), AssigneeRole::Owner),
                Assignee::new(bob.clone(), AssigneeRole::Assignee),
            ]))
            .await
            .unwrap();
        let mut finished = Task::new("finished", alice());
        finished.complete(&carol, Utc::now()).unwrap();
        finished.record_reward(&carol, 10, 5, Utc::now());
        store.create_task(finished).await.unwrap();

        let titles = |tasks: Vec<Task>| {
            let mut titles: Vec<_> = tasks.into_iter().map(|t| t.title).collect();
            titles.sort();
            titles
        };
        assert_eq!(titles(store.tasks_involving(&alice()).await.unwrap()), vec!["finished", "shared"]);
        assert_eq!(titles(store.tasks_involving(&bob).await.unwrap()), vec!["shared"]);
        assert_eq!(titles(store.tasks_involving(&carol).await.unwrap()), vec!["finished"]);
    }

    #[tokio::test]
    async fn test_save_and_delete_task() {
        let store = store().await;
        let mut task = store.create_task(Task::new("Edit me", alice())).await.unwrap();
        let id = task.id_str().unwrap();

        task.title = "Edited".to_string();
        let saved = store.save_task(task).await.unwrap().unwrap();
        assert_eq!(saved.title, "Edited");

        let deleted = store.delete_task(&id).await.unwrap();
        assert!(deleted.is_some());
        assert!(store.get_task(&id).await.unwrap().is_none());
    }
}
