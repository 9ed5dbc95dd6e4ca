//! Task list filtering and ordering

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::models::{Category, Priority, Task, TaskStatus};

/// Criteria for narrowing a task list
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    /// Case-insensitive substring matched against title, description and tags
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.category.is_some_and(|c| c != task.category) {
            return false;
        }
        match self.search_term() {
            Some(term) => matches_search(task, &term),
            None => true,
        }
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

fn matches_search(task: &Task, term: &str) -> bool {
    task.title.to_lowercase().contains(term)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(term))
        || task.tags.iter().any(|t| t.to_lowercase().contains(term))
}

/// Field a task list is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Title,
    Status,
}

impl std::str::FromStr for SortKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortKey::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortKey::UpdatedAt),
            "dueDate" | "due_date" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            "status" => Ok(SortKey::Status),
            _ => Err(TaskError::UnknownValue {
                field: "sort key",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(TaskError::UnknownValue {
                field: "sort order",
                value: s.to_string(),
            }),
        }
    }
}

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Todo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
        TaskStatus::Archived => 3,
    }
}

/// Sort tasks in place. The sort is stable, and tasks without a due date
/// always come last when sorting by due date.
pub fn sort_tasks(tasks: &mut [Task], key: SortKey, order: SortOrder) {
    let directed = |ordering: Ordering| match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };

    tasks.sort_by(|a, b| match key {
        SortKey::CreatedAt => directed(a.created_at.0.cmp(&b.created_at.0)),
        SortKey::UpdatedAt => directed(a.updated_at.0.cmp(&b.updated_at.0)),
        SortKey::Priority => directed(a.priority.rank().cmp(&b.priority.rank())),
        SortKey::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Status => directed(status_rank(a.status).cmp(&status_rank(b.status))),
        SortKey::DueDate => match (&a.due_date, &b.due_date) {
            (Some(x), Some(y)) => directed(x.0.cmp(&y.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    });
}
