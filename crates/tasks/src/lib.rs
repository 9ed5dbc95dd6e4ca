//! Task management for Questlog
//!
//! Task documents, the board rules that act on them (completion, time
//! tracking, progress, recurrence), list filtering and the task store.

pub mod error;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod stats;
pub mod store;

pub use error::TaskError;
pub use models::{
    normalize_tags, Assignee, AssigneeRole, Category, DependencyKind, Priority, RewardRecord,
    Subtask, Task, TaskDependency, TaskNote, TaskStatus, TimeEntry, MAX_TIME_ENTRY_MINUTES,
};
pub use query::{sort_tasks, SortKey, SortOrder, TaskFilter};
pub use recurrence::{Recurrence, RecurrencePattern};
pub use stats::{CategoryStats, TaskStats};
pub use store::Store;
