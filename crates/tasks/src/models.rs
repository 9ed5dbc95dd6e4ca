//! Core task types and operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::error::TaskError;
use crate::recurrence::Recurrence;

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Longest single time entry accepted, one week in minutes
pub const MAX_TIME_ENTRY_MINUTES: u32 = 7 * 24 * 60;

/// Task status, one column per variant on the board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(alias = "in-progress")]
    InProgress,
    Done,
    Archived,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "archived" => Ok(TaskStatus::Archived),
            _ => Err(TaskError::UnknownValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Ordering rank, low = 0 through urgent = 3
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(TaskError::UnknownValue {
                field: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Task category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    Learning,
    Finance,
    #[default]
    Other,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 7] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Learning,
        Category::Finance,
        Category::Other,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Work => write!(f, "work"),
            Category::Personal => write!(f, "personal"),
            Category::Shopping => write!(f, "shopping"),
            Category::Health => write!(f, "health"),
            Category::Learning => write!(f, "learning"),
            Category::Finance => write!(f, "finance"),
            Category::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.to_string() == s.to_lowercase())
            .ok_or_else(|| TaskError::UnknownValue {
                field: "category",
                value: s.to_string(),
            })
    }
}

/// Role a user plays on a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeRole {
    Owner,
    #[default]
    Assignee,
    Watcher,
}

/// A user attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub user_id: Thing,
    #[serde(default)]
    pub role: AssigneeRole,
    pub assigned_at: Datetime,
}

impl Assignee {
    pub fn new(user_id: Thing, role: AssigneeRole) -> Self {
        Self {
            user_id,
            role,
            assigned_at: Datetime::default(),
        }
    }
}

/// Kind of link between two tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    #[default]
    Blocks,
    BlockedBy,
    Related,
}

/// A link from this task to another one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: Thing,
    #[serde(default)]
    pub relation: DependencyKind,
}

/// A tracked stretch of work on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub start_time: Datetime,
    pub end_time: Datetime,
    /// Duration in whole minutes
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A checklist item inside a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Datetime>,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            completed_at: None,
        }
    }
}

/// Who was rewarded for finishing a task, and with what
///
/// Set by the first completion and kept when the task is reopened, so a
/// task pays out at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub user_id: Thing,
    pub experience: u64,
    pub points: u64,
    pub granted_at: Datetime,
}

/// A comment left on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNote {
    pub content: String,
    pub author: Thing,
    pub created_at: Datetime,
}

/// A task document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (set by database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Datetime>,
    /// Estimated effort in minutes
    #[serde(default)]
    pub estimated_time: u32,
    /// Tracked effort in minutes, the sum of all time entries
    #[serde(default)]
    pub actual_time: u32,
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    /// Completion percentage, 0..=100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Datetime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<Thing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<RewardRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
    #[serde(default)]
    pub notes: Vec<TaskNote>,
    pub created_by: Thing,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Datetime>,
    /// Bumped on every save; a write must match the revision it read
    #[serde(default)]
    pub revision: u64,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl Task {
    /// Create a new task owned by `created_by`
    pub fn new(title: impl Into<String>, created_by: Thing) -> Self {
        let now = Datetime::default();
        Self {
            id: None,
            title: title.into().trim().to_string(),
            description: None,
            status: TaskStatus::default(),
            priority: Priority::default(),
            category: Category::default(),
            tags: Vec::new(),
            due_date: None,
            estimated_time: 0,
            actual_time: 0,
            time_entries: Vec::new(),
            dependencies: Vec::new(),
            assignees: vec![Assignee::new(created_by.clone(), AssigneeRole::Owner)],
            progress: 0,
            subtasks: Vec::new(),
            completed_at: None,
            completed_by: None,
            reward: None,
            recurring: None,
            notes: Vec::new(),
            created_by,
            is_archived: false,
            archived_at: None,
            revision: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into().trim().to_string();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_estimated_time(mut self, minutes: u32) -> Self {
        self.estimated_time = minutes;
        self
    }

    /// Replace the subtasks and recompute progress from them
    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self.calculate_progress();
        self
    }

    /// Replace the assignees; an empty list keeps the creator as owner
    pub fn with_assignees(mut self, assignees: Vec<Assignee>) -> Self {
        if !assignees.is_empty() {
            self.assignees = assignees;
        }
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurring = Some(recurrence);
        self
    }

    /// Get the task ID as a string
    pub fn id_str(&self) -> Option<String> {
        self.id.as_ref().map(|t| t.id.to_raw())
    }

    /// Check title and description limits
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.is_empty() {
            return Err(TaskError::Validation("title is required".to_string()));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(TaskError::Validation(format!(
                "title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(TaskError::Validation(format!(
                    "description must be at most {} characters",
                    MAX_DESCRIPTION_LEN
                )));
            }
        }
        if self.progress > 100 {
            return Err(TaskError::Validation(
                "progress must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }

    /// True when `user` created the task or is listed as an assignee
    pub fn has_access(&self, user: &Thing) -> bool {
        self.created_by == *user || self.assignees.iter().any(|a| a.user_id == *user)
    }

    pub fn is_owner(&self, user: &Thing) -> bool {
        self.created_by == *user
    }

    /// Sum of all time entry durations in minutes
    pub fn total_time_spent(&self) -> u32 {
        self.time_entries
            .iter()
            .fold(0u32, |total, e| total.saturating_add(e.duration))
    }

    /// Record a stretch of work and refresh `actual_time`
    pub fn add_time_entry(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<&TimeEntry, TaskError> {
        if end < start {
            return Err(TaskError::InvalidTimeRange);
        }

        let minutes = ((end - start).num_milliseconds() as f64 / 60_000.0).round();
        if minutes > f64::from(MAX_TIME_ENTRY_MINUTES) {
            return Err(TaskError::Validation(format!(
                "time entry must be at most {} minutes",
                MAX_TIME_ENTRY_MINUTES
            )));
        }
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        self.time_entries.push(TimeEntry {
            start_time: start.into(),
            end_time: end.into(),
            duration: minutes as u32,
            notes,
        });
        self.actual_time = self.total_time_spent();

        Ok(&self.time_entries[self.time_entries.len() - 1])
    }

    /// Mark the task done by `user`, completing every subtask
    pub fn complete(&mut self, user: &Thing, now: DateTime<Utc>) -> Result<(), TaskError> {
        if self.status == TaskStatus::Done {
            return Err(TaskError::AlreadyCompleted);
        }

        self.status = TaskStatus::Done;
        self.progress = 100;
        self.completed_at = Some(now.into());
        self.completed_by = Some(user.clone());

        for subtask in &mut self.subtasks {
            if !subtask.completed {
                subtask.completed = true;
                subtask.completed_at = Some(now.into());
            }
        }

        Ok(())
    }

    /// Remember that `user` earned a reward for this task
    ///
    /// Returns false, leaving the record untouched, when someone was already
    /// rewarded for an earlier completion.
    pub fn record_reward(
        &mut self,
        user: &Thing,
        experience: u64,
        points: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if self.reward.is_some() {
            return false;
        }
        self.reward = Some(RewardRecord {
            user_id: user.clone(),
            experience,
            points,
            granted_at: now.into(),
        });
        true
    }

    /// Derive progress from subtasks; a task without subtasks keeps its value
    pub fn calculate_progress(&mut self) -> u8 {
        if self.subtasks.is_empty() {
            return self.progress;
        }

        let completed = self.subtasks.iter().filter(|s| s.completed).count();
        let ratio = completed as f64 / self.subtasks.len() as f64;
        self.progress = (ratio * 100.0).round() as u8;
        self.progress
    }

    /// Move the task to another board column
    ///
    /// `Done` is rejected: completion goes through [`Task::complete`] so that
    /// rewards are granted exactly once.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) -> Result<(), TaskError> {
        match status {
            TaskStatus::Done => return Err(TaskError::CompletionRequired),
            TaskStatus::Archived => {
                self.archive(now);
                return Ok(());
            }
            TaskStatus::Todo | TaskStatus::InProgress => {
                if self.status == TaskStatus::Done {
                    self.completed_at = None;
                    self.completed_by = None;
                }
                self.is_archived = false;
                self.archived_at = None;
            }
        }
        self.status = status;
        Ok(())
    }

    /// Hide the task from the board
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Archived;
        self.is_archived = true;
        self.archived_at = Some(now.into());
    }

    /// Not done, has a due date, and that date has passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done
            && self.due_date.as_ref().is_some_and(|due| due.0 < now)
    }

    /// Append a comment by `author`
    pub fn add_note(
        &mut self,
        content: &str,
        author: Thing,
        now: DateTime<Utc>,
    ) -> Result<&TaskNote, TaskError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TaskError::Validation("note content is required".to_string()));
        }

        self.notes.push(TaskNote {
            content: content.to_string(),
            author,
            created_at: now.into(),
        });

        Ok(&self.notes[self.notes.len() - 1])
    }

    /// Build the next instance of a completed recurring task
    ///
    /// The schedule advances from the due date when one is set, otherwise from
    /// the completion time. Returns `None` for non-recurring or unfinished
    /// tasks, and once the recurrence has run past its end date.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<Task> {
        let recurrence = self.recurring.as_ref()?;
        if self.status != TaskStatus::Done {
            return None;
        }

        let base = self
            .due_date
            .as_ref()
            .or(self.completed_at.as_ref())
            .map(|d| d.0)
            .unwrap_or(now);
        let next_due = recurrence.next_due(base)?;

        let mut next = Task::new(self.title.clone(), self.created_by.clone())
            .with_priority(self.priority)
            .with_category(self.category)
            .with_tags(self.tags.clone())
            .with_estimated_time(self.estimated_time)
            .with_due_date(next_due)
            .with_assignees(self.assignees.clone())
            .with_recurrence(recurrence.clone());
        next.description = self.description.clone();
        next.subtasks = self
            .subtasks
            .iter()
            .map(|s| Subtask::new(s.title.clone()))
            .collect();
        next.created_at = now.into();
        next.updated_at = now.into();

        Some(next)
    }
}

/// Trim tags, drop empty ones and remove duplicates keeping first occurrence
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurrencePattern;
    use chrono::{Duration, TimeZone};

    fn user(id: &str) -> Thing {
        Thing::from(("user", id))
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("  Write report  ", user("alice"));
        assert_eq!(task.title, "Write report");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Other);
        assert_eq!(task.assignees.len(), 1);
        assert_eq!(task.assignees[0].role, AssigneeRole::Owner);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_validate_title_limits() {
        let task = Task::new("   ", user("alice"));
        assert!(matches!(task.validate(), Err(TaskError::Validation(_))));

        let task = Task::new("x".repeat(MAX_TITLE_LEN + 1), user("alice"));
        assert!(matches!(task.validate(), Err(TaskError::Validation(_))));

        let task = Task::new("ok", user("alice"))
            .with_description("d".repeat(MAX_DESCRIPTION_LEN + 1));
        assert!(matches!(task.validate(), Err(TaskError::Validation(_))));
    }

    #[test]
    fn test_access_for_creator_and_assignees() {
        let task = Task::new("Shared", user("alice")).with_assignees(vec![
            Assignee::new(user("alice"), AssigneeRole::Owner),
            Assignee::new(user("bob"), AssigneeRole::Assignee),
        ]);

        assert!(task.has_access(&user("alice")));
        assert!(task.has_access(&user("bob")));
        assert!(!task.has_access(&user("carol")));
        assert!(task.is_owner(&user("alice")));
        assert!(!task.is_owner(&user("bob")));
    }

    #[test]
    fn test_time_entries_accumulate() {
        let mut task = Task::new("Track me", user("alice"));

        let entry = task
            .add_time_entry(at(9, 0), at(9, 45), Some("  focus  ".to_string()))
            .unwrap();
        assert_eq!(entry.duration, 45);
        assert_eq!(entry.notes.as_deref(), Some("focus"));

        task.add_time_entry(at(10, 0), at(10, 20), None).unwrap();
        assert_eq!(task.actual_time, 65);
        assert_eq!(task.total_time_spent(), 65);
    }

    #[test]
    fn test_time_entry_rounds_to_nearest_minute() {
        let mut task = Task::new("Round", user("alice"));
        let start = at(9, 0);

        task.add_time_entry(start, start + Duration::seconds(89), None)
            .unwrap();
        task.add_time_entry(start, start + Duration::seconds(90), None)
            .unwrap();

        assert_eq!(task.time_entries[0].duration, 1);
        assert_eq!(task.time_entries[1].duration, 2);
    }

    #[test]
    fn test_time_entry_rejects_reversed_range() {
        let mut task = Task::new("Backwards", user("alice"));
        let result = task.add_time_entry(at(10, 0), at(9, 0), None);
        assert!(matches!(result, Err(TaskError::InvalidTimeRange)));
        assert!(task.time_entries.is_empty());
    }

    #[test]
    fn test_time_entry_rejects_oversized_range() {
        let mut task = Task::new("Forever", user("alice"));
        let start = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0).unwrap();

        let result = task.add_time_entry(start, end, None);
        assert!(matches!(result, Err(TaskError::Validation(_))));
        assert!(task.time_entries.is_empty());

        let week = Duration::minutes(i64::from(MAX_TIME_ENTRY_MINUTES));
        task.add_time_entry(at(9, 0), at(9, 0) + week, None).unwrap();
        assert_eq!(task.actual_time, MAX_TIME_ENTRY_MINUTES);
    }

    #[test]
    fn test_total_time_saturates() {
        let mut task = Task::new("Imported", user("alice"));
        for _ in 0..2 {
            task.time_entries.push(TimeEntry {
                start_time: at(9, 0).into(),
                end_time: at(10, 0).into(),
                duration: u32::MAX,
                notes: None,
            });
        }
        assert_eq!(task.total_time_spent(), u32::MAX);
    }

    #[test]
    fn test_reward_survives_reopening() {
        let mut task = Task::new("Once only", user("alice"));
        task.complete(&user("bob"), at(9, 0)).unwrap();
        assert!(task.record_reward(&user("bob"), 10, 5, at(9, 0)));

        task.set_status(TaskStatus::Todo, at(10, 0)).unwrap();
        task.complete(&user("alice"), at(11, 0)).unwrap();
        assert!(!task.record_reward(&user("alice"), 10, 5, at(11, 0)));

        let reward = task.reward.unwrap();
        assert_eq!(reward.user_id, user("bob"));
        assert_eq!(reward.granted_at.0, at(9, 0));
    }

    #[test]
    fn test_complete_marks_subtasks() {
        let mut task = Task::new("Ship", user("alice")).with_subtasks(vec![
            Subtask::new("build"),
            Subtask::new("deploy"),
        ]);

        task.complete(&user("bob"), at(12, 0)).unwrap();

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.progress, 100);
        assert_eq!(task.completed_by, Some(user("bob")));
        assert!(task.subtasks.iter().all(|s| s.completed && s.completed_at.is_some()));
    }

    #[test]
    fn test_complete_twice_is_rejected() {
        let mut task = Task::new("Once", user("alice"));
        task.complete(&user("alice"), at(12, 0)).unwrap();
        assert!(matches!(
            task.complete(&user("alice"), at(13, 0)),
            Err(TaskError::AlreadyCompleted)
        ));
    }

    #[test]
    fn test_progress_from_subtasks() {
        let mut task = Task::new("Steps", user("alice"));
        task.progress = 40;
        assert_eq!(task.calculate_progress(), 40);

        task.subtasks = vec![
            Subtask {
                completed: true,
                ..Subtask::new("a")
            },
            Subtask::new("b"),
            Subtask::new("c"),
        ];
        assert_eq!(task.calculate_progress(), 33);

        task.subtasks[1].completed = true;
        assert_eq!(task.calculate_progress(), 67);
    }

    #[test]
    fn test_set_status_transitions() {
        let mut task = Task::new("Move", user("alice"));

        task.set_status(TaskStatus::InProgress, at(9, 0)).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        assert!(matches!(
            task.set_status(TaskStatus::Done, at(9, 0)),
            Err(TaskError::CompletionRequired)
        ));

        task.set_status(TaskStatus::Archived, at(10, 0)).unwrap();
        assert!(task.is_archived);
        assert!(task.archived_at.is_some());

        task.set_status(TaskStatus::Todo, at(11, 0)).unwrap();
        assert!(!task.is_archived);
        assert!(task.archived_at.is_none());
    }

    #[test]
    fn test_reopen_clears_completion() {
        let mut task = Task::new("Reopen", user("alice"));
        task.complete(&user("alice"), at(9, 0)).unwrap();
        task.set_status(TaskStatus::InProgress, at(10, 0)).unwrap();
        assert!(task.completed_at.is_none());
        assert!(task.completed_by.is_none());
    }

    #[test]
    fn test_overdue() {
        let task = Task::new("Late", user("alice")).with_due_date(at(8, 0));
        assert!(task.is_overdue(at(9, 0)));
        assert!(!task.is_overdue(at(7, 0)));

        let mut done = task.clone();
        done.complete(&user("alice"), at(9, 0)).unwrap();
        assert!(!done.is_overdue(at(10, 0)));

        let undated = Task::new("Whenever", user("alice"));
        assert!(!undated.is_overdue(at(10, 0)));
    }

    #[test]
    fn test_add_note_requires_content() {
        let mut task = Task::new("Discuss", user("alice"));
        assert!(task.add_note("   ", user("bob"), at(9, 0)).is_err());

        let note = task.add_note(" looks good ", user("bob"), at(9, 0)).unwrap();
        assert_eq!(note.content, "looks good");
        assert_eq!(task.notes.len(), 1);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![
            " work ".to_string(),
            "".to_string(),
            "Work".to_string(),
            "urgent".to_string(),
        ]);
        assert_eq!(tags, vec!["work".to_string(), "urgent".to_string()]);
    }

    #[test]
    fn test_next_occurrence_advances_from_due_date() {
        let mut task = Task::new("Water plants", user("alice"))
            .with_due_date(at(8, 0))
            .with_subtasks(vec![Subtask::new("balcony")])
            .with_recurrence(Recurrence::new(RecurrencePattern::Weekly, 1));
        task.complete(&user("alice"), at(9, 0)).unwrap();

        let next = task.next_occurrence(at(9, 0)).unwrap();
        assert_eq!(next.status, TaskStatus::Todo);
        assert_eq!(next.due_date.unwrap().0, at(8, 0) + Duration::weeks(1));
        assert!(next.subtasks.iter().all(|s| !s.completed));
        assert_eq!(next.progress, 0);
        assert!(next.id.is_none());
    }

    #[test]
    fn test_next_occurrence_requires_completion_and_recurrence() {
        let task = Task::new("Once", user("alice"));
        assert!(task.next_occurrence(at(9, 0)).is_none());

        let pending = Task::new("Daily", user("alice"))
            .with_recurrence(Recurrence::new(RecurrencePattern::Daily, 1));
        assert!(pending.next_occurrence(at(9, 0)).is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("later".parse::<TaskStatus>().is_err());
        assert_eq!("Finance".parse::<Category>().unwrap(), Category::Finance);
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
    }
}
