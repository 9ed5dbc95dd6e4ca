//! JSON shapes returned to clients
//!
//! Record links are flattened to raw ids and timestamps to RFC 3339 strings.

use accounts::{Preferences, User, UserStats};
use chrono::SecondsFormat;
use gamification::Profile;
use serde::Serialize;
use surrealdb::sql::{Datetime, Thing};
use tasks::{
    AssigneeRole, Category, DependencyKind, Priority, RecurrencePattern, Task, TaskStatus,
};

pub(crate) fn timestamp(d: &Datetime) -> String {
    d.0.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn raw_id(thing: &Thing) -> String {
    thing.id.to_raw()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryView {
    start_time: String,
    end_time: String,
    duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    task_id: String,
    relation: DependencyKind,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeView {
    user_id: String,
    role: AssigneeRole,
    assigned_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskView {
    title: String,
    completed: bool,
    completed_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    content: String,
    author: String,
    created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceView {
    pattern: RecurrencePattern,
    interval: u32,
    end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Category,
    pub tags: Vec<String>,
    pub due_date: Option<String>,
    pub estimated_time: u32,
    pub actual_time: u32,
    pub time_entries: Vec<TimeEntryView>,
    pub dependencies: Vec<DependencyView>,
    pub assignees: Vec<AssigneeView>,
    pub progress: u8,
    pub subtasks: Vec<SubtaskView>,
    pub completed_at: Option<String>,
    pub completed_by: Option<String>,
    pub recurring: Option<RecurrenceView>,
    pub notes: Vec<NoteView>,
    pub created_by: String,
    pub is_archived: bool,
    pub archived_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskView {
    fn from(t: Task) -> Self {
        TaskView {
            id: t.id.as_ref().map(raw_id).unwrap_or_default(),
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            category: t.category,
            tags: t.tags,
            due_date: t.due_date.as_ref().map(timestamp),
            estimated_time: t.estimated_time,
            actual_time: t.actual_time,
            time_entries: t
                .time_entries
                .into_iter()
                .map(|e| TimeEntryView {
                    start_time: timestamp(&e.start_time),
                    end_time: timestamp(&e.end_time),
                    duration: e.duration,
                    notes: e.notes,
                })
                .collect(),
            dependencies: t
                .dependencies
                .into_iter()
                .map(|d| DependencyView {
                    task_id: raw_id(&d.task_id),
                    relation: d.relation,
                })
                .collect(),
            assignees: t
                .assignees
                .into_iter()
                .map(|a| AssigneeView {
                    user_id: raw_id(&a.user_id),
                    role: a.role,
                    assigned_at: timestamp(&a.assigned_at),
                })
                .collect(),
            progress: t.progress,
            subtasks: t
                .subtasks
                .into_iter()
                .map(|s| SubtaskView {
                    title: s.title,
                    completed: s.completed,
                    completed_at: s.completed_at.as_ref().map(timestamp),
                })
                .collect(),
            completed_at: t.completed_at.as_ref().map(timestamp),
            completed_by: t.completed_by.as_ref().map(raw_id),
            recurring: t.recurring.map(|r| RecurrenceView {
                pattern: r.pattern,
                interval: r.interval,
                end_date: r.end_date.as_ref().map(timestamp),
            }),
            notes: t
                .notes
                .into_iter()
                .map(|n| NoteView {
                    content: n.content,
                    author: raw_id(&n.author),
                    created_at: timestamp(&n.created_at),
                })
                .collect(),
            created_by: raw_id(&t.created_by),
            is_archived: t.is_archived,
            archived_at: t.archived_at.as_ref().map(timestamp),
            created_at: timestamp(&t.created_at),
            updated_at: timestamp(&t.updated_at),
        }
    }
}

/// A user as seen by themselves; never carries the password hash
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub avatar: String,
    pub preferences: Preferences,
    pub gamification: Profile,
    pub stats: UserStats,
    pub is_active: bool,
    pub last_login: String,
    pub created_at: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        UserView {
            id: u.id_str().unwrap_or_default(),
            full_name: u.full_name(),
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            avatar: u.avatar,
            preferences: u.preferences,
            gamification: u.gamification,
            stats: u.stats,
            is_active: u.is_active,
            last_login: timestamp(&u.last_login),
            created_at: timestamp(&u.created_at),
        }
    }
}

/// Public fields shown when looking other users up
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        UserSummary {
            id: u.id_str().unwrap_or_default(),
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            avatar: u.avatar,
        }
    }
}
