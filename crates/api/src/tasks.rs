//! Task board endpoints

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gamification::{completion_reward, Reward};
use serde::{Deserialize, Deserializer, Serialize};
use surrealdb::sql::Thing;
use tasks::{
    normalize_tags, Assignee, AssigneeRole, Category, CategoryStats, DependencyKind, Priority,
    Recurrence, RecurrencePattern, SortKey, SortOrder, Subtask, Task, TaskDependency, TaskFilter,
    TaskStats, TaskStatus,
};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, QueryParams};
use crate::views::TaskView;
use crate::AppState;

/// Accept an explicit `null` as "clear this field"
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -----------------------------------------------------------------------------
// Request bodies
// -----------------------------------------------------------------------------

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeInput {
    user_id: String,
    #[serde(default)]
    role: AssigneeRole,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskInput {
    title: String,
    #[serde(default)]
    completed: bool,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInput {
    task_id: String,
    #[serde(default)]
    relation: DependencyKind,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceInput {
    pattern: RecurrencePattern,
    #[serde(default)]
    interval: Option<u32>,
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
}

impl From<RecurrenceInput> for Recurrence {
    fn from(input: RecurrenceInput) -> Self {
        let recurrence = Recurrence::new(input.pattern, input.interval.unwrap_or(1));
        match input.end_date {
            Some(end) => recurrence.until(end),
            None => recurrence,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    estimated_time: Option<u32>,
    #[serde(default)]
    assignees: Vec<AssigneeInput>,
    #[serde(default)]
    subtasks: Vec<SubtaskInput>,
    #[serde(default)]
    dependencies: Vec<DependencyInput>,
    #[serde(default)]
    recurring: Option<RecurrenceInput>,
}

#[derive(Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
    priority: Option<Priority>,
    category: Option<Category>,
    tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    due_date: Option<Option<DateTime<Utc>>>,
    estimated_time: Option<u32>,
    progress: Option<u8>,
    status: Option<TaskStatus>,
    assignees: Option<Vec<AssigneeInput>>,
    subtasks: Option<Vec<SubtaskInput>>,
    dependencies: Option<Vec<DependencyInput>>,
    #[serde(default, deserialize_with = "nullable")]
    recurring: Option<Option<RecurrenceInput>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRequest {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct NoteRequest {
    content: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

/// Empty strings and `all` mean "no filter"
fn filter_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ListQuery {
    fn parse(self) -> ApiResult<(TaskFilter, SortKey, SortOrder)> {
        let filter = TaskFilter {
            status: filter_value(self.status).map(|s| s.parse()).transpose()?,
            priority: filter_value(self.priority).map(|s| s.parse()).transpose()?,
            category: filter_value(self.category).map(|s| s.parse()).transpose()?,
            search: filter_value(self.search),
        };
        let sort: SortKey = filter_value(self.sort_by)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();
        let order: SortOrder = filter_value(self.sort_order)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();

        Ok((filter, sort, order))
    }
}

// -----------------------------------------------------------------------------
// Responses
// -----------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskResponse {
    task: TaskView,
}

#[derive(Serialize)]
pub struct TaskListResponse {
    tasks: Vec<TaskView>,
    total: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    stats: TaskStats,
    category_stats: Vec<CategoryStats>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReward {
    experience_gained: u64,
    points_gained: u64,
    level_up: bool,
    new_level: u32,
    streak: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    task: TaskView,
    gamification: CompletionReward,
    next_task: Option<TaskView>,
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn user_thing(id: &str) -> Thing {
    accounts::Store::thing(id)
}

fn task_thing(id: &str) -> Thing {
    Thing::from(("task", id))
}

fn assignees_from(inputs: Vec<AssigneeInput>) -> Vec<Assignee> {
    inputs
        .into_iter()
        .map(|a| Assignee::new(user_thing(a.user_id.trim()), a.role))
        .collect()
}

fn subtasks_from(inputs: Vec<SubtaskInput>, now: DateTime<Utc>) -> Vec<Subtask> {
    inputs
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| Subtask {
            title: s.title.trim().to_string(),
            completed: s.completed,
            completed_at: s.completed.then(|| now.into()),
        })
        .collect()
}

fn dependencies_from(inputs: Vec<DependencyInput>) -> Vec<TaskDependency> {
    inputs
        .into_iter()
        .map(|d| TaskDependency {
            task_id: task_thing(d.task_id.trim()),
            relation: d.relation,
        })
        .collect()
}

fn ensure_access(task: &Task, user: &Thing) -> ApiResult<()> {
    if task.has_access(user) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Load a task the caller may see: its creator or an assignee
async fn load_accessible(state: &AppState, id: &str, user: &Thing) -> ApiResult<Task> {
    let task = state
        .tasks
        .get_task(id)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;

    ensure_access(&task, user)?;
    Ok(task)
}

/// Run `change` against the latest copy of a task the caller may see
async fn modify<T, F>(state: &AppState, id: &str, user: &Thing, mut change: F) -> ApiResult<(Task, T)>
where
    F: FnMut(&mut Task) -> ApiResult<T>,
{
    state
        .tasks
        .update_task(id, |task| {
            ensure_access(task, user)?;
            change(task)
        })
        .await?
        .ok_or(ApiError::NotFound("Task"))
}

/// Mark `task` done by `user`
///
/// Returns the reward to grant, or `None` when an earlier completion of the
/// same task was already rewarded.
fn finish(task: &mut Task, user: &Thing, now: DateTime<Utc>) -> ApiResult<Option<Reward>> {
    task.complete(user, now)?;
    let reward = completion_reward(task.estimated_time);
    Ok(task
        .record_reward(user, reward.experience, reward.points, now)
        .then_some(reward))
}

/// Credit a rewarded completion to the caller and schedule the next
/// occurrence of a recurring task
async fn grant_completion(
    state: &AppState,
    auth: &AuthUser,
    task: &Task,
    reward: Option<Reward>,
    now: DateTime<Utc>,
) -> ApiResult<(CompletionReward, Option<Task>)> {
    let Some(reward) = reward else {
        let profile = &auth.user.gamification;
        return Ok((
            CompletionReward {
                experience_gained: 0,
                points_gained: 0,
                level_up: false,
                new_level: profile.level,
                streak: profile.streak,
            },
            None,
        ));
    };

    let next_task = match task.next_occurrence(now) {
        Some(next) => Some(state.tasks.create_task(next).await?),
        None => None,
    };
    let created_own = next_task.as_ref().is_some_and(|t| t.created_by == auth.id);

    let (user, level_up) = state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            let level_up = user.gamification.record_completion(reward);
            user.record_task_completed(task.actual_time);
            if created_own {
                user.record_task_created();
            }
            Ok::<_, ApiError>(level_up)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(next) = next_task.as_ref().filter(|_| !created_own) {
        state
            .accounts
            .update_user(&next.created_by.id.to_raw(), |creator| {
                creator.record_task_created();
                Ok::<_, ApiError>(())
            })
            .await?;
    }

    info!(
        "Task {} completed, {} experience granted",
        task.id_str().unwrap_or_default(),
        reward.experience
    );

    Ok((
        CompletionReward {
            experience_gained: reward.experience,
            points_gained: reward.points,
            level_up: level_up.leveled_up,
            new_level: level_up.new_level,
            streak: user.gamification.streak,
        },
        next_task,
    ))
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let (filter, sort, order) = query.parse()?;
    let tasks = state.tasks.list_tasks(&auth.id, &filter, sort, order).await?;

    Ok(Json(TaskListResponse {
        total: tasks.len(),
        tasks: tasks.into_iter().map(TaskView::from).collect(),
    }))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let now = Utc::now();
    let mut task = Task::new(req.title, auth.id.clone())
        .with_priority(req.priority.unwrap_or_default())
        .with_category(req.category.unwrap_or_default())
        .with_tags(req.tags)
        .with_estimated_time(req.estimated_time.unwrap_or(0))
        .with_assignees(assignees_from(req.assignees))
        .with_subtasks(subtasks_from(req.subtasks, now));
    if let Some(description) = req.description {
        task = task.with_description(description);
    }
    if let Some(due) = req.due_date {
        task = task.with_due_date(due);
    }
    if let Some(recurring) = req.recurring {
        task = task.with_recurrence(recurring.into());
    }
    task.dependencies = dependencies_from(req.dependencies);
    task.validate()?;

    let task = state.tasks.create_task(task).await?;

    state
        .accounts
        .update_user(&auth.raw_id(), |user| {
            user.record_task_created();
            Ok::<_, ApiError>(())
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse { task: task.into() })))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_accessible(&state, &id, &auth.id).await?;
    Ok(Json(TaskResponse { task: task.into() }))
}

/// Apply the field changes of an update request and check the result
fn apply_update(task: &mut Task, req: UpdateTaskRequest, now: DateTime<Utc>) -> ApiResult<()> {
    if let Some(title) = req.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        task.description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }
    if let Some(priority) = req.priority {
        task.priority = priority;
    }
    if let Some(category) = req.category {
        task.category = category;
    }
    if let Some(tags) = req.tags {
        task.tags = normalize_tags(tags);
    }
    if let Some(due_date) = req.due_date {
        task.due_date = due_date.map(Into::into);
    }
    if let Some(estimated) = req.estimated_time {
        task.estimated_time = estimated;
    }
    if let Some(progress) = req.progress {
        task.progress = progress;
    }
    if let Some(assignees) = req.assignees {
        let assignees = assignees_from(assignees);
        if !assignees.is_empty() {
            task.assignees = assignees;
        }
    }
    if let Some(subtasks) = req.subtasks {
        task.subtasks = subtasks_from(subtasks, now);
        task.calculate_progress();
    }
    if let Some(dependencies) = req.dependencies {
        task.dependencies = dependencies_from(dependencies);
    }
    if let Some(recurring) = req.recurring {
        task.recurring = recurring.map(Into::into);
    }
    task.validate()?;
    Ok(())
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let now = Utc::now();
    let status = req.status;

    let (task, reward) = modify(&state, &id, &auth.id, |task| {
        apply_update(task, req.clone(), now)?;
        match status {
            Some(TaskStatus::Done) if task.status != TaskStatus::Done => {
                finish(task, &auth.id, now)
            }
            Some(TaskStatus::Done) | None => Ok(None),
            Some(status) => {
                task.set_status(status, now)?;
                Ok(None)
            }
        }
    })
    .await?;

    if reward.is_some() {
        grant_completion(&state, &auth, &task, reward, now).await?;
    }

    Ok(Json(TaskResponse { task: task.into() }))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let task = state
        .tasks
        .get_task(&id)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;

    if !task.is_owner(&auth.id) {
        return Err(ApiError::Forbidden);
    }

    state.tasks.delete_task(&id).await?;
    info!("Deleted task {}", id);

    Ok(Json(serde_json::json!({ "message": "Task deleted successfully" })))
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CompletionResponse>> {
    let now = Utc::now();
    let (task, reward) = modify(&state, &id, &auth.id, |task| finish(task, &auth.id, now)).await?;
    let (gamification, next_task) = grant_completion(&state, &auth, &task, reward, now).await?;

    Ok(Json(CompletionResponse {
        task: task.into(),
        gamification,
        next_task: next_task.map(TaskView::from),
    }))
}

pub async fn add_time_entry(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<TimeEntryRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let (task, ()) = modify(&state, &id, &auth.id, |task| {
        task.add_time_entry(req.start_time, req.end_time, req.notes.clone())?;
        Ok(())
    })
    .await?;

    Ok(Json(TaskResponse { task: task.into() }))
}

pub async fn add_note(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NoteRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let now = Utc::now();
    let (task, ()) = modify(&state, &id, &auth.id, |task| {
        task.add_note(&req.content, auth.id.clone(), now)?;
        Ok(())
    })
    .await?;

    Ok(Json(TaskResponse { task: task.into() }))
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<OverviewResponse>> {
    let tasks = state
        .tasks
        .tasks_for_user(&auth.id)
        .await
        .context("Failed to load tasks for overview")?;

    Ok(Json(OverviewResponse {
        stats: TaskStats::from_tasks(&tasks, Utc::now()),
        category_stats: CategoryStats::from_tasks(&tasks),
    }))
}
