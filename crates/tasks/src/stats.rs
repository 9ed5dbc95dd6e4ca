//! Aggregate counts over a user's tasks

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Category, Task, TaskStatus};

/// Board totals for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub in_progress_tasks: u32,
    pub todo_tasks: u32,
    /// Sum of tracked minutes
    pub total_time_spent: u64,
    pub overdue_tasks: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total_tasks += 1;
            match task.status {
                TaskStatus::Done => stats.completed_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Todo => stats.todo_tasks += 1,
                TaskStatus::Archived => {}
            }
            stats.total_time_spent += u64::from(task.actual_time);
            if task.is_overdue(now) {
                stats.overdue_tasks += 1;
            }
            stats
        })
    }
}

/// Per-category counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: Category,
    pub count: u32,
    pub completed: u32,
}

impl CategoryStats {
    /// One entry per category that has tasks, in category declaration order
    pub fn from_tasks(tasks: &[Task]) -> Vec<Self> {
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let in_category = tasks.iter().filter(|t| t.category == category);
                let (count, completed) = in_category.fold((0, 0), |(count, completed), t| {
                    (count + 1, completed + u32::from(t.status == TaskStatus::Done))
                });
                (count > 0).then_some(Self {
                    category,
                    count,
                    completed,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use surrealdb::sql::Thing;

    fn owner() -> Thing {
        Thing::from(("user", "alice"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_stats_are_zero() {
        assert_eq!(TaskStats::from_tasks(&[], now()), TaskStats::default());
        assert!(CategoryStats::from_tasks(&[]).is_empty());
    }

    #[test]
    fn test_stats_count_statuses_time_and_overdue() {
        let yesterday = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();

        let mut done = Task::new("done", owner()).with_due_date(yesterday);
        done.actual_time = 30;
        done.complete(&owner(), now()).unwrap();

        let mut doing = Task::new("doing", owner());
        doing.set_status(TaskStatus::InProgress, now()).unwrap();
        doing.actual_time = 15;

        let late = Task::new("late", owner()).with_due_date(yesterday);

        let stats = TaskStats::from_tasks(&[done, doing, late], now());
        assert_eq!(
            stats,
            TaskStats {
                total_tasks: 3,
                completed_tasks: 1,
                in_progress_tasks: 1,
                todo_tasks: 1,
                total_time_spent: 45,
                overdue_tasks: 1,
            }
        );
    }

    #[test]
    fn test_category_stats_in_declaration_order() {
        let mut work_done = Task::new("a", owner()).with_category(Category::Work);
        work_done.complete(&owner(), now()).unwrap();
        let work = Task::new("b", owner()).with_category(Category::Work);
        let health = Task::new("c", owner()).with_category(Category::Health);

        let stats = CategoryStats::from_tasks(&[health, work, work_done]);
        assert_eq!(
            stats,
            vec![
                CategoryStats {
                    category: Category::Work,
                    count: 2,
                    completed: 1,
                },
                CategoryStats {
                    category: Category::Health,
                    count: 1,
                    completed: 0,
                },
            ]
        );
    }
}
