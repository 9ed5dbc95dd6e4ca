//! Progress summaries

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use surrealdb::sql::Thing;
use tasks::Task;

/// Length of the rolling window used for weekly stats
const WEEK_DAYS: i64 = 7;

/// Activity over the last seven days
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub tasks_completed: u32,
    /// Minutes from time entries started inside the window
    pub time_spent: u64,
    pub experience_gained: u64,
    pub points_earned: u64,
}

impl WeeklyStats {
    /// Recompute `user`'s weekly activity from the tasks they touched
    ///
    /// Completions count for whoever was rewarded for them, with the
    /// experience recorded at the time. Tracked time counts on tasks the user
    /// created or is assigned to.
    pub fn from_tasks(tasks: &[Task], user: &Thing, now: DateTime<Utc>) -> Self {
        let since = now - Duration::days(WEEK_DAYS);
        let in_window = |at: DateTime<Utc>| at >= since && at <= now;

        let mut stats = Self::default();
        for task in tasks {
            if let Some(reward) = &task.reward {
                if reward.user_id == *user && in_window(reward.granted_at.0) {
                    stats.tasks_completed += 1;
                    stats.experience_gained += reward.experience;
                    stats.points_earned += reward.points;
                }
            }

            if task.has_access(user) {
                stats.time_spent += task
                    .time_entries
                    .iter()
                    .filter(|e| in_window(e.start_time.0))
                    .map(|e| u64::from(e.duration))
                    .sum::<u64>();
            }
        }
        stats
    }
}

/// Level progress and totals for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_level: u32,
    pub experience: u64,
    /// Percentage towards the next level, 0..=100
    pub progress_to_next_level: u8,
    pub points: u64,
    pub streak: u32,
    /// Number of achievements earned
    pub achievements: usize,
    /// Number of badges earned
    pub badges: usize,
    pub weekly_stats: WeeklyStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{completion_reward, Profile};
    use chrono::TimeZone;
    use tasks::{Assignee, AssigneeRole};

    fn owner() -> Thing {
        Thing::from(("user", "alice"))
    }

    fn helper() -> Thing {
        Thing::from(("user", "bob"))
    }

    fn finish(task: &mut Task, user: &Thing, at: DateTime<Utc>) {
        task.complete(user, at).unwrap();
        let reward = completion_reward(task.estimated_time);
        task.record_reward(user, reward.experience, reward.points, at);
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_weekly_stats_only_count_recent_work() {
        let mut recent = Task::new("recent", owner()).with_estimated_time(120);
        recent
            .add_time_entry(now() - Duration::days(2), now() - Duration::days(2) + Duration::minutes(40), None)
            .unwrap();
        finish(&mut recent, &owner(), now() - Duration::days(1));

        let mut old = Task::new("old", owner()).with_estimated_time(30);
        old.add_time_entry(now() - Duration::days(20), now() - Duration::days(20) + Duration::minutes(90), None)
            .unwrap();
        finish(&mut old, &owner(), now() - Duration::days(10));

        let mut open = Task::new("open", owner());
        open.add_time_entry(now() - Duration::hours(3), now() - Duration::hours(2), None)
            .unwrap();

        let stats = WeeklyStats::from_tasks(&[recent, old, open], &owner(), now());
        assert_eq!(
            stats,
            WeeklyStats {
                tasks_completed: 1,
                time_spent: 100,
                experience_gained: 22,
                points_earned: 11,
            }
        );
    }

    #[test]
    fn test_weekly_stats_empty() {
        assert_eq!(WeeklyStats::from_tasks(&[], &owner(), now()), WeeklyStats::default());
    }

    #[test]
    fn test_weekly_stats_credit_the_completer() {
        let mut shared = Task::new("shared", owner()).with_assignees(vec![
            Assignee::new(owner(), AssigneeRole::Owner),
            Assignee::new(helper(), AssigneeRole::Assignee),
        ]);
        finish(&mut shared, &helper(), now() - Duration::hours(1));
        let tasks = [shared];

        let creator = WeeklyStats::from_tasks(&tasks, &owner(), now());
        assert_eq!(creator.tasks_completed, 0);
        assert_eq!(creator.experience_gained, 0);

        let completer = WeeklyStats::from_tasks(&tasks, &helper(), now());
        assert_eq!(completer.tasks_completed, 1);
        assert_eq!(completer.experience_gained, 10);
        assert_eq!(completer.points_earned, 5);
    }

    #[test]
    fn test_reopened_task_counts_once() {
        let mut task = Task::new("again", owner());
        finish(&mut task, &owner(), now() - Duration::hours(3));
        task.set_status(tasks::TaskStatus::Todo, now() - Duration::hours(2)).unwrap();
        finish(&mut task, &owner(), now() - Duration::hours(1));

        let stats = WeeklyStats::from_tasks(&[task], &owner(), now());
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.experience_gained, 10);
    }

    #[test]
    fn test_progress_summary_counts_awards() {
        let mut profile = Profile::default();
        profile.add_experience(130);
        profile.streak = 4;

        let progress = profile.progress(WeeklyStats::default());
        assert_eq!(progress.current_level, 2);
        assert_eq!(progress.progress_to_next_level, 30);
        assert_eq!(progress.streak, 4);
        assert_eq!(progress.achievements, 0);
    }
}
