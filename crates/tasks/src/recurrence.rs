//! Recurring task schedules

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// How often a task repeats once it is completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    /// Repeat every `interval` units of `pattern`; zero is treated as one
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Datetime>,
}

fn default_interval() -> u32 {
    1
}

impl Recurrence {
    pub fn new(pattern: RecurrencePattern, interval: u32) -> Self {
        Self {
            pattern,
            interval,
            end_date: None,
        }
    }

    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    /// The due date following `from`, or `None` past the end date.
    ///
    /// Month and year steps clamp to the last day of shorter months.
    pub fn next_due(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = self.interval.max(1);
        let next = match self.pattern {
            RecurrencePattern::Daily => from.checked_add_signed(Duration::days(step.into()))?,
            RecurrencePattern::Weekly => from.checked_add_signed(Duration::weeks(step.into()))?,
            RecurrencePattern::Monthly => from.checked_add_months(Months::new(step))?,
            RecurrencePattern::Yearly => from.checked_add_months(Months::new(step.checked_mul(12)?))?,
        };

        match &self.end_date {
            Some(end) if next > end.0 => None,
            _ => Some(next),
        }
    }
}
