//! Cron schedule parsing for directory sweeps.
//!
//! Schedules use the classic 5-field form (`minute hour day-of-month month
//! day-of-week`). Seconds are not accepted, matching what the `at:` key has
//! always meant in config files.

use std::fmt;

use chrono::{DateTime, TimeZone};
use croner::Cron;

use crate::{ConfigError, Result};

/// Number of whitespace-separated fields a schedule must have.
pub const SCHEDULE_FIELDS: usize = 5;

/// A parsed sweep schedule.
#[derive(Clone)]
pub struct Schedule {
    expr: String,
    cron: Cron,
}

impl Schedule {
    /// Parse a 5-field cron expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let fields = expr.split_whitespace().count();
        if fields != SCHEDULE_FIELDS {
            return Err(ConfigError::InvalidSchedule {
                expr: expr.to_string(),
                reason: format!("expected {SCHEDULE_FIELDS} fields, found {fields}"),
            });
        }

        let cron = Cron::new(expr)
            .parse()
            .map_err(|e| ConfigError::InvalidSchedule {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expr: expr.to_string(),
            cron,
        })
    }

    /// The expression as written in the config.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Next fire time strictly after `after`, or `None` if the expression
    /// can never fire again.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schedule").field(&self.expr).finish()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}
