//! Recurrence: next fire instant for cron schedules.
//!
//! Expressions use standard 5-field cron syntax
//! (`minute hour day-of-month month day-of-week`, day-of-week `0-7`
//! with both `0` and `7` meaning Sunday). The `cron` crate expects a
//! seconds-first form with Quartz-style day numbering (`1` = Sunday), so
//! 5-field input is rewritten before parsing: a `0` seconds field and a `*`
//! year field are added, and numeric days of week are spelled out as names.
//! 6/7-field expressions and `@daily`-style macros are passed through as-is.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use cron::Schedule;

use crate::error::ValidationError;
use crate::time::Timestamp;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed, validated cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Parse a cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCron`] when the expression is malformed.
    pub fn parse(expression: &str) -> Result<Self, ValidationError> {
        let normalized = normalize(expression).map_err(|reason| invalid(expression, reason))?;
        let schedule = Schedule::from_str(&normalized)
            .map_err(|err| invalid(expression, err.to_string()))?;
        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
        })
    }

    /// The expression as written by the user.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First occurrence strictly after `after`, evaluated in wall-clock time of `tz`.
    ///
    /// Occurrences between a stale `after` and now are never replayed by
    /// callers: they pass the current instant, so missed runs are skipped.
    /// Returns `None` when the schedule has no future occurrence.
    #[must_use]
    pub fn next_after<Z: TimeZone>(&self, after: Timestamp, tz: &Z) -> Option<Timestamp> {
        let local = after.with_timezone(tz);
        self.schedule
            .after(&local)
            .map(|candidate| candidate.with_timezone(&Utc))
            .find(|candidate| *candidate > after)
    }

    /// Convenience for iterating upcoming occurrences (used by previews and tests).
    pub fn upcoming<'a, Z: TimeZone + 'a>(
        &'a self,
        after: Timestamp,
        tz: &Z,
    ) -> impl Iterator<Item = Timestamp> + 'a {
        let tz = tz.clone();
        let mut cursor = after;
        std::iter::from_fn(move || {
            let next = self.next_after(cursor, &tz)?;
            cursor = next;
            Some(next)
        })
    }
}

/// Compute the next fire instant of `expression` strictly after `after`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCron`] when the expression is malformed
/// or has no future occurrence.
pub fn next_fire_after<Z: TimeZone>(
    expression: &str,
    after: Timestamp,
    tz: &Z,
) -> Result<Timestamp, ValidationError> {
    CronSchedule::parse(expression)?
        .next_after(after, tz)
        .ok_or_else(|| invalid(expression, "schedule has no upcoming occurrence".to_string()))
}

fn invalid(expression: &str, reason: String) -> ValidationError {
    ValidationError::InvalidCron {
        expression: expression.to_string(),
        reason,
    }
}

fn normalize(expression: &str) -> Result<String, String> {
    let trimmed = expression.trim();
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.as_slice() {
        [minute, hour, day_of_month, month, day_of_week] => {
            let day_of_week = normalize_day_of_week(day_of_week)?;
            Ok(format!(
                "0 {minute} {hour} {day_of_month} {month} {day_of_week} *"
            ))
        }
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => Ok(fields.join(" ")),
        _ => Err(format!("expected 5 fields, found {}", fields.len())),
    }
}

fn normalize_day_of_week(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(normalize_day_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

/// Rewrite one list item (`3`, `1-5`, `1-5/2`, `0/2`) into day names.
///
/// Wildcards and already-named items are left for the parser.
fn normalize_day_item(item: &str) -> Result<String, String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: usize = step
                .parse()
                .map_err(|_| format!("invalid day-of-week step {step:?}"))?;
            if step == 0 {
                return Err("day-of-week step must be positive".to_string());
            }
            (range, Some(step))
        }
        None => (item, None),
    };

    let bounds = match range.split_once('-') {
        Some((start, end)) => match (day_number(start), day_number(end)) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => return Err(format!("mixed day-of-week range {range:?}")),
        },
        None => day_number(range).map(|day| if step.is_some() { (day, 6) } else { (day, day) }),
    };

    let Some((start, end)) = bounds else {
        return Ok(item.to_string());
    };
    if start > 7 || end > 7 {
        return Err(format!("day of week out of range in {item:?}"));
    }
    if start > end {
        return Err(format!("descending day-of-week range {range:?}"));
    }

    let mut names: Vec<&str> = Vec::new();
    for day in (start..=end).step_by(step.unwrap_or(1)) {
        let name = DAY_NAMES[day % 7];
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names.join(","))
}

fn day_number(token: &str) -> Option<usize> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
