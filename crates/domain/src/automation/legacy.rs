//! Legacy schedule tuples: the `(hour, minute, recurrence, day_of_week)`
//! form automations were stored in before cron expressions.
//!
//! Runtime code never sees this form: storage converts every legacy record
//! into a [`Trigger::Cron`] when it initializes. The tuple calculator is kept
//! so the conversion can be checked occurrence for occurrence.

use chrono::{Datelike, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::automation::Trigger;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// How a legacy schedule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Once,
    Daily,
    Weekdays,
    Weekends,
    Weekly,
}

/// A time-of-day schedule as persisted by older releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySchedule {
    pub hour: u32,
    pub minute: u32,
    pub recurrence: Recurrence,
    /// `0` = Sunday … `6` = Saturday. Only meaningful for [`Recurrence::Weekly`].
    #[serde(default, alias = "dayOfWeek")]
    pub day_of_week: Option<u32>,
}

impl LegacySchedule {
    /// Check the tuple is convertible.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeOfDay`] for an out-of-range time and
    /// [`ValidationError::InvalidDayOfWeek`] for a weekly schedule without a valid day.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hour > 23 || self.minute > 59 {
            return Err(ValidationError::InvalidTimeOfDay {
                hour: self.hour,
                minute: self.minute,
            });
        }
        if self.recurrence == Recurrence::Weekly && !self.day_of_week.is_some_and(|d| d <= 6) {
            return Err(ValidationError::InvalidDayOfWeek(self.day_of_week));
        }
        Ok(())
    }

    /// The next instant strictly after `after` at which this tuple fires.
    ///
    /// Takes today at `hour:minute`; if that is not after `after`, moves to
    /// the next day; then keeps moving until the day of week satisfies the
    /// recurrence. [`Recurrence::Once`] computes like `Daily`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the tuple is invalid.
    pub fn next_fire_after<Z: TimeZone>(
        &self,
        after: Timestamp,
        tz: &Z,
    ) -> Result<Timestamp, ValidationError> {
        self.validate()?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or(
            ValidationError::InvalidTimeOfDay {
                hour: self.hour,
                minute: self.minute,
            },
        )?;

        let mut date = after.with_timezone(tz).date_naive();
        // A week plus slack for days whose wall-clock time does not exist (DST gaps).
        for _ in 0..14 {
            if self.allows(date.weekday()) {
                let candidate = tz
                    .from_local_datetime(&date.and_time(time))
                    .earliest()
                    .map(|local| local.with_timezone(&Utc));
                if let Some(candidate) = candidate.filter(|c| *c > after) {
                    return Ok(candidate);
                }
            }
            let Some(next) = date.succ_opt() else { break };
            date = next;
        }
        Err(ValidationError::InvalidDayOfWeek(self.day_of_week))
    }

    /// Equivalent standard 5-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the tuple is invalid.
    pub fn to_cron_expression(&self) -> Result<String, ValidationError> {
        self.validate()?;
        let day_of_week = match self.recurrence {
            Recurrence::Once | Recurrence::Daily => "*".to_string(),
            Recurrence::Weekdays => "1-5".to_string(),
            Recurrence::Weekends => "0,6".to_string(),
            Recurrence::Weekly => self
                .day_of_week
                .ok_or(ValidationError::InvalidDayOfWeek(None))?
                .to_string(),
        };
        Ok(format!("{} {} * * {day_of_week}", self.minute, self.hour))
    }

    /// The canonical trigger this tuple migrates to.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the tuple is invalid.
    pub fn to_trigger(&self) -> Result<Trigger, ValidationError> {
        Ok(Trigger::Cron {
            expression: self.to_cron_expression()?,
            once: self.recurrence == Recurrence::Once,
        })
    }

    fn allows(&self, weekday: Weekday) -> bool {
        let weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);
        match self.recurrence {
            Recurrence::Once | Recurrence::Daily => true,
            Recurrence::Weekdays => !weekend,
            Recurrence::Weekends => weekend,
            Recurrence::Weekly => self.day_of_week == Some(weekday.num_days_from_sunday()),
        }
    }
}
