//! Idempotency guard for the scheduled year advance.
//!
//! The daily timer asks [`evaluate`] what to do. The checks run in a fixed
//! order and the first match wins:
//!
//! 1. time is paused
//! 2. today is not a rollover day
//! 3. more years are recorded than the calendar says have begun
//! 4. otherwise the current year is advanced
//!
//! Check 3 compares with a strict `<`: a recorded count equal to the
//! current year still advances. Repeated firings inside one window are
//! stopped by the timer's once-per-date latch, not here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calendar::{Calendar, CalendarError};
use crate::config::BotConfig;

/// What the scheduled trigger should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TriggerDecision {
    /// Time is paused.
    Paused,
    /// Today is not a rollover day.
    NotDue {
        /// Days until the next rollover day.
        days_remaining: i64,
        /// The year that begins then.
        next_year: i64,
    },
    /// The year was already advanced (probably by hand).
    AlreadyAdvanced {
        /// Year according to the calendar.
        current_year: i64,
        /// Length of `timestamps`.
        recorded_years: i64,
    },
    /// Run the transition for `year`.
    Advance {
        /// Target year.
        year: i64,
    },
}

/// Decide whether the scheduled trigger should advance the year.
///
/// # Errors
///
/// Returns [`CalendarError`] if the epoch parameters are unusable.
pub fn evaluate(
    calendar: &Calendar,
    now: DateTime<Utc>,
    config: &BotConfig,
) -> Result<TriggerDecision, CalendarError> {
    let epoch = &config.epoch;
    if epoch.paused {
        return Ok(TriggerDecision::Paused);
    }

    let status = calendar.status(now, epoch)?;
    let day_of_year = status
        .day_of_year(epoch.length)
        .ok_or(CalendarError::InvalidEpochLength {
            length: epoch.length,
        })?;
    if day_of_year != 0 {
        let days_remaining = epoch
            .length
            .checked_sub(day_of_year)
            .ok_or(CalendarError::Overflow)?;
        let next_year = status
            .current_year
            .checked_add(1)
            .ok_or(CalendarError::Overflow)?;
        return Ok(TriggerDecision::NotDue {
            days_remaining,
            next_year,
        });
    }

    let recorded_years = config.recorded_years();
    if status.current_year < recorded_years {
        return Ok(TriggerDecision::AlreadyAdvanced {
            current_year: status.current_year,
            recorded_years,
        });
    }

    Ok(TriggerDecision::Advance {
        year: status.current_year,
    })
}

/// Target year of a manual force: one past the last recorded year.
pub fn force_target(config: &BotConfig) -> i64 {
    config.recorded_years().saturating_add(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    use super::*;
    use crate::testing::SAMPLE_CONFIG;

    fn ny(d: u32, h: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(2024, 1, d, h, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Sample config: epoch 2024-01-06 00:00 New York, year 3, length 14.
    fn config(timestamps: u64) -> BotConfig {
        let mut config = BotConfig::parse(SAMPLE_CONFIG).unwrap();
        config.timestamps = (1..=timestamps).collect();
        config
    }

    fn cal() -> Calendar {
        Calendar::with_default_reset(New_York)
    }

    #[test]
    fn paused_short_circuits_everything() {
        let mut c = config(3);
        c.epoch.paused = true;
        assert_eq!(evaluate(&cal(), ny(20, 17), &c).unwrap(), TriggerDecision::Paused);
    }

    #[test]
    fn mid_year_is_not_due() {
        assert_eq!(
            evaluate(&cal(), ny(16, 17), &config(3)).unwrap(),
            TriggerDecision::NotDue {
                days_remaining: 4,
                next_year: 4
            }
        );
    }

    #[test]
    fn rollover_day_advances_current_year() {
        assert_eq!(
            evaluate(&cal(), ny(20, 17), &config(3)).unwrap(),
            TriggerDecision::Advance { year: 4 }
        );
    }

    #[test]
    fn equal_counts_still_advance_under_strict_comparison() {
        // current_year == recorded_years is not caught by check 3.
        assert_eq!(
            evaluate(&cal(), ny(20, 17), &config(4)).unwrap(),
            TriggerDecision::Advance { year: 4 }
        );
    }

    #[test]
    fn recorded_years_past_current_year_are_already_advanced() {
        let mut c = config(3);
        assert_eq!(force_target(&c), 4);
        c.timestamps.push(99);
        c.timestamps.push(100);
        assert_eq!(
            evaluate(&cal(), ny(20, 17), &c).unwrap(),
            TriggerDecision::AlreadyAdvanced {
                current_year: 4,
                recorded_years: 5
            }
        );
    }

    #[test]
    fn force_target_ignores_the_calendar() {
        let c = config(5);
        assert_eq!(force_target(&c), 6);
    }
}
