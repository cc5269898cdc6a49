//! Pausing and resuming time.
//!
//! Both functions mutate a [`BotConfig`] in place and are meant to run
//! inside [`ConfigStore::update`](crate::config::ConfigStore::update).
//!
//! Resuming re-anchors the epoch so the next year starts at local midnight
//! of a coming Saturday, pushed back by the whole weeks already spent in
//! the interrupted year. A resume on a Friday skips the next day and waits
//! one more week.

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::Serialize;
use tracing::info;

use crate::calendar::{Calendar, CalendarError, add_days};
use crate::config::BotConfig;

const DAYS_PER_WEEK: i64 = 7;

/// What a resume did to the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResumeOutcome {
    /// The epoch was already re-anchored; only the pause flag was cleared.
    AlreadyReset {
        /// Epoch year left in place.
        epoch_year: i64,
        /// Length of `timestamps`.
        recorded_years: i64,
    },
    /// The epoch was re-anchored.
    Reset {
        /// New epoch anchor, unix seconds.
        epoch_time: i64,
        /// New epoch year.
        epoch_year: i64,
        /// Whole weeks the anchor was pushed back.
        week_offset: i64,
    },
}

/// Stop time. Returns `false` if it was already stopped.
pub fn pause(config: &mut BotConfig) -> bool {
    let was_paused = config.epoch.paused;
    config.epoch.paused = true;
    if !was_paused {
        info!("time paused");
    }
    !was_paused
}

/// Restart time, re-anchoring the epoch unless that was already done.
///
/// # Errors
///
/// Returns [`CalendarError`] if the current epoch cannot be evaluated or
/// the new anchor cannot be localized. The config is left untouched then.
pub fn resume(
    calendar: &Calendar,
    now: DateTime<Utc>,
    config: &mut BotConfig,
) -> Result<ResumeOutcome, CalendarError> {
    let recorded_years = config.recorded_years();

    if config.epoch.year > recorded_years {
        config.epoch.paused = false;
        info!(
            epoch_year = config.epoch.year,
            recorded_years, "time resumed; epoch already reset"
        );
        return Ok(ResumeOutcome::AlreadyReset {
            epoch_year: config.epoch.year,
            recorded_years,
        });
    }

    let status = calendar.status(now, &config.epoch)?;
    let today = calendar.local_date(now);

    let mut week_offset = status
        .day_of_year(config.epoch.length)
        .and_then(|d| d.checked_div(DAYS_PER_WEEK))
        .ok_or(CalendarError::Overflow)?;
    if today.weekday() == Weekday::Fri {
        week_offset = week_offset.checked_add(1).ok_or(CalendarError::Overflow)?;
    }

    let until_saturday = i64::from(Weekday::Sat.num_days_from_monday())
        .checked_sub(i64::from(today.weekday().num_days_from_monday()))
        .and_then(|d| d.checked_rem_euclid(DAYS_PER_WEEK))
        .map(|d| if d == 0 { DAYS_PER_WEEK } else { d });
    let shift = week_offset
        .checked_mul(DAYS_PER_WEEK)
        .and_then(|w| w.checked_add(until_saturday?));
    let anchor_date = add_days(today, shift)?;

    let epoch_time = calendar.midnight(anchor_date)?.timestamp();
    let epoch_year = recorded_years.checked_add(1).ok_or(CalendarError::Overflow)?;

    config.epoch.time = epoch_time;
    config.epoch.year = epoch_year;
    config.epoch.paused = false;
    info!(%anchor_date, epoch_year, week_offset, "time resumed; epoch reset");

    Ok(ResumeOutcome::Reset {
        epoch_time,
        epoch_year,
        week_offset,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    use super::*;
    use crate::guard::{TriggerDecision, evaluate};
    use crate::testing::SAMPLE_CONFIG;

    fn ny(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(2024, m, d, h, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn cal() -> Calendar {
        Calendar::with_default_reset(New_York)
    }

    /// Epoch 2024-01-06 (a Saturday), year 3, four years recorded, paused.
    fn paused_config() -> BotConfig {
        let mut config = BotConfig::parse(SAMPLE_CONFIG).unwrap();
        config.timestamps = vec![1, 2, 3, 4];
        config.epoch.paused = true;
        config
    }

    #[test]
    fn pause_reports_whether_anything_changed() {
        let mut config = BotConfig::parse(SAMPLE_CONFIG).unwrap();
        assert!(pause(&mut config));
        assert!(config.epoch.paused);
        assert!(!pause(&mut config));
    }

    #[test]
    fn resume_midweek_anchors_on_next_saturday() {
        let mut config = paused_config();
        // Wednesday, day 4 of the interrupted year.
        let outcome = resume(&cal(), ny(1, 24, 12), &mut config).unwrap();

        assert_eq!(
            outcome,
            ResumeOutcome::Reset {
                epoch_time: ny(1, 27, 0).timestamp(),
                epoch_year: 5,
                week_offset: 0,
            }
        );
        assert!(!config.epoch.paused);
        assert_eq!(config.epoch.year, 5);
    }

    #[test]
    fn resumed_epoch_advances_on_the_anchor_saturday() {
        let mut config = paused_config();
        resume(&cal(), ny(1, 24, 12), &mut config).unwrap();
        assert_eq!(
            evaluate(&cal(), ny(1, 27, 17), &config).unwrap(),
            TriggerDecision::Advance { year: 5 }
        );
    }

    #[test]
    fn friday_resume_waits_an_extra_week() {
        let mut config = paused_config();
        let outcome = resume(&cal(), ny(1, 26, 12), &mut config).unwrap();
        assert_eq!(
            outcome,
            ResumeOutcome::Reset {
                epoch_time: ny(2, 3, 0).timestamp(),
                epoch_year: 5,
                week_offset: 1,
            }
        );
    }

    #[test]
    fn weeks_already_spent_push_the_anchor_back() {
        let mut config = paused_config();
        // Thursday, day 12 of the interrupted year.
        let outcome = resume(&cal(), ny(2, 1, 12), &mut config).unwrap();
        assert_eq!(
            outcome,
            ResumeOutcome::Reset {
                epoch_time: ny(2, 10, 0).timestamp(),
                epoch_year: 5,
                week_offset: 1,
            }
        );
    }

    #[test]
    fn saturday_resume_skips_to_the_following_saturday() {
        let mut config = paused_config();
        // Saturday, day 7.
        let outcome = resume(&cal(), ny(1, 27, 12), &mut config).unwrap();
        assert_eq!(
            outcome,
            ResumeOutcome::Reset {
                epoch_time: ny(2, 10, 0).timestamp(),
                epoch_year: 5,
                week_offset: 1,
            }
        );
    }

    #[test]
    fn second_resume_leaves_the_anchor_alone() {
        let mut config = paused_config();
        resume(&cal(), ny(1, 24, 12), &mut config).unwrap();
        let anchored = config.epoch;

        config.epoch.paused = true;
        let outcome = resume(&cal(), ny(1, 25, 9), &mut config).unwrap();

        assert_eq!(
            outcome,
            ResumeOutcome::AlreadyReset {
                epoch_year: 5,
                recorded_years: 4
            }
        );
        assert_eq!(config.epoch.time, anchored.time);
        assert!(!config.epoch.paused);
    }
}
