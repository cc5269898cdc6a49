//! Epoch calendar arithmetic.
//!
//! The calendar turns a wall-clock instant and the persisted
//! [`EpochConfig`] into the in-universe year. It is the single source of
//! truth for every derived time value in the bot: elapsed days, the current
//! year, the next rollover instant, and the span of any requested year.
//!
//! # Design Principles
//!
//! - Everything is derived from `now` and the config; nothing is cached.
//! - All arithmetic is checked (no silent overflow).
//! - Civil time is evaluated in one fixed reference zone. A new year begins
//!   at the daily reset time (17:00 local by default) on a day where the
//!   elapsed day count is a multiple of the epoch length.
//! - Days are added as local calendar days, so rollovers stay at the same
//!   wall-clock time across daylight-saving changes.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::EpochConfig;
use crate::snowflake::snowflake_time;

/// Seconds in a civil day, used to floor the epoch distance into days.
const SECONDS_PER_DAY: i64 = 86_400;

/// Default hour (local) at which a new year begins.
pub const DEFAULT_RESET_HOUR: u32 = 17;

/// Errors that can occur during calendar computations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Year numbers start at 1.
    #[error("invalid year {year}: years start at 1")]
    InvalidYear {
        /// The requested year.
        year: i64,
    },

    /// The configured epoch length is not a positive number of days.
    #[error("epoch length must be at least 1 day, got {length}")]
    InvalidEpochLength {
        /// The configured length.
        length: i64,
    },

    /// A past year has no recorded anchor message.
    #[error("no anchor recorded for year {year}")]
    MissingAnchor {
        /// The year whose boundary is unknown.
        year: i64,
    },

    /// Time is paused, so future rollovers are undefined.
    #[error("time is paused; rollovers are suspended")]
    RolloverSuspended,

    /// A local date-time does not exist in the reference zone.
    #[error("local time {local} does not exist in {tz}")]
    NonexistentLocalTime {
        /// The local date-time that was requested.
        local: NaiveDateTime,
        /// The reference zone.
        tz: Tz,
    },

    /// A date or duration left the representable range.
    #[error("calendar arithmetic overflow")]
    Overflow,
}

/// Where a requested year sits relative to the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearPhase {
    /// Already over; both boundaries come from recorded anchors.
    Past,
    /// In progress.
    Current,
    /// Not started yet; boundaries are projected from the epoch length.
    Projected,
}

/// Derived position of `now` within the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct YearStatus {
    /// Whole days between the epoch anchor and today's reset instant.
    pub elapsed_days: i64,
    /// The in-universe year in effect at `now`.
    pub current_year: i64,
}

impl YearStatus {
    /// Days since the most recent multiple of `length` (0 on rollover day).
    pub fn day_of_year(&self, length: i64) -> Option<i64> {
        self.elapsed_days.checked_rem_euclid(length)
    }
}

/// Start and end of one in-universe year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct YearSpan {
    /// The year described.
    pub year: i64,
    /// Past, current or projected.
    pub phase: YearPhase,
    /// Instant the year began (or will begin).
    pub start: DateTime<Utc>,
    /// Instant the year ended (or will end); `None` while time is paused.
    pub end: Option<DateTime<Utc>>,
}

impl YearSpan {
    /// Length of the year rounded to whole days, if it has an end.
    pub fn duration_days(&self) -> Option<i64> {
        let secs = self.end?.signed_duration_since(self.start).num_seconds();
        secs.checked_add(SECONDS_PER_DAY.checked_div(2)?)?
            .checked_div_euclid(SECONDS_PER_DAY)
    }
}

/// Epoch calendar bound to a reference zone and a daily reset time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
    reset_time: NaiveTime,
}

impl Calendar {
    /// Create a calendar for `tz` with an explicit reset time.
    pub const fn new(tz: Tz, reset_time: NaiveTime) -> Self {
        Self { tz, reset_time }
    }

    /// Create a calendar for `tz` with the default 17:00 reset.
    pub fn with_default_reset(tz: Tz) -> Self {
        let reset_time =
            NaiveTime::from_hms_opt(DEFAULT_RESET_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
        Self::new(tz, reset_time)
    }

    /// The reference zone.
    pub const fn tz(&self) -> Tz {
        self.tz
    }

    /// The daily reset time (local).
    pub const fn reset_time(&self) -> NaiveTime {
        self.reset_time
    }

    /// Today's date in the reference zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Compute elapsed days and the current year.
    ///
    /// On a rollover day (`elapsed_days mod length == 0`) the new year only
    /// takes effect at the reset time; before it, the previous year is still
    /// current.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidEpochLength`] for a non-positive
    /// length, or [`CalendarError::Overflow`] on out-of-range values.
    pub fn status(&self, now: DateTime<Utc>, epoch: &EpochConfig) -> Result<YearStatus, CalendarError> {
        let length = checked_length(epoch)?;
        let local_now = now.with_timezone(&self.tz);
        let trigger_today = self.reset_instant(local_now.date_naive())?;

        let elapsed_secs = trigger_today
            .timestamp()
            .checked_sub(epoch.time)
            .ok_or(CalendarError::Overflow)?;
        let elapsed_days = elapsed_secs
            .checked_div_euclid(SECONDS_PER_DAY)
            .ok_or(CalendarError::Overflow)?;

        let years_elapsed = elapsed_days
            .checked_div_euclid(length)
            .ok_or(CalendarError::Overflow)?;
        let mut current_year = epoch
            .year
            .checked_add(years_elapsed)
            .ok_or(CalendarError::Overflow)?;

        let rollover_day = elapsed_days.checked_rem_euclid(length) == Some(0);
        if rollover_day && local_now.time() < self.reset_time {
            current_year = current_year.checked_sub(1).ok_or(CalendarError::Overflow)?;
        }

        Ok(YearStatus {
            elapsed_days,
            current_year,
        })
    }

    /// The instant the next year begins, or `None` while time is paused.
    ///
    /// # Errors
    ///
    /// Same as [`status`](Self::status).
    pub fn next_rollover(
        &self,
        now: DateTime<Utc>,
        epoch: &EpochConfig,
    ) -> Result<Option<DateTime<Utc>>, CalendarError> {
        if epoch.paused {
            return Ok(None);
        }
        let date = self.scheduled_rollover_date(now, epoch)?;
        self.reset_instant(date).map(Some)
    }

    /// Start and end of `year`.
    ///
    /// Past years read both boundaries from `timestamps`; the current year
    /// starts at its anchor and ends at the next rollover; later years are
    /// projected forward from the next rollover in whole epoch lengths.
    ///
    /// # Errors
    ///
    /// - [`CalendarError::InvalidYear`] if `year <= 0`
    /// - [`CalendarError::MissingAnchor`] if a past year has no anchor
    /// - [`CalendarError::RolloverSuspended`] for a future year while paused
    pub fn year_span(
        &self,
        year: i64,
        now: DateTime<Utc>,
        epoch: &EpochConfig,
        timestamps: &[u64],
    ) -> Result<YearSpan, CalendarError> {
        if year <= 0 {
            return Err(CalendarError::InvalidYear { year });
        }

        let status = self.status(now, epoch)?;
        let length = checked_length(epoch)?;

        match year.cmp(&status.current_year) {
            std::cmp::Ordering::Less => {
                let start = anchor(timestamps, year.checked_sub(1))
                    .ok_or(CalendarError::MissingAnchor { year })?;
                let end = anchor(timestamps, Some(year)).ok_or(CalendarError::MissingAnchor {
                    year: year.saturating_add(1),
                })?;
                Ok(YearSpan {
                    year,
                    phase: YearPhase::Past,
                    start,
                    end: Some(end),
                })
            }
            std::cmp::Ordering::Equal => {
                let scheduled = self.scheduled_rollover_date(now, epoch)?;
                let start = match anchor(timestamps, year.checked_sub(1)) {
                    Some(start) => start,
                    None => self.reset_instant(add_days(scheduled, length.checked_neg())?)?,
                };
                Ok(YearSpan {
                    year,
                    phase: YearPhase::Current,
                    start,
                    end: self.next_rollover(now, epoch)?,
                })
            }
            std::cmp::Ordering::Greater => {
                if epoch.paused {
                    return Err(CalendarError::RolloverSuspended);
                }
                let scheduled = self.scheduled_rollover_date(now, epoch)?;
                let years_ahead = year
                    .checked_sub(status.current_year)
                    .and_then(|d| d.checked_sub(1));
                let offset = years_ahead.and_then(|n| n.checked_mul(length));
                let start_date = add_days(scheduled, offset)?;
                let end_date = add_days(start_date, Some(length))?;
                Ok(YearSpan {
                    year,
                    phase: YearPhase::Projected,
                    start: self.reset_instant(start_date)?,
                    end: Some(self.reset_instant(end_date)?),
                })
            }
        }
    }

    /// The first reset instant strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError`] if the reset time cannot be localized.
    pub fn next_reset_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CalendarError> {
        let today = self.local_date(now);
        let today_reset = self.reset_instant(today)?;
        if today_reset > now {
            return Ok(today_reset);
        }
        self.reset_instant(add_days(today, Some(1))?)
    }

    /// The reset instant on a local date.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::NonexistentLocalTime`] if the reset time
    /// falls into a daylight-saving gap on that date.
    pub fn reset_instant(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        self.local_instant(date.and_time(self.reset_time))
    }

    /// Local midnight on a date.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::NonexistentLocalTime`] if midnight does not
    /// exist on that date.
    pub fn midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        self.local_instant(date.and_time(NaiveTime::MIN))
    }

    fn local_instant(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, CalendarError> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(CalendarError::NonexistentLocalTime { local, tz: self.tz })
    }

    /// Local date of the next rollover, ignoring the pause flag.
    fn scheduled_rollover_date(
        &self,
        now: DateTime<Utc>,
        epoch: &EpochConfig,
    ) -> Result<NaiveDate, CalendarError> {
        let length = checked_length(epoch)?;
        let status = self.status(now, epoch)?;
        let local_now = now.with_timezone(&self.tz);

        let into_year = status
            .day_of_year(length)
            .ok_or(CalendarError::Overflow)?;
        let mut days_ahead = length
            .checked_sub(into_year)
            .and_then(|d| d.checked_rem_euclid(length))
            .ok_or(CalendarError::Overflow)?;
        if days_ahead == 0 && local_now.time() >= self.reset_time {
            days_ahead = length;
        }

        add_days(local_now.date_naive(), Some(days_ahead))
    }
}

const fn checked_length(epoch: &EpochConfig) -> Result<i64, CalendarError> {
    if epoch.length < 1 {
        return Err(CalendarError::InvalidEpochLength {
            length: epoch.length,
        });
    }
    Ok(epoch.length)
}

/// Creation time of `timestamps[index]`.
fn anchor(timestamps: &[u64], index: Option<i64>) -> Option<DateTime<Utc>> {
    let index = usize::try_from(index?).ok()?;
    timestamps.get(index).copied().and_then(snowflake_time)
}

/// Shift a date by a signed number of days; `None` means overflow upstream.
pub(crate) fn add_days(date: NaiveDate, days: Option<i64>) -> Result<NaiveDate, CalendarError> {
    let days = days.ok_or(CalendarError::Overflow)?;
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or(CalendarError::Overflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono_tz::America::New_York;

    use super::*;
    use crate::snowflake::DISCORD_EPOCH_MS;

    fn calendar() -> Calendar {
        Calendar::with_default_reset(New_York)
    }

    /// A wall-clock instant in New York.
    fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Epoch anchored at local midnight on 2024-01-06 (day 0).
    fn epoch(year: i64) -> EpochConfig {
        EpochConfig {
            time: ny(2024, 1, 6, 0, 0).timestamp(),
            year,
            length: 14,
            paused: false,
        }
    }

    /// A snowflake created at `t`.
    fn id_at(t: DateTime<Utc>) -> u64 {
        let ms = u64::try_from(t.timestamp_millis()).unwrap() - DISCORD_EPOCH_MS;
        ms << 22
    }

    #[test]
    fn rollover_day_before_reset_keeps_previous_year() {
        let cal = calendar();
        let status = cal.status(ny(2024, 1, 20, 16, 59), &epoch(1)).unwrap();
        assert_eq!(status.elapsed_days, 14);
        assert_eq!(status.current_year, 1);
    }

    #[test]
    fn rollover_day_at_and_after_reset_advances() {
        let cal = calendar();
        let at = cal.status(ny(2024, 1, 20, 17, 0), &epoch(1)).unwrap();
        assert_eq!(at.elapsed_days, 14);
        assert_eq!(at.current_year, 2);

        let after = cal.status(ny(2024, 1, 20, 23, 30), &epoch(1)).unwrap();
        assert_eq!(after.current_year, 2);
    }

    #[test]
    fn mid_year_days_ignore_the_reset_time() {
        let cal = calendar();
        let morning = cal.status(ny(2024, 1, 19, 9, 0), &epoch(1)).unwrap();
        let evening = cal.status(ny(2024, 1, 19, 21, 0), &epoch(1)).unwrap();
        assert_eq!(morning.elapsed_days, 13);
        assert_eq!(morning.current_year, 1);
        assert_eq!(evening.current_year, 1);
    }

    #[test]
    fn rollover_formula_holds_for_many_years() {
        let cal = calendar();
        let base = epoch(4);
        for years in 1..6_i64 {
            let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()
                + chrono::Days::new(u64::try_from(years * 14).unwrap());
            let before = cal
                .status(cal.reset_instant(date).unwrap() - chrono::TimeDelta::minutes(1), &base)
                .unwrap();
            let after = cal.status(cal.reset_instant(date).unwrap(), &base).unwrap();
            assert_eq!(before.current_year, base.year + years - 1);
            assert_eq!(after.current_year, base.year + years);
        }
    }

    #[test]
    fn next_rollover_mid_year() {
        let cal = calendar();
        let next = cal.next_rollover(ny(2024, 1, 19, 10, 0), &epoch(1)).unwrap();
        assert_eq!(next, Some(ny(2024, 1, 20, 17, 0)));
    }

    #[test]
    fn next_rollover_on_rollover_day() {
        let cal = calendar();
        let before = cal.next_rollover(ny(2024, 1, 20, 16, 0), &epoch(1)).unwrap();
        assert_eq!(before, Some(ny(2024, 1, 20, 17, 0)));

        let after = cal.next_rollover(ny(2024, 1, 20, 17, 30), &epoch(1)).unwrap();
        assert_eq!(after, Some(ny(2024, 2, 3, 17, 0)));
    }

    #[test]
    fn paused_epoch_has_no_next_rollover() {
        let cal = calendar();
        let mut paused = epoch(1);
        paused.paused = true;
        assert_eq!(cal.next_rollover(ny(2024, 1, 19, 10, 0), &paused).unwrap(), None);
    }

    #[test]
    fn rollover_stays_at_local_reset_across_dst() {
        let cal = calendar();
        let dst_epoch = EpochConfig {
            time: ny(2024, 3, 2, 0, 0).timestamp(),
            year: 1,
            length: 14,
            paused: false,
        };
        let next = cal.next_rollover(ny(2024, 3, 12, 12, 0), &dst_epoch).unwrap();
        assert_eq!(next, Some(ny(2024, 3, 16, 17, 0)));
        let status = cal.status(ny(2024, 3, 16, 17, 0), &dst_epoch).unwrap();
        assert_eq!(status.current_year, 2);
    }

    #[test]
    fn current_span_ends_at_next_rollover() {
        let cal = calendar();
        let base = epoch(3);
        let timestamps = [100, 200, 300];
        for day in 0..45_u64 {
            for hour in [0, 16, 17, 23] {
                let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap() + chrono::Days::new(day);
                let now = New_York
                    .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
                    .single()
                    .unwrap()
                    .with_timezone(&Utc);
                let status = cal.status(now, &base).unwrap();
                let span = cal
                    .year_span(status.current_year, now, &base, &timestamps)
                    .unwrap();
                assert_eq!(span.phase, YearPhase::Current);
                assert_eq!(span.end, cal.next_rollover(now, &base).unwrap());
            }
        }
    }

    #[test]
    fn past_span_reads_recorded_anchors() {
        let cal = calendar();
        let span = cal
            .year_span(1, ny(2024, 1, 10, 12, 0), &epoch(3), &[100, 200])
            .unwrap();
        assert_eq!(span.phase, YearPhase::Past);
        assert_eq!(span.start, snowflake_time(100).unwrap());
        assert_eq!(span.end, snowflake_time(200));
    }

    #[test]
    fn past_span_is_independent_of_now() {
        let cal = calendar();
        let timestamps = [
            id_at(ny(2023, 12, 9, 17, 0)),
            id_at(ny(2023, 12, 23, 17, 0)),
        ];
        let early = cal
            .year_span(1, ny(2024, 1, 10, 12, 0), &epoch(3), &timestamps)
            .unwrap();
        let late = cal
            .year_span(1, ny(2024, 6, 1, 8, 0), &epoch(3), &timestamps)
            .unwrap();
        assert_eq!(early, late);
        assert_eq!(early.duration_days(), Some(14));
    }

    #[test]
    fn past_span_without_anchor_fails() {
        let cal = calendar();
        let result = cal.year_span(2, ny(2024, 1, 10, 12, 0), &epoch(3), &[100]);
        assert_eq!(result, Err(CalendarError::MissingAnchor { year: 3 }));
    }

    #[test]
    fn current_span_without_anchor_falls_back_to_previous_rollover() {
        let cal = calendar();
        let span = cal
            .year_span(3, ny(2024, 1, 10, 12, 0), &epoch(3), &[100, 200])
            .unwrap();
        assert_eq!(span.start, ny(2024, 1, 6, 17, 0));
        assert_eq!(span.end, Some(ny(2024, 1, 20, 17, 0)));
        assert_eq!(span.duration_days(), Some(14));
    }

    #[test]
    fn projected_spans_follow_epoch_length() {
        let cal = calendar();
        let now = ny(2024, 1, 10, 12, 0);
        let next = cal.year_span(4, now, &epoch(3), &[]).unwrap();
        assert_eq!(next.phase, YearPhase::Projected);
        assert_eq!(next.start, ny(2024, 1, 20, 17, 0));
        assert_eq!(next.end, Some(ny(2024, 2, 3, 17, 0)));

        let later = cal.year_span(5, now, &epoch(3), &[]).unwrap();
        assert_eq!(later.start, ny(2024, 2, 3, 17, 0));
        assert_eq!(later.end, Some(ny(2024, 2, 17, 17, 0)));
    }

    #[test]
    fn projected_span_while_paused_is_suspended() {
        let cal = calendar();
        let mut paused = epoch(3);
        paused.paused = true;
        let result = cal.year_span(4, ny(2024, 1, 10, 12, 0), &paused, &[]);
        assert_eq!(result, Err(CalendarError::RolloverSuspended));

        let current = cal.year_span(3, ny(2024, 1, 10, 12, 0), &paused, &[]).unwrap();
        assert_eq!(current.end, None);
        assert_eq!(current.duration_days(), None);
    }

    #[test]
    fn non_positive_years_are_invalid() {
        let cal = calendar();
        let now = ny(2024, 1, 10, 12, 0);
        assert_eq!(
            cal.year_span(0, now, &epoch(3), &[]),
            Err(CalendarError::InvalidYear { year: 0 })
        );
        assert_eq!(
            cal.year_span(-4, now, &epoch(3), &[]),
            Err(CalendarError::InvalidYear { year: -4 })
        );
    }

    #[test]
    fn zero_epoch_length_is_rejected() {
        let cal = calendar();
        let mut bad = epoch(1);
        bad.length = 0;
        assert_eq!(
            cal.status(ny(2024, 1, 10, 12, 0), &bad),
            Err(CalendarError::InvalidEpochLength { length: 0 })
        );
    }

    #[test]
    fn next_reset_after_rolls_to_tomorrow_once_passed() {
        let cal = calendar();
        assert_eq!(
            cal.next_reset_after(ny(2024, 1, 10, 12, 0)).unwrap(),
            ny(2024, 1, 10, 17, 0)
        );
        assert_eq!(
            cal.next_reset_after(ny(2024, 1, 10, 17, 0)).unwrap(),
            ny(2024, 1, 11, 17, 0)
        );
    }
}
