//! The daily rollover timer.
//!
//! Once a day at the calendar's reset time the timer asks the guard whether
//! a new year is due and, if so, runs the transition. A per-date latch keeps
//! it from firing twice on one local date, whatever the sleep accuracy.

use std::sync::Arc;
use std::time::Duration;

use attu_core::advance::advance_year;
use attu_core::guard::{self, TriggerDecision};
use attu_core::platform::{ChatClient, WikiClient};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::report::report_error;

/// Back-off when the next reset instant cannot be computed.
const RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Remembers the last local date the timer fired on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DailyLatch {
    last_fired: Option<NaiveDate>,
}

impl DailyLatch {
    /// A latch that has never fired.
    pub const fn new() -> Self {
        Self { last_fired: None }
    }

    /// Record a firing on `date`; `false` if it already fired that day.
    pub fn try_fire(&mut self, date: NaiveDate) -> bool {
        if self.last_fired == Some(date) {
            return false;
        }
        self.last_fired = Some(date);
        true
    }
}

/// Evaluate the guard at `now` and advance the year if it says so.
///
/// # Errors
///
/// Returns an error if the calendar cannot be evaluated or the transition
/// fails part-way.
pub async fn check_for_new_year<C, W>(app: &App<C, W>, now: DateTime<Utc>) -> anyhow::Result<TriggerDecision>
where
    C: ChatClient,
    W: WikiClient,
{
    let config = app.store.snapshot().await;
    let decision = guard::evaluate(&app.calendar, now, &config)?;
    match decision {
        TriggerDecision::Paused => info!("time is paused; skipping rollover check"),
        TriggerDecision::NotDue {
            days_remaining,
            next_year,
        } => info!(days_remaining, next_year, "days remaining until next year"),
        TriggerDecision::AlreadyAdvanced {
            current_year,
            recorded_years,
        } => error!(
            current_year,
            recorded_years, "already enough years; was the advance triggered by hand?"
        ),
        TriggerDecision::Advance { year } => {
            info!(year, "happy new year");
            advance_year(&app.store, &app.chat, &app.wiki, year).await?;
        }
    }
    Ok(decision)
}

/// One timer firing at `now`, subject to the latch.
///
/// Returns `None` when the latch refused the firing.
///
/// # Errors
///
/// Same as [`check_for_new_year`].
pub async fn fire<C, W>(
    app: &App<C, W>,
    now: DateTime<Utc>,
    latch: &mut DailyLatch,
) -> anyhow::Result<Option<TriggerDecision>>
where
    C: ChatClient,
    W: WikiClient,
{
    let date = app.calendar.local_date(now);
    if !latch.try_fire(date) {
        warn!(%date, "rollover check already ran today");
        return Ok(None);
    }
    check_for_new_year(app, now).await.map(Some)
}

/// Run the timer forever.
pub async fn run<C, W>(app: Arc<App<C, W>>)
where
    C: ChatClient,
    W: WikiClient,
{
    let mut latch = DailyLatch::new();
    loop {
        let fire_at = match app.calendar.next_reset_after(Utc::now()) {
            Ok(at) => at,
            Err(e) => {
                error!(error = %e, "cannot compute next reset; retrying later");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        let wait = fire_at
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(%fire_at, wait_secs = wait.as_secs(), "rollover timer armed");
        tokio::time::sleep(wait).await;

        // An early wake-up still evaluates at the reset instant.
        let now = Utc::now().max(fire_at);
        if let Err(err) = fire(&app, now, &mut latch).await {
            let channel = app.store.snapshot().await.channels.error_log;
            report_error(&app.chat, channel, "daily rollover check", &err).await;
        }
    }
}
