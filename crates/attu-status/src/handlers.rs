//! Endpoint handlers for the status API.
//!
//! Every handler takes a config snapshot and evaluates the calendar at
//! the current instant; nothing is cached between requests.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/year` | Current year, next rollover |
//! | `GET` | `/api/year/{year}` | Start and end of a year |
//! | `GET` | `/api/guard` | Daily-timer decision at this instant |

use std::sync::Arc;

use attu_core::calendar::YearPhase;
use attu_core::guard::{self, TriggerDecision};
use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StatusError;
use crate::state::StatusState;

/// Body of `GET /api/year`.
#[derive(Debug, Serialize)]
pub struct YearReport {
    /// The in-universe year in effect now.
    pub current_year: i64,
    /// Whole days since the epoch anchor.
    pub elapsed_days: i64,
    /// Real days per year.
    pub epoch_length: i64,
    /// Whether time is stopped.
    pub paused: bool,
    /// Years with a recorded anchor.
    pub recorded_years: i64,
    /// When the next year begins; absent while paused.
    pub next_rollover: Option<DateTime<Utc>>,
    /// Container build time, if known.
    pub build_time: Option<DateTime<Utc>>,
    /// Process start time.
    pub started_at: DateTime<Utc>,
}

/// Body of `GET /api/year/{year}`.
#[derive(Debug, Serialize)]
pub struct SpanReport {
    /// Requested year.
    pub year: i64,
    /// Past, current or projected.
    pub phase: YearPhase,
    /// When the year began.
    pub start: DateTime<Utc>,
    /// When the year ends; absent while paused.
    pub end: Option<DateTime<Utc>>,
    /// Length in whole days.
    pub duration_days: Option<i64>,
}

/// `GET /health`.
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /api/year`.
pub async fn current_year(State(state): State<Arc<StatusState>>) -> Result<Json<YearReport>, StatusError> {
    let config = state.store.snapshot().await;
    let now = Utc::now();
    let status = state.calendar.status(now, &config.epoch)?;
    let next_rollover = state.calendar.next_rollover(now, &config.epoch)?;

    Ok(Json(YearReport {
        current_year: status.current_year,
        elapsed_days: status.elapsed_days,
        epoch_length: config.epoch.length,
        paused: config.epoch.paused,
        recorded_years: config.recorded_years(),
        next_rollover,
        build_time: state.build_time,
        started_at: state.started_at,
    }))
}

/// `GET /api/year/{year}`.
pub async fn year_span(
    State(state): State<Arc<StatusState>>,
    Path(year): Path<i64>,
) -> Result<Json<SpanReport>, StatusError> {
    let config = state.store.snapshot().await;
    let span = state
        .calendar
        .year_span(year, Utc::now(), &config.epoch, &config.timestamps)?;

    Ok(Json(SpanReport {
        year: span.year,
        phase: span.phase,
        start: span.start,
        end: span.end,
        duration_days: span.duration_days(),
    }))
}

/// `GET /api/guard`.
pub async fn guard(State(state): State<Arc<StatusState>>) -> Result<Json<TriggerDecision>, StatusError> {
    let config = state.store.snapshot().await;
    let decision = guard::evaluate(&state.calendar, Utc::now(), &config)?;
    Ok(Json(decision))
}
