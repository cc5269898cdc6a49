//! Shared state for the status API handlers.

use std::sync::Arc;

use attu_core::calendar::Calendar;
use attu_core::config::ConfigStore;
use chrono::{DateTime, Utc};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct StatusState {
    /// The live config document.
    pub store: Arc<ConfigStore>,
    /// Calendar used for every derived value.
    pub calendar: Calendar,
    /// When the container image was built, if known.
    pub build_time: Option<DateTime<Utc>>,
    /// When this process started.
    pub started_at: DateTime<Utc>,
}

impl StatusState {
    /// Create state for a process that started now.
    pub fn new(store: Arc<ConfigStore>, calendar: Calendar, build_time: Option<DateTime<Utc>>) -> Self {
        Self {
            store,
            calendar,
            build_time,
            started_at: Utc::now(),
        }
    }
}
