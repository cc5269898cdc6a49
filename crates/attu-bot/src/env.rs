//! Process environment.
//!
//! Everything the bot needs besides the config document is read from
//! environment variables once at startup. Secrets are not among them; the
//! bot token and wiki key live in the config.

use std::net::SocketAddr;
use std::path::PathBuf;

use attu_discord::{DEFAULT_API_BASE, DEFAULT_GATEWAY_URL};
use attu_wiki::DEFAULT_API_ENDPOINT;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::BotError;

/// Layout of `BUILD_TIME` once the zone abbreviation is removed.
const BUILD_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Complete environment configuration.
#[derive(Debug, Clone)]
pub struct BotEnv {
    /// Path of the JSON config document.
    pub config_file: PathBuf,
    /// Container build time, if `BUILD_TIME` was set.
    pub build_time: Option<DateTime<Utc>>,
    /// Reference zone for the calendar.
    pub timezone: Tz,
    /// Whether `DEBUG` was set.
    pub debug: bool,
    /// Log filter directive.
    pub log_level: String,
    /// Listen address of the status API.
    pub status_addr: SocketAddr,
    /// Discord REST base URL.
    pub discord_api_base: String,
    /// Discord gateway URL.
    pub gateway_url: String,
    /// `MediaWiki` Action API endpoint.
    pub wiki_endpoint: String,
}

impl BotEnv {
    /// Load configuration from the process environment.
    ///
    /// Required variables:
    /// - `BOT_CONFIG_FILE` -- path of the config document
    ///
    /// Optional variables:
    /// - `BUILD_TIME` -- `date` output captured when the image was built
    /// - `BOT_TIMEZONE` -- IANA zone name (default `America/New_York`)
    /// - `DEBUG` -- any value enables debug logging
    /// - `BOT_LOG_LVL` -- log filter (default `info`)
    /// - `BOT_STATUS_ADDR` -- status API address (default `0.0.0.0:8080`)
    /// - `DISCORD_API_BASE`, `DISCORD_GATEWAY_URL`, `WIKI_API_ENDPOINT`
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Env`] for a missing required variable or a value
    /// that does not parse.
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BotError> {
        let config_file = lookup("BOT_CONFIG_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(BotError::Env {
                name: "BOT_CONFIG_FILE",
                message: "not set".to_owned(),
            })?;

        let timezone: Tz = lookup("BOT_TIMEZONE")
            .unwrap_or_else(|| "America/New_York".to_owned())
            .parse()
            .map_err(|e| BotError::Env {
                name: "BOT_TIMEZONE",
                message: format!("{e}"),
            })?;

        let build_time = lookup("BUILD_TIME")
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_build_time(&v, timezone))
            .transpose()?;

        let status_addr: SocketAddr = lookup("BOT_STATUS_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse()
            .map_err(|e| BotError::Env {
                name: "BOT_STATUS_ADDR",
                message: format!("{e}"),
            })?;

        let debug = lookup("DEBUG").is_some();
        let log_level = if debug {
            "debug".to_owned()
        } else {
            lookup("BOT_LOG_LVL").unwrap_or_else(|| "info".to_owned())
        };

        Ok(Self {
            config_file,
            build_time,
            timezone,
            debug,
            log_level,
            status_addr,
            discord_api_base: lookup("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            gateway_url: lookup("DISCORD_GATEWAY_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_owned()),
            wiki_endpoint: lookup("WIKI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_owned()),
        })
    }
}

/// Parse `date` output such as `Tue Mar  5 21:14:07 UTC 2024`.
///
/// The zone abbreviation is dropped; `UTC`/`GMT` stamps are read as UTC
/// and anything else as local time in `tz`.
fn parse_build_time(raw: &str, tz: Tz) -> Result<DateTime<Utc>, BotError> {
    let invalid = |message: String| BotError::Env {
        name: "BUILD_TIME",
        message,
    };

    let fields: Vec<&str> = raw.split_whitespace().collect();
    let [weekday, month, day, clock, zone, year] = fields.as_slice() else {
        return Err(invalid(format!("expected 6 fields, got {raw:?}")));
    };
    let stripped = format!("{weekday} {month} {day} {clock} {year}");
    let naive = NaiveDateTime::parse_from_str(&stripped, BUILD_TIME_FORMAT)
        .map_err(|e| invalid(format!("{raw:?}: {e}")))?;

    if matches!(*zone, "UTC" | "GMT") {
        return Ok(naive.and_utc());
    }
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid(format!("{raw:?} does not exist in {tz}")))
}
