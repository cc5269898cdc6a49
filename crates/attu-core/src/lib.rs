//! Epoch calendar and year-advance logic for the Attu year keeper.
//!
//! The bot keeps an in-universe year (`Year N PC`) that advances every
//! `epoch.length` real days at the daily reset time. This crate holds the
//! pure calendar arithmetic and the side-effecting transition that runs
//! when a new year begins; the chat platform and the wiki are reached
//! through traits so every piece here is testable without a network.
//!
//! # Modules
//!
//! - [`advance`] -- The six-step year-advance transition.
//! - [`calendar`] -- Elapsed days, current year, next rollover and year
//!   spans derived from `now` and the epoch config.
//! - [`config`] -- The JSON configuration document and its
//!   [`ConfigStore`].
//! - [`guard`] -- Idempotency guard deciding whether the daily timer
//!   should advance the year.
//! - [`platform`] -- [`ChatClient`] and [`WikiClient`] collaborator traits.
//! - [`reset`] -- Pausing time and re-anchoring the epoch on resume.
//! - [`snowflake`] -- Creation time of Discord ids and permalinks.
//! - [`year_line`] -- The decorated year-marker heading.
//!
//! [`ConfigStore`]: config::ConfigStore
//! [`ChatClient`]: platform::ChatClient
//! [`WikiClient`]: platform::WikiClient

pub mod advance;
pub mod calendar;
pub mod config;
pub mod guard;
pub mod platform;
pub mod reset;
pub mod snowflake;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod year_line;
