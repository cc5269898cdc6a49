//! Health and year-status HTTP API for the Attu year keeper.
//!
//! A small Axum server that container orchestration can probe and that
//! exposes the calendar read-only. It never mutates the config.
//!
//! # Modules
//!
//! - [`error`] -- [`StatusError`] and its HTTP mapping.
//! - [`handlers`] -- Endpoint handlers.
//! - [`router`] -- Route table.
//! - [`server`] -- Bind and serve.
//! - [`state`] -- Shared [`StatusState`].
//!
//! [`StatusError`]: error::StatusError
//! [`StatusState`]: state::StatusState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
