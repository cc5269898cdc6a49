//! Discord client for the Attu year keeper.
//!
//! Just enough of Discord for one bot in two guilds: a REST client that
//! implements [`attu_core::platform::ChatClient`] and answers interactions,
//! and a gateway client that delivers `READY`, `INTERACTION_CREATE` and
//! `MESSAGE_CREATE` events.
//!
//! # Modules
//!
//! - [`gateway`] -- WebSocket session with heartbeats and resume.
//! - [`model`] -- API payload types.
//! - [`rest`] -- [`DiscordRest`], the authenticated REST client.
//!
//! [`DiscordRest`]: rest::DiscordRest

pub mod gateway;
pub mod model;
pub mod rest;

pub use gateway::{DEFAULT_GATEWAY_URL, DEFAULT_INTENTS, Gateway, GatewayError, GatewayEvent};
pub use rest::{DEFAULT_API_BASE, DiscordRest};
