//! Error types for the bot binary.
//!
//! [`BotError`] covers startup failures and the few failures the command
//! layer raises itself. Everything below the dispatcher is wrapped in
//! `anyhow::Error` on its way to the error-log channel.

use attu_core::config::ConfigError;
use attu_core::platform::{ChatError, WikiError};
use attu_discord::GatewayError;

/// Top-level error for the bot binary.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A required environment variable is missing or malformed.
    #[error("environment variable {name}: {message}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The config document could not be loaded or saved.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A chat client could not be constructed.
    #[error("chat client error: {source}")]
    Chat {
        /// The underlying chat error.
        #[from]
        source: ChatError,
    },

    /// The wiki client could not be constructed.
    #[error("wiki client error: {source}")]
    Wiki {
        /// The underlying wiki error.
        #[from]
        source: WikiError,
    },

    /// The gateway refused the session.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying gateway error.
        #[from]
        source: GatewayError,
    },

    /// The owner asked for a test error via `debug error`.
    #[error("test error requested by the bot owner")]
    Requested,
}
