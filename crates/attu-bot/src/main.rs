//! Attu year keeper bot.
//!
//! Tracks the in-universe year (`N PC`) of the Attu community, announces
//! each new year in Discord, and mirrors the year onto the wiki.
//!
//! # Startup Sequence
//!
//! 1. Read the process environment
//! 2. Initialize structured logging (tracing)
//! 3. Load the config document (missing or incompatible config is fatal)
//! 4. Build the Discord and wiki clients
//! 5. Start the status API
//! 6. Connect to the gateway and dispatch events until shutdown

mod app;
mod commands;
mod dispatch;
mod env;
mod error;
mod registry;
mod report;
mod scheduler;

use std::sync::Arc;

use attu_core::calendar::Calendar;
use attu_core::config::ConfigStore;
use attu_discord::{DEFAULT_INTENTS, DiscordRest, Gateway};
use attu_status::server::StatusServer;
use attu_status::state::StatusState;
use attu_wiki::MediaWikiClient;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::env::BotEnv;
use crate::error::BotError;

/// Capacity of the gateway event channel.
const EVENT_BUFFER: usize = 64;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the environment or config cannot be loaded, a
/// client cannot be built, the status address is taken, or the gateway
/// refuses the session.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment.
    let env = BotEnv::from_env()?;

    // 2. Logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&env.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_time = ?env.build_time,
        timezone = %env.timezone,
        debug = env.debug,
        "attu-bot starting"
    );

    // 3. Config.
    let store = Arc::new(ConfigStore::open(&env.config_file).map_err(BotError::from)?);
    let config = store.snapshot().await;
    let calendar = Calendar::with_default_reset(env.timezone);

    // 4. Clients.
    let chat = DiscordRest::new(config.auth.token.clone(), env.discord_api_base.clone())
        .map_err(BotError::from)?;
    let wiki = MediaWikiClient::new(env.wiki_endpoint.clone()).map_err(BotError::from)?;
    info!(
        api = %env.discord_api_base,
        wiki = %env.wiki_endpoint,
        "clients ready"
    );

    // 5. Status API.
    let status_state = Arc::new(StatusState::new(Arc::clone(&store), calendar, env.build_time));
    let status = StatusServer::bind(env.status_addr, status_state).await?;
    tokio::spawn(async move {
        if let Err(e) = status.serve_until(std::future::pending()).await {
            error!(error = %e, "status server stopped");
        }
    });

    // 6. Gateway and dispatch.
    let gateway = Gateway::new(config.auth.token, env.gateway_url.clone(), DEFAULT_INTENTS);
    let app = Arc::new(App::new(store, calendar, chat, wiki, env));
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let dispatcher = tokio::spawn(dispatch::run(app, rx));

    tokio::select! {
        result = gateway.run(tx) => result.map_err(BotError::from)?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown requested");
        }
    }

    // The sender is gone now, so the dispatcher drains and exits.
    dispatcher.await?;
    info!("attu-bot stopped");
    Ok(())
}
