//! Gateway event dispatch.
//!
//! Reads events off the gateway channel and hands each interaction and
//! message to its own task, so a slow wiki call never holds up the next
//! command. The rollover timer starts on the first `READY`.

use std::sync::Arc;

use anyhow::Context;
use attu_core::platform::{ChatClient, WikiClient};
use attu_discord::model::{Interaction, MessageEvent, Ready};
use attu_discord::{DiscordRest, GatewayEvent};
use attu_wiki::MediaWikiClient;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::App;
use crate::commands::{self, Command, Reply};
use crate::registry;
use crate::report::report_error;
use crate::scheduler;

/// The production app.
pub type BotApp = App<DiscordRest, MediaWikiClient>;

/// Reply sent when a command failed unexpectedly.
pub const FAILED_REPLY: &str = "Failed: Something went wrong. The error has been reported.";

/// Permissions requested by the invite link.
const INVITE_PERMISSIONS: u64 = 207_952;

/// Dispatch events until the gateway closes the channel.
pub async fn run(app: Arc<BotApp>, mut events: mpsc::Receiver<GatewayEvent>) {
    let mut timer: Option<JoinHandle<()>> = None;

    while let Some(event) = events.recv().await {
        match event {
            GatewayEvent::Ready(ready) => {
                on_ready(&app, &ready).await;
                if timer.is_none() {
                    timer = Some(tokio::spawn(scheduler::run(Arc::clone(&app))));
                    info!("rollover timer started");
                }
            }
            GatewayEvent::InteractionCreate(interaction) => {
                let app = Arc::clone(&app);
                tokio::spawn(async move { on_interaction(&app, &interaction).await });
            }
            GatewayEvent::MessageCreate(message) => {
                let app = Arc::clone(&app);
                tokio::spawn(async move { on_message(&app, &message).await });
            }
        }
    }

    if let Some(timer) = timer {
        timer.abort();
    }
    info!("event stream closed");
}

async fn on_ready(app: &BotApp, ready: &Ready) {
    let application_id = ready.application.id.get();
    info!(
        user = %ready.user.username,
        user_id = ready.user.id.get(),
        "logged in"
    );
    info!(
        "add to a server: https://discord.com/oauth2/authorize?client_id={application_id}&scope=bot%20applications.commands&permissions={INVITE_PERMISSIONS}"
    );

    let config = app.store.snapshot().await;
    let definitions = registry::definitions();
    for guild_id in [config.guilds.attu, config.guilds.jhn] {
        let result = app
            .chat
            .register_guild_commands(application_id, guild_id, &definitions)
            .await
            .with_context(|| format!("registering commands in guild {guild_id}"));
        match result {
            Ok(()) => info!(guild_id, count = definitions.len(), "commands registered"),
            Err(err) => {
                report_error(&app.chat, config.channels.error_log, "on_ready", &err).await;
            }
        }
    }
}

async fn on_interaction(app: &BotApp, interaction: &Interaction) {
    let Some(data) = interaction.command() else {
        debug!(kind = interaction.kind, "ignoring non-command interaction");
        return;
    };
    let interaction_id = interaction.id.get();
    let token = interaction.token.as_str();
    let invoker = interaction.invoker_id().unwrap_or_default();
    info!(command = %data.name, invoker, "command received");

    let command = match Command::parse(data) {
        Ok(command) => command,
        Err(e) => {
            let reply = Reply::ephemeral(e.to_string());
            respond(app, interaction, &reply).await;
            return;
        }
    };

    // Refusals answer immediately so they stay private; a deferred reply
    // can only be edited into a public message.
    let owner = app.store.snapshot().await.users.bot_owner;
    if let Some(refusal) = command.refusal(invoker, owner) {
        respond(app, interaction, &refusal).await;
        return;
    }

    if command.is_slow() {
        if let Err(e) = app.chat.defer(interaction_id, token, false).await {
            let channel = app.store.snapshot().await.channels.error_log;
            report_error(&app.chat, channel, "defer", &anyhow::Error::from(e)).await;
            return;
        }
        let reply = run_command(app, invoker, command, &data.name).await;
        let edited = app
            .chat
            .edit_original(interaction.application_id.get(), token, &reply.content)
            .await;
        if let Err(e) = edited {
            let channel = app.store.snapshot().await.channels.error_log;
            report_error(&app.chat, channel, "edit reply", &anyhow::Error::from(e)).await;
        }
    } else {
        let reply = run_command(app, invoker, command, &data.name).await;
        respond(app, interaction, &reply).await;
    }
}

async fn respond(app: &BotApp, interaction: &Interaction, reply: &Reply) {
    let result = app
        .chat
        .respond(
            interaction.id.get(),
            &interaction.token,
            &reply.content,
            reply.ephemeral,
        )
        .await;
    if let Err(e) = result {
        let channel = app.store.snapshot().await.channels.error_log;
        report_error(&app.chat, channel, "respond", &anyhow::Error::from(e)).await;
    }
}

/// Execute a command, turning an unexpected failure into a report plus a
/// generic reply.
pub async fn run_command<C, W>(app: &App<C, W>, invoker: u64, command: Command, name: &str) -> Reply
where
    C: ChatClient,
    W: WikiClient,
{
    match commands::execute(app, invoker, command, Utc::now()).await {
        Ok(reply) => reply,
        Err(err) => {
            let channel = app.store.snapshot().await.channels.error_log;
            report_error(&app.chat, channel, &format!("/{name}"), &err).await;
            Reply::ephemeral(FAILED_REPLY)
        }
    }
}

/// Handle a posted message. Bot authors are not filtered: `[DoomBot]`
/// posts come from another bot or a webhook.
async fn on_message<C, W>(app: &App<C, W>, message: &MessageEvent)
where
    C: ChatClient,
{
    let result = commands::react_to_activity(
        app,
        message.channel_id.get(),
        message.id.get(),
        &message.content,
    )
    .await;
    if let Err(e) = result {
        let channel = app.store.snapshot().await.channels.error_log;
        report_error(&app.chat, channel, "on_message", &anyhow::Error::from(e)).await;
    }
}
