//! Discord REST client (API v10).
//!
//! [`DiscordRest`] implements [`ChatClient`] for the year-advance
//! transition and carries the interaction endpoints the command handlers
//! need: immediate replies, deferred replies with a later edit, and bulk
//! registration of guild commands.

use attu_core::platform::{ChatClient, ChatError, PostedMessage, ThreadHandle};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::model::{CommandDefinition, Snowflake};

/// Base URL of the Discord REST API.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Interaction callback: reply with a message.
const CALLBACK_MESSAGE: u8 = 4;
/// Interaction callback: acknowledge now, edit the reply later.
const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
/// Message flag: only the invoker sees the reply.
const FLAG_EPHEMERAL: u64 = 1 << 6;

#[derive(Deserialize)]
struct MessageResponse {
    id: Snowflake,
    channel_id: Snowflake,
}

#[derive(Deserialize)]
struct ChannelResponse {
    id: Snowflake,
    parent_id: Option<Snowflake>,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct GatewayResponse {
    url: String,
}

/// Authenticated Discord REST client.
#[derive(Debug, Clone)]
pub struct DiscordRest {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl DiscordRest {
    /// Create a client using a bot token against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Request`] if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, base: impl Into<String>) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/attu-project/attu-bot, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| ChatError::Request {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ChatError> {
        let url = format!("{}{path}", self.base);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ChatError::Request {
            message: format!("{method} {path}: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%method, path, status = status.as_u16(), "discord request");
        Ok(response)
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ChatError> {
        self.call(method, path, body)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Decode {
                message: format!("{path}: {e}"),
            })
    }

    /// Reply to an interaction with a message.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if Discord rejects the callback.
    pub async fn respond(
        &self,
        interaction_id: u64,
        token: &str,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), ChatError> {
        let body = json!({
            "type": CALLBACK_MESSAGE,
            "data": { "content": content, "flags": flags(ephemeral) }
        });
        self.call(
            Method::POST,
            &format!("/interactions/{interaction_id}/{token}/callback"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Acknowledge an interaction whose reply comes later.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if Discord rejects the callback.
    pub async fn defer(&self, interaction_id: u64, token: &str, ephemeral: bool) -> Result<(), ChatError> {
        let body = json!({
            "type": CALLBACK_DEFERRED_MESSAGE,
            "data": { "flags": flags(ephemeral) }
        });
        self.call(
            Method::POST,
            &format!("/interactions/{interaction_id}/{token}/callback"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Replace the content of a (deferred) interaction reply.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if Discord rejects the edit.
    pub async fn edit_original(
        &self,
        application_id: u64,
        token: &str,
        content: &str,
    ) -> Result<(), ChatError> {
        let body = json!({ "content": content });
        self.call(
            Method::PATCH,
            &format!("/webhooks/{application_id}/{token}/messages/@original"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Replace every command registered in a guild.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if Discord rejects the definitions.
    pub async fn register_guild_commands(
        &self,
        application_id: u64,
        guild_id: u64,
        commands: &[CommandDefinition],
    ) -> Result<(), ChatError> {
        let body = serde_json::to_value(commands).map_err(|e| ChatError::Decode {
            message: format!("command definitions: {e}"),
        })?;
        self.call(
            Method::PUT,
            &format!("/applications/{application_id}/guilds/{guild_id}/commands"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Gateway URL recommended for this bot.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if the lookup fails.
    pub async fn gateway_url(&self) -> Result<String, ChatError> {
        let gateway: GatewayResponse = self.call_json(Method::GET, "/gateway/bot", None).await?;
        Ok(gateway.url)
    }
}

const fn flags(ephemeral: bool) -> u64 {
    if ephemeral { FLAG_EPHEMERAL } else { 0 }
}

impl ChatClient for DiscordRest {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<PostedMessage, ChatError> {
        let body = json!({ "content": content });
        let message: MessageResponse = self
            .call_json(
                Method::POST,
                &format!("/channels/{channel_id}/messages"),
                Some(&body),
            )
            .await?;
        Ok(PostedMessage {
            id: message.id.get(),
            channel_id: message.channel_id.get(),
        })
    }

    async fn rename_channel(&self, channel_id: u64, name: &str) -> Result<(), ChatError> {
        let body = json!({ "name": name });
        self.call(Method::PATCH, &format!("/channels/{channel_id}"), Some(&body))
            .await?;
        Ok(())
    }

    async fn get_thread(&self, forum_id: u64, thread_id: u64) -> Result<ThreadHandle, ChatError> {
        let channel: ChannelResponse = match self
            .call_json(Method::GET, &format!("/channels/{thread_id}"), None)
            .await
        {
            Err(ChatError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(ChatError::NotFound {
                    what: "thread",
                    id: thread_id,
                });
            }
            other => other?,
        };

        if channel.parent_id.map(Snowflake::get) != Some(forum_id) {
            return Err(ChatError::NotFound {
                what: "thread in forum",
                id: thread_id,
            });
        }

        Ok(ThreadHandle {
            id: channel.id.get(),
            parent_id: forum_id,
            name: channel.name,
        })
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), ChatError> {
        let emoji = urlencoding::encode(emoji);
        self.call(
            Method::PUT,
            &format!("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
            None,
        )
        .await?;
        Ok(())
    }
}
