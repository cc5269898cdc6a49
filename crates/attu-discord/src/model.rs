//! Discord API payloads the bot reads and writes.
//!
//! Only the fields the bot uses are modelled; unknown fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interaction type of a slash-command invocation.
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Application command option type: string.
pub const OPTION_STRING: u8 = 3;
/// Application command option type: integer.
pub const OPTION_INTEGER: u8 = 4;
/// Application command option type: channel.
pub const OPTION_CHANNEL: u8 = 7;

/// Channel type: guild text channel.
pub const CHANNEL_GUILD_TEXT: u8 = 0;

/// A Discord id.
///
/// The API sends ids as strings; numbers are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawId")]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl TryFrom<RawId> for Snowflake {
    type Error = std::num::ParseIntError;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        match raw {
            RawId::Text(s) => s.parse().map(Self),
            RawId::Number(n) => Ok(Self(n)),
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// User id.
    pub id: Snowflake,
    /// Account name.
    #[serde(default)]
    pub username: String,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

/// A guild member; wraps the user for interactions inside a guild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    /// The member's user.
    pub user: Option<User>,
}

/// Slash-command invocation data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandData {
    /// Command name.
    pub name: String,
    /// Options supplied by the user.
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandData {
    /// Raw value of an option.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
    }

    /// Integer option.
    pub fn int_option(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    /// String option.
    pub fn str_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Channel (or other id-valued) option.
    pub fn id_option(&self, name: &str) -> Option<u64> {
        match self.option(name)? {
            Value::String(s) => s.parse().ok(),
            other => other.as_u64(),
        }
    }
}

/// One option of a slash-command invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandOption {
    /// Option name.
    pub name: String,
    /// Option type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Supplied value.
    pub value: Option<Value>,
}

/// An `INTERACTION_CREATE` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Interaction {
    /// Interaction id.
    pub id: Snowflake,
    /// Application the interaction is for.
    pub application_id: Snowflake,
    /// Interaction type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Continuation token for responses and follow-ups.
    pub token: String,
    /// Guild it was invoked in.
    pub guild_id: Option<Snowflake>,
    /// Channel it was invoked in.
    pub channel_id: Option<Snowflake>,
    /// Invoking member (guild interactions).
    pub member: Option<Member>,
    /// Invoking user (direct-message interactions).
    pub user: Option<User>,
    /// Command data.
    pub data: Option<CommandData>,
}

impl Interaction {
    /// Id of the user who invoked the interaction.
    pub fn invoker_id(&self) -> Option<u64> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.get())
    }

    /// Command data if this is a slash-command invocation.
    pub fn command(&self) -> Option<&CommandData> {
        if self.kind != INTERACTION_APPLICATION_COMMAND {
            return None;
        }
        self.data.as_ref()
    }
}

/// A `MESSAGE_CREATE` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    /// Message id.
    pub id: Snowflake,
    /// Channel the message was posted in.
    pub channel_id: Snowflake,
    /// Guild, if any.
    pub guild_id: Option<Snowflake>,
    /// Author.
    pub author: User,
    /// Text content (empty without the message-content intent).
    #[serde(default)]
    pub content: String,
}

/// The application a gateway session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartialApplication {
    /// Application id.
    pub id: Snowflake,
}

/// A `READY` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ready {
    /// Session id, needed to resume.
    pub session_id: String,
    /// Gateway URL to resume on.
    pub resume_gateway_url: String,
    /// The bot's own user.
    pub user: User,
    /// The bot's application.
    pub application: PartialApplication,
}

/// A slash command to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    /// Command name.
    pub name: String,
    /// Description shown in the client.
    pub description: String,
    /// Options.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
}

/// An option of a slash command to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDefinition {
    /// Option type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Option name.
    pub name: String,
    /// Description shown in the client.
    pub description: String,
    /// Whether the option must be supplied.
    pub required: bool,
    /// Fixed choices, if any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    /// Allowed channel types for channel options.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<u8>,
}

/// A fixed string choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionChoice {
    /// Label shown in the client.
    pub name: String,
    /// Value sent back.
    pub value: String,
}
