//! Collaborator traits for the chat platform and the wiki.
//!
//! The year-advance transition and the command handlers never talk to
//! Discord or `MediaWiki` directly. They go through [`ChatClient`] and
//! [`WikiClient`], which the `attu-discord` and `attu-wiki` crates
//! implement over HTTP and which tests replace with in-memory fakes.

use std::future::Future;

use serde::Serialize;

use crate::snowflake::message_link;

/// A message the bot posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostedMessage {
    /// Message id (a snowflake).
    pub id: u64,
    /// Channel the message was posted in.
    pub channel_id: u64,
}

impl PostedMessage {
    /// Permalink to this message inside `guild_id`.
    pub fn link(&self, guild_id: u64) -> String {
        message_link(guild_id, self.channel_id, self.id)
    }
}

/// A thread inside a forum channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadHandle {
    /// Thread id; messages are posted to it like a channel.
    pub id: u64,
    /// Forum the thread belongs to.
    pub parent_id: u64,
    /// Thread title.
    pub name: String,
}

/// Errors returned by a [`ChatClient`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The request never produced a response.
    #[error("chat request failed: {message}")]
    Request {
        /// Transport error description.
        message: String,
    },

    /// The platform answered with a non-success status.
    #[error("chat API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response could not be decoded.
    #[error("unexpected chat API response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },

    /// A channel or thread does not exist where it was expected.
    #[error("{what} {id} not found")]
    NotFound {
        /// Kind of object looked up.
        what: &'static str,
        /// Id looked up.
        id: u64,
    },
}

/// Errors returned by a [`WikiClient`].
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    /// The request never produced a response.
    #[error("wiki request failed: {message}")]
    Request {
        /// Transport error description.
        message: String,
    },

    /// The wiki answered with a non-success HTTP status.
    #[error("wiki API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The API reported an error in its response body.
    #[error("wiki API error {code}: {info}")]
    Api {
        /// Machine-readable error code.
        code: String,
        /// Human-readable description.
        info: String,
    },

    /// The response could not be decoded.
    #[error("unexpected wiki API response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },

    /// Login was refused.
    #[error("wiki login failed: {reason}")]
    Auth {
        /// Result reported by the wiki.
        reason: String,
    },
}

/// The chat operations the core consumes.
pub trait ChatClient: Send + Sync {
    /// Post `content` to a channel or thread.
    fn send_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> impl Future<Output = Result<PostedMessage, ChatError>> + Send;

    /// Rename a channel.
    fn rename_channel(
        &self,
        channel_id: u64,
        name: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// Look up a thread and check that it belongs to `forum_id`.
    fn get_thread(
        &self,
        forum_id: u64,
        thread_id: u64,
    ) -> impl Future<Output = Result<ThreadHandle, ChatError>> + Send;

    /// React to a message with a unicode emoji.
    fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;
}

/// The wiki operations the core consumes.
///
/// Session handling (cookies, token renewal) is the implementor's concern.
pub trait WikiClient: Send + Sync {
    /// Log in with a bot password, returning the session's edit token.
    fn login(
        &self,
        user: &str,
        key: &str,
    ) -> impl Future<Output = Result<String, WikiError>> + Send;

    /// Current wikitext of a page.
    fn get_page_text(&self, title: &str) -> impl Future<Output = Result<String, WikiError>> + Send;

    /// Replace a page's text.
    fn edit_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
    ) -> impl Future<Output = Result<(), WikiError>> + Send;

    /// Block a wiki account indefinitely.
    fn block_user(
        &self,
        username: &str,
        reason: &str,
    ) -> impl Future<Output = Result<(), WikiError>> + Send;
}
