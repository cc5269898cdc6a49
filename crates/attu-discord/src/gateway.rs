//! Discord gateway client.
//!
//! Keeps one WebSocket session to the gateway alive and forwards the
//! dispatch events the bot cares about over an `mpsc` channel.
//!
//! # Session lifecycle
//!
//! 1. Connect and wait for `Hello` (op 10) carrying the heartbeat interval.
//! 2. Send `Identify` (op 2), or `Resume` (op 6) when a previous session
//!    can be continued.
//! 3. Heartbeat (op 1) every interval, starting after a random fraction of
//!    it. A heartbeat sent while the previous one is still unacknowledged
//!    means the connection is dead; it is dropped and resumed.
//! 4. Reconnect on `Reconnect` (op 7), `Invalid Session` (op 9), or a
//!    non-fatal close. Authentication and intent errors end the session
//!    for good.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::model::{Interaction, MessageEvent, Ready};

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// `GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT`.
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 15);

/// Pause between a lost connection and the next attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RESUME: u8 = 6;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// Events forwarded to the bot.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Session established.
    Ready(Box<Ready>),
    /// A slash command (or other interaction) was invoked.
    InteractionCreate(Box<Interaction>),
    /// A message was posted.
    MessageCreate(Box<MessageEvent>),
}

/// Errors that end a connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The WebSocket could not be opened or broke.
    #[error("gateway connection failed: {0}")]
    Connection(String),

    /// The gateway sent something unexpected.
    #[error("gateway protocol error: {0}")]
    Protocol(String),

    /// The gateway closed with a code that must not be retried.
    #[error("gateway closed the session with fatal code {code}: {reason}")]
    Fatal {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Nobody is listening for events any more.
    #[error("gateway event receiver dropped")]
    ReceiverClosed,
}

/// What to do after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnect {
    /// Reconnect and resume the current session.
    Resume,
    /// Reconnect with a fresh identify.
    Fresh,
}

/// Classify a gateway close code.
///
/// Returns `None` for codes that must not be retried.
pub const fn close_action(code: u16) -> Option<Reconnect> {
    match code {
        // Authentication failed, invalid shard, sharding required,
        // invalid API version, invalid or disallowed intents.
        4004 | 4010..=4014 => None,
        // Invalid sequence, session timed out.
        4007 | 4009 => Some(Reconnect::Fresh),
        _ => Some(Reconnect::Resume),
    }
}

/// Decode a dispatch event the bot handles; other events yield `None`.
///
/// # Errors
///
/// Returns the decode error if a handled event has an unexpected shape.
pub fn parse_dispatch(name: &str, data: Value) -> Result<Option<GatewayEvent>, serde_json::Error> {
    let event = match name {
        "READY" => GatewayEvent::Ready(Box::new(serde_json::from_value(data)?)),
        "INTERACTION_CREATE" => GatewayEvent::InteractionCreate(Box::new(serde_json::from_value(data)?)),
        "MESSAGE_CREATE" => GatewayEvent::MessageCreate(Box::new(serde_json::from_value(data)?)),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

#[derive(Debug, Deserialize)]
struct Payload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    id: String,
    resume_url: String,
}

/// A gateway connection manager.
#[derive(Debug)]
pub struct Gateway {
    token: String,
    url: String,
    intents: u64,
    session: Option<Session>,
    seq: Option<u64>,
}

impl Gateway {
    /// Create a gateway client; nothing connects until [`run`](Self::run).
    pub fn new(token: impl Into<String>, url: impl Into<String>, intents: u64) -> Self {
        Self {
            token: token.into(),
            url: url.into(),
            intents,
            session: None,
            seq: None,
        }
    }

    /// Connect and forward events until a fatal close or until `events`
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Fatal`] when Discord refuses the session.
    pub async fn run(mut self, events: mpsc::Sender<GatewayEvent>) -> Result<(), GatewayError> {
        loop {
            match self.connect_once(&events).await {
                Ok(Reconnect::Resume) => info!("gateway reconnecting"),
                Ok(Reconnect::Fresh) => {
                    info!("gateway session invalidated; identifying again");
                    self.session = None;
                    self.seq = None;
                }
                Err(GatewayError::ReceiverClosed) => {
                    info!("gateway shutting down");
                    return Ok(());
                }
                Err(e @ GatewayError::Fatal { .. }) => return Err(e),
                Err(e) => warn!(error = %e, "gateway connection lost"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    fn identify_payload(&self) -> Value {
        json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "attu-bot",
                    "device": "attu-bot"
                }
            }
        })
    }

    fn resume_payload(&self, session: &Session) -> Value {
        json!({
            "op": OP_RESUME,
            "d": { "token": self.token, "session_id": session.id, "seq": self.seq }
        })
    }

    async fn connect_once(&mut self, events: &mpsc::Sender<GatewayEvent>) -> Result<Reconnect, GatewayError> {
        let base = self
            .session
            .as_ref()
            .map_or(self.url.as_str(), |s| s.resume_url.as_str());
        let ws_url = format!("{}/?v=10&encoding=json", base.trim_end_matches('/'));
        debug!(url = %ws_url, "connecting to gateway");

        let (stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let hello = match read.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<Payload>(&text)
                .map_err(|e| GatewayError::Protocol(format!("bad hello: {e}")))?,
            Some(Ok(other)) => {
                return Err(GatewayError::Protocol(format!("unexpected hello frame: {other:?}")));
            }
            Some(Err(e)) => return Err(GatewayError::Connection(e.to_string())),
            None => return Ok(Reconnect::Resume),
        };
        if hello.op != OP_HELLO {
            return Err(GatewayError::Protocol(format!("expected hello, got op {}", hello.op)));
        }
        let interval_ms = hello
            .d
            .get("heartbeat_interval")
            .and_then(Value::as_u64)
            .unwrap_or(41_250)
            .max(1);
        let period = Duration::from_millis(interval_ms);

        let handshake = match &self.session {
            Some(session) => self.resume_payload(session),
            None => self.identify_payload(),
        };
        write
            .send(Message::Text(handshake.to_string()))
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let jitter = Duration::from_millis(rand::random_range(0..interval_ms));
        let first_beat = Instant::now().checked_add(jitter).unwrap_or_else(Instant::now);
        let mut heartbeat = tokio::time::interval_at(first_beat, period);
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        warn!("heartbeat not acknowledged; dropping connection");
                        return Ok(Reconnect::Resume);
                    }
                    let beat = json!({ "op": OP_HEARTBEAT, "d": self.seq });
                    write
                        .send(Message::Text(beat.to_string()))
                        .await
                        .map_err(|e| GatewayError::Connection(e.to_string()))?;
                    awaiting_ack = true;
                }
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(close))) => {
                            let (code, reason) = close
                                .map(|f| (u16::from(f.code), f.reason.into_owned()))
                                .unwrap_or((1000, String::new()));
                            return close_action(code).ok_or(GatewayError::Fatal { code, reason });
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(GatewayError::Connection(e.to_string())),
                        None => return Ok(Reconnect::Resume),
                    };

                    let payload: Payload = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(error = %e, "undecodable gateway payload");
                            continue;
                        }
                    };

                    match payload.op {
                        OP_DISPATCH => {
                            if payload.s.is_some() {
                                self.seq = payload.s;
                            }
                            let name = payload.t.unwrap_or_default();
                            self.dispatch(&name, payload.d, events).await?;
                        }
                        OP_HEARTBEAT => {
                            let beat = json!({ "op": OP_HEARTBEAT, "d": self.seq });
                            write
                                .send(Message::Text(beat.to_string()))
                                .await
                                .map_err(|e| GatewayError::Connection(e.to_string()))?;
                        }
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        OP_RECONNECT => return Ok(Reconnect::Resume),
                        OP_INVALID_SESSION => {
                            let resumable = payload.d.as_bool().unwrap_or(false);
                            return Ok(if resumable { Reconnect::Resume } else { Reconnect::Fresh });
                        }
                        op => debug!(op, "ignoring gateway opcode"),
                    }
                }
            }
        }
    }

    async fn dispatch(
        &mut self,
        name: &str,
        data: Value,
        events: &mpsc::Sender<GatewayEvent>,
    ) -> Result<(), GatewayError> {
        if name == "RESUMED" {
            info!("gateway session resumed");
            return Ok(());
        }
        let event = match parse_dispatch(name, data) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(event = name, error = %e, "undecodable dispatch event");
                return Ok(());
            }
        };
        if let GatewayEvent::Ready(ready) = &event {
            info!(user = %ready.user.username, session = %ready.session_id, "gateway ready");
            self.session = Some(Session {
                id: ready.session_id.clone(),
                resume_url: ready.resume_gateway_url.clone(),
            });
        }
        if events.send(event).await.is_err() {
            return Err(GatewayError::ReceiverClosed);
        }
        Ok(())
    }
}
