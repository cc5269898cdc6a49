//! Configuration document and its persistent store.
//!
//! The bot keeps every tunable and every piece of mutable state in a single
//! JSON document whose path comes from `BOT_CONFIG_FILE`. This module defines
//! strongly-typed structs that mirror the JSON structure and the
//! [`ConfigStore`] that owns the live copy.
//!
//! # Write path
//!
//! All mutations go through [`ConfigStore::update`], which applies a mutator
//! to a copy of the current document, persists the copy (write to a sibling
//! temp file, then rename), and only then publishes it in memory. Mutations
//! are serialized by an async mutex, so two admin commands cannot interleave
//! their read-modify-write inside one process.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

/// Config document version this build understands.
pub const CONFIG_VERSION: &str = "v1.5";

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file missing: {}", .path.display())]
    Missing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The document was written for a different schema version.
    #[error("incompatible config version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version compiled into this build.
        expected: &'static str,
        /// Version found in the document.
        found: String,
    },

    /// Failed to read or write the configuration file.
    #[error("config file I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("failed to parse config JSON: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// The complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Schema version, must equal [`CONFIG_VERSION`].
    pub config_version: String,
    /// Chat platform credentials.
    pub auth: AuthConfig,
    /// Privileged users.
    pub users: UsersConfig,
    /// Wiki account and the page mirroring the current year.
    pub wiki: WikiConfig,
    /// Channel ids the bot posts to or listens on.
    pub channels: ChannelsConfig,
    /// Role ids.
    pub roles: RolesConfig,
    /// Epoch parameters.
    pub epoch: EpochConfig,
    /// Guild ids.
    pub guilds: GuildsConfig,
    /// Message id of the anchor posted when each year began.
    ///
    /// `timestamps[i]` marks the start of year `i + 1`.
    #[serde(default)]
    pub timestamps: Vec<u64>,
}

impl BotConfig {
    /// Parse and version-check a configuration document.
    ///
    /// The version is checked before the schema so an old document is
    /// reported as a version mismatch rather than a missing-field error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::VersionMismatch`] if `config_version` is not
    /// [`CONFIG_VERSION`], or [`ConfigError::Json`] if the JSON is invalid.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        let found = raw
            .get("config_version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if found != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch {
                expected: CONFIG_VERSION,
                found: found.to_owned(),
            });
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Serialize the document the way it is stored on disk (4-space indent).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| ConfigError::Io {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// Number of years with a recorded anchor.
    pub fn recorded_years(&self) -> i64 {
        i64::try_from(self.timestamps.len()).unwrap_or(i64::MAX)
    }
}

/// Chat platform credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bot token.
    pub token: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Privileged users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersConfig {
    /// The only user allowed to run `admin`, `debug` and `wiki_block`.
    pub bot_owner: u64,
}

/// Wiki account and page.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Bot password for the wiki account.
    pub key: String,
    /// Title of the page carrying the `Current Year: N PC` marker.
    pub page: String,
    /// Wiki account name.
    pub user: String,
}

impl fmt::Debug for WikiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiConfig")
            .field("key", &"<redacted>")
            .field("page", &self.page)
            .field("user", &self.user)
            .finish()
    }
}

/// Channel ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel watched for `[DoomBot]` activity posts.
    pub activity: u64,
    /// Voice channel whose name shows the current year.
    pub year_vc: u64,
    /// Channel receiving the new-year announcement.
    pub announcements: u64,
    /// Forum containing the year-links thread.
    pub doom_forum: u64,
    /// Thread (inside `doom_forum`) collecting links to every year marker.
    pub year_links: u64,
    /// Out-of-character chat, accepted by `link_year`.
    pub meta_chat: u64,
    /// Channel receiving error reports.
    pub error_log: u64,
    /// Channels receiving the year-marker post at rollover.
    #[serde(default)]
    pub lore_channels: Vec<u64>,
}

/// Role ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Role mentioned in the new-year announcement.
    pub leaders: u64,
}

/// Epoch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Epoch anchor instant, seconds since the Unix epoch.
    pub time: i64,
    /// Year number in effect at the anchor.
    pub year: i64,
    /// Real days per in-universe year.
    pub length: i64,
    /// Whether time is stopped.
    #[serde(default)]
    pub paused: bool,
}

/// Guild ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildsConfig {
    /// The community guild; permalinks point here.
    pub attu: u64,
    /// The development guild.
    pub jhn: u64,
}

/// Owner of the live configuration document.
///
/// Reads hand out clones; writes go through [`update`](Self::update).
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: Mutex<BotConfig>,
}

impl ConfigStore {
    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the file does not exist,
    /// [`ConfigError::VersionMismatch`] on a version mismatch, or
    /// [`ConfigError::Io`]/[`ConfigError::Json`] if it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = read_document(&path)?;
        info!(
            path = %path.display(),
            epoch_year = config.epoch.year,
            recorded_years = config.timestamps.len(),
            "config loaded"
        );
        Ok(Self {
            path,
            current: Mutex::new(config),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current document.
    pub async fn snapshot(&self) -> BotConfig {
        self.current.lock().await.clone()
    }

    /// Apply `mutator` to the document and persist the result.
    ///
    /// The in-memory document only changes once the file has been written.
    /// If the mutator leaves the document unchanged nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document cannot be serialized or
    /// written; the in-memory document is then left untouched.
    pub async fn update<R>(
        &self,
        mutator: impl FnOnce(&mut BotConfig) -> R,
    ) -> Result<R, ConfigError> {
        let mut guard = self.current.lock().await;
        let mut next = guard.clone();
        let out = mutator(&mut next);
        if next != *guard {
            write_document(&self.path, &next)?;
            info!(path = %self.path.display(), "config saved");
            *guard = next;
        }
        Ok(out)
    }

    /// Re-read the backing file, replacing the in-memory document.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open); on error the current document is kept.
    pub async fn reload(&self) -> Result<(), ConfigError> {
        let mut guard = self.current.lock().await;
        *guard = read_document(&self.path)?;
        info!(path = %self.path.display(), "config reloaded");
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<BotConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    BotConfig::parse(&contents)
}

fn write_document(path: &Path, config: &BotConfig) -> Result<(), ConfigError> {
    let json = config.to_json()?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
