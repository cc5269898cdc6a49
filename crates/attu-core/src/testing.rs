//! In-memory collaborators and fixtures for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util`
//! feature, for downstream crates' tests.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{BotConfig, ConfigStore};
use crate::platform::{ChatClient, ChatError, PostedMessage, ThreadHandle, WikiClient, WikiError};

/// A representative configuration document.
///
/// Lore channels are 10 and 11, the year-links thread is 5 inside forum 4,
/// the owner is user 42 and the community guild is 100.
pub const SAMPLE_CONFIG: &str = r#"{
    "config_version": "v1.5",
    "auth": { "token": "secret-token" },
    "users": { "bot_owner": 42 },
    "wiki": { "key": "wiki-key", "page": "Timeline", "user": "AttuBot" },
    "channels": {
        "activity": 1, "year_vc": 2, "announcements": 3, "doom_forum": 4,
        "year_links": 5, "meta_chat": 6, "error_log": 7,
        "lore_channels": [10, 11]
    },
    "roles": { "leaders": 8 },
    "epoch": { "time": 1704517200, "year": 3, "length": 14, "paused": false },
    "guilds": { "attu": 100, "jhn": 200 },
    "timestamps": [1000, 2000]
}"#;

/// A config store backed by a file in a temporary directory.
///
/// The directory lives as long as the returned guard.
pub struct TempStore {
    /// The store under test.
    pub store: ConfigStore,
    /// Location of the backing file.
    pub path: PathBuf,
    _dir: tempfile::TempDir,
}

impl TempStore {
    /// Write `config` to a fresh temporary file and open it.
    ///
    /// # Errors
    ///
    /// Returns an I/O or config error if the fixture cannot be created.
    pub fn new(config: &BotConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, config.to_json()?)?;
        let store = ConfigStore::open(&path)?;
        Ok(Self {
            store,
            path,
            _dir: dir,
        })
    }

    /// Open a store holding [`SAMPLE_CONFIG`] after applying `edit`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn sample(edit: impl FnOnce(&mut BotConfig)) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = BotConfig::parse(SAMPLE_CONFIG)?;
        edit(&mut config);
        Self::new(&config)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a [`FakeChat`] was asked to do.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    /// `(channel, content)` for every message sent.
    pub sent: Vec<(u64, String)>,
    /// `(channel, name)` for every rename.
    pub renamed: Vec<(u64, String)>,
    /// `(channel, message, emoji)` for every reaction.
    pub reactions: Vec<(u64, u64, String)>,
}

#[derive(Debug, Default)]
struct FakeChatState {
    log: ChatLog,
    next_id: u64,
    fail_channel: Option<u64>,
    fail_rename: bool,
    missing_thread: bool,
}

/// A [`ChatClient`] that records calls and hands out sequential ids.
#[derive(Debug)]
pub struct FakeChat {
    state: Mutex<FakeChatState>,
}

impl Default for FakeChat {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChat {
    /// A fake whose first message id is 5000.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeChatState {
                next_id: 5000,
                ..FakeChatState::default()
            }),
        }
    }

    /// Make every send to `channel_id` fail.
    pub fn fail_sends_to(&self, channel_id: u64) {
        lock(&self.state).fail_channel = Some(channel_id);
    }

    /// Make every rename fail.
    pub fn fail_renames(&self) {
        lock(&self.state).fail_rename = true;
    }

    /// Make every thread lookup fail.
    pub fn hide_threads(&self) {
        lock(&self.state).missing_thread = true;
    }

    /// A copy of the call log.
    pub fn log(&self) -> ChatLog {
        lock(&self.state).log.clone()
    }
}

impl ChatClient for FakeChat {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<PostedMessage, ChatError> {
        let mut state = lock(&self.state);
        if state.fail_channel == Some(channel_id) {
            return Err(ChatError::Status {
                status: 403,
                body: "Missing Access".to_owned(),
            });
        }
        let id = state.next_id;
        state.next_id = id.saturating_add(1);
        state.log.sent.push((channel_id, content.to_owned()));
        Ok(PostedMessage { id, channel_id })
    }

    async fn rename_channel(&self, channel_id: u64, name: &str) -> Result<(), ChatError> {
        let mut state = lock(&self.state);
        if state.fail_rename {
            return Err(ChatError::Status {
                status: 429,
                body: "rate limited".to_owned(),
            });
        }
        state.log.renamed.push((channel_id, name.to_owned()));
        Ok(())
    }

    async fn get_thread(&self, forum_id: u64, thread_id: u64) -> Result<ThreadHandle, ChatError> {
        if lock(&self.state).missing_thread {
            return Err(ChatError::NotFound {
                what: "thread",
                id: thread_id,
            });
        }
        Ok(ThreadHandle {
            id: thread_id,
            parent_id: forum_id,
            name: "Year Links".to_owned(),
        })
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), ChatError> {
        lock(&self.state)
            .log
            .reactions
            .push((channel_id, message_id, emoji.to_owned()));
        Ok(())
    }
}

/// Everything a [`FakeWiki`] was asked to do.
#[derive(Debug, Default, Clone)]
pub struct WikiLog {
    /// Users that logged in.
    pub logins: Vec<String>,
    /// `(title, text, summary)` for every edit.
    pub edits: Vec<(String, String, String)>,
    /// `(user, reason)` for every block.
    pub blocks: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct FakeWikiState {
    log: WikiLog,
    page_text: String,
    reject_login: bool,
}

/// A [`WikiClient`] holding a single page in memory.
#[derive(Debug, Default)]
pub struct FakeWiki {
    state: Mutex<FakeWikiState>,
}

impl FakeWiki {
    /// A wiki whose page currently reads `text`.
    pub fn with_page(text: &str) -> Self {
        Self {
            state: Mutex::new(FakeWikiState {
                page_text: text.to_owned(),
                ..FakeWikiState::default()
            }),
        }
    }

    /// Refuse every login.
    pub fn reject_logins(&self) {
        lock(&self.state).reject_login = true;
    }

    /// Current page text.
    pub fn page_text(&self) -> String {
        lock(&self.state).page_text.clone()
    }

    /// A copy of the call log.
    pub fn log(&self) -> WikiLog {
        lock(&self.state).log.clone()
    }
}

impl WikiClient for FakeWiki {
    async fn login(&self, user: &str, _key: &str) -> Result<String, WikiError> {
        let mut state = lock(&self.state);
        if state.reject_login {
            return Err(WikiError::Auth {
                reason: "Failed".to_owned(),
            });
        }
        state.log.logins.push(user.to_owned());
        Ok("csrf+\\".to_owned())
    }

    async fn get_page_text(&self, _title: &str) -> Result<String, WikiError> {
        Ok(lock(&self.state).page_text.clone())
    }

    async fn edit_page(&self, title: &str, text: &str, summary: &str) -> Result<(), WikiError> {
        let mut state = lock(&self.state);
        state.page_text = text.to_owned();
        state
            .log
            .edits
            .push((title.to_owned(), text.to_owned(), summary.to_owned()));
        Ok(())
    }

    async fn block_user(&self, username: &str, reason: &str) -> Result<(), WikiError> {
        lock(&self.state)
            .log
            .blocks
            .push((username.to_owned(), reason.to_owned()));
        Ok(())
    }
}
