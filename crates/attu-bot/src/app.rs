//! Application context shared by every handler and task.

use std::sync::Arc;

use attu_core::calendar::Calendar;
use attu_core::config::ConfigStore;

use crate::env::BotEnv;

/// Everything a command handler or the daily timer needs.
///
/// Generic over the chat and wiki clients so handlers run against the
/// in-memory fakes in tests.
#[derive(Debug)]
pub struct App<C, W> {
    /// The live config document.
    pub store: Arc<ConfigStore>,
    /// Epoch calendar in the reference zone.
    pub calendar: Calendar,
    /// Chat platform client.
    pub chat: C,
    /// Wiki client.
    pub wiki: W,
    /// Process environment.
    pub env: BotEnv,
}

impl<C, W> App<C, W> {
    /// Bundle the collaborators.
    pub const fn new(store: Arc<ConfigStore>, calendar: Calendar, chat: C, wiki: W, env: BotEnv) -> Self {
        Self {
            store,
            calendar,
            chat,
            wiki,
            env,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Shared fixtures for the binary's unit tests.

    use std::sync::Arc;

    use attu_core::calendar::Calendar;
    use attu_core::config::{BotConfig, ConfigStore};
    use attu_core::testing::{FakeChat, FakeWiki, TempStore};
    use chrono_tz::America::New_York;

    use super::App;
    use crate::env::BotEnv;

    /// A fake-backed app plus the temp dir keeping its config alive.
    pub struct TestApp {
        pub app: Arc<App<FakeChat, FakeWiki>>,
        pub fixture: TempStore,
    }

    #[allow(clippy::unwrap_used)]
    pub fn test_app(edit: impl FnOnce(&mut BotConfig)) -> TestApp {
        let fixture = TempStore::sample(edit).unwrap();
        let store = Arc::new(ConfigStore::open(&fixture.path).unwrap());
        let env = BotEnv::from_lookup(|name| {
            (name == "BOT_CONFIG_FILE").then(|| fixture.path.display().to_string())
        })
        .unwrap();
        let app = App::new(
            store,
            Calendar::with_default_reset(New_York),
            FakeChat::new(),
            FakeWiki::with_page("Intro\n'''Current Year: 2 PC'''\nOutro"),
            env,
        );
        TestApp {
            app: Arc::new(app),
            fixture,
        }
    }
}
