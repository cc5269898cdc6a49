//! Slash commands and the activity-channel reaction.
//!
//! [`Command::parse`] turns interaction data into a typed command and
//! [`execute`] runs it against an [`App`]. Expected refusals (a non-owner
//! calling an owner command, a year out of range) come back as ephemeral
//! [`Reply`]s. Anything else is an `Err` for the dispatcher to report.

use anyhow::Context;
use attu_core::advance::advance_year;
use attu_core::calendar::{Calendar, CalendarError, YearPhase};
use attu_core::config::{BotConfig, EpochConfig};
use attu_core::guard;
use attu_core::platform::{ChatClient, ChatError, WikiClient};
use attu_core::reset::{self, ResumeOutcome};
use attu_core::snowflake::message_link;
use attu_discord::model::CommandData;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::app::App;
use crate::error::BotError;
use crate::report::truncate;

/// Reply to anyone but the owner invoking an owner command.
pub const OWNER_ONLY: &str = "Failed: Only the bot owner can use this command.";

/// Reply to `check_year` while time is paused.
pub const TIME_CANCELLED: &str = "Time has been cancelled until further notice.";

/// Prefix of posts in the activity channel that get a reaction.
pub const ACTIVITY_PREFIX: &str = "[DoomBot]";

/// Reaction added to activity posts.
pub const ACTIVITY_REACTION: &str = "\u{1F496}";

/// `debug` subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOption {
    /// Calendar position and config summary.
    Status,
    /// What the daily timer would decide now.
    Guard,
    /// The config document with secrets redacted.
    Config,
    /// Raise a test error to exercise error reporting.
    Error,
}

impl DebugOption {
    /// Every option, in menu order.
    pub const ALL: [Self; 4] = [Self::Status, Self::Guard, Self::Config, Self::Error];

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Guard => "guard",
            Self::Config => "config",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }
}

/// `admin` subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOption {
    /// Stop time.
    Pause,
    /// Restart time, re-anchoring the epoch.
    Resume,
    /// Advance to the year after the last recorded one, ignoring the guard.
    ForceYear,
    /// Change the epoch length.
    SetLength,
    /// Re-read the config document from disk.
    Reload,
}

impl AdminOption {
    /// Every option, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Pause,
        Self::Resume,
        Self::ForceYear,
        Self::SetLength,
        Self::Reload,
    ];

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::ForceYear => "force_year",
            Self::SetLength => "set_length",
            Self::Reload => "reload",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }
}

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Days until the next year, or the span of a given year.
    CheckYear {
        /// Year to look up; `None` for the current one.
        year: Option<i64>,
    },
    /// Permalink to the marker post that began a year.
    LinkYear {
        /// Year to link.
        year: i64,
        /// Channel to link into; defaults to the last lore channel.
        channel: Option<u64>,
    },
    /// When the running container was built.
    BuildDate,
    /// Owner diagnostics.
    Debug(DebugOption),
    /// Owner actions.
    Admin {
        /// The action.
        option: AdminOption,
        /// Argument for `set_length`.
        number: Option<i64>,
    },
    /// Block a wiki account.
    WikiBlock {
        /// Wiki user name.
        user: String,
        /// Block reason.
        reason: String,
    },
}

/// Why interaction data could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No such command.
    #[error("Failed: Unknown command `{0}`.")]
    Unknown(String),
    /// A required option is absent.
    #[error("Failed: Missing option `{0}`.")]
    Missing(&'static str),
    /// An option value is not one of the allowed choices.
    #[error("Failed: `{value}` is not a valid {option}.")]
    Invalid {
        /// Option name.
        option: &'static str,
        /// Value received.
        value: String,
    },
}

impl Command {
    /// Parse slash-command interaction data.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for an unknown command or a missing or invalid
    /// option. Its message is meant to be shown to the invoker.
    pub fn parse(data: &CommandData) -> Result<Self, ParseError> {
        match data.name.as_str() {
            "check_year" => Ok(Self::CheckYear {
                year: data.int_option("year"),
            }),
            "link_year" => Ok(Self::LinkYear {
                year: data.int_option("year").ok_or(ParseError::Missing("year"))?,
                channel: data.id_option("channel"),
            }),
            "build_date" => Ok(Self::BuildDate),
            "debug" => {
                let raw = data.str_option("option").ok_or(ParseError::Missing("option"))?;
                DebugOption::parse(raw)
                    .map(Self::Debug)
                    .ok_or_else(|| ParseError::Invalid {
                        option: "option",
                        value: raw.to_owned(),
                    })
            }
            "admin" => {
                let raw = data.str_option("option").ok_or(ParseError::Missing("option"))?;
                let option = AdminOption::parse(raw).ok_or_else(|| ParseError::Invalid {
                    option: "option",
                    value: raw.to_owned(),
                })?;
                Ok(Self::Admin {
                    option,
                    number: data.int_option("number"),
                })
            }
            "wiki_block" => Ok(Self::WikiBlock {
                user: data
                    .str_option("user")
                    .ok_or(ParseError::Missing("user"))?
                    .to_owned(),
                reason: data
                    .str_option("reason")
                    .ok_or(ParseError::Missing("reason"))?
                    .to_owned(),
            }),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }

    /// Whether only the bot owner may run this command.
    pub const fn requires_owner(&self) -> bool {
        matches!(
            self,
            Self::Debug(_) | Self::Admin { .. } | Self::WikiBlock { .. }
        )
    }

    /// The refusal owed to `invoker` when this is an owner command and they
    /// are not `owner`.
    pub fn refusal(&self, invoker: u64, owner: u64) -> Option<Reply> {
        if self.requires_owner() && invoker != owner {
            info!(invoker, command = ?self, "owner command refused");
            return Some(Reply::ephemeral(OWNER_ONLY));
        }
        None
    }

    /// Whether the reply should be deferred because the command calls out
    /// to the chat platform or the wiki.
    pub const fn is_slow(&self) -> bool {
        matches!(
            self,
            Self::Admin {
                option: AdminOption::ForceYear,
                ..
            } | Self::WikiBlock { .. }
        )
    }
}

/// Text sent back to the invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message content.
    pub content: String,
    /// Whether only the invoker sees it.
    pub ephemeral: bool,
}

impl Reply {
    /// A reply visible to the channel.
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// A reply only the invoker sees.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

fn discord_time(at: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{style}>", at.timestamp())
}

/// Run `command` for `invoker` at `now`.
///
/// # Errors
///
/// Returns an error when a collaborator, the config store or the calendar
/// fails, and for `debug error`.
pub async fn execute<C, W>(
    app: &App<C, W>,
    invoker: u64,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<Reply>
where
    C: ChatClient,
    W: WikiClient,
{
    let config = app.store.snapshot().await;
    if let Some(refusal) = command.refusal(invoker, config.users.bot_owner) {
        return Ok(refusal);
    }

    match command {
        Command::CheckYear { year: None } => current_year(&app.calendar, now, &config.epoch),
        Command::CheckYear { year: Some(year) } => year_span(&app.calendar, now, &config, year),
        Command::LinkYear { year, channel } => Ok(link_year(&config, year, channel)),
        Command::BuildDate => Ok(app.env.build_time.map_or_else(
            || Reply::ephemeral("Failed: Build time is unknown."),
            |t| Reply::public(format!("Container Build Time: {}", discord_time(t, 'f'))),
        )),
        Command::Debug(option) => debug(&app.calendar, now, &config, option),
        Command::Admin { option, number } => admin(app, now, &config, option, number).await,
        Command::WikiBlock { user, reason } => {
            app.wiki
                .login(&config.wiki.user, &config.wiki.key)
                .await
                .context("wiki login")?;
            app.wiki
                .block_user(&user, &reason)
                .await
                .with_context(|| format!("blocking wiki user {user}"))?;
            info!(user, reason, "wiki user blocked");
            Ok(Reply::public(format!("Blocked User:{user} on the wiki.")))
        }
    }
}

fn current_year(calendar: &Calendar, now: DateTime<Utc>, epoch: &EpochConfig) -> anyhow::Result<Reply> {
    if epoch.paused {
        return Ok(Reply::public(TIME_CANCELLED));
    }

    let status = calendar.status(now, epoch)?;
    let day = status
        .day_of_year(epoch.length)
        .ok_or(CalendarError::InvalidEpochLength {
            length: epoch.length,
        })?;
    let next_year = status.current_year.checked_add(1).ok_or(CalendarError::Overflow)?;

    if day == 0 {
        let today = calendar.local_date(now);
        let starts = calendar.reset_instant(today)?;
        // After the reset the new year is already current.
        let year = if now < starts { next_year } else { status.current_year };
        return Ok(Reply::public(format!(
            "Happy New Year! Advancing to Year {year} PC at {}",
            discord_time(starts, 't')
        )));
    }

    let remaining = epoch.length.checked_sub(day).ok_or(CalendarError::Overflow)?;
    let unit = if remaining == 1 { "Day" } else { "Days" };
    Ok(Reply::public(format!(
        "{remaining} {unit} Remaining Until Year {next_year} PC"
    )))
}

fn year_span(
    calendar: &Calendar,
    now: DateTime<Utc>,
    config: &BotConfig,
    year: i64,
) -> anyhow::Result<Reply> {
    let span = match calendar.year_span(year, now, &config.epoch, &config.timestamps) {
        Ok(span) => span,
        Err(CalendarError::InvalidYear { .. }) => {
            return Ok(Reply::ephemeral("Failed: Pick a year of 1 or later."));
        }
        Err(CalendarError::MissingAnchor { year }) => {
            return Ok(Reply::ephemeral(format!(
                "Failed: There is no record of when Year {year} PC began."
            )));
        }
        Err(CalendarError::RolloverSuspended) => return Ok(Reply::public(TIME_CANCELLED)),
        Err(e) => return Err(e.into()),
    };

    let start = discord_time(span.start, 'f');
    let content = match (span.phase, span.end) {
        (YearPhase::Past, Some(end)) => {
            let days = span.duration_days().unwrap_or_default();
            format!(
                "Year {year} PC began {start} and ended {} ({days} days).",
                discord_time(end, 'f')
            )
        }
        (YearPhase::Current, Some(end)) => format!(
            "Year {year} PC began {start} and ends {}.",
            discord_time(end, 'f')
        ),
        (YearPhase::Projected, Some(end)) => format!(
            "Year {year} PC begins {start} and ends {}.",
            discord_time(end, 'f')
        ),
        (_, None) => format!("Year {year} PC began {start}. {TIME_CANCELLED}"),
    };
    Ok(Reply::public(content))
}

fn link_year(config: &BotConfig, year: i64, channel: Option<u64>) -> Reply {
    let channels = &config.channels;
    let Some(channel) = channel.or_else(|| channels.lore_channels.last().copied()) else {
        return Reply::ephemeral("Failed: No lore channels are configured.");
    };
    if !channels.lore_channels.contains(&channel) && channel != channels.meta_chat {
        return Reply::ephemeral("Failed: Channel is not a lore channel.");
    }

    let anchor = year
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| config.timestamps.get(i));
    match anchor {
        Some(&message_id) => Reply::public(message_link(config.guilds.attu, channel, message_id)),
        None => Reply::ephemeral(format!(
            "Failed: Pick a year between 1 and {}.",
            config.recorded_years()
        )),
    }
}

fn debug(
    calendar: &Calendar,
    now: DateTime<Utc>,
    config: &BotConfig,
    option: DebugOption,
) -> anyhow::Result<Reply> {
    let content = match option {
        DebugOption::Status => {
            let epoch = &config.epoch;
            let status = calendar.status(now, epoch)?;
            let day = status.day_of_year(epoch.length).unwrap_or_default();
            let next = calendar
                .next_rollover(now, epoch)?
                .map_or_else(|| "never (paused)".to_owned(), |t| discord_time(t, 'F'));
            format!(
                "Year {} PC, day {day} of {}\nElapsed days: {}\nRecorded years: {}\nPaused: {}\nNext rollover: {next}\nZone: {}",
                status.current_year,
                epoch.length,
                status.elapsed_days,
                config.recorded_years(),
                epoch.paused,
                calendar.tz(),
            )
        }
        DebugOption::Guard => {
            let decision = guard::evaluate(calendar, now, config)?;
            format!("```json\n{}\n```", serde_json::to_string_pretty(&decision)?)
        }
        DebugOption::Config => truncate(&format!("```\n{config:#?}\n```")),
        DebugOption::Error => return Err(BotError::Requested.into()),
    };
    Ok(Reply::ephemeral(content))
}

async fn admin<C, W>(
    app: &App<C, W>,
    now: DateTime<Utc>,
    config: &BotConfig,
    option: AdminOption,
    number: Option<i64>,
) -> anyhow::Result<Reply>
where
    C: ChatClient,
    W: WikiClient,
{
    info!(option = option.as_str(), ?number, "admin command");
    match option {
        AdminOption::Pause => {
            let changed = app.store.update(reset::pause).await?;
            Ok(Reply::public(if changed {
                "Time paused."
            } else {
                "Time was already paused."
            }))
        }
        AdminOption::Resume => {
            let calendar = app.calendar;
            let outcome = app
                .store
                .update(|c| reset::resume(&calendar, now, c))
                .await??;
            let content = match outcome {
                ResumeOutcome::AlreadyReset { epoch_year, .. } => {
                    format!("Time resumed. The epoch was already reset for Year {epoch_year} PC.")
                }
                ResumeOutcome::Reset {
                    epoch_time,
                    epoch_year,
                    ..
                } => {
                    let anchor = DateTime::from_timestamp(epoch_time, 0).ok_or(CalendarError::Overflow)?;
                    let starts = calendar.reset_instant(calendar.local_date(anchor))?;
                    format!(
                        "Time resumed. Year {epoch_year} PC begins {}.",
                        discord_time(starts, 'f')
                    )
                }
            };
            Ok(Reply::public(content))
        }
        AdminOption::ForceYear => {
            let year = guard::force_target(config);
            info!(year, "forcing year advance");
            let report = advance_year(&app.store, &app.chat, &app.wiki, year).await?;
            let mut content = format!("Advanced to Year {} PC.", report.year);
            if !report.wiki_updated {
                content.push_str(" The wiki page had no year marker.");
            }
            Ok(Reply::public(content))
        }
        AdminOption::SetLength => {
            let Some(length) = number.filter(|n| *n > 0) else {
                return Ok(Reply::ephemeral("Failed: Provide a positive number of days."));
            };
            app.store.update(|c| c.epoch.length = length).await?;
            Ok(Reply::public(format!("Epoch length set to {length} days.")))
        }
        AdminOption::Reload => {
            app.store.reload().await?;
            Ok(Reply::public("Config reloaded."))
        }
    }
}

/// React to `[DoomBot]` posts in the activity channel.
///
/// Returns whether a reaction was added.
///
/// # Errors
///
/// Returns [`ChatError`] if the reaction cannot be added.
pub async fn react_to_activity<C, W>(
    app: &App<C, W>,
    channel_id: u64,
    message_id: u64,
    content: &str,
) -> Result<bool, ChatError>
where
    C: ChatClient,
{
    let activity = app.store.snapshot().await.channels.activity;
    if channel_id != activity || !content.starts_with(ACTIVITY_PREFIX) {
        return Ok(false);
    }
    app.chat
        .add_reaction(channel_id, message_id, ACTIVITY_REACTION)
        .await?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use attu_core::snowflake::snowflake_time;
    use attu_core::year_line::format_year_line;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use serde_json::json;

    use super::*;
    use crate::app::test_support::test_app;

    const OWNER: u64 = 42;

    fn ny(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn data(value: serde_json::Value) -> CommandData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_admin_with_number() {
        let command = Command::parse(&data(json!({
            "name": "admin",
            "options": [
                { "name": "option", "type": 3, "value": "set_length" },
                { "name": "number", "type": 4, "value": 21 }
            ]
        })))
        .unwrap();
        assert_eq!(
            command,
            Command::Admin {
                option: AdminOption::SetLength,
                number: Some(21)
            }
        );
        assert!(command.requires_owner());
        assert!(!command.is_slow());
    }

    #[test]
    fn parses_channel_option_from_string_id() {
        let command = Command::parse(&data(json!({
            "name": "link_year",
            "options": [
                { "name": "year", "type": 4, "value": 2 },
                { "name": "channel", "type": 7, "value": "10" }
            ]
        })))
        .unwrap();
        assert_eq!(
            command,
            Command::LinkYear {
                year: 2,
                channel: Some(10)
            }
        );
    }

    #[test]
    fn rejects_unknown_names_and_choices() {
        let unknown = Command::parse(&data(json!({ "name": "nope" })));
        assert_eq!(unknown, Err(ParseError::Unknown("nope".to_owned())));

        let invalid = Command::parse(&data(json!({
            "name": "debug",
            "options": [{ "name": "option", "type": 3, "value": "explode" }]
        })));
        assert!(matches!(invalid, Err(ParseError::Invalid { .. })));

        let missing = Command::parse(&data(json!({ "name": "wiki_block" })));
        assert_eq!(missing, Err(ParseError::Missing("user")));
    }

    #[tokio::test]
    async fn check_year_counts_down() {
        let t = test_app(|_| {});
        let reply = execute(&t.app, 7, Command::CheckYear { year: None }, ny(2024, 1, 10, 12))
            .await
            .unwrap();
        assert_eq!(reply, Reply::public("10 Days Remaining Until Year 4 PC"));

        let reply = execute(&t.app, 7, Command::CheckYear { year: None }, ny(2024, 1, 19, 12))
            .await
            .unwrap();
        assert_eq!(reply.content, "1 Day Remaining Until Year 4 PC");
    }

    #[tokio::test]
    async fn check_year_on_rollover_day_announces_new_year() {
        let t = test_app(|_| {});
        let reset = ny(2024, 1, 20, 17).timestamp();

        for now in [ny(2024, 1, 20, 12), ny(2024, 1, 20, 18)] {
            let reply = execute(&t.app, 7, Command::CheckYear { year: None }, now)
                .await
                .unwrap();
            assert_eq!(
                reply.content,
                format!("Happy New Year! Advancing to Year 4 PC at <t:{reset}:t>")
            );
        }
    }

    #[tokio::test]
    async fn check_year_while_paused_is_cancelled() {
        let t = test_app(|c| c.epoch.paused = true);
        let now = ny(2024, 1, 10, 12);

        let reply = execute(&t.app, 7, Command::CheckYear { year: None }, now)
            .await
            .unwrap();
        assert_eq!(reply, Reply::public(TIME_CANCELLED));

        let reply = execute(&t.app, 7, Command::CheckYear { year: Some(9) }, now)
            .await
            .unwrap();
        assert_eq!(reply.content, TIME_CANCELLED);
    }

    #[tokio::test]
    async fn check_year_rejects_non_positive_years() {
        let t = test_app(|_| {});
        let reply = execute(&t.app, 7, Command::CheckYear { year: Some(0) }, ny(2024, 1, 10, 12))
            .await
            .unwrap();
        assert!(reply.ephemeral);
        assert!(reply.content.starts_with("Failed:"));
    }

    #[tokio::test]
    async fn check_year_reads_past_years_from_anchors() {
        let t = test_app(|c| c.timestamps = vec![100, 200]);
        let reply = execute(&t.app, 7, Command::CheckYear { year: Some(1) }, ny(2024, 1, 10, 12))
            .await
            .unwrap();
        let start = snowflake_time(100).unwrap().timestamp();
        assert!(reply.content.starts_with(&format!("Year 1 PC began <t:{start}:f>")));
        assert!(!reply.ephemeral);
    }

    #[tokio::test]
    async fn check_year_projects_future_years() {
        let t = test_app(|_| {});
        let reply = execute(&t.app, 7, Command::CheckYear { year: Some(5) }, ny(2024, 1, 10, 12))
            .await
            .unwrap();
        let start = ny(2024, 2, 3, 17).timestamp();
        let end = ny(2024, 2, 17, 17).timestamp();
        assert_eq!(
            reply.content,
            format!("Year 5 PC begins <t:{start}:f> and ends <t:{end}:f>.")
        );
    }

    #[tokio::test]
    async fn link_year_defaults_to_last_lore_channel() {
        let t = test_app(|_| {});
        let now = ny(2024, 1, 10, 12);

        let reply = execute(&t.app, 7, Command::LinkYear { year: 2, channel: None }, now)
            .await
            .unwrap();
        assert_eq!(reply.content, "https://discord.com/channels/100/11/2000");

        let reply = execute(&t.app, 7, Command::LinkYear { year: 1, channel: Some(6) }, now)
            .await
            .unwrap();
        assert_eq!(reply.content, "https://discord.com/channels/100/6/1000");
    }

    #[tokio::test]
    async fn link_year_validates_channel_and_year() {
        let t = test_app(|_| {});
        let now = ny(2024, 1, 10, 12);

        let reply = execute(&t.app, 7, Command::LinkYear { year: 1, channel: Some(99) }, now)
            .await
            .unwrap();
        assert_eq!(reply, Reply::ephemeral("Failed: Channel is not a lore channel."));

        for year in [0, 3] {
            let reply = execute(&t.app, 7, Command::LinkYear { year, channel: None }, now)
                .await
                .unwrap();
            assert_eq!(reply, Reply::ephemeral("Failed: Pick a year between 1 and 2."));
        }
    }

    #[tokio::test]
    async fn build_date_without_build_time_fails_quietly() {
        let t = test_app(|_| {});
        let reply = execute(&t.app, 7, Command::BuildDate, ny(2024, 1, 10, 12))
            .await
            .unwrap();
        assert!(reply.ephemeral);
    }

    #[tokio::test]
    async fn owner_commands_refuse_others() {
        let t = test_app(|_| {});
        let command = Command::Admin {
            option: AdminOption::Pause,
            number: None,
        };
        let reply = execute(&t.app, 7, command, ny(2024, 1, 10, 12)).await.unwrap();
        assert_eq!(reply, Reply::ephemeral(OWNER_ONLY));
        assert!(!t.app.store.snapshot().await.epoch.paused);
    }

    #[tokio::test]
    async fn pause_is_persisted() {
        let t = test_app(|_| {});
        let command = Command::Admin {
            option: AdminOption::Pause,
            number: None,
        };
        let reply = execute(&t.app, OWNER, command.clone(), ny(2024, 1, 10, 12))
            .await
            .unwrap();
        assert_eq!(reply.content, "Time paused.");

        let on_disk = BotConfig::parse(&std::fs::read_to_string(&t.fixture.path).unwrap()).unwrap();
        assert!(on_disk.epoch.paused);

        let reply = execute(&t.app, OWNER, command, ny(2024, 1, 10, 12)).await.unwrap();
        assert_eq!(reply.content, "Time was already paused.");
    }

    #[tokio::test]
    async fn resume_reanchors_to_next_saturday() {
        let t = test_app(|c| {
            c.epoch.paused = true;
            c.timestamps = vec![1000, 2000, 3000];
        });
        let now = ny(2024, 1, 10, 12);
        let command = Command::Admin {
            option: AdminOption::Resume,
            number: None,
        };
        let reply = execute(&t.app, OWNER, command, now).await.unwrap();

        let epoch = t.app.store.snapshot().await.epoch;
        assert!(!epoch.paused);
        assert_eq!(epoch.year, 4);
        assert_eq!(epoch.time, ny(2024, 1, 13, 0).timestamp());
        let starts = ny(2024, 1, 13, 17).timestamp();
        assert_eq!(
            reply.content,
            format!("Time resumed. Year 4 PC begins <t:{starts}:f>.")
        );
    }

    #[tokio::test]
    async fn resume_after_reset_only_unpauses() {
        let t = test_app(|c| c.epoch.paused = true);
        let before = t.app.store.snapshot().await.epoch;
        let command = Command::Admin {
            option: AdminOption::Resume,
            number: None,
        };
        execute(&t.app, OWNER, command, ny(2024, 1, 10, 12)).await.unwrap();

        let after = t.app.store.snapshot().await.epoch;
        assert!(!after.paused);
        assert_eq!(after.time, before.time);
        assert_eq!(after.year, before.year);
    }

    #[tokio::test]
    async fn force_year_advances_past_last_recorded_year() {
        let t = test_app(|c| c.timestamps = vec![1, 2, 3, 4, 5]);
        let command = Command::Admin {
            option: AdminOption::ForceYear,
            number: None,
        };
        assert!(command.is_slow());

        let reply = execute(&t.app, OWNER, command, ny(2024, 1, 10, 12)).await.unwrap();
        assert_eq!(reply.content, "Advanced to Year 6 PC.");

        let timestamps = t.app.store.snapshot().await.timestamps;
        assert_eq!(timestamps.len(), 6);
        assert_eq!(timestamps[5], 5001);

        let log = t.app.chat.log();
        assert_eq!(log.sent[0], (10, format_year_line(6)));
        assert_eq!(log.renamed, vec![(2, "Current Year: 6 PC".to_owned())]);
        assert!(t.app.wiki.page_text().contains("Current Year: 6 PC"));
    }

    #[tokio::test]
    async fn force_year_failure_is_an_error() {
        let t = test_app(|_| {});
        t.app.chat.fail_renames();
        let command = Command::Admin {
            option: AdminOption::ForceYear,
            number: None,
        };
        let err = execute(&t.app, OWNER, command, ny(2024, 1, 10, 12))
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("rename year channel"));
        // The anchor was recorded before the failing step.
        assert_eq!(t.app.store.snapshot().await.timestamps.len(), 3);
    }

    #[tokio::test]
    async fn set_length_requires_a_positive_number() {
        let t = test_app(|_| {});
        let now = ny(2024, 1, 10, 12);

        let reply = execute(
            &t.app,
            OWNER,
            Command::Admin {
                option: AdminOption::SetLength,
                number: Some(0),
            },
            now,
        )
        .await
        .unwrap();
        assert!(reply.ephemeral);

        execute(
            &t.app,
            OWNER,
            Command::Admin {
                option: AdminOption::SetLength,
                number: Some(21),
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(t.app.store.snapshot().await.epoch.length, 21);
    }

    #[tokio::test]
    async fn reload_picks_up_edits() {
        let t = test_app(|_| {});
        let mut edited = t.app.store.snapshot().await;
        edited.epoch.length = 7;
        std::fs::write(&t.fixture.path, edited.to_json().unwrap()).unwrap();

        let command = Command::Admin {
            option: AdminOption::Reload,
            number: None,
        };
        execute(&t.app, OWNER, command, ny(2024, 1, 10, 12)).await.unwrap();
        assert_eq!(t.app.store.snapshot().await.epoch.length, 7);
    }

    #[tokio::test]
    async fn debug_guard_and_error() {
        let t = test_app(|_| {});
        let now = ny(2024, 1, 10, 12);

        let reply = execute(&t.app, OWNER, Command::Debug(DebugOption::Guard), now)
            .await
            .unwrap();
        assert!(reply.ephemeral);
        assert!(reply.content.contains("\"not_due\""));

        let reply = execute(&t.app, OWNER, Command::Debug(DebugOption::Config), now)
            .await
            .unwrap();
        assert!(!reply.content.contains("secret-token"));

        let err = execute(&t.app, OWNER, Command::Debug(DebugOption::Error), now)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<BotError>().is_some());
    }

    #[tokio::test]
    async fn wiki_block_logs_in_and_blocks() {
        let t = test_app(|_| {});
        let command = Command::WikiBlock {
            user: "Vandal".to_owned(),
            reason: "spam".to_owned(),
        };
        let reply = execute(&t.app, OWNER, command, ny(2024, 1, 10, 12)).await.unwrap();
        assert_eq!(reply.content, "Blocked User:Vandal on the wiki.");

        let log = t.app.wiki.log();
        assert_eq!(log.logins, vec!["AttuBot".to_owned()]);
        assert_eq!(log.blocks, vec![("Vandal".to_owned(), "spam".to_owned())]);
    }

    #[tokio::test]
    async fn activity_posts_get_a_reaction() {
        let t = test_app(|_| {});
        assert!(react_to_activity(&t.app, 1, 77, "[DoomBot] rolled a 20").await.unwrap());
        assert!(!react_to_activity(&t.app, 1, 78, "hello").await.unwrap());
        assert!(!react_to_activity(&t.app, 3, 79, "[DoomBot] elsewhere").await.unwrap());

        assert_eq!(
            t.app.chat.log().reactions,
            vec![(1, 77, ACTIVITY_REACTION.to_owned())]
        );
    }
}
