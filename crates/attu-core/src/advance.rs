//! The year-advance transition.
//!
//! Advancing the year is a fixed sequence of externally visible steps:
//!
//! 1. **Post lore markers** -- the year-marker line goes to every lore
//!    channel.
//! 2. **Record anchor** -- the last posted message id is appended to the
//!    config's `timestamps`.
//! 3. **Rename year channel** -- the year voice channel shows the new year.
//! 4. **Update wiki** -- the `Current Year: N PC` marker on the wiki page
//!    is rewritten.
//! 5. **Announce** -- the leaders role is pinged in the announcements
//!    channel.
//! 6. **Post year links** -- the marker line and permalinks to every
//!    marker post go to the year-links thread.
//!
//! The steps talk to systems without transactions, so nothing is rolled
//! back. The first failing step aborts the rest; the returned
//! [`AdvanceError`] names it and lists the steps that already took effect
//! so an operator can reconcile by hand. The transition does not check
//! whether the year is due; that is the caller's job (see
//! [`crate::guard`]).

use std::fmt;

use regex::{NoExpand, Regex};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ConfigError, ConfigStore};
use crate::platform::{ChatClient, ChatError, PostedMessage, WikiClient, WikiError};
use crate::year_line::format_year_line;

/// Case-insensitive pattern of the year marker on the wiki page.
const WIKI_YEAR_MARKER: &str = r"(?i)Current Year: \d+ PC";

/// One step of the transition, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStep {
    /// Post the year-marker line to every lore channel.
    PostLoreMarkers,
    /// Append the anchor id to `timestamps`.
    RecordAnchor,
    /// Rename the year voice channel.
    RenameYearChannel,
    /// Rewrite the wiki year marker.
    UpdateWiki,
    /// Ping the leaders role.
    Announce,
    /// Post permalinks to the year-links thread.
    PostYearLinks,
}

impl fmt::Display for AdvanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PostLoreMarkers => "post lore markers",
            Self::RecordAnchor => "record anchor",
            Self::RenameYearChannel => "rename year channel",
            Self::UpdateWiki => "update wiki",
            Self::Announce => "announce",
            Self::PostYearLinks => "post year links",
        };
        f.write_str(name)
    }
}

/// Why a step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    /// No lore channels are configured, so there is nothing to anchor on.
    #[error("no lore channels configured")]
    NoLoreChannels,

    /// A chat platform call failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// A wiki call failed.
    #[error(transparent)]
    Wiki(#[from] WikiError),

    /// The config could not be persisted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The wiki marker pattern failed to compile.
    #[error("invalid wiki marker pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A transition that stopped part-way.
#[derive(Debug, thiserror::Error)]
#[error("advancing to year {year} failed at step '{step}' after {} completed step(s)", .completed.len())]
pub struct AdvanceError {
    /// Target year.
    pub year: i64,
    /// The step that failed.
    pub step: AdvanceStep,
    /// Steps that took effect before the failure.
    pub completed: Vec<AdvanceStep>,
    /// Underlying cause.
    #[source]
    pub source: StepFailure,
}

/// Outcome of a completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvanceReport {
    /// The year advanced to.
    pub year: i64,
    /// Marker posts, in lore-channel order.
    pub posted: Vec<PostedMessage>,
    /// Every step, in order.
    pub completed: Vec<AdvanceStep>,
    /// Whether the wiki page was edited (false when the marker was absent).
    pub wiki_updated: bool,
}

#[derive(Debug)]
struct Progress {
    year: i64,
    completed: Vec<AdvanceStep>,
}

impl Progress {
    fn done(&mut self, step: AdvanceStep) {
        info!(year = self.year, %step, "year advance step completed");
        self.completed.push(step);
    }

    fn fail(&self, step: AdvanceStep, source: impl Into<StepFailure>) -> AdvanceError {
        AdvanceError {
            year: self.year,
            step,
            completed: self.completed.clone(),
            source: source.into(),
        }
    }
}

/// Advance the in-universe year to `year`.
///
/// # Errors
///
/// Returns [`AdvanceError`] for the first step that fails. Earlier steps are
/// not undone.
pub async fn advance_year<C, W>(
    store: &ConfigStore,
    chat: &C,
    wiki: &W,
    year: i64,
) -> Result<AdvanceReport, AdvanceError>
where
    C: ChatClient,
    W: WikiClient,
{
    let config = store.snapshot().await;
    let line = format_year_line(year);
    let mut progress = Progress {
        year,
        completed: Vec::new(),
    };
    info!(year, "advancing year");

    // 1. Lore channel markers.
    let step = AdvanceStep::PostLoreMarkers;
    let lore = &config.channels.lore_channels;
    if lore.is_empty() {
        return Err(progress.fail(step, StepFailure::NoLoreChannels));
    }
    let mut posted = Vec::with_capacity(lore.len());
    for &channel_id in lore {
        let message = chat
            .send_message(channel_id, &line)
            .await
            .map_err(|e| progress.fail(step, e))?;
        posted.push(message);
    }
    progress.done(step);

    // 2. Anchor.
    let step = AdvanceStep::RecordAnchor;
    let anchor = posted
        .last()
        .map(|m| m.id)
        .ok_or_else(|| progress.fail(step, StepFailure::NoLoreChannels))?;
    let recorded = store
        .update(|c| {
            c.timestamps.push(anchor);
            c.recorded_years()
        })
        .await
        .map_err(|e| progress.fail(step, e))?;
    info!(year, anchor, recorded, "anchor recorded");
    progress.done(step);

    // 3. Voice channel.
    let step = AdvanceStep::RenameYearChannel;
    chat.rename_channel(config.channels.year_vc, &format!("Current Year: {year} PC"))
        .await
        .map_err(|e| progress.fail(step, e))?;
    progress.done(step);

    // 4. Wiki.
    let step = AdvanceStep::UpdateWiki;
    let wiki_updated = update_wiki(wiki, &config.wiki.user, &config.wiki.key, &config.wiki.page, year)
        .await
        .map_err(|e| progress.fail(step, e))?;
    progress.done(step);

    // 5. Announcement.
    let step = AdvanceStep::Announce;
    let announcement = format!("<@&{}> Year {year} PC. (weap)", config.roles.leaders);
    chat.send_message(config.channels.announcements, &announcement)
        .await
        .map_err(|e| progress.fail(step, e))?;
    progress.done(step);

    // 6. Year links thread.
    let step = AdvanceStep::PostYearLinks;
    let thread = chat
        .get_thread(config.channels.doom_forum, config.channels.year_links)
        .await
        .map_err(|e| progress.fail(step, e))?;
    let links: Vec<String> = posted.iter().map(|m| m.link(config.guilds.attu)).collect();
    let content = format!("{line}\n{}", links.join("\n"));
    chat.send_message(thread.id, &content)
        .await
        .map_err(|e| progress.fail(step, e))?;
    progress.done(step);

    info!(year, "year advanced");
    Ok(AdvanceReport {
        year,
        posted,
        completed: progress.completed,
        wiki_updated,
    })
}

async fn update_wiki<W: WikiClient>(
    wiki: &W,
    user: &str,
    key: &str,
    page: &str,
    year: i64,
) -> Result<bool, StepFailure> {
    wiki.login(user, key).await?;
    let text = wiki.get_page_text(page).await?;
    let Some(updated) = replace_year_marker(&text, year)? else {
        warn!(page, year, "wiki page has no year marker; edit skipped");
        return Ok(false);
    };
    wiki.edit_page(page, &updated, &format!("Bumped to Year {year} PC"))
        .await?;
    Ok(true)
}

/// Rewrite every `Current Year: N PC` marker in `text` to `year`.
///
/// Returns `None` when the text carries no marker.
///
/// # Errors
///
/// Returns [`regex::Error`] if the marker pattern fails to compile.
pub fn replace_year_marker(text: &str, year: i64) -> Result<Option<String>, regex::Error> {
    let marker = Regex::new(WIKI_YEAR_MARKER)?;
    if !marker.is_match(text) {
        return Ok(None);
    }
    let replacement = format!("Current Year: {year} PC");
    Ok(Some(marker.replace_all(text, NoExpand(&replacement)).into_owned()))
}
