//! Error reporting to the error-log channel.

use attu_core::platform::ChatClient;
use tracing::{error, warn};

/// Longest message the chat platform accepts.
pub const MESSAGE_LIMIT: usize = 2000;

const ELLIPSIS: &str = "\n...";

/// Cut `content` to [`MESSAGE_LIMIT`] characters, marking the cut.
pub fn truncate(content: &str) -> String {
    if content.chars().count() <= MESSAGE_LIMIT {
        return content.to_owned();
    }
    let keep = MESSAGE_LIMIT.saturating_sub(ELLIPSIS.len());
    let mut out: String = content.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Render an error chain (and backtrace, when captured) as a code block.
pub fn render(err: &anyhow::Error) -> String {
    const FENCE: &str = "```";
    let body_limit = MESSAGE_LIMIT.saturating_sub(FENCE.len().saturating_mul(2));
    let body: String = format!("{err:?}").chars().take(body_limit).collect();
    format!("{FENCE}{body}{FENCE}")
}

/// Log `err` and forward it to `channel_id`.
///
/// A failure to forward is logged and otherwise ignored.
pub async fn report_error<C: ChatClient>(chat: &C, channel_id: u64, context: &str, err: &anyhow::Error) {
    let chain = format!("{err:#}");
    error!(context, error = %chain, "unhandled error");
    if let Err(send_err) = chat.send_message(channel_id, &render(err)).await {
        warn!(error = %send_err, channel_id, "could not forward error report");
    }
}
