//! Discord snowflake ids.
//!
//! A snowflake carries its creation time in the top 42 bits, as
//! milliseconds since the Discord epoch (2015-01-01T00:00:00Z). Stored
//! year anchors are message ids, so the time a year began is recovered
//! from the id alone.

use chrono::{DateTime, Utc};

/// Milliseconds between the Unix epoch and the Discord epoch.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Bits below the timestamp (worker, process, increment).
const TIMESTAMP_SHIFT: u32 = 22;

/// Creation instant encoded in a snowflake.
///
/// Returns `None` only for ids whose timestamp does not fit a `DateTime`.
pub fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    let ms = id
        .checked_shr(TIMESTAMP_SHIFT)?
        .checked_add(DISCORD_EPOCH_MS)?;
    DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
}

/// Permalink to a message.
pub fn message_link(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn small_ids_decode_to_the_discord_epoch() {
        let t = snowflake_time(100).unwrap();
        assert_eq!(t.timestamp_millis(), 1_420_070_400_000);
    }

    #[test]
    fn known_snowflake_decodes() {
        // Example id from the Discord developer documentation.
        let t = snowflake_time(175_928_847_299_117_063).unwrap();
        assert_eq!(t.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn later_ids_are_later() {
        let a = snowflake_time(1_200_000_000_000_000_000).unwrap();
        let b = snowflake_time(1_200_000_100_000_000_000).unwrap();
        assert!(b > a);
    }

    #[test]
    fn message_link_format() {
        assert_eq!(
            message_link(1, 2, 3),
            "https://discord.com/channels/1/2/3"
        );
    }
}
