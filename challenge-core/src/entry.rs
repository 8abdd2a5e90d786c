//! Entry records: one per submitted item that has received an approval.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, CompetitionId, GuildId, MessageId, UserId};

/// Compound locator for a submitted item, sufficient to reconstruct a
/// permalink to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl EntryRef {
    pub fn new(channel_id: impl Into<ChannelId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Permalink to the item inside the given messaging space.
    pub fn permalink(&self, guild_id: &GuildId) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild_id, self.channel_id, self.message_id
        )
    }
}

/// A tracked submission with its accumulating vote count.
///
/// Created on the first approval of an item (`vote_count` starts at 1) and
/// incremented on each subsequent approval. `competition_id` is pinned at
/// creation time and never rewritten, even after that competition expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub author_id: UserId,
    pub entry_ref: EntryRef,
    pub competition_id: CompetitionId,
    pub vote_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permalink_shape() {
        let entry_ref = EntryRef::new("111222", "333444");
        let guild = GuildId::from("999000");
        assert_eq!(
            entry_ref.permalink(&guild),
            "https://discord.com/channels/999000/111222/333444"
        );
    }
}
