//! Leaderboard rendering.
//!
//! The reconciler recomputes this text from store data every cycle and
//! converges the display message to it, so rendering must be a pure function
//! of the ranked entries.

use crate::entry::Entry;
use crate::ids::GuildId;

/// How many entries the leaderboard displays.
pub const TOP_N: usize = 10;

/// Render the ranked list into the display message content.
///
/// Entries are expected in rank order (vote count descending, store order
/// among ties). An empty slice renders just the header.
pub fn render_leaderboard(guild_id: &GuildId, entries: &[Entry]) -> String {
    let mut content = String::from("🏆 **Top 10 Challenge Submissions**\n\n");

    for (index, entry) in entries.iter().enumerate() {
        content.push_str(&format!(
            "**{}.** <@{}> — 👍 {} votes\n[Message]({})\n\n",
            index + 1,
            entry.author_id,
            entry.vote_count,
            entry.entry_ref.permalink(guild_id)
        ));
    }

    content
}
