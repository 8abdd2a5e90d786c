//! Domain types for the community challenge competition service.
//!
//! This crate is I/O-free: it defines the competition and entry records, the
//! leaderboard rendering, and the clock abstraction shared by the server's
//! lifecycle, tally, and reconciliation components.

pub mod clock;
pub mod competition;
pub mod entry;
pub mod ids;
pub mod leaderboard;

pub use clock::{Clock, ManualClock, SystemClock};
pub use competition::Competition;
pub use entry::{Entry, EntryRef};
pub use ids::{ChannelId, CompetitionId, GuildId, MessageId, UserId};
pub use leaderboard::render_leaderboard;
