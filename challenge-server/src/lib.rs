pub mod chat;
pub mod config;
pub mod lifecycle;
pub mod reconciler;
pub mod repository;
pub mod tally;
pub mod webhook;

use std::sync::Arc;

use tokio::sync::Mutex;

use challenge_core::{Clock, GuildId, UserId};

use crate::chat::ChatPlatform;
use crate::repository::ChallengeRepository;

/// Shared state for the webhook handlers and background loops.
pub struct AppState {
    pub chat: Arc<dyn ChatPlatform>,
    pub repository: Arc<dyn ChallengeRepository>,
    pub clock: Arc<dyn Clock>,
    pub guild_id: GuildId,
    pub bot_user_id: UserId,
    pub relay_secret: String,
    pub challenge_channel: String,
    pub leaderboard_channel: String,
    /// Single-flight guard for the leaderboard display surface: concurrent
    /// reconcile invocations must not race on which edit wins.
    pub reconcile_guard: Mutex<()>,
}

#[cfg(test)]
pub(crate) mod test_support;
