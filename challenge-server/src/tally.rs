//! Vote tally engine.
//!
//! One call per inbound approval event. The engine holds no cross-event
//! state: it reads the current competition fresh from the store, gates on the
//! window, and performs a single atomic create-or-increment.

use tracing::info;

use challenge_core::{Clock, EntryRef, UserId};

use crate::repository::{ChallengeRepository, RepositoryError};

/// The approval reaction the platform filter matches on.
pub const APPROVAL_EMOJI: &str = "👍";

/// What happened to one approval event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyOutcome {
    /// The approval was counted; the entry now has this many votes.
    Recorded { vote_count: u64 },
    /// The reacting user is the service itself.
    SelfReaction,
    /// No competition is current, or the current one has expired. Approvals
    /// arriving outside the window are dropped, not queued.
    NoActiveCompetition,
}

/// Record one approval for the item at `entry_ref`.
///
/// A store failure drops the event (no retry, no queue); the caller logs it.
pub async fn record_approval(
    repository: &dyn ChallengeRepository,
    clock: &dyn Clock,
    bot_user_id: &UserId,
    actor_id: &UserId,
    entry_ref: &EntryRef,
    author_id: &UserId,
) -> Result<TallyOutcome, RepositoryError> {
    if actor_id == bot_user_id {
        return Ok(TallyOutcome::SelfReaction);
    }

    let Some(competition) = repository.current_competition().await? else {
        return Ok(TallyOutcome::NoActiveCompetition);
    };
    if !competition.is_active(clock.now()) {
        return Ok(TallyOutcome::NoActiveCompetition);
    }

    let vote_count = repository
        .record_approval(entry_ref, author_id, &competition.id)
        .await?;

    info!(
        "Recorded approval on {}/{}: {} votes",
        entry_ref.channel_id, entry_ref.message_id, vote_count
    );

    Ok(TallyOutcome::Recorded { vote_count })
}
