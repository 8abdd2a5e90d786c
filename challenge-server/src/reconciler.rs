//! Leaderboard reconciler.
//!
//! A pull-based loop: every tick it recomputes the top-N ranking from the
//! store and converges the display message to match, editing the most recent
//! message in the leaderboard channel or creating one. It never applies
//! deltas, so repeated runs with unchanged data are idempotent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::interval;
use tracing::{error, warn};

use challenge_core::{leaderboard::TOP_N, render_leaderboard, MessageId};

use crate::AppState;

/// How often the display is reconciled.
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(10);

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No competition is current, or the current one has expired. The
    /// display, if any, is left stale.
    Skipped,
    /// The existing display message was overwritten.
    Edited(MessageId),
    /// No display message existed; one was created.
    Created(MessageId),
}

/// Run one reconciliation pass against the display surface.
pub async fn reconcile_once(state: &AppState) -> Result<ReconcileOutcome> {
    let Some(competition) = state
        .repository
        .current_competition()
        .await
        .context("Failed to read current competition")?
    else {
        return Ok(ReconcileOutcome::Skipped);
    };
    if !competition.is_active(state.clock.now()) {
        return Ok(ReconcileOutcome::Skipped);
    }

    let entries = state
        .repository
        .top_entries(&competition.id, TOP_N)
        .await
        .context("Failed to query top entries")?;

    let content = render_leaderboard(&state.guild_id, &entries);

    let channel = state
        .chat
        .ensure_channel(&state.guild_id, &state.leaderboard_channel)
        .await
        .context("Failed to ensure leaderboard channel")?;

    let latest = state
        .chat
        .latest_message(&channel.id)
        .await
        .context("Failed to fetch latest display message")?;

    match latest {
        Some(message) => {
            state
                .chat
                .edit_message(&channel.id, &message.id, &content)
                .await
                .context("Failed to edit display message")?;
            Ok(ReconcileOutcome::Edited(message.id))
        }
        None => {
            let id = state
                .chat
                .send_message(&channel.id, &content)
                .await
                .context("Failed to create display message")?;
            Ok(ReconcileOutcome::Created(id))
        }
    }
}

/// Fixed-interval reconciliation loop.
///
/// Invocations are single-flight per display surface: a tick that finds the
/// previous pass still running skips instead of racing it on the edit.
/// Failures are logged and abandoned; the next tick recomputes from scratch.
pub async fn reconcile_loop(state: Arc<AppState>) {
    let mut interval = interval(RECONCILE_INTERVAL);

    loop {
        interval.tick().await;

        match state.reconcile_guard.try_lock() {
            Ok(_guard) => {
                if let Err(e) = reconcile_once(&state).await {
                    error!("Leaderboard reconciliation failed: {:#}", e);
                }
            }
            Err(_) => {
                warn!("Previous reconciliation still in flight, skipping tick");
            }
        }
    }
}
