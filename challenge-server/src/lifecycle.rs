//! Competition lifecycle manager.
//!
//! Opens a new competition on a fixed calendar schedule: computes the
//! period-derived identity and expiry, upserts the singleton record, then
//! announces the window in the submission channel. The announcement is
//! best-effort; the state transition is not rolled back if it fails.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use tracing::{error, info};

use challenge_core::{Competition, CompetitionId};

use crate::AppState;

/// Schedule: the competition opens at this UTC day-of-month and time.
pub const OPEN_DAY_OF_MONTH: u32 = 23;
const OPEN_HOUR: u32 = 0;
const OPEN_MINUTE: u32 = 0;

/// Length of the voting window.
pub const COMPETITION_WINDOW_DAYS: i64 = 7;

/// Announcements render the expiry in this fixed display offset (UTC+5).
const DISPLAY_UTC_OFFSET_SECS: i32 = 5 * 3600;

/// Open a new competition as of the clock's current time.
///
/// The singleton record is replaced unconditionally: re-running within the
/// same calendar period overwrites with the same id and a fresh expiry, and
/// opening in a new period silently retires the previous competition.
///
/// Returns an error only if the store write fails; announcement failures are
/// logged and swallowed, so the competition is open even when the post never
/// made it out.
pub async fn open_competition(state: &AppState) -> Result<Competition> {
    let now = state.clock.now();
    let competition = Competition {
        id: CompetitionId::for_period(now),
        expires_at: now + Duration::days(COMPETITION_WINDOW_DAYS),
    };

    state
        .repository
        .set_current_competition(&competition)
        .await
        .context("Failed to persist new competition")?;

    info!(
        "Opened competition {} (expires {})",
        competition.id, competition.expires_at
    );

    if let Err(e) = announce(state, &competition).await {
        error!("Failed to announce competition {}: {:#}", competition.id, e);
    }

    Ok(competition)
}

async fn announce(state: &AppState, competition: &Competition) -> Result<()> {
    let channel = state
        .chat
        .ensure_channel(&state.guild_id, &state.challenge_channel)
        .await
        .context("Failed to ensure submission channel")?;

    let content = format!(
        "🎉 **Monthly Challenge Started!**\n\
         Post your best content here and members can vote using 👍.\n\n\
         ⏰ This challenge ends on **{}**\n\
         Top 10 submissions will appear live in #{}!",
        format_expiry(competition.expires_at),
        state.leaderboard_channel
    );

    state
        .chat
        .send_message(&channel.id, &content)
        .await
        .context("Failed to post announcement")?;

    Ok(())
}

/// Human-readable expiry instant in the fixed display timezone.
fn format_expiry(expires_at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(DISPLAY_UTC_OFFSET_SECS).expect("display offset in range");
    expires_at
        .with_timezone(&offset)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}

/// The first scheduled open strictly after `after`.
fn next_open_instant(after: DateTime<Utc>) -> DateTime<Utc> {
    let mut year = after.year();
    let mut month = after.month();
    loop {
        if let Some(instant) = Utc
            .with_ymd_and_hms(year, month, OPEN_DAY_OF_MONTH, OPEN_HOUR, OPEN_MINUTE, 0)
            .single()
        {
            if instant > after {
                return instant;
            }
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
}

/// Calendar scheduler: sleeps until the next scheduled open and fires
/// `open_competition`, forever. Failures are logged; the loop then waits for
/// the following period.
pub async fn lifecycle_loop(state: Arc<AppState>) {
    loop {
        let now = state.clock.now();
        let next = next_open_instant(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!("Next competition opens at {}", next);

        tokio::time::sleep(wait).await;

        if let Err(e) = open_competition(&state).await {
            error!("Failed to open competition: {:#}", e);
        }
    }
}
