//! The current-competition record.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CompetitionId;

impl CompetitionId {
    /// Identity of the competition period containing `at`: the UTC calendar
    /// month, rendered as `YYYY-M` (month 1-12, not zero-padded).
    ///
    /// Deterministic for a given period, so reopening within the same period
    /// produces the same id.
    pub fn for_period(at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", at.year(), at.month()))
    }
}

/// The singleton "current competition" record.
///
/// At most one of these is current at a time; opening the next competition
/// overwrites it in place (the old record is not archived). Written only by
/// the lifecycle manager; the tally engine and reconciler read it fresh on
/// every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub expires_at: DateTime<Utc>,
}

impl Competition {
    /// A competition is active iff the window has not yet closed.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
