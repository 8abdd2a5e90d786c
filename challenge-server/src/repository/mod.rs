//! Repository abstraction for competition state.
//!
//! This module defines the `ChallengeRepository` trait that abstracts the
//! durable store: the singleton current-competition record and the per-item
//! entry counters. Implementations provide different backends (in-memory,
//! SQLite).
//!
//! All coordination between the lifecycle manager, tally engine, and
//! reconciler happens through this seam; there is no in-process shared
//! mutable state.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use std::fmt;

use challenge_core::{Competition, CompetitionId, Entry, EntryRef, UserId};

/// Errors from the storage backend.
///
/// Storage errors are transient from the caller's point of view: the affected
/// operation is abandoned and retried naturally by the next scheduled trigger
/// or incoming event.
#[derive(Debug)]
pub enum RepositoryError {
    /// The backend failed to perform an operation.
    Storage { operation: String, detail: String },
    /// A stored record could not be decoded.
    Corruption { what: String },
}

impl RepositoryError {
    pub fn storage(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { operation, detail } => {
                write!(f, "storage error during {}: {}", operation, detail)
            }
            Self::Corruption { what } => write!(f, "corrupt stored {}", what),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Durable store for competition state.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Point read of the singleton current-competition record.
    async fn current_competition(&self) -> Result<Option<Competition>, RepositoryError>;

    /// Full-replace upsert of the singleton current-competition record.
    ///
    /// Last writer wins; the previous competition is superseded in place and
    /// is no longer retrievable as current.
    async fn set_current_competition(
        &self,
        competition: &Competition,
    ) -> Result<(), RepositoryError>;

    /// Record one approval for the item at `entry_ref`.
    ///
    /// Creates the entry with a vote count of 1 (pinning `competition_id` and
    /// `author_id`) if it does not exist, otherwise increments the existing
    /// count by 1. The create-or-increment is atomic at the store: concurrent
    /// calls for the same item never lose updates, and the conflict path
    /// never rewrites the pinned competition or author.
    ///
    /// Returns the resulting vote count.
    async fn record_approval(
        &self,
        entry_ref: &EntryRef,
        author_id: &UserId,
        competition_id: &CompetitionId,
    ) -> Result<u64, RepositoryError>;

    /// Top `limit` entries for a competition, ordered by vote count
    /// descending. The order among equal counts is whatever the backend
    /// naturally returns (insertion order for both provided backends); it is
    /// stable between calls but not otherwise specified.
    async fn top_entries(
        &self,
        competition_id: &CompetitionId,
        limit: usize,
    ) -> Result<Vec<Entry>, RepositoryError>;
}
