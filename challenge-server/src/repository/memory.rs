//! In-memory implementation of `ChallengeRepository`.
//!
//! All state is held in memory and lost on restart. Used in tests and as the
//! reference for the SQLite backend's semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use challenge_core::{Competition, CompetitionId, Entry, EntryRef, UserId};

use super::{ChallengeRepository, RepositoryError};

/// Entry plus its insertion sequence number. The sequence reproduces the
/// SQLite backend's tie order (rowid insertion order among equal counts).
struct StoredEntry {
    entry: Entry,
    seq: u64,
}

pub struct InMemoryRepository {
    competition: RwLock<Option<Competition>>,
    entries: RwLock<HashMap<EntryRef, StoredEntry>>,
    next_seq: RwLock<u64>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            competition: RwLock::new(None),
            entries: RwLock::new(HashMap::new()),
            next_seq: RwLock::new(0),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryRepository {
    async fn current_competition(&self) -> Result<Option<Competition>, RepositoryError> {
        let competition = self.competition.read().await;
        Ok(competition.clone())
    }

    async fn set_current_competition(
        &self,
        competition: &Competition,
    ) -> Result<(), RepositoryError> {
        let mut current = self.competition.write().await;
        *current = Some(competition.clone());
        Ok(())
    }

    async fn record_approval(
        &self,
        entry_ref: &EntryRef,
        author_id: &UserId,
        competition_id: &CompetitionId,
    ) -> Result<u64, RepositoryError> {
        // The write lock makes the whole create-or-increment atomic.
        let mut entries = self.entries.write().await;

        if let Some(stored) = entries.get_mut(entry_ref) {
            stored.entry.vote_count += 1;
            return Ok(stored.entry.vote_count);
        }

        let mut next_seq = self.next_seq.write().await;
        let seq = *next_seq;
        *next_seq += 1;

        entries.insert(
            entry_ref.clone(),
            StoredEntry {
                entry: Entry {
                    author_id: author_id.clone(),
                    entry_ref: entry_ref.clone(),
                    competition_id: competition_id.clone(),
                    vote_count: 1,
                },
                seq,
            },
        );

        Ok(1)
    }

    async fn top_entries(
        &self,
        competition_id: &CompetitionId,
        limit: usize,
    ) -> Result<Vec<Entry>, RepositoryError> {
        let entries = self.entries.read().await;

        let mut matching: Vec<&StoredEntry> = entries
            .values()
            .filter(|stored| &stored.entry.competition_id == competition_id)
            .collect();

        matching.sort_by(|a, b| {
            b.entry
                .vote_count
                .cmp(&a.entry.vote_count)
                .then(a.seq.cmp(&b.seq))
        });

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|stored| stored.entry.clone())
            .collect())
    }
}
