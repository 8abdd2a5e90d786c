//! SQLite implementation of `ChallengeRepository`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and
//! add a migration in `run_migrations()`. Migrations run sequentially from
//! the current version to the target version.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use challenge_core::{Competition, CompetitionId, Entry, EntryRef, UserId};

use super::{ChallengeRepository, RepositoryError};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed challenge repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime. The connection mutex serializes store
/// access, so the create-or-increment upsert is atomic under concurrency.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Create a new SQLite repository at the given path.
    ///
    /// Creates the database file and schema if they don't exist, and runs any
    /// pending migrations. The database is configured with WAL journaling and
    /// a busy timeout to handle concurrent access gracefully.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();

        let path_str = path_ref.to_string_lossy();
        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // journal_mode returns the resulting mode as a row, so it cannot go
        // through execute_batch. In-memory databases report "memory" here.
        let _journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        // Migration from version 0 (fresh database) to version 1
        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS competition (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    competition_id TEXT NOT NULL,
                    expires_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entries (
                    channel_id TEXT NOT NULL,
                    message_id TEXT NOT NULL,
                    author_id TEXT NOT NULL,
                    competition_id TEXT NOT NULL,
                    vote_count INTEGER NOT NULL DEFAULT 1,
                    PRIMARY KEY (channel_id, message_id)
                );

                CREATE INDEX IF NOT EXISTS idx_entries_ranking
                    ON entries(competition_id, vote_count DESC);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        // Future migrations would go here:
        // if from_version < 2 { ... }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepositoryError::corruption("competition expiry timestamp"))
}

#[async_trait]
impl ChallengeRepository for SqliteRepository {
    async fn current_competition(&self) -> Result<Option<Competition>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT competition_id, expires_at FROM competition WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("current_competition", e.to_string()))?;

            match row {
                Some((id, expires_at)) => Ok(Some(Competition {
                    id: CompetitionId(id),
                    expires_at: parse_timestamp(&expires_at)?,
                })),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| RepositoryError::storage("current_competition", e.to_string()))?
    }

    async fn set_current_competition(
        &self,
        competition: &Competition,
    ) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let id = competition.id.0.clone();
        let expires_at = competition.expires_at.to_rfc3339();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO competition (id, competition_id, expires_at)
                 VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     competition_id = excluded.competition_id,
                     expires_at = excluded.expires_at",
                params![id, expires_at],
            )
            .map_err(|e| RepositoryError::storage("set_current_competition", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::storage("set_current_competition", e.to_string()))?
    }

    async fn record_approval(
        &self,
        entry_ref: &EntryRef,
        author_id: &UserId,
        competition_id: &CompetitionId,
    ) -> Result<u64, RepositoryError> {
        let conn = self.conn.clone();
        let channel_id = entry_ref.channel_id.0.clone();
        let message_id = entry_ref.message_id.0.clone();
        let author_id = author_id.0.clone();
        let competition_id = competition_id.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            // Increment-in-place at the store. The conflict path must not
            // rewrite author_id or competition_id: the entry stays pinned to
            // its originating competition.
            let vote_count: i64 = conn
                .query_row(
                    "INSERT INTO entries (channel_id, message_id, author_id, competition_id, vote_count)
                     VALUES (?1, ?2, ?3, ?4, 1)
                     ON CONFLICT(channel_id, message_id) DO UPDATE SET
                         vote_count = vote_count + 1
                     RETURNING vote_count",
                    params![channel_id, message_id, author_id, competition_id],
                    |row| row.get(0),
                )
                .map_err(|e| RepositoryError::storage("record_approval", e.to_string()))?;

            Ok(vote_count as u64)
        })
        .await
        .map_err(|e| RepositoryError::storage("record_approval", e.to_string()))?
    }

    async fn top_entries(
        &self,
        competition_id: &CompetitionId,
        limit: usize,
    ) -> Result<Vec<Entry>, RepositoryError> {
        let conn = self.conn.clone();
        let competition_id = competition_id.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut statement = conn
                .prepare(
                    "SELECT channel_id, message_id, author_id, competition_id, vote_count
                     FROM entries
                     WHERE competition_id = ?1
                     ORDER BY vote_count DESC
                     LIMIT ?2",
                )
                .map_err(|e| RepositoryError::storage("top_entries", e.to_string()))?;

            let rows = statement
                .query_map(params![competition_id, limit as i64], |row| {
                    Ok(Entry {
                        entry_ref: EntryRef {
                            channel_id: row.get::<_, String>(0)?.into(),
                            message_id: row.get::<_, String>(1)?.into(),
                        },
                        author_id: row.get::<_, String>(2)?.into(),
                        competition_id: row.get::<_, String>(3)?.into(),
                        vote_count: row.get::<_, i64>(4)? as u64,
                    })
                })
                .map_err(|e| RepositoryError::storage("top_entries", e.to_string()))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(|e| RepositoryError::storage("top_entries", e.to_string()))?);
            }

            Ok(entries)
        })
        .await
        .map_err(|e| RepositoryError::storage("top_entries", e.to_string()))?
    }
}
