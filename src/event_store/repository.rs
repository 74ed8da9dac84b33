//! Storage seam for match documents and their ball logs

use crate::types::{BallEvent, Match};

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in repository operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("match {0} already exists")]
    AlreadyExists(String),

    #[error("match {0} not found")]
    NotFound(String),

    /// The backend cannot commit events and document as one unit
    #[error("transactions are not available on this storage backend")]
    TransactionsUnavailable,

    #[error("corrupted ball log for match {match_id}: {reason}")]
    Corrupted { match_id: String, reason: String },
}

/// Persistence for matches and their append-only ball logs
///
/// Ball logs are ordered by `seq`, which the repository assigns on append.
/// Implementations must never rewrite or delete a stored event.
pub trait MatchRepository: Send + Sync {
    /// Store a new match document; fails if the id is taken
    fn insert_match(&self, doc: &Match) -> StoreResult<()>;

    fn load_match(&self, match_id: &str) -> StoreResult<Option<Match>>;

    fn list_matches(&self) -> StoreResult<Vec<Match>>;

    /// Full ball log of a match in sequence order
    fn load_events(&self, match_id: &str) -> StoreResult<Vec<BallEvent>>;

    /// Ball log entries of one innings in sequence order
    fn load_innings_events(&self, match_id: &str, innings: u8) -> StoreResult<Vec<BallEvent>> {
        Ok(self
            .load_events(match_id)?
            .into_iter()
            .filter(|e| e.innings == innings)
            .collect())
    }

    /// Assign the next sequence number to `event` and append it
    fn append_event(&self, event: &mut BallEvent) -> StoreResult<()>;

    /// Overwrite an existing match document
    fn save_match(&self, doc: &Match) -> StoreResult<()>;

    /// Whether [`MatchRepository::commit_atomic`] is available
    fn supports_transactions(&self) -> bool;

    /// Append `events` and overwrite the document as a single unit
    ///
    /// Either everything is stored or nothing is. Backends without
    /// transactions return [`StoreError::TransactionsUnavailable`].
    fn commit_atomic(&self, events: &mut [BallEvent], doc: &Match) -> StoreResult<()>;
}
