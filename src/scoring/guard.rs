//! Per-match write serialization and commit strategies

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::processor::rebuild_summaries;
use crate::event_store::{MatchRepository, StoreError, StoreResult};
use crate::types::{BallEvent, Match};

/// How a mutation reaches storage, chosen once per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Per-match lock plus an atomic event + document commit
    Transactional,
    /// No lock; append, then rebuild the summaries from the log and save
    BestEffort,
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStrategy::Transactional => write!(f, "transactional"),
            CommitStrategy::BestEffort => write!(f, "best_effort"),
        }
    }
}

impl FromStr for CommitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" => Ok(CommitStrategy::Transactional),
            "best_effort" | "best-effort" => Ok(CommitStrategy::BestEffort),
            other => Err(format!("unknown commit strategy '{}'", other)),
        }
    }
}

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Lock table keyed by match id; no lock ever spans two matches
#[derive(Default)]
pub struct MatchLocks {
    table: LockTable,
}

impl MatchLocks {
    pub async fn acquire(&self, match_id: &str) -> MatchLock {
        let lock = {
            let mut table = self.table.lock();
            table.entry(match_id.to_string()).or_default().clone()
        };
        MatchLock {
            guard: Some(lock.lock_owned().await),
            table: self.table.clone(),
        }
    }

    /// Matches that currently hold or await a lock
    pub fn tracked(&self) -> usize {
        self.table.lock().len()
    }
}

/// A held match lock; entries nobody holds or awaits leave the table on release
pub struct MatchLock {
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl Drop for MatchLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the entry under the table lock, so a count of one is idle.
        self.table.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Proof that the caller may mutate a match under the active strategy
///
/// Holds the match lock when transactional; empty under best effort.
pub struct MatchPermit {
    lock: Option<MatchLock>,
}

impl MatchPermit {
    pub fn is_exclusive(&self) -> bool {
        self.lock.is_some()
    }
}

/// Serializes writers per match and commits their results
pub struct ConcurrencyGuard {
    repo: Arc<dyn MatchRepository>,
    strategy: CommitStrategy,
    locks: MatchLocks,
}

impl ConcurrencyGuard {
    /// Transactional is downgraded when the backend cannot honor it
    pub fn new(repo: Arc<dyn MatchRepository>, requested: CommitStrategy) -> Self {
        let strategy = match requested {
            CommitStrategy::Transactional if !repo.supports_transactions() => {
                warn!("Storage backend has no transactions, committing best-effort");
                CommitStrategy::BestEffort
            }
            other => other,
        };
        info!(%strategy, "Concurrency guard ready");

        Self {
            repo,
            strategy,
            locks: MatchLocks::default(),
        }
    }

    pub fn strategy(&self) -> CommitStrategy {
        self.strategy
    }

    pub fn repository(&self) -> &Arc<dyn MatchRepository> {
        &self.repo
    }

    pub fn tracked_matches(&self) -> usize {
        self.locks.tracked()
    }

    /// Wait for the right to mutate `match_id`
    pub async fn enter(&self, match_id: &str) -> MatchPermit {
        let lock = match self.strategy {
            CommitStrategy::Transactional => Some(self.locks.acquire(match_id).await),
            CommitStrategy::BestEffort => None,
        };
        MatchPermit { lock }
    }

    /// Store `events` and `doc`; sequence numbers are written back into `events`
    ///
    /// Under best effort the innings summaries of `doc` are replaced by their
    /// replay from the stored log before the document is saved.
    pub fn commit(&self, _permit: &MatchPermit, events: &mut [BallEvent], doc: &mut Match) -> StoreResult<()> {
        match self.strategy {
            CommitStrategy::Transactional => match self.repo.commit_atomic(events, doc) {
                Err(StoreError::TransactionsUnavailable) => {
                    warn!(match_id = %doc.id, "Atomic commit unavailable, falling back to best-effort");
                    self.commit_best_effort(events, doc)
                }
                other => other,
            },
            CommitStrategy::BestEffort => self.commit_best_effort(events, doc),
        }
    }

    fn commit_best_effort(&self, events: &mut [BallEvent], doc: &mut Match) -> StoreResult<()> {
        for event in events.iter_mut() {
            self.repo.append_event(event)?;
        }
        if !events.is_empty() {
            let log = self.repo.load_events(&doc.id)?;
            rebuild_summaries(doc, &log);
            debug!(match_id = %doc.id, events = log.len(), "Rebuilt summaries from ball log");
        }
        self.repo.save_match(doc)
    }
}
