//! In-memory repository for tests and ephemeral deployments

use std::collections::HashMap;

use parking_lot::RwLock;

use super::repository::{MatchRepository, StoreError, StoreResult};
use crate::types::{BallEvent, Match};

struct MatchRecord {
    doc: Match,
    events: Vec<BallEvent>,
}

/// Repository holding every match in process memory
///
/// Transactions are emulated by applying a whole commit under one write
/// lock. [`MemoryRepository::without_transactions`] builds a store that
/// refuses atomic commits, which exercises the best-effort commit path.
pub struct MemoryRepository {
    records: RwLock<HashMap<String, MatchRecord>>,
    transactional: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            transactional: true,
        }
    }

    pub fn without_transactions() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            transactional: false,
        }
    }

    fn push_event(record: &mut MatchRecord, event: &mut BallEvent) {
        event.seq = record.events.last().map(|e| e.seq + 1).unwrap_or(1);
        record.events.push(event.clone());
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchRepository for MemoryRepository {
    fn insert_match(&self, doc: &Match) -> StoreResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&doc.id) {
            return Err(StoreError::AlreadyExists(doc.id.clone()));
        }
        records.insert(
            doc.id.clone(),
            MatchRecord {
                doc: doc.clone(),
                events: Vec::new(),
            },
        );
        Ok(())
    }

    fn load_match(&self, match_id: &str) -> StoreResult<Option<Match>> {
        Ok(self.records.read().get(match_id).map(|r| r.doc.clone()))
    }

    fn list_matches(&self) -> StoreResult<Vec<Match>> {
        let mut matches: Vec<Match> = self.records.read().values().map(|r| r.doc.clone()).collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn load_events(&self, match_id: &str) -> StoreResult<Vec<BallEvent>> {
        Ok(self
            .records
            .read()
            .get(match_id)
            .map(|r| r.events.clone())
            .unwrap_or_default())
    }

    fn append_event(&self, event: &mut BallEvent) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&event.match_id)
            .ok_or_else(|| StoreError::NotFound(event.match_id.clone()))?;
        Self::push_event(record, event);
        Ok(())
    }

    fn save_match(&self, doc: &Match) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&doc.id)
            .ok_or_else(|| StoreError::NotFound(doc.id.clone()))?;
        record.doc = doc.clone();
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    fn commit_atomic(&self, events: &mut [BallEvent], doc: &Match) -> StoreResult<()> {
        if !self.transactional {
            return Err(StoreError::TransactionsUnavailable);
        }

        let mut records = self.records.write();
        let record = records
            .get_mut(&doc.id)
            .ok_or_else(|| StoreError::NotFound(doc.id.clone()))?;

        for event in events.iter_mut() {
            Self::push_event(record, event);
        }
        record.doc = doc.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BallEventKind;

    #[test]
    fn test_sequence_numbers_are_per_match() {
        let repo = MemoryRepository::new();
        repo.insert_match(&Match::new("m1", "A", "B", None, 0)).unwrap();
        repo.insert_match(&Match::new("m2", "C", "D", None, 0)).unwrap();

        let mut first = BallEvent::new("m1", 1, BallEventKind::Dot, "s", 0);
        let mut second = BallEvent::new("m1", 1, BallEventKind::Dot, "s", 0);
        let mut other = BallEvent::new("m2", 1, BallEventKind::Dot, "s", 0);
        repo.append_event(&mut first).unwrap();
        repo.append_event(&mut second).unwrap();
        repo.append_event(&mut other).unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(other.seq, 1);
        assert_eq!(repo.load_events("m1").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let repo = MemoryRepository::new();
        repo.insert_match(&Match::new("m1", "A", "B", None, 0)).unwrap();

        let err = repo.insert_match(&Match::new("m1", "A", "B", None, 0)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "m1"));
    }

    #[test]
    fn test_commit_atomic_without_transactions() {
        let repo = MemoryRepository::without_transactions();
        let doc = Match::new("m1", "A", "B", None, 0);
        repo.insert_match(&doc).unwrap();

        let mut events = vec![BallEvent::new("m1", 1, BallEventKind::Dot, "s", 0)];
        let err = repo.commit_atomic(&mut events, &doc).unwrap_err();

        assert!(matches!(err, StoreError::TransactionsUnavailable));
        assert!(repo.load_events("m1").unwrap().is_empty());
    }
}
