//! File-backed repository
//!
//! Layout under the data directory:
//!
//! ```text
//! data/
//! └── matches/
//!     └── <match id>/
//!         ├── match.json     cached match document (atomic rewrite)
//!         └── events.jsonl   append-only ball log, one event per line
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use super::repository::{MatchRepository, StoreError, StoreResult};
use crate::types::{is_valid_match_id, BallEvent, Match};
use crate::utils::{atomic_write, cleanup_temp_files, truncate_partial_line, truncate_to};

/// Configuration for the file repository
#[derive(Debug, Clone)]
pub struct FileRepositoryConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for FileRepositoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl FileRepositoryConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.data_dir.join("matches")
    }

    pub fn match_dir(&self, match_id: &str) -> PathBuf {
        self.matches_dir().join(match_id)
    }

    /// Get path to a match document
    pub fn match_path(&self, match_id: &str) -> PathBuf {
        self.match_dir(match_id).join("match.json")
    }

    /// Get path to a match's events.jsonl
    pub fn events_path(&self, match_id: &str) -> PathBuf {
        self.match_dir(match_id).join("events.jsonl")
    }
}

/// Repository persisting each match as a document plus a JSONL ball log
///
/// Appends are fsync'd. An atomic commit appends the events first, then
/// replaces the document; if the document write fails the log is truncated
/// back to its previous length, so no event survives without its summary.
pub struct FileRepository {
    config: FileRepositoryConfig,
    /// Next sequence number per match; also serializes all file writes
    next_seq: Mutex<HashMap<String, u64>>,
}

impl FileRepository {
    /// Open (or create) the data directory and clear interrupted writes
    pub fn open(config: FileRepositoryConfig) -> StoreResult<Self> {
        let matches_dir = config.matches_dir();
        fs::create_dir_all(&matches_dir)?;

        let mut match_count = 0;
        for entry in fs::read_dir(&matches_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                let cleaned = cleanup_temp_files(&path)?;
                if cleaned > 0 {
                    warn!("Removed {} interrupted writes in {}", cleaned, path.display());
                }
                let torn = truncate_partial_line(path.join("events.jsonl"))?;
                if torn > 0 {
                    warn!("Cut {} bytes of an interrupted append in {}", torn, path.display());
                }
                match_count += 1;
            }
        }

        info!(
            "Opened match store at {} ({} matches)",
            config.data_dir.display(),
            match_count
        );

        Ok(Self {
            config,
            next_seq: Mutex::new(HashMap::new()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &FileRepositoryConfig {
        &self.config
    }

    fn read_match(path: &Path) -> StoreResult<Option<Match>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_match(&self, doc: &Match) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(doc)?;
        atomic_write(self.config.match_path(&doc.id), &json)?;
        Ok(())
    }

    /// Look up the next sequence number, scanning the log on first use
    fn next_seq_for(&self, cache: &mut HashMap<String, u64>, match_id: &str) -> StoreResult<u64> {
        if let Some(next) = cache.get(match_id) {
            return Ok(*next);
        }
        let next = self
            .load_events(match_id)?
            .last()
            .map(|e| e.seq + 1)
            .unwrap_or(1);
        cache.insert(match_id.to_string(), next);
        Ok(next)
    }

    /// Append events with consecutive sequence numbers starting at `next`
    fn append_lines(&self, match_id: &str, events: &mut [BallEvent], mut next: u64) -> StoreResult<u64> {
        let events_path = self.config.events_path(match_id);
        if let Some(parent) = events_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)?;

        for event in events.iter_mut() {
            event.seq = next;
            writeln!(file, "{}", event.to_json_line()?)?;
            next += 1;
        }

        // Sync to disk for durability
        file.sync_all()?;
        Ok(next)
    }

    /// Cut a partial trailing line so the next append starts on a fresh line
    fn repair_log(&self, match_id: &str) -> StoreResult<()> {
        let torn = truncate_partial_line(self.config.events_path(match_id))?;
        if torn > 0 {
            warn!("Cut {} bytes of an interrupted append for match {}", torn, match_id);
        }
        Ok(())
    }

    fn ensure_exists(&self, match_id: &str) -> StoreResult<()> {
        if is_valid_match_id(match_id) && self.config.match_path(match_id).exists() {
            Ok(())
        } else {
            Err(StoreError::NotFound(match_id.to_string()))
        }
    }
}

impl MatchRepository for FileRepository {
    fn insert_match(&self, doc: &Match) -> StoreResult<()> {
        if !is_valid_match_id(&doc.id) {
            return Err(StoreError::Corrupted {
                match_id: doc.id.clone(),
                reason: "match id is not a valid storage key".to_string(),
            });
        }

        let _writes = self.next_seq.lock();
        if self.config.match_path(&doc.id).exists() {
            return Err(StoreError::AlreadyExists(doc.id.clone()));
        }
        self.write_match(doc)
    }

    fn load_match(&self, match_id: &str) -> StoreResult<Option<Match>> {
        if !is_valid_match_id(match_id) {
            return Ok(None);
        }
        Self::read_match(&self.config.match_path(match_id))
    }

    fn list_matches(&self) -> StoreResult<Vec<Match>> {
        let matches_dir = self.config.matches_dir();
        if !matches_dir.exists() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for entry in fs::read_dir(&matches_dir)? {
            let path = entry?.path().join("match.json");
            match Self::read_match(&path) {
                Ok(Some(doc)) => matches.push(doc),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable match document {}: {}", path.display(), e),
            }
        }

        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn load_events(&self, match_id: &str) -> StoreResult<Vec<BallEvent>> {
        if !is_valid_match_id(match_id) {
            return Ok(Vec::new());
        }

        let events_path = self.config.events_path(match_id);
        if !events_path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&events_path)?;
        let mut events = Vec::new();
        let mut lines = bytes.split(|&b| b == b'\n').enumerate().peekable();

        while let Some((line_num, line)) = lines.next() {
            // Text after the final newline is an append that never completed.
            if lines.peek().is_none() {
                if !line.is_empty() {
                    warn!(
                        "Ignoring partial ball event for match {} at line {}",
                        match_id,
                        line_num + 1
                    );
                }
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let parsed = std::str::from_utf8(line)
                .map_err(|e| e.to_string())
                .and_then(|text| BallEvent::from_json_line(text).map_err(|e| e.to_string()));
            match parsed {
                Ok(event) => events.push(event),
                Err(reason) => {
                    return Err(StoreError::Corrupted {
                        match_id: match_id.to_string(),
                        reason: format!("line {}: {}", line_num + 1, reason),
                    });
                }
            }
        }

        Ok(events)
    }

    fn append_event(&self, event: &mut BallEvent) -> StoreResult<()> {
        let match_id = event.match_id.clone();
        self.ensure_exists(&match_id)?;

        let mut cache = self.next_seq.lock();
        self.repair_log(&match_id)?;
        let next = self.next_seq_for(&mut cache, &match_id)?;
        let next = self.append_lines(&match_id, std::slice::from_mut(event), next)?;
        cache.insert(match_id, next);
        Ok(())
    }

    fn save_match(&self, doc: &Match) -> StoreResult<()> {
        self.ensure_exists(&doc.id)?;
        let _writes = self.next_seq.lock();
        self.write_match(doc)
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn commit_atomic(&self, events: &mut [BallEvent], doc: &Match) -> StoreResult<()> {
        self.ensure_exists(&doc.id)?;

        let mut cache = self.next_seq.lock();
        self.repair_log(&doc.id)?;
        let next = self.next_seq_for(&mut cache, &doc.id)?;

        let events_path = self.config.events_path(&doc.id);
        let original_len = fs::metadata(&events_path).map(|m| m.len()).unwrap_or(0);

        let committed = self
            .append_lines(&doc.id, events, next)
            .and_then(|next| self.write_match(doc).map(|_| next));

        match committed {
            Ok(next) => {
                cache.insert(doc.id.clone(), next);
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = truncate_to(&events_path, original_len) {
                    error!(
                        "Failed to roll back ball log for match {}: {}",
                        doc.id, rollback
                    );
                }
                cache.remove(&doc.id);
                Err(e)
            }
        }
    }
}
