//! Event Store Module for the ball log
//!
//! The ball log is the single source of truth for a match; the match
//! document is a cached projection written alongside it.
//!
//! - `MatchRepository`: storage seam used by the scoring service
//! - `FileRepository`: JSONL ball log + atomically rewritten match document
//! - `MemoryRepository`: in-process store, optionally without transactions
//!
//! # Write path
//!
//! ```text
//! ┌─────────┐    ┌──────────────┐    ┌────────────────┐
//! │ Scoring │───►│ append to    │───►│ rewrite        │
//! │ command │    │ events.jsonl │    │ match.json     │
//! └─────────┘    └──────────────┘    └────────────────┘
//!                      ▲                    │ failure
//!                      └──── truncate ◄─────┘
//! ```

mod file;
mod memory;
mod repository;

pub use file::{FileRepository, FileRepositoryConfig};
pub use memory::MemoryRepository;
pub use repository::{MatchRepository, StoreError, StoreResult};
