//! Cricket Live Scoring Engine
//!
//! Scores a cricket match ball by ball and keeps every connected viewer in
//! step with the authoritative match state.
//!
//! # Features
//!
//! - **Append-only ball log**: every delivery, undo and announcement is a JSONL entry
//! - **Replayable**: innings summaries and scorecards are folds of the log
//! - **Serialized writes**: one committed mutation per match at a time
//! - **Live fan-out**: `match:<id>` and `dashboard` channels over WebSocket and SSE
//!
//! # Modules
//!
//! - `types`: Match document, ball events and scorecard types
//! - `event_store`: File and in-memory repositories for matches and ball logs
//! - `scoring`: State machine, ball processor, aggregator, guard and dispatcher
//! - `api`: Axum router, bearer auth, WebSocket hub and SSE feed
//! - `config`: Environment-driven server configuration
//! - `utils`: Timestamps and atomic file helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cricket_live::api::websocket::ChannelHub;
//! use cricket_live::event_store::MemoryRepository;
//! use cricket_live::scoring::{
//!     Actor, AssignedScorerPolicy, BallInput, BroadcastDispatcher, CommitStrategy, NewMatch,
//!     ScoringService,
//! };
//! use cricket_live::types::TossDecision;
//!
//! # async fn run() -> Result<(), cricket_live::ScoringError> {
//! let hub = Arc::new(ChannelHub::new(1024));
//! let service = ScoringService::new(
//!     Arc::new(MemoryRepository::new()),
//!     CommitStrategy::Transactional,
//!     Arc::new(AssignedScorerPolicy),
//!     BroadcastDispatcher::new(hub, Duration::from_millis(250)),
//! );
//!
//! let admin = Actor::admin("root");
//! service
//!     .create_match(&admin, NewMatch {
//!         id: "final".into(),
//!         team_a: "A".into(),
//!         team_b: "B".into(),
//!         scorer: None,
//!     })
//!     .await?;
//! service.record_toss(&admin, "final", "A", TossDecision::Bat).await?;
//! service.start_match(&admin, "final").await?;
//! service
//!     .select_batters(&admin, "final", Some("a1".into()), Some("a2".into()))
//!     .await?;
//! service.select_bowler(&admin, "final", "b1").await?;
//! service.submit_ball(&admin, "final", BallInput::runs(4)).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod event_store;
pub mod scoring;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::ServerConfig;
pub use error::{ScoringError, ScoringResult};
pub use scoring::ScoringService;
pub use types::{BallEvent, BallEventKind, Match, MatchPhase, Scorecard};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
