//! Data types for the live scoring engine
//!
//! This module contains the match document, the ball log entries and the
//! scorecard projection shared by storage, scoring and the HTTP layer.

mod ball_event;
mod match_doc;
mod match_state;
mod scorecard;

pub use ball_event::{effective_deliveries, BallEvent, BallEventKind, WicketType};
pub use match_doc::{
    is_valid_match_id, overs_display, CurrentBatters, InningsSummary, Match, MatchProjection, Team,
};
pub use match_state::{ListingStatus, MatchPhase, TerminalStatus, Toss, TossDecision};
pub use scorecard::{BattingStats, BowlingStats, Extras, Scorecard};
