//! Ball events for the append-only match log
//!
//! Every scoring action is recorded as an immutable [`BallEvent`]. The live
//! innings summary is a cached fold of these events and can always be
//! rebuilt by replaying them in sequence order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Kind of entry in the ball log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BallEventKind {
    Dot,
    Runs,
    Wide,
    NoBall,
    Bye,
    LegBye,
    Wicket,
    /// Compensates an earlier delivery of the same innings
    Undo,
    /// Commentary or administrative message, folds nothing
    Announcement,
}

impl BallEventKind {
    /// True for entries that represent a ball bowled
    pub fn is_delivery(&self) -> bool {
        !matches!(self, BallEventKind::Undo | BallEventKind::Announcement)
    }

    /// Legal deliveries count toward the over
    pub fn is_legal(&self) -> bool {
        match self {
            BallEventKind::Dot
            | BallEventKind::Runs
            | BallEventKind::Bye
            | BallEventKind::LegBye
            | BallEventKind::Wicket => true,
            BallEventKind::Wide
            | BallEventKind::NoBall
            | BallEventKind::Undo
            | BallEventKind::Announcement => false,
        }
    }

    /// Penalty runs already included in the event total
    pub fn penalty_runs(&self) -> u32 {
        match self {
            BallEventKind::Wide | BallEventKind::NoBall => 1,
            _ => 0,
        }
    }

    /// Whether runs off this delivery count against the bowler
    pub fn charged_to_bowler(&self) -> bool {
        !matches!(self, BallEventKind::Bye | BallEventKind::LegBye)
    }
}

impl std::fmt::Display for BallEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallEventKind::Dot => write!(f, "dot"),
            BallEventKind::Runs => write!(f, "runs"),
            BallEventKind::Wide => write!(f, "wide"),
            BallEventKind::NoBall => write!(f, "no-ball"),
            BallEventKind::Bye => write!(f, "bye"),
            BallEventKind::LegBye => write!(f, "leg-bye"),
            BallEventKind::Wicket => write!(f, "wicket"),
            BallEventKind::Undo => write!(f, "undo"),
            BallEventKind::Announcement => write!(f, "announcement"),
        }
    }
}

/// How a batter was dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WicketType {
    Bowled,
    Caught,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
}

impl WicketType {
    /// Bowlers are not credited with run-outs
    pub fn credited_to_bowler(&self) -> bool {
        !matches!(self, WicketType::RunOut)
    }
}

/// An immutable entry in a match's ball log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallEvent {
    pub match_id: String,

    /// Per-match creation order, assigned by the repository on append
    pub seq: u64,

    /// Innings the event belongs to (0 for match-level announcements)
    pub innings: u8,

    #[serde(rename = "type")]
    pub kind: BallEventKind,

    /// Total runs for the delivery, including any penalty run
    #[serde(default)]
    pub runs: u32,

    /// Runs physically run by the batters, when it differs from the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs_ran: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batsman: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_striker: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bowler: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wicket_type: Option<WicketType>,

    /// Batter given out, when not the striker (e.g. run-out at the other end)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fielder: Option<String>,

    /// Sequence number compensated by an undo entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undoes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Unix timestamp in milliseconds
    pub created_at: i64,

    /// Identity of the scorer or administrator who wrote the entry
    pub author: String,
}

impl BallEvent {
    /// Create an event with no optional fields set; `seq` is assigned on append
    pub fn new(
        match_id: impl Into<String>,
        innings: u8,
        kind: BallEventKind,
        author: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            seq: 0,
            innings,
            kind,
            runs: 0,
            runs_ran: None,
            batsman: None,
            non_striker: None,
            bowler: None,
            wicket_type: None,
            dismissed: None,
            fielder: None,
            undoes: None,
            message: None,
            created_at,
            author: author.into(),
        }
    }

    /// Runs the batters actually ran, which drives strike rotation
    ///
    /// Falls back to the total minus the penalty run for wides and no-balls,
    /// so a single taken off a wide (total 2) counts as one run ran.
    pub fn runs_ran(&self) -> u32 {
        if let Some(ran) = self.runs_ran {
            return ran;
        }
        match self.kind {
            BallEventKind::Dot | BallEventKind::Undo | BallEventKind::Announcement => 0,
            kind => self.runs.saturating_sub(kind.penalty_runs()),
        }
    }

    pub fn is_legal(&self) -> bool {
        self.kind.is_legal()
    }

    /// The batter given out on a wicket event
    pub fn dismissed_batter(&self) -> Option<&str> {
        if self.kind != BallEventKind::Wicket {
            return None;
        }
        self.dismissed.as_deref().or(self.batsman.as_deref())
    }

    /// Serialize event to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Deliveries of an innings that have not been compensated by an undo
///
/// Undo and announcement entries are dropped; order is preserved.
pub fn effective_deliveries(events: &[BallEvent], innings: u8) -> Vec<&BallEvent> {
    let undone: HashSet<u64> = events
        .iter()
        .filter(|e| e.innings == innings && e.kind == BallEventKind::Undo)
        .filter_map(|e| e.undoes)
        .collect();

    events
        .iter()
        .filter(|e| e.innings == innings && e.kind.is_delivery() && !undone.contains(&e.seq))
        .collect()
}
