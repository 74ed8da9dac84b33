//! Match phase, listing status and toss types

use serde::{Deserialize, Serialize};

/// Canonical phase of a match
///
/// This is the only stored phase field. The coarse listing status shown on
/// dashboards is derived from it with [`MatchPhase::listing_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPhase {
    /// Fixture exists, toss not yet recorded
    PreToss,
    /// Toss recorded, play not started
    TossDone,
    /// An innings is in progress
    Live,
    /// Between the first and second innings
    InningsBreak,
    /// Match finished with a result
    Completed,
    /// Stopped after it began (weather, light, ...)
    Abandoned,
    /// Called off by an administrator
    Cancelled,
}

impl MatchPhase {
    /// Terminal phases accept no further mutations
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchPhase::Completed | MatchPhase::Abandoned | MatchPhase::Cancelled
        )
    }

    /// Derive the coarse status used for listings
    pub fn listing_status(&self) -> ListingStatus {
        match self {
            MatchPhase::PreToss | MatchPhase::TossDone => ListingStatus::Scheduled,
            MatchPhase::Live | MatchPhase::InningsBreak => ListingStatus::Live,
            MatchPhase::Completed => ListingStatus::Completed,
            MatchPhase::Abandoned => ListingStatus::Abandoned,
            MatchPhase::Cancelled => ListingStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPhase::PreToss => write!(f, "pre-toss"),
            MatchPhase::TossDone => write!(f, "toss-done"),
            MatchPhase::Live => write!(f, "live"),
            MatchPhase::InningsBreak => write!(f, "innings-break"),
            MatchPhase::Completed => write!(f, "completed"),
            MatchPhase::Abandoned => write!(f, "abandoned"),
            MatchPhase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coarse status for match listings, always derived from [`MatchPhase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Scheduled,
    Live,
    Completed,
    Abandoned,
    Cancelled,
}

/// Administrative terminal status for `SetStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Cancelled,
    Abandoned,
}

impl From<TerminalStatus> for MatchPhase {
    fn from(status: TerminalStatus) -> Self {
        match status {
            TerminalStatus::Cancelled => MatchPhase::Cancelled,
            TerminalStatus::Abandoned => MatchPhase::Abandoned,
        }
    }
}

/// What the toss winner chose to do first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Bowl,
}

/// Recorded toss outcome (immutable once set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toss {
    pub winner: String,
    pub decision: TossDecision,
    /// Unix timestamp in milliseconds
    pub completed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_status_mapping() {
        assert_eq!(MatchPhase::PreToss.listing_status(), ListingStatus::Scheduled);
        assert_eq!(MatchPhase::TossDone.listing_status(), ListingStatus::Scheduled);
        assert_eq!(MatchPhase::Live.listing_status(), ListingStatus::Live);
        assert_eq!(MatchPhase::InningsBreak.listing_status(), ListingStatus::Live);
        assert_eq!(MatchPhase::Completed.listing_status(), ListingStatus::Completed);
        assert_eq!(MatchPhase::Abandoned.listing_status(), ListingStatus::Abandoned);
        assert_eq!(MatchPhase::Cancelled.listing_status(), ListingStatus::Cancelled);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!MatchPhase::PreToss.is_terminal());
        assert!(!MatchPhase::InningsBreak.is_terminal());
        assert!(MatchPhase::Completed.is_terminal());
        assert!(MatchPhase::Abandoned.is_terminal());
        assert!(MatchPhase::Cancelled.is_terminal());
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&MatchPhase::InningsBreak).unwrap();
        assert_eq!(json, "\"innings-break\"");
        assert_eq!(MatchPhase::TossDone.to_string(), "toss-done");

        let parsed: TossDecision = serde_json::from_str("\"bowl\"").unwrap();
        assert_eq!(parsed, TossDecision::Bowl);
        assert!(serde_json::from_str::<TossDecision>("\"field\"").is_err());
    }
}
