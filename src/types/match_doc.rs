//! The live match document
//!
//! A [`Match`] is a cached projection of the ball log plus the phase and
//! roster state that the log alone does not carry.

use serde::{Deserialize, Serialize};

use super::match_state::{ListingStatus, MatchPhase, Toss};

/// One side of the fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    /// Player ids, editable until the match goes live
    #[serde(default)]
    pub players: Vec<String>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            players: Vec::new(),
        }
    }
}

/// Batters at the crease; `None` means a selection is required
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBatters {
    pub striker: Option<String>,
    pub non_striker: Option<String>,
}

impl CurrentBatters {
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.striker, &mut self.non_striker);
    }
}

/// Running totals for one innings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InningsSummary {
    pub innings: u8,
    pub runs: u32,
    pub wickets: u32,
    /// Legal deliveries only
    pub balls: u32,
    /// Display value: `2.3` is two overs and three balls
    pub overs: f64,
    #[serde(default)]
    pub dismissed_batters: Vec<String>,
}

impl InningsSummary {
    pub fn new(innings: u8) -> Self {
        Self {
            innings,
            runs: 0,
            wickets: 0,
            balls: 0,
            overs: 0.0,
            dismissed_batters: Vec::new(),
        }
    }
}

/// Cricket overs notation for a legal ball count
///
/// Not a decimal: economy must divide by `balls / 6`, never by this value.
pub fn overs_display(balls: u32) -> f64 {
    (balls / 6) as f64 + (balls % 6) as f64 / 10.0
}

/// Match ids double as storage keys, so they are restricted to a safe alphabet
pub fn is_valid_match_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The authoritative live match aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub team_a: Team,
    pub team_b: Team,
    pub match_state: MatchPhase,

    #[serde(default)]
    pub toss: Option<Toss>,

    #[serde(default)]
    pub current_innings: Option<u8>,

    #[serde(default)]
    pub batting_team: Option<String>,

    #[serde(default)]
    pub bowling_team: Option<String>,

    #[serde(default)]
    pub current_batters: CurrentBatters,

    #[serde(default)]
    pub current_bowler: Option<String>,

    /// One summary per innings, created when the innings first needs one
    #[serde(default)]
    pub innings: Vec<InningsSummary>,

    #[serde(default)]
    pub result: Option<String>,

    /// Player of record allowed to score this match
    #[serde(default)]
    pub scorer: Option<String>,

    #[serde(default)]
    pub squads_locked: bool,

    /// Incremented on every committed mutation
    #[serde(default)]
    pub version: u64,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Match {
    /// Create a fixture in `pre-toss`
    pub fn new(
        id: impl Into<String>,
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        scorer: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            team_a: Team::new(team_a),
            team_b: Team::new(team_b),
            match_state: MatchPhase::PreToss,
            toss: None,
            current_innings: None,
            batting_team: None,
            bowling_team: None,
            current_batters: CurrentBatters::default(),
            current_bowler: None,
            innings: Vec::new(),
            result: None,
            scorer,
            squads_locked: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived listing status, never stored
    pub fn status(&self) -> ListingStatus {
        self.match_state.listing_status()
    }

    pub fn is_playing_team(&self, name: &str) -> bool {
        self.team_a.name == name || self.team_b.name == name
    }

    /// The opponent of `name`, if `name` is one of the two teams
    pub fn opponent_of(&self, name: &str) -> Option<&str> {
        if self.team_a.name == name {
            Some(&self.team_b.name)
        } else if self.team_b.name == name {
            Some(&self.team_a.name)
        } else {
            None
        }
    }

    pub fn team_mut(&mut self, name: &str) -> Option<&mut Team> {
        if self.team_a.name == name {
            Some(&mut self.team_a)
        } else if self.team_b.name == name {
            Some(&mut self.team_b)
        } else {
            None
        }
    }

    pub fn innings_summary(&self, innings: u8) -> Option<&InningsSummary> {
        self.innings.iter().find(|s| s.innings == innings)
    }

    /// Summary for `innings`, created empty on first access
    pub fn innings_summary_mut(&mut self, innings: u8) -> &mut InningsSummary {
        let at = self.innings.partition_point(|s| s.innings < innings);
        if self.innings.get(at).map(|s| s.innings) != Some(innings) {
            self.innings.insert(at, InningsSummary::new(innings));
        }
        &mut self.innings[at]
    }

    /// Full projection published to viewers, including the derived status
    pub fn projection(&self) -> MatchProjection<'_> {
        MatchProjection {
            inner: self,
            status: self.status(),
        }
    }
}

/// Serialized view of a match with its derived listing status
#[derive(Debug, Serialize)]
pub struct MatchProjection<'a> {
    #[serde(flatten)]
    pub inner: &'a Match,
    pub status: ListingStatus,
}
