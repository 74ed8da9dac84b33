//! Scorecard projection types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::match_doc::InningsSummary;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattingStats {
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    /// `None` while not out
    pub dismissal: Option<String>,
    pub strike_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BowlingStats {
    pub balls: u32,
    pub overs: f64,
    pub runs_conceded: u32,
    pub wickets: u32,
    pub wides: u32,
    pub no_balls: u32,
    /// Runs per six legal balls
    pub economy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extras {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
    pub total: u32,
}

/// Per-innings scorecard rebuilt from the ball log
///
/// Maps are ordered by player id so serialization is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub match_id: String,
    pub innings: u8,
    pub batting: BTreeMap<String, BattingStats>,
    pub bowling: BTreeMap<String, BowlingStats>,
    pub extras: Extras,
    pub totals: InningsSummary,
}
