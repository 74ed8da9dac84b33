//! Ball event processor
//!
//! Validates a scorer's delivery and folds it into the live innings summary
//! and roster. The fold order is fixed:
//!
//! 1. legality decides whether the ball counts toward the over
//! 2. total runs (penalty included) are added
//! 3. the overs display value is recomputed
//! 4. a wicket clears the dismissed batter's slot
//! 5. strike rotates once by `odd runs ran XOR over completed`
//!
//! Step 5 resolves the run-based and over-end swaps as a single net
//! rotation: a single off the last ball of an over leaves the batter who
//! ran it on strike for the next over.

use serde::Deserialize;

use super::state_machine::ensure_live;
use crate::error::{ScoringError, ScoringResult};
use crate::types::{
    effective_deliveries, overs_display, BallEvent, BallEventKind, CurrentBatters, InningsSummary,
    Match, WicketType,
};

/// A delivery as submitted by the scorer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallInput {
    #[serde(rename = "type")]
    pub kind: BallEventKind,
    #[serde(default)]
    pub runs: u32,
    #[serde(default)]
    pub runs_ran: Option<u32>,
    /// Defaults to the current striker
    #[serde(default)]
    pub batsman: Option<String>,
    /// Defaults to the current bowler
    #[serde(default)]
    pub bowler: Option<String>,
    #[serde(default)]
    pub wicket_type: Option<WicketType>,
    #[serde(default)]
    pub dismissed: Option<String>,
    #[serde(default)]
    pub fielder: Option<String>,
}

impl BallInput {
    pub fn new(kind: BallEventKind, runs: u32) -> Self {
        Self {
            kind,
            runs,
            runs_ran: None,
            batsman: None,
            bowler: None,
            wicket_type: None,
            dismissed: None,
            fielder: None,
        }
    }

    pub fn dot() -> Self {
        Self::new(BallEventKind::Dot, 0)
    }

    pub fn runs(runs: u32) -> Self {
        Self::new(BallEventKind::Runs, runs)
    }

    pub fn wicket(wicket_type: WicketType) -> Self {
        Self {
            wicket_type: Some(wicket_type),
            ..Self::new(BallEventKind::Wicket, 0)
        }
    }

    pub fn with_runs_ran(mut self, runs_ran: u32) -> Self {
        self.runs_ran = Some(runs_ran);
        self
    }

    pub fn with_fielder(mut self, fielder: impl Into<String>) -> Self {
        self.fielder = Some(fielder.into());
        self
    }

    pub fn with_batsman(mut self, batsman: impl Into<String>) -> Self {
        self.batsman = Some(batsman.into());
        self
    }

    pub fn with_bowler(mut self, bowler: impl Into<String>) -> Self {
        self.bowler = Some(bowler.into());
        self
    }

    pub fn with_dismissed(mut self, dismissed: impl Into<String>) -> Self {
        self.dismissed = Some(dismissed.into());
        self
    }
}

/// Reject malformed deliveries before any state is touched
pub fn validate(input: &BallInput) -> ScoringResult<()> {
    let kind = input.kind;
    if !kind.is_delivery() {
        return Err(ScoringError::validation(
            "type",
            format!("'{}' is not a delivery", kind),
        ));
    }

    match kind {
        BallEventKind::Dot if input.runs != 0 => {
            return Err(ScoringError::validation("runs", "a dot ball scores no runs"));
        }
        BallEventKind::Runs if input.runs == 0 => {
            return Err(ScoringError::validation("runs", "use a dot ball for no runs"));
        }
        BallEventKind::Bye | BallEventKind::LegBye if input.runs == 0 => {
            return Err(ScoringError::validation("runs", "byes must score at least one run"));
        }
        BallEventKind::Wide | BallEventKind::NoBall if input.runs < kind.penalty_runs() => {
            return Err(ScoringError::validation("runs", "total must include the penalty run"));
        }
        _ => {}
    }

    match (kind, input.wicket_type) {
        (BallEventKind::Wicket, None) => {
            return Err(ScoringError::validation("wicketType", "a wicket needs a dismissal type"));
        }
        (BallEventKind::Wicket, Some(_)) => {}
        (_, Some(_)) => {
            return Err(ScoringError::validation("wicketType", "only wicket deliveries carry a dismissal"));
        }
        (_, None) => {}
    }

    if kind != BallEventKind::Wicket && input.dismissed.is_some() {
        return Err(ScoringError::validation("dismissed", "only wicket deliveries dismiss a batter"));
    }

    if let Some(ran) = input.runs_ran {
        if ran > input.runs.saturating_sub(kind.penalty_runs()) {
            return Err(ScoringError::validation("runsRan", "cannot exceed the runs scored"));
        }
    }

    Ok(())
}

/// Validate a delivery and fold it into the live innings
///
/// Returns the event to append to the ball log.
pub fn apply_delivery(m: &mut Match, input: BallInput, author: &str, now: i64) -> ScoringResult<BallEvent> {
    let innings = ensure_live(m, "score a delivery")?;
    validate(&input)?;

    let mut event = BallEvent::new(m.id.clone(), innings, input.kind, author, now);
    event.runs = input.runs;
    event.runs_ran = input.runs_ran;
    event.batsman = input.batsman.or_else(|| m.current_batters.striker.clone());
    event.non_striker = m.current_batters.non_striker.clone();
    event.bowler = input.bowler.or_else(|| m.current_bowler.clone());
    event.wicket_type = input.wicket_type;
    event.fielder = input.fielder;

    let batsman = event
        .batsman
        .as_deref()
        .ok_or_else(|| ScoringError::guard("striker must be selected before the next delivery"))?;
    if event.bowler.is_none() {
        return Err(ScoringError::guard("bowler must be selected before the next delivery"));
    }
    let already_out = m
        .innings_summary(innings)
        .is_some_and(|s| s.dismissed_batters.iter().any(|d| d == batsman));
    if already_out {
        return Err(ScoringError::validation(
            "batsman",
            format!("'{}' is already out this innings", batsman),
        ));
    }

    if let Some(out) = input.dismissed {
        let at_crease = event.batsman.as_deref() == Some(out.as_str())
            || event.non_striker.as_deref() == Some(out.as_str());
        if !at_crease {
            return Err(ScoringError::validation(
                "dismissed",
                format!("'{}' is not at the crease", out),
            ));
        }
        event.dismissed = Some(out);
    }

    fold(m, &event);
    Ok(event)
}

/// Compensate the most recent delivery of the current innings
///
/// The summary is rebuilt from the remaining deliveries and the roster is
/// restored to what it was before the compensated ball.
pub fn apply_undo(m: &mut Match, log: &[BallEvent], author: &str, now: i64) -> ScoringResult<BallEvent> {
    let innings = ensure_live(m, "undo a delivery")?;

    let deliveries = effective_deliveries(log, innings);
    let (target, remaining) = deliveries
        .split_last()
        .ok_or_else(|| ScoringError::guard("nothing to undo in the current innings"))?;

    let mut summary = InningsSummary::new(innings);
    for event in remaining {
        fold_summary(&mut summary, event);
    }
    *m.innings_summary_mut(innings) = summary;

    m.current_batters = CurrentBatters {
        striker: target.batsman.clone(),
        non_striker: target.non_striker.clone(),
    };
    m.current_bowler = target.bowler.clone();

    let mut event = BallEvent::new(m.id.clone(), innings, BallEventKind::Undo, author, now);
    event.undoes = Some(target.seq);
    Ok(event)
}

/// Replay an innings' surviving deliveries into a fresh summary
pub fn replay_summary(innings: u8, log: &[BallEvent]) -> InningsSummary {
    let mut summary = InningsSummary::new(innings);
    for event in effective_deliveries(log, innings) {
        fold_summary(&mut summary, event);
    }
    summary
}

/// Overwrite every innings summary with its replay from `log`
///
/// Roster fields are left untouched; they are not derivable from the log.
pub fn rebuild_summaries(m: &mut Match, log: &[BallEvent]) {
    for innings in 1..=2u8 {
        let has_events = log.iter().any(|e| e.innings == innings);
        if has_events || m.innings_summary(innings).is_some() {
            *m.innings_summary_mut(innings) = replay_summary(innings, log);
        }
    }
}

/// Bring the stored summaries in line with the log
///
/// Returns `true` when a summary had drifted and was rewritten.
pub fn reconcile(m: &mut Match, log: &[BallEvent]) -> bool {
    let before = m.innings.clone();
    rebuild_summaries(m, log);
    m.innings != before
}

fn fold(m: &mut Match, event: &BallEvent) {
    let summary = m.innings_summary_mut(event.innings);
    fold_summary(summary, event);
    let balls = summary.balls;
    update_roster(m, event, balls);
}

fn fold_summary(summary: &mut InningsSummary, event: &BallEvent) {
    summary.runs += event.runs;
    if event.is_legal() {
        summary.balls += 1;
    }
    summary.overs = overs_display(summary.balls);

    if event.kind == BallEventKind::Wicket {
        summary.wickets += 1;
        if let Some(out) = event.dismissed_batter() {
            summary.dismissed_batters.push(out.to_string());
        }
    }
}

fn update_roster(m: &mut Match, event: &BallEvent, balls: u32) {
    let batters = &mut m.current_batters;

    if event.kind == BallEventKind::Wicket {
        match event.dismissed_batter() {
            Some(out) if batters.non_striker.as_deref() == Some(out) => batters.non_striker = None,
            _ => batters.striker = None,
        }
    }

    let over_completed = event.is_legal() && balls % 6 == 0;
    let odd_runs_ran = event.runs_ran() % 2 == 1;
    if odd_runs_ran != over_completed {
        batters.swap();
    }

    if over_completed {
        m.current_bowler = None;
    }
}
