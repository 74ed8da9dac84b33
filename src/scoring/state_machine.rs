//! Match phase transitions and their guards
//!
//! ```text
//! pre-toss ─► toss-done ─► live(1) ─► innings-break ─► live(2) ─► completed
//!     └────────────┴───────────┴────────────┴─────────────┴──► abandoned | cancelled
//! ```
//!
//! Every transition mutates the match in place and returns an error without
//! touching it when a guard fails. Callers work on a copy and only persist
//! it when the transition succeeded.

use std::collections::HashSet;

use crate::error::{ScoringError, ScoringResult};
use crate::types::{BallEvent, BallEventKind, Match, MatchPhase, TerminalStatus, Toss, TossDecision};

pub(crate) fn ensure_not_terminal(m: &Match) -> ScoringResult<()> {
    if m.match_state.is_terminal() {
        return Err(ScoringError::guard(format!(
            "match is {} and accepts no further changes",
            m.match_state
        )));
    }
    Ok(())
}

pub(crate) fn ensure_live(m: &Match, action: &str) -> ScoringResult<u8> {
    ensure_not_terminal(m)?;
    match (m.match_state, m.current_innings) {
        (MatchPhase::Live, Some(innings)) => Ok(innings),
        _ => Err(ScoringError::guard(format!("match must be live to {}", action))),
    }
}

/// `pre-toss → toss-done`
pub fn record_toss(m: &mut Match, winner: &str, decision: TossDecision, now: i64) -> ScoringResult<()> {
    ensure_not_terminal(m)?;
    if m.toss.is_some() {
        return Err(ScoringError::guard("toss already completed"));
    }
    if m.match_state != MatchPhase::PreToss {
        return Err(ScoringError::guard("toss can only be recorded before the match starts"));
    }

    let loser = m
        .opponent_of(winner)
        .map(str::to_string)
        .ok_or_else(|| ScoringError::validation("winner", format!("'{}' is not playing this match", winner)))?;

    let (batting, bowling) = match decision {
        TossDecision::Bat => (winner.to_string(), loser),
        TossDecision::Bowl => (loser, winner.to_string()),
    };

    m.toss = Some(Toss {
        winner: winner.to_string(),
        decision,
        completed_at: now,
    });
    m.batting_team = Some(batting);
    m.bowling_team = Some(bowling);
    m.match_state = MatchPhase::TossDone;
    Ok(())
}

/// `toss-done → live(1)`; squads are locked from here on
pub fn start_match(m: &mut Match) -> ScoringResult<()> {
    ensure_not_terminal(m)?;
    match m.match_state {
        MatchPhase::TossDone if m.toss.is_some() => {}
        MatchPhase::PreToss => {
            return Err(ScoringError::guard("toss must be completed before the match starts"))
        }
        _ => return Err(ScoringError::guard("match has already started")),
    }

    m.match_state = MatchPhase::Live;
    m.current_innings = Some(1);
    m.squads_locked = true;
    Ok(())
}

/// `live(1) → innings-break`, swapping batting and bowling sides
pub fn end_innings(m: &mut Match) -> ScoringResult<()> {
    let innings = ensure_live(m, "end innings")?;
    if innings != 1 {
        return Err(ScoringError::guard(
            "the second innings is closed by ending the match",
        ));
    }

    m.innings_summary_mut(1);
    std::mem::swap(&mut m.batting_team, &mut m.bowling_team);
    m.current_batters = Default::default();
    m.current_bowler = None;
    m.match_state = MatchPhase::InningsBreak;
    Ok(())
}

/// `innings-break → live(2)`
pub fn start_second_innings(m: &mut Match) -> ScoringResult<()> {
    ensure_not_terminal(m)?;
    if m.match_state != MatchPhase::InningsBreak {
        return Err(ScoringError::guard(
            "second innings can only start from the innings break",
        ));
    }

    m.match_state = MatchPhase::Live;
    m.current_innings = Some(2);
    m.innings_summary_mut(2);
    Ok(())
}

/// `live(2) → completed`
pub fn end_match(m: &mut Match, result: &str) -> ScoringResult<()> {
    let result = result.trim();
    if result.is_empty() {
        return Err(ScoringError::validation("result", "result text is required"));
    }

    let innings = ensure_live(m, "end the match")?;
    if innings != 2 {
        return Err(ScoringError::guard(
            "match can only be completed during the second innings",
        ));
    }

    m.match_state = MatchPhase::Completed;
    m.result = Some(result.to_string());
    m.current_batters = Default::default();
    m.current_bowler = None;
    Ok(())
}

/// Administrative override into `abandoned` or `cancelled`
///
/// Returns the announcement entry to append when a message was supplied.
pub fn set_terminal(
    m: &mut Match,
    status: TerminalStatus,
    announcement: Option<&str>,
    author: &str,
    now: i64,
) -> ScoringResult<Option<BallEvent>> {
    ensure_not_terminal(m)?;

    let event = announcement
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(|msg| announcement_event(m, msg, author, now));

    m.match_state = status.into();
    m.current_batters = Default::default();
    m.current_bowler = None;
    Ok(event)
}

/// Commentary entry; allowed in any non-terminal phase
pub fn announce(m: &Match, message: &str, author: &str, now: i64) -> ScoringResult<BallEvent> {
    ensure_not_terminal(m)?;
    let message = message.trim();
    if message.is_empty() {
        return Err(ScoringError::validation("message", "announcement text is required"));
    }
    Ok(announcement_event(m, message, author, now))
}

fn announcement_event(m: &Match, message: &str, author: &str, now: i64) -> BallEvent {
    let mut event = BallEvent::new(
        m.id.clone(),
        m.current_innings.unwrap_or(0),
        BallEventKind::Announcement,
        author,
        now,
    );
    event.message = Some(message.to_string());
    event
}

/// Replace a team's squad; rejected once the match has started
pub fn set_squad(m: &mut Match, team: &str, players: Vec<String>) -> ScoringResult<()> {
    ensure_not_terminal(m)?;
    if m.squads_locked {
        return Err(ScoringError::guard("squads are locked once the match has started"));
    }

    let mut seen = HashSet::new();
    let players: Vec<String> = players
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect();

    let squad = m
        .team_mut(team)
        .ok_or_else(|| ScoringError::validation("team", format!("'{}' is not playing this match", team)))?;
    squad.players = players;
    Ok(())
}

/// Fill the crease after a wicket or at the start of an innings
pub fn select_batters(
    m: &mut Match,
    striker: Option<String>,
    non_striker: Option<String>,
) -> ScoringResult<()> {
    let innings = ensure_live(m, "select batters")?;
    if striker.is_none() && non_striker.is_none() {
        return Err(ScoringError::validation("batters", "at least one batter is required"));
    }
    let next_striker = striker.as_ref().or(m.current_batters.striker.as_ref());
    let next_non_striker = non_striker.as_ref().or(m.current_batters.non_striker.as_ref());
    if next_striker.is_some() && next_striker == next_non_striker {
        return Err(ScoringError::validation("batters", "striker and non-striker must differ"));
    }

    let dismissed = m
        .innings_summary(innings)
        .map(|s| s.dismissed_batters.clone())
        .unwrap_or_default();
    for batter in striker.iter().chain(non_striker.iter()) {
        if dismissed.contains(batter) {
            return Err(ScoringError::validation(
                "batters",
                format!("'{}' has already been dismissed", batter),
            ));
        }
    }

    if let Some(striker) = striker {
        m.current_batters.striker = Some(striker);
    }
    if let Some(non_striker) = non_striker {
        m.current_batters.non_striker = Some(non_striker);
    }
    Ok(())
}

/// Choose the bowler for the next over
pub fn select_bowler(m: &mut Match, bowler: &str) -> ScoringResult<()> {
    ensure_live(m, "select a bowler")?;
    let bowler = bowler.trim();
    if bowler.is_empty() {
        return Err(ScoringError::validation("bowler", "bowler id is required"));
    }
    m.current_bowler = Some(bowler.to_string());
    Ok(())
}
