//! Scorecard aggregation
//!
//! Pure replay of one innings of the ball log into per-player statistics.
//! Nothing here reads the match document; the totals it produces are checked
//! against the live summary by the replay-equivalence tests.

use std::collections::BTreeMap;

use crate::types::{
    effective_deliveries, overs_display, BallEvent, BallEventKind, BattingStats, BowlingStats,
    Extras, InningsSummary, Scorecard, WicketType,
};

const UNKNOWN_PLAYER: &str = "unknown";

/// Build the scorecard for `innings` from the full match log
///
/// Compensated deliveries are excluded before any counting. The same log
/// always serializes to the same bytes.
pub fn aggregate(match_id: &str, innings: u8, events: &[BallEvent]) -> Scorecard {
    let deliveries = effective_deliveries(events, innings);

    let mut batting: BTreeMap<String, BattingStats> = BTreeMap::new();
    let mut bowling: BTreeMap<String, BowlingStats> = BTreeMap::new();
    let mut extras = Extras::default();

    for event in &deliveries {
        if let Some(batsman) = &event.batsman {
            let stats = batting.entry(batsman.clone()).or_default();
            if event.is_legal() {
                stats.balls += 1;
            }
            if event.kind == BallEventKind::Runs {
                stats.runs += event.runs;
                match event.runs {
                    4 => stats.fours += 1,
                    6 => stats.sixes += 1,
                    _ => {}
                }
            }
        }
        if let Some(non_striker) = &event.non_striker {
            batting.entry(non_striker.clone()).or_default();
        }
        if let Some(out) = event.dismissed_batter() {
            batting.entry(out.to_string()).or_default().dismissal = Some(dismissal_text(event));
        }

        if let Some(bowler) = &event.bowler {
            let stats = bowling.entry(bowler.clone()).or_default();
            if event.is_legal() {
                stats.balls += 1;
            }
            if event.kind.charged_to_bowler() {
                stats.runs_conceded += event.runs;
            }
            match event.kind {
                BallEventKind::Wide => stats.wides += 1,
                BallEventKind::NoBall => stats.no_balls += 1,
                BallEventKind::Wicket => {
                    if event.wicket_type.is_some_and(|w| w.credited_to_bowler()) {
                        stats.wickets += 1;
                    }
                }
                _ => {}
            }
        }

        match event.kind {
            BallEventKind::Wide => extras.wides += event.runs,
            BallEventKind::NoBall => extras.no_balls += event.runs,
            BallEventKind::Bye => extras.byes += event.runs,
            BallEventKind::LegBye => extras.leg_byes += event.runs,
            _ => {}
        }
    }
    extras.total = extras.wides + extras.no_balls + extras.byes + extras.leg_byes;

    for stats in batting.values_mut() {
        stats.strike_rate = rate(stats.runs * 100, stats.balls);
    }
    for stats in bowling.values_mut() {
        stats.overs = overs_display(stats.balls);
        stats.economy = rate(stats.runs_conceded * 6, stats.balls);
    }

    Scorecard {
        match_id: match_id.to_string(),
        innings,
        batting,
        bowling,
        extras,
        totals: totals(innings, &deliveries),
    }
}

/// Innings totals counted straight from the surviving deliveries
fn totals(innings: u8, deliveries: &[&BallEvent]) -> InningsSummary {
    let mut summary = InningsSummary::new(innings);
    summary.runs = deliveries.iter().map(|e| e.runs).sum();
    summary.balls = deliveries.iter().filter(|e| e.is_legal()).count() as u32;
    summary.overs = overs_display(summary.balls);
    summary.dismissed_batters = deliveries
        .iter()
        .filter(|e| e.kind == BallEventKind::Wicket)
        .filter_map(|e| e.dismissed_batter().map(str::to_string))
        .collect();
    summary.wickets = deliveries
        .iter()
        .filter(|e| e.kind == BallEventKind::Wicket)
        .count() as u32;
    summary
}

/// `numerator / balls`, rounded to two places; `None` before the first ball
fn rate(numerator: u32, balls: u32) -> Option<f64> {
    if balls == 0 {
        return None;
    }
    let value = numerator as f64 / balls as f64;
    Some((value * 100.0).round() / 100.0)
}

fn dismissal_text(event: &BallEvent) -> String {
    let bowler = event.bowler.as_deref().unwrap_or(UNKNOWN_PLAYER);
    let fielder = event.fielder.as_deref();

    match event.wicket_type {
        Some(WicketType::Bowled) | None => format!("b {}", bowler),
        Some(WicketType::Caught) => match fielder {
            Some(f) if f == bowler => format!("c & b {}", bowler),
            Some(f) => format!("c {} b {}", f, bowler),
            None => format!("c {} b {}", UNKNOWN_PLAYER, bowler),
        },
        Some(WicketType::Lbw) => format!("lbw b {}", bowler),
        Some(WicketType::RunOut) => match fielder {
            Some(f) => format!("run out ({})", f),
            None => "run out".to_string(),
        },
        Some(WicketType::Stumped) => {
            format!("st {} b {}", fielder.unwrap_or(UNKNOWN_PLAYER), bowler)
        }
        Some(WicketType::HitWicket) => format!("hit wicket b {}", bowler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::processor::{apply_delivery, apply_undo, BallInput};
    use crate::scoring::state_machine::{record_toss, start_match};
    use crate::types::{CurrentBatters, Match, TossDecision};

    struct Harness {
        m: Match,
        log: Vec<BallEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let mut m = Match::new("m1", "A", "B", None, 0);
            record_toss(&mut m, "A", TossDecision::Bat, 0).unwrap();
            start_match(&mut m).unwrap();
            m.current_batters = CurrentBatters {
                striker: Some("S".to_string()),
                non_striker: Some("NS".to_string()),
            };
            m.current_bowler = Some("B1".to_string());
            Self { m, log: Vec::new() }
        }

        fn push(&mut self, mut event: BallEvent) {
            event.seq = self.log.len() as u64 + 1;
            self.log.push(event);
        }

        fn bowl(&mut self, input: BallInput) {
            let event = apply_delivery(&mut self.m, input, "scorer", 0).unwrap();
            self.push(event);
            if self.m.current_bowler.is_none() {
                self.m.current_bowler = Some("B2".to_string());
            }
            if self.m.current_batters.striker.is_none() {
                self.m.current_batters.striker = Some(format!("IN{}", self.log.len()));
            }
            if self.m.current_batters.non_striker.is_none() {
                self.m.current_batters.non_striker = Some(format!("IN{}", self.log.len()));
            }
        }

        fn undo(&mut self) {
            let event = apply_undo(&mut self.m, &self.log, "scorer", 0).unwrap();
            self.push(event);
        }

        fn live(&self) -> &InningsSummary {
            self.m.innings_summary(1).unwrap()
        }
    }

    fn scripted_innings() -> Vec<BallInput> {
        vec![
            BallInput::runs(1),
            BallInput::runs(4),
            BallInput::dot(),
            BallInput::new(BallEventKind::Wide, 2),
            BallInput::runs(6),
            BallInput::new(BallEventKind::LegBye, 1),
            BallInput::runs(1),
            BallInput::wicket(WicketType::Caught).with_fielder("F1"),
            BallInput::new(BallEventKind::NoBall, 5),
            BallInput::new(BallEventKind::Bye, 4),
            BallInput::wicket(WicketType::RunOut).with_fielder("F2"),
            BallInput::runs(2),
            BallInput::wicket(WicketType::Lbw),
        ]
    }

    #[test]
    fn test_replay_equivalence_at_every_step() {
        let mut h = Harness::new();
        for (step, input) in scripted_innings().into_iter().enumerate() {
            h.bowl(input);
            if step == 4 || step == 9 {
                h.undo();
            }
            let card = aggregate("m1", 1, &h.log);
            assert_eq!(&card.totals, h.live(), "diverged after step {}", step);
        }
    }

    #[test]
    fn test_batting_and_bowling_figures() {
        let mut h = Harness::new();
        h.bowl(BallInput::runs(4));
        h.bowl(BallInput::runs(6));
        h.bowl(BallInput::new(BallEventKind::LegBye, 1));
        // NS on strike now
        h.bowl(BallInput::new(BallEventKind::Wide, 1));
        h.bowl(BallInput::wicket(WicketType::Caught).with_fielder("F1"));

        let card = aggregate("m1", 1, &h.log);

        let s = &card.batting["S"];
        assert_eq!(s.runs, 10);
        assert_eq!(s.balls, 3);
        assert_eq!(s.fours, 1);
        assert_eq!(s.sixes, 1);
        assert_eq!(s.dismissal, None);
        assert_eq!(s.strike_rate, Some(333.33));

        let ns = &card.batting["NS"];
        assert_eq!(ns.balls, 1);
        assert_eq!(ns.dismissal.as_deref(), Some("c F1 b B1"));

        let b1 = &card.bowling["B1"];
        assert_eq!(b1.balls, 4);
        assert_eq!(b1.runs_conceded, 11);
        assert_eq!(b1.wides, 1);
        assert_eq!(b1.wickets, 1);
        assert_eq!(b1.overs, 0.4);
        assert_eq!(b1.economy, Some(16.5));

        assert_eq!(card.extras.wides, 1);
        assert_eq!(card.extras.leg_byes, 1);
        assert_eq!(card.extras.total, 2);
        assert_eq!(card.totals.runs, 12);
    }

    #[test]
    fn test_run_out_not_credited_to_bowler() {
        let mut h = Harness::new();
        h.bowl(BallInput::wicket(WicketType::RunOut).with_fielder("F2"));

        let card = aggregate("m1", 1, &h.log);
        assert_eq!(card.bowling["B1"].wickets, 0);
        assert_eq!(card.batting["S"].dismissal.as_deref(), Some("run out (F2)"));
        assert_eq!(card.totals.wickets, 1);
    }

    #[test]
    fn test_dismissal_text() {
        let mut event = BallEvent::new("m1", 1, BallEventKind::Wicket, "s", 0);
        event.bowler = Some("X".to_string());

        let cases = [
            (WicketType::Bowled, None, "b X"),
            (WicketType::Caught, Some("F"), "c F b X"),
            (WicketType::Caught, Some("X"), "c & b X"),
            (WicketType::Lbw, None, "lbw b X"),
            (WicketType::RunOut, Some("F"), "run out (F)"),
            (WicketType::Stumped, Some("K"), "st K b X"),
            (WicketType::HitWicket, None, "hit wicket b X"),
        ];
        for (wicket_type, fielder, expected) in cases {
            event.wicket_type = Some(wicket_type);
            event.fielder = fielder.map(str::to_string);
            assert_eq!(dismissal_text(&event), expected);
        }
    }

    #[test]
    fn test_undone_deliveries_excluded() {
        let mut h = Harness::new();
        h.bowl(BallInput::runs(6));
        h.undo();

        let card = aggregate("m1", 1, &h.log);
        assert_eq!(card.batting["S"].runs, 0);
        assert_eq!(card.batting["S"].balls, 0);
        assert_eq!(card.bowling["B1"].runs_conceded, 0);
        assert_eq!(card.totals.runs, 0);
        assert_eq!(card.totals.balls, 0);
    }

    #[test]
    fn test_announcements_count_nothing() {
        let mut h = Harness::new();
        let mut note = BallEvent::new("m1", 1, BallEventKind::Announcement, "admin", 0);
        note.message = Some("drinks".to_string());
        h.push(note);

        let card = aggregate("m1", 1, &h.log);
        assert!(card.batting.is_empty());
        assert!(card.bowling.is_empty());
        assert_eq!(card.totals, InningsSummary::new(1));
    }

    #[test]
    fn test_rates_absent_before_first_legal_ball() {
        let mut h = Harness::new();
        h.bowl(BallInput::new(BallEventKind::Wide, 1));

        let card = aggregate("m1", 1, &h.log);
        assert_eq!(card.batting["S"].strike_rate, None);
        assert_eq!(card.bowling["B1"].economy, None);
        assert_eq!(card.bowling["B1"].runs_conceded, 1);
    }

    #[test]
    fn test_projection_is_byte_identical() {
        let mut h = Harness::new();
        for input in scripted_innings() {
            h.bowl(input);
        }

        let first = serde_json::to_string(&aggregate("m1", 1, &h.log)).unwrap();
        let second = serde_json::to_string(&aggregate("m1", 1, &h.log)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_other_innings_ignored() {
        let mut h = Harness::new();
        h.bowl(BallInput::runs(2));

        let card = aggregate("m1", 2, &h.log);
        assert_eq!(card.innings, 2);
        assert!(card.bowling.is_empty());
        assert_eq!(card.totals.runs, 0);
    }
}
