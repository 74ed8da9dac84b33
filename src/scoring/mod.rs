//! Live scoring engine
//!
//! Every command runs through [`ScoringService::mutate`]:
//!
//! ```text
//! enter guard ─► load match + log ─► authorize ─► command ─► commit ─► publish
//! ```
//!
//! A command receives a private copy of the match. When it fails nothing is
//! written and nothing is published.

pub mod aggregator;
pub mod authority;
pub mod dispatcher;
pub mod guard;
pub mod processor;
pub mod state_machine;

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

pub use aggregator::aggregate;
pub use authority::{Actor, AssignedScorerPolicy, Capability, ScoringAuthority};
pub use dispatcher::{
    match_channel, BroadcastDispatcher, PubSub, PublishError, DASHBOARD_CHANNEL, MATCH_ANNOUNCEMENT,
    MATCH_UPDATE,
};
pub use guard::{CommitStrategy, ConcurrencyGuard};
pub use processor::BallInput;

use crate::error::{ScoringError, ScoringResult};
use crate::event_store::{MatchRepository, StoreError};
use crate::types::{
    is_valid_match_id, BallEvent, InningsSummary, ListingStatus, Match, Scorecard, TerminalStatus,
    TossDecision,
};
use crate::utils::current_timestamp_millis;

/// Fixture registration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatch {
    pub id: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(default)]
    pub scorer: Option<String>,
}

/// What a command wants committed alongside the updated match
#[derive(Debug, Default)]
pub struct Mutation {
    events: Vec<BallEvent>,
    announcement: Option<String>,
}

impl Mutation {
    pub fn state_only() -> Self {
        Self::default()
    }

    pub fn with_event(event: BallEvent) -> Self {
        let announcement = event.message.clone();
        Self {
            events: vec![event],
            announcement,
        }
    }
}

/// A committed mutation as seen by the caller
#[derive(Debug, Clone)]
pub struct Committed {
    pub doc: Match,
    /// Stored entries with their assigned sequence numbers
    pub events: Vec<BallEvent>,
}

impl Committed {
    /// Summary of the innings in play, if one has started
    pub fn current_summary(&self) -> Option<&InningsSummary> {
        self.doc
            .current_innings
            .and_then(|innings| self.doc.innings_summary(innings))
    }
}

/// Command and query surface of the scoring engine
pub struct ScoringService {
    guard: ConcurrencyGuard,
    authority: Arc<dyn ScoringAuthority>,
    dispatcher: BroadcastDispatcher,
}

impl ScoringService {
    pub fn new(
        repo: Arc<dyn MatchRepository>,
        strategy: CommitStrategy,
        authority: Arc<dyn ScoringAuthority>,
        dispatcher: BroadcastDispatcher,
    ) -> Self {
        Self {
            guard: ConcurrencyGuard::new(repo, strategy),
            authority,
            dispatcher,
        }
    }

    pub fn strategy(&self) -> CommitStrategy {
        self.guard.strategy()
    }

    fn repo(&self) -> &Arc<dyn MatchRepository> {
        self.guard.repository()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn create_match(&self, actor: &Actor, new: NewMatch) -> ScoringResult<Match> {
        if !self.authority.permits(actor, None, Capability::Administer) {
            warn!(actor = %actor.id, "Rejected match creation");
            return Err(ScoringError::Forbidden);
        }
        if !is_valid_match_id(&new.id) {
            return Err(ScoringError::validation(
                "id",
                "use 1-64 letters, digits, '-' or '_'",
            ));
        }
        let team_a = new.team_a.trim();
        let team_b = new.team_b.trim();
        if team_a.is_empty() || team_b.is_empty() {
            return Err(ScoringError::validation("teams", "both team names are required"));
        }
        if team_a == team_b {
            return Err(ScoringError::validation("teams", "a team cannot play itself"));
        }
        let scorer = new.scorer.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let doc = Match::new(new.id, team_a, team_b, scorer, current_timestamp_millis());
        match self.repo().insert_match(&doc) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(id)) => {
                return Err(ScoringError::guard(format!("match {} already exists", id)));
            }
            Err(e) => return Err(e.into()),
        }

        info!(match_id = %doc.id, team_a, team_b, "Match created");
        self.dispatcher.match_updated(&doc).await;
        Ok(doc)
    }

    pub async fn record_toss(
        &self,
        actor: &Actor,
        match_id: &str,
        winner: &str,
        decision: TossDecision,
    ) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, now| {
            state_machine::record_toss(m, winner, decision, now)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn start_match(&self, actor: &Actor, match_id: &str) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, _| {
            state_machine::start_match(m)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    /// Score one delivery of the live innings
    pub async fn submit_ball(&self, actor: &Actor, match_id: &str, input: BallInput) -> ScoringResult<Committed> {
        let author = actor.id.clone();
        self.mutate(actor, match_id, Capability::Score, move |m, _, now| {
            let event = processor::apply_delivery(m, input, &author, now)?;
            Ok(Mutation::with_event(event))
        })
        .await
    }

    /// Compensate the last delivery of the live innings
    pub async fn undo_last_ball(&self, actor: &Actor, match_id: &str) -> ScoringResult<Committed> {
        let author = actor.id.clone();
        self.mutate(actor, match_id, Capability::Score, move |m, log, now| {
            let event = processor::apply_undo(m, log, &author, now)?;
            Ok(Mutation::with_event(event))
        })
        .await
    }

    pub async fn select_batters(
        &self,
        actor: &Actor,
        match_id: &str,
        striker: Option<String>,
        non_striker: Option<String>,
    ) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, move |m, _, _| {
            state_machine::select_batters(m, striker, non_striker)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn select_bowler(&self, actor: &Actor, match_id: &str, bowler: &str) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, _| {
            state_machine::select_bowler(m, bowler)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn set_squad(
        &self,
        actor: &Actor,
        match_id: &str,
        team: &str,
        players: Vec<String>,
    ) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, move |m, _, _| {
            state_machine::set_squad(m, team, players)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn end_innings(&self, actor: &Actor, match_id: &str) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, _| {
            state_machine::end_innings(m)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn start_second_innings(&self, actor: &Actor, match_id: &str) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, _| {
            state_machine::start_second_innings(m)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    pub async fn end_match(&self, actor: &Actor, match_id: &str, result: &str) -> ScoringResult<Committed> {
        self.mutate(actor, match_id, Capability::Score, |m, _, _| {
            state_machine::end_match(m, result)?;
            Ok(Mutation::state_only())
        })
        .await
    }

    /// Administrative override into a terminal status
    pub async fn set_status(
        &self,
        actor: &Actor,
        match_id: &str,
        status: TerminalStatus,
        announcement: Option<String>,
    ) -> ScoringResult<Committed> {
        let author = actor.id.clone();
        self.mutate(actor, match_id, Capability::Administer, move |m, _, now| {
            let event = state_machine::set_terminal(m, status, announcement.as_deref(), &author, now)?;
            Ok(event.map(Mutation::with_event).unwrap_or_default())
        })
        .await
    }

    pub async fn announce(&self, actor: &Actor, match_id: &str, message: &str) -> ScoringResult<Committed> {
        let author = actor.id.clone();
        self.mutate(actor, match_id, Capability::Score, move |m, _, now| {
            let event = state_machine::announce(m, message, &author, now)?;
            Ok(Mutation::with_event(event))
        })
        .await
    }

    /// Single aggregate-update path shared by every command
    async fn mutate<F>(
        &self,
        actor: &Actor,
        match_id: &str,
        capability: Capability,
        command: F,
    ) -> ScoringResult<Committed>
    where
        F: FnOnce(&mut Match, &[BallEvent], i64) -> ScoringResult<Mutation> + Send,
    {
        // Unknown ids never reach the lock table.
        if !is_valid_match_id(match_id) || self.repo().load_match(match_id)?.is_none() {
            return Err(ScoringError::NotFound(match_id.to_string()));
        }
        let permit = self.guard.enter(match_id).await;

        let current = self
            .repo()
            .load_match(match_id)?
            .ok_or_else(|| ScoringError::NotFound(match_id.to_string()))?;
        if !self.authority.permits(actor, Some(&current), capability) {
            warn!(match_id, actor = %actor.id, ?capability, "Rejected unauthorized mutation");
            return Err(ScoringError::Forbidden);
        }

        let log = self.repo().load_events(match_id)?;
        let now = current_timestamp_millis();
        let mut doc = current;
        if processor::reconcile(&mut doc, &log) {
            warn!(match_id, "Stored summaries lagged the ball log, rebuilt from the log");
        }
        let Mutation {
            mut events,
            announcement,
        } = command(&mut doc, &log, now)?;

        doc.version += 1;
        doc.updated_at = now;
        self.guard.commit(&permit, &mut events, &mut doc)?;

        info!(
            match_id,
            version = doc.version,
            state = %doc.match_state,
            events = events.len(),
            "Committed match mutation"
        );

        // Published before the permit drops so viewers see updates in commit order.
        self.dispatcher.match_updated(&doc).await;
        if let Some(message) = announcement {
            self.dispatcher.announcement(match_id, &message).await;
        }
        drop(permit);

        Ok(Committed { doc, events })
    }

    /// Rebuild the stored summaries of every match whose log ran ahead
    ///
    /// Covers a crash between the log append and the document write. Returns
    /// the number of matches repaired.
    pub fn recover(&self) -> ScoringResult<usize> {
        let mut repaired = 0;
        for mut doc in self.repo().list_matches()? {
            let log = self.repo().load_events(&doc.id)?;
            if processor::reconcile(&mut doc, &log) {
                warn!(match_id = %doc.id, events = log.len(), "Recovered summaries from the ball log");
                self.repo().save_match(&doc)?;
                repaired += 1;
            }
        }
        if repaired > 0 {
            info!(repaired, "Match recovery complete");
        }
        Ok(repaired)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_match(&self, match_id: &str) -> ScoringResult<Match> {
        self.repo()
            .load_match(match_id)?
            .ok_or_else(|| ScoringError::NotFound(match_id.to_string()))
    }

    /// Dashboard listing, optionally filtered by derived status
    pub fn list_matches(&self, status: Option<ListingStatus>) -> ScoringResult<Vec<Match>> {
        let mut matches = self.repo().list_matches()?;
        if let Some(status) = status {
            matches.retain(|m| m.status() == status);
        }
        Ok(matches)
    }

    /// Ball log in sequence order, optionally restricted to one innings
    pub fn events(&self, match_id: &str, innings: Option<u8>) -> ScoringResult<Vec<BallEvent>> {
        self.get_match(match_id)?;
        let events = match innings {
            Some(innings) => self.repo().load_innings_events(match_id, innings)?,
            None => self.repo().load_events(match_id)?,
        };
        Ok(events)
    }

    pub fn scorecard(&self, match_id: &str, innings: u8) -> ScoringResult<Scorecard> {
        if !(1..=2).contains(&innings) {
            return Err(ScoringError::validation("innings", "must be 1 or 2"));
        }
        self.get_match(match_id)?;
        let events = self.repo().load_innings_events(match_id, innings)?;
        Ok(aggregate(match_id, innings, &events))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;
    use crate::event_store::{MemoryRepository, StoreResult};
    use crate::types::{BallEventKind, MatchPhase, WicketType};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Recorder {
        fn events_on(&self, channel: &str) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter(|(c, _)| c == channel)
                .map(|(_, e)| e.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PubSub for Recorder {
        async fn publish(&self, channel: &str, event: &str, _payload: Value) -> Result<(), PublishError> {
            self.sent.lock().push((channel.to_string(), event.to_string()));
            Ok(())
        }
    }

    /// Memory store whose atomic commits always fail with an I/O error
    struct BrokenDisk(MemoryRepository);

    impl MatchRepository for BrokenDisk {
        fn insert_match(&self, doc: &Match) -> StoreResult<()> {
            self.0.insert_match(doc)
        }
        fn load_match(&self, match_id: &str) -> StoreResult<Option<Match>> {
            self.0.load_match(match_id)
        }
        fn list_matches(&self) -> StoreResult<Vec<Match>> {
            self.0.list_matches()
        }
        fn load_events(&self, match_id: &str) -> StoreResult<Vec<BallEvent>> {
            self.0.load_events(match_id)
        }
        fn append_event(&self, event: &mut BallEvent) -> StoreResult<()> {
            self.0.append_event(event)
        }
        fn save_match(&self, doc: &Match) -> StoreResult<()> {
            self.0.save_match(doc)
        }
        fn supports_transactions(&self) -> bool {
            true
        }
        fn commit_atomic(&self, _events: &mut [BallEvent], _doc: &Match) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    struct Fixture {
        service: Arc<ScoringService>,
        recorder: Arc<Recorder>,
        admin: Actor,
        scorer: Actor,
    }

    fn fixture_with(repo: Arc<dyn MatchRepository>, strategy: CommitStrategy) -> Fixture {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = BroadcastDispatcher::new(recorder.clone(), Duration::from_millis(100));
        let service = ScoringService::new(repo, strategy, Arc::new(AssignedScorerPolicy), dispatcher);
        Fixture {
            service: Arc::new(service),
            recorder,
            admin: Actor::admin("admin"),
            scorer: Actor::scorer("alice"),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryRepository::new()), CommitStrategy::Transactional)
    }

    fn new_match(id: &str) -> NewMatch {
        NewMatch {
            id: id.to_string(),
            team_a: "A".to_string(),
            team_b: "B".to_string(),
            scorer: Some("alice".to_string()),
        }
    }

    /// Create `m1`, toss, start and put S/NS at the crease with B1 bowling
    async fn live(f: &Fixture) {
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();
        f.service
            .record_toss(&f.scorer, "m1", "A", TossDecision::Bat)
            .await
            .unwrap();
        f.service.start_match(&f.scorer, "m1").await.unwrap();
        f.service
            .select_batters(&f.scorer, "m1", Some("S".to_string()), Some("NS".to_string()))
            .await
            .unwrap();
        f.service.select_bowler(&f.scorer, "m1", "B1").await.unwrap();
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let f = fixture();
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();

        let toss = f
            .service
            .record_toss(&f.scorer, "m1", "A", TossDecision::Bat)
            .await
            .unwrap();
        assert_eq!(toss.doc.batting_team.as_deref(), Some("A"));
        assert_eq!(toss.doc.bowling_team.as_deref(), Some("B"));

        let started = f.service.start_match(&f.scorer, "m1").await.unwrap();
        assert_eq!(started.doc.match_state, MatchPhase::Live);
        assert_eq!(started.doc.current_innings, Some(1));

        f.service
            .select_batters(&f.scorer, "m1", Some("S".to_string()), Some("NS".to_string()))
            .await
            .unwrap();
        f.service.select_bowler(&f.scorer, "m1", "B1").await.unwrap();

        let mut last = None;
        for _ in 0..6 {
            last = Some(f.service.submit_ball(&f.scorer, "m1", BallInput::dot()).await.unwrap());
        }
        let over = last.unwrap();
        let summary = over.current_summary().unwrap();
        assert_eq!(summary.balls, 6);
        assert_eq!(summary.overs, 1.0);
        assert!(over.doc.current_bowler.is_none());
        assert_eq!(over.doc.current_batters.striker.as_deref(), Some("NS"));
        assert_eq!(over.doc.current_batters.non_striker.as_deref(), Some("S"));

        f.service.select_bowler(&f.scorer, "m1", "B2").await.unwrap();
        let wicket = f
            .service
            .submit_ball(&f.scorer, "m1", BallInput::wicket(WicketType::Bowled))
            .await
            .unwrap();
        assert_eq!(wicket.current_summary().unwrap().wickets, 1);
        assert!(wicket.doc.current_batters.striker.is_none());
        assert_eq!(wicket.doc.current_batters.non_striker.as_deref(), Some("S"));

        let card = f.service.scorecard("m1", 1).unwrap();
        assert_eq!(&card.totals, wicket.current_summary().unwrap());
        assert_eq!(card.batting["NS"].dismissal.as_deref(), Some("b B2"));
    }

    #[tokio::test]
    async fn test_every_commit_is_published() {
        let f = fixture();
        live(&f).await;
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(4)).await.unwrap();

        let on_match = f.recorder.events_on("match:m1");
        // create, toss, start, batters, bowler, ball
        assert_eq!(on_match.len(), 6);
        assert!(on_match.iter().all(|e| e == MATCH_UPDATE));
        assert_eq!(f.recorder.events_on(DASHBOARD_CHANNEL).len(), 6);
    }

    #[tokio::test]
    async fn test_unassigned_actor_forbidden() {
        let f = fixture();
        live(&f).await;
        let before = f.service.get_match("m1").unwrap();

        let err = f
            .service
            .submit_ball(&Actor::scorer("mallory"), "m1", BallInput::runs(6))
            .await
            .unwrap_err();

        assert!(matches!(err, ScoringError::Forbidden));
        assert_eq!(err.to_string(), "not permitted to modify this match");
        assert_eq!(f.service.get_match("m1").unwrap(), before);
        assert!(f.service.events("m1", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_precedes_state_guards() {
        let f = fixture();
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();

        // Pre-toss, so a scorer would get a state guard; an outsider learns nothing.
        let err = f
            .service
            .submit_ball(&Actor::scorer("mallory"), "m1", BallInput::dot())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Forbidden));

        let err = f
            .service
            .submit_ball(&f.scorer, "m1", BallInput::dot())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));
    }

    #[tokio::test]
    async fn test_guard_failure_persists_nothing() {
        let f = fixture();
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();
        let published = f.recorder.sent.lock().len();

        let err = f.service.start_match(&f.scorer, "m1").await.unwrap_err();
        assert_eq!(err.to_string(), "toss must be completed before the match starts");

        let stored = f.service.get_match("m1").unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.match_state, MatchPhase::PreToss);
        assert_eq!(f.recorder.sent.lock().len(), published);
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_no_partial_state() {
        let f = fixture_with(
            Arc::new(BrokenDisk(MemoryRepository::new())),
            CommitStrategy::Transactional,
        );
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();

        let err = f
            .service
            .record_toss(&f.scorer, "m1", "A", TossDecision::Bowl)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "STORAGE_ERROR");
        assert!(f.service.get_match("m1").unwrap().toss.is_none());
        // Only the creation was published.
        assert_eq!(f.recorder.events_on("match:m1").len(), 1);
    }

    #[tokio::test]
    async fn test_create_match_requires_admin() {
        let f = fixture();
        let err = f.service.create_match(&f.scorer, new_match("m1")).await.unwrap_err();
        assert!(matches!(err, ScoringError::Forbidden));

        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();
        let err = f.service.create_match(&f.admin, new_match("m1")).await.unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));

        let err = f.service.create_match(&f.admin, new_match("../x")).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
    }

    #[tokio::test]
    async fn test_unknown_match_not_found() {
        let f = fixture();
        let err = f.service.start_match(&f.admin, "nope").await.unwrap_err();
        assert!(matches!(err, ScoringError::NotFound(_)));
        assert!(matches!(f.service.scorecard("nope", 1), Err(ScoringError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_undo_through_service() {
        let f = fixture();
        live(&f).await;
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(1)).await.unwrap();
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(4)).await.unwrap();

        let undone = f.service.undo_last_ball(&f.scorer, "m1").await.unwrap();
        assert_eq!(undone.events[0].kind, BallEventKind::Undo);
        assert_eq!(undone.events[0].undoes, Some(2));
        assert_eq!(undone.current_summary().unwrap().runs, 1);
        assert_eq!(undone.doc.current_batters.striker.as_deref(), Some("NS"));

        f.service.undo_last_ball(&f.scorer, "m1").await.unwrap();
        let err = f.service.undo_last_ball(&f.scorer, "m1").await.unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));

        let card = f.service.scorecard("m1", 1).unwrap();
        assert_eq!(card.totals.runs, 0);
        assert_eq!(f.service.events("m1", Some(1)).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_set_status_is_administrative() {
        let f = fixture();
        live(&f).await;

        let err = f
            .service
            .set_status(&f.scorer, "m1", TerminalStatus::Abandoned, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Forbidden));

        let done = f
            .service
            .set_status(&f.admin, "m1", TerminalStatus::Abandoned, Some("rain".to_string()))
            .await
            .unwrap();
        assert_eq!(done.doc.match_state, MatchPhase::Abandoned);
        assert_eq!(done.doc.status(), ListingStatus::Abandoned);
        assert_eq!(done.events[0].kind, BallEventKind::Announcement);
        assert!(f
            .recorder
            .events_on("match:m1")
            .contains(&MATCH_ANNOUNCEMENT.to_string()));

        let err = f
            .service
            .submit_ball(&f.scorer, "m1", BallInput::dot())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));
    }

    #[tokio::test]
    async fn test_announcement_published_to_match_only() {
        let f = fixture();
        live(&f).await;
        f.service.announce(&f.scorer, "m1", "drinks break").await.unwrap();

        assert_eq!(f.recorder.events_on("match:m1").last().map(String::as_str), Some(MATCH_ANNOUNCEMENT));
        assert!(!f
            .recorder
            .events_on(DASHBOARD_CHANNEL)
            .contains(&MATCH_ANNOUNCEMENT.to_string()));
        assert_eq!(f.service.get_match("m1").unwrap().innings_summary(1), None);
    }

    #[tokio::test]
    async fn test_squads_locked_once_live() {
        let f = fixture();
        f.service.create_match(&f.admin, new_match("m1")).await.unwrap();
        let set = f
            .service
            .set_squad(&f.scorer, "m1", "A", vec!["a1".to_string(), "a2".to_string()])
            .await
            .unwrap();
        assert_eq!(set.doc.team_a.players, vec!["a1", "a2"]);

        f.service
            .record_toss(&f.scorer, "m1", "B", TossDecision::Bowl)
            .await
            .unwrap();
        f.service.start_match(&f.scorer, "m1").await.unwrap();

        let err = f
            .service
            .set_squad(&f.scorer, "m1", "A", vec!["a3".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));
    }

    #[tokio::test]
    async fn test_full_match_lifecycle() {
        let f = fixture();
        live(&f).await;
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(4)).await.unwrap();

        let brk = f.service.end_innings(&f.scorer, "m1").await.unwrap();
        assert_eq!(brk.doc.batting_team.as_deref(), Some("B"));
        assert_eq!(brk.doc.status(), ListingStatus::Live);

        f.service.start_second_innings(&f.scorer, "m1").await.unwrap();
        let err = f.service.end_innings(&f.scorer, "m1").await.unwrap_err();
        assert!(matches!(err, ScoringError::StateGuard(_)));

        f.service
            .select_batters(&f.scorer, "m1", Some("X".to_string()), Some("Y".to_string()))
            .await
            .unwrap();
        f.service.select_bowler(&f.scorer, "m1", "A1").await.unwrap();
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(6)).await.unwrap();
        let done = f.service.end_match(&f.scorer, "m1", "B won by 10 wickets").await.unwrap();

        assert_eq!(done.doc.status(), ListingStatus::Completed);
        assert_eq!(done.doc.result.as_deref(), Some("B won by 10 wickets"));
        assert_eq!(f.service.scorecard("m1", 2).unwrap().totals.runs, 6);
        assert_eq!(f.service.scorecard("m1", 1).unwrap().totals.runs, 4);
    }

    #[tokio::test]
    async fn test_listing_filter() {
        let f = fixture();
        live(&f).await;
        f.service.create_match(&f.admin, new_match("m2")).await.unwrap();

        let live_ids: Vec<String> = f
            .service
            .list_matches(Some(ListingStatus::Live))
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(live_ids, vec!["m1"]);
        assert_eq!(f.service.list_matches(Some(ListingStatus::Scheduled)).unwrap().len(), 1);
        assert_eq!(f.service.list_matches(None).unwrap().len(), 2);
    }

    fn script() -> Vec<BallInput> {
        vec![
            BallInput::runs(1),
            BallInput::new(BallEventKind::Wide, 2),
            BallInput::runs(4),
            BallInput::new(BallEventKind::Bye, 2),
            BallInput::dot(),
            BallInput::runs(1),
            BallInput::new(BallEventKind::NoBall, 1),
            BallInput::runs(3),
        ]
    }

    #[tokio::test]
    async fn test_best_effort_matches_transactional() {
        let tx = fixture();
        let be = fixture_with(Arc::new(MemoryRepository::without_transactions()), CommitStrategy::Transactional);
        assert_eq!(be.service.strategy(), CommitStrategy::BestEffort);

        for f in [&tx, &be] {
            live(f).await;
            for input in script() {
                f.service.submit_ball(&f.scorer, "m1", input).await.unwrap();
            }
            f.service.undo_last_ball(&f.scorer, "m1").await.unwrap();
        }

        let a = tx.service.get_match("m1").unwrap();
        let b = be.service.get_match("m1").unwrap();
        assert_eq!(a.innings, b.innings);
        assert_eq!(a.current_batters, b.current_batters);
        assert_eq!(a.version, b.version);
        assert_eq!(
            serde_json::to_string(&tx.service.scorecard("m1", 1).unwrap()).unwrap(),
            serde_json::to_string(&be.service.scorecard("m1", 1).unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_serialized() {
        let f = fixture();
        live(&f).await;

        let mut handles = Vec::new();
        for _ in 0..24 {
            let service = f.service.clone();
            let scorer = f.scorer.clone();
            handles.push(tokio::spawn(async move {
                service
                    .submit_ball(&scorer, "m1", BallInput::runs(1).with_bowler("B1"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = f.service.get_match("m1").unwrap();
        let summary = doc.innings_summary(1).unwrap();
        assert_eq!(summary.balls, 24);
        assert_eq!(summary.runs, 24);
        assert_eq!(summary.overs, 4.0);

        let seqs: Vec<u64> = f.service.events("m1", None).unwrap().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=24).collect::<Vec<_>>());
        assert_eq!(&f.service.scorecard("m1", 1).unwrap().totals, summary);
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_lock_entries() {
        let f = fixture();
        live(&f).await;

        for n in 0..1000 {
            let err = f
                .service
                .submit_ball(&f.scorer, &format!("ghost-{n}"), BallInput::dot())
                .await
                .unwrap_err();
            assert!(matches!(err, ScoringError::NotFound(_)));
        }
        let err = f.service.start_match(&f.scorer, "../m1").await.unwrap_err();
        assert!(matches!(err, ScoringError::NotFound(_)));

        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(2)).await.unwrap();
        assert_eq!(f.service.guard.tracked_matches(), 0);
    }

    #[tokio::test]
    async fn test_recover_rebuilds_summaries_behind_the_log() {
        let repo = Arc::new(MemoryRepository::new());
        let f = fixture_with(repo.clone(), CommitStrategy::Transactional);
        live(&f).await;
        f.service.submit_ball(&f.scorer, "m1", BallInput::runs(1)).await.unwrap();

        // A six reached the log but its document write was lost.
        let mut lost = BallEvent::new("m1", 1, BallEventKind::Runs, "alice", 0);
        lost.runs = 6;
        lost.batsman = Some("NS".to_string());
        lost.bowler = Some("B1".to_string());
        repo.append_event(&mut lost).unwrap();

        assert_eq!(f.service.recover().unwrap(), 1);
        let doc = f.service.get_match("m1").unwrap();
        assert_eq!(doc.innings_summary(1).unwrap().runs, 7);
        assert_eq!(doc.innings_summary(1).unwrap().balls, 2);
        assert_eq!(f.service.recover().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutation_heals_a_lagging_document() {
        let repo = Arc::new(MemoryRepository::new());
        let f = fixture_with(repo.clone(), CommitStrategy::Transactional);
        live(&f).await;

        let mut lost = BallEvent::new("m1", 1, BallEventKind::Runs, "alice", 0);
        lost.runs = 4;
        lost.batsman = Some("S".to_string());
        lost.bowler = Some("B1".to_string());
        repo.append_event(&mut lost).unwrap();

        let next = f.service.submit_ball(&f.scorer, "m1", BallInput::runs(1)).await.unwrap();
        assert_eq!(next.current_summary().unwrap().runs, 5);
        assert_eq!(&f.service.scorecard("m1", 1).unwrap().totals, next.current_summary().unwrap());
    }
}
