//! Write authorization for match mutations
//!
//! Role lookup lives outside the engine; callers arrive as an [`Actor`]
//! already carrying the administrator bit.

use crate::types::Match;

/// Authenticated caller of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn scorer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }
}

/// What a command needs from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Scoring and roster commands
    Score,
    /// Fixture creation and status overrides
    Administer,
}

pub trait ScoringAuthority: Send + Sync {
    fn permits(&self, actor: &Actor, m: Option<&Match>, capability: Capability) -> bool;
}

/// Administrators may do anything; the assigned scorer may score their match
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignedScorerPolicy;

impl ScoringAuthority for AssignedScorerPolicy {
    fn permits(&self, actor: &Actor, m: Option<&Match>, capability: Capability) -> bool {
        if actor.is_admin {
            return true;
        }
        match (capability, m) {
            (Capability::Score, Some(m)) => m.scorer.as_deref() == Some(actor.id.as_str()),
            _ => false,
        }
    }
}
