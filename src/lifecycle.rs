//! Resource lifecycles as an explicit state machine.
//!
//! A lifecycle is the ordered list of client-visible calls a test makes
//! against one resource. Planning checks the list against the transition
//! table below before anything is turned into stub rules:
//!
//! ```text
//! Absent ──Create──▶ Creating ──GetCreating──▶ Creating
//! Creating | Active | Updating ──GetActive──▶ Active
//! Creating | Active | Updating ──Update──▶ Updating ──GetUpdating──▶ Updating
//! Creating | Active | Updating ──Delete──▶ Deleted ──GetNotFound──▶ NotFound
//! NotFound ──GetNotFound──▶ NotFound
//! ```

use std::fmt;

use thiserror::Error;

/// Where a resource is in its lifecycle, as the client last observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Absent,
    Creating,
    Active,
    Updating,
    Deleted,
    NotFound,
}

impl Phase {
    pub fn exists(self) -> bool {
        matches!(self, Phase::Creating | Phase::Active | Phase::Updating)
    }

    pub fn apply(self, step: Step) -> Result<Phase, LifecycleError> {
        let next = match (self, step) {
            (Phase::Absent, Step::Create) => Phase::Creating,
            (Phase::Creating, Step::GetCreating) => Phase::Creating,
            (phase, Step::GetActive) if phase.exists() => Phase::Active,
            (phase, Step::Update) if phase.exists() => Phase::Updating,
            (Phase::Updating, Step::GetUpdating) => Phase::Updating,
            (phase, Step::Delete) if phase.exists() => Phase::Deleted,
            (Phase::Deleted | Phase::NotFound, Step::GetNotFound) => Phase::NotFound,
            (from, step) => return Err(LifecycleError::InvalidTransition { from, step }),
        };
        Ok(next)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Absent => "absent",
            Phase::Creating => "creating",
            Phase::Active => "active",
            Phase::Updating => "updating",
            Phase::Deleted => "deleted",
            Phase::NotFound => "not-found",
        };
        f.write_str(name)
    }
}

/// One client call in a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    GetCreating,
    GetActive,
    Update,
    GetUpdating,
    Delete,
    GetNotFound,
}

impl Step {
    /// The full create, update and delete round trip with both reads after
    /// each mutation.
    pub const FULL: [Step; 8] = [
        Step::Create,
        Step::GetCreating,
        Step::GetActive,
        Step::Update,
        Step::GetUpdating,
        Step::GetActive,
        Step::Delete,
        Step::GetNotFound,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::GetCreating => "get-creating",
            Step::GetActive => "get-active",
            Step::Update => "update",
            Step::GetUpdating => "get-updating",
            Step::Delete => "delete",
            Step::GetNotFound => "get-not-found",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub step: Step,
    pub from: Phase,
    pub to: Phase,
}

impl Transition {
    /// Re-reading a resource that is already gone adds nothing new.
    pub fn is_repeat_of_terminal(&self) -> bool {
        self.from == Phase::NotFound && self.to == Phase::NotFound
    }
}

/// A validated sequence of transitions for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePlan {
    pub start: Phase,
    pub transitions: Vec<Transition>,
}

impl LifecyclePlan {
    pub fn new(start: Phase, steps: &[Step]) -> Result<Self, LifecycleError> {
        let mut phase = start;
        let mut transitions = Vec::with_capacity(steps.len());
        for &step in steps {
            let to = phase.apply(step)?;
            transitions.push(Transition {
                step,
                from: phase,
                to,
            });
            phase = to;
        }
        Ok(Self { start, transitions })
    }

    pub fn end(&self) -> Phase {
        self.transitions.last().map_or(self.start, |t| t.to)
    }

    pub fn updates(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.step == Step::Update)
            .count()
    }
}

/// Where a tracked resource stands between registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub updates_applied: usize,
}

impl Progress {
    pub fn absent() -> Self {
        Self {
            phase: Phase::Absent,
            updates_applied: 0,
        }
    }

    pub fn existing() -> Self {
        Self {
            phase: Phase::Active,
            updates_applied: 0,
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::absent()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot {step} a resource that is {from}")]
    InvalidTransition { from: Phase, step: Step },
    #[error("update #{needed} has no snapshot, only {available} provided")]
    MissingUpdateSnapshot { needed: usize, available: usize },
}
