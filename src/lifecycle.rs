//! Component lifecycle state machine.
//!
//! Unconfigured → Inactive → Active, with Finalized as the terminal state
//! reachable from everywhere. Transition validity is checked here; the
//! driver callbacks that accompany each transition are invoked by the
//! component wrapper.

use serde::Serialize;

/// Lifecycle state of a hardware component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Initialized, no hardware communication, no interfaces available.
    Unconfigured,
    /// Communication established; states readable, non-movement commands claimable.
    Inactive,
    /// Power circuits live; all command interfaces claimable.
    Active,
    /// Terminal. Resources released, handles withdrawn.
    Finalized,
}

impl LifecycleState {
    /// Observable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }

    /// True while the component's interfaces are registered and usable.
    #[inline]
    pub const fn interfaces_available(self) -> bool {
        matches!(self, Self::Inactive | Self::Active)
    }
}

/// A single lifecycle transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Configure,
    Cleanup,
    Activate,
    Deactivate,
    Shutdown,
}

impl Transition {
    /// Observable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Cleanup => "cleanup",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Shutdown => "shutdown",
        }
    }

    /// State reached when the transition's callback succeeds.
    pub const fn target(self) -> LifecycleState {
        match self {
            Self::Configure => LifecycleState::Inactive,
            Self::Cleanup => LifecycleState::Unconfigured,
            Self::Activate => LifecycleState::Active,
            Self::Deactivate => LifecycleState::Inactive,
            Self::Shutdown => LifecycleState::Finalized,
        }
    }

    /// Whether the transition may be taken from `from`.
    pub const fn valid_from(self, from: LifecycleState) -> bool {
        use LifecycleState::*;
        match (from, self) {
            (Unconfigured, Self::Configure) => true,
            (Inactive, Self::Activate | Self::Cleanup) => true,
            (Active, Self::Deactivate) => true,
            (Finalized, _) => false,
            (_, Self::Shutdown) => true,
            _ => false,
        }
    }
}

/// Shortest transition chain from `from` to `target`, or `None` when the
/// target is unreachable (anything out of Finalized, or Finalized reached
/// other than via shutdown).
pub fn plan_transitions(from: LifecycleState, target: LifecycleState) -> Option<Vec<Transition>> {
    use LifecycleState::*;
    use Transition::*;
    if from == target {
        return Some(Vec::new());
    }
    let chain: &[Transition] = match (from, target) {
        (Finalized, _) => return None,
        (_, Finalized) => &[Shutdown],
        (Unconfigured, Inactive) => &[Configure],
        (Unconfigured, Active) => &[Configure, Activate],
        (Inactive, Active) => &[Activate],
        (Inactive, Unconfigured) => &[Cleanup],
        (Active, Inactive) => &[Deactivate],
        (Active, Unconfigured) => &[Deactivate, Cleanup],
        _ => return None,
    };
    Some(chain.to_vec())
}

// ─── Tests ──────────────────────────────────────────────────────────
