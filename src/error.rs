//! Error types surfaced by the framework.

use crate::lifecycle::{LifecycleState, Transition};
use thiserror::Error;

/// Errors raised while loading or validating hardware descriptions.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Description file could not be read.
    #[error("failed to read description file: {0}")]
    Io(String),

    /// Description could not be parsed.
    #[error("failed to parse description: {0}")]
    Parse(String),

    /// A field violates the description invariants.
    #[error("invalid description for '{component}': {reason}")]
    Invalid { component: String, reason: String },

    /// Two components share a name.
    #[error("duplicate component name: {0}")]
    DuplicateComponent(String),

    /// Two interfaces resolve to the same canonical key.
    #[error("duplicate interface key '{key}' in component '{component}'")]
    DuplicateInterface { component: String, key: String },

    /// No driver factory registered under the requested plugin name.
    #[error("unknown plugin '{plugin}' for component '{component}'")]
    UnknownPlugin { component: String, plugin: String },

    /// The driver's `on_init` reported failure.
    #[error("driver initialization failed for component '{0}'")]
    InitFailed(String),
}

/// Errors raised when claiming interfaces.
#[derive(Debug, Clone, Error)]
pub enum ClaimError {
    /// No interface registered under the key.
    #[error("interface '{0}' does not exist")]
    NotFound(String),

    /// The owning component's lifecycle state does not permit access.
    #[error("interface '{0}' is not available")]
    NotAvailable(String),

    /// The command interface is already lent out.
    #[error("command interface '{0}' is already claimed")]
    AlreadyClaimed(String),
}

/// Errors raised by controller reference-interface operations.
#[derive(Debug, Clone, Error)]
pub enum ReferenceError {
    /// No reference interfaces imported under the controller name.
    #[error("unknown controller '{0}'")]
    UnknownController(String),

    /// Reference interfaces already imported under the controller name.
    #[error("reference interfaces for controller '{0}' already imported")]
    AlreadyImported(String),

    /// A reference key collides with a registered command interface.
    #[error("reference interface key '{0}' already registered")]
    DuplicateKey(String),
}

/// Errors raised while driving component lifecycles.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    /// No component loaded under the name.
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    /// The requested transition is not legal from the current state.
    #[error("component '{component}': {transition:?} is invalid from {from:?}")]
    Invalid {
        component: String,
        from: LifecycleState,
        transition: Transition,
    },

    /// No chain of transitions reaches the requested state.
    #[error("component '{component}': no transition path from {from:?} to {target:?}")]
    Unreachable {
        component: String,
        from: LifecycleState,
        target: LifecycleState,
    },

    /// The driver callback reported `Failure`; the component kept its state.
    #[error("component '{component}': {transition:?} callback failed in {from:?}")]
    CallbackFailed {
        component: String,
        from: LifecycleState,
        transition: Transition,
    },

    /// The driver callback reported `Error`; error handling ran and the
    /// component ended up in `ended_in`.
    #[error("component '{component}': {transition:?} errored, now {ended_in:?}")]
    CallbackErrored {
        component: String,
        transition: Transition,
        ended_in: LifecycleState,
    },

    /// The operation requires the component to be configured.
    #[error("component '{component}' is {state:?}, operation requires inactive or active")]
    NotConfigured {
        component: String,
        state: LifecycleState,
    },
}

/// A `set` on an interface handle could not take the exclusive lock
/// without waiting.
#[derive(Debug, Clone, Copy, Error)]
#[error("concurrent writer holds the handle lock")]
pub struct HandleConflict;

// ─── Tests ──────────────────────────────────────────────────────────
