//! Shared enums exchanged between drivers, components and the manager.
//!
//! - `CycleResult` - outcome of a `read`/`write` cycle
//! - `CallbackResult` - outcome of a lifecycle callback
//! - `ComponentKind` - actuator / sensor / system
//! - movement-interface classification helpers

use serde::{Deserialize, Serialize};

/// Standard interface name for joint positions.
pub const POSITION: &str = "position";
/// Standard interface name for joint velocities.
pub const VELOCITY: &str = "velocity";
/// Standard interface name for joint accelerations.
pub const ACCELERATION: &str = "acceleration";
/// Standard interface name for joint efforts.
pub const EFFORT: &str = "effort";

/// Whether an interface name commands physical movement.
///
/// Movement command interfaces are only claimable while the owning
/// component is active.
#[inline]
pub fn is_movement_interface(interface_name: &str) -> bool {
    matches!(interface_name, POSITION | VELOCITY | ACCELERATION | EFFORT)
}

/// Outcome of one `read` or `write` cycle of a hardware component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CycleResult {
    /// Cycle completed, continue normal operation.
    Ok = 0,
    /// Unrecoverable driver-level error, error handling takes over.
    Error = 1,
    /// The component requests a transition to inactive (write only).
    Deactivate = 2,
}

impl CycleResult {
    /// Observable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Deactivate => "deactivate",
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Error,
            2 => Self::Deactivate,
            _ => Self::Ok,
        }
    }
}

/// Outcome of a driver lifecycle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    /// Callback succeeded, the transition completes.
    Success,
    /// Callback failed, the component stays in its source state.
    /// The transition may be attempted again.
    Failure,
    /// Critical error, `on_error` handling takes over.
    Error,
}

/// Kind of a hardware component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Single-DoF device accepting commands and reporting state.
    Actuator,
    /// Read-only device, exports state interfaces only.
    Sensor,
    /// Multi-DoF composite device.
    System,
}

impl ComponentKind {
    /// Observable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Actuator => "actuator",
            Self::Sensor => "sensor",
            Self::System => "system",
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
