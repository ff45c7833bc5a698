//! Driver-side contract and the component wrapper that hosts it.

pub mod async_executor;
pub mod io;
pub mod wrapper;

pub use async_executor::TriggerStatus;
pub use io::ComponentIo;
pub use wrapper::HardwareComponent;

use crate::config::HardwareInfo;
use crate::interface::description::InterfaceDescription;
use crate::types::{CallbackResult, ComponentKind, CycleResult};
use std::time::Duration;

/// Contract every hardware driver implements.
///
/// Lifecycle callbacks default to `Success` so a minimal driver only
/// provides `read` (and `write` when it commands hardware). Callbacks
/// return:
///
/// - `Success` - transition completes;
/// - `Failure` - transition rejected, may be retried;
/// - `Error` - critical, `on_error` handling takes over.
///
/// State reads must keep working across activate/deactivate; only
/// actuation is gated by the active state.
pub trait HardwareDriver: Send {
    /// Driver-specific setup. Called exactly once per component lifetime.
    fn on_init(&mut self, info: &HardwareInfo) -> CallbackResult {
        let _ = info;
        CallbackResult::Success
    }

    /// Establish hardware communication and publish initial state values.
    fn on_configure(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// Enable actuation (power circuits, brakes released).
    fn on_activate(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// Disable actuation; state reads continue.
    fn on_deactivate(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// Release resources acquired in `on_configure`.
    fn on_cleanup(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// Final teardown before the component is finalized.
    fn on_shutdown(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// Recover from a critical error. `Success` returns the component to
    /// unconfigured; anything else finalizes it.
    fn on_error(&mut self, io: &ComponentIo) -> CallbackResult {
        let _ = io;
        CallbackResult::Success
    }

    /// State interfaces beyond the declared descriptions.
    fn unlisted_state_interfaces(&self) -> Vec<InterfaceDescription> {
        Vec::new()
    }

    /// Command interfaces beyond the declared descriptions.
    fn unlisted_command_interfaces(&self) -> Vec<InterfaceDescription> {
        Vec::new()
    }

    /// Non-realtime check whether the proposed claim change is acceptable.
    /// Keys not owned by this component are not relevant and must not fail.
    fn prepare_command_mode_switch(&mut self, start: &[String], stop: &[String]) -> CycleResult {
        let _ = (start, stop);
        CycleResult::Ok
    }

    /// Realtime application of the claim change; must be fast.
    fn perform_command_mode_switch(&mut self, start: &[String], stop: &[String]) -> CycleResult {
        let _ = (start, stop);
        CycleResult::Ok
    }

    /// Populate the component's state handles from the hardware.
    fn read(&mut self, time: Duration, period: Duration, io: &ComponentIo) -> CycleResult;

    /// Push the component's command handles to the hardware.
    ///
    /// Never invoked on sensors. `Deactivate` asks the wrapper to take the
    /// component to inactive without treating it as an error.
    fn write(&mut self, time: Duration, period: Duration, io: &ComponentIo) -> CycleResult {
        let _ = (time, period, io);
        CycleResult::Ok
    }
}

/// A driver tagged with its component kind.
///
/// The three variants share the `HardwareDriver` dispatch point; the
/// sensor variant has no write cycle — its arm answers `Ok` without
/// touching the driver.
pub enum Driver {
    Actuator(Box<dyn HardwareDriver>),
    Sensor(Box<dyn HardwareDriver>),
    System(Box<dyn HardwareDriver>),
}

impl Driver {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Actuator(_) => ComponentKind::Actuator,
            Self::Sensor(_) => ComponentKind::Sensor,
            Self::System(_) => ComponentKind::System,
        }
    }

    pub(crate) fn inner_mut(&mut self) -> &mut dyn HardwareDriver {
        match self {
            Self::Actuator(d) | Self::Sensor(d) | Self::System(d) => d.as_mut(),
        }
    }

    pub(crate) fn inner(&self) -> &dyn HardwareDriver {
        match self {
            Self::Actuator(d) | Self::Sensor(d) | Self::System(d) => d.as_ref(),
        }
    }

    pub(crate) fn read(&mut self, time: Duration, period: Duration, io: &ComponentIo) -> CycleResult {
        self.inner_mut().read(time, period, io)
    }

    pub(crate) fn write(
        &mut self,
        time: Duration,
        period: Duration,
        io: &ComponentIo,
    ) -> CycleResult {
        match self {
            Self::Sensor(_) => CycleResult::Ok,
            Self::Actuator(d) | Self::System(d) => d.write(time, period, io),
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Driver").field(&self.kind().label()).finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
