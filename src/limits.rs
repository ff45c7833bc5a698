//! Command-limit enforcement stage.
//!
//! Sits between controller writes and hardware writes: for every joint with
//! declared limits, the commanded position/velocity/acceleration/effort is
//! rewritten in place so the hardware only ever sees reachable references.
//! Position commands are additionally bounded by a one-step integration of
//! the velocity limit anchored at the measured position, so a controller
//! asking for a jump gets a ramp.

use crate::interface::handle::InterfaceHandle;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Declared per-joint limits. Absent fields are unbounded.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct JointLimits {
    #[serde(default)]
    pub min_position: Option<f64>,
    #[serde(default)]
    pub max_position: Option<f64>,
    #[serde(default)]
    pub max_velocity: Option<f64>,
    #[serde(default)]
    pub max_acceleration: Option<f64>,
    #[serde(default)]
    pub max_effort: Option<f64>,
}

impl JointLimits {
    /// True when at least one bound is declared.
    pub fn any(&self) -> bool {
        self.min_position.is_some()
            || self.max_position.is_some()
            || self.max_velocity.is_some()
            || self.max_acceleration.is_some()
            || self.max_effort.is_some()
    }
}

/// Bound a position command.
///
/// The command is clamped into `[min, max]` and, when a velocity limit and
/// a base position are known, into one velocity-limit step around the base.
/// Idempotent: a command inside the envelope passes through unchanged.
pub fn clamp_position(
    command: f64,
    limits: &JointLimits,
    base_position: Option<f64>,
    period: Duration,
) -> f64 {
    let mut lo = limits.min_position.unwrap_or(f64::NEG_INFINITY);
    let mut hi = limits.max_position.unwrap_or(f64::INFINITY);
    if let (Some(base), Some(v_max)) = (base_position, limits.max_velocity) {
        let step = v_max.abs() * period.as_secs_f64();
        lo = lo.max(base - step);
        hi = hi.min(base + step);
    }
    if lo > hi {
        // Velocity window already outside the position bounds; pin to the
        // nearest absolute bound.
        return command
            .clamp(limits.min_position.unwrap_or(f64::NEG_INFINITY), limits.max_position.unwrap_or(f64::INFINITY));
    }
    command.clamp(lo, hi)
}

/// Bound a symmetric-magnitude command (velocity, acceleration, effort).
pub fn clamp_magnitude(command: f64, bound: Option<f64>) -> f64 {
    match bound {
        Some(limit) => {
            let limit = limit.abs();
            command.clamp(-limit, limit)
        }
        None => command,
    }
}

/// Limit-enforcement entry for one joint.
///
/// Holds the joint's claimed-side command handles and measured-state
/// handles; `enforce` rewrites the commands in place. Joints without
/// declared limits never get a limiter, so enforcement is a no-op there.
#[derive(Debug)]
pub(crate) struct JointLimiter {
    joint: String,
    limits: JointLimits,
    position_command: Option<Arc<InterfaceHandle>>,
    velocity_command: Option<Arc<InterfaceHandle>>,
    acceleration_command: Option<Arc<InterfaceHandle>>,
    effort_command: Option<Arc<InterfaceHandle>>,
    position_state: Option<Arc<InterfaceHandle>>,
    /// Fallback base when no measured position is available.
    last_enforced_position: Option<f64>,
}

pub(crate) struct JointLimiterHandles {
    pub position_command: Option<Arc<InterfaceHandle>>,
    pub velocity_command: Option<Arc<InterfaceHandle>>,
    pub acceleration_command: Option<Arc<InterfaceHandle>>,
    pub effort_command: Option<Arc<InterfaceHandle>>,
    pub position_state: Option<Arc<InterfaceHandle>>,
}

impl JointLimiter {
    pub(crate) fn new(joint: String, limits: JointLimits, handles: JointLimiterHandles) -> Self {
        Self {
            joint,
            limits,
            position_command: handles.position_command,
            velocity_command: handles.velocity_command,
            acceleration_command: handles.acceleration_command,
            effort_command: handles.effort_command,
            position_state: handles.position_state,
            last_enforced_position: None,
        }
    }

    pub(crate) fn joint(&self) -> &str {
        &self.joint
    }

    /// Rewrite this joint's finite commands to respect the declared limits.
    pub(crate) fn enforce(&mut self, period: Duration) {
        if let Some(handle) = &self.position_command {
            if let Some(command) = handle.get_f64().filter(|v| v.is_finite()) {
                let measured = self
                    .position_state
                    .as_ref()
                    .and_then(|h| h.get_f64())
                    .filter(|v| v.is_finite());
                let base = measured.or(self.last_enforced_position);
                let bounded = clamp_position(command, &self.limits, base, period);
                if bounded != command {
                    handle.set_blocking(bounded);
                }
                self.last_enforced_position = Some(bounded);
            }
        }
        if let Some(handle) = &self.velocity_command {
            if let Some(command) = handle.get_f64().filter(|v| v.is_finite()) {
                let bounded = clamp_magnitude(command, self.limits.max_velocity);
                if bounded != command {
                    handle.set_blocking(bounded);
                }
            }
        }
        if let Some(handle) = &self.acceleration_command {
            if let Some(command) = handle.get_f64().filter(|v| v.is_finite()) {
                let bounded = clamp_magnitude(command, self.limits.max_acceleration);
                if bounded != command {
                    handle.set_blocking(bounded);
                }
            }
        }
        if let Some(handle) = &self.effort_command {
            if let Some(command) = handle.get_f64().filter(|v| v.is_finite()) {
                let bounded = clamp_magnitude(command, self.limits.max_effort);
                if bounded != command {
                    handle.set_blocking(bounded);
                }
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::description::InterfaceDescription;
    use crate::interface::handle::InterfaceKind;
    use std::f64::consts::PI;

    const DT: Duration = Duration::from_millis(10);

    fn limits() -> JointLimits {
        JointLimits {
            min_position: Some(-PI),
            max_position: Some(PI),
            max_velocity: Some(0.2),
            max_acceleration: Some(1.0),
            max_effort: Some(5.0),
        }
    }

    fn handle(name: &str, kind: InterfaceKind) -> Arc<InterfaceHandle> {
        Arc::new(InterfaceHandle::new(
            InterfaceDescription::new("joint1", name),
            kind,
        ))
    }

    fn limiter(
        position_command: &Arc<InterfaceHandle>,
        position_state: &Arc<InterfaceHandle>,
    ) -> JointLimiter {
        JointLimiter::new(
            "joint1".into(),
            limits(),
            JointLimiterHandles {
                position_command: Some(Arc::clone(position_command)),
                velocity_command: None,
                acceleration_command: None,
                effort_command: None,
                position_state: Some(Arc::clone(position_state)),
            },
        )
    }

    #[test]
    fn position_step_bounded_by_velocity_limit() {
        // One velocity-limit step up from the measured position.
        assert!((clamp_position(10.0, &limits(), Some(1.05), DT) - 1.052).abs() < 1e-12);
        // And one step down.
        assert!((clamp_position(0.0, &limits(), Some(1.05), DT) - 1.048).abs() < 1e-12);
    }

    #[test]
    fn position_clamp_is_idempotent() {
        let once = clamp_position(10.0, &limits(), Some(1.05), DT);
        let twice = clamp_position(once, &limits(), Some(1.05), DT);
        assert_eq!(once, twice);
    }

    #[test]
    fn position_never_exceeds_absolute_bounds() {
        let lim = limits();
        assert_eq!(clamp_position(10.0, &lim, Some(PI), DT), PI);
        assert_eq!(clamp_position(-10.0, &lim, Some(-PI), DT), -PI);
        // No base, no velocity window: absolute bounds only.
        assert_eq!(clamp_position(10.0, &lim, None, DT), PI);
    }

    #[test]
    fn magnitude_clamps_are_symmetric() {
        assert_eq!(clamp_magnitude(0.5, Some(0.2)), 0.2);
        assert_eq!(clamp_magnitude(-0.5, Some(0.2)), -0.2);
        assert_eq!(clamp_magnitude(0.1, Some(0.2)), 0.1);
        assert_eq!(clamp_magnitude(42.0, None), 42.0);
    }

    #[test]
    fn limiter_rewrites_command_in_place() {
        let command = handle("position", InterfaceKind::Command);
        let state = handle("position", InterfaceKind::State);
        state.set_blocking(1.05);
        command.set_blocking(10.0);

        let mut limiter = limiter(&command, &state);
        limiter.enforce(DT);
        assert!((command.get_f64().unwrap() - 1.052).abs() < 1e-12);
        assert_eq!(limiter.joint(), "joint1");
    }

    #[test]
    fn limiter_skips_nan_commands() {
        let command = handle("position", InterfaceKind::Command);
        let state = handle("position", InterfaceKind::State);
        state.set_blocking(1.0);

        let mut limiter = limiter(&command, &state);
        limiter.enforce(DT);
        assert!(command.get_f64().unwrap().is_nan());
    }

    #[test]
    fn limiter_falls_back_to_last_enforced_without_measurement() {
        let command = handle("position", InterfaceKind::Command);
        let state = handle("position", InterfaceKind::State);
        state.set_blocking(0.0);
        command.set_blocking(10.0);

        let mut limiter = limiter(&command, &state);
        limiter.enforce(DT);
        assert!((command.get_f64().unwrap() - 0.002).abs() < 1e-12);

        // Measurement goes away; the ramp continues from the last enforced value.
        state.set_blocking(f64::NAN);
        command.set_blocking(10.0);
        limiter.enforce(DT);
        assert!((command.get_f64().unwrap() - 0.004).abs() < 1e-12);
    }

    #[test]
    fn progressive_enforcement_approaches_position_bound() {
        let command = handle("position", InterfaceKind::Command);
        let state = handle("position", InterfaceKind::State);
        state.set_blocking(1.05);

        let mut limiter = limiter(&command, &state);
        let mut previous = 1.05;
        for _ in 0..300 {
            command.set_blocking(10.0);
            limiter.enforce(DT);
            let enforced = command.get_f64().unwrap();
            assert!(enforced <= PI + 1e-12);
            assert!(enforced >= previous);
            previous = enforced;
            // Hardware follows the enforced reference exactly.
            state.set_blocking(enforced);
        }
        assert!((previous - (1.05 + 300.0 * 0.002)).abs() < 1e-9);
    }
}
