//! Hardware component wrapper.
//!
//! Owns one driver, allocates the interface handles derived from its
//! description, drives the lifecycle state machine and provides the
//! `trigger_read` / `trigger_write` entry points the manager dispatches
//! through. For async components the cycles are delegated to the worker.

use crate::component::async_executor::{AsyncExecutor, TriggerStatus};
use crate::component::io::{build_io, ComponentIo};
use crate::component::Driver;
use crate::config::HardwareInfo;
use crate::error::{ConfigError, TransitionError};
use crate::interface::description::InterfaceDescription;
use crate::lifecycle::{LifecycleState, Transition};
use crate::stats::{CycleStatistics, CycleStatisticsSnapshot};
use crate::types::{CallbackResult, ComponentKind, CycleResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One loaded hardware component.
#[derive(Debug)]
pub struct HardwareComponent {
    info: HardwareInfo,
    state: LifecycleState,
    driver: Arc<Mutex<Driver>>,
    io: Arc<ComponentIo>,
    executor: Option<AsyncExecutor>,
    read_stats: CycleStatistics,
    write_stats: CycleStatistics,
    last_read_time: Option<Duration>,
    last_write_time: Option<Duration>,
    errored_before: bool,
}

impl HardwareComponent {
    /// Initialize a component: run the driver's `on_init` once, derive the
    /// interface descriptions and allocate their handles.
    pub fn new(info: HardwareInfo, mut driver: Driver) -> Result<Self, ConfigError> {
        info.validate()?;
        if driver.kind() != info.kind {
            return Err(ConfigError::Invalid {
                component: info.name.clone(),
                reason: format!(
                    "driver is {} but description says {}",
                    driver.kind().label(),
                    info.kind.label()
                ),
            });
        }

        match driver.inner_mut().on_init(&info) {
            CallbackResult::Success => {}
            CallbackResult::Failure | CallbackResult::Error => {
                return Err(ConfigError::InitFailed(info.name.clone()));
            }
        }

        let mut state_descriptions = info.state_interface_descriptions();
        state_descriptions.extend(driver.inner().unlisted_state_interfaces());
        let mut command_descriptions = info.command_interface_descriptions();
        command_descriptions.extend(driver.inner().unlisted_command_interfaces());

        check_unique(&info.name, &state_descriptions)?;
        check_unique(&info.name, &command_descriptions)?;

        let io = Arc::new(build_io(&state_descriptions, &command_descriptions));
        let driver = Arc::new(Mutex::new(driver));

        let executor = if info.is_async {
            info!(
                "starting async worker for '{}' (thread priority {})",
                info.name, info.thread_priority
            );
            Some(AsyncExecutor::start(
                &info.name,
                info.thread_priority,
                Arc::clone(&driver),
                Arc::clone(&io),
            ))
        } else {
            None
        };

        Ok(Self {
            info,
            state: LifecycleState::Unconfigured,
            driver,
            io,
            executor,
            read_stats: CycleStatistics::new(),
            write_stats: CycleStatistics::new(),
            last_read_time: None,
            last_write_time: None,
            errored_before: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.info.kind
    }

    pub fn group(&self) -> Option<&str> {
        self.info.group.as_deref()
    }

    pub fn is_async(&self) -> bool {
        self.info.is_async
    }

    pub fn info(&self) -> &HardwareInfo {
        &self.info
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The component's handle tables, as its driver sees them.
    pub fn io(&self) -> &Arc<ComponentIo> {
        &self.io
    }

    /// Sorted local keys of the exported state interfaces. May only be
    /// queried while the component is configured (inactive or active).
    pub fn state_interface_keys(&self) -> Result<Vec<String>, TransitionError> {
        self.check_configured()?;
        let mut keys: Vec<String> = self.io.states().map(|(key, _)| key.clone()).collect();
        keys.sort_unstable();
        Ok(keys)
    }

    /// Sorted local keys of the exported command interfaces; same state
    /// requirement as `state_interface_keys`.
    pub fn command_interface_keys(&self) -> Result<Vec<String>, TransitionError> {
        self.check_configured()?;
        let mut keys: Vec<String> = self.io.commands().map(|(key, _)| key.clone()).collect();
        keys.sort_unstable();
        Ok(keys)
    }

    pub fn read_statistics(&self) -> CycleStatisticsSnapshot {
        self.read_stats.snapshot()
    }

    pub fn write_statistics(&self) -> CycleStatisticsSnapshot {
        self.write_stats.snapshot()
    }

    /// The component's own cycle period: `1/rw_rate`, or the manager's
    /// nominal period when no rate is declared.
    pub fn desired_period(&self, nominal: Duration) -> Duration {
        match self.info.rw_rate {
            Some(rate) => Duration::from_secs_f64(1.0 / rate),
            None => nominal,
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Execute one lifecycle transition with its driver callback.
    pub fn transition(&mut self, transition: Transition) -> Result<LifecycleState, TransitionError> {
        if !transition.valid_from(self.state) {
            return Err(TransitionError::Invalid {
                component: self.info.name.clone(),
                from: self.state,
                transition,
            });
        }

        if transition == Transition::Shutdown {
            return Ok(self.finalize());
        }

        if transition == Transition::Activate {
            // Drop results published during a previous active phase.
            if let Some(exec) = &self.executor {
                exec.reset_published();
            }
        }

        let result = {
            let mut driver = self.driver.lock();
            let driver = driver.inner_mut();
            match transition {
                Transition::Configure => driver.on_configure(&self.io),
                Transition::Cleanup => driver.on_cleanup(&self.io),
                Transition::Activate => driver.on_activate(&self.io),
                Transition::Deactivate => driver.on_deactivate(&self.io),
                Transition::Shutdown => unreachable!("handled above"),
            }
        };

        match result {
            CallbackResult::Success => {
                self.state = transition.target();
                info!(
                    "component '{}': {} -> {}",
                    self.info.name,
                    transition.label(),
                    self.state.label()
                );
                Ok(self.state)
            }
            CallbackResult::Failure => {
                warn!(
                    "component '{}': {} callback failed, staying {}",
                    self.info.name,
                    transition.label(),
                    self.state.label()
                );
                Err(TransitionError::CallbackFailed {
                    component: self.info.name.clone(),
                    from: self.state,
                    transition,
                })
            }
            CallbackResult::Error => {
                let ended_in = self.handle_error();
                Err(TransitionError::CallbackErrored {
                    component: self.info.name.clone(),
                    transition,
                    ended_in,
                })
            }
        }
    }

    /// Run the error protocol: `on_error`, then recover to unconfigured on
    /// the first occurrence, finalize on a repeat or when `on_error` itself
    /// fails. Command handles are reset on recovery so a later configure
    /// does not replay stale commands.
    pub(crate) fn handle_error(&mut self) -> LifecycleState {
        let result = self.driver.lock().inner_mut().on_error(&self.io);
        if result == CallbackResult::Success && !self.errored_before {
            self.errored_before = true;
            self.io.reset_commands_to_initial_or_zero();
            self.state = LifecycleState::Unconfigured;
            warn!(
                "component '{}' recovered from error, now unconfigured",
                self.info.name
            );
        } else {
            warn!(
                "component '{}' is unrecoverable, finalizing",
                self.info.name
            );
            self.stop_executor();
            self.state = LifecycleState::Finalized;
        }
        self.state
    }

    /// Shutdown path: stop the worker, run `on_shutdown`, finalize. The
    /// target state is unconditional; a failing callback is only logged.
    fn finalize(&mut self) -> LifecycleState {
        self.stop_executor();
        let result = self.driver.lock().inner_mut().on_shutdown(&self.io);
        if result != CallbackResult::Success {
            warn!(
                "component '{}': on_shutdown reported {:?}, finalizing anyway",
                self.info.name, result
            );
        }
        self.state = LifecycleState::Finalized;
        info!("component '{}' finalized", self.info.name);
        self.state
    }

    fn stop_executor(&mut self) {
        if let Some(mut exec) = self.executor.take() {
            exec.stop();
        }
    }

    // ── Cycles ─────────────────────────────────────────────────────

    /// Execute or trigger one read cycle.
    pub fn trigger_read(&mut self, time: Duration, period: Duration) -> TriggerStatus {
        if let Some(exec) = &self.executor {
            let status = exec.trigger_cycle(time, period);
            if !status.accepted {
                warn!(
                    "component '{}': previous async cycle still running, read/write trigger skipped",
                    self.info.name
                );
            }
            status
        } else {
            let start = Instant::now();
            let result = self.driver.lock().read(time, period, &self.io);
            TriggerStatus {
                accepted: true,
                result,
                execution_time: Some(start.elapsed()),
            }
        }
    }

    /// Execute one write cycle, or report the worker's last write return.
    pub fn trigger_write(&mut self, time: Duration, period: Duration) -> TriggerStatus {
        if let Some(exec) = &self.executor {
            exec.write_status()
        } else {
            let start = Instant::now();
            let result = self.driver.lock().write(time, period, &self.io);
            TriggerStatus {
                accepted: true,
                result,
                execution_time: Some(start.elapsed()),
            }
        }
    }

    /// Whether the component's own rate permits a read at `time`.
    pub(crate) fn read_due(&self, time: Duration, nominal: Duration, slack: Duration) -> bool {
        match self.last_read_time {
            None => true,
            Some(last) => time.saturating_sub(last) + slack >= self.desired_period(nominal),
        }
    }

    pub(crate) fn write_due(&self, time: Duration, nominal: Duration, slack: Duration) -> bool {
        match self.last_write_time {
            None => true,
            Some(last) => time.saturating_sub(last) + slack >= self.desired_period(nominal),
        }
    }

    /// Record a successful read cycle for the statistics.
    pub(crate) fn record_read(&mut self, time: Duration, execution: Option<Duration>) {
        let since_last = self.last_read_time.map(|last| time.saturating_sub(last));
        self.read_stats.record(execution, since_last);
        self.last_read_time = Some(time);
    }

    pub(crate) fn record_write(&mut self, time: Duration, execution: Option<Duration>) {
        let since_last = self.last_write_time.map(|last| time.saturating_sub(last));
        self.write_stats.record(execution, since_last);
        self.last_write_time = Some(time);
    }

    // ── Command mode switching ─────────────────────────────────────

    /// Non-realtime mode-switch check; requires the component configured.
    pub fn prepare_command_mode_switch(
        &mut self,
        start: &[String],
        stop: &[String],
    ) -> Result<CycleResult, TransitionError> {
        self.check_configured()?;
        Ok(self
            .driver
            .lock()
            .inner_mut()
            .prepare_command_mode_switch(start, stop))
    }

    /// Realtime mode-switch application; requires the component configured.
    pub fn perform_command_mode_switch(
        &mut self,
        start: &[String],
        stop: &[String],
    ) -> Result<CycleResult, TransitionError> {
        self.check_configured()?;
        Ok(self
            .driver
            .lock()
            .inner_mut()
            .perform_command_mode_switch(start, stop))
    }

    fn check_configured(&self) -> Result<(), TransitionError> {
        if self.state.interfaces_available() {
            Ok(())
        } else {
            Err(TransitionError::NotConfigured {
                component: self.info.name.clone(),
                state: self.state,
            })
        }
    }
}

fn check_unique(component: &str, descriptions: &[InterfaceDescription]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for descr in descriptions {
        let key = descr.key();
        if !seen.insert(key.clone()) {
            return Err(ConfigError::DuplicateInterface {
                component: component.to_string(),
                key,
            });
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
