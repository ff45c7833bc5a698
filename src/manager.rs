//! Resource manager.
//!
//! The registry and arbiter of everything this crate binds together: it
//! loads hardware components, indexes their interface handles by canonical
//! key, arbitrates exclusive command claims, drives component lifecycles,
//! dispatches the periodic read/write cycles with per-component rate
//! multiplexing and group-failure bookkeeping, hosts the command-limit
//! stage, and manages controller reference interfaces.
//!
//! Locking: one plain mutex guards the registry (components, indexes,
//! limiters, caches). It is held across lifecycle transitions and the
//! dispatch loop of sync components, but never by async workers; handle
//! values carry their own rw-locks, so controllers reading or writing
//! through loans never touch the registry mutex. The claim set lives in an
//! `Arc` shared with command loans so a dropped loan releases its claim
//! without reaching back into the manager.

use crate::component::{Driver, HardwareComponent, TriggerStatus};
use crate::config::HardwareInfo;
use crate::error::{ClaimError, ConfigError, ReferenceError, TransitionError};
use crate::interface::description::InterfaceDescription;
use crate::interface::handle::{InterfaceHandle, InterfaceKind};
use crate::interface::loan::{LoanedCommandInterface, LoanedStateInterface};
use crate::lifecycle::{plan_transitions, LifecycleState, Transition};
use crate::limits::{JointLimiter, JointLimiterHandles};
use crate::registry::DriverRegistry;
use crate::stats::CycleStatisticsSnapshot;
use crate::types::{is_movement_interface, ComponentKind, CycleResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Who registered an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InterfaceOwner {
    /// Index into the component list.
    Component(usize),
    /// Controller name, for reference interfaces.
    Controller(String),
}

#[derive(Debug)]
struct IndexEntry {
    owner: InterfaceOwner,
    handle: Arc<InterfaceHandle>,
}

#[derive(Debug)]
struct ControllerReferences {
    keys: Vec<String>,
    available: bool,
}

#[derive(Default)]
struct ManagerCore {
    components: Vec<HardwareComponent>,
    state_index: HashMap<String, IndexEntry>,
    command_index: HashMap<String, IndexEntry>,
    references: HashMap<String, ControllerReferences>,
    /// controller -> hardware component names it touches.
    controller_cache: HashMap<String, Vec<String>>,
    limiters: Vec<JointLimiter>,
}

impl ManagerCore {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    fn retire_component_handles(&mut self, idx: usize) {
        let owner = InterfaceOwner::Component(idx);
        self.state_index.retain(|_, entry| entry.owner != owner);
        self.command_index.retain(|_, entry| entry.owner != owner);
        let joints: HashSet<String> = self.components[idx]
            .info()
            .joints
            .iter()
            .map(|device| device.name.clone())
            .collect();
        self.limiters
            .retain(|limiter| !joints.contains(limiter.joint()));
    }

    fn command_available(&self, entry: &IndexEntry) -> bool {
        match &entry.owner {
            InterfaceOwner::Component(idx) => {
                let state = self.components[*idx].state();
                if !state.interfaces_available() {
                    return false;
                }
                if is_movement_interface(entry.handle.interface_name()) {
                    state == LifecycleState::Active
                } else {
                    true
                }
            }
            InterfaceOwner::Controller(name) => self
                .references
                .get(name)
                .map(|refs| refs.available)
                .unwrap_or(false),
        }
    }

    fn state_available(&self, entry: &IndexEntry) -> bool {
        match &entry.owner {
            InterfaceOwner::Component(idx) => self.components[*idx].state().interfaces_available(),
            InterfaceOwner::Controller(_) => true,
        }
    }
}

/// Report entry of `components_status`.
#[derive(Debug, Clone)]
pub struct ComponentStatus {
    pub kind: ComponentKind,
    pub state: LifecycleState,
    pub group: Option<String>,
    pub is_async: bool,
    pub rw_rate: Option<f64>,
    pub read_statistics: CycleStatisticsSnapshot,
    pub write_statistics: CycleStatisticsSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// The top-level registry binding controllers to hardware components.
pub struct ResourceManager {
    core: Mutex<ManagerCore>,
    claims: Arc<Mutex<HashSet<String>>>,
    update_rate: f64,
}

impl ResourceManager {
    /// Create an empty manager with the given nominal update rate [Hz].
    ///
    /// # Panics
    /// Panics on a non-positive rate; that is a programmer error.
    pub fn new(update_rate: f64) -> Self {
        assert!(
            update_rate.is_finite() && update_rate > 0.0,
            "update_rate must be positive"
        );
        Self {
            core: Mutex::new(ManagerCore::default()),
            claims: Arc::default(),
            update_rate,
        }
    }

    /// Nominal update rate [Hz].
    pub fn update_rate(&self) -> f64 {
        self.update_rate
    }

    fn nominal_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_rate)
    }

    // ── Loading ────────────────────────────────────────────────────

    /// Construct, initialize and register one component per description.
    ///
    /// All-or-nothing: any construction or registration failure leaves the
    /// manager exactly as it was before the call.
    pub fn load_components(
        &self,
        infos: Vec<HardwareInfo>,
        registry: &DriverRegistry,
    ) -> Result<(), ConfigError> {
        let mut staged = Vec::with_capacity(infos.len());
        for info in infos {
            let driver = registry.create(&info)?;
            staged.push(HardwareComponent::new(info, driver)?);
        }
        self.install(staged)
    }

    /// Runtime addition of a single component with an already-built driver.
    pub fn import_component(&self, info: HardwareInfo, driver: Driver) -> Result<(), ConfigError> {
        let component = HardwareComponent::new(info, driver)?;
        self.install(vec![component])
    }

    fn install(&self, staged: Vec<HardwareComponent>) -> Result<(), ConfigError> {
        let mut core = self.core.lock();

        // Validate names and keys against the registry and within the batch
        // before touching anything.
        let mut new_names = HashSet::new();
        for component in &staged {
            if core.index_of(component.name()).is_some()
                || !new_names.insert(component.name().to_string())
            {
                return Err(ConfigError::DuplicateComponent(component.name().to_string()));
            }
        }
        let mut new_keys = HashSet::new();
        for component in &staged {
            for (key, _) in component.io().states() {
                if core.state_index.contains_key(key) || !new_keys.insert(format!("s:{key}")) {
                    return Err(ConfigError::DuplicateInterface {
                        component: component.name().to_string(),
                        key: key.clone(),
                    });
                }
            }
            for (key, _) in component.io().commands() {
                if core.command_index.contains_key(key) || !new_keys.insert(format!("c:{key}")) {
                    return Err(ConfigError::DuplicateInterface {
                        component: component.name().to_string(),
                        key: key.clone(),
                    });
                }
            }
        }

        for component in staged {
            let idx = core.components.len();
            for (key, handle) in component.io().states() {
                core.state_index.insert(
                    key.clone(),
                    IndexEntry {
                        owner: InterfaceOwner::Component(idx),
                        handle: Arc::clone(handle),
                    },
                );
            }
            for (key, handle) in component.io().commands() {
                core.command_index.insert(
                    key.clone(),
                    IndexEntry {
                        owner: InterfaceOwner::Component(idx),
                        handle: Arc::clone(handle),
                    },
                );
            }
            info!(
                "loaded component '{}' ({}, group {:?}, async {})",
                component.name(),
                component.kind().label(),
                component.group(),
                component.is_async()
            );
            core.components.push(component);
        }
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Drive the named component through the transitions needed to reach
    /// `target`.
    pub fn set_component_state(
        &self,
        name: &str,
        target: LifecycleState,
    ) -> Result<LifecycleState, TransitionError> {
        let mut core = self.core.lock();
        let idx = core
            .index_of(name)
            .ok_or_else(|| TransitionError::UnknownComponent(name.to_string()))?;
        let from = core.components[idx].state();
        let plan = plan_transitions(from, target).ok_or(TransitionError::Unreachable {
            component: name.to_string(),
            from,
            target,
        })?;

        let mut outcome = Ok(from);
        for transition in plan {
            match core.components[idx].transition(transition) {
                Ok(state) => outcome = Ok(state),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        if core.components[idx].state() == LifecycleState::Finalized {
            core.retire_component_handles(idx);
        }
        outcome
    }

    /// Drive every non-finalized component to finalized.
    pub fn shutdown_components(&self) {
        let mut core = self.core.lock();
        for idx in 0..core.components.len() {
            if core.components[idx].state() != LifecycleState::Finalized {
                let _ = core.components[idx].transition(Transition::Shutdown);
                core.retire_component_handles(idx);
            }
        }
    }

    /// Lifecycle state, kind, rates and statistics of every component.
    pub fn components_status(&self) -> HashMap<String, ComponentStatus> {
        let core = self.core.lock();
        core.components
            .iter()
            .map(|component| {
                (
                    component.name().to_string(),
                    ComponentStatus {
                        kind: component.kind(),
                        state: component.state(),
                        group: component.group().map(str::to_string),
                        is_async: component.is_async(),
                        rw_rate: component.info().rw_rate,
                        read_statistics: component.read_statistics(),
                        write_statistics: component.write_statistics(),
                    },
                )
            })
            .collect()
    }

    // ── Interface discovery ────────────────────────────────────────

    /// Sorted canonical keys of all registered state interfaces.
    pub fn state_interface_keys(&self) -> Vec<String> {
        let core = self.core.lock();
        let mut keys: Vec<String> = core.state_index.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Sorted canonical keys of all registered command interfaces.
    pub fn command_interface_keys(&self) -> Vec<String> {
        let core = self.core.lock();
        let mut keys: Vec<String> = core.command_index.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn state_interface_exists(&self, key: &str) -> bool {
        self.core.lock().state_index.contains_key(key)
    }

    pub fn command_interface_exists(&self, key: &str) -> bool {
        self.core.lock().command_index.contains_key(key)
    }

    /// Registered and the owning component is inactive or active.
    pub fn state_interface_is_available(&self, key: &str) -> bool {
        let core = self.core.lock();
        core.state_index
            .get(key)
            .map(|entry| core.state_available(entry))
            .unwrap_or(false)
    }

    /// Registered, the owner is configured, and for movement command
    /// interfaces the owner is active.
    pub fn command_interface_is_available(&self, key: &str) -> bool {
        let core = self.core.lock();
        core.command_index
            .get(key)
            .map(|entry| core.command_available(entry))
            .unwrap_or(false)
    }

    pub fn command_interface_is_claimed(&self, key: &str) -> bool {
        self.claims.lock().contains(key)
    }

    // ── Claiming ───────────────────────────────────────────────────

    /// Lend a state interface. Any number of concurrent lends may coexist.
    pub fn claim_state_interface(&self, key: &str) -> Result<LoanedStateInterface, ClaimError> {
        let core = self.core.lock();
        let entry = core
            .state_index
            .get(key)
            .ok_or_else(|| ClaimError::NotFound(key.to_string()))?;
        if !core.state_available(entry) {
            return Err(ClaimError::NotAvailable(key.to_string()));
        }
        Ok(LoanedStateInterface::new(Arc::clone(&entry.handle)))
    }

    /// Exclusively lend a command interface. The claim is released when the
    /// returned lend is dropped.
    pub fn claim_command_interface(&self, key: &str) -> Result<LoanedCommandInterface, ClaimError> {
        let core = self.core.lock();
        let entry = core
            .command_index
            .get(key)
            .ok_or_else(|| ClaimError::NotFound(key.to_string()))?;
        if !core.command_available(entry) {
            return Err(ClaimError::NotAvailable(key.to_string()));
        }
        let mut claims = self.claims.lock();
        if !claims.insert(key.to_string()) {
            return Err(ClaimError::AlreadyClaimed(key.to_string()));
        }
        Ok(LoanedCommandInterface::new(
            Arc::clone(&entry.handle),
            Arc::clone(&self.claims),
        ))
    }

    // ── Controller reference interfaces ────────────────────────────

    /// Publish a controller's command-like handles under
    /// `<controller>/<name>` keys. They start unavailable.
    pub fn import_controller_reference_interfaces(
        &self,
        controller: &str,
        interfaces: Vec<InterfaceDescription>,
    ) -> Result<(), ReferenceError> {
        let mut core = self.core.lock();
        if core.references.contains_key(controller) {
            return Err(ReferenceError::AlreadyImported(controller.to_string()));
        }

        let mut descriptions = Vec::with_capacity(interfaces.len());
        for mut descr in interfaces {
            descr.prefix = controller.to_string();
            let key = descr.key();
            if core.command_index.contains_key(&key) {
                return Err(ReferenceError::DuplicateKey(key));
            }
            descriptions.push(descr);
        }

        let mut keys = Vec::with_capacity(descriptions.len());
        for descr in descriptions {
            let key = descr.key();
            core.command_index.insert(
                key.clone(),
                IndexEntry {
                    owner: InterfaceOwner::Controller(controller.to_string()),
                    handle: Arc::new(InterfaceHandle::new(descr, InterfaceKind::Command)),
                },
            );
            keys.push(key);
        }
        info!(
            "imported {} reference interface(s) for controller '{}'",
            keys.len(),
            controller
        );
        core.references.insert(
            controller.to_string(),
            ControllerReferences {
                keys,
                available: false,
            },
        );
        Ok(())
    }

    /// Full keys of a controller's reference interfaces, in import order.
    pub fn controller_reference_interface_names(
        &self,
        controller: &str,
    ) -> Result<Vec<String>, ReferenceError> {
        let core = self.core.lock();
        core.references
            .get(controller)
            .map(|refs| refs.keys.clone())
            .ok_or_else(|| ReferenceError::UnknownController(controller.to_string()))
    }

    pub fn make_controller_reference_interfaces_available(
        &self,
        controller: &str,
    ) -> Result<(), ReferenceError> {
        self.set_reference_availability(controller, true)
    }

    pub fn make_controller_reference_interfaces_unavailable(
        &self,
        controller: &str,
    ) -> Result<(), ReferenceError> {
        self.set_reference_availability(controller, false)
    }

    fn set_reference_availability(
        &self,
        controller: &str,
        available: bool,
    ) -> Result<(), ReferenceError> {
        let mut core = self.core.lock();
        let refs = core
            .references
            .get_mut(controller)
            .ok_or_else(|| ReferenceError::UnknownController(controller.to_string()))?;
        refs.available = available;
        Ok(())
    }

    /// Withdraw a controller's reference interfaces from the registry.
    pub fn remove_controller_reference_interfaces(
        &self,
        controller: &str,
    ) -> Result<(), ReferenceError> {
        let mut core = self.core.lock();
        let refs = core
            .references
            .remove(controller)
            .ok_or_else(|| ReferenceError::UnknownController(controller.to_string()))?;
        for key in &refs.keys {
            core.command_index.remove(key);
        }
        Ok(())
    }

    // ── Controller → hardware cache ────────────────────────────────

    /// Record which hardware components a controller touches, derived from
    /// the interface keys it uses.
    pub fn cache_controller_to_hardware(&self, controller: &str, interface_keys: &[String]) {
        let mut core = self.core.lock();
        let mut names: Vec<String> = Vec::new();
        for key in interface_keys {
            let owner = core
                .command_index
                .get(key)
                .or_else(|| core.state_index.get(key))
                .map(|entry| entry.owner.clone());
            if let Some(InterfaceOwner::Component(idx)) = owner {
                let name = core.components[idx].name().to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        core.controller_cache.insert(controller.to_string(), names);
    }

    /// Controllers known to touch the named component. Used to deactivate
    /// exactly the affected controllers when hardware fails.
    pub fn cached_controllers_for_component(&self, component: &str) -> Vec<String> {
        let core = self.core.lock();
        let mut controllers: Vec<String> = core
            .controller_cache
            .iter()
            .filter(|(_, components)| components.iter().any(|c| c == component))
            .map(|(controller, _)| controller.clone())
            .collect();
        controllers.sort_unstable();
        controllers
    }

    // ── Command mode switching ─────────────────────────────────────

    /// Ask every affected component whether the proposed claim change is
    /// acceptable. Keys owned by no component are not relevant and pass
    /// through. Empty inputs succeed trivially.
    pub fn prepare_command_mode_switch(&self, start: &[String], stop: &[String]) -> bool {
        self.mode_switch(start, stop, true)
    }

    /// Apply the claim change on every affected component. Realtime-safe.
    pub fn perform_command_mode_switch(&self, start: &[String], stop: &[String]) -> bool {
        self.mode_switch(start, stop, false)
    }

    fn mode_switch(&self, start: &[String], stop: &[String], prepare: bool) -> bool {
        if start.is_empty() && stop.is_empty() {
            return true;
        }
        let mut core = self.core.lock();

        let mut partitions: BTreeMap<usize, (Vec<String>, Vec<String>)> = BTreeMap::new();
        for (keys, is_start) in [(start, true), (stop, false)] {
            for key in keys {
                if let Some(entry) = core.command_index.get(key) {
                    if let InterfaceOwner::Component(idx) = entry.owner {
                        let slot = partitions.entry(idx).or_default();
                        if is_start {
                            slot.0.push(key.clone());
                        } else {
                            slot.1.push(key.clone());
                        }
                    }
                }
            }
        }

        for (idx, (starts, stops)) in partitions {
            let component = &mut core.components[idx];
            let result = if prepare {
                component.prepare_command_mode_switch(&starts, &stops)
            } else {
                component.perform_command_mode_switch(&starts, &stops)
            };
            match result {
                Ok(CycleResult::Ok) => {}
                Ok(other) => {
                    warn!(
                        "component '{}' rejected command mode switch ({})",
                        component.name(),
                        other.label()
                    );
                    return false;
                }
                Err(err) => {
                    warn!("command mode switch refused: {err}");
                    return false;
                }
            }
        }
        true
    }

    // ── Read / write dispatch ──────────────────────────────────────

    /// One read pass over all eligible components.
    ///
    /// Returns the aggregated result and the names of components (with
    /// their group-mates) that failed and went through error handling.
    pub fn read(&self, time: Duration, period: Duration) -> (CycleResult, Vec<String>) {
        self.dispatch(time, period, Direction::Read)
    }

    /// One write pass over all active components.
    pub fn write(&self, time: Duration, period: Duration) -> (CycleResult, Vec<String>) {
        self.dispatch(time, period, Direction::Write)
    }

    fn dispatch(
        &self,
        time: Duration,
        period: Duration,
        direction: Direction,
    ) -> (CycleResult, Vec<String>) {
        let mut core = self.core.lock();
        let nominal = self.nominal_period();
        // Slack admitting a slightly early periodic cycle: half the nominal
        // period, uniformly for read and write.
        let slack = nominal / 2;

        let mut overall = CycleResult::Ok;
        let mut errored: Vec<usize> = Vec::new();
        let mut deactivations: Vec<usize> = Vec::new();

        for idx in 0..core.components.len() {
            let component = &mut core.components[idx];
            let eligible = match direction {
                // State reads continue while inactive; writes need actuation.
                Direction::Read => component.state().interfaces_available(),
                Direction::Write => component.state() == LifecycleState::Active,
            };
            if !eligible {
                continue;
            }

            let status: TriggerStatus = if component.is_async() {
                match direction {
                    Direction::Read => component.trigger_read(time, period),
                    Direction::Write => component.trigger_write(time, period),
                }
            } else {
                let due = match direction {
                    Direction::Read => component.read_due(time, nominal, slack),
                    Direction::Write => component.write_due(time, nominal, slack),
                };
                if !due {
                    continue;
                }
                match direction {
                    Direction::Read => component.trigger_read(time, period),
                    Direction::Write => component.trigger_write(time, period),
                }
            };

            match status.result {
                CycleResult::Ok => {
                    if status.accepted {
                        match direction {
                            Direction::Read => component.record_read(time, status.execution_time),
                            Direction::Write => component.record_write(time, status.execution_time),
                        }
                    }
                }
                CycleResult::Error => errored.push(idx),
                CycleResult::Deactivate => match direction {
                    Direction::Write => deactivations.push(idx),
                    // A read has no graceful deactivation; kept as an error.
                    Direction::Read => errored.push(idx),
                },
            }
        }

        for idx in deactivations {
            if overall == CycleResult::Ok {
                overall = CycleResult::Deactivate;
            }
            let component = &mut core.components[idx];
            info!(
                "component '{}' requested deactivation during write",
                component.name()
            );
            let _ = component.transition(Transition::Deactivate);
        }

        let mut failed_names: Vec<String> = Vec::new();
        if !errored.is_empty() {
            overall = CycleResult::Error;

            // Fan failures out to group mates before running error handling.
            let mut cohort: Vec<usize> = Vec::new();
            for &idx in &errored {
                if !cohort.contains(&idx) {
                    cohort.push(idx);
                }
                if let Some(group) = core.components[idx].group().map(str::to_string) {
                    for other in 0..core.components.len() {
                        let mate = &core.components[other];
                        if other != idx
                            && mate.group() == Some(group.as_str())
                            && mate.state() != LifecycleState::Finalized
                            && !cohort.contains(&other)
                        {
                            cohort.push(other);
                        }
                    }
                }
            }

            for idx in cohort {
                {
                    let component = &mut core.components[idx];
                    error!(
                        "component '{}' failed during {}",
                        component.name(),
                        direction.label()
                    );
                    failed_names.push(component.name().to_string());
                    component.handle_error();
                }
                if core.components[idx].state() == LifecycleState::Finalized {
                    core.retire_component_handles(idx);
                }
            }
        }

        (overall, failed_names)
    }

    // ── Command limit enforcement ──────────────────────────────────

    /// Build limiters for every loaded joint with declared limits,
    /// replacing any previous import. Returns the number of limiters.
    pub fn import_joint_limiters(&self) -> usize {
        let mut core = self.core.lock();
        let mut limiters = Vec::new();
        for component in &core.components {
            let io = component.io();
            for joint in &component.info().joints {
                let Some(limits) = joint.limits else { continue };
                if !limits.any() {
                    continue;
                }
                let handle = |table: &str, interface: &str| {
                    let key = format!("{}/{}", joint.name, interface);
                    if table == "command" {
                        io.command_handle(&key).cloned()
                    } else {
                        io.state_handle(&key).cloned()
                    }
                };
                limiters.push(JointLimiter::new(
                    joint.name.clone(),
                    limits,
                    JointLimiterHandles {
                        position_command: handle("command", crate::types::POSITION),
                        velocity_command: handle("command", crate::types::VELOCITY),
                        acceleration_command: handle("command", crate::types::ACCELERATION),
                        effort_command: handle("command", crate::types::EFFORT),
                        position_state: handle("state", crate::types::POSITION),
                    },
                ));
            }
        }
        info!("imported {} joint limiter(s)", limiters.len());
        let count = limiters.len();
        core.limiters = limiters;
        count
    }

    /// Rewrite all claimed commands so declared joint limits hold. Runs
    /// between controller writes and the hardware write pass.
    pub fn enforce_command_limits(&self, period: Duration) {
        let mut core = self.core.lock();
        for limiter in &mut core.limiters {
            limiter.enforce(period);
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown_components();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
