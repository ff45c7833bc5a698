//! Driver-side access to a component's own interface handles.
//!
//! The wrapper allocates the handles once at load; `ComponentIo` is the
//! immutable map a driver works against during lifecycle callbacks and
//! read/write cycles. Handle values are individually rw-locked, so a
//! driver cycle never contends with the manager registry.

use crate::interface::handle::{HandleValue, InterfaceHandle, InterfaceKind};
use std::collections::HashMap;
use std::sync::Arc;

/// The handle tables of one component, keyed by local canonical key
/// (`<device>/<interface>`).
#[derive(Debug, Default)]
pub struct ComponentIo {
    states: HashMap<String, Arc<InterfaceHandle>>,
    commands: HashMap<String, Arc<InterfaceHandle>>,
}

impl ComponentIo {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        states: HashMap<String, Arc<InterfaceHandle>>,
        commands: HashMap<String, Arc<InterfaceHandle>>,
    ) -> Self {
        Self { states, commands }
    }

    pub fn has_state(&self, key: &str) -> bool {
        self.states.contains_key(key)
    }

    pub fn has_command(&self, key: &str) -> bool {
        self.commands.contains_key(key)
    }

    pub fn state_handle(&self, key: &str) -> Option<&Arc<InterfaceHandle>> {
        self.states.get(key)
    }

    pub fn command_handle(&self, key: &str) -> Option<&Arc<InterfaceHandle>> {
        self.commands.get(key)
    }

    /// Current state value, `None` when unset or not a double.
    pub fn state_value(&self, key: &str) -> Option<f64> {
        self.states.get(key).and_then(|h| h.get_f64())
    }

    /// Current command value, `None` when unset or not a double.
    pub fn command_value(&self, key: &str) -> Option<f64> {
        self.commands.get(key).and_then(|h| h.get_f64())
    }

    /// Publish a state value. The driver owns its state handles, so this
    /// waits for the handle lock.
    ///
    /// # Panics
    /// Panics on an unknown key; a driver writing an interface it never
    /// exported is a programmer error.
    pub fn set_state(&self, key: &str, value: impl Into<HandleValue>) {
        match self.states.get(key) {
            Some(handle) => handle.set_blocking(value),
            None => panic!("state interface not found: {key}"),
        }
    }

    /// Overwrite a command value (used by drivers that reset or mirror
    /// their own commands).
    ///
    /// # Panics
    /// Panics on an unknown key.
    pub fn set_command(&self, key: &str, value: impl Into<HandleValue>) {
        match self.commands.get(key) {
            Some(handle) => handle.set_blocking(value),
            None => panic!("command interface not found: {key}"),
        }
    }

    /// All state handles, in no particular order.
    pub fn states(&self) -> impl Iterator<Item = (&String, &Arc<InterfaceHandle>)> {
        self.states.iter()
    }

    /// All command handles, in no particular order.
    pub fn commands(&self) -> impl Iterator<Item = (&String, &Arc<InterfaceHandle>)> {
        self.commands.iter()
    }

    pub(crate) fn reset_commands_to_initial_or_zero(&self) {
        for handle in self.commands.values() {
            handle.reset_to_initial_or_zero();
        }
    }
}

/// Build an IO table from interface descriptions.
pub(crate) fn build_io(
    state_descriptions: &[crate::interface::description::InterfaceDescription],
    command_descriptions: &[crate::interface::description::InterfaceDescription],
) -> ComponentIo {
    let states = state_descriptions
        .iter()
        .map(|descr| {
            (
                descr.key(),
                Arc::new(InterfaceHandle::new(descr.clone(), InterfaceKind::State)),
            )
        })
        .collect();
    let commands = command_descriptions
        .iter()
        .map(|descr| {
            (
                descr.key(),
                Arc::new(InterfaceHandle::new(descr.clone(), InterfaceKind::Command)),
            )
        })
        .collect();
    ComponentIo::new(states, commands)
}

// ─── Tests ──────────────────────────────────────────────────────────
