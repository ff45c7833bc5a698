//! Lock-protected scalar slots exchanged between drivers and controllers.
//!
//! Each handle carries one value under its own reader/writer lock:
//! `get` takes the lock shared, `set` takes it exclusive. The non-blocking
//! `set` reports contention instead of waiting, which keeps the realtime
//! caller's critical sections bounded; drivers that prefer to wait use
//! `set_blocking`.

use crate::error::HandleConflict;
use crate::interface::description::{DataType, InterfaceDescription};
use parking_lot::RwLock;

/// Direction of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Driver → controller. Written only by the owning driver.
    State,
    /// Controller → driver. Written by the (single) claimer.
    Command,
}

/// Scalar payload of a handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandleValue {
    Double(f64),
    Bool(bool),
}

impl HandleValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(v),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(v),
            Self::Double(_) => None,
        }
    }
}

impl From<f64> for HandleValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for HandleValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// A named, typed, lock-protected slot holding one scalar.
#[derive(Debug)]
pub struct InterfaceHandle {
    description: InterfaceDescription,
    kind: InterfaceKind,
    value: RwLock<Option<HandleValue>>,
}

impl InterfaceHandle {
    /// Create a handle from its description.
    ///
    /// Command handles start at the declared initial value, NaN (double) or
    /// false (bool) otherwise. State handles start unset unless the
    /// description declares an initial value; the owning driver publishes
    /// the first state on configure.
    pub fn new(description: InterfaceDescription, kind: InterfaceKind) -> Self {
        let value = Self::construction_value(&description, kind);
        Self {
            description,
            kind,
            value: RwLock::new(value),
        }
    }

    fn construction_value(
        description: &InterfaceDescription,
        kind: InterfaceKind,
    ) -> Option<HandleValue> {
        match (description.data_type, description.initial_value, kind) {
            (DataType::Double, Some(v), _) => Some(HandleValue::Double(v)),
            (DataType::Bool, Some(v), _) => Some(HandleValue::Bool(v != 0.0)),
            (DataType::Double, None, InterfaceKind::Command) => {
                Some(HandleValue::Double(f64::NAN))
            }
            (DataType::Bool, None, InterfaceKind::Command) => Some(HandleValue::Bool(false)),
            (_, None, InterfaceKind::State) => None,
        }
    }

    pub fn description(&self) -> &InterfaceDescription {
        &self.description
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.description.prefix
    }

    pub fn interface_name(&self) -> &str {
        &self.description.interface_name
    }

    /// Canonical key `<prefix>/<interface_name>`.
    pub fn key(&self) -> String {
        self.description.key()
    }

    /// Current value; `None` only if never written and no initial value.
    pub fn get(&self) -> Option<HandleValue> {
        *self.value.read()
    }

    /// Current value as f64, `None` for unset or bool-typed handles.
    pub fn get_f64(&self) -> Option<f64> {
        self.get().and_then(HandleValue::as_f64)
    }

    /// Replace the value without waiting on the exclusive lock.
    ///
    /// Non-finite values are accepted here; rejecting them is the business
    /// of drivers and the limit stage.
    pub fn set(&self, value: impl Into<HandleValue>) -> Result<(), HandleConflict> {
        match self.value.try_write() {
            Some(mut slot) => {
                *slot = Some(value.into());
                Ok(())
            }
            None => Err(HandleConflict),
        }
    }

    /// Replace the value, waiting for the exclusive lock if needed.
    pub fn set_blocking(&self, value: impl Into<HandleValue>) {
        *self.value.write() = Some(value.into());
    }

    /// Reset a command handle after a recoverable component error: the
    /// declared initial value, or zero/false without one.
    pub(crate) fn reset_to_initial_or_zero(&self) {
        let value = match (self.description.data_type, self.description.initial_value) {
            (DataType::Double, Some(v)) => HandleValue::Double(v),
            (DataType::Double, None) => HandleValue::Double(0.0),
            (DataType::Bool, Some(v)) => HandleValue::Bool(v != 0.0),
            (DataType::Bool, None) => HandleValue::Bool(false),
        };
        *self.value.write() = Some(value);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
