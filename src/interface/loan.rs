//! Scoped lends of interface handles to consumers.
//!
//! A state lend is a shared borrow: any number may coexist. A command lend
//! is exclusive: the resource manager registers the claim on creation and
//! the claim is released when the lend is dropped, so reclaiming in the
//! same cycle is legal.

use crate::error::HandleConflict;
use crate::interface::handle::{HandleValue, InterfaceHandle};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared lend of a state interface. Read-only.
#[derive(Debug, Clone)]
pub struct LoanedStateInterface {
    handle: Arc<InterfaceHandle>,
}

impl LoanedStateInterface {
    pub(crate) fn new(handle: Arc<InterfaceHandle>) -> Self {
        Self { handle }
    }

    /// Canonical key of the lent interface.
    pub fn key(&self) -> String {
        self.handle.key()
    }

    pub fn get(&self) -> Option<HandleValue> {
        self.handle.get()
    }

    pub fn get_f64(&self) -> Option<f64> {
        self.handle.get_f64()
    }
}

/// Exclusive lend of a command interface. Releases its claim on drop.
#[derive(Debug)]
pub struct LoanedCommandInterface {
    handle: Arc<InterfaceHandle>,
    claims: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl LoanedCommandInterface {
    pub(crate) fn new(handle: Arc<InterfaceHandle>, claims: Arc<Mutex<HashSet<String>>>) -> Self {
        let key = handle.key();
        Self {
            handle,
            claims,
            key,
        }
    }

    /// Canonical key of the lent interface.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Option<HandleValue> {
        self.handle.get()
    }

    pub fn get_f64(&self) -> Option<f64> {
        self.handle.get_f64()
    }

    /// Write a command without waiting; reports contention.
    pub fn set(&self, value: impl Into<HandleValue>) -> Result<(), HandleConflict> {
        self.handle.set(value)
    }

    /// Write a command, waiting for the handle lock if needed.
    pub fn set_blocking(&self, value: impl Into<HandleValue>) {
        self.handle.set_blocking(value);
    }
}

impl Drop for LoanedCommandInterface {
    fn drop(&mut self) {
        self.claims.lock().remove(&self.key);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
