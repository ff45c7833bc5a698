//! Immutable interface descriptions.
//!
//! A description names one scalar channel between a driver and a
//! controller: `<prefix>/<interface_name>` with a data-type tag, optional
//! initial value, and free-form parameters interpreted by drivers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between prefix and interface name in canonical keys.
pub const KEY_SEPARATOR: char = '/';

/// Scalar data type carried by an interface handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Double,
    Bool,
}

impl DataType {
    /// Observable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Bool => "bool",
        }
    }
}

/// Description of one interface of a hardware component or a controller.
///
/// Identity is immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDescription {
    /// Device name the interface belongs to (joint, sensor, gpio, controller).
    pub prefix: String,
    /// Interface name within the prefix, e.g. "position".
    pub interface_name: String,
    /// Scalar type tag.
    pub data_type: DataType,
    /// Value the handle starts with; layer-specific default when absent.
    pub initial_value: Option<f64>,
    /// Free-form parameters, opaque to the core.
    pub params: BTreeMap<String, String>,
}

impl InterfaceDescription {
    pub fn new(prefix: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            interface_name: interface_name.into(),
            data_type: DataType::Double,
            initial_value: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_initial(mut self, value: f64) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Canonical key, unique within one resource manager.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.prefix, KEY_SEPARATOR, self.interface_name)
    }
}

/// Split a canonical key into `(prefix, interface_name)`.
///
/// Returns `None` when the key has no separator or either part is empty.
/// The prefix may itself contain separators; the split is at the last one.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let idx = key.rfind(KEY_SEPARATOR)?;
    let (prefix, rest) = key.split_at(idx);
    let interface_name = &rest[1..];
    if prefix.is_empty() || interface_name.is_empty() {
        return None;
    }
    Some((prefix, interface_name))
}

// ─── Tests ──────────────────────────────────────────────────────────
