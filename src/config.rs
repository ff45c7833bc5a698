//! Hardware component descriptions and their TOML loading.
//!
//! A description file carries a `[[components]]` table array; each entry
//! becomes one immutable `HardwareInfo`. The manager also accepts
//! `HardwareInfo` values built in code, so the file format is a
//! convenience, not a requirement.

use crate::error::ConfigError;
use crate::interface::description::{InterfaceDescription, KEY_SEPARATOR};
use crate::limits::JointLimits;
use crate::types::ComponentKind;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

fn default_thread_priority() -> i32 {
    50
}

/// One interface of a joint, sensor or gpio.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceInfo {
    /// Interface name within the device, e.g. "position".
    pub name: String,
    /// Scalar type tag.
    #[serde(default)]
    pub data_type: crate::interface::description::DataType,
    /// Optional initial value.
    #[serde(default)]
    pub initial_value: Option<f64>,
    /// Free-form parameters, opaque to the core.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// One declared device (joint, sensor or gpio) of a component.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(default)]
    pub state_interfaces: Vec<InterfaceInfo>,
    #[serde(default)]
    pub command_interfaces: Vec<InterfaceInfo>,
    /// Per-joint limits, enforced by the command-limit stage.
    #[serde(default)]
    pub limits: Option<JointLimits>,
}

/// Immutable description of one hardware component.
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareInfo {
    /// Unique component name.
    pub name: String,
    /// actuator / sensor / system.
    pub kind: ComponentKind,
    /// Driver factory name in the registry.
    pub plugin: String,
    /// Failure-coupling cohort; components sharing a group fail together.
    #[serde(default)]
    pub group: Option<String>,
    /// Run read/write on a dedicated worker thread.
    #[serde(default)]
    pub is_async: bool,
    /// Requested worker thread priority (best-effort).
    #[serde(default = "default_thread_priority")]
    pub thread_priority: i32,
    /// Per-component read/write rate [Hz]; manager update rate when absent.
    #[serde(default)]
    pub rw_rate: Option<f64>,
    /// Free-form parameters, opaque to the core, interpreted by drivers.
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub joints: Vec<DeviceInfo>,
    #[serde(default)]
    pub sensors: Vec<DeviceInfo>,
    #[serde(default)]
    pub gpios: Vec<DeviceInfo>,
}

impl HardwareInfo {
    /// All devices in declaration order: joints, sensors, gpios.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.joints
            .iter()
            .chain(self.sensors.iter())
            .chain(self.gpios.iter())
    }

    /// Declared state-interface descriptions in declaration order.
    pub fn state_interface_descriptions(&self) -> Vec<InterfaceDescription> {
        self.devices()
            .flat_map(|device| {
                device
                    .state_interfaces
                    .iter()
                    .map(|itf| interface_description(&device.name, itf))
            })
            .collect()
    }

    /// Declared command-interface descriptions in declaration order.
    pub fn command_interface_descriptions(&self) -> Vec<InterfaceDescription> {
        self.devices()
            .flat_map(|device| {
                device
                    .command_interfaces
                    .iter()
                    .map(|itf| interface_description(&device.name, itf))
            })
            .collect()
    }

    /// A free-form parameter parsed as f64, `None` when absent or malformed.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|raw| raw.parse().ok())
    }

    /// A free-form parameter parsed as bool ("true"/"false", "1"/"0").
    pub fn param_bool(&self, key: &str) -> bool {
        match self.params.get(key).map(String::as_str) {
            Some("true") | Some("True") | Some("1") => true,
            _ => false,
        }
    }

    /// Validate invariants that do not need the driver registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            component: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(ConfigError::Invalid {
                component: "<unnamed>".into(),
                reason: "component name must not be empty".into(),
            });
        }
        if self.plugin.is_empty() {
            return Err(invalid("plugin name must not be empty".into()));
        }
        if let Some(rate) = self.rw_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(invalid(format!("rw_rate must be positive, got {rate}")));
            }
        }
        if self.kind == ComponentKind::Sensor
            && self.devices().any(|d| !d.command_interfaces.is_empty())
        {
            return Err(invalid("sensor components cannot declare command interfaces".into()));
        }
        let mut device_names = HashSet::new();
        for device in self.devices() {
            if device.name.is_empty() {
                return Err(invalid("device name must not be empty".into()));
            }
            if device.name.contains(KEY_SEPARATOR) {
                return Err(invalid(format!(
                    "device name '{}' must not contain '{}'",
                    device.name, KEY_SEPARATOR
                )));
            }
            if !device_names.insert(&device.name) {
                return Err(invalid(format!("duplicate device name '{}'", device.name)));
            }
            for itf in device
                .state_interfaces
                .iter()
                .chain(device.command_interfaces.iter())
            {
                if itf.name.is_empty() {
                    return Err(invalid(format!(
                        "device '{}' declares an unnamed interface",
                        device.name
                    )));
                }
            }
            if let Some(limits) = &device.limits {
                if let (Some(min), Some(max)) = (limits.min_position, limits.max_position) {
                    if min > max {
                        return Err(invalid(format!(
                            "joint '{}': min_position {min} exceeds max_position {max}",
                            device.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn interface_description(prefix: &str, itf: &InterfaceInfo) -> InterfaceDescription {
    InterfaceDescription {
        prefix: prefix.to_string(),
        interface_name: itf.name.clone(),
        data_type: itf.data_type,
        initial_value: itf.initial_value,
        params: itf.params.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct DescriptionFile {
    #[serde(default)]
    components: Vec<HardwareInfo>,
}

/// Parse a TOML description into hardware infos.
///
/// Validates each component and rejects duplicate component names; a failed
/// parse or validation returns an error without partial results.
pub fn parse_components(input: &str) -> Result<Vec<HardwareInfo>, ConfigError> {
    let file: DescriptionFile =
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut names = HashSet::new();
    for component in &file.components {
        component.validate()?;
        if !names.insert(component.name.clone()) {
            return Err(ConfigError::DuplicateComponent(component.name.clone()));
        }
    }
    Ok(file.components)
}

/// Load and parse a TOML description file.
pub fn load_components_file(path: &Path) -> Result<Vec<HardwareInfo>, ConfigError> {
    info!("loading hardware description from {:?}", path);
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    let components = parse_components(&content)?;
    info!("loaded {} component description(s)", components.len());
    Ok(components)
}

// ─── Tests ──────────────────────────────────────────────────────────
