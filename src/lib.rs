//! # gantry
//!
//! Realtime hardware/controller binding core. The crate implements the
//! subsystem that connects a dynamic set of controllers to a dynamic set of
//! hardware components (actuators, sensors, composite systems) through
//! typed interface handles, and drives the components in a periodic loop
//! with lifecycle management, asynchronous offloading, per-component rate
//! multiplexing and command-limit enforcement.
//!
//! The embedding control loop is expected to call, once per nominal
//! period:
//!
//! 1. [`ResourceManager::read`] - eligible components populate their state
//!    handles (synchronously, or via their async workers);
//! 2. controllers compute, writing commands through their claimed
//!    [`LoanedCommandInterface`]s;
//! 3. [`ResourceManager::enforce_command_limits`] - commands are rewritten
//!    in place to respect declared joint limits;
//! 4. [`ResourceManager::write`] - active components push the command
//!    handles to the hardware.
//!
//! Time is always an explicit argument; the crate reads no global clock.
//! Logging goes through `tracing`; installing a subscriber is the
//! embedding process's concern.
//!
//! ```
//! use gantry::{builtin_registry, parse_components, LifecycleState, ResourceManager};
//! use std::time::Duration;
//!
//! let description = r#"
//!     [[components]]
//!     name = "arm"
//!     kind = "system"
//!     plugin = "mock"
//!
//!     [[components.joints]]
//!     name = "joint1"
//!     state_interfaces = [{ name = "position", initial_value = 1.57 }]
//!     command_interfaces = [{ name = "position" }]
//! "#;
//!
//! let rm = ResourceManager::new(100.0);
//! rm.load_components(parse_components(description).unwrap(), &builtin_registry())
//!     .unwrap();
//! rm.set_component_state("arm", LifecycleState::Active).unwrap();
//!
//! let command = rm.claim_command_interface("joint1/position").unwrap();
//! let state = rm.claim_state_interface("joint1/position").unwrap();
//!
//! let (time, period) = (Duration::from_millis(10), Duration::from_millis(10));
//! command.set(0.5).unwrap();
//! rm.enforce_command_limits(period);
//! rm.write(time, period);
//! rm.read(time, period);
//! assert_eq!(state.get_f64(), Some(0.5));
//! ```

pub mod component;
pub mod config;
pub mod drivers;
pub mod error;
pub mod interface;
pub mod lifecycle;
pub mod limits;
pub mod manager;
pub mod registry;
pub mod stats;
pub mod types;

pub use component::{ComponentIo, Driver, HardwareComponent, HardwareDriver, TriggerStatus};
pub use config::{load_components_file, parse_components, DeviceInfo, HardwareInfo, InterfaceInfo};
pub use drivers::{builtin_registry, register_builtin_drivers, MockHardware};
pub use error::{ClaimError, ConfigError, HandleConflict, ReferenceError, TransitionError};
pub use interface::{
    DataType, HandleValue, InterfaceDescription, InterfaceHandle, InterfaceKind,
    LoanedCommandInterface, LoanedStateInterface,
};
pub use lifecycle::{LifecycleState, Transition};
pub use limits::JointLimits;
pub use manager::{ComponentStatus, ResourceManager};
pub use registry::{DriverFactory, DriverRegistry};
pub use stats::{CycleStatisticsSnapshot, StatsSnapshot};
pub use types::{
    is_movement_interface, CallbackResult, ComponentKind, CycleResult, ACCELERATION, EFFORT,
    POSITION, VELOCITY,
};
