//! Generic mock hardware driver.
//!
//! Simulates any described component without real hardware: commands
//! written by controllers are mirrored back into the matching state
//! interfaces on `read`, optionally through a following offset or a simple
//! dynamics integration. Used by the test suites and as a drop-in backend
//! for bring-up before drivers exist.
//!
//! Recognized free-form parameters (all optional):
//!
//! | parameter | effect |
//! |---|---|
//! | `position_state_following_offset` | additive offset on the position mirror |
//! | `custom_interface_with_following_offset` | state interface receiving the offset mirror |
//! | `mock_sensor_commands` | fabricate command mirrors for sensor states |
//! | `mock_gpio_commands` | fabricate command mirrors for gpio states |
//! | `calculate_dynamics` | integrate/differentiate per-joint motion states |
//! | `disable_commands` | drop commands silently, states stay unchanged |
//! | `example_param_read_for_sec` | artificial delay inside `read` |
//! | `example_param_write_for_sec` | artificial delay inside `write` |
//! | `read_fail_value` | any joint command equal to this makes `read` error |
//! | `read_deactivate_value` | same, `read` requests deactivation |
//! | `write_fail_value` | any joint command equal to this makes `write` error |
//! | `write_deactivate_value` | same, `write` requests deactivation |

use crate::component::{ComponentIo, HardwareDriver};
use crate::config::HardwareInfo;
use crate::interface::description::InterfaceDescription;
use crate::interface::handle::HandleValue;
use crate::types::{CallbackResult, CycleResult, ACCELERATION, POSITION, VELOCITY};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum JointMode {
    #[default]
    Position,
    Velocity,
    Acceleration,
}

#[derive(Debug, Clone)]
struct JointModel {
    name: String,
    command_names: Vec<String>,
    mode: JointMode,
}

/// Mock driver, one instance per mocked component.
#[derive(Debug, Default)]
pub struct MockHardware {
    offset: f64,
    custom_interface: Option<String>,
    mock_sensor_commands: bool,
    mock_gpio_commands: bool,
    calculate_dynamics: bool,
    disable_commands: bool,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
    read_fail_value: Option<f64>,
    read_deactivate_value: Option<f64>,
    write_fail_value: Option<f64>,
    write_deactivate_value: Option<f64>,
    joints: Vec<JointModel>,
    /// Sensor/gpio state keys mirrored from fabricated or declared commands.
    mirror_keys: Vec<String>,
    fabricated_commands: Vec<InterfaceDescription>,
}

impl MockHardware {
    fn delay(param: Option<f64>) -> Option<Duration> {
        param.filter(|secs| *secs > 0.0).map(Duration::from_secs_f64)
    }

    fn joint_command_key(&self, joint: &str, interface: &str) -> String {
        format!("{joint}/{interface}")
    }

    /// Scan all joint commands for an injected trigger value.
    fn scan_trigger_values(
        &self,
        io: &ComponentIo,
        fail: Option<f64>,
        deactivate: Option<f64>,
    ) -> CycleResult {
        if fail.is_none() && deactivate.is_none() {
            return CycleResult::Ok;
        }
        for joint in &self.joints {
            for command in &joint.command_names {
                let key = self.joint_command_key(&joint.name, command);
                if let Some(value) = io.command_value(&key).filter(|v| v.is_finite()) {
                    if Some(value) == fail {
                        return CycleResult::Error;
                    }
                    if Some(value) == deactivate {
                        return CycleResult::Deactivate;
                    }
                }
            }
        }
        CycleResult::Ok
    }

    /// Mirror one command value into the joint's states, applying the
    /// following offset where configured.
    fn mirror_joint_command(&self, io: &ComponentIo, joint: &str, interface: &str, value: f64) {
        let state_key = format!("{joint}/{interface}");
        if interface == POSITION {
            match &self.custom_interface {
                Some(custom) => {
                    let custom_key = format!("{joint}/{custom}");
                    if io.has_state(&custom_key) {
                        io.set_state(&custom_key, value + self.offset);
                    }
                    if io.has_state(&state_key) {
                        io.set_state(&state_key, value);
                    }
                }
                None => {
                    if io.has_state(&state_key) {
                        io.set_state(&state_key, value + self.offset);
                    }
                }
            }
        } else if io.has_state(&state_key) {
            io.set_state(&state_key, value);
        }
    }

    fn integrate_joint(&self, io: &ComponentIo, joint: &JointModel, period: Duration) {
        let dt = period.as_secs_f64();
        let pos_key = format!("{}/{}", joint.name, POSITION);
        let vel_key = format!("{}/{}", joint.name, VELOCITY);
        let acc_key = format!("{}/{}", joint.name, ACCELERATION);
        let old_pos = io.state_value(&pos_key).unwrap_or(0.0);
        let old_vel = io.state_value(&vel_key).unwrap_or(0.0);

        let command = |name: &str| {
            io.command_value(&self.joint_command_key(&joint.name, name))
                .filter(|v| v.is_finite())
        };

        let (pos, vel, acc) = match joint.mode {
            JointMode::Position => match command(POSITION) {
                Some(cmd) => {
                    let vel = if dt > 0.0 { (cmd - old_pos) / dt } else { 0.0 };
                    let acc = if dt > 0.0 { (vel - old_vel) / dt } else { 0.0 };
                    (cmd, vel, acc)
                }
                None => return,
            },
            JointMode::Velocity => match command(VELOCITY) {
                Some(cmd) => {
                    let acc = if dt > 0.0 { (cmd - old_vel) / dt } else { 0.0 };
                    (old_pos + cmd * dt, cmd, acc)
                }
                None => return,
            },
            JointMode::Acceleration => match command(ACCELERATION) {
                Some(cmd) => {
                    let vel = old_vel + cmd * dt;
                    (old_pos + vel * dt, vel, cmd)
                }
                None => return,
            },
        };

        if io.has_state(&pos_key) {
            io.set_state(&pos_key, pos);
        }
        if io.has_state(&vel_key) {
            io.set_state(&vel_key, vel);
        }
        if io.has_state(&acc_key) {
            io.set_state(&acc_key, acc);
        }
        if let Some(custom) = &self.custom_interface {
            let custom_key = format!("{}/{}", joint.name, custom);
            if io.has_state(&custom_key) {
                io.set_state(&custom_key, pos + self.offset);
            }
        }
    }
}

impl HardwareDriver for MockHardware {
    fn on_init(&mut self, info: &HardwareInfo) -> CallbackResult {
        self.offset = info.param_f64("position_state_following_offset").unwrap_or(0.0);
        self.custom_interface = info
            .params
            .get("custom_interface_with_following_offset")
            .cloned();
        self.mock_sensor_commands = info.param_bool("mock_sensor_commands");
        self.mock_gpio_commands = info.param_bool("mock_gpio_commands");
        self.calculate_dynamics = info.param_bool("calculate_dynamics");
        self.disable_commands = info.param_bool("disable_commands");
        self.read_delay = Self::delay(info.param_f64("example_param_read_for_sec"));
        self.write_delay = Self::delay(info.param_f64("example_param_write_for_sec"));
        self.read_fail_value = info.param_f64("read_fail_value");
        self.read_deactivate_value = info.param_f64("read_deactivate_value");
        self.write_fail_value = info.param_f64("write_fail_value");
        self.write_deactivate_value = info.param_f64("write_deactivate_value");

        self.joints = info
            .joints
            .iter()
            .map(|device| JointModel {
                name: device.name.clone(),
                command_names: device
                    .command_interfaces
                    .iter()
                    .map(|itf| itf.name.clone())
                    .collect(),
                mode: JointMode::Position,
            })
            .collect();

        self.mirror_keys.clear();
        self.fabricated_commands.clear();
        let mock_sensors = self.mock_sensor_commands;
        let mock_gpios = self.mock_gpio_commands;
        for (devices, fabricate) in [(&info.sensors, mock_sensors), (&info.gpios, mock_gpios)] {
            for device in devices {
                for itf in &device.state_interfaces {
                    let key = format!("{}/{}", device.name, itf.name);
                    self.mirror_keys.push(key);
                    if fabricate {
                        self.fabricated_commands.push(InterfaceDescription {
                            prefix: device.name.clone(),
                            interface_name: itf.name.clone(),
                            data_type: itf.data_type,
                            initial_value: itf.initial_value,
                            params: itf.params.clone(),
                        });
                    }
                }
            }
        }

        CallbackResult::Success
    }

    fn unlisted_command_interfaces(&self) -> Vec<InterfaceDescription> {
        self.fabricated_commands.clone()
    }

    fn on_configure(&mut self, io: &ComponentIo) -> CallbackResult {
        // Publish initial state values: declared initials are already in the
        // handles, everything else starts at zero/false.
        for (_, handle) in io.states() {
            if handle.get().is_none() {
                match handle.description().data_type {
                    crate::interface::description::DataType::Double => handle.set_blocking(0.0),
                    crate::interface::description::DataType::Bool => handle.set_blocking(false),
                }
            }
        }
        CallbackResult::Success
    }

    fn prepare_command_mode_switch(&mut self, start: &[String], _stop: &[String]) -> CycleResult {
        for key in start {
            let Some((prefix, interface)) = crate::interface::description::split_key(key) else {
                continue;
            };
            if !self.joints.iter().any(|j| j.name == prefix) {
                continue; // not ours, not relevant
            }
            if interface == ACCELERATION && !self.calculate_dynamics {
                return CycleResult::Error;
            }
            // At most one movement interface may start per joint.
            let movement_starts = start
                .iter()
                .filter(|other| {
                    crate::interface::description::split_key(other)
                        .map(|(p, i)| p == prefix && crate::types::is_movement_interface(i))
                        .unwrap_or(false)
                })
                .count();
            if movement_starts > 1 {
                return CycleResult::Error;
            }
        }
        CycleResult::Ok
    }

    fn perform_command_mode_switch(&mut self, start: &[String], _stop: &[String]) -> CycleResult {
        for key in start {
            let Some((prefix, interface)) = crate::interface::description::split_key(key) else {
                continue;
            };
            let Some(joint) = self.joints.iter_mut().find(|j| j.name == prefix) else {
                continue; // unknown keys pass through
            };
            joint.mode = match interface {
                POSITION => JointMode::Position,
                VELOCITY => JointMode::Velocity,
                ACCELERATION => JointMode::Acceleration,
                _ => continue,
            };
        }
        CycleResult::Ok
    }

    fn read(&mut self, _time: Duration, period: Duration, io: &ComponentIo) -> CycleResult {
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }

        let triggered =
            self.scan_trigger_values(io, self.read_fail_value, self.read_deactivate_value);
        if triggered != CycleResult::Ok {
            return triggered;
        }

        if self.disable_commands {
            return CycleResult::Ok;
        }

        if self.calculate_dynamics {
            for joint in &self.joints {
                self.integrate_joint(io, joint, period);
                // Non-movement commands still mirror one-to-one.
                for command in &joint.command_names {
                    if crate::types::is_movement_interface(command) {
                        continue;
                    }
                    let key = self.joint_command_key(&joint.name, command);
                    if let Some(value) = io.command_value(&key).filter(|v| v.is_finite()) {
                        self.mirror_joint_command(io, &joint.name, command, value);
                    }
                }
            }
        } else {
            for joint in &self.joints {
                for command in &joint.command_names {
                    let key = self.joint_command_key(&joint.name, command);
                    if let Some(value) = io.command_value(&key).filter(|v| v.is_finite()) {
                        self.mirror_joint_command(io, &joint.name, command, value);
                    }
                }
            }
        }

        // Sensor/gpio mirrors driven by fabricated or declared commands.
        for key in &self.mirror_keys {
            let Some(command) = io.command_handle(key) else {
                continue;
            };
            match command.get() {
                Some(HandleValue::Double(v)) if v.is_finite() => io.set_state(key, v),
                Some(HandleValue::Bool(v)) => io.set_state(key, v),
                _ => {}
            }
        }

        CycleResult::Ok
    }

    fn write(&mut self, _time: Duration, _period: Duration, io: &ComponentIo) -> CycleResult {
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        self.scan_trigger_values(io, self.write_fail_value, self.write_deactivate_value)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
