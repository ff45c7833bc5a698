//! Registry-level scenarios: loading, claiming, reference interfaces and
//! the controller-to-hardware cache.

use gantry::{
    builtin_registry, parse_components, CallbackResult, ClaimError, ComponentIo, ComponentKind,
    ConfigError, CycleResult, Driver, DriverRegistry, HardwareDriver, HardwareInfo,
    InterfaceDescription, LifecycleState, ReferenceError, ResourceManager,
};
use std::time::Duration;

const MINIMAL_ROBOT: &str = r#"
    [[components]]
    name = "act"
    kind = "actuator"
    plugin = "mock"
    [[components.joints]]
    name = "joint1"
    state_interfaces = [{ name = "position" }, { name = "velocity" }]
    command_interfaces = [{ name = "position" }, { name = "max_velocity" }]

    [[components]]
    name = "imu"
    kind = "sensor"
    plugin = "mock"
    [[components.sensors]]
    name = "base_imu"
    state_interfaces = [{ name = "roll" }, { name = "pitch" }]

    [[components]]
    name = "sys"
    kind = "system"
    plugin = "mock"
    [[components.joints]]
    name = "joint2"
    state_interfaces = [{ name = "position" }]
    command_interfaces = [{ name = "velocity" }]
    [[components.joints]]
    name = "joint3"
    state_interfaces = [{ name = "position" }]
    command_interfaces = [{ name = "velocity" }]
"#;

fn minimal_robot() -> ResourceManager {
    let rm = ResourceManager::new(100.0);
    rm.load_components(parse_components(MINIMAL_ROBOT).unwrap(), &builtin_registry())
        .unwrap();
    rm
}

#[test]
fn load_registers_all_interfaces() {
    let rm = minimal_robot();
    assert_eq!(
        rm.state_interface_keys(),
        vec![
            "base_imu/pitch",
            "base_imu/roll",
            "joint1/position",
            "joint1/velocity",
            "joint2/position",
            "joint3/position",
        ]
    );
    assert_eq!(
        rm.command_interface_keys(),
        vec![
            "joint1/max_velocity",
            "joint1/position",
            "joint2/velocity",
            "joint3/velocity",
        ]
    );
    let status = rm.components_status();
    assert_eq!(status.len(), 3);
    assert_eq!(status["imu"].kind, ComponentKind::Sensor);
    assert_eq!(status["imu"].state, LifecycleState::Unconfigured);
}

#[test]
fn exclusive_command_claims() {
    let rm = minimal_robot();
    rm.set_component_state("act", LifecycleState::Active)
        .unwrap();

    let claim = rm.claim_command_interface("joint1/position").unwrap();
    assert!(rm.command_interface_is_claimed("joint1/position"));
    assert!(matches!(
        rm.claim_command_interface("joint1/position"),
        Err(ClaimError::AlreadyClaimed(_))
    ));

    // Releasing the lend re-enables claiming in the same cycle.
    drop(claim);
    assert!(!rm.command_interface_is_claimed("joint1/position"));
    rm.claim_command_interface("joint1/position").unwrap();
}

#[test]
fn state_claims_are_shared() {
    let rm = minimal_robot();
    rm.set_component_state("imu", LifecycleState::Inactive)
        .unwrap();
    let a = rm.claim_state_interface("base_imu/roll").unwrap();
    let b = rm.claim_state_interface("base_imu/roll").unwrap();
    assert_eq!(a.get_f64(), b.get_f64());
}

#[test]
fn claims_see_the_drivers_values() {
    let rm = minimal_robot();
    rm.set_component_state("sys", LifecycleState::Active)
        .unwrap();

    let command = rm.claim_command_interface("joint2/velocity").unwrap();
    let state = rm.claim_state_interface("joint2/position").unwrap();
    command.set(0.25).unwrap();

    let t = Duration::from_millis(10);
    rm.write(t, t);
    rm.read(t, t);
    // joint2 is in the mock's default position mode; a velocity command
    // mirrors onto the same-named state, which joint2 does not declare, so
    // the position state is untouched.
    assert_eq!(state.get_f64(), Some(0.0));
    assert_eq!(command.get_f64(), Some(0.25));
}

#[test]
fn claim_unknown_interface() {
    let rm = minimal_robot();
    assert!(matches!(
        rm.claim_state_interface("nope/position"),
        Err(ClaimError::NotFound(_))
    ));
    assert!(matches!(
        rm.claim_command_interface("nope/position"),
        Err(ClaimError::NotFound(_))
    ));
}

// ── Controller reference interfaces ─────────────────────────────────

fn reference_descriptions() -> Vec<InterfaceDescription> {
    vec![
        InterfaceDescription::new("ctrl", "input1").with_initial(1.0),
        InterfaceDescription::new("ctrl", "input2").with_initial(2.0),
        InterfaceDescription::new("ctrl", "input3").with_initial(3.0),
    ]
}

#[test]
fn reference_interface_lifecycle() {
    let rm = minimal_robot();
    rm.import_controller_reference_interfaces("ctrl", reference_descriptions())
        .unwrap();

    let names = rm.controller_reference_interface_names("ctrl").unwrap();
    assert_eq!(names, vec!["ctrl/input1", "ctrl/input2", "ctrl/input3"]);

    // Imported but unavailable until toggled.
    for key in &names {
        assert!(rm.command_interface_exists(key));
        assert!(!rm.command_interface_is_available(key));
        assert!(!rm.command_interface_is_claimed(key));
    }

    rm.make_controller_reference_interfaces_available("ctrl")
        .unwrap();
    for key in &names {
        assert!(rm.command_interface_is_available(key));
    }

    {
        let one = rm.claim_command_interface("ctrl/input1").unwrap();
        let three = rm.claim_command_interface("ctrl/input3").unwrap();
        assert!(rm.command_interface_is_claimed("ctrl/input1"));
        assert!(!rm.command_interface_is_claimed("ctrl/input2"));

        assert_eq!(one.get_f64(), Some(1.0));
        assert_eq!(three.get_f64(), Some(3.0));
        one.set(11.1).unwrap();
        three.set(33.3).unwrap();
        assert_eq!(one.get_f64(), Some(11.1));
    }

    // Lends released, still managed.
    assert!(!rm.command_interface_is_claimed("ctrl/input1"));
    assert!(rm.command_interface_is_available("ctrl/input1"));

    rm.make_controller_reference_interfaces_unavailable("ctrl")
        .unwrap();
    assert!(!rm.command_interface_is_available("ctrl/input1"));
    assert!(rm.command_interface_exists("ctrl/input1"));

    // Last written values survive the availability toggle.
    rm.make_controller_reference_interfaces_available("ctrl")
        .unwrap();
    let again = rm.claim_command_interface("ctrl/input1").unwrap();
    assert_eq!(again.get_f64(), Some(11.1));
    drop(again);

    rm.remove_controller_reference_interfaces("ctrl").unwrap();
    assert!(!rm.command_interface_exists("ctrl/input1"));
    assert!(!rm.command_interface_is_available("ctrl/input1"));
}

#[test]
fn reference_operations_on_unknown_controller_fail() {
    let rm = minimal_robot();
    assert!(matches!(
        rm.make_controller_reference_interfaces_available("ghost"),
        Err(ReferenceError::UnknownController(_))
    ));
    assert!(matches!(
        rm.make_controller_reference_interfaces_unavailable("ghost"),
        Err(ReferenceError::UnknownController(_))
    ));
    assert!(matches!(
        rm.remove_controller_reference_interfaces("ghost"),
        Err(ReferenceError::UnknownController(_))
    ));
    assert!(matches!(
        rm.controller_reference_interface_names("ghost"),
        Err(ReferenceError::UnknownController(_))
    ));
}

#[test]
fn duplicate_reference_import_fails() {
    let rm = minimal_robot();
    rm.import_controller_reference_interfaces("ctrl", reference_descriptions())
        .unwrap();
    assert!(matches!(
        rm.import_controller_reference_interfaces("ctrl", reference_descriptions()),
        Err(ReferenceError::AlreadyImported(_))
    ));
}

// ── Controller → hardware cache ─────────────────────────────────────

#[test]
fn controller_cache_maps_interfaces_to_components() {
    let rm = minimal_robot();
    rm.cache_controller_to_hardware(
        "position_controller",
        &["joint1/position".to_string(), "joint1/velocity".to_string()],
    );
    rm.cache_controller_to_hardware(
        "broad_controller",
        &[
            "joint1/position".to_string(),
            "joint2/velocity".to_string(),
            "base_imu/roll".to_string(),
        ],
    );

    let mut on_act = rm.cached_controllers_for_component("act");
    on_act.sort();
    assert_eq!(on_act, vec!["broad_controller", "position_controller"]);
    assert_eq!(
        rm.cached_controllers_for_component("sys"),
        vec!["broad_controller"]
    );
    assert_eq!(
        rm.cached_controllers_for_component("imu"),
        vec!["broad_controller"]
    );
    assert!(rm.cached_controllers_for_component("ghost").is_empty());

    // Re-caching replaces the previous record.
    rm.cache_controller_to_hardware("broad_controller", &["joint1/position".to_string()]);
    assert!(rm.cached_controllers_for_component("sys").is_empty());
}

// ── Loading edge cases ──────────────────────────────────────────────

struct UninitializableDriver;

impl HardwareDriver for UninitializableDriver {
    fn on_init(&mut self, _info: &HardwareInfo) -> CallbackResult {
        CallbackResult::Failure
    }

    fn read(&mut self, _time: Duration, _period: Duration, _io: &ComponentIo) -> CycleResult {
        CycleResult::Ok
    }
}

fn uninitializable_factory() -> Box<dyn HardwareDriver> {
    Box::new(UninitializableDriver)
}

#[test]
fn uninitializable_component_fails_the_whole_load() {
    let mut registry = DriverRegistry::new();
    gantry::register_builtin_drivers(&mut registry);
    registry.register("uninit", uninitializable_factory);

    let description = r#"
        [[components]]
        name = "good"
        kind = "actuator"
        plugin = "mock"
        [[components.joints]]
        name = "joint1"
        state_interfaces = [{ name = "position" }]

        [[components]]
        name = "broken"
        kind = "actuator"
        plugin = "uninit"
    "#;
    let rm = ResourceManager::new(100.0);
    let err = rm.load_components(parse_components(description).unwrap(), &registry);
    assert!(matches!(err, Err(ConfigError::InitFailed(name)) if name == "broken"));
    assert!(rm.components_status().is_empty());
    assert!(!rm.state_interface_exists("joint1/position"));
}

#[test]
fn import_component_at_runtime() {
    let rm = minimal_robot();
    let info = parse_components(
        r#"
        [[components]]
        name = "late"
        kind = "system"
        plugin = "mock"
        [[components.joints]]
        name = "joint9"
        state_interfaces = [{ name = "position" }]
        command_interfaces = [{ name = "position" }]
    "#,
    )
    .unwrap()
    .remove(0);
    let driver = Driver::System(Box::new(gantry::MockHardware::default()));

    rm.import_component(info, driver).unwrap();
    assert!(rm.state_interface_exists("joint9/position"));
    rm.set_component_state("late", LifecycleState::Active)
        .unwrap();
    rm.claim_command_interface("joint9/position").unwrap();
}

#[test]
fn import_component_rejects_key_collisions() {
    let rm = minimal_robot();
    let info = parse_components(
        r#"
        [[components]]
        name = "clash"
        kind = "system"
        plugin = "mock"
        [[components.joints]]
        name = "joint1"
        state_interfaces = [{ name = "position" }]
    "#,
    )
    .unwrap()
    .remove(0);
    let driver = Driver::System(Box::new(gantry::MockHardware::default()));
    assert!(matches!(
        rm.import_component(info, driver),
        Err(ConfigError::DuplicateInterface { .. })
    ));
    assert_eq!(rm.components_status().len(), 3);
}
