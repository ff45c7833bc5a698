//! Component lifecycle scenarios driven through the resource manager.

use gantry::{
    builtin_registry, parse_components, ClaimError, LifecycleState, ResourceManager,
    TransitionError,
};
use std::time::Duration;

const DESCRIPTION: &str = r#"
    [[components]]
    name = "arm"
    kind = "system"
    plugin = "mock"

    [[components.joints]]
    name = "joint1"
    state_interfaces = [
        { name = "position", initial_value = 1.57 },
        { name = "velocity" },
    ]
    command_interfaces = [
        { name = "position" },
        { name = "max_velocity" },
    ]
"#;

fn loaded_manager() -> ResourceManager {
    let rm = ResourceManager::new(100.0);
    rm.load_components(parse_components(DESCRIPTION).unwrap(), &builtin_registry())
        .unwrap();
    rm
}

fn state_of(rm: &ResourceManager, name: &str) -> LifecycleState {
    rm.components_status()[name].state
}

#[test]
fn loaded_component_starts_unconfigured() {
    let rm = loaded_manager();
    assert_eq!(state_of(&rm, "arm"), LifecycleState::Unconfigured);
    // Interfaces are registered from load onward.
    assert!(rm.state_interface_exists("joint1/position"));
    assert!(rm.command_interface_exists("joint1/position"));
    // But nothing is available yet.
    assert!(!rm.state_interface_is_available("joint1/position"));
    assert!(!rm.command_interface_is_available("joint1/position"));
}

#[test]
fn configure_publishes_initial_values() {
    let rm = loaded_manager();
    rm.set_component_state("arm", LifecycleState::Inactive)
        .unwrap();

    let position = rm.claim_state_interface("joint1/position").unwrap();
    let velocity = rm.claim_state_interface("joint1/velocity").unwrap();
    assert_eq!(position.get_f64(), Some(1.57));
    // State numerics without an initial value start at zero.
    assert_eq!(velocity.get_f64(), Some(0.0));
    // Command numerics without an initial value start at NaN.
    let command = rm.claim_command_interface("joint1/max_velocity").unwrap();
    assert!(command.get_f64().unwrap().is_nan());
}

#[test]
fn movement_commands_require_active() {
    let rm = loaded_manager();
    rm.set_component_state("arm", LifecycleState::Inactive)
        .unwrap();

    // Non-movement commands and all states are claimable while inactive.
    assert!(rm.command_interface_is_available("joint1/max_velocity"));
    assert!(rm.state_interface_is_available("joint1/position"));
    // Movement commands are not.
    assert!(!rm.command_interface_is_available("joint1/position"));
    assert!(matches!(
        rm.claim_command_interface("joint1/position"),
        Err(ClaimError::NotAvailable(_))
    ));

    rm.set_component_state("arm", LifecycleState::Active)
        .unwrap();
    assert!(rm.command_interface_is_available("joint1/position"));
    rm.claim_command_interface("joint1/position").unwrap();

    // Deactivating withdraws the movement interface again.
    rm.set_component_state("arm", LifecycleState::Inactive)
        .unwrap();
    assert!(!rm.command_interface_is_available("joint1/position"));
    assert!(rm.command_interface_is_available("joint1/max_velocity"));
    assert!(rm.state_interface_is_available("joint1/position"));
}

#[test]
fn cleanup_withdraws_availability_but_not_existence() {
    let rm = loaded_manager();
    rm.set_component_state("arm", LifecycleState::Inactive)
        .unwrap();
    rm.set_component_state("arm", LifecycleState::Unconfigured)
        .unwrap();

    assert!(rm.state_interface_exists("joint1/position"));
    assert!(!rm.state_interface_is_available("joint1/position"));
    assert!(matches!(
        rm.claim_state_interface("joint1/position"),
        Err(ClaimError::NotAvailable(_))
    ));
}

#[test]
fn shutdown_is_terminal_and_destroys_handles() {
    let rm = loaded_manager();
    rm.set_component_state("arm", LifecycleState::Active)
        .unwrap();
    rm.set_component_state("arm", LifecycleState::Finalized)
        .unwrap();

    assert_eq!(state_of(&rm, "arm"), LifecycleState::Finalized);
    assert!(!rm.state_interface_exists("joint1/position"));
    assert!(!rm.command_interface_exists("joint1/position"));
    assert!(matches!(
        rm.claim_state_interface("joint1/position"),
        Err(ClaimError::NotFound(_))
    ));

    // Nothing leads out of finalized.
    assert!(matches!(
        rm.set_component_state("arm", LifecycleState::Active),
        Err(TransitionError::Unreachable { .. })
    ));
}

#[test]
fn fan_out_reaches_active_in_one_call() {
    let rm = loaded_manager();
    assert_eq!(
        rm.set_component_state("arm", LifecycleState::Active)
            .unwrap(),
        LifecycleState::Active
    );
    assert_eq!(
        rm.set_component_state("arm", LifecycleState::Unconfigured)
            .unwrap(),
        LifecycleState::Unconfigured
    );
}

#[test]
fn recoverable_error_resets_command_handles() {
    let description = r#"
        [[components]]
        name = "arm"
        kind = "system"
        plugin = "mock"
        [components.params]
        read_fail_value = "28.0"

        [[components.joints]]
        name = "joint1"
        state_interfaces = [{ name = "position" }]
        command_interfaces = [{ name = "position" }]
    "#;
    let rm = ResourceManager::new(100.0);
    rm.load_components(parse_components(description).unwrap(), &builtin_registry())
        .unwrap();
    rm.set_component_state("arm", LifecycleState::Active)
        .unwrap();

    let command = rm.claim_command_interface("joint1/position").unwrap();
    command.set(28.0).unwrap();

    let (result, failed) = rm.read(Duration::from_millis(10), Duration::from_millis(10));
    assert_eq!(result, gantry::CycleResult::Error);
    assert_eq!(failed, vec!["arm".to_string()]);

    // First error recovers to unconfigured and resets commands.
    assert_eq!(state_of(&rm, "arm"), LifecycleState::Unconfigured);
    assert_eq!(command.get_f64(), Some(0.0));
    // State descriptions survive the recovery.
    assert!(rm.state_interface_exists("joint1/position"));
}

#[test]
fn second_error_finalizes() {
    let description = r#"
        [[components]]
        name = "arm"
        kind = "system"
        plugin = "mock"
        [components.params]
        read_fail_value = "28.0"

        [[components.joints]]
        name = "joint1"
        state_interfaces = [{ name = "position" }]
        command_interfaces = [{ name = "position" }]
    "#;
    let rm = ResourceManager::new(100.0);
    rm.load_components(parse_components(description).unwrap(), &builtin_registry())
        .unwrap();

    let time = Duration::from_millis(10);
    for round in 0u32..2 {
        rm.set_component_state("arm", LifecycleState::Active)
            .unwrap();
        let command = rm.claim_command_interface("joint1/position").unwrap();
        command.set(28.0).unwrap();
        let (result, _) = rm.read(time + time * round, time);
        assert_eq!(result, gantry::CycleResult::Error);
        drop(command);
    }

    assert_eq!(state_of(&rm, "arm"), LifecycleState::Finalized);
    assert!(!rm.command_interface_exists("joint1/position"));
}

#[test]
fn mode_switch_refused_while_unconfigured() {
    let rm = loaded_manager();
    let start = vec!["joint1/position".to_string()];
    assert!(!rm.prepare_command_mode_switch(&start, &[]));

    rm.set_component_state("arm", LifecycleState::Inactive)
        .unwrap();
    assert!(rm.prepare_command_mode_switch(&start, &[]));
    assert!(rm.perform_command_mode_switch(&start, &[]));
}
