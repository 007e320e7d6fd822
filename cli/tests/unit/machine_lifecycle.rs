//! Scenario tests for the `Machine` lifecycle against a scripted provider.

#![allow(clippy::expect_used)]

use std::collections::HashSet;

use testnode_cli::application::services::{Machine, MachineOptions, provision};
use testnode_cli::domain::{MachineError, MachineState};
use testnode_common::{LoginCredentials, NodeSpec};

use crate::mocks::{ScriptedProvider, anonymous_node, node_with};

#[tokio::test]
async fn three_granted_ports_are_handed_out_once_then_exhausted() {
    let provider = ScriptedProvider::with_ports(&[20000, 20001, 20002]);
    let mut machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");

    let handed_out: HashSet<u16> = (0..3)
        .map(|_| machine.get_next_available_port().expect("port"))
        .collect();
    assert_eq!(handed_out, HashSet::from([20000, 20001, 20002]));

    let err = machine.get_next_available_port().expect_err("exhausted");
    assert!(matches!(err, MachineError::PoolExhausted { granted: 3 }));
    assert!(err.to_string().contains("No more free inbound ports"));
}

#[tokio::test]
async fn missing_credentials_fall_back_to_ubuntu() {
    let provider = ScriptedProvider::with_ports(&[]);
    let machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");
    assert_eq!(machine.user(), "ubuntu");
    assert_eq!(provider.logins(), vec!["ubuntu@198.51.100.20".to_string()]);
}

#[tokio::test]
async fn credential_user_and_first_address_are_used() {
    let provider = ScriptedProvider::with_ports(&[]);
    let credentials = LoginCredentials {
        user: "ci".to_string(),
    };
    let machine = Machine::new(&provider, node_with("n-7", Some(credentials)))
        .await
        .expect("machine");
    assert_eq!(machine.user(), "ci");
    assert_eq!(machine.public_ip_address(), "198.51.100.20");
}

#[tokio::test]
async fn reset_tolerates_no_running_runtime() {
    let provider = ScriptedProvider::with_ports(&[20000]);
    provider.exit_status("killall", 1);
    let machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");

    machine.reset().await.expect("reset");

    let executed = provider.executed();
    assert!(executed.contains(&"rm -rf machine*".to_string()), "{executed:?}");
    assert!(executed.contains(&"killall java".to_string()), "{executed:?}");
    assert_eq!(machine.state(), MachineState::Ready);
}

#[tokio::test]
async fn reset_kills_configured_runtime() {
    let provider = ScriptedProvider::with_ports(&[]);
    let options = MachineOptions {
        runtime_process: "node".to_string(),
    };
    let machine = Machine::with_options(&provider, anonymous_node(), options)
        .await
        .expect("machine");
    machine.reset().await.expect("reset");
    assert!(provider.executed().contains(&"killall node".to_string()));
}

#[tokio::test]
async fn reset_does_not_return_ports() {
    let provider = ScriptedProvider::with_ports(&[20000, 20001]);
    let mut machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");
    let first = machine.get_next_available_port().expect("port");

    machine.reset().await.expect("reset");

    let second = machine.get_next_available_port().expect("port");
    assert_ne!(first, second);
    assert!(machine.get_next_available_port().is_err());
}

#[tokio::test]
async fn reset_reports_failed_artifact_removal() {
    let provider = ScriptedProvider::with_ports(&[]);
    let machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");
    provider.exit_status("rm -rf", 1);

    let err = machine.reset().await.expect_err("reset fails");
    assert!(matches!(err, MachineError::Reset { .. }), "{err}");
}

#[tokio::test]
async fn each_operation_opens_its_own_session() {
    let provider = ScriptedProvider::with_ports(&[]);
    let machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");
    machine.reset().await.expect("reset");
    machine.run_in_dir("ls").await.expect("ls");
    assert_eq!(provider.sessions_opened(), 3);
}

#[tokio::test]
async fn closed_machine_rejects_further_use() {
    let provider = ScriptedProvider::with_ports(&[20000, 20001]);
    let mut machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");

    machine.close().await.expect("close");
    assert_eq!(machine.state(), MachineState::Closed);

    assert!(matches!(
        machine.get_next_available_port(),
        Err(MachineError::Closed { .. })
    ));
    assert!(matches!(
        machine.connect().await,
        Err(MachineError::Closed { .. })
    ));
    assert!(matches!(
        machine.reset().await,
        Err(MachineError::Closed { .. })
    ));
}

#[tokio::test]
async fn close_destroys_the_node_exactly_once() {
    let provider = ScriptedProvider::with_ports(&[]);
    let mut machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");

    machine.close().await.expect("first close");
    machine.close().await.expect("second close");

    assert_eq!(
        provider.destroyed(),
        vec!["testnode-00000000000000aa".to_string()]
    );
}

#[tokio::test]
async fn failed_close_can_be_retried() {
    let provider = ScriptedProvider::with_ports(&[]);
    provider.fail_destroys(1);
    let mut machine = Machine::new(&provider, anonymous_node())
        .await
        .expect("machine");

    let err = machine.close().await.expect_err("destroy fails");
    assert!(matches!(err, MachineError::Destroy { .. }));
    assert_eq!(machine.state(), MachineState::Ready);

    machine.close().await.expect("retry");
    assert_eq!(machine.state(), MachineState::Closed);
}

#[tokio::test]
async fn failed_directory_creation_means_no_machine() {
    let provider = ScriptedProvider::with_ports(&[20000]);
    provider.exit_status("mkdir", 1);
    let result = Machine::new(&provider, anonymous_node()).await;
    assert!(matches!(result, Err(MachineError::Setup { .. })));
}

#[tokio::test]
async fn provision_cleans_up_after_failed_setup() {
    let provider = ScriptedProvider::with_ports(&[]);
    provider.exit_status("mkdir", 1);
    let err = provision(&provider, &NodeSpec::default(), MachineOptions::default())
        .await
        .err()
        .expect("setup fails");

    assert!(format!("{err:#}").contains("working directory"), "{err:#}");
    assert_eq!(
        provider.destroyed(),
        vec!["testnode-00000000000000aa".to_string()]
    );
}
