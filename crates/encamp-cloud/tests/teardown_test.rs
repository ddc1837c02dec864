mod common;

use common::{FakeGateway, FixedAddress};
use encamp_cloud::error::CloudError;
use encamp_cloud::gateway::InstanceState;
use encamp_cloud::retry::FAST_ATTEMPTS;
use encamp_cloud::{AssemblyId, Provisioner, ProvisionConfig, Teardown, TeardownConfig};
use std::path::PathBuf;
use tempfile::TempDir;

fn demo() -> AssemblyId {
    AssemblyId::new("demo")
}

fn key_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo_id_rsa");
    (dir, path)
}

async fn provision(gateway: &FakeGateway, key_path: &PathBuf) {
    let discovery = FixedAddress::new("203.0.113.7");
    let config = ProvisionConfig {
        worker_count: 1,
        key_path: key_path.clone(),
    };
    Provisioner::new(gateway, &discovery, demo(), config)
        .run()
        .await
        .unwrap();
}

fn teardown<'a>(gateway: &'a FakeGateway, key_path: &PathBuf) -> Teardown<'a, FakeGateway> {
    Teardown::new(
        gateway,
        demo(),
        TeardownConfig {
            key_path: key_path.clone(),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn removes_every_tagged_resource() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let (_dir, key_path) = key_dir();
    provision(&gateway, &key_path).await;

    teardown(&gateway, &key_path).run().await.unwrap();

    assert!(!key_path.exists());
    let state = gateway.state.lock().unwrap();
    assert!(state.vpcs.is_empty());
    assert!(state.subnets.is_empty());
    assert!(state.groups.is_empty());
    assert!(state.internet_gateways.is_empty());
    assert!(state.route_tables.is_empty());
    assert!(state.roles.is_empty());
    assert!(state.profiles.is_empty());
    assert!(state.key_pairs.is_empty());
    assert!(state.clusters.is_empty());
    // instances are terminated and stripped of their identity tags
    assert!(state
        .instances
        .iter()
        .all(|instance| instance.state == InstanceState::Terminated && instance.tags.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn deletes_in_reverse_dependency_order() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let (_dir, key_path) = key_dir();
    provision(&gateway, &key_path).await;

    teardown(&gateway, &key_path).run().await.unwrap();

    let calls = gateway.calls();
    let first_index = |prefix: &str| {
        calls
            .iter()
            .position(|call| call.starts_with(prefix))
            .unwrap_or_else(|| panic!("no {prefix} call issued"))
    };
    let last_index = |prefix: &str| {
        calls
            .iter()
            .rposition(|call| call.starts_with(prefix))
            .unwrap_or_else(|| panic!("no {prefix} call issued"))
    };

    // instances go first, the network last, never a network delete while
    // its subnets still exist
    assert!(last_index("terminate_instances") < first_index("delete_subnet"));
    assert!(last_index("delete_subnet") < first_index("delete_vpc"));
    assert!(last_index("delete_security_group") < first_index("delete_subnet"));
    assert!(last_index("delete_route_table") < first_index("delete_internet_gateway"));
    assert!(last_index("delete_vpc") < first_index("delete_cluster"));
}

#[tokio::test(start_paused = true)]
async fn teardown_of_nothing_is_satisfied() {
    let gateway = FakeGateway::with_zones(&["us-east-1a"]);
    let (_dir, key_path) = key_dir();

    teardown(&gateway, &key_path).run().await.unwrap();

    // only queries and the always-tolerated deletes were issued
    assert!(!gateway
        .calls()
        .iter()
        .any(|call| call.starts_with("delete_vpc") || call.starts_with("delete_subnet")));
}

#[tokio::test(start_paused = true)]
async fn teardown_twice_is_satisfied() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let (_dir, key_path) = key_dir();
    provision(&gateway, &key_path).await;

    teardown(&gateway, &key_path).run().await.unwrap();
    teardown(&gateway, &key_path).run().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn security_group_deletes_stop_after_the_attempt_bound() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let (_dir, key_path) = key_dir();
    provision(&gateway, &key_path).await;
    gateway.state.lock().unwrap().fail_security_group_deletes = true;

    let error = teardown(&gateway, &key_path).run().await.unwrap_err();

    match error {
        CloudError::Api(message) => assert!(message.contains("DependencyViolation")),
        other => panic!("expected the provider error to surface, got {other:?}"),
    }
    // one delete attempt per pass, exactly the bounded number of passes
    assert_eq!(
        gateway.state.lock().unwrap().security_group_delete_attempts,
        FAST_ATTEMPTS
    );
}
