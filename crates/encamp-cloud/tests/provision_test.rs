mod common;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{FAKE_KEY_MATERIAL, FakeGateway, FakeSecurityGroup, FakeVpc, FixedAddress};
use encamp_cloud::error::{CloudError, Result};
use encamp_cloud::gateway::{AddressDiscovery, InstanceState};
use encamp_cloud::tags::{AccessClass, Tag};
use encamp_cloud::{AssemblyId, Provisioner, ProvisionConfig};
use std::path::PathBuf;
use tempfile::TempDir;

const CALLER_ADDRESS: &str = "203.0.113.7";

fn demo() -> AssemblyId {
    AssemblyId::new("demo")
}

fn key_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo_id_rsa");
    (dir, path)
}

fn config(key_path: &PathBuf) -> ProvisionConfig {
    ProvisionConfig {
        worker_count: 1,
        key_path: key_path.clone(),
    }
}

/// Every provider-assigned id currently in the fake account, for
/// run-to-run stability assertions.
fn resource_ids(gateway: &FakeGateway) -> Vec<String> {
    let state = gateway.state.lock().unwrap();
    let mut ids = Vec::new();
    ids.extend(state.vpcs.iter().map(|v| v.id.clone()));
    ids.extend(state.subnets.iter().map(|s| s.id.clone()));
    ids.extend(state.groups.iter().map(|g| g.id.clone()));
    ids.extend(state.internet_gateways.iter().map(|g| g.id.clone()));
    ids.extend(state.route_tables.iter().map(|t| t.id.clone()));
    ids.extend(state.instances.iter().map(|i| i.id.clone()));
    ids.extend(state.roles.iter().map(|r| r.name.clone()));
    ids.extend(state.profiles.iter().map(|p| p.name.clone()));
    ids.extend(state.key_pairs.iter().cloned());
    ids.extend(state.clusters.iter().cloned());
    ids.sort();
    ids
}

#[tokio::test(start_paused = true)]
async fn provisions_a_fresh_account_end_to_end() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    let assembly = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();

    assert_eq!(assembly.id.as_str(), "demo");
    assert_eq!(assembly.worker_addresses.len(), 1);
    let summary = assembly.to_string();
    assert!(summary.contains("'demo'"));
    assert!(summary.contains(&assembly.bastion_address));
    assert!(summary.contains(&assembly.worker_addresses[0]));

    assert_eq!(
        std::fs::read_to_string(&key_path).unwrap(),
        FAKE_KEY_MATERIAL
    );

    let state = gateway.state.lock().unwrap();
    assert_eq!(state.clusters, vec!["demo".to_string()]);
    assert_eq!(state.vpcs.len(), 1);
    assert_eq!(state.vpcs[0].cidr, "10.2.2.0/26");
    assert_eq!(state.subnets.len(), 2);
    assert_eq!(state.groups.len(), 2);
    assert_eq!(state.roles.len(), 1);
    assert!(state.roles[0].trust_policy.contains("sts:AssumeRole"));
    assert_eq!(state.profiles.len(), 1);
    assert_eq!(state.profiles[0].role_names, vec!["demo-ecs".to_string()]);
    assert_eq!(state.key_pairs, vec!["demo".to_string()]);
    assert_eq!(state.internet_gateways.len(), 1);

    // the public side sits in the lexicographically first zone
    let public_subnet = state
        .subnets
        .iter()
        .find(|subnet| subnet.zone == "us-east-1a")
        .unwrap();
    let bastion = state
        .instances
        .iter()
        .find(|instance| instance.tags.contains(&Tag::access(AccessClass::Public)))
        .unwrap();
    assert_eq!(bastion.subnet_id, public_subnet.id);
    assert_eq!(bastion.state, InstanceState::Running);
    assert!(!bastion.source_dest_check);
    assert_eq!(bastion.public_address.as_deref(), Some(assembly.bastion_address.as_str()));
    assert!(bastion.tags.contains(&Tag::assembly(&demo())));

    // the worker went to the next zone, carries the profile and the
    // cluster bootstrap
    let worker_subnet = state
        .subnets
        .iter()
        .find(|subnet| subnet.zone == "us-east-1b")
        .unwrap();
    let worker = state
        .instances
        .iter()
        .find(|instance| instance.tags.contains(&Tag::access(AccessClass::Private)))
        .unwrap();
    assert_eq!(worker.subnet_id, worker_subnet.id);
    assert!(worker.public_address.is_none());
    assert_eq!(worker.profile_arn.as_deref(), Some(state.profiles[0].arn.as_str()));
    let bootstrap = BASE64.decode(worker.user_data.as_deref().unwrap()).unwrap();
    assert!(String::from_utf8(bootstrap).unwrap().contains("ECS_CLUSTER=demo"));

    // the newest hardware-virtualized images win; the newer paravirtual
    // NAT image must never be picked
    assert_eq!(bastion.image_id, "ami-nat-new");
    assert_eq!(worker.image_id, "ami-ecs-new");

    // public route table: default route to the gateway, one association
    // to the public subnet
    let public_table = state
        .route_tables
        .iter()
        .find(|table| table.tags.contains(&Tag::access(AccessClass::Public)))
        .unwrap();
    assert!(public_table.routes.iter().any(|route| {
        route.destination_cidr == "0.0.0.0/0"
            && route.gateway_id.as_deref() == Some(state.internet_gateways[0].id.as_str())
    }));
    assert!(public_table
        .associations
        .iter()
        .any(|assoc| assoc.subnet_id.as_deref() == Some(public_subnet.id.as_str())));

    // main route table now defaults through the bastion
    let main_table = state
        .route_tables
        .iter()
        .find(|table| table.main)
        .unwrap();
    assert!(main_table.routes.iter().any(|route| {
        route.destination_cidr == "0.0.0.0/0"
            && route.instance_id.as_deref() == Some(bastion.id.as_str())
    }));

    // the public group admits the caller, the private group only the
    // network itself
    let public_group = state
        .groups
        .iter()
        .find(|group| group.name == "public-access")
        .unwrap();
    assert!(public_group
        .rules
        .iter()
        .any(|rule| rule.cidr == format!("{CALLER_ADDRESS}/32") && rule.from_port == 22));
    assert!(public_group.rules.iter().any(|rule| rule.from_port == 80));
    assert!(public_group.rules.iter().any(|rule| rule.from_port == 443));
    let private_group = state
        .groups
        .iter()
        .find(|group| group.name == "private-access")
        .unwrap();
    assert_eq!(private_group.rules.len(), 1);
    assert_eq!(private_group.rules[0].cidr, "10.2.2.0/26");
    assert_eq!(private_group.rules[0].from_port, 22);
}

#[tokio::test(start_paused = true)]
async fn second_run_reuses_everything_and_creates_nothing() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    let first = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();
    let ids_after_first = resource_ids(&gateway);
    let calls_after_first = gateway.calls().len();

    let second = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();

    assert_eq!(gateway.creates_since(calls_after_first), 0);
    assert_eq!(resource_ids(&gateway), ids_after_first);
    assert_eq!(second.bastion_address, first.bastion_address);
    assert_eq!(second.worker_addresses, first.worker_addresses);
}

#[tokio::test(start_paused = true)]
async fn two_tagged_networks_fail_closed() {
    let gateway = FakeGateway::with_zones(&["us-east-1a"]);
    {
        let mut state = gateway.state.lock().unwrap();
        for id in ["vpc-pre1", "vpc-pre2"] {
            state.vpcs.push(FakeVpc {
                id: id.into(),
                cidr: "10.2.2.0/26".into(),
                tags: vec![Tag::assembly(&demo())],
            });
        }
    }
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    let error = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(error, CloudError::Conflict { kind: "vpc", .. }));
    let calls = gateway.calls();
    assert!(!calls.iter().any(|call| call == "create_vpc"));
    assert!(!calls.iter().any(|call| call.starts_with("delete_")));
    assert_eq!(gateway.state.lock().unwrap().vpcs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn tagged_network_with_other_cidr_fails_closed() {
    let gateway = FakeGateway::with_zones(&["us-east-1a"]);
    {
        let mut state = gateway.state.lock().unwrap();
        state.vpcs.push(FakeVpc {
            id: "vpc-pre1".into(),
            cidr: "10.9.0.0/16".into(),
            tags: vec![Tag::assembly(&demo())],
        });
    }
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    let error = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap_err();

    match error {
        CloudError::Conflict { kind, detail } => {
            assert_eq!(kind, "vpc");
            assert!(detail.contains("10.9.0.0/16"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert!(!gateway.calls().iter().any(|call| call == "create_vpc"));
}

#[tokio::test(start_paused = true)]
async fn duplicate_tagged_security_groups_fail_closed() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();

    // a stray second group under the same identity
    {
        let mut state = gateway.state.lock().unwrap();
        let vpc_id = state.vpcs[0].id.clone();
        state.groups.push(FakeSecurityGroup {
            id: "sg-stray".into(),
            name: "public-access".into(),
            vpc_id,
            rules: Vec::new(),
            tags: vec![
                Tag::assembly(&demo()),
                Tag::access(AccessClass::Public),
            ],
        });
    }
    let calls_before = gateway.calls().len();

    let error = Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CloudError::Conflict {
            kind: "security group",
            ..
        }
    ));
    assert_eq!(gateway.creates_since(calls_before), 0);
}

#[tokio::test(start_paused = true)]
async fn three_zones_map_to_the_first_three_blocks() {
    let gateway = FakeGateway::with_zones(&["eu-west-1a", "eu-west-1b", "eu-west-1c"]);
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();

    let mapping = |gateway: &FakeGateway| -> Vec<(String, String, String)> {
        let state = gateway.state.lock().unwrap();
        let mut pairs: Vec<_> = state
            .subnets
            .iter()
            .map(|subnet| (subnet.zone.clone(), subnet.cidr.clone(), subnet.id.clone()))
            .collect();
        pairs.sort();
        pairs
    };

    let first = mapping(&gateway);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].0, "eu-west-1a");
    assert_eq!(first[0].1, "10.2.2.0/28");
    assert_eq!(first[1].0, "eu-west-1b");
    assert_eq!(first[1].1, "10.2.2.16/28");
    assert_eq!(first[2].0, "eu-west-1c");
    assert_eq!(first[2].1, "10.2.2.32/28");

    // the mapping holds still across a re-run
    Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();
    assert_eq!(mapping(&gateway), first);
}

#[tokio::test(start_paused = true)]
async fn an_existing_key_pair_never_rewrites_local_material() {
    let gateway = FakeGateway::with_zones(&["us-east-1a", "us-east-1b"]);
    let discovery = FixedAddress::new(CALLER_ADDRESS);
    let (_dir, key_path) = key_dir();

    Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();
    assert!(key_path.exists());

    // the local half goes missing; the provider cannot hand the material
    // out again, so a re-run must not pretend otherwise
    std::fs::remove_file(&key_path).unwrap();
    let calls_before = gateway.calls().len();

    Provisioner::new(&gateway, &discovery, demo(), config(&key_path))
        .run()
        .await
        .unwrap();

    assert!(!key_path.exists());
    assert!(!gateway.calls()[calls_before..]
        .iter()
        .any(|call| call == "create_key_pair"));
}

struct UnreachableAddressService;

#[async_trait]
impl AddressDiscovery for UnreachableAddressService {
    async fn public_address(&self) -> Result<String> {
        Err(CloudError::AddressDiscovery(
            "connection refused".to_string(),
        ))
    }
}

#[tokio::test(start_paused = true)]
async fn address_discovery_failure_is_fatal_and_not_retried() {
    let gateway = FakeGateway::with_zones(&["us-east-1a"]);
    let (_dir, key_path) = key_dir();

    let error = Provisioner::new(
        &gateway,
        &UnreachableAddressService,
        demo(),
        config(&key_path),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(error, CloudError::AddressDiscovery(_)));
    // no group was created and nothing past that step ran
    let state = gateway.state.lock().unwrap();
    assert!(state.groups.is_empty());
    assert!(state.instances.is_empty());
}
