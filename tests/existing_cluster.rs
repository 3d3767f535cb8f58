//! Tests for wrapping an already-provisioned cluster with [`ExistingCluster`].

#![allow(clippy::expect_used)]

use std::net::Ipv4Addr;

use anyhow::Result;
use cluster_e2e::backends::{ClusterBackend, ExistingCluster, ProvisionedNodes};
use cluster_e2e::cluster::{Cluster, ClusterOptions};
use cluster_e2e::node::Node;

/// In-memory provisioning backend standing in for a real one; the
/// provisioning path itself is out of scope here, the lifecycle is not.
#[derive(Clone, Default)]
struct FakeProvisioner;

impl ClusterBackend for FakeProvisioner {
    fn provision(&self, options: &ClusterOptions) -> Result<ProvisionedNodes> {
        let role = |count: usize, subnet: u8| {
            (0..count)
                .map(|host| {
                    let host = u8::try_from(host + 1).unwrap_or(u8::MAX);
                    Node::new(Ipv4Addr::new(10, 10, subnet, host), "/tmp/cluster_key")
                })
                .collect()
        };
        Ok(ProvisionedNodes {
            masters: role(options.masters, 1),
            agents: role(options.agents, 2),
            public_agents: role(options.public_agents, 3),
        })
    }

    fn destroy(&self, _nodes: ProvisionedNodes) -> Result<()> {
        Ok(())
    }

    fn supports_destruction(&self) -> bool {
        true
    }
}

fn provisioned_cluster() -> Cluster<FakeProvisioner> {
    let options = ClusterOptions {
        destroy_on_error: false,
        destroy_on_success: false,
        ..ClusterOptions::default()
    };
    Cluster::new(FakeProvisioner::default(), &options).expect("fake provisioning succeeds")
}

fn caller_managed(masters: usize, agents: usize, public_agents: usize) -> ClusterOptions {
    ClusterOptions {
        masters,
        agents,
        public_agents,
        destroy_on_error: false,
        destroy_on_success: false,
        ..ClusterOptions::default()
    }
}

#[test]
fn test_wrapping_an_existing_cluster_preserves_its_nodes() {
    let cluster = provisioned_cluster();

    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );
    let duplicate =
        Cluster::new(backend, &caller_managed(1, 1, 1)).expect("wrapping matching nodes succeeds");

    assert_eq!(duplicate.masters(), cluster.masters());
    assert_eq!(duplicate.agents(), cluster.agents());
    assert_eq!(duplicate.public_agents(), cluster.public_agents());
}

#[test]
fn test_mismatched_masters_are_rejected_with_the_contract_message() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    let error = Cluster::new(backend, &caller_managed(3, 1, 1))
        .err()
        .expect("mismatched master count is fatal");
    assert_eq!(
        error.to_string(),
        "The number of master nodes is '1'. Therefore 'masters' must be set to '1'."
    );
}

#[test]
fn test_mismatched_agents_are_rejected_with_the_contract_message() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    let error = Cluster::new(backend, &caller_managed(1, 2, 1))
        .err()
        .expect("mismatched agent count is fatal");
    assert_eq!(
        error.to_string(),
        "The number of agent nodes is '1'. Therefore 'agents' must be set to '1'."
    );
}

#[test]
fn test_mismatched_public_agents_are_rejected_with_the_contract_message() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    let error = Cluster::new(backend, &caller_managed(1, 1, 0))
        .err()
        .expect("mismatched public agent count is fatal");
    assert_eq!(
        error.to_string(),
        "The number of public agent nodes is '1'. Therefore 'public_agents' must be set to '1'."
    );
}

#[test]
fn test_destroy_on_error_is_always_rejected() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    let options = ClusterOptions {
        destroy_on_error: true,
        ..caller_managed(1, 1, 1)
    };
    let error = Cluster::new(backend, &options)
        .err()
        .expect("destroy_on_error conflicts with caller-owned machines");
    assert_eq!(
        error.to_string(),
        "Destruction of an existing cluster must be handled by the caller. \
         Therefore 'destroy_on_error' must be set to 'false'."
    );
}

#[test]
fn test_destroy_on_success_is_always_rejected() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    // Wrong counts as well: the flag check must win.
    let options = ClusterOptions {
        destroy_on_success: true,
        ..caller_managed(5, 5, 5)
    };
    let error = Cluster::new(backend, &options)
        .err()
        .expect("destroy_on_success conflicts with caller-owned machines");
    assert_eq!(
        error.to_string(),
        "Destruction of an existing cluster must be handled by the caller. \
         Therefore 'destroy_on_success' must be set to 'false'."
    );
}

#[test]
fn test_installer_artifact_is_always_rejected() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    let options = ClusterOptions {
        installer_path: Some("/artifacts/platform_installer.sh".into()),
        ..caller_managed(2, 2, 2) // counts wrong too; the artifact check wins
    };
    let error = Cluster::new(backend, &options)
        .err()
        .expect("an installer artifact conflicts with an installed cluster");
    assert_eq!(
        error.to_string(),
        "An existing cluster already has the platform installed. Therefore 'installer_path' must not be set."
    );
}

#[test]
fn test_wrapped_cluster_scoped_run_skips_teardown() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );

    // If the scoped run attempted teardown the backend would refuse and the
    // run would fail; caller-owned machines are skipped instead.
    let result: Result<()> = Cluster::with(backend, &caller_managed(1, 1, 1), |wrapped| {
        assert_eq!(wrapped.masters().len(), 1);
        Ok(())
    });
    result.expect("scoped run over a wrapped cluster succeeds");
}

#[test]
fn test_explicit_destroy_of_a_wrapped_cluster_is_refused() {
    let cluster = provisioned_cluster();
    let backend = ExistingCluster::new(
        cluster.masters().to_vec(),
        cluster.agents().to_vec(),
        cluster.public_agents().to_vec(),
    );
    let wrapped = Cluster::new(backend, &caller_managed(1, 1, 1)).expect("wrapping succeeds");

    let error = wrapped
        .destroy()
        .expect_err("the harness never destroys caller-owned machines");
    assert_eq!(
        error.to_string(),
        "Destruction of an existing cluster must be handled by the caller."
    );
}
