//! Cluster lifecycle, independent of any particular backend.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::backends::{ClusterBackend, ProvisionedNodes};
use crate::node::Node;
use crate::process::{CommandRunner, CompletedProcess, ProcessRunner};

/// Construction parameters for a [`Cluster`].
///
/// The defaults describe the common test topology: one node per role, no
/// installer artifact, and teardown on both exits, so an abandoned test
/// cluster is destroyed unless the caller opts out.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub masters: usize,
    pub agents: usize,
    pub public_agents: usize,
    /// Path to an installation artifact for backends that install the
    /// platform as part of provisioning.
    pub installer_path: Option<PathBuf>,
    /// `(local, remote)` pairs copied to the installer node before
    /// installation begins.
    pub files_to_copy_to_installer: Vec<(PathBuf, PathBuf)>,
    pub destroy_on_error: bool,
    pub destroy_on_success: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            masters: 1,
            agents: 1,
            public_agents: 1,
            installer_path: None,
            files_to_copy_to_installer: Vec::new(),
            destroy_on_error: true,
            destroy_on_success: true,
        }
    }
}

/// A running cluster: provisioned node lists plus the backend that owns them.
pub struct Cluster<B: ClusterBackend> {
    backend: B,
    masters: Vec<Node>,
    agents: Vec<Node>,
    public_agents: Vec<Node>,
}

impl<B: ClusterBackend> Cluster<B> {
    /// Validate `options` against the backend, then provision.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ValidationError`](crate::backends::ValidationError)
    /// if the options conflict with the backend's state, or the provisioning
    /// error. Either way no partial cluster is returned.
    pub fn new(backend: B, options: &ClusterOptions) -> Result<Self> {
        backend.validate(options)?;
        let nodes = backend.provision(options).context("provisioning cluster")?;
        Ok(Self {
            backend,
            masters: nodes.masters,
            agents: nodes.agents,
            public_agents: nodes.public_agents,
        })
    }

    /// Run `f` against a freshly provisioned cluster, then tear it down
    /// according to `options`.
    ///
    /// On success, the cluster is destroyed when `destroy_on_success` is set
    /// and a teardown failure surfaces. On error, the cluster is destroyed
    /// when `destroy_on_error` is set, and the original error always wins:
    /// a teardown failure on that path is logged, not returned. Backends
    /// that do not support destruction are left alone on both paths.
    ///
    /// # Errors
    ///
    /// Construction errors from [`Cluster::new`], the error returned by `f`,
    /// or a success-path teardown failure.
    pub fn with<T>(
        backend: B,
        options: &ClusterOptions,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let cluster = Self::new(backend, options)?;
        match f(&cluster) {
            Ok(value) => {
                if options.destroy_on_success && cluster.backend.supports_destruction() {
                    cluster.destroy().context("destroying cluster after success")?;
                }
                Ok(value)
            }
            Err(error) => {
                if options.destroy_on_error && cluster.backend.supports_destruction() {
                    if let Err(teardown) = cluster.destroy() {
                        tracing::warn!("cluster teardown failed after error: {teardown:#}");
                    }
                }
                Err(error)
            }
        }
    }

    #[must_use]
    pub fn masters(&self) -> &[Node] {
        &self.masters
    }

    #[must_use]
    pub fn agents(&self) -> &[Node] {
        &self.agents
    }

    #[must_use]
    pub fn public_agents(&self) -> &[Node] {
        &self.public_agents
    }

    /// Destroy all nodes in the cluster through the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's teardown error; backends wrapping machines they
    /// do not own refuse outright.
    pub fn destroy(self) -> Result<()> {
        let Self {
            backend,
            masters,
            agents,
            public_agents,
        } = self;
        backend.destroy(ProvisionedNodes {
            masters,
            agents,
            public_agents,
        })
    }

    /// Run the platform's integration test command on a master node.
    ///
    /// The command executes as `root` with `MASTER_HOSTS`, `SLAVE_HOSTS` and
    /// `PUBLIC_SLAVE_HOSTS` set to comma-joined node addresses, which is the
    /// environment the platform's own test suite expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster has no masters, or the remote
    /// command's failure.
    pub fn run_integration_tests(&self, command: &[&str]) -> Result<CompletedProcess> {
        self.run_integration_tests_with(&ProcessRunner::new(), command)
    }

    /// [`Cluster::run_integration_tests`] with an injected runner.
    ///
    /// # Errors
    ///
    /// See [`Cluster::run_integration_tests`].
    pub fn run_integration_tests_with<R: CommandRunner>(
        &self,
        runner: &R,
        command: &[&str],
    ) -> Result<CompletedProcess> {
        let master = self
            .masters
            .first()
            .context("the cluster has no master nodes to run integration tests on")?;

        let environment = [
            format!("MASTER_HOSTS={}", join_addresses(&self.masters)),
            format!("SLAVE_HOSTS={}", join_addresses(&self.agents)),
            format!("PUBLIC_SLAVE_HOSTS={}", join_addresses(&self.public_agents)),
        ];
        let mut remote_command: Vec<&str> = environment.iter().map(String::as_str).collect();
        remote_command.extend_from_slice(command);

        master
            .run_as_root_with(runner, &remote_command)
            .context("integration test command failed")
    }
}

fn join_addresses(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|node| node.ip_address().to_string())
        .collect::<Vec<_>>()
        .join(",")
}
