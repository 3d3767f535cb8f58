//! Cluster backends — the seam between the harness and whatever actually
//! owns the machines.
//!
//! A backend turns [`ClusterOptions`](crate::cluster::ClusterOptions) into
//! provisioned node lists and, where supported, tears them down again.
//! Provisioning implementations (container platforms, cloud APIs) plug in
//! behind [`ClusterBackend`]; this crate ships [`ExistingCluster`], which
//! adapts nodes that were provisioned elsewhere.

use anyhow::Result;
use thiserror::Error;

use crate::cluster::ClusterOptions;
use crate::node::Node;

mod existing;

pub use existing::ExistingCluster;

/// Options rejected at construction time, before any provisioning happens.
///
/// The message wording is a stable contract observed by downstream test
/// suites — change it and their assertions break.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "Destruction of an existing cluster must be handled by the caller. \
         Therefore 'destroy_on_error' must be set to 'false'."
    )]
    DestroyOnError,

    #[error(
        "Destruction of an existing cluster must be handled by the caller. \
         Therefore 'destroy_on_success' must be set to 'false'."
    )]
    DestroyOnSuccess,

    #[error("An existing cluster already has the platform installed. Therefore 'installer_path' must not be set.")]
    InstallerArtifact,

    #[error("Files cannot be copied to the installer of an existing cluster. Therefore 'files_to_copy_to_installer' must be empty.")]
    InstallerFiles,

    #[error("The number of master nodes is '{actual}'. Therefore 'masters' must be set to '{actual}'.")]
    MasterCount { actual: usize },

    #[error("The number of agent nodes is '{actual}'. Therefore 'agents' must be set to '{actual}'.")]
    AgentCount { actual: usize },

    #[error("The number of public agent nodes is '{actual}'. Therefore 'public_agents' must be set to '{actual}'.")]
    PublicAgentCount { actual: usize },
}

/// The node lists a backend hands over once provisioning is complete.
#[derive(Debug, Clone, Default)]
pub struct ProvisionedNodes {
    pub masters: Vec<Node>,
    pub agents: Vec<Node>,
    pub public_agents: Vec<Node>,
}

/// One way of obtaining (and disposing of) a cluster's machines.
pub trait ClusterBackend {
    /// Check `options` against this backend.
    ///
    /// Runs synchronously at cluster construction, before provisioning; a
    /// rejection is fatal to the construction attempt and no partial
    /// cluster is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the conflicting option.
    fn validate(&self, _options: &ClusterOptions) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Bring up (or hand over) the requested nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the machines cannot be provided.
    fn provision(&self, options: &ClusterOptions) -> Result<ProvisionedNodes>;

    /// Tear the nodes down.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails or the backend does not own the
    /// machines.
    fn destroy(&self, nodes: ProvisionedNodes) -> Result<()>;

    /// Whether this backend can destroy what it provisioned. Scoped cluster
    /// lifecycles skip automatic teardown when this is `false`.
    fn supports_destruction(&self) -> bool;
}
