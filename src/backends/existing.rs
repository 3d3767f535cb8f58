//! Backend wrapping nodes that were provisioned elsewhere.

use anyhow::Result;

use crate::backends::{ClusterBackend, ProvisionedNodes, ValidationError};
use crate::cluster::ClusterOptions;
use crate::node::Node;

/// Adapts an already-running cluster into the [`ClusterBackend`] lifecycle.
///
/// The wrapper performs no provisioning and no teardown: the caller owns the
/// machines, so any option implying otherwise — destroy flags, an installer
/// artifact, files for an installer — is rejected up front, as is a node
/// count that disagrees with what actually exists.
pub struct ExistingCluster {
    masters: Vec<Node>,
    agents: Vec<Node>,
    public_agents: Vec<Node>,
}

impl ExistingCluster {
    #[must_use]
    pub fn new(masters: Vec<Node>, agents: Vec<Node>, public_agents: Vec<Node>) -> Self {
        Self {
            masters,
            agents,
            public_agents,
        }
    }
}

impl ClusterBackend for ExistingCluster {
    // Flag and artifact conflicts are checked before node counts: they must
    // fire regardless of whether the counts happen to match.
    fn validate(&self, options: &ClusterOptions) -> Result<(), ValidationError> {
        if options.destroy_on_error {
            return Err(ValidationError::DestroyOnError);
        }
        if options.destroy_on_success {
            return Err(ValidationError::DestroyOnSuccess);
        }
        if options.installer_path.is_some() {
            return Err(ValidationError::InstallerArtifact);
        }
        if !options.files_to_copy_to_installer.is_empty() {
            return Err(ValidationError::InstallerFiles);
        }
        if options.masters != self.masters.len() {
            return Err(ValidationError::MasterCount {
                actual: self.masters.len(),
            });
        }
        if options.agents != self.agents.len() {
            return Err(ValidationError::AgentCount {
                actual: self.agents.len(),
            });
        }
        if options.public_agents != self.public_agents.len() {
            return Err(ValidationError::PublicAgentCount {
                actual: self.public_agents.len(),
            });
        }
        Ok(())
    }

    fn provision(&self, _options: &ClusterOptions) -> Result<ProvisionedNodes> {
        Ok(ProvisionedNodes {
            masters: self.masters.clone(),
            agents: self.agents.clone(),
            public_agents: self.public_agents.clone(),
        })
    }

    fn destroy(&self, _nodes: ProvisionedNodes) -> Result<()> {
        anyhow::bail!("Destruction of an existing cluster must be handled by the caller.")
    }

    fn supports_destruction(&self) -> bool {
        false
    }
}
