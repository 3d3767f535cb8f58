//! A single addressable cluster host, reachable over SSH.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::process::{CommandRunner, CompletedProcess, ProcessRunner, RunError};

/// A record of one cluster node.
///
/// Nodes are immutable value objects, constructed by a cluster backend once
/// a host is provisioned. The key path is held privately; it must reference
/// a key authorized for `root` on the host — that is not checked locally,
/// and a bad key surfaces as a non-zero exit from the SSH client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    ip_address: Ipv4Addr,
    ssh_key_path: PathBuf,
}

impl Node {
    #[must_use]
    pub fn new(ip_address: Ipv4Addr, ssh_key_path: impl Into<PathBuf>) -> Self {
        Self {
            ip_address,
            ssh_key_path: ssh_key_path.into(),
        }
    }

    #[must_use]
    pub fn ip_address(&self) -> Ipv4Addr {
        self.ip_address
    }

    /// The full SSH invocation for running `command` on this node as `root`.
    ///
    /// The flag set is a stable contract: test clusters are ephemeral, so
    /// host keys are not checked, and authentication is public-key only so
    /// a missing key can never hang on a password prompt.
    #[must_use]
    pub fn ssh_args(&self, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "ssh".to_owned(),
            "-q".to_owned(),
            "-o".to_owned(),
            "StrictHostKeyChecking=no".to_owned(),
            "-i".to_owned(),
            self.ssh_key_path.display().to_string(),
            "-l".to_owned(),
            "root".to_owned(),
            "-o".to_owned(),
            "PreferredAuthentications=publickey".to_owned(),
            self.ip_address.to_string(),
        ];
        args.extend(command.iter().map(|&part| part.to_owned()));
        args
    }

    /// Run a command on this node as `root`.
    ///
    /// Opens a connection to the node; no local state is mutated. Output is
    /// streamed to the default tracing sink while the command runs.
    ///
    /// # Errors
    ///
    /// Propagates [`RunError`] verbatim from the runner: [`RunError::Exited`]
    /// when the remote command (or the SSH client itself) exits non-zero.
    pub fn run_as_root(&self, command: &[&str]) -> Result<CompletedProcess, RunError> {
        self.run_as_root_with(&ProcessRunner::new(), command)
    }

    /// [`Node::run_as_root`] with an injected runner.
    ///
    /// # Errors
    ///
    /// See [`Node::run_as_root`].
    pub fn run_as_root_with<R: CommandRunner>(
        &self,
        runner: &R,
        command: &[&str],
    ) -> Result<CompletedProcess, RunError> {
        let args = self.ssh_args(command);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        runner.run(&args, None)
    }
}
