//! End-to-end test harness for distributed cluster deployments.
//!
//! Provisions cluster nodes through a pluggable [`backends::ClusterBackend`],
//! runs commands on them as `root` over SSH ([`node::Node`]), and streams
//! subprocess output into structured logging while capturing it for
//! assertions ([`process::ProcessRunner`]).

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod backends;
pub mod cluster;
pub mod node;
pub mod process;
