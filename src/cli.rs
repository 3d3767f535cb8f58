//! CLI argument parsing with clap derive

use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use cluster_e2e::node::Node;
use cluster_e2e::process::RunError;

/// Run commands on distributed cluster nodes over SSH
#[derive(Parser)]
#[command(
    name = "cluster-e2e",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a command as root on a cluster node
    Exec(ExecArgs),
}

/// Arguments for the exec command.
#[derive(Args)]
#[command(trailing_var_arg = true)]
pub struct ExecArgs {
    /// IPv4 address of the target node
    #[arg(long)]
    pub node: Ipv4Addr,

    /// SSH private key authorized for the root user on the node
    #[arg(long, value_name = "PATH")]
    pub ssh_key: PathBuf,

    /// Command and arguments to run on the node
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error for spawn or stream failures; a remote non-zero
    /// exit is reported through the returned exit code instead.
    pub fn run(self) -> Result<ExitCode> {
        match self.command {
            Command::Exec(args) => exec(&args, self.json),
        }
    }
}

fn exec(args: &ExecArgs, json: bool) -> Result<ExitCode> {
    let node = Node::new(args.node, &args.ssh_key);
    let command: Vec<&str> = args.command.iter().map(String::as_str).collect();

    match node.run_as_root(&command) {
        Ok(result) => {
            if json {
                let object = serde_json::json!({
                    "args": result.args,
                    "exit_code": result.exit_code,
                    "output": String::from_utf8_lossy(&result.stdout),
                });
                println!("{}", serde_json::to_string_pretty(&object).context("JSON serialization failed")?);
            } else {
                std::io::stdout()
                    .write_all(&result.stdout)
                    .context("writing command output")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(RunError::Exited {
            exit_code, output, ..
        }) => {
            if json {
                let object = serde_json::json!({
                    "error": true,
                    "message": format!("command exited with code {exit_code}"),
                    "exit_code": exit_code,
                    "output": String::from_utf8_lossy(&output),
                });
                println!("{}", serde_json::to_string_pretty(&object).context("JSON serialization failed")?);
            } else {
                std::io::stdout()
                    .write_all(&output)
                    .context("writing command output")?;
                eprintln!("Error: command exited with code {exit_code}");
            }
            Ok(ExitCode::from(u8::try_from(exit_code).unwrap_or(1)))
        }
        Err(error) => Err(error).context("running command on node"),
    }
}
