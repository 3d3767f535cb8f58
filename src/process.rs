//! Local subprocess execution with live output streaming.
//!
//! Everything the harness runs, the SSH client included, goes through
//! [`ProcessRunner::run`]: the child's stderr is redirected into stdout at
//! the file-descriptor level, the merged stream is read line by line as it
//! becomes available, and every line is both handed to an [`OutputSink`]
//! and accumulated so the final result carries the child's output
//! byte-for-byte in emission order.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// The finished state of a successfully exited subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedProcess {
    /// The command vector that was executed.
    pub args: Vec<String>,
    /// The child's exit code. Zero on this type; failures are [`RunError::Exited`].
    pub exit_code: i32,
    /// Combined stdout and stderr, interleaved exactly as the child emitted it.
    pub stdout: Vec<u8>,
    /// Always empty: stderr is redirected into stdout at spawn time.
    pub stderr: Vec<u8>,
}

/// Errors from [`ProcessRunner::run`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot run an empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O failure while reading the merged output stream. The child is
    /// killed and reaped before this is returned.
    #[error("failed while reading output of {args:?}")]
    Stream {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    /// The child exited non-zero. Carries the full accumulated output.
    #[error("command {args:?} exited with code {exit_code}")]
    Exited {
        args: Vec<String>,
        exit_code: i32,
        output: Vec<u8>,
    },
}

/// Receives one call per line of subprocess output, as it is read.
///
/// The runner takes the sink as an explicit dependency instead of logging
/// through a process-wide singleton, so streaming behavior is testable in
/// isolation.
pub trait OutputSink {
    /// Record one output line. `line` includes its terminator, except
    /// possibly for the final line before EOF.
    fn record(&self, line: &[u8]);
}

/// Production sink: one `tracing` DEBUG event per line, under this module's
/// target (`cluster_e2e::process`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn record(&self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        tracing::debug!("{}", line.trim_end_matches(['\r', '\n']));
    }
}

/// Accumulating sink for tests and callers that inspect streamed lines.
///
/// Cloning shares the underlying buffer, so a clone handed to a runner can
/// be read from the original handle afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<Vec<u8>> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutputSink for MemorySink {
    fn record(&self, line: &[u8]) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(line.to_vec()),
        }
    }
}

/// Command execution seam, enabling test doubles that record invocations
/// without spawning real processes.
pub trait CommandRunner {
    /// Run `args` to completion, streaming and accumulating its output.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Exited`] if the command exits non-zero, and the
    /// other [`RunError`] variants for spawn or stream failures.
    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<CompletedProcess, RunError>;
}

/// Production [`CommandRunner`] — spawns real subprocesses.
pub struct ProcessRunner<S: OutputSink = TracingSink> {
    sink: S,
}

impl ProcessRunner<TracingSink> {
    #[must_use]
    pub fn new() -> Self {
        Self { sink: TracingSink }
    }
}

impl Default for ProcessRunner<TracingSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> ProcessRunner<S> {
    /// Create a runner with an injected sink (used in tests).
    #[must_use]
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: OutputSink> CommandRunner for ProcessRunner<S> {
    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<CompletedProcess, RunError> {
        let (&program, rest) = args.split_first().ok_or(RunError::EmptyCommand)?;
        let args: Vec<String> = args.iter().map(|&a| a.to_owned()).collect();

        let mut expression = duct::cmd(program, rest.iter().copied())
            .stderr_to_stdout()
            .unchecked();
        if let Some(dir) = cwd {
            expression = expression.dir(dir);
        }

        // Reading through the handle instead of waiting for completion keeps
        // long-running commands observable line by line. Dropping the handle
        // before EOF kills and reaps the child, so any abnormal exit from the
        // loop below (stream error, panic, early return) leaves no process
        // behind.
        let reader = expression.reader().map_err(|source| RunError::Spawn {
            program: program.to_owned(),
            source,
        })?;
        let mut buffered = BufReader::new(reader);

        let mut output = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = buffered
                .read_until(b'\n', &mut line)
                .map_err(|source| RunError::Stream {
                    args: args.clone(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            self.sink.record(&line);
            output.extend_from_slice(&line);
        }

        // EOF reaps the child, so the status is available here.
        let reader = buffered.into_inner();
        let status = reader
            .try_wait()
            .map_err(|source| RunError::Stream {
                args: args.clone(),
                source,
            })?
            .map(|finished| finished.status)
            .ok_or_else(|| RunError::Stream {
                args: args.clone(),
                source: std::io::Error::other("child closed its output but did not exit"),
            })?;

        let exit_code = exit_code(status);
        if exit_code != 0 {
            return Err(RunError::Exited {
                args,
                exit_code,
                output,
            });
        }
        Ok(CompletedProcess {
            args,
            exit_code,
            stdout: output,
            stderr: Vec::new(),
        })
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    // Signal-terminated children report the negative signal number.
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
