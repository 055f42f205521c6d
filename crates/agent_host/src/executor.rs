//! Shell command execution for favorites and chat-suggested commands.
//!
//! [`ExecutionChannel`] is the seam between the UI and wherever commands
//! actually run. [`LocalExecutor`] spawns a shell on this machine; the
//! remote variant lives in [`crate::remote`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::events::ExecEvent;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Receives stream events as they happen.
pub type EventSink = UnboundedSender<ExecEvent>;

/// Result of a run-to-completion execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    /// stdout, then stderr and the exit code when relevant
    pub output: String,
}

/// Something that can run a shell command.
#[async_trait]
pub trait ExecutionChannel: Send + Sync {
    /// Run to completion and return the combined output.
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<RunOutcome>;

    /// Send zero or more `Output` events followed by exactly one `Done` or
    /// `Error` into `sink`. An `Err` return means no terminal event was sent.
    async fn stream(&self, command: &str, cwd: Option<&Path>, sink: &EventSink) -> Result<()>;

    /// Whether commands can be sent right now. A local shell always can.
    async fn health(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Merge captured streams the way the command server reports them.
pub fn combine_output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let mut combined = stdout.to_string();
    if !stderr.is_empty() {
        combined.push_str("\nSTDERR:\n");
        combined.push_str(stderr);
    }
    match exit_code {
        Some(0) => {}
        Some(code) => combined.push_str(&format!("\nExit Code: {}", code)),
        None => combined.push_str("\nExit Code: terminated by signal"),
    }
    combined.trim().to_string()
}

/// Runs commands through the platform shell on this machine.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    timeout: Duration,
}

impl LocalExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn shell_command(command: &str, cwd: Option<&Path>) -> Command {
        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn timeout_message(&self) -> String {
        format!("Command timed out after {} seconds", self.timeout.as_secs())
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl ExecutionChannel for LocalExecutor {
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<RunOutcome> {
        let output = tokio::time::timeout(
            self.timeout,
            Self::shell_command(command, cwd).output(),
        )
        .await;

        match output {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                Ok(RunOutcome {
                    success: output.status.success(),
                    output: combine_output(&stdout, &stderr, output.status.code()),
                })
            }
            Ok(Err(e)) => Err(e).with_context(|| format!("Failed to execute `{}`", command)),
            Err(_) => Ok(RunOutcome {
                success: false,
                output: self.timeout_message(),
            }),
        }
    }

    async fn stream(&self, command: &str, cwd: Option<&Path>, sink: &EventSink) -> Result<()> {
        let mut child = Self::shell_command(command, cwd)
            .spawn()
            .with_context(|| format!("Failed to start `{}`", command))?;
        let stdout = child.stdout.take().context("stdout was not captured")?;
        let stderr = child.stderr.take().context("stderr was not captured")?;

        let work = async {
            let (out, err) = tokio::join!(pump(stdout, false, sink), pump(stderr, true, sink));
            out?;
            err?;
            child.wait().await.context("Failed to wait for command")
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(status)) => {
                // Killed by a signal has no code
                let exit_code = status.code().unwrap_or(-1);
                debug!(command, exit_code, "local stream finished");
                let _ = sink.send(ExecEvent::Done { exit_code });
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let _ = sink.send(ExecEvent::error(self.timeout_message()));
                Ok(())
            }
        }
    }
}

/// Forward a pipe line by line, newline included.
async fn pump<R: AsyncRead + Unpin>(reader: R, is_error: bool, sink: &EventSink) -> Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .await
            .context("Failed to read command output")?;
        if n == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line).into_owned();
        // A closed sink means the subscriber went away; keep draining the pipe
        let _ = sink.send(ExecEvent::Output { text, is_error });
    }
}
