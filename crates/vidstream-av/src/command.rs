//! Builder for running an external encoder with timeout and cancellation.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::error::FailureCause;

/// Default command timeout: 1 hour.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// A builder for constructing and running an external tool invocation.
///
/// Arguments are passed as a vector, never through a shell. The child's
/// stdout and stderr are inherited so encoder progress lands in the service
/// log, and the child is killed if the running future is dropped.
///
/// # Example
///
/// ```no_run
/// use vidstream_av::ToolCommand;
/// use tokio_util::sync::CancellationToken;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), vidstream_av::FailureCause> {
/// ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-version")
///     .run(&CancellationToken::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The argument vector, excluding the program.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command to completion.
    ///
    /// Succeeds only on a zero exit status. On cancellation or timeout the
    /// child is killed and reaped before returning.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), FailureCause> {
        let program = self.program_name();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FailureCause::Spawn {
                program: program.clone(),
                source,
            })?;

        tracing::debug!(program = %program, pid = ?child.id(), "Process started");

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(Ok(status)) if status.success() => Ok(()),
            Outcome::Exited(Ok(status)) => Err(FailureCause::Exit { program, status }),
            Outcome::Exited(Err(source)) => Err(FailureCause::Wait { program, source }),
            Outcome::Cancelled => {
                terminate(&mut child, &program).await;
                Err(FailureCause::Cancelled)
            }
            Outcome::TimedOut => {
                terminate(&mut child, &program).await;
                Err(FailureCause::TimedOut(self.timeout))
            }
        }
    }
}

async fn terminate(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!(program = %program, error = %e, "Failed to kill process");
    }
}
