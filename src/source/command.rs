use std::{path::Path, process::Stdio, time::Duration};

use tokio::process::Command;
use tracing::{debug, instrument, trace};

use super::SourceError;

/// Runs external tools with an upper bound on how long a single invocation may take. A child that
/// outlives the timeout is killed when its future is dropped.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Runs `program` with `args` and returns its stdout. A non-zero exit status is an error.
    #[instrument(skip(self, args), fields(args = ?args))]
    pub async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<String, SourceError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let rendered = display_command(program, args);
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(SourceError::Spawn {
                    program: program.to_string(),
                    source,
                });
            }
            Err(_) => {
                debug!("{rendered} timed out");
                return Err(SourceError::Timeout {
                    command: rendered,
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(SourceError::CommandFailed {
                command: rendered,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{rendered} returned {} bytes", stdout.len());
        Ok(stdout)
    }
}

fn display_command(program: &str, args: &[&str]) -> String {
    let mut display = program.to_string();
    for arg in args {
        display.push(' ');
        // graphql queries span many lines, only their first line is useful in logs
        display.push_str(arg.lines().next().unwrap_or_default());
    }
    display
}
