//! [`CommandRunner`] backed by real child processes.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

use crate::{CommandOutput, CommandRunner, CommandSpec, ExecLimits, ExecutorError};

/// Locale forced on every child so tool output stays parseable.
const CHILD_LANG: &str = "en_US.UTF-8";

/// Spawns programs on the host with a time limit and an output cap.
///
/// # Cancel Safety
/// Cancel safe. The child is spawned with `kill_on_drop`, so dropping the
/// future kills it.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    limits: ExecLimits,
}

impl SystemRunner {
    #[must_use]
    pub fn new(limits: ExecLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &ExecLimits {
        &self.limits
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutorError> {
        let command_line = spec.to_string();
        let limit = self.limits.max_output_bytes;
        tracing::info!(command = %command_line, "executing command");

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .env("LANG", CHILD_LANG)
            .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::SpawnFailed {
                program: spec.program.clone(),
                reason: e.to_string(),
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| ExecutorError::SpawnFailed {
            program: spec.program.clone(),
            reason: "stdout not piped".to_owned(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExecutorError::SpawnFailed {
            program: spec.program.clone(),
            reason: "stderr not piped".to_owned(),
        })?;

        let finished = tokio::time::timeout(self.limits.timeout, async {
            let ((), stdout, stderr) = tokio::try_join!(
                feed_stdin(stdin, spec.stdin.as_deref()),
                read_capped(stdout, limit, &command_line),
                read_capped(stderr, limit, &command_line),
            )?;
            let status = child.wait().await?;
            Ok::<_, ExecutorError>((status, stdout, stderr))
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                // Already exited or already killed; nothing else to do.
                let _ = child.start_kill();
                tracing::error!(command = %command_line, error = %e, "command aborted");
                return Err(e);
            }
            Err(_) => {
                let _ = child.start_kill();
                tracing::error!(command = %command_line, "command timed out");
                return Err(ExecutorError::TimedOut {
                    command: command_line,
                    secs: self.limits.timeout.as_secs(),
                });
            }
        };

        if !stderr.trim().is_empty() {
            tracing::warn!(command = %command_line, stderr = %stderr.trim_end(), "command wrote to stderr");
        }
        if !status.success() {
            tracing::error!(command = %command_line, exit_code = ?status.code(), "command failed");
        }

        Ok(CommandOutput { success: status.success(), exit_code: status.code(), stdout, stderr })
    }
}

/// Write `input` and close the pipe. A child that exits without reading its
/// input is not an error here; its exit status tells the story.
async fn feed_stdin(pipe: Option<ChildStdin>, input: Option<&str>) -> Result<(), ExecutorError> {
    let (Some(mut pipe), Some(input)) = (pipe, input) else {
        return Ok(());
    };
    match pipe.write_all(input.as_bytes()).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
        Err(e) => return Err(e.into()),
    }
    match pipe.shutdown().await {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

async fn read_capped<R>(reader: R, limit: usize, command: &str) -> Result<String, ExecutorError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(cap).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(ExecutorError::OutputTooLarge { command: command.to_owned(), limit });
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
