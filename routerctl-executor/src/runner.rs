//! Command runner abstraction.
//!
//! Services describe what to run as a [`CommandSpec`] and never touch
//! processes directly, so the host runner can be swapped for a scripted one
//! in tests.

use async_trait::async_trait;

use crate::{CommandOutput, CommandSpec, ExecutorError};

/// Runs one external program to completion.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Cancel Safety
/// Implementations must not leave a child process behind when the future is
/// dropped.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` and capture its output. A non-zero exit is reported through
    /// [`CommandOutput::success`], not as an error.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SpawnFailed`] if the program cannot start,
    /// [`ExecutorError::TimedOut`] if it outlives the time limit, and
    /// [`ExecutorError::OutputTooLarge`] if it writes past the output cap.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutorError>;
}

