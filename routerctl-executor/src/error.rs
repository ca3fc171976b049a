//! Error types for the executor crate.

use routerctl_core::CoreError;

/// Errors raised while running a single external program.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to start '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The program was still running when the time limit expired.
    #[error("'{command}' did not finish within {secs}s")]
    TimedOut { command: String, secs: u64 },

    /// The program wrote more than the output cap to stdout or stderr.
    #[error("'{command}' produced more than {limit} bytes of output")]
    OutputTooLarge { command: String, limit: usize },

    /// Underlying I/O error on the child's pipes.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the firewall, DHCP and network services.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// An external program ran but reported failure.
    #[error("failed to {action}: {detail}")]
    CommandFailed { action: &'static str, detail: String },

    /// An external program could not be run to completion.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// No DHCP config or lease source exists on this host.
    #[error("{0}")]
    NotFound(String),

    /// The running rule tables changed but the rules file was not updated.
    #[error("change applied but not persisted: {0}")]
    NotPersisted(String),

    /// The existing DHCP config could not be copied aside.
    #[error("failed to back up {path}: {detail}")]
    BackupFailed { path: String, detail: String },

    /// The new DHCP config could not be written.
    #[error("failed to write DHCP configuration: {0}")]
    ConfigWrite(String),

    /// The DHCP service did not come back after the new config was written.
    #[error("failed to restart {unit}: {detail} (previous configuration restored: {restored})")]
    RestartFailed { unit: String, detail: String, restored: bool },

    /// The submitted configuration cannot be rendered.
    #[error("invalid DHCP configuration: {0}")]
    Config(#[from] CoreError),
}
