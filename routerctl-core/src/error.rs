/// Errors produced by the `routerctl-core` crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A configuration value cannot be written into a config file as-is.
    #[error("invalid value for '{field}': {reason}")]
    InvalidConfigValue { field: String, reason: String },

    /// The configuration is missing fields required to render it.
    #[error("incomplete configuration: {reason}")]
    IncompleteConfig { reason: String },
}
