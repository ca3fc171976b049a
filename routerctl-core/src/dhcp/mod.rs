//! DHCP server configuration and lease model.
//!
//! Two server dialects are supported, ISC `dhcpd` and dnsmasq. Each one is a
//! [`DhcpDialect`] implementation that reads its own config and lease text
//! into the shared [`DhcpConfig`] / [`DhcpLease`] shapes and renders a
//! [`DhcpConfig`] back into its config syntax. Callers pick a dialect by
//! probing the filesystem and never match on the concrete type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub mod dnsmasq;
pub mod isc;
pub mod journal;
mod scan;

pub use dnsmasq::Dnsmasq;
pub use isc::IscDhcp;
pub use journal::parse_journal_leases;
pub use scan::is_dotted_quad;

/// Placeholder for lease fields the source text did not carry.
pub const UNKNOWN: &str = "Unknown";

/// Server-side DHCP settings for a single subnet.
///
/// Addresses are dot-decimal IPv4 strings and lease times are whole seconds
/// kept as strings, matching how both dialects store them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpConfig {
    pub subnet: String,
    pub netmask: String,
    pub range: LeaseRange,
    pub default_lease_time: String,
    pub max_lease_time: String,
    pub routers: Vec<String>,
    pub dns_servers: Vec<String>,
}

/// Inclusive pool of addresses handed out to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRange {
    pub start: String,
    pub end: String,
}

impl LeaseRange {
    /// `true` when neither bound is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// A client binding reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpLease {
    pub ip: String,
    pub mac: String,
    pub hostname: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: LeaseStatus,
}

/// Whether the server currently considers the binding live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    Active,
    Inactive,
}

/// Reading and writing one DHCP server's text formats.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by concurrent request handlers.
pub trait DhcpDialect: fmt::Debug + Send + Sync {
    /// Short identifier used in logs (e.g. `"isc-dhcp"`).
    fn name(&self) -> &'static str;

    /// Read a config file body. Missing directives leave fields at their
    /// dialect defaults; parsing never fails.
    fn parse_config(&self, text: &str) -> DhcpConfig;

    /// Read a lease file body. Records that cannot be identified by an IP
    /// address are dropped.
    fn parse_leases(&self, text: &str) -> Vec<DhcpLease>;

    /// Render `config` as a config file body that [`parse_config`] reads
    /// back to the same values.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidConfigValue`] if a value would break the
    /// file syntax, or [`CoreError::IncompleteConfig`] if related fields are
    /// only partly set.
    ///
    /// [`parse_config`]: DhcpDialect::parse_config
    fn generate_config(&self, config: &DhcpConfig) -> Result<String, CoreError>;

    /// Whether [`merge_config`] reads the current file body. When `false`
    /// the generated body replaces the file outright.
    ///
    /// [`merge_config`]: DhcpDialect::merge_config
    fn merges_existing(&self) -> bool {
        false
    }

    /// Fold `config` into the `existing` config file body.
    ///
    /// The default ignores `existing` and returns [`generate_config`].
    ///
    /// # Errors
    /// Same as [`generate_config`].
    ///
    /// [`generate_config`]: DhcpDialect::generate_config
    fn merge_config(&self, existing: &str, config: &DhcpConfig) -> Result<String, CoreError> {
        let _ = existing;
        self.generate_config(config)
    }
}

/// Reject values that would change the structure of a generated file.
pub(crate) fn config_token<'a>(field: &str, value: &'a str) -> Result<&'a str, CoreError> {
    let forbidden = |c: char| {
        c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '{' | '}' | '#' | '"' | '=')
    };
    if value.is_empty() {
        return Err(CoreError::InvalidConfigValue {
            field: field.to_owned(),
            reason: "value is empty".to_owned(),
        });
    }
    if value.contains(forbidden) {
        return Err(CoreError::InvalidConfigValue {
            field: field.to_owned(),
            reason: format!("'{value}' contains a character that is not allowed"),
        });
    }
    Ok(value)
}

/// Lease times must be plain non-negative integers.
pub(crate) fn lease_seconds<'a>(field: &str, value: &'a str) -> Result<&'a str, CoreError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidConfigValue {
            field: field.to_owned(),
            reason: format!("'{value}' is not a whole number of seconds"),
        });
    }
    Ok(value)
}
