//! Host paths, service names and process limits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use routerctl_core::{DhcpDialect, Dnsmasq, IscDhcp};

use crate::CommandSpec;

/// Limits applied to every external program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExecLimits {
    /// Wall-clock limit per program.
    pub timeout: Duration,
    /// Cap on each of stdout and stderr, in bytes.
    pub max_output_bytes: usize,
}

impl ExecLimits {
    #[must_use]
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self { timeout, max_output_bytes }
    }
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10), max_output_bytes: 1024 * 1024 }
    }
}

/// One DHCP server installation the host may have.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DhcpServer {
    /// Reads and writes this server's file formats.
    pub dialect: Arc<dyn DhcpDialect>,
    pub config_path: PathBuf,
    pub leases_path: PathBuf,
    /// systemd unit restarted after a config update.
    pub unit: String,
}

impl DhcpServer {
    #[must_use]
    pub fn new(
        dialect: Arc<dyn DhcpDialect>,
        config_path: impl Into<PathBuf>,
        leases_path: impl Into<PathBuf>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            dialect,
            config_path: config_path.into(),
            leases_path: leases_path.into(),
            unit: unit.into(),
        }
    }

    /// ISC `dhcpd` at its Debian locations.
    #[must_use]
    pub fn isc() -> Self {
        Self::new(
            Arc::new(IscDhcp),
            "/etc/dhcp/dhcpd.conf",
            "/var/lib/dhcp/dhcpd.leases",
            "isc-dhcp-server",
        )
    }

    /// dnsmasq at its Debian locations.
    #[must_use]
    pub fn dnsmasq() -> Self {
        Self::new(
            Arc::new(Dnsmasq),
            "/etc/dnsmasq.conf",
            "/var/lib/misc/dnsmasq.leases",
            "dnsmasq",
        )
    }
}

/// Where the services find things on the host and how they elevate.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ServiceConfig {
    /// Wrapper used for privileged commands, e.g. `sudo`. `None` runs them
    /// directly.
    pub elevation: Option<String>,
    /// File the current rule set is saved to after every change.
    pub rules_path: PathBuf,
    /// DHCP servers in probe order; the first one with an existing file wins.
    pub dhcp_servers: Vec<DhcpServer>,
    /// Unit whose journal is read when no lease file exists.
    pub journal_unit: String,
    pub journal_lines: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            elevation: Some("sudo".to_owned()),
            rules_path: PathBuf::from("/etc/iptables/rules.v4"),
            dhcp_servers: vec![DhcpServer::isc(), DhcpServer::dnsmasq()],
            journal_unit: "dhcpd".to_owned(),
            journal_lines: 50,
        }
    }
}

impl ServiceConfig {
    /// Same configuration with privileged commands run directly.
    #[must_use]
    pub fn without_elevation(mut self) -> Self {
        self.elevation = None;
        self
    }

    /// Start a privileged invocation of `program`.
    #[must_use]
    pub fn elevated(&self, program: &str) -> CommandSpec {
        match &self.elevation {
            Some(wrapper) => CommandSpec::new(wrapper.as_str()).arg(program),
            None => CommandSpec::new(program),
        }
    }
}

/// Command-line form of a host path.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `<path>.backup`, next to the original.
pub(crate) fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}
