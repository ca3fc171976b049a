//! DHCP server discovery, lease listing and config replacement.
//!
//! The host may run ISC `dhcpd` or dnsmasq. Each read probes the configured
//! servers in order with `test -f` and uses the first whose file exists.

use std::path::Path;
use std::sync::Arc;

use routerctl_core::dhcp::parse_journal_leases;
use routerctl_core::{DhcpConfig, DhcpLease};

use crate::config::{backup_path, path_arg};
use crate::firewall::ensure_success;
use crate::{CommandRunner, CommandSpec, DhcpServer, ServiceConfig, ServiceError};

const NO_CONFIG: &str = "No DHCP server configuration found";
const NO_LEASES: &str = "No DHCP lease information found";

/// Reads and rewrites whichever DHCP server the host runs.
pub struct DhcpService<R: CommandRunner> {
    runner: Arc<R>,
    config: Arc<ServiceConfig>,
}

impl<R: CommandRunner> DhcpService<R> {
    #[must_use]
    pub fn new(runner: Arc<R>, config: Arc<ServiceConfig>) -> Self {
        Self { runner, config }
    }

    /// Current leases, from the first lease file that exists, else from the
    /// server's journal.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] if no lease file exists and the
    /// journal cannot be read.
    pub async fn clients(&self) -> Result<Vec<DhcpLease>, ServiceError> {
        for server in &self.config.dhcp_servers {
            if self.file_exists(&server.leases_path).await? {
                let text = self.read_file(&server.leases_path).await?;
                let leases = server.dialect.parse_leases(&text);
                tracing::debug!(dialect = server.dialect.name(), count = leases.len(), "leases read");
                return Ok(leases);
            }
        }

        let journal = CommandSpec::new("journalctl")
            .arg("-u")
            .arg(self.config.journal_unit.as_str())
            .arg("-n")
            .arg(self.config.journal_lines.to_string())
            .arg("--no-pager");
        let output = self.runner.run(&journal).await?;
        if !output.success {
            tracing::warn!(detail = %output.failure_detail(), "no lease file and no journal");
            return Err(ServiceError::NotFound(NO_LEASES.to_owned()));
        }
        let leases = parse_journal_leases(&output.stdout);
        tracing::debug!(count = leases.len(), "leases recovered from journal");
        Ok(leases)
    }

    /// Current server settings from the first config file that exists.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] if no config file exists.
    pub async fn config(&self) -> Result<DhcpConfig, ServiceError> {
        let Some(server) = self.detect().await? else {
            return Err(ServiceError::NotFound(NO_CONFIG.to_owned()));
        };
        let text = self.read_file(&server.config_path).await?;
        Ok(server.dialect.parse_config(&text))
    }

    /// Replace the server config and restart the server.
    ///
    /// The target is the first server whose config exists, or the first
    /// configured server when none does. Dialects that keep unrelated
    /// directives merge `config` into the current file. An existing file is
    /// copied to `<path>.backup` first and copied back if the restart fails.
    ///
    /// # Errors
    /// Returns [`ServiceError::Config`] if `config` cannot be rendered (nothing
    /// is touched), [`ServiceError::CommandFailed`] if the current file cannot
    /// be read, [`ServiceError::BackupFailed`] if the copy fails,
    /// [`ServiceError::ConfigWrite`] if the write fails (no restart is
    /// attempted) and [`ServiceError::RestartFailed`] if the server does not
    /// restart.
    pub async fn update_config(&self, config: &DhcpConfig) -> Result<(), ServiceError> {
        let detected = self.detect().await?;
        let existed = detected.is_some();
        let Some(server) = detected.or_else(|| self.config.dhcp_servers.first()) else {
            return Err(ServiceError::NotFound(NO_CONFIG.to_owned()));
        };

        let mut body = server.dialect.generate_config(config)?;
        if existed && server.dialect.merges_existing() {
            let current = self.read_file(&server.config_path).await?;
            body = server.dialect.merge_config(&current, config)?;
        }
        let path = path_arg(&server.config_path);
        let backup = path_arg(&backup_path(&server.config_path));

        if existed {
            let copy = self.config.elevated("cp").arg(path.as_str()).arg(backup.as_str());
            let output = self.runner.run(&copy).await.map_err(|e| ServiceError::BackupFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            if !output.success {
                return Err(ServiceError::BackupFailed { path, detail: output.failure_detail() });
            }
        }

        let write = self.config.elevated("tee").arg(path.as_str()).stdin(body);
        let output = self
            .runner
            .run(&write)
            .await
            .map_err(|e| ServiceError::ConfigWrite(e.to_string()))?;
        if !output.success {
            return Err(ServiceError::ConfigWrite(format!("{path}: {}", output.failure_detail())));
        }
        tracing::info!(dialect = server.dialect.name(), %path, "DHCP configuration written");

        let restart = self.config.elevated("systemctl").arg("restart").arg(server.unit.as_str());
        let detail = match self.runner.run(&restart).await {
            Ok(output) if output.success => {
                tracing::info!(unit = %server.unit, "DHCP server restarted");
                return Ok(());
            }
            Ok(output) => output.failure_detail(),
            Err(e) => e.to_string(),
        };

        let restored = existed && self.restore(&backup, &path).await;
        tracing::error!(unit = %server.unit, %detail, restored, "DHCP server restart failed");
        Err(ServiceError::RestartFailed { unit: server.unit.clone(), detail, restored })
    }

    async fn restore(&self, backup: &str, path: &str) -> bool {
        let copy = self.config.elevated("cp").arg(backup).arg(path);
        match self.runner.run(&copy).await {
            Ok(output) if output.success => true,
            Ok(output) => {
                tracing::error!(%path, detail = %output.failure_detail(), "restore from backup failed");
                false
            }
            Err(e) => {
                tracing::error!(%path, error = %e, "restore from backup failed");
                false
            }
        }
    }

    async fn detect(&self) -> Result<Option<&DhcpServer>, ServiceError> {
        for server in &self.config.dhcp_servers {
            if self.file_exists(&server.config_path).await? {
                tracing::debug!(dialect = server.dialect.name(), "DHCP server detected");
                return Ok(Some(server));
            }
        }
        Ok(None)
    }

    async fn file_exists(&self, path: &Path) -> Result<bool, ServiceError> {
        let probe = CommandSpec::new("test").arg("-f").arg(path_arg(path));
        Ok(self.runner.run(&probe).await?.success)
    }

    async fn read_file(&self, path: &Path) -> Result<String, ServiceError> {
        let output = self.runner.run(&CommandSpec::new("cat").arg(path_arg(path))).await?;
        ensure_success("read file", &output)?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use routerctl_core::{samples, LeaseRange, LeaseStatus};

    use super::*;
    use crate::testing::ScriptedRunner;

    const ISC_CONF: &str = "test -f /etc/dhcp/dhcpd.conf";
    const DNSMASQ_CONF: &str = "test -f /etc/dnsmasq.conf";
    const ISC_LEASES: &str = "test -f /var/lib/dhcp/dhcpd.leases";
    const DNSMASQ_LEASES: &str = "test -f /var/lib/misc/dnsmasq.leases";

    fn service(runner: ScriptedRunner) -> (Arc<ScriptedRunner>, DhcpService<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let service = DhcpService::new(Arc::clone(&runner), Arc::new(ServiceConfig::default()));
        (runner, service)
    }

    fn office() -> DhcpConfig {
        DhcpConfig {
            subnet: "10.0.0.0".to_owned(),
            netmask: "255.255.255.0".to_owned(),
            range: LeaseRange { start: "10.0.0.10".to_owned(), end: "10.0.0.99".to_owned() },
            default_lease_time: "600".to_owned(),
            max_lease_time: "7200".to_owned(),
            routers: vec!["10.0.0.1".to_owned()],
            dns_servers: vec!["1.1.1.1".to_owned()],
        }
    }

    #[tokio::test]
    async fn isc_config_is_preferred() {
        let (runner, dhcp) =
            service(ScriptedRunner::new().succeed("cat /etc/dhcp/dhcpd.conf", samples::DHCPD_CONF));
        let config = match dhcp.config().await {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(config.subnet, "192.168.1.0");
        assert_eq!(config.dns_servers, vec!["8.8.8.8", "8.8.4.4"]);
        assert_eq!(runner.calls(), vec![ISC_CONF, "cat /etc/dhcp/dhcpd.conf"]);
    }

    #[tokio::test]
    async fn dnsmasq_config_when_isc_is_absent() {
        let (_, dhcp) = service(
            ScriptedRunner::new()
                .fail(ISC_CONF, "")
                .succeed("cat /etc/dnsmasq.conf", samples::DNSMASQ_CONF),
        );
        let config = match dhcp.config().await {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(config.range.start, "192.168.50.10");
        assert_eq!(config.routers, vec!["192.168.50.1"]);
    }

    #[tokio::test]
    async fn missing_config_is_not_found() {
        let (_, dhcp) = service(ScriptedRunner::new().fail("test -f", ""));
        match dhcp.config().await {
            Err(ServiceError::NotFound(message)) => assert_eq!(message, NO_CONFIG),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn isc_leases_are_listed() {
        let (_, dhcp) = service(
            ScriptedRunner::new().succeed("cat /var/lib/dhcp/dhcpd.leases", samples::DHCPD_LEASES),
        );
        let leases = match dhcp.clients().await {
            Ok(l) => l,
            Err(e) => panic!("clients failed: {e}"),
        };
        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].hostname, "laptop");
        assert_eq!(leases[0].status, LeaseStatus::Active);
        assert_eq!(leases[1].status, LeaseStatus::Inactive);
    }

    #[tokio::test]
    async fn dnsmasq_leases_when_isc_file_is_absent() {
        let (_, dhcp) = service(
            ScriptedRunner::new()
                .fail(ISC_LEASES, "")
                .succeed("cat /var/lib/misc/dnsmasq.leases", samples::DNSMASQ_LEASES),
        );
        let leases = match dhcp.clients().await {
            Ok(l) => l,
            Err(e) => panic!("clients failed: {e}"),
        };
        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].start_time, "2023-11-14T22:13:20.000Z");
    }

    #[tokio::test]
    async fn journal_is_the_last_resort() {
        let (runner, dhcp) = service(
            ScriptedRunner::new()
                .fail(ISC_LEASES, "")
                .fail(DNSMASQ_LEASES, "")
                .succeed("journalctl", samples::DHCP_JOURNAL),
        );
        let leases = match dhcp.clients().await {
            Ok(l) => l,
            Err(e) => panic!("clients failed: {e}"),
        };
        assert_eq!(leases.len(), 2);
        assert_eq!(runner.calls()[2], "journalctl -u dhcpd -n 50 --no-pager");
    }

    #[tokio::test]
    async fn unreadable_journal_is_not_found() {
        let (_, dhcp) = service(
            ScriptedRunner::new().fail("test -f", "").fail("journalctl", "No journal files were found."),
        );
        match dhcp.clients().await {
            Err(ServiceError::NotFound(message)) => assert_eq!(message, NO_LEASES),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_backs_up_writes_and_restarts() {
        let (runner, dhcp) = service(ScriptedRunner::new());
        if let Err(e) = dhcp.update_config(&office()).await {
            panic!("update failed: {e}");
        }
        assert_eq!(
            runner.calls(),
            vec![
                ISC_CONF,
                "sudo cp /etc/dhcp/dhcpd.conf /etc/dhcp/dhcpd.conf.backup",
                "sudo tee /etc/dhcp/dhcpd.conf",
                "sudo systemctl restart isc-dhcp-server",
            ]
        );
        let written = runner.specs()[2].stdin.clone().unwrap_or_default();
        assert!(written.contains("subnet 10.0.0.0 netmask 255.255.255.0 {"), "{written}");
    }

    #[tokio::test]
    async fn update_targets_dnsmasq_when_only_it_exists() {
        let (runner, dhcp) = service(ScriptedRunner::new().fail(ISC_CONF, ""));
        if let Err(e) = dhcp.update_config(&office()).await {
            panic!("update failed: {e}");
        }
        let calls = runner.calls();
        assert_eq!(calls[2], "cat /etc/dnsmasq.conf");
        assert_eq!(calls[4], "sudo tee /etc/dnsmasq.conf");
        assert_eq!(calls[5], "sudo systemctl restart dnsmasq");
        let written = runner.specs()[4].stdin.clone().unwrap_or_default();
        assert!(written.contains("dhcp-range=10.0.0.10,10.0.0.99,255.255.255.0,7200"), "{written}");
    }

    #[tokio::test]
    async fn dnsmasq_update_keeps_interface_binding() {
        let (runner, dhcp) = service(
            ScriptedRunner::new()
                .fail(ISC_CONF, "")
                .succeed("cat /etc/dnsmasq.conf", samples::DNSMASQ_CONF),
        );
        if let Err(e) = dhcp.update_config(&office()).await {
            panic!("update failed: {e}");
        }
        let specs = runner.specs();
        let Some(write) = specs.iter().find(|s| s.to_string() == "sudo tee /etc/dnsmasq.conf") else {
            panic!("no write in {:?}", runner.calls());
        };
        let written = write.stdin.clone().unwrap_or_default();
        assert!(written.starts_with("interface=br0\n"), "{written}");
        assert!(written.contains("dhcp-range=10.0.0.10,10.0.0.99,255.255.255.0,7200\n"), "{written}");
        assert!(!written.contains("192.168.50.150"), "{written}");
        assert!(!written.contains("9.9.9.9"), "{written}");
    }

    #[tokio::test]
    async fn unreadable_dnsmasq_config_is_left_alone() {
        let (runner, dhcp) = service(
            ScriptedRunner::new()
                .fail(ISC_CONF, "")
                .fail("cat /etc/dnsmasq.conf", "Permission denied"),
        );
        let result = dhcp.update_config(&office()).await;
        assert!(matches!(result, Err(ServiceError::CommandFailed { .. })), "got {result:?}");
        assert!(runner.calls().iter().all(|c| !c.contains("tee") && !c.contains(" cp ")));
    }

    #[tokio::test]
    async fn update_without_existing_config_skips_backup() {
        let (runner, dhcp) = service(ScriptedRunner::new().fail("test -f", ""));
        if let Err(e) = dhcp.update_config(&office()).await {
            panic!("update failed: {e}");
        }
        let calls = runner.calls();
        assert!(calls.iter().all(|c| !c.contains(" cp ")), "{calls:?}");
        assert!(calls.contains(&"sudo tee /etc/dhcp/dhcpd.conf".to_owned()));
    }

    #[tokio::test]
    async fn invalid_config_touches_nothing() {
        let (runner, dhcp) = service(ScriptedRunner::new());
        let config = DhcpConfig { subnet: String::new(), ..office() };
        let result = dhcp.update_config(&config).await;
        assert!(matches!(result, Err(ServiceError::Config(_))), "got {result:?}");
        assert_eq!(runner.calls(), vec![ISC_CONF]);
    }

    #[tokio::test]
    async fn backup_failure_stops_the_update() {
        let (runner, dhcp) = service(ScriptedRunner::new().fail("cp ", "No space left on device"));
        let result = dhcp.update_config(&office()).await;
        assert!(matches!(result, Err(ServiceError::BackupFailed { .. })), "got {result:?}");
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn write_failure_never_restarts() {
        let (runner, dhcp) = service(ScriptedRunner::new().fail("tee", "Permission denied"));
        let result = dhcp.update_config(&office()).await;
        assert!(matches!(result, Err(ServiceError::ConfigWrite(_))), "got {result:?}");
        assert!(runner.calls().iter().all(|c| !c.contains("systemctl")));
    }

    #[tokio::test]
    async fn restart_failure_restores_the_backup_once() {
        let (runner, dhcp) = service(ScriptedRunner::new().fail("systemctl", "Job failed"));
        match dhcp.update_config(&office()).await {
            Err(ServiceError::RestartFailed { unit, restored, detail }) => {
                assert_eq!(unit, "isc-dhcp-server");
                assert!(restored);
                assert_eq!(detail, "Job failed");
            }
            other => panic!("expected RestartFailed, got {other:?}"),
        }
        let restores = runner
            .calls()
            .into_iter()
            .filter(|c| c == "sudo cp /etc/dhcp/dhcpd.conf.backup /etc/dhcp/dhcpd.conf")
            .count();
        assert_eq!(restores, 1);
    }

    #[tokio::test]
    async fn restart_failure_without_backup_restores_nothing() {
        let (runner, dhcp) =
            service(ScriptedRunner::new().fail("test -f", "").fail("systemctl", "Job failed"));
        let result = dhcp.update_config(&office()).await;
        assert!(matches!(result, Err(ServiceError::RestartFailed { restored: false, .. })));
        assert!(runner.calls().iter().all(|c| !c.contains(" cp ")));
    }
}
