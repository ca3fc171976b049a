//! Firewall rule inspection and mutation through `iptables`.
//!
//! Every successful mutation is followed by a save of the full rule set to
//! the configured rules file, so the change survives a reboot.

use std::sync::Arc;

use routerctl_core::iptables::{self, IPTABLES, IPTABLES_SAVE};
use routerctl_core::{parse_rule_set, FirewallRuleSet, Policy, RuleRequest};

use crate::config::path_arg;
use crate::{CommandOutput, CommandRunner, ServiceConfig, ServiceError};

/// Reads and changes the host's `iptables` tables.
pub struct FirewallService<R: CommandRunner> {
    runner: Arc<R>,
    config: Arc<ServiceConfig>,
}

impl<R: CommandRunner> FirewallService<R> {
    #[must_use]
    pub fn new(runner: Arc<R>, config: Arc<ServiceConfig>) -> Self {
        Self { runner, config }
    }

    /// Current rule set, parsed from `iptables-save`.
    ///
    /// # Errors
    /// Returns [`ServiceError::CommandFailed`] if `iptables-save` exits
    /// non-zero, or [`ServiceError::Executor`] if it cannot be run.
    pub async fn rules(&self) -> Result<FirewallRuleSet, ServiceError> {
        let output = self.runner.run(&self.config.elevated(IPTABLES_SAVE)).await?;
        ensure_success("read firewall rules", &output)?;
        let rules = parse_rule_set(&output.stdout);
        tracing::debug!(tables = rules.chains.len(), rules = rules.rule_count(), "firewall rules read");
        Ok(rules)
    }

    /// Append a rule to its chain.
    ///
    /// # Errors
    /// See [`FirewallService::flush_rules`].
    pub async fn add_rule(&self, request: &RuleRequest) -> Result<(), ServiceError> {
        self.mutate("add firewall rule", iptables::add_rule_args(request)).await
    }

    /// Delete the rule at 1-based `rule_number` in `chain`.
    ///
    /// # Errors
    /// See [`FirewallService::flush_rules`].
    pub async fn delete_rule(&self, chain: &str, rule_number: u32) -> Result<(), ServiceError> {
        self.mutate("delete firewall rule", iptables::delete_rule_args(chain, rule_number)).await
    }

    /// Remove every rule from every chain of the filter table.
    ///
    /// # Errors
    /// Returns [`ServiceError::CommandFailed`] if `iptables` rejects the
    /// change, in which case nothing is saved. Returns
    /// [`ServiceError::NotPersisted`] if the change took effect but the rules
    /// file could not be updated.
    pub async fn flush_rules(&self) -> Result<(), ServiceError> {
        self.mutate("flush firewall rules", iptables::flush_args()).await
    }

    /// Set the default policy of a built-in chain.
    ///
    /// # Errors
    /// See [`FirewallService::flush_rules`].
    pub async fn set_default_policy(&self, chain: &str, policy: Policy) -> Result<(), ServiceError> {
        self.mutate("set default policy", iptables::policy_args(chain, policy)).await
    }

    /// Write the running rule set to the rules file.
    ///
    /// # Errors
    /// Returns [`ServiceError::NotPersisted`] if the rules cannot be dumped or
    /// the file cannot be written.
    pub async fn persist(&self) -> Result<(), ServiceError> {
        let dump = self
            .runner
            .run(&self.config.elevated(IPTABLES_SAVE))
            .await
            .map_err(|e| ServiceError::NotPersisted(e.to_string()))?;
        if !dump.success {
            return Err(ServiceError::NotPersisted(format!(
                "{IPTABLES_SAVE}: {}",
                dump.failure_detail()
            )));
        }

        let path = path_arg(&self.config.rules_path);
        let write = self
            .runner
            .run(&self.config.elevated("tee").arg(path.as_str()).stdin(dump.stdout))
            .await
            .map_err(|e| ServiceError::NotPersisted(e.to_string()))?;
        if !write.success {
            return Err(ServiceError::NotPersisted(format!("{path}: {}", write.failure_detail())));
        }

        tracing::info!(%path, "firewall rules saved");
        Ok(())
    }

    async fn mutate(&self, action: &'static str, args: Vec<String>) -> Result<(), ServiceError> {
        let spec = self.config.elevated(IPTABLES).args(args);
        let output = self.runner.run(&spec).await?;
        ensure_success(action, &output)?;
        tracing::info!(command = %spec, "firewall changed");
        self.persist().await
    }
}

pub(crate) fn ensure_success(action: &'static str, output: &CommandOutput) -> Result<(), ServiceError> {
    if output.success {
        Ok(())
    } else {
        Err(ServiceError::CommandFailed { action, detail: output.failure_detail() })
    }
}

#[cfg(test)]
mod tests {
    use routerctl_core::samples;

    use super::*;
    use crate::testing::ScriptedRunner;
    use crate::ExecutorError;

    fn service(runner: ScriptedRunner) -> (Arc<ScriptedRunner>, FirewallService<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let service = FirewallService::new(Arc::clone(&runner), Arc::new(ServiceConfig::default()));
        (runner, service)
    }

    fn udp_dns() -> RuleRequest {
        RuleRequest {
            chain: "INPUT".to_owned(),
            protocol: Some("udp".to_owned()),
            ports: Some("53".to_owned()),
            target: "ACCEPT".to_owned(),
            ..RuleRequest::default()
        }
    }

    #[tokio::test]
    async fn rules_are_parsed_from_iptables_save() {
        let (runner, firewall) =
            service(ScriptedRunner::new().succeed("iptables-save", samples::IPTABLES_SAVE));
        let rules = match firewall.rules().await {
            Ok(r) => r,
            Err(e) => panic!("rules failed: {e}"),
        };
        assert_eq!(rules.chains.len(), 2);
        assert_eq!(rules.get("filter").map(|t| t.rules.len()), Some(5));
        assert_eq!(runner.calls(), vec!["sudo iptables-save"]);
    }

    #[tokio::test]
    async fn rules_read_failure_is_reported() {
        let (_, firewall) = service(ScriptedRunner::new().fail("iptables-save", "Permission denied"));
        match firewall.rules().await {
            Err(ServiceError::CommandFailed { detail, .. }) => assert_eq!(detail, "Permission denied"),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_rule_runs_then_saves() {
        let (runner, firewall) =
            service(ScriptedRunner::new().succeed("iptables-save", "*filter\nCOMMIT\n"));
        if let Err(e) = firewall.add_rule(&udp_dns()).await {
            panic!("add_rule failed: {e}");
        }
        assert_eq!(
            runner.calls(),
            vec![
                "sudo iptables -A INPUT -p udp --dport 53 -j ACCEPT",
                "sudo iptables-save",
                "sudo tee /etc/iptables/rules.v4",
            ]
        );
        let specs = runner.specs();
        assert_eq!(specs[2].stdin.as_deref(), Some("*filter\nCOMMIT\n"));
    }

    #[tokio::test]
    async fn rejected_mutation_is_not_saved() {
        let (runner, firewall) =
            service(ScriptedRunner::new().fail("iptables -A", "iptables: No chain/target/match by that name."));
        let result = firewall.add_rule(&udp_dns()).await;
        assert!(matches!(result, Err(ServiceError::CommandFailed { .. })));
        assert_eq!(runner.calls().len(), 1, "nothing may run after a rejected change");
    }

    #[tokio::test]
    async fn save_failure_reports_not_persisted_without_retrying() {
        let (runner, firewall) = service(ScriptedRunner::new().fail("iptables-save", "boom"));
        let result = firewall.flush_rules().await;
        assert!(matches!(result, Err(ServiceError::NotPersisted(_))), "got {result:?}");
        assert_eq!(runner.calls(), vec!["sudo iptables -F", "sudo iptables-save"]);
    }

    #[tokio::test]
    async fn write_failure_reports_not_persisted() {
        let (runner, firewall) = service(ScriptedRunner::new().fail("tee", "Read-only file system"));
        let result = firewall.delete_rule("INPUT", 2).await;
        match result {
            Err(ServiceError::NotPersisted(detail)) => assert!(detail.contains("Read-only")),
            other => panic!("expected NotPersisted, got {other:?}"),
        }
        assert_eq!(runner.calls()[0], "sudo iptables -D INPUT 2");
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn policy_change_uses_policy_token() {
        let (runner, firewall) = service(ScriptedRunner::new());
        if let Err(e) = firewall.set_default_policy("FORWARD", Policy::Drop).await {
            panic!("set_default_policy failed: {e}");
        }
        assert_eq!(runner.calls()[0], "sudo iptables -P FORWARD DROP");
    }

    #[tokio::test]
    async fn mutation_timeout_is_an_executor_error() {
        let (runner, firewall) = service(ScriptedRunner::new().time_out("iptables -F"));
        let result = firewall.flush_rules().await;
        assert!(matches!(result, Err(ServiceError::Executor(ExecutorError::TimedOut { .. }))));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn no_elevation_runs_iptables_directly() {
        let runner = Arc::new(ScriptedRunner::new());
        let firewall = FirewallService::new(
            Arc::clone(&runner),
            Arc::new(ServiceConfig::default().without_elevation()),
        );
        if let Err(e) = firewall.flush_rules().await {
            panic!("flush failed: {e}");
        }
        assert_eq!(runner.calls(), vec!["iptables -F", "iptables-save", "tee /etc/iptables/rules.v4"]);
    }
}
