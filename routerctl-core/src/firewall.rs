//! `iptables-save` text model.
//!
//! Parses the output of `iptables-save` into tables of chain policies and
//! ordered rules, and renders that model back into the same text format.
//! Parsing never fails: lines the model does not understand are skipped,
//! and rule tokens it does not recognise are kept verbatim in
//! [`FirewallRule::extra`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Every table found in an `iptables-save` dump, keyed by the name that
/// follows the `*` header (e.g. `"filter"`, `"nat"`), in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct FirewallRuleSet {
    pub chains: IndexMap<String, ChainState>,
}

/// Policies and rules declared under a single `*` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ChainState {
    /// Built-in chain name to policy token (`ACCEPT`, `DROP`, `-`, ...).
    pub policies: IndexMap<String, String>,
    /// Rules in evaluation order.
    pub rules: Vec<FirewallRule>,
}

/// One `-A` line. Absent fields do not constrain the rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct FirewallRule {
    pub chain: String,
    pub protocol: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    /// Jump target. `iptables-save` emits counting rules without `-j`,
    /// so a rule can legitimately have none.
    pub target: Option<String>,
    pub ports: Option<String>,
    /// `ports` came from `--sport` rather than `--dport`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub source_port: bool,
    pub state: Option<String>,
    /// Unrecognised tokens, verbatim and in order. A negated match is kept
    /// here whole, `!` included.
    pub extra: Vec<String>,
}

impl FirewallRuleSet {
    /// Look up a table by its `*` header name.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&ChainState> {
        self.chains.get(table)
    }

    /// Total number of rules across every table.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.chains.values().map(|c| c.rules.len()).sum()
    }
}

/// Parse `iptables-save` output.
///
/// A `*name` line opens (or resets) a table, `:CHAIN POLICY [pkts:bytes]`
/// records a policy with the counters discarded, and `-A` lines append rules
/// in file order. Blank lines, `#` comments and `COMMIT` are skipped, as is
/// anything that appears before the first `*` header.
#[must_use]
pub fn parse_rule_set(text: &str) -> FirewallRuleSet {
    let mut set = FirewallRuleSet::default();
    let mut current: Option<String> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('*') {
            let name = name.trim().to_owned();
            set.chains.insert(name.clone(), ChainState::default());
            current = Some(name);
        } else if let Some(decl) = line.strip_prefix(':') {
            let Some(table) = current.as_ref().and_then(|c| set.chains.get_mut(c)) else {
                continue;
            };
            let mut parts = decl.split_whitespace();
            if let (Some(chain), Some(policy)) = (parts.next(), parts.next()) {
                table
                    .policies
                    .insert(chain.to_owned(), policy.replace(['[', ']'], ""));
            }
        } else if line.split_whitespace().next() == Some("-A") {
            if let Some(table) = current.as_ref().and_then(|c| set.chains.get_mut(c)) {
                table.rules.push(parse_rule(line));
            }
        }
    }

    set
}

/// Parse a single `-A CHAIN ...` line.
///
/// Recognises `-p`, `-s`, `-d`, `-j`, one `--dport`/`--sport` and the
/// `-m state --state <value>` group. A flag with no value ends the scan and
/// leaves the field absent. `!` and the match it negates go to
/// [`FirewallRule::extra`] untouched.
#[must_use]
pub fn parse_rule(line: &str) -> FirewallRule {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut rule = FirewallRule {
        chain: tokens.get(1).map(|c| (*c).to_owned()).unwrap_or_default(),
        ..FirewallRule::default()
    };

    let mut iter = tokens.iter().skip(2).copied().peekable();
    while let Some(token) = iter.next() {
        let slot = match token {
            "-p" => &mut rule.protocol,
            "-s" => &mut rule.source,
            "-d" => &mut rule.destination,
            "-j" => &mut rule.target,
            "--dport" | "--sport" if rule.ports.is_none() => {
                let Some(value) = iter.next() else { break };
                rule.ports = Some(value.to_owned());
                rule.source_port = token == "--sport";
                continue;
            }
            "!" => {
                rule.extra.push(token.to_owned());
                if let Some(flag) = iter.next() {
                    rule.extra.push(flag.to_owned());
                    if let Some(value) = iter.next_if(|v| !v.starts_with('-')) {
                        rule.extra.push(value.to_owned());
                    }
                }
                continue;
            }
            "-m" if iter.peek() == Some(&"state") => {
                iter.next();
                if iter.peek() == Some(&"--state") {
                    iter.next();
                    &mut rule.state
                } else {
                    rule.extra.push("-m".to_owned());
                    rule.extra.push("state".to_owned());
                    continue;
                }
            }
            other => {
                rule.extra.push(other.to_owned());
                continue;
            }
        };

        match iter.next() {
            Some(value) => *slot = Some(value.to_owned()),
            None => break,
        }
    }

    rule
}

impl fmt::Display for FirewallRule {
    /// Renders the rule as an `iptables-save` line. Unrecognised tokens,
    /// negated matches included, are emitted after the address matches and
    /// before the port match, where match extensions such as `-m tcp` sit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-A {}", self.chain)?;
        if let Some(protocol) = &self.protocol {
            write!(f, " -p {protocol}")?;
        }
        if let Some(source) = &self.source {
            write!(f, " -s {source}")?;
        }
        if let Some(destination) = &self.destination {
            write!(f, " -d {destination}")?;
        }
        for token in &self.extra {
            write!(f, " {token}")?;
        }
        if let Some(ports) = &self.ports {
            let flag = if self.source_port { "--sport" } else { "--dport" };
            write!(f, " {flag} {ports}")?;
        }
        if let Some(state) = &self.state {
            write!(f, " -m state --state {state}")?;
        }
        if let Some(target) = &self.target {
            write!(f, " -j {target}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FirewallRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (table, state) in &self.chains {
            writeln!(f, "*{table}")?;
            for (chain, policy) in &state.policies {
                writeln!(f, ":{chain} {policy} [0:0]")?;
            }
            for rule in &state.rules {
                writeln!(f, "{rule}")?;
            }
            writeln!(f, "COMMIT")?;
        }
        Ok(())
    }
}
