//! Argument lists for `iptables` invocations.
//!
//! Every builder returns the arguments only; the caller decides how the
//! program is launched (directly or through an elevation wrapper). Nothing
//! here is ever passed through a shell.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Program that mutates the running rule tables.
pub const IPTABLES: &str = "iptables";

/// Program that dumps the running rule tables.
pub const IPTABLES_SAVE: &str = "iptables-save";

/// A rule to append, as submitted by a client.
///
/// Optional fields that are absent or empty are left out of the command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRequest {
    pub chain: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub target: String,
}

/// Default action for packets that match no rule in a built-in chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Policy {
    Accept,
    Drop,
    Reject,
}

impl Policy {
    /// The token `iptables` expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPT" => Ok(Self::Accept),
            "DROP" => Ok(Self::Drop),
            "REJECT" => Ok(Self::Reject),
            other => Err(CoreError::InvalidConfigValue {
                field: "policy".to_owned(),
                reason: format!("'{other}' is not one of ACCEPT, DROP, REJECT"),
            }),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Arguments that append `request` to its chain.
///
/// Order is fixed: chain, protocol, source, destination, ports, state,
/// target. `--dport` is only emitted for `tcp` and `udp`, since `iptables`
/// rejects port matches on other protocols.
#[must_use]
pub fn add_rule_args(request: &RuleRequest) -> Vec<String> {
    let mut args = vec!["-A".to_owned()];
    let mut push = |flag: &[&str], value: &str| {
        args.extend(flag.iter().map(|f| (*f).to_owned()));
        args.push(value.to_owned());
    };

    if let Some(chain) = present(Some(&request.chain)) {
        push(&[], chain);
    }
    let protocol = present(request.protocol.as_deref());
    if let Some(protocol) = protocol {
        push(&["-p"], protocol);
    }
    if let Some(source) = present(request.source.as_deref()) {
        push(&["-s"], source);
    }
    if let Some(destination) = present(request.destination.as_deref()) {
        push(&["-d"], destination);
    }
    if let Some(ports) = present(request.ports.as_deref()) {
        let port_capable = protocol
            .is_some_and(|p| p.eq_ignore_ascii_case("tcp") || p.eq_ignore_ascii_case("udp"));
        if port_capable {
            push(&["--dport"], ports);
        }
    }
    if let Some(state) = present(request.state.as_deref()) {
        push(&["-m", "state", "--state"], state);
    }
    if let Some(target) = present(Some(&request.target)) {
        push(&["-j"], target);
    }

    args
}

/// Arguments that delete the 1-based `rule_number` from `chain`.
#[must_use]
pub fn delete_rule_args(chain: &str, rule_number: u32) -> Vec<String> {
    vec!["-D".to_owned(), chain.to_owned(), rule_number.to_string()]
}

/// Arguments that flush every chain of the filter table.
#[must_use]
pub fn flush_args() -> Vec<String> {
    vec!["-F".to_owned()]
}

/// Arguments that set the default policy of a built-in chain.
#[must_use]
pub fn policy_args(chain: &str, policy: Policy) -> Vec<String> {
    vec!["-P".to_owned(), chain.to_owned(), policy.as_str().to_owned()]
}
