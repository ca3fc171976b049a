//! Text models for the router control service.
//!
//! Parses the semi-structured text owned by the operating system
//! (`iptables-save` dumps, ISC DHCP and dnsmasq config and lease files,
//! DHCP log lines) into structured values, and synthesizes the argument
//! lists and config bodies that write those values back.
//!
//! Nothing in this crate performs I/O; every function is pure over its
//! text input.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod dhcp;
pub mod error;
pub mod firewall;
pub mod iptables;
pub mod samples;

pub use dhcp::{DhcpConfig, DhcpDialect, DhcpLease, Dnsmasq, IscDhcp, LeaseRange, LeaseStatus};
pub use error::CoreError;
pub use firewall::{parse_rule, parse_rule_set, ChainState, FirewallRule, FirewallRuleSet};
pub use iptables::{Policy, RuleRequest};
