//! Host command execution for routerctl.
//!
//! Everything that touches the router goes through a [`CommandRunner`]:
//! [`SystemRunner`] spawns real programs with a time limit and an output
//! cap, and the firewall, DHCP and network services build on top of it.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod command;
pub mod config;
pub mod dhcp;
pub mod error;
pub mod firewall;
pub mod network;
pub mod runner;
pub mod system;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{CommandOutput, CommandSpec};
pub use config::{DhcpServer, ExecLimits, ServiceConfig};
pub use dhcp::DhcpService;
pub use error::{ExecutorError, ServiceError};
pub use firewall::FirewallService;
pub use network::{NetworkService, NetworkStatus};
pub use runner::CommandRunner;
pub use system::SystemRunner;
