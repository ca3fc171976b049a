//! Interface and routing table passthrough via iproute2.

use std::net::Ipv4Addr;
use std::sync::Arc;

use serde::Serialize;

use crate::firewall::ensure_success;
use crate::{CommandRunner, CommandSpec, ServiceError};

const IP: &str = "ip";

/// Raw `ip a` and `ip route` text, as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub interfaces: String,
    pub routes: String,
}

/// Reads interfaces and routes and adds static routes.
///
/// Reads run unprivileged; `ip route add` relies on the service's own
/// capabilities.
pub struct NetworkService<R: CommandRunner> {
    runner: Arc<R>,
}

impl<R: CommandRunner> NetworkService<R> {
    #[must_use]
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Output of `ip a`.
    ///
    /// # Errors
    /// Returns [`ServiceError::CommandFailed`] if `ip` exits non-zero.
    pub async fn interfaces(&self) -> Result<String, ServiceError> {
        self.ip("list interfaces", &["a"]).await
    }

    /// Output of `ip route`.
    ///
    /// # Errors
    /// Returns [`ServiceError::CommandFailed`] if `ip` exits non-zero.
    pub async fn routes(&self) -> Result<String, ServiceError> {
        self.ip("list routes", &["route"]).await
    }

    /// Interfaces and routes together.
    ///
    /// # Errors
    /// Fails if either listing fails.
    pub async fn status(&self) -> Result<NetworkStatus, ServiceError> {
        let interfaces = self.interfaces().await?;
        let routes = self.routes().await?;
        Ok(NetworkStatus { interfaces, routes })
    }

    /// `ip route add <destination> via <gateway>`. `destination` must already
    /// be validated as an address or CIDR block.
    ///
    /// # Errors
    /// Returns [`ServiceError::CommandFailed`] if the kernel rejects the route.
    pub async fn add_route(&self, destination: &str, gateway: Ipv4Addr) -> Result<(), ServiceError> {
        let gateway = gateway.to_string();
        self.ip("add route", &["route", "add", destination, "via", gateway.as_str()]).await?;
        tracing::info!(%destination, %gateway, "route added");
        Ok(())
    }

    async fn ip(&self, action: &'static str, args: &[&str]) -> Result<String, ServiceError> {
        let output = self.runner.run(&CommandSpec::new(IP).args(args.iter().copied())).await?;
        ensure_success(action, &output)?;
        Ok(output.stdout)
    }
}
