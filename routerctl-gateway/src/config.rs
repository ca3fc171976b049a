//! Gateway settings read from the environment.

use routerctl_executor::ServiceConfig;

/// Full listen address, e.g. `127.0.0.1:8080`.
pub const LISTEN_ADDR_VAR: &str = "ROUTERCTL_LISTEN_ADDR";
/// Port to listen on all interfaces when no full address is given.
pub const PORT_VAR: &str = "PORT";
/// Set to `1` to run privileged commands without `sudo`.
pub const NO_SUDO_VAR: &str = "ROUTERCTL_NO_SUDO";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Wrap privileged commands in `sudo`.
    pub elevate: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { listen_addr: DEFAULT_LISTEN_ADDR.to_owned(), elevate: true }
    }
}

impl GatewayConfig {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var(LISTEN_ADDR_VAR)
            .or_else(|| var(PORT_VAR).map(|port| format!("0.0.0.0:{}", port.trim())))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let elevate = var(NO_SUDO_VAR).map_or(true, |v| v.trim() != "1");

        Self { listen_addr, elevate }
    }

    /// Service settings matching this gateway configuration.
    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        let config = ServiceConfig::default();
        if self.elevate {
            config
        } else {
            config.without_elevation()
        }
    }
}
