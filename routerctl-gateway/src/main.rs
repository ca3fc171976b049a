//! Entry point for the `routerctl-gateway` HTTP server.

use std::sync::Arc;

use routerctl_executor::{ExecLimits, SystemRunner};
use routerctl_gateway::{
    config::GatewayConfig,
    routes::{create_router, AppState},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::from_env();
    let runner = Arc::new(SystemRunner::new(ExecLimits::default()));
    let app = create_router(AppState::new(Arc::clone(&runner), Arc::new(config.service_config())));

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %config.listen_addr,
        elevate = config.elevate,
        timeout_secs = runner.limits().timeout.as_secs(),
        "routerctl-gateway listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
