//! Axum route handlers for the routerctl API.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use routerctl_executor::{CommandRunner, DhcpService, FirewallService, NetworkService, ServiceConfig};
use serde::Serialize;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::GatewayError, validate};

// ── Shared state ─────────────────────────────────────────────────────────────

/// Services shared by every handler, built once at startup.
pub struct AppState<R: CommandRunner> {
    pub firewall: Arc<FirewallService<R>>,
    pub dhcp: Arc<DhcpService<R>>,
    pub network: Arc<NetworkService<R>>,
}

impl<R: CommandRunner> AppState<R> {
    #[must_use]
    pub fn new(runner: Arc<R>, config: Arc<ServiceConfig>) -> Self {
        Self {
            firewall: Arc::new(FirewallService::new(Arc::clone(&runner), Arc::clone(&config))),
            dhcp: Arc::new(DhcpService::new(Arc::clone(&runner), config)),
            network: Arc::new(NetworkService::new(runner)),
        }
    }
}

impl<R: CommandRunner> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            firewall: Arc::clone(&self.firewall),
            dhcp: Arc::clone(&self.dhcp),
            network: Arc::clone(&self.network),
        }
    }
}

// ── Response types ───────────────────────────────────────────────────────────

/// `{success: true, data}` envelope for reads.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

/// `{success: true, message}` envelope for changes.
#[derive(Debug, Serialize)]
pub struct DoneResponse {
    pub success: bool,
    pub message: &'static str,
}

fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse { success: true, data })
}

fn done(message: &'static str) -> Json<DoneResponse> {
    Json(DoneResponse { success: true, message })
}

/// `GET /api/network/test` body.
#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the application router over the given services.
pub fn create_router<R: CommandRunner + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .route("/api/network/status", get(network_status::<R>))
        .route("/api/network/route", get(routing_table::<R>).post(add_route::<R>))
        .route("/api/network/test", get(api_test))
        .route("/api/network/route-form", get(route_form))
        .route("/api/dhcp/clients", get(dhcp_clients::<R>))
        .route("/api/dhcp/config", get(dhcp_config::<R>).post(update_dhcp_config::<R>))
        .route(
            "/api/firewall/rules",
            get(firewall_rules::<R>).post(add_rule::<R>).delete(flush_rules::<R>),
        )
        .route("/api/firewall/rules/{chain}/{rule_number}", delete(delete_rule::<R>))
        .route("/api/firewall/policy", post(set_policy::<R>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Parse a request body as JSON, whatever its content type.
fn json_body(body: &Bytes) -> Result<Value, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::MalformedBody(e.to_string()))
}

// ── Network ──────────────────────────────────────────────────────────────────

/// `GET /api/network/status`: raw `ip a` and `ip route` text.
///
/// # Errors
/// Returns [`GatewayError::Service`] if either command fails.
pub async fn network_status<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.network.status().await?))
}

/// `GET /api/network/route`: raw routing table.
///
/// # Errors
/// Returns [`GatewayError::Service`] if `ip route` fails.
pub async fn routing_table<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(data(state.network.routes().await?))
}

/// `POST /api/network/route`: add a static route.
///
/// # Errors
/// Returns [`GatewayError::Validation`] for a bad destination or gateway,
/// or [`GatewayError::Service`] if the kernel rejects the route.
pub async fn add_route<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let route = validate::route_change(&json_body(&body)?).map_err(GatewayError::Validation)?;
    state.network.add_route(&route.destination, route.gateway).await?;
    Ok(done("Route updated successfully"))
}

/// `GET /api/network/test`: liveness probe.
pub async fn api_test() -> impl IntoResponse {
    Json(TestResponse {
        status: "ok",
        message: "API is working",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

const ROUTE_FORM: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <h2>Add New Route</h2>
    <form id="routeForm">
      <div>
        <label>Destination:</label>
        <input type="text" name="destination" required>
      </div>
      <div>
        <label>Gateway:</label>
        <input type="text" name="gateway" required>
      </div>
      <button type="submit">Add Route</button>
    </form>
    <pre id="result"></pre>
    <script>
      document.getElementById('routeForm').onsubmit = async (e) => {
        e.preventDefault();
        const form = new FormData(e.target);
        const out = document.getElementById('result');
        try {
          const response = await fetch('/api/network/route', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({
              destination: form.get('destination'),
              gateway: form.get('gateway')
            })
          });
          out.textContent = JSON.stringify(await response.json(), null, 2);
        } catch (error) {
          out.textContent = 'Error: ' + error.message;
        }
      };
    </script>
  </body>
</html>
"#;

/// `GET /api/network/route-form`: minimal page for adding a route.
pub async fn route_form() -> Html<&'static str> {
    Html(ROUTE_FORM)
}

// ── DHCP ─────────────────────────────────────────────────────────────────────

/// `GET /api/dhcp/clients`: current leases.
///
/// # Errors
/// Returns [`GatewayError::Service`] if no lease source can be read.
pub async fn dhcp_clients<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(data(state.dhcp.clients().await?))
}

/// `GET /api/dhcp/config`: current server settings.
///
/// # Errors
/// Returns [`GatewayError::Service`] if no config file exists.
pub async fn dhcp_config<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(data(state.dhcp.config().await?))
}

/// `POST /api/dhcp/config`: replace the server settings and restart it.
///
/// # Errors
/// Returns [`GatewayError::Validation`] for a malformed config, or
/// [`GatewayError::Service`] if any step of the update fails.
pub async fn update_dhcp_config<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let config = validate::dhcp_config(&json_body(&body)?).map_err(GatewayError::Validation)?;
    state.dhcp.update_config(&config).await?;
    Ok(done("DHCP configuration updated successfully"))
}

// ── Firewall ─────────────────────────────────────────────────────────────────

/// `GET /api/firewall/rules`: parsed `iptables-save` output.
///
/// # Errors
/// Returns [`GatewayError::Service`] if the rules cannot be read.
pub async fn firewall_rules<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(data(state.firewall.rules().await?))
}

/// `POST /api/firewall/rules`: append a rule.
///
/// # Errors
/// Returns [`GatewayError::Validation`] for a malformed rule, or
/// [`GatewayError::Service`] if the rule is rejected or not saved.
pub async fn add_rule<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let request = validate::rule_request(&json_body(&body)?).map_err(GatewayError::Validation)?;
    state.firewall.add_rule(&request).await?;
    Ok(done("Firewall rule added"))
}

/// `DELETE /api/firewall/rules/{chain}/{rule_number}`: delete one rule.
///
/// # Errors
/// Returns [`GatewayError::Validation`] for a bad rule number, or
/// [`GatewayError::Service`] if the deletion fails or is not saved.
pub async fn delete_rule<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
    Path((chain, rule_number)): Path<(String, String)>,
) -> Result<impl IntoResponse, GatewayError> {
    let (chain, number) =
        validate::rule_position(&chain, &rule_number).map_err(GatewayError::Validation)?;
    state.firewall.delete_rule(&chain, number).await?;
    Ok(done("Firewall rule deleted"))
}

/// `DELETE /api/firewall/rules`: flush every chain.
///
/// # Errors
/// Returns [`GatewayError::Service`] if the flush fails or is not saved.
pub async fn flush_rules<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
) -> Result<impl IntoResponse, GatewayError> {
    state.firewall.flush_rules().await?;
    Ok(done("Firewall rules flushed"))
}

/// `POST /api/firewall/policy`: set a chain's default policy.
///
/// # Errors
/// Returns [`GatewayError::Validation`] for an unknown policy, or
/// [`GatewayError::Service`] if the change fails or is not saved.
pub async fn set_policy<R: CommandRunner + 'static>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let change = validate::policy_change(&json_body(&body)?).map_err(GatewayError::Validation)?;
    state.firewall.set_default_policy(&change.chain, change.policy).await?;
    Ok(done("Default policy updated"))
}
