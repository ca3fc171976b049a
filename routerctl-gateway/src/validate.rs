//! Request body validation.
//!
//! Bodies arrive as untyped JSON so every problem can be reported per field
//! in one response instead of failing on the first serde error.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use routerctl_core::dhcp::is_dotted_quad;
use routerctl_core::{DhcpConfig, LeaseRange, Policy, RuleRequest};
use serde::Serialize;
use serde_json::Value;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path into the body, e.g. `range.start`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// A validated `POST /api/firewall/policy` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub chain: String,
    pub policy: Policy,
}

/// A validated `POST /api/network/route` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    /// As submitted; already known to parse as an IPv4 network or be
    /// `default`.
    pub destination: String,
    pub gateway: Ipv4Addr,
}

/// Collects field errors while pulling values out of a body.
struct Fields<'a> {
    body: &'a Value,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value) -> Self {
        Self { body, errors: Vec::new() }
    }

    fn reject(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Value at a dotted path; `null` counts as absent.
    fn get(&self, path: &str) -> Option<&'a Value> {
        path.split('.')
            .try_fold(self.body, |value, key| value.get(key))
            .filter(|value| !value.is_null())
    }

    fn required_string(&mut self, path: &str) -> String {
        match self.get(path) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) | None => {
                self.reject(path, "is required");
                String::new()
            }
            Some(_) => {
                self.reject(path, "must be a string");
                String::new()
            }
        }
    }

    fn optional_string(&mut self, path: &str) -> Option<String> {
        match self.get(path) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.reject(path, "must be a string");
                None
            }
        }
    }

    /// A non-empty string without whitespace, suitable as one argument.
    /// A leading `-` would be read as an option, so it is refused too.
    fn token(&mut self, path: &str) -> String {
        let value = self.required_string(path);
        if value.contains(char::is_whitespace) {
            self.reject(path, "must not contain whitespace");
        } else if value.starts_with('-') {
            self.reject(path, "must not start with '-'");
        }
        value
    }

    fn dotted_quad(&mut self, path: &str) -> String {
        let value = self.required_string(path);
        if !value.is_empty() && !is_dotted_quad(&value) {
            self.reject(path, "must be a dotted-quad IPv4 address");
        }
        value
    }

    /// Whole seconds, given as a JSON integer or a string of digits.
    fn seconds(&mut self, path: &str) -> String {
        match self.get(path) {
            Some(Value::Number(n)) if n.is_u64() => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.clone()
            }
            None => {
                self.reject(path, "is required");
                String::new()
            }
            Some(_) => {
                self.reject(path, "must be a non-negative integer");
                String::new()
            }
        }
    }

    fn address_list(&mut self, path: &str) -> Vec<String> {
        let Some(Value::Array(items)) = self.get(path) else {
            self.reject(path, "must be an array");
            return Vec::new();
        };
        let mut addresses = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) if is_dotted_quad(s) => addresses.push(s.to_owned()),
                _ => self.reject(&format!("{path}[{i}]"), "must be a dotted-quad IPv4 address"),
            }
        }
        addresses
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// Validate a `POST /api/dhcp/config` body. Every field is required.
///
/// # Errors
/// Returns every field that is missing or malformed.
pub fn dhcp_config(body: &Value) -> Result<DhcpConfig, Vec<FieldError>> {
    let mut fields = Fields::new(body);
    let config = DhcpConfig {
        subnet: fields.dotted_quad("subnet"),
        netmask: fields.dotted_quad("netmask"),
        range: LeaseRange {
            start: fields.dotted_quad("range.start"),
            end: fields.dotted_quad("range.end"),
        },
        default_lease_time: fields.seconds("defaultLeaseTime"),
        max_lease_time: fields.seconds("maxLeaseTime"),
        routers: fields.address_list("routers"),
        dns_servers: fields.address_list("dnsServers"),
    };
    fields.finish(config)
}

/// Validate a `POST /api/firewall/rules` body.
///
/// # Errors
/// Returns every field that is missing or malformed.
pub fn rule_request(body: &Value) -> Result<RuleRequest, Vec<FieldError>> {
    let mut fields = Fields::new(body);
    let request = RuleRequest {
        chain: fields.token("chain"),
        protocol: fields.optional_string("protocol"),
        source: fields.optional_string("source"),
        destination: fields.optional_string("destination"),
        ports: fields.optional_string("ports"),
        state: fields.optional_string("state"),
        target: fields.token("target"),
    };
    fields.finish(request)
}

/// Validate a `POST /api/firewall/policy` body.
///
/// # Errors
/// Returns every field that is missing or malformed.
pub fn policy_change(body: &Value) -> Result<PolicyChange, Vec<FieldError>> {
    let mut fields = Fields::new(body);
    let chain = fields.token("chain");
    let policy = match fields.get("policy").and_then(Value::as_str).map(str::parse::<Policy>) {
        Some(Ok(policy)) => Some(policy),
        _ => {
            fields.reject("policy", "must be one of ACCEPT, DROP, REJECT");
            None
        }
    };
    match policy {
        Some(policy) => fields.finish(PolicyChange { chain, policy }),
        None => Err(fields.errors),
    }
}

/// Validate a `POST /api/network/route` body.
///
/// # Errors
/// Returns every field that is missing or malformed.
pub fn route_change(body: &Value) -> Result<RouteChange, Vec<FieldError>> {
    let mut fields = Fields::new(body);
    let destination = fields.token("destination");
    if !destination.is_empty()
        && destination != "default"
        && destination.parse::<Ipv4Network>().is_err()
    {
        fields.reject("destination", "must be an IPv4 address, a CIDR block or 'default'");
    }
    let gateway = fields.required_string("gateway");
    let gateway = match gateway.parse::<Ipv4Addr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            if !gateway.is_empty() {
                fields.reject("gateway", "must be an IPv4 address");
            }
            None
        }
    };
    match gateway {
        Some(gateway) => fields.finish(RouteChange { destination, gateway }),
        None => Err(fields.errors),
    }
}

/// Validate the path of `DELETE /api/firewall/rules/{chain}/{ruleNumber}`.
///
/// # Errors
/// Returns an error for an empty chain or a rule number that is not a
/// positive integer.
pub fn rule_position(chain: &str, rule_number: &str) -> Result<(String, u32), Vec<FieldError>> {
    let mut errors = Vec::new();
    if chain.trim().is_empty() || chain.contains(char::is_whitespace) {
        errors.push(FieldError::new("chain", "must be a chain name"));
    } else if chain.starts_with('-') {
        errors.push(FieldError::new("chain", "must not start with '-'"));
    }
    let number = match rule_number.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            errors.push(FieldError::new("ruleNumber", "must be a positive integer"));
            0
        }
    };
    if errors.is_empty() {
        Ok((chain.to_owned(), number))
    } else {
        Err(errors)
    }
}
