//! dnsmasq dialect: `dnsmasq.conf` and `dnsmasq.leases`.

use chrono::{DateTime, SecondsFormat};

use super::scan::is_dotted_quad;
use super::{config_token, lease_seconds, DhcpConfig, DhcpDialect, DhcpLease, LeaseStatus, UNKNOWN};
use crate::error::CoreError;

/// Lease time dnsmasq applies when the config does not say otherwise.
pub const DEFAULT_LEASE_TIME: &str = "3600";

/// Maximum lease time reported when `dhcp-range` carries none.
pub const DEFAULT_MAX_LEASE_TIME: &str = "7200";

/// The dnsmasq dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnsmasq;

impl DhcpDialect for Dnsmasq {
    fn name(&self) -> &'static str {
        "dnsmasq"
    }

    fn parse_config(&self, text: &str) -> DhcpConfig {
        parse_dnsmasq_config(text)
    }

    fn parse_leases(&self, text: &str) -> Vec<DhcpLease> {
        parse_dnsmasq_leases(text)
    }

    fn generate_config(&self, config: &DhcpConfig) -> Result<String, CoreError> {
        generate_dnsmasq_config(config)
    }

    fn merges_existing(&self) -> bool {
        true
    }

    fn merge_config(&self, existing: &str, config: &DhcpConfig) -> Result<String, CoreError> {
        merge_dnsmasq_config(existing, config)
    }
}

/// Read a `dnsmasq.conf` body.
///
/// dnsmasq has no subnet declaration, so `subnet` stays empty and `netmask`
/// is only filled when `dhcp-range` names one.
#[must_use]
pub fn parse_dnsmasq_config(text: &str) -> DhcpConfig {
    let mut config = DhcpConfig {
        default_lease_time: DEFAULT_LEASE_TIME.to_owned(),
        max_lease_time: DEFAULT_MAX_LEASE_TIME.to_owned(),
        ..DhcpConfig::default()
    };

    for line in text.lines().map(str::trim) {
        if let Some(spec) = line.strip_prefix("dhcp-range=") {
            apply_range(&mut config, spec);
        } else if let Some(spec) = line.strip_prefix("dhcp-option=") {
            let Some((code, values)) = spec.split_once(',') else {
                continue;
            };
            match code.trim() {
                "3" | "option:router" => config.routers = vec![values.trim().to_owned()],
                "6" | "option:dns-server" => {
                    config.dns_servers = values.split(',').map(|v| v.trim().to_owned()).collect();
                }
                _ => {}
            }
        }
    }

    config
}

fn apply_range(config: &mut DhcpConfig, spec: &str) {
    let parts: Vec<&str> = spec
        .split(',')
        .map(str::trim)
        .skip_while(|p| {
            ["set:", "tag:", "net:", "interface:"].iter().any(|prefix| p.starts_with(prefix))
        })
        .collect();

    config.range.start = parts.first().copied().unwrap_or_default().to_owned();
    config.range.end = parts.get(1).copied().unwrap_or_default().to_owned();

    match parts.get(2) {
        Some(mask) if is_dotted_quad(mask) => {
            config.netmask = (*mask).to_owned();
            if let Some(secs) = parts.get(3).and_then(|p| duration_seconds(p)) {
                config.max_lease_time = secs.to_string();
            }
        }
        Some(lease) => {
            if let Some(secs) = duration_seconds(lease) {
                config.max_lease_time = secs.to_string();
            }
        }
        None => {}
    }
}

/// dnsmasq lease durations: bare seconds or a single `s`/`m`/`h`/`d`/`w`
/// suffix.
fn duration_seconds(token: &str) -> Option<u64> {
    let (digits, unit) = match token.char_indices().last()? {
        (at, c) if c.is_ascii_alphabetic() => (&token[..at], c.to_ascii_lowercase()),
        _ => (token, 's'),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        'w' => 604_800,
        _ => return None,
    };
    digits.parse::<u64>().ok()?.checked_mul(scale)
}

/// Render a `dnsmasq.conf` fragment.
///
/// dnsmasq takes a single router per option 3, so only one is accepted.
///
/// # Errors
/// Returns [`CoreError::IncompleteConfig`] if only one range bound is set or
/// more than one router is given, and [`CoreError::InvalidConfigValue`] for
/// values that would break the file syntax.
pub fn generate_dnsmasq_config(config: &DhcpConfig) -> Result<String, CoreError> {
    let mut out = String::from("# Generated by routerctl\n");

    if !config.range.is_empty() {
        if config.range.start.is_empty() || config.range.end.is_empty() {
            return Err(CoreError::IncompleteConfig {
                reason: "range start and end must be set together".to_owned(),
            });
        }
        let mut range = vec![
            config_token("range.start", &config.range.start)?,
            config_token("range.end", &config.range.end)?,
        ];
        if !config.netmask.is_empty() {
            range.push(config_token("netmask", &config.netmask)?);
        }
        if !config.max_lease_time.is_empty() {
            range.push(lease_seconds("maxLeaseTime", &config.max_lease_time)?);
        }
        out.push_str(&format!("dhcp-range={}\n", range.join(",")));
    }

    match config.routers.as_slice() {
        [] => {}
        [router] => {
            let router = config_token("routers", router)?;
            out.push_str(&format!("dhcp-option=3,{router}\n"));
        }
        _ => {
            return Err(CoreError::IncompleteConfig {
                reason: "dnsmasq accepts a single router".to_owned(),
            })
        }
    }

    if !config.dns_servers.is_empty() {
        let servers = config
            .dns_servers
            .iter()
            .map(|s| config_token("dnsServers", s))
            .collect::<Result<Vec<_>, _>>()?;
        out.push_str(&format!("dhcp-option=6,{}\n", servers.join(",")));
    }

    Ok(out)
}

/// Replace the DHCP directives of an existing `dnsmasq.conf` body.
///
/// Every `dhcp-range`, router and DNS server option is dropped and the lines
/// rendered from `config` take the place of the first one. All other lines
/// are kept in order. With no such directive present the rendered lines are
/// appended.
///
/// # Errors
/// Same as [`generate_dnsmasq_config`].
pub fn merge_dnsmasq_config(existing: &str, config: &DhcpConfig) -> Result<String, CoreError> {
    let fragment = generate_dnsmasq_config(config)?;
    let managed: Vec<&str> = fragment.lines().filter(|l| !l.starts_with('#')).collect();

    let mut out = String::with_capacity(existing.len() + fragment.len());
    let mut placed = false;
    for line in existing.lines() {
        if !is_managed_directive(line) {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        if !placed {
            for directive in &managed {
                out.push_str(directive);
                out.push('\n');
            }
            placed = true;
        }
    }
    if !placed {
        for directive in &managed {
            out.push_str(directive);
            out.push('\n');
        }
    }

    Ok(out)
}

fn is_managed_directive(line: &str) -> bool {
    let line = line.trim();
    if line.starts_with("dhcp-range=") {
        return true;
    }
    line.strip_prefix("dhcp-option=")
        .and_then(|spec| spec.split_once(','))
        .is_some_and(|(code, _)| {
            matches!(code.trim(), "3" | "option:router" | "6" | "option:dns-server")
        })
}

/// Read a `dnsmasq.leases` body.
///
/// Each line is `<expiry> <mac> <ip> <hostname> <client-id>`. dnsmasq only
/// lists current bindings, so every lease is active.
#[must_use]
pub fn parse_dnsmasq_leases(text: &str) -> Vec<DhcpLease> {
    text.lines().filter_map(parse_lease_line).collect()
}

fn parse_lease_line(line: &str) -> Option<DhcpLease> {
    let mut fields = line.split_whitespace();
    let timestamp = fields.next()?;
    let mac = fields.next()?;
    let ip = fields.next()?;
    let hostname = fields.next().filter(|h| *h != "*").unwrap_or(UNKNOWN);

    Some(DhcpLease {
        ip: ip.to_owned(),
        mac: mac.to_owned(),
        hostname: hostname.to_owned(),
        start_time: iso_timestamp(timestamp).unwrap_or_else(|| UNKNOWN.to_owned()),
        end_time: None,
        status: LeaseStatus::Active,
    })
}

fn iso_timestamp(epoch_secs: &str) -> Option<String> {
    let secs = epoch_secs.parse::<i64>().ok()?;
    let at = DateTime::from_timestamp(secs, 0)?;
    Some(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
