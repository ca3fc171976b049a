//! ISC `dhcpd` dialect: `dhcpd.conf` and `dhcpd.leases`.

use super::scan::{after_keyword, find_dotted_quad, leading_digits};
use super::{config_token, lease_seconds, DhcpConfig, DhcpDialect, DhcpLease, LeaseStatus, UNKNOWN};
use crate::error::CoreError;

/// Marker present in a lease block whose binding is live.
const ACTIVE_MARKER: &str = "binding state active";

/// The ISC DHCP server dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct IscDhcp;

impl DhcpDialect for IscDhcp {
    fn name(&self) -> &'static str {
        "isc-dhcp"
    }

    fn parse_config(&self, text: &str) -> DhcpConfig {
        parse_isc_dhcp_config(text)
    }

    fn parse_leases(&self, text: &str) -> Vec<DhcpLease> {
        parse_isc_dhcp_leases(text)
    }

    fn generate_config(&self, config: &DhcpConfig) -> Result<String, CoreError> {
        generate_isc_dhcp_config(config)
    }
}

/// Read a `dhcpd.conf` body.
///
/// `range` is only honoured inside a `subnet` block; lease times, routers
/// and name servers are read wherever they appear. When several subnets are
/// declared the last one wins.
#[must_use]
pub fn parse_isc_dhcp_config(text: &str) -> DhcpConfig {
    let mut config = DhcpConfig::default();
    let mut inside_subnet = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.first() == Some(&"subnet") {
            inside_subnet = true;
            if let ["subnet", subnet, "netmask", netmask, ..] = words.as_slice() {
                config.subnet = (*subnet).to_owned();
                config.netmask = netmask.trim_end_matches(['{', ';']).to_owned();
            }
        } else if line.starts_with('}') {
            inside_subnet = false;
        } else if inside_subnet && line.contains("range") {
            if let Some((start, end)) = range_bounds(&words) {
                config.range.start = start.to_owned();
                config.range.end = end.to_owned();
            }
        } else if line.contains("default-lease-time") {
            if let Some(secs) = directive_number(line, "default-lease-time") {
                config.default_lease_time = secs.to_owned();
            }
        } else if line.contains("max-lease-time") {
            if let Some(secs) = directive_number(line, "max-lease-time") {
                config.max_lease_time = secs.to_owned();
            }
        } else if let Some(list) = option_value(line, "routers") {
            config.routers = split_list(list);
        } else if let Some(list) = option_value(line, "domain-name-servers") {
            config.dns_servers = split_list(list);
        }
    }

    config
}

fn range_bounds<'a>(words: &[&'a str]) -> Option<(&'a str, &'a str)> {
    let at = words.iter().position(|w| *w == "range")?;
    let mut rest = words[at + 1..].iter().copied().filter(|w| *w != "dynamic-bootp");
    let start = rest.next()?;
    let end = rest.next()?.trim_end_matches(';');
    Some((start, end))
}

fn directive_number<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = after_keyword(line, directive)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    leading_digits(rest.trim_start())
}

/// Value of `option <name> <value>;`, up to the last semicolon.
fn option_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix("option")?;
    let rest = rest.trim_start().strip_prefix(name)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let value = rest.trim_start();
    let end = value.rfind(';')?;
    (end > 0).then(|| &value[..end])
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|item| item.trim().to_owned()).collect()
}

/// Render a `dhcpd.conf` body.
///
/// Lease times are written globally. When a subnet is set, range, routers
/// and name servers are written inside its block; otherwise routers and name
/// servers are written globally and a range is rejected.
///
/// # Errors
/// Returns [`CoreError::IncompleteConfig`] when subnet/netmask or
/// range start/end are only partly set, or when a range has no subnet.
/// Returns [`CoreError::InvalidConfigValue`] for values that would break
/// the file syntax.
pub fn generate_isc_dhcp_config(config: &DhcpConfig) -> Result<String, CoreError> {
    let mut out = String::from("# Generated by routerctl\n");

    if !config.default_lease_time.is_empty() {
        let secs = lease_seconds("defaultLeaseTime", &config.default_lease_time)?;
        out.push_str(&format!("default-lease-time {secs};\n"));
    }
    if !config.max_lease_time.is_empty() {
        let secs = lease_seconds("maxLeaseTime", &config.max_lease_time)?;
        out.push_str(&format!("max-lease-time {secs};\n"));
    }

    let options = option_lines(config)?;
    let has_subnet = !config.subnet.is_empty() || !config.netmask.is_empty();

    if !config.range.is_empty() && !has_subnet {
        return Err(CoreError::IncompleteConfig {
            reason: "a range requires a subnet and netmask".to_owned(),
        });
    }

    if has_subnet {
        if config.subnet.is_empty() || config.netmask.is_empty() {
            return Err(CoreError::IncompleteConfig {
                reason: "subnet and netmask must be set together".to_owned(),
            });
        }
        let subnet = config_token("subnet", &config.subnet)?;
        let netmask = config_token("netmask", &config.netmask)?;
        out.push_str(&format!("\nsubnet {subnet} netmask {netmask} {{\n"));
        if !config.range.is_empty() {
            if config.range.start.is_empty() || config.range.end.is_empty() {
                return Err(CoreError::IncompleteConfig {
                    reason: "range start and end must be set together".to_owned(),
                });
            }
            let start = config_token("range.start", &config.range.start)?;
            let end = config_token("range.end", &config.range.end)?;
            out.push_str(&format!("  range {start} {end};\n"));
        }
        for line in &options {
            out.push_str(&format!("  {line}\n"));
        }
        out.push_str("}\n");
    } else {
        for line in &options {
            out.push_str(&format!("{line}\n"));
        }
    }

    Ok(out)
}

fn option_lines(config: &DhcpConfig) -> Result<Vec<String>, CoreError> {
    let mut lines = Vec::new();
    if !config.routers.is_empty() {
        let routers = joined_tokens("routers", &config.routers)?;
        lines.push(format!("option routers {routers};"));
    }
    if !config.dns_servers.is_empty() {
        let servers = joined_tokens("dnsServers", &config.dns_servers)?;
        lines.push(format!("option domain-name-servers {servers};"));
    }
    Ok(lines)
}

fn joined_tokens(field: &str, values: &[String]) -> Result<String, CoreError> {
    let tokens = values
        .iter()
        .map(|v| config_token(field, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tokens.join(", "))
}

/// Read a `dhcpd.leases` body.
///
/// The text is cut on every literal `lease` token and each piece is
/// inspected on its own; pieces without an IPv4 address are discarded.
#[must_use]
pub fn parse_isc_dhcp_leases(text: &str) -> Vec<DhcpLease> {
    text.split("lease")
        .filter(|block| !block.trim().is_empty())
        .filter_map(parse_lease_block)
        .collect()
}

fn parse_lease_block(block: &str) -> Option<DhcpLease> {
    let ip = find_dotted_quad(block)?;

    let mac = after_keyword(block, "hardware ethernet ").and_then(|rest| {
        let len = rest
            .find(|c: char| !(c.is_ascii_hexdigit() || c == ':'))
            .unwrap_or(rest.len());
        (len > 0 && rest[len..].starts_with(';')).then(|| &rest[..len])
    });

    let hostname = after_keyword(block, "client-hostname \"").and_then(|rest| {
        let len = rest.find('"')?;
        (len > 0 && rest[len..].starts_with("\";")).then(|| &rest[..len])
    });

    Some(DhcpLease {
        ip: ip.to_owned(),
        mac: mac.unwrap_or(UNKNOWN).to_owned(),
        hostname: hostname.unwrap_or(UNKNOWN).to_owned(),
        start_time: timestamp(block, "starts ").unwrap_or(UNKNOWN).to_owned(),
        end_time: Some(timestamp(block, "ends ").unwrap_or(UNKNOWN).to_owned()),
        status: if block.contains(ACTIVE_MARKER) {
            LeaseStatus::Active
        } else {
            LeaseStatus::Inactive
        },
    })
}

/// `<keyword><weekday> <date time>;` yields the date and time.
fn timestamp<'a>(block: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = after_keyword(block, keyword)?;
    let weekday = leading_digits(rest)?;
    let rest = rest[weekday.len()..].strip_prefix(' ')?;
    let end = rest.find(';')?;
    (end > 0).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::dhcp::LeaseRange;
    use crate::samples::{DHCPD_CONF, DHCPD_LEASES};

    #[test]
    fn parse_config_reads_subnet_block() {
        let config = parse_isc_dhcp_config(DHCPD_CONF);
        assert_eq!(config.subnet, "192.168.1.0");
        assert_eq!(config.netmask, "255.255.255.0");
        assert_eq!(config.range.start, "192.168.1.100");
        assert_eq!(config.range.end, "192.168.1.200");
        assert_eq!(config.default_lease_time, "600");
        assert_eq!(config.max_lease_time, "7200");
        assert_eq!(config.routers, vec!["192.168.1.1"]);
        assert_eq!(config.dns_servers, vec!["8.8.8.8", "8.8.4.4"]);
    }

    #[test]
    fn parse_config_ignores_range_outside_subnet() {
        let config = parse_isc_dhcp_config(
            "range 10.0.0.1 10.0.0.9;\nsubnet 10.0.0.0 netmask 255.0.0.0 {\n}\nrange 10.0.0.2 10.0.0.3;\n",
        );
        assert!(config.range.is_empty());
        assert_eq!(config.subnet, "10.0.0.0");
    }

    #[test]
    fn parse_config_accepts_dynamic_bootp_ranges() {
        let config = parse_isc_dhcp_config(
            "subnet 10.1.0.0 netmask 255.255.0.0 {\n  range dynamic-bootp 10.1.0.10 10.1.0.20;\n}\n",
        );
        assert_eq!(config.range.start, "10.1.0.10");
        assert_eq!(config.range.end, "10.1.0.20");
    }

    #[test]
    fn parse_config_skips_comments() {
        let config = parse_isc_dhcp_config("# option routers 1.1.1.1;\noption routers 2.2.2.2;\n");
        assert_eq!(config.routers, vec!["2.2.2.2"]);
    }

    #[test]
    fn parse_config_of_empty_text_is_default() {
        assert_eq!(parse_isc_dhcp_config(""), DhcpConfig::default());
    }

    #[test]
    fn generate_then_parse_round_trips_sample() {
        let parsed = parse_isc_dhcp_config(DHCPD_CONF);
        let text = match generate_isc_dhcp_config(&parsed) {
            Ok(t) => t,
            Err(e) => panic!("generation failed: {e}"),
        };
        assert_eq!(parse_isc_dhcp_config(&text), parsed);
    }

    #[test]
    fn generate_writes_options_globally_without_subnet() {
        let config = DhcpConfig {
            dns_servers: vec!["9.9.9.9".to_owned()],
            ..DhcpConfig::default()
        };
        let text = match generate_isc_dhcp_config(&config) {
            Ok(t) => t,
            Err(e) => panic!("generation failed: {e}"),
        };
        assert!(text.contains("\noption domain-name-servers 9.9.9.9;\n"));
        assert!(!text.contains("subnet"));
    }

    #[test]
    fn generate_rejects_range_without_subnet() {
        let config = DhcpConfig {
            range: LeaseRange { start: "10.0.0.2".to_owned(), end: "10.0.0.9".to_owned() },
            ..DhcpConfig::default()
        };
        assert!(matches!(
            generate_isc_dhcp_config(&config),
            Err(CoreError::IncompleteConfig { .. })
        ));
    }

    #[test]
    fn generate_rejects_injected_directives() {
        let config = DhcpConfig {
            subnet: "10.0.0.0".to_owned(),
            netmask: "255.0.0.0 { } subnet".to_owned(),
            ..DhcpConfig::default()
        };
        assert!(matches!(
            generate_isc_dhcp_config(&config),
            Err(CoreError::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn parse_leases_reads_every_block() {
        let leases = parse_isc_dhcp_leases(DHCPD_LEASES);
        assert_eq!(leases.len(), 2);

        let first = &leases[0];
        assert_eq!(first.ip, "192.168.1.100");
        assert_eq!(first.mac, "00:11:22:33:44:55");
        assert_eq!(first.hostname, "laptop");
        assert_eq!(first.start_time, "2023/11/14 10:00:00");
        assert_eq!(first.end_time.as_deref(), Some("2023/11/14 10:10:00"));
        assert_eq!(first.status, LeaseStatus::Active);

        let second = &leases[1];
        assert_eq!(second.ip, "192.168.1.101");
        assert_eq!(second.hostname, UNKNOWN);
        assert_eq!(second.end_time.as_deref(), Some(UNKNOWN), "`ends never;` has no date");
        assert_eq!(second.status, LeaseStatus::Inactive);
    }

    #[test]
    fn parse_leases_discards_blocks_without_address() {
        let leases = parse_isc_dhcp_leases("lease {\n  starts 1 2023/01/01 00:00:00;\n}\n");
        assert!(leases.is_empty());
    }

    fn octet() -> impl Strategy<Value = u8> {
        any::<u8>()
    }

    fn address() -> impl Strategy<Value = String> {
        (octet(), octet(), octet(), octet()).prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
    }

    fn seconds() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), (0u32..1_000_000).prop_map(|s| s.to_string())]
    }

    fn isc_config() -> impl Strategy<Value = DhcpConfig> {
        let subnet_part = prop_oneof![
            Just(None),
            (address(), address(), proptest::option::of((address(), address()))).prop_map(Some),
        ];
        (
            subnet_part,
            seconds(),
            seconds(),
            proptest::collection::vec(address(), 0..3),
            proptest::collection::vec(address(), 0..4),
        )
            .prop_map(|(subnet_part, default_lease_time, max_lease_time, routers, dns_servers)| {
                let mut config = DhcpConfig {
                    default_lease_time,
                    max_lease_time,
                    routers,
                    dns_servers,
                    ..DhcpConfig::default()
                };
                if let Some((subnet, netmask, range)) = subnet_part {
                    config.subnet = subnet;
                    config.netmask = netmask;
                    if let Some((start, end)) = range {
                        config.range = LeaseRange { start, end };
                    }
                }
                config
            })
    }

    proptest! {
        #[test]
        fn proptest_generate_parse_round_trip(config in isc_config()) {
            let text = generate_isc_dhcp_config(&config);
            prop_assert!(text.is_ok(), "generation failed: {:?}", text);
            let text = text.unwrap_or_default();
            let reparsed = parse_isc_dhcp_config(&text);
            prop_assert_eq!(&reparsed, &config);

            let again = generate_isc_dhcp_config(&reparsed).unwrap_or_default();
            prop_assert_eq!(parse_isc_dhcp_config(&again), reparsed);
        }

        #[test]
        fn proptest_parse_leases_never_panics(text in "(lease|[0-9. ;a-z\"{}\n]){0,64}") {
            for lease in parse_isc_dhcp_leases(&text) {
                prop_assert!(crate::dhcp::is_dotted_quad(&lease.ip));
            }
        }
    }
}
