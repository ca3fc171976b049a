//! Lease recovery from DHCP server log lines.
//!
//! Used when neither lease file exists. Only acknowledgements are read:
//!
//! ```text
//! Nov 14 22:13:20 gw dhcpd[812]: DHCPACK on 192.168.1.50 to aa:bb:cc:dd:ee:ff (myhost) via eth0
//! Nov 14 22:13:20 gw dnsmasq-dhcp[77]: DHCPACK(br0) 192.168.1.50 aa:bb:cc:dd:ee:ff myhost
//! ```

use indexmap::IndexMap;

use super::scan::is_dotted_quad;
use super::{DhcpLease, LeaseStatus, UNKNOWN};

const ACK: &str = "DHCPACK";

/// Collect one lease per acknowledged address. A later acknowledgement of
/// the same address replaces the earlier one and moves it to the end.
#[must_use]
pub fn parse_journal_leases(text: &str) -> Vec<DhcpLease> {
    let mut leases: IndexMap<String, DhcpLease> = IndexMap::new();

    for line in text.lines() {
        let Some(at) = line.find(ACK) else {
            continue;
        };
        let rest = &line[at + ACK.len()..];
        let parsed = if let Some(isc) = rest.strip_prefix(" on ") {
            isc_ack(isc)
        } else if rest.starts_with('(') {
            dnsmasq_ack(rest)
        } else {
            None
        };

        if let Some((ip, mac, hostname)) = parsed {
            leases.shift_remove(ip);
            leases.insert(
                ip.to_owned(),
                DhcpLease {
                    ip: ip.to_owned(),
                    mac: mac.to_owned(),
                    hostname: hostname.unwrap_or(UNKNOWN).to_owned(),
                    start_time: log_timestamp(&line[..at]),
                    end_time: None,
                    status: LeaseStatus::Active,
                },
            );
        }
    }

    leases.into_values().collect()
}

type Ack<'a> = (&'a str, &'a str, Option<&'a str>);

/// `<ip> to <mac> [(<host>)] via <iface>`
fn isc_ack(rest: &str) -> Option<Ack<'_>> {
    let mut words = rest.split_whitespace();
    let ip = words.next().filter(|ip| is_dotted_quad(ip))?;
    if words.next()? != "to" {
        return None;
    }
    let mac = words.next()?;
    let hostname = words
        .next()
        .and_then(|w| w.strip_prefix('('))
        .and_then(|w| w.strip_suffix(')'))
        .filter(|h| !h.is_empty());
    Some((ip, mac, hostname))
}

/// `(<iface>) <ip> <mac> [<host>]`
fn dnsmasq_ack(rest: &str) -> Option<Ack<'_>> {
    let (_, after) = rest.split_once(')')?;
    let mut words = after.split_whitespace();
    let ip = words.next().filter(|ip| is_dotted_quad(ip))?;
    let mac = words.next()?;
    Some((ip, mac, words.next()))
}

/// Syslog prefix timestamp: `Nov 14 22:13:20` or a single ISO-8601 token.
fn log_timestamp(prefix: &str) -> String {
    let words: Vec<&str> = prefix.split_whitespace().collect();
    match words.as_slice() {
        [iso, ..] if iso.contains('T') && iso.contains('-') => (*iso).to_owned(),
        [month, day, time, ..] => format!("{month} {day} {time}"),
        _ => UNKNOWN.to_owned(),
    }
}
