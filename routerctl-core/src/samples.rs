//! Representative text captured from the tools and files routerctl reads.
//!
//! Shared by unit tests across the workspace and by the fuzz corpus.

/// `iptables-save` output with a NAT table and a filter table.
pub const IPTABLES_SAVE: &str = "\
# Generated by iptables-save v1.8.7 on Tue Nov 14 22:13:20 2023
*nat
:PREROUTING ACCEPT [12:720]
:INPUT ACCEPT [0:0]
:OUTPUT ACCEPT [4:256]
:POSTROUTING ACCEPT [0:0]
-A POSTROUTING -s 192.168.1.0/24 -o eth0 -j MASQUERADE
COMMIT
# Completed on Tue Nov 14 22:13:20 2023
*filter
:INPUT DROP [120:9600]
:FORWARD ACCEPT [0:0]
:OUTPUT ACCEPT [300:24000]
-A INPUT -i lo -j ACCEPT
-A INPUT -m state --state RELATED,ESTABLISHED -j ACCEPT
-A INPUT -p tcp -m tcp --dport 22 -j ACCEPT
-A INPUT -p udp -m udp --dport 53 -j ACCEPT
-A FORWARD -s 192.168.1.0/24 -d 0.0.0.0/0 -j ACCEPT
COMMIT
";

/// `dhcpd.conf` with global lease times and one subnet.
pub const DHCPD_CONF: &str = "\
# dhcpd.conf
ddns-update-style none;
default-lease-time 600;
max-lease-time 7200;
authoritative;

subnet 192.168.1.0 netmask 255.255.255.0 {
  range 192.168.1.100 192.168.1.200;
  option routers 192.168.1.1;
  option domain-name-servers 8.8.8.8, 8.8.4.4;
}
";

/// `dhcpd.leases` with one active and one expired binding.
pub const DHCPD_LEASES: &str = "\
# The format of this file is documented in the dhcpd.leases(5) manual page.
# This lease file was written by isc-dhcp-4.4.1

lease 192.168.1.100 {
  starts 2 2023/11/14 10:00:00;
  ends 2 2023/11/14 10:10:00;
  cltt 2 2023/11/14 10:00:00;
  binding state active;
  next binding state free;
  hardware ethernet 00:11:22:33:44:55;
  client-hostname \"laptop\";
}
lease 192.168.1.101 {
  starts 1 2023/11/13 08:00:00;
  ends never;
  binding state free;
  hardware ethernet 66:77:88:99:aa:bb;
}
";

/// `dnsmasq.conf` fragment with a DHCP range and router/DNS options.
pub const DNSMASQ_CONF: &str = "\
interface=br0
dhcp-range=192.168.50.10,192.168.50.150,12h
dhcp-option=3,192.168.50.1
dhcp-option=6,1.1.1.1,9.9.9.9
";

/// `dnsmasq.leases` with a named and an anonymous client.
pub const DNSMASQ_LEASES: &str = "\
1700000000 aa:bb:cc:dd:ee:ff 192.168.50.20 myhost 01:aa:bb:cc:dd:ee:ff

1700003600 11:22:33:44:55:66 192.168.50.21 * *
";

/// `journalctl -u dhcpd` output mixing both servers' log formats.
pub const DHCP_JOURNAL: &str = "\
Nov 14 22:13:19 gw dhcpd[812]: DHCPREQUEST for 192.168.1.50 from aa:bb:cc:dd:ee:ff via eth0
Nov 14 22:13:20 gw dhcpd[812]: DHCPACK on 192.168.1.50 to aa:bb:cc:dd:ee:ff (myhost) via eth0
Nov 14 22:15:02 gw dnsmasq-dhcp[77]: DHCPACK(br0) 192.168.1.60 11:22:33:44:55:66
Nov 14 22:20:00 gw dhcpd[812]: DHCPACK on 192.168.1.50 to aa:bb:cc:dd:ee:ff (myhost) via eth0
";
