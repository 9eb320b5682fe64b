//! Command-line surface

use crate::protocol::{parse_ipv4, MacAddr};
use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "arpbridge",
    version,
    about = "Sit between two hosts on a LAN by spoofing ARP and relay their traffic"
)]
pub struct Cli {
    /// Do not forward traffic between the two hosts
    #[arg(short = 'd', long = "no-forward")]
    pub no_forward: bool,

    /// Network interface to use (default eth0)
    #[arg(short = 'i', long, value_name = "IFACE")]
    pub interface: Option<String>,

    /// Use the interface's own MAC as the bridge identity
    #[arg(short = 'l', long = "local-mac", conflicts_with = "bridge_mac")]
    pub local_mac: bool,

    /// MAC to impersonate both hosts with (random when omitted)
    #[arg(short = 'b', long = "bridge-mac", value_name = "MAC")]
    pub bridge_mac: Option<MacAddr>,

    /// TCP/UDP port to filter: dropped while forwarding, passed with -d
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub ports: Vec<u16>,

    /// Redirect filtered traffic to this host, or to MAC with -r=MAC
    #[arg(
        short = 'r',
        long = "redirect",
        value_name = "MAC",
        num_args = 0..=1,
        require_equals = true
    )]
    pub redirect: Option<Option<MacAddr>>,

    /// TOML settings file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// MAC address of the remote host
    #[arg(value_name = "REMOTE_MAC")]
    pub remote_mac: MacAddr,

    /// MAC address of the gateway
    #[arg(value_name = "GATEWAY_MAC")]
    pub gateway_mac: MacAddr,

    /// IPv4 address of the remote host
    #[arg(value_name = "REMOTE_IP", value_parser = parse_ipv4)]
    pub remote_ip: Ipv4Addr,

    /// IPv4 address of the gateway
    #[arg(value_name = "GATEWAY_IP", value_parser = parse_ipv4)]
    pub gateway_ip: Ipv4Addr,
}
