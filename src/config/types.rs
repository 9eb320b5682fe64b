//! Configuration types

use super::Cli;
use crate::dataplane::{AddressBook, Identity, PolicyConfig, RedirectMode, Timers};
use crate::protocol::MacAddr;
use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_INTERFACE: &str = "eth0";

/// Optional settings file (`-c FILE`). Every key has a default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SettingsFile {
    pub logging: LogConfig,
    pub timers: TimerConfig,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerConfig {
    pub announce_interval_secs: u64,
    pub receive_timeout_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            announce_interval_secs: 10,
            receive_timeout_secs: 60,
        }
    }
}

impl From<TimerConfig> for Timers {
    fn from(cfg: TimerConfig) -> Self {
        Timers {
            announce_interval: Duration::from_secs(cfg.announce_interval_secs),
            receive_timeout: Duration::from_secs(cfg.receive_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub interface: Option<String>,
    pub filter_ports: Vec<u16>,
}

/// Where the bridge's impersonating MAC comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualMac {
    /// Picked at random at startup
    Generated(MacAddr),
    /// Given with `-b`
    Explicit(MacAddr),
    /// The interface's own hardware address (`-l`)
    Interface,
}

impl VirtualMac {
    pub fn resolve(&self, interface_mac: MacAddr) -> MacAddr {
        match self {
            VirtualMac::Generated(mac) | VirtualMac::Explicit(mac) => *mac,
            VirtualMac::Interface => interface_mac,
        }
    }
}

/// Command line and settings file merged into one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub remote: Identity,
    pub gateway: Identity,
    pub virtual_mac: VirtualMac,
    pub forwarding_enabled: bool,
    pub filter_ports: BTreeSet<u16>,
    pub redirect: RedirectMode,
    pub interface: String,
    pub timers: TimerConfig,
    pub logging: LogConfig,
}

impl Settings {
    /// Merge the command line over the settings file. Filter ports from
    /// both are combined.
    pub fn from_cli(cli: Cli, file: SettingsFile) -> Self {
        let virtual_mac = if cli.local_mac {
            VirtualMac::Interface
        } else if let Some(mac) = cli.bridge_mac {
            VirtualMac::Explicit(mac)
        } else {
            VirtualMac::Generated(MacAddr::random_local())
        };

        let redirect = match cli.redirect {
            None => RedirectMode::Off,
            Some(None) => RedirectMode::ToLocal,
            Some(Some(mac)) => RedirectMode::ToMac(mac),
        };

        let interface = cli
            .interface
            .or(file.bridge.interface)
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

        let filter_ports = cli
            .ports
            .into_iter()
            .chain(file.bridge.filter_ports)
            .collect();

        Self {
            remote: Identity::new(cli.remote_mac, cli.remote_ip),
            gateway: Identity::new(cli.gateway_mac, cli.gateway_ip),
            virtual_mac,
            forwarding_enabled: !cli.no_forward,
            filter_ports,
            redirect,
            interface,
            timers: file.timers,
            logging: file.logging,
        }
    }

    /// Fix the identities and the policy once the interface MAC is known.
    ///
    /// A virtual MAC equal to the interface's own address puts the bridge
    /// in own-MAC mode.
    pub fn resolve(&self, interface_mac: MacAddr) -> (AddressBook, PolicyConfig) {
        let virtual_mac = self.virtual_mac.resolve(interface_mac);
        let own_mac_mode = virtual_mac == interface_mac;

        let mut book = AddressBook::new(self.remote, self.gateway, virtual_mac);
        if self.redirect.is_active() {
            book = book.with_local(interface_mac);
        }

        let policy = PolicyConfig::new(
            self.forwarding_enabled,
            self.redirect,
            own_mac_mode,
            self.filter_ports.iter().copied(),
        );

        (book, policy)
    }

    pub fn timers(&self) -> Timers {
        self.timers.into()
    }
}
