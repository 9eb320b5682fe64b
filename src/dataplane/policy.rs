//! Relay policy fixed at startup

use crate::dataplane::{AddressBook, FilterPolarity, PortFilter};
use crate::protocol::MacAddr;

/// Where suppressed traffic goes instead of being dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    #[default]
    Off,
    /// To the MAC of the interface the bridge runs on
    ToLocal,
    /// To an explicitly configured MAC
    ToMac(MacAddr),
}

impl RedirectMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, RedirectMode::Off)
    }

    /// Resolve the redirect destination against the address book
    pub fn target(&self, book: &AddressBook) -> Option<MacAddr> {
        match self {
            RedirectMode::Off => None,
            RedirectMode::ToLocal => book.local(),
            RedirectMode::ToMac(mac) => Some(*mac),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub forwarding_enabled: bool,
    pub redirect: RedirectMode,
    /// The virtual MAC is the interface's own hardware address
    pub own_mac_mode: bool,
    pub filter: PortFilter,
}

impl PolicyConfig {
    pub fn new(
        forwarding_enabled: bool,
        redirect: RedirectMode,
        own_mac_mode: bool,
        filter_ports: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            forwarding_enabled,
            redirect,
            own_mac_mode,
            filter: PortFilter::new(
                filter_ports,
                FilterPolarity::for_forwarding(forwarding_enabled),
            ),
        }
    }

    /// Nothing is ever relayed: the bridge only answers ARP
    pub fn is_passive(&self) -> bool {
        !self.forwarding_enabled && !self.filter.is_active() && !self.redirect.is_active()
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::new(true, RedirectMode::Off, false, std::iter::empty())
    }
}
