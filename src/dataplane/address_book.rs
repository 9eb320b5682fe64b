//! The fixed identities the bridge sits between

use crate::protocol::MacAddr;
use std::net::Ipv4Addr;

/// A host on the segment: its real MAC and its IPv4 address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl Identity {
    pub fn new(mac: MacAddr, ip: Ipv4Addr) -> Self {
        Self { mac, ip }
    }
}

/// Remote, gateway and virtual identities, plus the local host's MAC when
/// redirect mode needs it.
///
/// Built once at startup and never mutated afterwards. Pairwise distinct
/// MACs are expected but not enforced; see `config::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBook {
    remote: Identity,
    gateway: Identity,
    virtual_mac: MacAddr,
    local: Option<MacAddr>,
}

impl AddressBook {
    pub fn new(remote: Identity, gateway: Identity, virtual_mac: MacAddr) -> Self {
        Self {
            remote,
            gateway,
            virtual_mac,
            local: None,
        }
    }

    /// Attach the local host's MAC (redirect mode only)
    pub fn with_local(mut self, local: MacAddr) -> Self {
        self.local = Some(local);
        self
    }

    pub fn remote(&self) -> Identity {
        self.remote
    }

    pub fn gateway(&self) -> Identity {
        self.gateway
    }

    pub fn virtual_mac(&self) -> MacAddr {
        self.virtual_mac
    }

    pub fn local(&self) -> Option<MacAddr> {
        self.local
    }

    /// IPv4 address owned by the peer with this MAC, if it is one of ours
    pub fn ip_associated_with(&self, mac: MacAddr) -> Option<Ipv4Addr> {
        if mac == self.remote.mac {
            Some(self.remote.ip)
        } else if mac == self.gateway.mac {
            Some(self.gateway.ip)
        } else {
            None
        }
    }
}
