//! TCP/UDP port filter
//!
//! Matches an IPv4 packet when either of its two port fields is listed.
//! What a match means depends on the polarity: with forwarding enabled the
//! listed ports are held back, with forwarding disabled they are the only
//! traffic let through.

use crate::protocol::ipv4::Ipv4Header;
use std::collections::BTreeSet;

/// How a port match is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolarity {
    /// Listed ports are suppressed, everything else passes
    SuppressListed,
    /// Only listed ports pass, everything else is suppressed
    PassListed,
}

impl FilterPolarity {
    pub fn for_forwarding(forwarding_enabled: bool) -> Self {
        if forwarding_enabled {
            FilterPolarity::SuppressListed
        } else {
            FilterPolarity::PassListed
        }
    }
}

/// Outcome of evaluating one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    Suppress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortFilter {
    ports: BTreeSet<u16>,
    polarity: FilterPolarity,
}

impl PortFilter {
    pub fn new(ports: impl IntoIterator<Item = u16>, polarity: FilterPolarity) -> Self {
        Self {
            ports: ports.into_iter().collect(),
            polarity,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.ports.is_empty()
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn polarity(&self) -> FilterPolarity {
        self.polarity
    }

    /// Whether either port of the pair is listed
    pub fn matches(&self, src_port: u16, dst_port: u16) -> bool {
        self.ports.contains(&src_port) || self.ports.contains(&dst_port)
    }

    /// Evaluate an IPv4 packet (the Ethernet payload).
    ///
    /// Returns `None` when the header or the port words do not fit in the
    /// buffer; the caller treats that as a drop.
    pub fn evaluate(&self, ipv4_packet: &[u8]) -> Option<FilterVerdict> {
        let header = Ipv4Header::parse(ipv4_packet).ok()?;
        let (src_port, dst_port) = header.port_pair()?;

        let listed = self.matches(src_port, dst_port);
        let suppress = match self.polarity {
            FilterPolarity::SuppressListed => listed,
            FilterPolarity::PassListed => !listed,
        };

        Some(if suppress {
            FilterVerdict::Suppress
        } else {
            FilterVerdict::Pass
        })
    }
}
