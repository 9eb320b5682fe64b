//! Gratuitous ARP announcements
//!
//! `announce` tells each peer that the other's IP now lives at the virtual
//! MAC. `restore` undoes that by re-asserting the real bindings.

use crate::dataplane::{AddressBook, Identity};
use crate::protocol::arp::{ArpPacket, ARP_FRAME_SIZE};
use crate::protocol::MacAddr;
use std::net::Ipv4Addr;

/// A 42-byte ARP reply frame ready for the wire
pub type ArpFrame = [u8; ARP_FRAME_SIZE];

/// Builds the spoofing and restoring ARP replies.
///
/// Pure: the same address book always yields the same frames, in the same
/// order (gateway first, then remote).
#[derive(Debug, Clone)]
pub struct GratuitousAnnouncer {
    book: AddressBook,
}

impl GratuitousAnnouncer {
    pub fn new(book: AddressBook) -> Self {
        Self { book }
    }

    /// Frames claiming both peers' IPs for the virtual MAC
    pub fn announce(&self) -> [ArpFrame; 2] {
        let remote = self.book.remote();
        let gateway = self.book.gateway();
        let virt = self.book.virtual_mac();

        [
            // To the gateway: remote's IP is at virtual
            claim(virt, remote.ip, gateway.mac, gateway.ip),
            // To the remote: gateway's IP is at virtual
            claim(virt, gateway.ip, remote.mac, remote.ip),
        ]
    }

    /// Frames re-asserting each peer's real MAC for the IP the address book
    /// binds to it
    pub fn restore(&self) -> [ArpFrame; 2] {
        let remote = self.book.remote();
        let gateway = self.book.gateway();

        [
            claim(remote.mac, self.owned_ip(remote), gateway.mac, gateway.ip),
            claim(gateway.mac, self.owned_ip(gateway), remote.mac, remote.ip),
        ]
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    fn owned_ip(&self, peer: Identity) -> Ipv4Addr {
        self.book.ip_associated_with(peer.mac).unwrap_or(peer.ip)
    }
}

/// ARP reply from `sender_mac` claiming `sender_ip`, unicast to the target.
/// The Ethernet source is the claimed MAC as well.
fn claim(
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
) -> ArpFrame {
    ArpPacket::reply(sender_mac, sender_ip, target_mac, target_ip).to_frame(target_mac, sender_mac)
}
