//! ARP (Address Resolution Protocol) - RFC 826

use super::ethernet::HEADER_LEN;
use super::{EtherType, MacAddr};
use std::net::Ipv4Addr;

/// ARP packet size (for Ethernet/IPv4)
pub const ARP_PACKET_SIZE: usize = 28;
/// Ethernet header plus ARP packet
pub const ARP_FRAME_SIZE: usize = HEADER_LEN + ARP_PACKET_SIZE;

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

/// ARP packet (Ethernet/IPv4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Serialize ARP packet to bytes
    pub fn to_bytes(&self) -> [u8; ARP_PACKET_SIZE] {
        let mut buf = [0u8; ARP_PACKET_SIZE];

        // Hardware type (Ethernet)
        buf[0..2].copy_from_slice(&1u16.to_be_bytes());
        // Protocol type (IPv4)
        buf[2..4].copy_from_slice(&(EtherType::Ipv4 as u16).to_be_bytes());
        buf[4] = 6;
        buf[5] = 4;
        buf[6..8].copy_from_slice(&(self.operation as u16).to_be_bytes());
        buf[8..14].copy_from_slice(&self.sender_mac.0);
        buf[14..18].copy_from_slice(&self.sender_ip.octets());
        buf[18..24].copy_from_slice(&self.target_mac.0);
        buf[24..28].copy_from_slice(&self.target_ip.octets());

        buf
    }

    /// Wrap the packet in an Ethernet header, producing a complete
    /// 42-byte frame.
    pub fn to_frame(&self, eth_dst: MacAddr, eth_src: MacAddr) -> [u8; ARP_FRAME_SIZE] {
        let mut frame = [0u8; ARP_FRAME_SIZE];
        frame[0..6].copy_from_slice(&eth_dst.0);
        frame[6..12].copy_from_slice(&eth_src.0);
        frame[12..14].copy_from_slice(&(EtherType::Arp as u16).to_be_bytes());
        frame[HEADER_LEN..].copy_from_slice(&self.to_bytes());
        frame
    }

    /// Create an ARP reply
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            operation: ArpOp::Reply,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }
}
