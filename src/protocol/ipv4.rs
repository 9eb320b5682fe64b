//! IPv4 header view - RFC 791
//!
//! Only the fields the bridge inspects are exposed. The view is lenient on
//! purpose: the version nibble and the protocol field are not checked, so
//! callers see whatever bytes sit at the usual offsets.

use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// Parsed IPv4 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv4Header<'a> {
    /// Wrap an Ethernet payload. Fails only when the fixed 20-byte header
    /// does not fit.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::Parse("IPv4 header too short".into()));
        }
        Ok(Self { buffer })
    }

    pub fn ihl(&self) -> u8 {
        self.buffer[0] & 0x0F
    }

    /// Header length in bytes, as claimed by the IHL nibble
    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buffer[16],
            self.buffer[17],
            self.buffer[18],
            self.buffer[19],
        )
    }

    /// Bytes following the header, or `None` when the IHL points past the
    /// end of the buffer.
    pub fn payload(&self) -> Option<&'a [u8]> {
        self.buffer.get(self.header_len()..)
    }

    /// The first two 16-bit words after the header, read as
    /// (source port, destination port). The protocol field is not consulted.
    pub fn port_pair(&self) -> Option<(u16, u16)> {
        let l4 = self.payload()?;
        if l4.len() < 4 {
            return None;
        }
        Some((
            u16::from_be_bytes([l4[0], l4[1]]),
            u16::from_be_bytes([l4[2], l4[3]]),
        ))
    }
}
