//! Ethernet frame parsing, in-place rewriting and construction

use super::MacAddr;
use crate::{Error, Result};

/// Ethernet header length (dst + src + EtherType)
pub const HEADER_LEN: usize = 14;
/// Minimum frame the bridge will look at
pub const MIN_FRAME_SIZE: usize = HEADER_LEN;
/// Maximum untagged Ethernet frame size (without FCS)
pub const MAX_FRAME_SIZE: usize = 1514;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parse an Ethernet frame from a buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_FRAME_SIZE {
            return Err(Error::Parse("frame too short".into()));
        }
        Ok(Self { buffer })
    }

    pub fn dst_mac(&self) -> MacAddr {
        MacAddr::from_slice(&self.buffer[0..6])
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr::from_slice(&self.buffer[6..12])
    }

    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([self.buffer[12], self.buffer[13]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_LEN..]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Mutable view over a received frame whose MAC header can be rewritten
/// in place.
#[derive(Debug)]
pub struct FrameMut<'a> {
    buffer: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    pub fn parse(buffer: &'a mut [u8]) -> Result<Self> {
        if buffer.len() < MIN_FRAME_SIZE {
            return Err(Error::Parse("frame too short".into()));
        }
        Ok(Self { buffer })
    }

    pub fn set_dst_mac(&mut self, mac: MacAddr) {
        self.buffer[0..6].copy_from_slice(&mac.0);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.buffer[6..12].copy_from_slice(&mac.0);
    }

    /// Overwrite both MAC addresses, leaving EtherType and payload intact
    pub fn rewrite(&mut self, dst: MacAddr, src: MacAddr) {
        self.set_dst_mac(dst);
        self.set_src_mac(src);
    }
}

/// Builder for constructing Ethernet frames
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_SIZE),
        }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.buffer.extend_from_slice(&ethertype.to_be_bytes());
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.buffer.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
