//! Link-layer transport
//!
//! The bridge only needs a handful of operations from the wire: receive a
//! frame, send a frame, and a few interface queries made once at startup.
//! `AfPacketSocket` provides them on Linux; tests use an in-memory double.

mod af_packet;

pub use af_packet::AfPacketSocket;

use crate::protocol::MacAddr;
use crate::Result;
use std::future::Future;

/// Information about a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInfo {
    /// Number of bytes received. Zero means the transport was closed.
    pub len: usize,
    /// Interface the frame was captured on
    pub ifindex: i32,
}

/// Transport backend trait
pub trait Capture: Send + Sync {
    /// Receive a frame into the provided buffer
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;

    /// Send a frame
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;

    /// Index of the interface the transport is bound to
    fn ifindex(&self) -> i32;

    /// Hardware address of the bound interface
    fn hardware_addr(&self) -> Result<MacAddr>;

    /// Whether the interface is already in promiscuous mode
    fn is_promiscuous(&self) -> Result<bool>;

    /// Switch promiscuous mode on or off
    fn set_promiscuous(&mut self, enable: bool) -> Result<()>;
}
