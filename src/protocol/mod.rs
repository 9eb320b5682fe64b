//! Wire formats the bridge reads and writes
//!
//! Ethernet and ARP are encoded bit-exact; IPv4 is only peeked at.

pub mod arp;
pub mod ethernet;
pub mod ipv4;
pub mod types;

pub use types::*;
