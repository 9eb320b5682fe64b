//! arpbridge - ARP man-in-the-middle bridge
//!
//! Poisons the ARP caches of a remote host and its gateway so both send
//! their traffic to a virtual MAC, then relays, filters or redirects that
//! traffic in userspace. On shutdown the real bindings are restored.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
