//! Data plane components
//!
//! Handles the bridge itself: who is who, which ARP replies to send,
//! what to do with every captured frame, and the lifecycle around them.

mod address_book;
mod announcer;
mod bridge;
mod classifier;
mod policy;
mod port_filter;

pub use address_book::{AddressBook, Identity};
pub use announcer::{ArpFrame, GratuitousAnnouncer};
pub use bridge::{
    Bridge, Event, LifecycleState, ShutdownReason, Timers, DEFAULT_ANNOUNCE_INTERVAL,
    DEFAULT_RECEIVE_TIMEOUT,
};
pub use classifier::{DropReason, FrameClassifier, Verdict};
pub use policy::{PolicyConfig, RedirectMode};
pub use port_filter::{FilterPolarity, FilterVerdict, PortFilter};
