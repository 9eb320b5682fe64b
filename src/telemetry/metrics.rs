//! Frame counters for the bridge.
//!
//! Counters are atomics so the registry can be shared behind an `Arc`
//! without locking, even though the bridge itself runs on one task.

use crate::dataplane::{DropReason, Verdict};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bridge-wide counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Frames handed to the classifier.
    pub frames_received: Counter,
    /// Bytes handed to the classifier.
    pub bytes_received: Counter,
    /// Frames relayed between the two peers.
    pub frames_relayed: Counter,
    /// Frames redirected to a third party.
    pub frames_redirected: Counter,
    /// Frames dropped for any reason.
    pub frames_dropped: Counter,
    /// Frames the port filter suppressed, redirected or dropped.
    pub filter_suppressed: Counter,
    /// Receives shorter than an Ethernet header.
    pub short_reads: Counter,
    /// Failed receives.
    pub rx_errors: Counter,
    /// Failed sends (relay, redirect or ARP).
    pub tx_errors: Counter,
    /// Spoofing ARP replies sent.
    pub announcements_sent: Counter,
    /// Restoring ARP replies sent.
    pub restorations_sent: Counter,
}

impl MetricsRegistry {
    /// Creates a new registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one classified frame.
    pub fn record_verdict(&self, len: usize, verdict: &Verdict) {
        self.frames_received.inc();
        self.bytes_received.add(len as u64);

        if verdict.is_filter_suppressed() {
            self.filter_suppressed.inc();
        }

        match verdict {
            Verdict::Relay { .. } => self.frames_relayed.inc(),
            Verdict::Redirect { .. } => self.frames_redirected.inc(),
            Verdict::Drop(reason) => {
                self.frames_dropped.inc();
                if *reason == DropReason::ShortFrame {
                    self.short_reads.inc();
                }
            }
        }
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.get(),
            frames_relayed: self.frames_relayed.get(),
            frames_redirected: self.frames_redirected.get(),
            frames_dropped: self.frames_dropped.get(),
            filter_suppressed: self.filter_suppressed.get(),
            short_reads: self.short_reads.get(),
            rx_errors: self.rx_errors.get(),
            tx_errors: self.tx_errors.get(),
            announcements_sent: self.announcements_sent.get(),
            restorations_sent: self.restorations_sent.get(),
        }
    }
}

/// Plain copy of the counters, for logging and assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_relayed: u64,
    pub frames_redirected: u64,
    pub frames_dropped: u64,
    pub filter_suppressed: u64,
    pub short_reads: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub announcements_sent: u64,
    pub restorations_sent: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx={} relayed={} redirected={} dropped={} (filtered={}, short={}) rx_err={} tx_err={} arp_sent={} arp_restored={}",
            self.frames_received,
            self.frames_relayed,
            self.frames_redirected,
            self.frames_dropped,
            self.filter_suppressed,
            self.short_reads,
            self.rx_errors,
            self.tx_errors,
            self.announcements_sent,
            self.restorations_sent,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MacAddr;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_record_verdicts() {
        let metrics = MetricsRegistry::new();
        let mac = MacAddr([0xaa; 6]);

        metrics.record_verdict(60, &Verdict::Relay { dst: mac, src: mac });
        metrics.record_verdict(60, &Verdict::Redirect { dst: mac, src: mac });
        metrics.record_verdict(60, &Verdict::Drop(DropReason::Filtered));
        metrics.record_verdict(10, &Verdict::Drop(DropReason::ShortFrame));
        metrics.record_verdict(60, &Verdict::Drop(DropReason::NotForVirtual));

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_received, 5);
        assert_eq!(snap.frames_relayed, 1);
        assert_eq!(snap.frames_redirected, 1);
        assert_eq!(snap.frames_dropped, 3);
        // the redirect and the filtered drop
        assert_eq!(snap.filter_suppressed, 2);
        assert_eq!(snap.short_reads, 1);
        assert_eq!(metrics.bytes_received.get(), 250);
    }

    #[test]
    fn test_snapshot_display() {
        let snap = MetricsSnapshot {
            frames_received: 3,
            frames_relayed: 2,
            ..Default::default()
        };
        let line = snap.to_string();
        assert!(line.starts_with("rx=3 relayed=2"));
    }
}
