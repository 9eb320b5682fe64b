//! Frame classification and in-place rewrite
//!
//! Every frame the bridge picks up goes through [`FrameClassifier::classify`]
//! exactly once. A frame is only touched when the verdict is `Relay` or
//! `Redirect`; in both cases the source MAC becomes the virtual MAC and the
//! destination becomes the real host on the far side.

use crate::dataplane::{AddressBook, FilterVerdict, PolicyConfig};
use crate::protocol::ethernet::{Frame, FrameMut};
use crate::protocol::ipv4::Ipv4Header;
use crate::protocol::{EtherType, MacAddr};
use tracing::trace;

/// IPv4 frames are inspected only when `length > 33`, i.e. when the
/// destination address (bytes 30..34) is present
const MIN_IPV4_INSPECT_LEN: usize = 34;

/// Why a frame was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Shorter than an Ethernet header
    ShortFrame,
    /// Captured on another interface
    ForeignInterface,
    /// Forwarding, filtering and redirect are all off
    Passive,
    /// Not addressed to the virtual MAC
    NotForVirtual,
    /// Own-MAC mode: gateway traffic not destined to the remote's IP
    NotForRemote,
    /// Suppressed by the port filter with nowhere to redirect
    Filtered,
    /// IPv4 header or port words run past the end of the frame
    Truncated,
    /// Sent to the virtual MAC by a host we do not bridge for
    UnknownSource,
}

/// Terminal decision for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Drop(DropReason),
    Relay { dst: MacAddr, src: MacAddr },
    Redirect { dst: MacAddr, src: MacAddr },
}

impl Verdict {
    pub fn is_drop(&self) -> bool {
        matches!(self, Verdict::Drop(_))
    }

    /// The port filter suppressed the frame. Redirects only ever come from
    /// a suppression, whether or not a target was configured.
    pub fn is_filter_suppressed(&self) -> bool {
        matches!(
            self,
            Verdict::Redirect { .. } | Verdict::Drop(DropReason::Filtered)
        )
    }
}

/// Stateless decision engine over a borrowed address book and policy
pub struct FrameClassifier<'a> {
    book: &'a AddressBook,
    policy: &'a PolicyConfig,
}

impl<'a> FrameClassifier<'a> {
    pub fn new(book: &'a AddressBook, policy: &'a PolicyConfig) -> Self {
        Self { book, policy }
    }

    /// Classify a received frame, rewriting its MAC header in place when it
    /// is to be sent on.
    pub fn classify(&self, buffer: &mut [u8]) -> Verdict {
        let verdict = self.decide(buffer);

        if let Verdict::Relay { dst, src } | Verdict::Redirect { dst, src } = verdict {
            // decide() only returns these for frames that parsed
            if let Ok(mut frame) = FrameMut::parse(buffer) {
                frame.rewrite(dst, src);
            }
        }

        verdict
    }

    fn decide(&self, buffer: &[u8]) -> Verdict {
        let frame = match Frame::parse(buffer) {
            Ok(frame) => frame,
            Err(_) => return Verdict::Drop(DropReason::ShortFrame),
        };

        if self.policy.is_passive() {
            return Verdict::Drop(DropReason::Passive);
        }

        let virt = self.book.virtual_mac();
        if frame.dst_mac() != virt {
            return Verdict::Drop(DropReason::NotForVirtual);
        }

        let src = frame.src_mac();
        let from_gateway = src == self.book.gateway().mac;
        let from_remote = src == self.book.remote().mac;

        let ipv4 = if frame.ethertype() == EtherType::Ipv4 as u16
            && frame.len() >= MIN_IPV4_INSPECT_LEN
        {
            Ipv4Header::parse(frame.payload()).ok()
        } else {
            None
        };

        if self.policy.own_mac_mode && from_gateway {
            if let Some(header) = &ipv4 {
                if header.dst_addr() != self.book.remote().ip {
                    trace!(dst = %header.dst_addr(), "own-MAC mode: gateway frame not for remote");
                    return Verdict::Drop(DropReason::NotForRemote);
                }
            }
        }

        if self.policy.filter.is_active() && ipv4.is_some() {
            match self.policy.filter.evaluate(frame.payload()) {
                None => return Verdict::Drop(DropReason::Truncated),
                Some(FilterVerdict::Suppress) => return self.suppress(),
                Some(FilterVerdict::Pass) => {}
            }
        }

        if from_gateway || from_remote {
            let dst = if from_gateway {
                self.book.remote().mac
            } else {
                self.book.gateway().mac
            };
            return Verdict::Relay { dst, src: virt };
        }

        if self.policy.redirect.is_active() && self.book.local() == Some(src) {
            return Verdict::Relay {
                dst: self.book.remote().mac,
                src: virt,
            };
        }

        Verdict::Drop(DropReason::UnknownSource)
    }

    /// The port filter refused the frame: redirect it if a target exists
    fn suppress(&self) -> Verdict {
        match self.policy.redirect.target(self.book) {
            Some(dst) => Verdict::Redirect {
                dst,
                src: self.book.virtual_mac(),
            },
            None => Verdict::Drop(DropReason::Filtered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataplane::{Identity, RedirectMode};
    use crate::protocol::ethernet::FrameBuilder;
    use std::net::Ipv4Addr;

    const REMOTE: MacAddr = MacAddr([0xaa; 6]);
    const GATEWAY: MacAddr = MacAddr([0xbb; 6]);
    const VIRTUAL: MacAddr = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const LOCAL: MacAddr = MacAddr([0x00, 0x16, 0x3e, 0x00, 0x00, 0x01]);
    const STRANGER: MacAddr = MacAddr([0xcc; 6]);
    const REMOTE_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
    const GATEWAY_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn book() -> AddressBook {
        AddressBook::new(
            Identity::new(REMOTE, REMOTE_IP),
            Identity::new(GATEWAY, GATEWAY_IP),
            VIRTUAL,
        )
        .with_local(LOCAL)
    }

    fn arp_frame(dst: MacAddr, src: MacAddr) -> Vec<u8> {
        FrameBuilder::new()
            .dst_mac(dst)
            .src_mac(src)
            .ethertype(EtherType::Arp as u16)
            .payload(&[0u8; 28])
            .build()
    }

    fn tcp_frame(dst: MacAddr, src: MacAddr, dst_ip: Ipv4Addr, dst_port: u16) -> Vec<u8> {
        let mut ip = vec![
            0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 93, 184, 216,
            34,
        ];
        ip.extend_from_slice(&dst_ip.octets());
        ip.extend_from_slice(&51000u16.to_be_bytes());
        ip.extend_from_slice(&dst_port.to_be_bytes());
        ip.extend_from_slice(&[0u8; 16]);

        FrameBuilder::new()
            .dst_mac(dst)
            .src_mac(src)
            .ethertype(EtherType::Ipv4 as u16)
            .payload(&ip)
            .build()
    }

    fn classify(policy: &PolicyConfig, frame: &mut [u8]) -> Verdict {
        let book = book();
        FrameClassifier::new(&book, policy).classify(frame)
    }

    #[test]
    fn test_gateway_to_remote_relay() {
        let policy = PolicyConfig::default();
        let mut frame = arp_frame(VIRTUAL, GATEWAY);

        let verdict = classify(&policy, &mut frame);

        assert_eq!(
            verdict,
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
        assert_eq!(&frame[0..6], &REMOTE.0);
        assert_eq!(&frame[6..12], &VIRTUAL.0);
        assert_eq!(&frame[12..14], &[0x08, 0x06]);
    }

    #[test]
    fn test_remote_to_gateway_relay() {
        let policy = PolicyConfig::default();
        let mut frame = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 443);

        let verdict = classify(&policy, &mut frame);

        assert_eq!(
            verdict,
            Verdict::Relay {
                dst: GATEWAY,
                src: VIRTUAL
            }
        );
        assert_eq!(&frame[0..6], &GATEWAY.0);
        assert_eq!(&frame[6..12], &VIRTUAL.0);
    }

    #[test]
    fn test_short_frame_dropped() {
        let policy = PolicyConfig::default();
        let mut frame = vec![0u8; 13];
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::ShortFrame)
        );
    }

    #[test]
    fn test_not_for_virtual_dropped_untouched() {
        let policies = [
            PolicyConfig::default(),
            PolicyConfig::new(false, RedirectMode::ToLocal, false, [80]),
            PolicyConfig::new(true, RedirectMode::Off, true, []),
        ];

        for policy in &policies {
            for dst in [REMOTE, GATEWAY, LOCAL, MacAddr::BROADCAST] {
                for src in [REMOTE, GATEWAY, LOCAL, STRANGER] {
                    let mut frame = tcp_frame(dst, src, REMOTE_IP, 80);
                    let original = frame.clone();
                    assert_eq!(
                        classify(policy, &mut frame),
                        Verdict::Drop(DropReason::NotForVirtual)
                    );
                    assert_eq!(frame, original);
                }
            }
        }
    }

    #[test]
    fn test_passive_policy_drops_everything() {
        let policy = PolicyConfig::new(false, RedirectMode::Off, false, []);
        let mut frame = arp_frame(VIRTUAL, GATEWAY);
        let original = frame.clone();

        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::Passive)
        );
        assert_eq!(frame, original);
    }

    #[test]
    fn test_unknown_source_dropped() {
        let policy = PolicyConfig::new(true, RedirectMode::ToLocal, false, []);
        let mut frame = arp_frame(VIRTUAL, STRANGER);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::UnknownSource)
        );
    }

    #[test]
    fn test_local_source_dropped_without_redirect() {
        let policy = PolicyConfig::default();
        let mut frame = arp_frame(VIRTUAL, LOCAL);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::UnknownSource)
        );
    }

    #[test]
    fn test_local_source_relayed_to_remote_in_redirect_mode() {
        let policy = PolicyConfig::new(true, RedirectMode::ToLocal, false, []);
        let mut frame = tcp_frame(VIRTUAL, LOCAL, REMOTE_IP, 22);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_filter_drops_listed_port_when_forwarding() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, false, [80]);
        let mut frame = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        let original = frame.clone();

        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::Filtered)
        );
        assert_eq!(frame, original);

        let mut other = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 443);
        assert!(!classify(&policy, &mut other).is_drop());
    }

    #[test]
    fn test_filter_relays_only_listed_port_without_forwarding() {
        let policy = PolicyConfig::new(false, RedirectMode::Off, false, [80]);

        let mut listed = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        assert_eq!(
            classify(&policy, &mut listed),
            Verdict::Relay {
                dst: GATEWAY,
                src: VIRTUAL
            }
        );

        let mut other = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 443);
        assert_eq!(
            classify(&policy, &mut other),
            Verdict::Drop(DropReason::Filtered)
        );
    }

    #[test]
    fn test_filtered_frame_redirected_to_local() {
        let policy = PolicyConfig::new(true, RedirectMode::ToLocal, false, [80]);
        let mut frame = tcp_frame(VIRTUAL, GATEWAY, REMOTE_IP, 80);

        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Redirect {
                dst: LOCAL,
                src: VIRTUAL
            }
        );
        assert_eq!(&frame[0..6], &LOCAL.0);
        assert_eq!(&frame[6..12], &VIRTUAL.0);
    }

    #[test]
    fn test_filtered_frame_redirected_to_explicit_mac() {
        let target = MacAddr([0x00, 0x16, 0x3e, 0x00, 0x00, 0x99]);
        let policy = PolicyConfig::new(true, RedirectMode::ToMac(target), false, [80]);
        let mut frame = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);

        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Redirect {
                dst: target,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_redirect_without_filter_relays_peers() {
        let policy = PolicyConfig::new(false, RedirectMode::ToLocal, false, []);

        let mut from_gateway = arp_frame(VIRTUAL, GATEWAY);
        assert_eq!(
            classify(&policy, &mut from_gateway),
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
        assert_eq!(&from_gateway[0..6], &REMOTE.0);

        let mut from_remote = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        assert_eq!(
            classify(&policy, &mut from_remote),
            Verdict::Relay {
                dst: GATEWAY,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_filter_suppression_marks_verdict() {
        let mut listed = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        let redirected = classify(
            &PolicyConfig::new(true, RedirectMode::ToLocal, false, [80]),
            &mut listed,
        );
        assert!(redirected.is_filter_suppressed());

        let mut listed = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        let dropped = classify(&PolicyConfig::new(true, RedirectMode::Off, false, [80]), &mut listed);
        assert_eq!(dropped, Verdict::Drop(DropReason::Filtered));
        assert!(dropped.is_filter_suppressed());

        let mut other = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 443);
        let relayed = classify(&PolicyConfig::new(true, RedirectMode::ToLocal, false, [80]), &mut other);
        assert!(!relayed.is_filter_suppressed());
        let mut stranger = arp_frame(VIRTUAL, STRANGER);
        assert!(!classify(&PolicyConfig::default(), &mut stranger).is_filter_suppressed());
    }

    #[test]
    fn test_filter_skips_non_ipv4() {
        let policy = PolicyConfig::new(false, RedirectMode::Off, false, [80]);
        let mut frame = arp_frame(VIRTUAL, GATEWAY);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_filter_truncated_transport_dropped() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, false, [80]);
        let mut frame = tcp_frame(VIRTUAL, REMOTE, GATEWAY_IP, 80);
        // IHL claims 60 bytes of header
        frame[14] = 0x4F;
        let original = frame.clone();

        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::Truncated)
        );
        assert_eq!(frame, original);
    }

    #[test]
    fn test_own_mac_guard_drops_foreign_destination() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, true, []);
        let mut frame = tcp_frame(VIRTUAL, GATEWAY, Ipv4Addr::new(10, 0, 0, 9), 443);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Drop(DropReason::NotForRemote)
        );
    }

    #[test]
    fn test_own_mac_guard_passes_remote_destination() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, true, []);
        let mut frame = tcp_frame(VIRTUAL, GATEWAY, REMOTE_IP, 443);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_own_mac_guard_ignores_remote_traffic() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, true, []);
        let mut frame = tcp_frame(VIRTUAL, REMOTE, Ipv4Addr::new(8, 8, 8, 8), 53);
        assert!(!classify(&policy, &mut frame).is_drop());
    }

    #[test]
    fn test_own_mac_guard_skips_short_ipv4() {
        let policy = PolicyConfig::new(true, RedirectMode::Off, true, []);
        let mut frame = tcp_frame(VIRTUAL, GATEWAY, Ipv4Addr::new(10, 0, 0, 9), 443);
        frame.truncate(33);
        assert_eq!(
            classify(&policy, &mut frame),
            Verdict::Relay {
                dst: REMOTE,
                src: VIRTUAL
            }
        );
    }

    #[test]
    fn test_forwarded_frames_never_carry_virtual_destination() {
        let policies = [
            PolicyConfig::default(),
            PolicyConfig::new(true, RedirectMode::ToLocal, false, [80]),
            PolicyConfig::new(false, RedirectMode::ToLocal, false, [443]),
        ];

        for policy in &policies {
            for src in [REMOTE, GATEWAY, LOCAL, STRANGER] {
                for port in [80, 443] {
                    let mut frame = tcp_frame(VIRTUAL, src, REMOTE_IP, port);
                    match classify(policy, &mut frame) {
                        Verdict::Relay { dst, src } | Verdict::Redirect { dst, src } => {
                            assert_ne!(dst, VIRTUAL);
                            assert_eq!(src, VIRTUAL);
                            assert_eq!(&frame[0..6], &dst.0);
                            assert_eq!(&frame[6..12], &VIRTUAL.0);
                        }
                        Verdict::Drop(_) => {}
                    }
                }
            }
        }
    }
}
