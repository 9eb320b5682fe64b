//! Bridge state and lifecycle
//!
//! `Bridge` owns the transport, the address book and the policy. It moves
//! through `Starting -> Running -> Terminating -> Exited`; frames, timer
//! ticks and shutdown requests are all events on the same task, so nothing
//! here is ever touched concurrently.

use crate::capture::{Capture, RxInfo};
use crate::dataplane::{
    AddressBook, ArpFrame, DropReason, FrameClassifier, GratuitousAnnouncer, PolicyConfig,
    Verdict,
};
use crate::protocol::ethernet::MAX_FRAME_SIZE;
use crate::telemetry::MetricsRegistry;
use crate::{Error, Result};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Default period between spoofing announcements
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(10);
/// Default upper bound on a single receive wait
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Terminating,
    Exited,
}

/// What ended the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Hangup,
    /// Zero-length receive
    TransportClosed,
}

/// One step of the main loop
#[derive(Debug)]
pub enum Event {
    /// A frame is waiting in the receive buffer
    Frame(RxInfo),
    /// The receive failed
    ReceiveError(Error),
    /// Time to re-announce
    Tick,
    /// The receive wait timed out with nothing to do
    Idle,
    /// A termination request arrived
    Shutdown(ShutdownReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub announce_interval: Duration,
    pub receive_timeout: Duration,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

pub struct Bridge<C: Capture> {
    capture: C,
    policy: PolicyConfig,
    announcer: GratuitousAnnouncer,
    timers: Timers,
    state: LifecycleState,
    /// We switched promiscuous mode on and must switch it off again
    promisc_owned: bool,
    buf: Vec<u8>,
    metrics: Arc<MetricsRegistry>,
}

impl<C: Capture> Bridge<C> {
    pub fn new(
        capture: C,
        book: AddressBook,
        policy: PolicyConfig,
        timers: Timers,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            capture,
            policy,
            announcer: GratuitousAnnouncer::new(book),
            timers,
            state: LifecycleState::Starting,
            promisc_owned: false,
            buf: vec![0u8; MAX_FRAME_SIZE],
            metrics,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn address_book(&self) -> &AddressBook {
        self.announcer.address_book()
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Put the interface into promiscuous mode unless someone else already
    /// did. Only a mode we switched on is switched off at shutdown.
    pub fn acquire_promiscuous(&mut self) -> Result<()> {
        if self.capture.is_promiscuous()? {
            debug!("interface already promiscuous, leaving it as is");
            self.promisc_owned = false;
            return Ok(());
        }

        self.capture.set_promiscuous(true)?;
        self.promisc_owned = true;
        debug!("promiscuous mode enabled");
        Ok(())
    }

    pub fn owns_promiscuous(&self) -> bool {
        self.promisc_owned
    }

    /// Seed both peers' ARP caches and enter `Running`
    pub async fn start(&mut self) {
        if self.state != LifecycleState::Starting {
            return;
        }
        self.announce().await;
        self.state = LifecycleState::Running;
        info!("bridge running");
    }

    /// Send the two spoofing ARP replies
    pub async fn announce(&mut self) {
        let frames = self.announcer.announce();
        let sent = self.send_arp(&frames, "announce").await;
        self.metrics.announcements_sent.add(sent);
    }

    /// Apply one event. `Break` carries the reason to shut down.
    pub async fn handle_event(&mut self, event: Event) -> ControlFlow<ShutdownReason> {
        match event {
            Event::Frame(rx) if rx.len == 0 => {
                info!("socket was closed");
                return ControlFlow::Break(ShutdownReason::TransportClosed);
            }
            Event::Frame(rx) => self.handle_frame(rx).await,
            Event::ReceiveError(e) => {
                self.metrics.rx_errors.inc();
                error!("receive error: {}", e);
            }
            Event::Tick => {
                trace!("re-announcing");
                self.announce().await;
            }
            Event::Idle => trace!("receive wait timed out"),
            Event::Shutdown(reason) => return ControlFlow::Break(reason),
        }
        ControlFlow::Continue(())
    }

    /// Classify the frame sitting in the receive buffer and send it on if
    /// the verdict says so.
    pub async fn handle_frame(&mut self, rx: RxInfo) {
        let len = rx.len.min(self.buf.len());

        let verdict = if rx.ifindex != self.capture.ifindex() {
            Verdict::Drop(DropReason::ForeignInterface)
        } else {
            let book = self.announcer.address_book();
            FrameClassifier::new(book, &self.policy).classify(&mut self.buf[..len])
        };
        self.metrics.record_verdict(len, &verdict);

        match verdict {
            Verdict::Drop(DropReason::ShortFrame) => warn!(len, "short read"),
            Verdict::Drop(reason) => trace!(?reason, "dropped"),
            Verdict::Relay { dst, .. } | Verdict::Redirect { dst, .. } => {
                trace!(?verdict, len, "forwarding");
                if let Err(e) = self.capture.send(&self.buf[..len]).await {
                    self.metrics.tx_errors.inc();
                    warn!("failed to forward frame to {}: {}", dst, e);
                }
            }
        }
    }

    /// Undo the spoofing and release promiscuous mode. Runs once; later
    /// calls are no-ops.
    pub async fn shutdown(&mut self, reason: ShutdownReason) {
        if matches!(
            self.state,
            LifecycleState::Terminating | LifecycleState::Exited
        ) {
            return;
        }
        self.state = LifecycleState::Terminating;
        info!(?reason, "restoring ARP bindings");

        let frames = self.announcer.restore();
        let sent = self.send_arp(&frames, "restore").await;
        self.metrics.restorations_sent.add(sent);

        if self.promisc_owned {
            match self.capture.set_promiscuous(false) {
                Ok(()) => {
                    self.promisc_owned = false;
                    debug!("promiscuous mode disabled");
                }
                Err(e) => warn!("failed to leave promiscuous mode: {}", e),
            }
        }

        info!("{}", self.metrics.snapshot());
        self.state = LifecycleState::Exited;
    }

    /// Run until a termination signal or transport closure, then restore.
    ///
    /// Promiscuous mode is acquired first; failing that is fatal.
    pub async fn run(mut self) -> Result<ShutdownReason> {
        let mut signals = ShutdownSignals::install()?;
        self.acquire_promiscuous()?;
        self.start().await;

        let period = self.timers.announce_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                reason = signals.recv() => Event::Shutdown(reason),
                _ = ticker.tick() => Event::Tick,
                event = self.receive() => event,
            };

            if let ControlFlow::Break(reason) = self.handle_event(event).await {
                self.shutdown(reason).await;
                return Ok(reason);
            }
        }
    }

    /// Wait for the next frame, at most `receive_timeout`
    pub async fn receive(&mut self) -> Event {
        let wait = self.timers.receive_timeout;
        match tokio::time::timeout(wait, self.capture.recv(&mut self.buf)).await {
            Ok(Ok(rx)) => Event::Frame(rx),
            Ok(Err(e)) => Event::ReceiveError(e),
            Err(_elapsed) => Event::Idle,
        }
    }

    async fn send_arp(&mut self, frames: &[ArpFrame], what: &str) -> u64 {
        let mut sent = 0;
        for frame in frames {
            match self.capture.send(frame).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    self.metrics.tx_errors.inc();
                    warn!("failed to send {} ARP reply: {}", what, e);
                }
            }
        }
        sent
    }
}

/// SIGINT, SIGTERM and SIGHUP as one stream of shutdown requests
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownReason::Interrupt,
            _ = self.terminate.recv() => ShutdownReason::Terminate,
            _ = self.hangup.recv() => ShutdownReason::Hangup,
        }
    }
}
