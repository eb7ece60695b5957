//! Per-connection session state machine.
//!
//! `Initializing → Active → Closed`, nothing else. A session processes its
//! packet-in events one at a time, never waits for a reply to a command it
//! sent, and never retries a failed send — the first send failure reports
//! and closes it. Once closed it absorbs everything.

use bytes::Bytes;
use sdn_common::event::SwitchCommand;
use sdn_common::frame::EthernetFrame;
use sdn_common::rule::{Action, FlowRuleSpec, MatchFields, PRIORITY_ARP_REDIRECT};
use sdn_common::sink::CommandSink;
use sdn_common::types::{ConnectionId, OutputPort, PortNo};
use sdn_forwarding::{classify, ClassifiedEvent, ForwardingPolicy, PacketContext};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one switch connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; baseline rule not yet placed.
    Initializing,
    /// Processing packet-in events.
    Active,
    /// Connection gone; every further event is a no-op.
    Closed,
}

/// Atomic per-session counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    packets_in: AtomicU64,
    parse_failures: AtomicU64,
    rules_installed: AtomicU64,
    packets_emitted: AtomicU64,
    floods: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Packet-in events accepted while active.
    pub packets_in: u64,
    /// Frames the channel could not decode.
    pub parse_failures: u64,
    /// Flow rules sent for installation.
    pub rules_installed: u64,
    /// Packets emitted, floods included.
    pub packets_emitted: u64,
    /// Emissions that were flood fallbacks.
    pub floods: u64,
    /// Commands the channel refused.
    pub send_failures: u64,
}

impl SessionStats {
    /// Copy the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_in: self.packets_in.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            rules_installed: self.rules_installed.load(Ordering::Relaxed),
            packets_emitted: self.packets_emitted.load(Ordering::Relaxed),
            floods: self.floods.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    fn record(&self, cmd: &SwitchCommand) {
        match cmd {
            SwitchCommand::InstallRule(_) => {
                self.rules_installed.fetch_add(1, Ordering::Relaxed);
            }
            SwitchCommand::EmitPacket {
                out: OutputPort::Flood,
                ..
            } => {
                self.floods.fetch_add(1, Ordering::Relaxed);
                self.packets_emitted.fetch_add(1, Ordering::Relaxed);
            }
            SwitchCommand::EmitPacket { .. } => {
                self.packets_emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// One switch connection's orchestrator.
///
/// Owns its policy (and through it the resolution table), writes to exactly
/// one connection, and is driven by exactly one task, so packet-in events
/// are handled strictly in arrival order.
pub struct SwitchSession {
    conn: ConnectionId,
    state: SessionState,
    policy: Box<dyn ForwardingPolicy>,
    sink: Arc<dyn CommandSink>,
    stats: SessionStats,
}

impl SwitchSession {
    /// Bring a session up on a fresh connection.
    ///
    /// When `arp_fast_path` is set, a baseline rule redirecting all ARP
    /// traffic to the controller goes in first; a send failure here closes
    /// the session before it ever activates.
    pub async fn start(
        conn: ConnectionId,
        policy: Box<dyn ForwardingPolicy>,
        sink: Arc<dyn CommandSink>,
        arp_fast_path: bool,
    ) -> Self {
        let mut session = Self {
            conn,
            state: SessionState::Initializing,
            policy,
            sink,
            stats: SessionStats::default(),
        };
        if arp_fast_path {
            let redirect = FlowRuleSpec::new(MatchFields::arp(), PRIORITY_ARP_REDIRECT)
                .action(Action::Output(OutputPort::Controller));
            session.deliver(SwitchCommand::InstallRule(redirect)).await;
        }
        if session.state == SessionState::Initializing {
            session.state = SessionState::Active;
            info!(conn = %session.conn, "session active");
        }
        session
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Process one packet-in event. No-op unless active.
    pub async fn packet_in(
        &mut self,
        in_port: PortNo,
        frame: Option<EthernetFrame>,
        raw: Bytes,
    ) {
        if self.state != SessionState::Active {
            debug!(conn = %self.conn, "event for inactive session, ignoring");
            return;
        }
        self.stats.packets_in.fetch_add(1, Ordering::Relaxed);

        let event = classify(frame.as_ref());
        if event == ClassifiedEvent::Unparsed {
            self.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
            warn!(conn = %self.conn, %in_port, "dropping frame the channel could not decode");
            return;
        }

        let ctx = PacketContext {
            in_port,
            event,
            src_mac: frame.as_ref().map(|f| f.src),
            raw,
        };
        for cmd in self.policy.decide(&ctx) {
            self.stats.record(&cmd);
            if !self.deliver(cmd).await {
                break;
            }
        }
    }

    /// Mark the connection gone. Idempotent; the resolution table dies with
    /// the session.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!(conn = %self.conn, stats = ?self.stats.snapshot(), "session closed");
            self.state = SessionState::Closed;
        }
    }

    /// Send one command; on failure report, close, and tell the caller to
    /// stop. Commands for a dead connection are dropped, never retried.
    async fn deliver(&mut self, cmd: SwitchCommand) -> bool {
        match self.sink.send(cmd).await {
            Ok(()) => true,
            Err(err) => {
                self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(conn = %self.conn, error = %err, "send failed, closing session");
                self.state = SessionState::Closed;
                false
            }
        }
    }
}
