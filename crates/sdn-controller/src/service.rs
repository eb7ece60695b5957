//! Controller service: session registry and event dispatch.
//!
//! One service per controller process. It consumes the southbound event
//! stream, spawns one session task per connection, and forwards packet-in
//! events to the owning session's queue. Dispatch never blocks on a
//! session: a full queue drops the event with a warning and the switch
//! re-delivers on the next flow-table miss.

use crate::session::SwitchSession;
use bytes::Bytes;
use dashmap::DashMap;
use sdn_common::config::{ControllerConfig, PolicyMode};
use sdn_common::error::SdnResult;
use sdn_common::event::SwitchEvent;
use sdn_common::frame::EthernetFrame;
use sdn_common::sink::CommandSink;
use sdn_common::types::{ConnectionId, PortNo};
use sdn_forwarding::{ArpTable, BackendPool, ForwardingPolicy, LearningSwitch, VirtualService};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a session task receives on its queue.
enum SessionEvent {
    PacketIn {
        in_port: PortNo,
        frame: Option<EthernetFrame>,
        raw: Bytes,
    },
    Shutdown,
}

/// Mode-resolved policy construction state.
enum PolicyKind {
    Learning {
        ttl: Option<Duration>,
    },
    Virtual {
        virtual_ip: Ipv4Addr,
        uplink_port: Option<PortNo>,
        pool: Arc<BackendPool>,
    },
}

/// Process-wide registry of switch sessions.
pub struct ControllerService {
    kind: PolicyKind,
    arp_fast_path: bool,
    session_queue: usize,
    sessions: DashMap<ConnectionId, mpsc::Sender<SessionEvent>>,
}

impl ControllerService {
    /// Build the service from validated configuration.
    ///
    /// Fails fast — an empty backend pool or otherwise unserveable config
    /// never reaches the dispatch loop.
    pub fn new(config: ControllerConfig) -> SdnResult<Self> {
        config.validate()?;
        let kind = match &config.mode {
            PolicyMode::LearningSwitch => PolicyKind::Learning {
                ttl: config.arp_ttl_secs.map(Duration::from_secs),
            },
            PolicyMode::VirtualService(service) => PolicyKind::Virtual {
                virtual_ip: service.virtual_ip,
                uplink_port: service.uplink_port,
                pool: Arc::new(BackendPool::from_config(&service.backends)?),
            },
        };
        Ok(Self {
            kind,
            arp_fast_path: config.arp_fast_path,
            session_queue: config.session_queue,
            sessions: DashMap::new(),
        })
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The shared backend pool, in virtual-service mode.
    pub fn pool(&self) -> Option<&Arc<BackendPool>> {
        match &self.kind {
            PolicyKind::Virtual { pool, .. } => Some(pool),
            PolicyKind::Learning { .. } => None,
        }
    }

    /// Consume the southbound event stream until it ends, then shut every
    /// session down.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<SwitchEvent>) {
        info!("controller service running");
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        info!("event stream ended, shutting down sessions");
        for entry in self.sessions.iter() {
            let _ = entry.value().try_send(SessionEvent::Shutdown);
        }
        self.sessions.clear();
    }

    /// Dispatch one southbound event.
    pub fn handle_event(&self, event: SwitchEvent) {
        match event {
            SwitchEvent::ConnectionUp { conn, sink } => self.connection_up(conn, sink),
            SwitchEvent::ConnectionDown { conn } => self.connection_down(conn),
            SwitchEvent::PacketIn {
                conn,
                in_port,
                frame,
                raw,
            } => self.forward_packet_in(conn, in_port, frame, raw),
        }
    }

    fn connection_up(&self, conn: ConnectionId, sink: Arc<dyn CommandSink>) {
        if self.sessions.contains_key(&conn) {
            warn!(%conn, "duplicate connection-up, ignoring");
            return;
        }
        let policy = self.build_policy();
        let arp_fast_path = self.arp_fast_path;
        let (tx, rx) = mpsc::channel(self.session_queue);
        tokio::spawn(session_task(conn, policy, sink, arp_fast_path, rx));
        self.sessions.insert(conn, tx);
        info!(%conn, sessions = self.sessions.len(), "connection up, session spawned");
    }

    fn connection_down(&self, conn: ConnectionId) {
        match self.sessions.remove(&conn) {
            Some((_, tx)) => {
                // In-flight events still queued behind the shutdown marker
                // are dropped when the task exits.
                let _ = tx.try_send(SessionEvent::Shutdown);
                info!(%conn, "connection down, session unregistered");
            }
            None => debug!(%conn, "connection-down for unknown connection, ignoring"),
        }
    }

    fn forward_packet_in(
        &self,
        conn: ConnectionId,
        in_port: PortNo,
        frame: Option<EthernetFrame>,
        raw: Bytes,
    ) {
        match self.sessions.get(&conn) {
            Some(tx) => {
                let event = SessionEvent::PacketIn {
                    in_port,
                    frame,
                    raw,
                };
                if tx.try_send(event).is_err() {
                    warn!(%conn, "session queue full, dropping packet-in");
                }
            }
            // Unregistered handle: connection never existed or already went
            // down. Either way the event is a no-op.
            None => debug!(%conn, "packet-in for unknown connection, ignoring"),
        }
    }

    fn build_policy(&self) -> Box<dyn ForwardingPolicy> {
        match &self.kind {
            PolicyKind::Learning { ttl } => {
                let table = match ttl {
                    Some(ttl) => ArpTable::with_ttl(*ttl),
                    None => ArpTable::new(),
                };
                Box::new(LearningSwitch::new(table))
            }
            PolicyKind::Virtual {
                virtual_ip,
                uplink_port,
                pool,
            } => Box::new(VirtualService::new(
                *virtual_ip,
                *uplink_port,
                Arc::clone(pool),
            )),
        }
    }
}

/// Drive one session until shutdown. Single consumer of the session queue,
/// so events are processed strictly in arrival order.
async fn session_task(
    conn: ConnectionId,
    policy: Box<dyn ForwardingPolicy>,
    sink: Arc<dyn CommandSink>,
    arp_fast_path: bool,
    mut rx: mpsc::Receiver<SessionEvent>,
) {
    let mut session = SwitchSession::start(conn, policy, sink, arp_fast_path).await;
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::PacketIn {
                in_port,
                frame,
                raw,
            } => session.packet_in(in_port, frame, raw).await,
            SessionEvent::Shutdown => break,
        }
    }
    session.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        arp_request_frame, init_tracing, vip_config, wait_until, RecordingSink,
    };
    use sdn_common::error::SdnError;
    use sdn_common::event::{PacketPayload, SwitchCommand};
    use sdn_common::types::{MacAddr, OutputPort};

    fn packet_in(conn: u64, in_port: u32, frame: EthernetFrame) -> SwitchEvent {
        SwitchEvent::PacketIn {
            conn: ConnectionId(conn),
            in_port: PortNo(in_port),
            frame: Some(frame),
            raw: Bytes::from_static(b"frame"),
        }
    }

    #[test]
    fn test_empty_pool_is_fatal_at_startup() {
        let config = ControllerConfig::virtual_service(vip_config(vec![]));
        assert!(matches!(
            ControllerService::new(config),
            Err(SdnError::EmptyPool)
        ));
    }

    #[test]
    fn test_learning_mode_has_no_pool() {
        let service = ControllerService::new(ControllerConfig::learning_switch()).unwrap();
        assert!(service.pool().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_teardown_idempotence() {
        init_tracing();
        let mut config = ControllerConfig::learning_switch();
        config.arp_fast_path = false;
        let service = Arc::new(ControllerService::new(config).unwrap());
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&service).run(rx));

        let sink = RecordingSink::new();
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(1),
            sink: sink.clone(),
        })
        .await
        .unwrap();
        wait_until(|| service.session_count() == 1).await;

        // An ARP request for an unknown target floods.
        tx.send(packet_in(1, 3, arp_request_frame(1, 2))).await.unwrap();
        wait_until(|| sink.sent().len() == 1).await;
        assert!(matches!(
            sink.sent()[0],
            SwitchCommand::EmitPacket {
                out: OutputPort::Flood,
                ..
            }
        ));

        tx.send(SwitchEvent::ConnectionDown {
            conn: ConnectionId(1),
        })
        .await
        .unwrap();
        wait_until(|| service.session_count() == 0).await;

        // Events for the torn-down handle are no-ops: no commands appear.
        tx.send(packet_in(1, 3, arp_request_frame(1, 2))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.sent().len(), 1);

        // A second connection-down for the same handle is also a no-op.
        tx.send(SwitchEvent::ConnectionDown {
            conn: ConnectionId(1),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn test_baseline_rule_installed_per_connection() {
        init_tracing();
        let service =
            Arc::new(ControllerService::new(ControllerConfig::learning_switch()).unwrap());
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&service).run(rx));

        let sink = RecordingSink::new();
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(7),
            sink: sink.clone(),
        })
        .await
        .unwrap();

        wait_until(|| sink.sent().len() == 1).await;
        assert!(matches!(sink.sent()[0], SwitchCommand::InstallRule(_)));
    }

    #[tokio::test]
    async fn test_pool_shared_across_connections() {
        init_tracing();
        let vip: Ipv4Addr = "10.0.0.10".parse().unwrap();
        let mut config = ControllerConfig::virtual_service(vip_config(vec![
            ("10.0.0.5", "00:00:00:00:00:05", 5),
            ("10.0.0.6", "00:00:00:00:00:06", 6),
        ]));
        config.arp_fast_path = false;
        let service = Arc::new(ControllerService::new(config).unwrap());
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&service).run(rx));

        let sink_a = RecordingSink::new();
        let sink_b = RecordingSink::new();
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(1),
            sink: sink_a.clone(),
        })
        .await
        .unwrap();
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(2),
            sink: sink_b.clone(),
        })
        .await
        .unwrap();
        wait_until(|| service.session_count() == 2).await;

        // Request on connection 1 takes backend 5...
        let request = crate::testutil::arp_request_for(vip);
        tx.send(packet_in(1, 3, request)).await.unwrap();
        wait_until(|| sink_a.sent().len() == 1).await;

        // ...so the next request, on connection 2, takes backend 6.
        let request = crate::testutil::arp_request_for(vip);
        tx.send(packet_in(2, 4, request)).await.unwrap();
        wait_until(|| sink_b.sent().len() == 1).await;

        let mac_of = |cmds: Vec<SwitchCommand>| match &cmds[0] {
            SwitchCommand::EmitPacket {
                payload: PacketPayload::ArpReply(reply),
                ..
            } => reply.sender_mac,
            other => panic!("expected arp reply, got {:?}", other),
        };
        assert_eq!(mac_of(sink_a.sent()), MacAddr([0, 0, 0, 0, 0, 5]));
        assert_eq!(mac_of(sink_b.sent()), MacAddr([0, 0, 0, 0, 0, 6]));
    }

    #[tokio::test]
    async fn test_send_failure_quiesces_session_without_service_impact() {
        init_tracing();
        let mut config = ControllerConfig::learning_switch();
        config.arp_fast_path = true;
        let service = Arc::new(ControllerService::new(config).unwrap());
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&service).run(rx));

        // The baseline install fails immediately, closing the session.
        let broken = RecordingSink::failing_after(0);
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(1),
            sink: broken.clone(),
        })
        .await
        .unwrap();
        wait_until(|| broken.attempts() == 1).await;

        // Later packet-ins reach the task but the closed session absorbs
        // them; nothing further is attempted.
        tx.send(packet_in(1, 3, arp_request_frame(1, 2))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(broken.attempts(), 1);

        // A healthy connection on the same service still works.
        let healthy = RecordingSink::new();
        tx.send(SwitchEvent::ConnectionUp {
            conn: ConnectionId(2),
            sink: healthy.clone(),
        })
        .await
        .unwrap();
        wait_until(|| healthy.sent().len() == 1).await;
    }

    #[tokio::test]
    async fn test_duplicate_connection_up_ignored() {
        init_tracing();
        let mut config = ControllerConfig::learning_switch();
        config.arp_fast_path = false;
        let service = Arc::new(ControllerService::new(config).unwrap());
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&service).run(rx));

        let sink = RecordingSink::new();
        for _ in 0..2 {
            tx.send(SwitchEvent::ConnectionUp {
                conn: ConnectionId(1),
                sink: sink.clone(),
            })
            .await
            .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.session_count(), 1);
    }

    #[test]
    fn test_virtual_mode_exposes_pool() {
        let config = ControllerConfig::virtual_service(vip_config(vec![(
            "10.0.0.5",
            "00:00:00:00:00:05",
            5,
        )]));
        let service = ControllerService::new(config).unwrap();
        assert_eq!(service.pool().unwrap().len(), 1);
        assert!(matches!(
            &service.kind,
            PolicyKind::Virtual { virtual_ip, .. } if *virtual_ip == "10.0.0.10".parse::<Ipv4Addr>().unwrap()
        ));
    }
}
