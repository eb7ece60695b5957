//! Shared test fixtures: a recording command sink and frame builders.

use async_trait::async_trait;
use parking_lot::Mutex;
use sdn_common::config::{BackendConfig, VirtualServiceConfig};
use sdn_common::error::{SdnError, SdnResult};
use sdn_common::event::SwitchCommand;
use sdn_common::frame::{ArpOp, ArpPacket, EthernetFrame};
use sdn_common::sink::CommandSink;
use sdn_common::types::{ConnectionId, MacAddr, PortNo};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sink that records delivered commands and can be told to start refusing
/// after a fixed number of attempts.
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<SwitchCommand>>,
    attempts: AtomicUsize,
    fail_after: usize,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_after: usize::MAX,
        })
    }

    /// Refuse every send once `n` attempts have been made.
    pub(crate) fn failing_after(n: usize) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_after: n,
        })
    }

    pub(crate) fn sent(&self) -> Vec<SwitchCommand> {
        self.sent.lock().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, cmd: SwitchCommand) -> SdnResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        if attempt >= self.fail_after {
            return Err(SdnError::Send {
                conn: ConnectionId(0),
                reason: "connection reset".into(),
            });
        }
        self.sent.lock().push(cmd);
        Ok(())
    }
}

pub(crate) fn mac(last: u8) -> MacAddr {
    MacAddr([0, 0, 0, 0, 0, last])
}

pub(crate) fn host_ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, last)
}

/// ARP who-has from host `sender` for host `target` (192.168.1.x).
pub(crate) fn arp_request_frame(sender: u8, target: u8) -> EthernetFrame {
    EthernetFrame::arp(
        mac(sender),
        MacAddr::BROADCAST,
        ArpPacket {
            op: ArpOp::Request,
            sender_mac: mac(sender),
            sender_ip: host_ip(sender),
            target_mac: MacAddr([0; 6]),
            target_ip: host_ip(target),
        },
    )
}

/// ARP who-has from host 2 for an arbitrary address.
pub(crate) fn arp_request_for(target: Ipv4Addr) -> EthernetFrame {
    EthernetFrame::arp(
        mac(2),
        MacAddr::BROADCAST,
        ArpPacket {
            op: ArpOp::Request,
            sender_mac: mac(2),
            sender_ip: host_ip(2),
            target_mac: MacAddr([0; 6]),
            target_ip: target,
        },
    )
}

/// ARP is-at from host `sender` toward host `target`.
pub(crate) fn arp_reply_frame(sender: u8, target: u8) -> EthernetFrame {
    EthernetFrame::arp(
        mac(sender),
        mac(target),
        ArpPacket {
            op: ArpOp::Reply,
            sender_mac: mac(sender),
            sender_ip: host_ip(sender),
            target_mac: mac(target),
            target_ip: host_ip(target),
        },
    )
}

/// IPv4 datagram between two 192.168.1.x hosts.
pub(crate) fn ipv4_frame(src: u8, dst: u8) -> EthernetFrame {
    EthernetFrame::ipv4(mac(src), mac(dst), host_ip(src), host_ip(dst))
}

/// Virtual-service config at 10.0.0.10 over the given backends.
pub(crate) fn vip_config(backends: Vec<(&str, &str, u32)>) -> VirtualServiceConfig {
    VirtualServiceConfig {
        virtual_ip: "10.0.0.10".parse().unwrap(),
        uplink_port: None,
        backends: backends
            .into_iter()
            .map(|(ip, mac, port)| BackendConfig {
                ip: ip.parse().unwrap(),
                mac: mac.parse().unwrap(),
                port: PortNo(port),
            })
            .collect(),
    }
}

/// Poll `cond` for up to a second before failing the test.
pub(crate) async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}

/// Route test logs through the capture writer; safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
