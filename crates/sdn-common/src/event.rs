//! Southbound events and commands.
//!
//! One explicit tagged union per direction: [`SwitchEvent`] for everything
//! the control channel reports, [`SwitchCommand`] for everything the
//! controller asks of a switch. Dispatch is a plain `match`; no handler
//! discovery by naming convention.

use crate::frame::EthernetFrame;
use crate::rule::FlowRuleSpec;
use crate::sink::CommandSink;
use crate::types::{ConnectionId, MacAddr, OutputPort, PortNo};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// A synthesized ARP reply, encoded by the control channel on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpReplySpec {
    /// Link address asserted for the answered protocol address.
    pub sender_mac: MacAddr,
    /// The protocol address being answered for.
    pub sender_ip: Ipv4Addr,
    /// The requester's link address.
    pub target_mac: MacAddr,
    /// The requester's protocol address.
    pub target_ip: Ipv4Addr,
}

/// Payload of an emitted packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketPayload {
    /// The original buffered bytes, re-emitted without re-encoding.
    Raw(Bytes),
    /// A synthesized ARP reply.
    ArpReply(ArpReplySpec),
}

/// One command toward a switch connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchCommand {
    /// Install (or overwrite) a flow rule.
    InstallRule(FlowRuleSpec),
    /// Emit a single packet out the given port.
    EmitPacket {
        /// Where the packet leaves the switch.
        out: OutputPort,
        /// What leaves the switch.
        payload: PacketPayload,
    },
}

/// One event observed on the southbound boundary.
pub enum SwitchEvent {
    /// A switch completed its handshake; `sink` is the write side of its
    /// control channel.
    ConnectionUp {
        /// Connection handle.
        conn: ConnectionId,
        /// Write side of the new connection.
        sink: Arc<dyn CommandSink>,
    },
    /// A switch connection closed.
    ConnectionDown {
        /// Connection handle.
        conn: ConnectionId,
    },
    /// A frame missed the switch flow table and was punted to the
    /// controller for a decision.
    PacketIn {
        /// Connection handle.
        conn: ConnectionId,
        /// Port the frame arrived on.
        in_port: PortNo,
        /// Decoded frame, or `None` when decoding failed.
        frame: Option<EthernetFrame>,
        /// Original frame bytes as buffered by the switch.
        raw: Bytes,
    },
}

impl fmt::Debug for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchEvent::ConnectionUp { conn, .. } => {
                f.debug_struct("ConnectionUp").field("conn", conn).finish()
            }
            SwitchEvent::ConnectionDown { conn } => {
                f.debug_struct("ConnectionDown").field("conn", conn).finish()
            }
            SwitchEvent::PacketIn {
                conn,
                in_port,
                frame,
                raw,
            } => f
                .debug_struct("PacketIn")
                .field("conn", conn)
                .field("in_port", in_port)
                .field("frame", frame)
                .field("raw_len", &raw.len())
                .finish(),
        }
    }
}
