//! Decoded link-layer frames.
//!
//! The control channel decodes Ethernet/ARP/IPv4 headers before handing a
//! packet-in to the controller; this is the typed view it delivers. A frame
//! the channel failed to decode arrives as `None` and classifies as
//! unparsed.

use crate::types::MacAddr;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// ARP operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArpOp {
    /// Who-has.
    Request,
    /// Is-at.
    Reply,
    /// Any other opcode; carried through but never acted on.
    Other(u16),
}

/// Typed view of an Ethernet/IPv4 ARP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpPacket {
    /// Operation code.
    pub op: ArpOp,
    /// Sender hardware address.
    pub sender_mac: MacAddr,
    /// Sender protocol address.
    pub sender_ip: Ipv4Addr,
    /// Target hardware address (all-zero in requests).
    pub target_mac: MacAddr,
    /// Target protocol address.
    pub target_ip: Ipv4Addr,
}

/// The IPv4 header fields the controller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Packet {
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
}

/// Payload of a decoded frame, tagged by protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramePayload {
    /// ARP payload.
    Arp(ArpPacket),
    /// IPv4 datagram.
    Ipv4(Ipv4Packet),
    /// Some other protocol the controller ignores.
    Other {
        /// The frame's ethertype.
        ethertype: u16,
    },
}

/// One decoded Ethernet frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetFrame {
    /// Source link address.
    pub src: MacAddr,
    /// Destination link address.
    pub dst: MacAddr,
    /// Decoded payload.
    pub payload: FramePayload,
}

impl EthernetFrame {
    /// An ARP frame, request or reply, as the channel would deliver it.
    pub fn arp(src: MacAddr, dst: MacAddr, arp: ArpPacket) -> Self {
        Self {
            src,
            dst,
            payload: FramePayload::Arp(arp),
        }
    }

    /// An IPv4 frame.
    pub fn ipv4(src: MacAddr, dst: MacAddr, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Self {
        Self {
            src,
            dst,
            payload: FramePayload::Ipv4(Ipv4Packet {
                src: src_ip,
                dst: dst_ip,
            }),
        }
    }
}
