//! Packet classification.
//!
//! First stage of every packet-in: map the decoded frame (or the decode
//! failure) onto exactly one typed event. Pure function of the frame; all
//! side effects live in the policies.

use sdn_common::frame::{ArpOp, EthernetFrame, FramePayload};
use sdn_common::types::MacAddr;
use std::net::Ipv4Addr;

/// Typed result of inspecting one packet-in.
///
/// Produced fresh per packet, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// ARP who-has.
    ArpRequest {
        /// Requester's protocol address.
        sender_ip: Ipv4Addr,
        /// Requester's link address.
        sender_mac: MacAddr,
        /// Address being resolved.
        target_ip: Ipv4Addr,
    },
    /// ARP is-at.
    ArpReply {
        /// Answerer's protocol address.
        sender_ip: Ipv4Addr,
        /// Answerer's link address.
        sender_mac: MacAddr,
    },
    /// IPv4 datagram.
    Ipv4 {
        /// Source address.
        src: Ipv4Addr,
        /// Destination address.
        dst: Ipv4Addr,
    },
    /// The channel could not decode the frame. Log and drop; nothing else
    /// runs.
    Unparsed,
    /// Decodable, but not a protocol the controller acts on.
    Other,
}

/// Classify one packet-in.
///
/// Total: every input maps to exactly one event, and nothing panics on a
/// frame with missing or odd optional fields — an undecodable frame is the
/// `None` case and an unknown ARP opcode is `Other`.
pub fn classify(frame: Option<&EthernetFrame>) -> ClassifiedEvent {
    let frame = match frame {
        Some(frame) => frame,
        None => return ClassifiedEvent::Unparsed,
    };
    match &frame.payload {
        FramePayload::Arp(arp) => match arp.op {
            ArpOp::Request => ClassifiedEvent::ArpRequest {
                sender_ip: arp.sender_ip,
                sender_mac: arp.sender_mac,
                target_ip: arp.target_ip,
            },
            ArpOp::Reply => ClassifiedEvent::ArpReply {
                sender_ip: arp.sender_ip,
                sender_mac: arp.sender_mac,
            },
            ArpOp::Other(_) => ClassifiedEvent::Other,
        },
        FramePayload::Ipv4(ip) => ClassifiedEvent::Ipv4 {
            src: ip.src,
            dst: ip.dst,
        },
        FramePayload::Other { .. } => ClassifiedEvent::Other,
    }
}
