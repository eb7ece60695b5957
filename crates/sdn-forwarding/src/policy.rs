//! Decision pipeline seam.

use crate::classifier::ClassifiedEvent;
use bytes::Bytes;
use sdn_common::event::{PacketPayload, SwitchCommand};
use sdn_common::types::{MacAddr, OutputPort, PortNo};

/// Everything a policy may consult about one packet-in.
#[derive(Debug, Clone)]
pub struct PacketContext {
    /// Port the frame arrived on.
    pub in_port: PortNo,
    /// Classifier verdict.
    pub event: ClassifiedEvent,
    /// Source link address of the decoded frame, when decoding succeeded.
    pub src_mac: Option<MacAddr>,
    /// Original buffered bytes, re-emitted as-is on flood or forward.
    pub raw: Bytes,
}

/// One decision pipeline: classification result in, switch commands out.
///
/// Implementations mutate only their own state (resolution table, pool
/// cursor); every switch-visible effect comes back as a command for the
/// session to deliver. `decide` is total over [`ClassifiedEvent`] and an
/// empty return means the packet is dropped.
pub trait ForwardingPolicy: Send {
    /// Decide what the switch should do with one packet-in.
    fn decide(&mut self, ctx: &PacketContext) -> Vec<SwitchCommand>;
}

/// Flood the original frame out every port except the ingress.
///
/// The universal fallback for an unknown destination: one packet-out of the
/// buffered bytes, never re-encoded, never silently dropped.
pub(crate) fn flood(raw: &Bytes) -> SwitchCommand {
    SwitchCommand::EmitPacket {
        out: OutputPort::Flood,
        payload: PacketPayload::Raw(raw.clone()),
    }
}
