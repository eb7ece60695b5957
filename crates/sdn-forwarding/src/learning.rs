//! Learning-switch decision pipeline.
//!
//! Learns the source of every observed frame, answers ARP requests it can
//! resolve from its cache, installs unicast paths for resolved IPv4
//! destinations, and floods what it cannot resolve.

use crate::arp_table::ArpTable;
use crate::classifier::ClassifiedEvent;
use crate::policy::{flood, ForwardingPolicy, PacketContext};
use sdn_common::event::{ArpReplySpec, PacketPayload, SwitchCommand};
use sdn_common::rule::{Action, FlowRuleSpec, MatchFields, PRIORITY_LEARNED_PATH};
use sdn_common::types::OutputPort;
use tracing::debug;

/// Plain ARP responder and learning switch.
pub struct LearningSwitch {
    table: ArpTable,
}

impl LearningSwitch {
    /// A learning switch over the given (typically fresh) table.
    pub fn new(table: ArpTable) -> Self {
        Self { table }
    }

    /// The resolution table, for introspection.
    pub fn table(&self) -> &ArpTable {
        &self.table
    }
}

impl ForwardingPolicy for LearningSwitch {
    fn decide(&mut self, ctx: &PacketContext) -> Vec<SwitchCommand> {
        match ctx.event {
            ClassifiedEvent::ArpRequest {
                sender_ip,
                sender_mac,
                target_ip,
            } => {
                self.table.learn(sender_ip, sender_mac, ctx.in_port);
                match self.table.lookup(target_ip) {
                    Some(entry) => {
                        debug!(%target_ip, mac = %entry.mac, in_port = %ctx.in_port,
                            "answering arp request from cache");
                        vec![SwitchCommand::EmitPacket {
                            out: OutputPort::Physical(ctx.in_port),
                            payload: PacketPayload::ArpReply(ArpReplySpec {
                                sender_mac: entry.mac,
                                sender_ip: target_ip,
                                target_mac: sender_mac,
                                target_ip: sender_ip,
                            }),
                        }]
                    }
                    None => {
                        debug!(%target_ip, "arp target unknown, flooding request");
                        vec![flood(&ctx.raw)]
                    }
                }
            }
            ClassifiedEvent::ArpReply {
                sender_ip,
                sender_mac,
            } => {
                // Replies only refresh the cache; they are not forwarded.
                self.table.learn(sender_ip, sender_mac, ctx.in_port);
                debug!(%sender_ip, mac = %sender_mac, "cached arp reply");
                Vec::new()
            }
            ClassifiedEvent::Ipv4 { src, dst } => {
                if let Some(src_mac) = ctx.src_mac {
                    self.table.learn(src, src_mac, ctx.in_port);
                }
                match self.table.lookup(dst) {
                    Some(entry) => {
                        debug!(%dst, port = %entry.port, "installing learned path");
                        vec![
                            SwitchCommand::InstallRule(
                                FlowRuleSpec::new(
                                    MatchFields::ipv4().dst(dst),
                                    PRIORITY_LEARNED_PATH,
                                )
                                .action(Action::Output(OutputPort::Physical(entry.port))),
                            ),
                            // The rule does not apply to the packet already
                            // buffered at the controller; emit it directly.
                            SwitchCommand::EmitPacket {
                                out: OutputPort::Physical(entry.port),
                                payload: PacketPayload::Raw(ctx.raw.clone()),
                            },
                        ]
                    }
                    None => {
                        debug!(%dst, "destination unknown, flooding");
                        vec![flood(&ctx.raw)]
                    }
                }
            }
            ClassifiedEvent::Unparsed | ClassifiedEvent::Other => Vec::new(),
        }
    }
}
