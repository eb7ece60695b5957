//! Virtual-service (load balancer) decision pipeline.
//!
//! Owns no resolution table. ARP requests for the virtual address are
//! answered on its behalf with the next backend's link address; IPv4
//! datagrams to the virtual address install a forward/reverse rewrite rule
//! pair so the switch carries the flow without further controller
//! involvement. Everything else falls back to flooding.

use crate::backend_pool::BackendPool;
use crate::classifier::ClassifiedEvent;
use crate::policy::{flood, ForwardingPolicy, PacketContext};
use sdn_common::config::VirtualServiceConfig;
use sdn_common::event::{ArpReplySpec, PacketPayload, SwitchCommand};
use sdn_common::rule::{Action, FlowRuleSpec, MatchFields, PRIORITY_VIRTUAL_SERVICE};
use sdn_common::types::{OutputPort, PortNo};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info};

/// Round-robin load balancer fronting one virtual address.
pub struct VirtualService {
    virtual_ip: Ipv4Addr,
    uplink_port: Option<PortNo>,
    pool: Arc<BackendPool>,
}

impl VirtualService {
    /// A virtual service over an already-configured shared pool.
    pub fn new(virtual_ip: Ipv4Addr, uplink_port: Option<PortNo>, pool: Arc<BackendPool>) -> Self {
        Self {
            virtual_ip,
            uplink_port,
            pool,
        }
    }

    /// The service settings paired with the shared pool.
    pub fn from_config(config: &VirtualServiceConfig, pool: Arc<BackendPool>) -> Self {
        Self::new(config.virtual_ip, config.uplink_port, pool)
    }

    /// The virtual address this service fronts.
    pub fn virtual_ip(&self) -> Ipv4Addr {
        self.virtual_ip
    }
}

impl ForwardingPolicy for VirtualService {
    fn decide(&mut self, ctx: &PacketContext) -> Vec<SwitchCommand> {
        match ctx.event {
            ClassifiedEvent::ArpRequest {
                sender_ip,
                sender_mac,
                target_ip,
            } => {
                if target_ip != self.virtual_ip {
                    debug!(%target_ip, "arp request not for the virtual address, flooding");
                    return vec![flood(&ctx.raw)];
                }
                let backend = self.pool.next();
                info!(vip = %self.virtual_ip, backend = %backend.ip, mac = %backend.mac,
                    "answering arp for the virtual address");
                // Unicast back to the requester's port only, never flooded.
                vec![SwitchCommand::EmitPacket {
                    out: OutputPort::Physical(ctx.in_port),
                    payload: PacketPayload::ArpReply(ArpReplySpec {
                        sender_mac: backend.mac,
                        sender_ip: self.virtual_ip,
                        target_mac: sender_mac,
                        target_ip: sender_ip,
                    }),
                }]
            }
            ClassifiedEvent::ArpReply { sender_ip, .. } => {
                debug!(%sender_ip, "ignoring arp reply");
                Vec::new()
            }
            ClassifiedEvent::Ipv4 { src, dst } => {
                if dst != self.virtual_ip {
                    debug!(%dst, "datagram not for the virtual address, flooding");
                    return vec![flood(&ctx.raw)];
                }
                let backend = self.pool.next();
                let reverse_out = self.uplink_port.unwrap_or(ctx.in_port);
                info!(client = %src, backend = %backend.ip, reverse_out = %reverse_out,
                    "installing virtual-service flow pair");
                vec![
                    SwitchCommand::InstallRule(
                        FlowRuleSpec::new(
                            MatchFields::ipv4().dst(self.virtual_ip),
                            PRIORITY_VIRTUAL_SERVICE,
                        )
                        .action(Action::RewriteDst(backend.ip))
                        .action(Action::Output(OutputPort::Physical(backend.port))),
                    ),
                    SwitchCommand::InstallRule(
                        FlowRuleSpec::new(
                            MatchFields::ipv4().src(backend.ip).dst(src),
                            PRIORITY_VIRTUAL_SERVICE,
                        )
                        .action(Action::RewriteSrc(self.virtual_ip))
                        .action(Action::Output(OutputPort::Physical(reverse_out))),
                    ),
                ]
            }
            ClassifiedEvent::Unparsed | ClassifiedEvent::Other => Vec::new(),
        }
    }
}
