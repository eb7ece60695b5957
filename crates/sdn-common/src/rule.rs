//! Flow-rule descriptions.
//!
//! A flow rule is a match plus an ordered action list at a priority,
//! installed into the switch flow table so matching packets stop reaching
//! the controller. Installation is fire-and-forget and idempotent:
//! reinstalling the same match and priority overwrites the previous rule.

use crate::types::OutputPort;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Priority of the baseline ARP-to-controller redirect.
pub const PRIORITY_ARP_REDIRECT: u16 = 100;

/// Priority of virtual-service rewrite rules.
pub const PRIORITY_VIRTUAL_SERVICE: u16 = 20;

/// Priority of learned unicast paths.
pub const PRIORITY_LEARNED_PATH: u16 = 10;

/// Ethertypes a rule can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtherType {
    /// 0x0806.
    Arp,
    /// 0x0800.
    Ipv4,
}

/// Match side of a flow rule. Unset fields are wildcards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFields {
    /// Frame ethertype.
    pub ethertype: Option<EtherType>,
    /// IPv4 source address.
    pub ipv4_src: Option<Ipv4Addr>,
    /// IPv4 destination address.
    pub ipv4_dst: Option<Ipv4Addr>,
}

impl MatchFields {
    /// Match every frame.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Match all ARP traffic.
    pub fn arp() -> Self {
        Self {
            ethertype: Some(EtherType::Arp),
            ..Self::default()
        }
    }

    /// Match IPv4 traffic; narrow with [`src`](Self::src) / [`dst`](Self::dst).
    pub fn ipv4() -> Self {
        Self {
            ethertype: Some(EtherType::Ipv4),
            ..Self::default()
        }
    }

    /// Narrow to one IPv4 source address.
    pub fn src(mut self, ip: Ipv4Addr) -> Self {
        self.ipv4_src = Some(ip);
        self
    }

    /// Narrow to one IPv4 destination address.
    pub fn dst(mut self, ip: Ipv4Addr) -> Self {
        self.ipv4_dst = Some(ip);
        self
    }
}

/// One action in a rule's ordered action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Forward out a port.
    Output(OutputPort),
    /// Rewrite the IPv4 destination address.
    RewriteDst(Ipv4Addr),
    /// Rewrite the IPv4 source address.
    RewriteSrc(Ipv4Addr),
}

/// A complete flow-rule description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRuleSpec {
    /// What the rule matches.
    pub match_fields: MatchFields,
    /// Applied in order to matching packets.
    pub actions: Vec<Action>,
    /// Higher wins.
    pub priority: u16,
}

impl FlowRuleSpec {
    /// A rule with no actions yet; chain [`action`](Self::action) to fill it.
    pub fn new(match_fields: MatchFields, priority: u16) -> Self {
        Self {
            match_fields,
            actions: Vec::new(),
            priority,
        }
    }

    /// Append one action.
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}
