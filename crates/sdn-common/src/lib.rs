//! OpenSDN Common - Shared types for the switch controller
//!
//! This crate provides the vocabulary every other controller crate speaks:
//! - Addressing values (MAC, port, connection handle)
//! - The decoded-frame view handed over by the control channel
//! - Southbound events and commands
//! - Flow-rule descriptions
//! - Static configuration and the error taxonomy
//!
//! Nothing here performs I/O or touches wire bytes; encoding and decoding of
//! Ethernet/ARP/IPv4 headers and of the control-channel framing belong to the
//! channel collaborator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod rule;
pub mod sink;
pub mod types;

pub use config::{BackendConfig, ControllerConfig, PolicyMode, VirtualServiceConfig};
pub use error::{SdnError, SdnResult};
pub use event::{ArpReplySpec, PacketPayload, SwitchCommand, SwitchEvent};
pub use frame::{ArpOp, ArpPacket, EthernetFrame, FramePayload, Ipv4Packet};
pub use rule::{Action, EtherType, FlowRuleSpec, MatchFields};
pub use sink::CommandSink;
pub use types::{ConnectionId, MacAddr, OutputPort, PortNo};
