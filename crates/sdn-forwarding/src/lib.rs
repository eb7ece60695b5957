//! OpenSDN Forwarding - the decision core
//!
//! Pure packet-in processing for the controller:
//!
//! ```text
//! packet-in ──▶ classify ──▶ ForwardingPolicy::decide ──▶ [SwitchCommand]
//!                                  │
//!                     ┌────────────┴─────────────┐
//!                     ▼                          ▼
//!               ArpTable (owned)         BackendPool (shared)
//! ```
//!
//! Nothing here performs I/O. Policies mutate only their own state (the
//! resolution table, the pool cursor) and return every switch-visible effect
//! as a command for the session layer to deliver.

pub mod arp_table;
pub mod backend_pool;
pub mod classifier;
pub mod learning;
pub mod policy;
pub mod virtual_service;

pub use arp_table::{ArpEntry, ArpTable};
pub use backend_pool::{BackendDescriptor, BackendPool};
pub use classifier::{classify, ClassifiedEvent};
pub use learning::LearningSwitch;
pub use policy::{ForwardingPolicy, PacketContext};
pub use virtual_service::VirtualService;
