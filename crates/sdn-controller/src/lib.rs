//! OpenSDN Controller - session orchestration
//!
//! The layer between the decision core and the switch control channel:
//!
//! ```text
//! SwitchEvent ──▶ ControllerService ──▶ SwitchSession (one task per
//!                  (registry +            connection, FIFO)
//!                   dispatch)                │
//!                                            ▼
//!                                  classify → decide → CommandSink
//! ```
//!
//! One session per switch connection, each driving its own policy instance
//! over its own event queue. Events from one switch are processed in arrival
//! order; different switches proceed concurrently on separate tasks.

pub mod service;
pub mod session;

pub use service::ControllerService;
pub use session::{SessionState, SessionStats, StatsSnapshot, SwitchSession};

#[cfg(test)]
pub(crate) mod testutil;
