//! Error types for the controller workspace.

use crate::types::ConnectionId;
use thiserror::Error;

/// Controller error type.
///
/// Decode failures and lookup misses are not errors: an undecodable frame is
/// logged and dropped where it is detected, and an unknown destination
/// resolves to flooding. Only an unserveable configuration and a dead
/// connection surface here, and each terminates no more than the affected
/// session.
#[derive(Error, Debug)]
pub enum SdnError {
    /// Backend pool configured with no backends.
    #[error("backend pool configured empty")]
    EmptyPool,

    /// Invalid static configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Outbound command could not be delivered; the connection is gone.
    #[error("send failed on connection {conn}: {reason}")]
    Send {
        /// The connection the send targeted.
        conn: ConnectionId,
        /// What the channel reported.
        reason: String,
    },
}

/// Result type for the controller workspace.
pub type SdnResult<T> = Result<T, SdnError>;
