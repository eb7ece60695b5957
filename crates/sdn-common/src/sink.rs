//! Southbound command boundary.

use crate::error::SdnResult;
use crate::event::SwitchCommand;
use async_trait::async_trait;

/// Write side of one switch control channel.
///
/// Sends are fire-and-forget: the caller awaits the enqueue, never a switch
/// acknowledgement. An `Err` means the connection is gone; the owning
/// session closes and the command is dropped, not retried and not redirected
/// elsewhere.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Deliver one command to the switch.
    async fn send(&self, cmd: SwitchCommand) -> SdnResult<()>;
}
