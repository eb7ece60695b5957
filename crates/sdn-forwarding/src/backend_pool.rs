//! Round-robin backend selection for the virtual service.

use parking_lot::Mutex;
use sdn_common::config::BackendConfig;
use sdn_common::error::{SdnError, SdnResult};
use sdn_common::types::{MacAddr, PortNo};
use std::net::Ipv4Addr;

/// One real server behind the virtual address. Immutable once configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Backend network address.
    pub ip: Ipv4Addr,
    /// Backend link address.
    pub mac: MacAddr,
    /// Switch port the backend attaches to.
    pub port: PortNo,
}

impl From<&BackendConfig> for BackendDescriptor {
    fn from(config: &BackendConfig) -> Self {
        Self {
            ip: config.ip,
            mac: config.mac,
            port: config.port,
        }
    }
}

/// Ordered backend set with a round-robin cursor.
///
/// Shared (behind `Arc`) across every packet-in event that targets the
/// virtual address, from any number of concurrent sessions. Selection and
/// cursor advance happen under one lock, so concurrent callers never
/// observe the same slot twice in a row or skip one. The cursor invariant
/// `0 <= cursor < len` holds at every lock release.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<BackendDescriptor>,
    cursor: Mutex<usize>,
}

impl BackendPool {
    /// Build a pool from an ordered backend list.
    ///
    /// An empty list is a fatal configuration error: a controller with no
    /// backends cannot serve.
    pub fn configure(backends: Vec<BackendDescriptor>) -> SdnResult<Self> {
        if backends.is_empty() {
            return Err(SdnError::EmptyPool);
        }
        Ok(Self {
            backends,
            cursor: Mutex::new(0),
        })
    }

    /// Build a pool straight from configuration.
    pub fn from_config(backends: &[BackendConfig]) -> SdnResult<Self> {
        Self::configure(backends.iter().map(BackendDescriptor::from).collect())
    }

    /// Return the backend at the cursor, then advance modulo pool size.
    pub fn next(&self) -> BackendDescriptor {
        let mut cursor = self.cursor.lock();
        let picked = self.backends[*cursor];
        *cursor = (*cursor + 1) % self.backends.len();
        picked
    }

    /// Number of configured backends. Always nonzero.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Never true; kept for the conventional pair with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
