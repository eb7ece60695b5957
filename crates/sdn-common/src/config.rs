//! Static controller configuration.
//!
//! Loading and parsing config files is the embedding process's job; these
//! structs are the surface it fills in before handing control to the
//! service.

use crate::error::{SdnError, SdnResult};
use crate::types::{MacAddr, PortNo};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// One real server behind the virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend network address.
    pub ip: Ipv4Addr,
    /// Backend link address, asserted in ARP replies for the virtual
    /// address.
    pub mac: MacAddr,
    /// Switch port the backend attaches to.
    pub port: PortNo,
}

/// Virtual-service (load balancer) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServiceConfig {
    /// The service address; not bound to any single backend.
    pub virtual_ip: Ipv4Addr,
    /// Fixed output port for reverse (backend-to-client) rules. When unset,
    /// the client's observed ingress port is used instead.
    #[serde(default)]
    pub uplink_port: Option<PortNo>,
    /// Ordered backend set, served round-robin.
    pub backends: Vec<BackendConfig>,
}

/// Which decision pipeline the controller runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Learn source addresses, answer resolvable ARP requests, install
    /// learned unicast paths, flood the rest.
    LearningSwitch,
    /// Answer ARP for the virtual address and spread flows across the
    /// backend pool.
    VirtualService(VirtualServiceConfig),
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Decision pipeline.
    pub mode: PolicyMode,
    /// Install a baseline rule redirecting all ARP traffic to the
    /// controller when a session comes up. A fast-path optimization, not
    /// required for correctness.
    #[serde(default = "default_arp_fast_path")]
    pub arp_fast_path: bool,
    /// Seconds a learned address-resolution entry stays valid. Unset keeps
    /// entries for the life of the session.
    #[serde(default)]
    pub arp_ttl_secs: Option<u64>,
    /// Per-session event queue depth.
    #[serde(default = "default_session_queue")]
    pub session_queue: usize,
}

fn default_arp_fast_path() -> bool {
    true
}

fn default_session_queue() -> usize {
    256
}

impl ControllerConfig {
    /// A learning-switch controller with default settings.
    pub fn learning_switch() -> Self {
        Self {
            mode: PolicyMode::LearningSwitch,
            arp_fast_path: default_arp_fast_path(),
            arp_ttl_secs: None,
            session_queue: default_session_queue(),
        }
    }

    /// A virtual-service controller with default settings.
    pub fn virtual_service(service: VirtualServiceConfig) -> Self {
        Self {
            mode: PolicyMode::VirtualService(service),
            arp_fast_path: default_arp_fast_path(),
            arp_ttl_secs: None,
            session_queue: default_session_queue(),
        }
    }

    /// Reject configurations the controller cannot serve.
    ///
    /// An empty backend pool is fatal at startup; the service never enters
    /// its dispatch loop with one.
    pub fn validate(&self) -> SdnResult<()> {
        if self.session_queue == 0 {
            return Err(SdnError::Config("session_queue must be nonzero".into()));
        }
        if let PolicyMode::VirtualService(service) = &self.mode {
            if service.backends.is_empty() {
                return Err(SdnError::EmptyPool);
            }
            let mut seen = HashSet::new();
            for backend in &service.backends {
                if !seen.insert(backend.ip) {
                    return Err(SdnError::Config(format!(
                        "duplicate backend ip {}",
                        backend.ip
                    )));
                }
                if backend.ip == service.virtual_ip {
                    return Err(SdnError::Config(format!(
                        "backend ip {} collides with the virtual address",
                        backend.ip
                    )));
                }
            }
        }
        Ok(())
    }
}
