use std::time::Duration;

use crate::network::target::{DiscoveryTargets, MDNS_TARGETS, SSDP_TARGETS};

/// Service names probed with PTR questions when nothing else is configured.
pub const DEFAULT_MDNS_SERVICES: [&str; 3] = [
    "_googlecast._tcp.local.",
    "_axis-video._tcp.local.",
    "_http._tcp.local.",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Run the SSDP scanner.
    pub ssdp: bool,
    /// Run the mDNS scanner.
    pub mdns: bool,
    /// Join the mDNS multicast groups and listen for unsolicited announcements.
    ///
    /// Has no effect when `mdns` is disabled.
    pub passive: bool,
    pub include_loopback: bool,
    /// Interface names to scan on. Empty means every usable interface.
    pub interfaces: Vec<String>,
    /// Stop the scan after this long. `None` runs until shutdown.
    pub duration: Option<Duration>,
    pub ssdp_targets: DiscoveryTargets,
    pub mdns_targets: DiscoveryTargets,
    pub mdns_services: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssdp: true,
            mdns: true,
            passive: true,
            include_loopback: false,
            interfaces: Vec::new(),
            duration: None,
            ssdp_targets: SSDP_TARGETS,
            mdns_targets: MDNS_TARGETS,
            mdns_services: DEFAULT_MDNS_SERVICES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
