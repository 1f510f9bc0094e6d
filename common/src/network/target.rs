//! # Discovery Targets
//!
//! The multicast destinations probed by each protocol.
//!
//! Every protocol owns one IPv4 and one IPv6 group. The group a session talks to
//! is picked by the family of the local address it is bound to, so an IPv4
//! socket never sends to an IPv6 group and vice versa.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

pub const SSDP_PORT: u16 = 1900;
pub const MDNS_PORT: u16 = 5353;

pub const SSDP_TARGETS: DiscoveryTargets = DiscoveryTargets {
    v4: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), SSDP_PORT)),
    v6: SocketAddr::V6(SocketAddrV6::new(
        Ipv6Addr::new(0xff0e, 0, 0, 0, 0, 0, 0, 0xc),
        SSDP_PORT,
        0,
        0,
    )),
};

pub const MDNS_TARGETS: DiscoveryTargets = DiscoveryTargets {
    v4: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(224, 0, 0, 251), MDNS_PORT)),
    v6: SocketAddr::V6(SocketAddrV6::new(
        Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb),
        MDNS_PORT,
        0,
        0,
    )),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ssdp,
    Mdns,
}

impl Protocol {
    /// The label printed in the protocol column of a report line.
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Ssdp => "SSDP",
            Protocol::Mdns => "mDNS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Family::V4 => "IPv4",
            Family::V6 => "IPv6",
        }
    }
}

/// The IPv4 and IPv6 destinations of one protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryTargets {
    pub v4: SocketAddr,
    pub v6: SocketAddr,
}

impl DiscoveryTargets {
    pub fn for_family(&self, family: Family) -> SocketAddr {
        match family {
            Family::V4 => self.v4,
            Family::V6 => self.v6,
        }
    }

    /// Selects the destination matching the family of a local bound address.
    pub fn select(&self, local: &IpAddr) -> SocketAddr {
        self.for_family(Family::of(local))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
