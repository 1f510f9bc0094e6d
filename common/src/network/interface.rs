//! # Interface Enumeration
//!
//! Turns the operating system's interface table into the [`Interface`] list the
//! scanners fan out over. Enumeration is the only step whose failure aborts a run.

use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use tracing::debug;

use crate::config::Config;
use crate::error::InterfaceError;
use crate::network::target::Family;

/// A network interface and the addresses bound to it, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub index: u32,
    pub addresses: Vec<IpNetwork>,
    pub multicast: bool,
    pub loopback: bool,
}

impl Interface {
    pub fn new(name: impl Into<String>, index: u32, addresses: Vec<IpNetwork>) -> Self {
        Self {
            name: name.into(),
            index,
            addresses,
            multicast: true,
            loopback: false,
        }
    }

    /// Bare IPs of every bound address, with the prefix length stripped.
    pub fn bound_addresses(&self) -> Result<Vec<IpAddr>, InterfaceError> {
        if self.addresses.is_empty() {
            return Err(InterfaceError::NoAddresses(self.name.clone()));
        }
        Ok(self
            .addresses
            .iter()
            .map(|net| net.ip().to_canonical())
            .collect())
    }

    /// First IPv4 address, used to pick the interface when joining an IPv4 group.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.addresses.iter().find_map(|net| match net.ip().to_canonical() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
    }

    /// Whether discovery can run here: bound addresses, and either multicast capable
    /// or a loopback the caller opted into.
    pub fn is_usable(&self, include_loopback: bool) -> bool {
        if self.addresses.is_empty() {
            return false;
        }
        match self.loopback {
            true => include_loopback,
            false => self.multicast,
        }
    }

    pub fn supports(&self, family: Family) -> bool {
        self.addresses
            .iter()
            .any(|net| Family::of(&net.ip()) == family)
    }
}

impl From<&NetworkInterface> for Interface {
    fn from(iface: &NetworkInterface) -> Self {
        Self {
            name: iface.name.clone(),
            index: iface.index,
            addresses: iface.ips.clone(),
            multicast: iface.is_multicast(),
            loopback: iface.is_loopback(),
        }
    }
}

/// Lists the interfaces a scan should run on.
pub fn enumerate(cfg: &Config) -> Result<Vec<Interface>, InterfaceError> {
    select(datalink::interfaces(), cfg)
}

fn select(raw: Vec<NetworkInterface>, cfg: &Config) -> Result<Vec<Interface>, InterfaceError> {
    let usable: Vec<Interface> = raw
        .iter()
        .filter(|iface| iface.is_up())
        .map(Interface::from)
        .filter(|iface| {
            let keep = iface.is_usable(cfg.include_loopback);
            if !keep {
                debug!("skipping interface {}", iface.name);
            }
            keep
        })
        .collect();

    if cfg.interfaces.is_empty() {
        return match usable.is_empty() {
            true => Err(InterfaceError::NoInterfaces),
            false => Ok(usable),
        };
    }

    cfg.interfaces
        .iter()
        .map(|wanted| {
            usable
                .iter()
                .find(|iface| &iface.name == wanted)
                .cloned()
                .ok_or_else(|| InterfaceError::UnknownInterface(wanted.clone()))
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
