//! Per-protocol fan-out over interfaces and their addresses.
//!
//! A [`Scanner`] turns the interface list into a flat list of [`SessionPlan`]s and
//! spawns one task per plan. Tasks are independent: a session that dies takes
//! nobody else with it, and the scanner does not coordinate them after launch.

use std::net::{IpAddr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::Arc;

use sonar_common::error::SessionError;
use sonar_common::network::interface::Interface;
use sonar_common::network::target::{DiscoveryTargets, Family};
use sonar_protocols::DiscoveryCodec;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::reporter::Reporter;

mod session;

/// One session to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPlan {
    /// Bind to `local`, query `target`, listen for replies.
    Query {
        interface: String,
        index: u32,
        local: SocketAddr,
        target: SocketAddr,
    },
    /// Join `group` on `interface` and listen without querying.
    Passive {
        interface: Interface,
        group: SocketAddr,
    },
}

pub struct Scanner<C> {
    codec: Arc<C>,
    targets: DiscoveryTargets,
    passive: bool,
}

impl<C: DiscoveryCodec> Scanner<C> {
    pub fn new(codec: C, targets: DiscoveryTargets, passive: bool) -> Self {
        Self {
            codec: Arc::new(codec),
            targets,
            passive,
        }
    }

    /// Every session this scanner would start for `interfaces`.
    pub fn plan(&self, interfaces: &[Interface]) -> Vec<SessionPlan> {
        let mut plans = Vec::new();

        for interface in interfaces {
            if self.passive {
                for family in [Family::V4, Family::V6] {
                    if interface.supports(family) {
                        plans.push(SessionPlan::Passive {
                            interface: interface.clone(),
                            group: scoped(self.targets.for_family(family), interface.index),
                        });
                    }
                }
            }

            let addresses = match interface.bound_addresses() {
                Ok(addresses) => addresses,
                Err(e) => {
                    warn!(protocol = %self.codec.protocol(), "{e}, skipping");
                    continue;
                }
            };

            for addr in addresses.into_iter().filter(is_queryable) {
                plans.push(SessionPlan::Query {
                    interface: interface.name.clone(),
                    index: interface.index,
                    local: scoped(SocketAddr::new(addr, 0), interface.index),
                    target: scoped(self.targets.select(&addr), interface.index),
                });
            }
        }

        plans
    }

    /// Spawns every planned session. Each handle resolves when its session ends.
    pub fn launch(
        &self,
        interfaces: &[Interface],
        reporter: &Reporter,
        cancel: &CancellationToken,
    ) -> Vec<JoinHandle<Result<(), SessionError>>> {
        self.plan(interfaces)
            .into_iter()
            .map(|plan| self.spawn(plan, reporter.clone(), cancel.clone()))
            .collect()
    }

    fn spawn(
        &self,
        plan: SessionPlan,
        reporter: Reporter,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<(), SessionError>> {
        let codec = Arc::clone(&self.codec);
        let protocol = codec.protocol();
        debug!("{protocol}: starting {plan:?}");

        tokio::spawn(async move {
            let result = match plan {
                SessionPlan::Query { index, local, target, .. } => {
                    session::query_and_listen(codec, local, index, target, reporter, cancel).await
                }
                SessionPlan::Passive { interface, group } => {
                    session::listen_multicast(codec, group, interface, reporter, cancel).await
                }
            };
            if let Err(e) = &result {
                error!(protocol = %protocol, "{e}");
            }
            result
        })
    }
}

/// Attaches the interface index to IPv6 addresses that are only meaningful on one link.
fn scoped(addr: SocketAddr, index: u32) -> SocketAddr {
    match addr {
        SocketAddr::V6(v6) if needs_scope(v6.ip()) => {
            SocketAddr::V6(SocketAddrV6::new(*v6.ip(), v6.port(), v6.flowinfo(), index))
        }
        other => other,
    }
}

fn needs_scope(ip: &Ipv6Addr) -> bool {
    let link_local_multicast = ip.is_multicast() && ip.segments()[0] & 0x000f == 0x0002;
    ip.is_unicast_link_local() || link_local_multicast
}

fn is_queryable(addr: &IpAddr) -> bool {
    !addr.is_unspecified() && !addr.is_multicast()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
