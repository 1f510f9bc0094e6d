//! UDP socket construction.
//!
//! Sockets are built with `socket2` so they can be configured before binding, then
//! handed to tokio. Every socket returned here belongs to exactly one session.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use sonar_common::error::SessionError;
use sonar_common::network::interface::Interface;
use sonar_common::network::target::Family;
use tokio::net::UdpSocket;
use tracing::debug;

/// Binds a socket to one local interface address on an ephemeral port.
///
/// When `target` is a multicast group the outgoing multicast interface is pinned to
/// the bound address, so the query leaves on the interface it was meant for.
pub fn bind_query_socket(
    local: SocketAddr,
    interface_index: u32,
    target: &SocketAddr,
) -> Result<UdpSocket, SessionError> {
    let socket = new_socket(&local).map_err(|source| SessionError::Bind { addr: local, source })?;

    if target.ip().is_multicast() {
        if let Err(e) = set_multicast_interface(&socket, &local, interface_index) {
            debug!("could not pin multicast interface for {local}: {e}");
        }
    }

    socket
        .bind(&local.into())
        .map_err(|source| SessionError::Bind { addr: local, source })?;

    into_tokio(socket, local)
}

/// Binds the group's port on the wildcard address and joins `group` on `interface`.
pub fn join_multicast_socket(
    group: SocketAddr,
    interface: &Interface,
) -> Result<UdpSocket, SessionError> {
    let join_error = |source: io::Error| SessionError::Join {
        group,
        interface: interface.name.clone(),
        source,
    };

    match group.ip() {
        IpAddr::V4(group_v4) => {
            let local_if: Ipv4Addr = interface.ipv4().ok_or_else(|| SessionError::UnsupportedFamily {
                interface: interface.name.clone(),
                family: Family::V4.name(),
                group,
            })?;
            let bind_addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), group.port());
            let socket = reusable_socket(&bind_addr)?;
            socket
                .join_multicast_v4(&group_v4, &local_if)
                .map_err(join_error)?;
            into_tokio(socket, bind_addr)
        }
        IpAddr::V6(group_v6) => {
            if !interface.supports(Family::V6) {
                return Err(SessionError::UnsupportedFamily {
                    interface: interface.name.clone(),
                    family: Family::V6.name(),
                    group,
                });
            }
            let bind_addr = SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), group.port());
            let socket = reusable_socket(&bind_addr)?;
            socket
                .join_multicast_v6(&group_v6, interface.index)
                .map_err(join_error)?;
            into_tokio(socket, bind_addr)
        }
    }
}

fn new_socket(addr: &SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(*addr), Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    Ok(socket)
}

/// A socket that can share its port with other listeners, such as the system's own
/// mDNS responder.
fn reusable_socket(bind_addr: &SocketAddr) -> Result<Socket, SessionError> {
    let configure = |source: io::Error| SessionError::Configure { addr: *bind_addr, source };

    let socket = new_socket(bind_addr).map_err(configure)?;
    socket.set_reuse_address(true).map_err(configure)?;

    #[cfg(unix)]
    socket.set_reuse_port(true).map_err(configure)?;

    socket
        .bind(&(*bind_addr).into())
        .map_err(|source| SessionError::Bind { addr: *bind_addr, source })?;
    Ok(socket)
}

fn set_multicast_interface(socket: &Socket, local: &SocketAddr, index: u32) -> io::Result<()> {
    match local.ip() {
        IpAddr::V4(v4) => socket.set_multicast_if_v4(&v4),
        IpAddr::V6(_) => socket.set_multicast_if_v6(index),
    }
}

fn into_tokio(socket: Socket, addr: SocketAddr) -> Result<UdpSocket, SessionError> {
    let configure = |source: io::Error| SessionError::Configure { addr, source };
    socket.set_nonblocking(true).map_err(configure)?;
    UdpSocket::from_std(socket.into()).map_err(configure)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
