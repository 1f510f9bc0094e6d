use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Reasons a single socket session stops.
///
/// Every variant is fatal to the session that produced it and to nothing else.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to configure socket for {addr}: {source}")]
    Configure { addr: SocketAddr, source: io::Error },

    #[error("failed to join {group} on {interface}: {source}")]
    Join {
        group: SocketAddr,
        interface: String,
        source: io::Error,
    },

    #[error("failed to send to {dst}: {source}")]
    Send { dst: SocketAddr, source: io::Error },

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("{0}")]
    Decode(String),

    #[error("report channel closed")]
    OutputClosed,

    #[error("{interface} has no {family} address to join {group} with")]
    UnsupportedFamily {
        interface: String,
        family: &'static str,
        group: SocketAddr,
    },
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum InterfaceError {
    /// Nothing usable came back from the operating system.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    #[error("interface {0} has no bound addresses")]
    NoAddresses(String),

    #[error("interface {0} does not exist or is down")]
    UnknownInterface(String),
}
