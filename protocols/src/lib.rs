//! Wire codecs for the discovery protocols.
//!
//! A codec knows how to build the probe datagrams for its protocol and how to
//! turn an inbound datagram into zero or more printable records. Formatting of
//! the final report line is not a codec concern.

use std::net::SocketAddr;

use sonar_common::network::target::Protocol;
use thiserror::Error;

pub mod dns;
pub mod mdns;
pub mod ssdp;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to build query for {service}: {reason}")]
    Build { service: String, reason: String },

    #[error("failed to decode message: {0}")]
    Decode(#[from] dns::DnsError),
}

pub trait DiscoveryCodec: Send + Sync + 'static {
    fn protocol(&self) -> Protocol;

    /// Datagrams to send to `destination` before listening.
    ///
    /// Each entry is sent independently; a failed entry does not stop the rest.
    fn queries(&self, destination: SocketAddr) -> Vec<Result<Vec<u8>, CodecError>>;

    /// Records carried by one inbound datagram.
    ///
    /// An `Err` ends the session that received the datagram.
    fn decode(&self, payload: &[u8]) -> Result<Vec<String>, CodecError>;
}
