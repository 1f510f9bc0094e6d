//! One socket, one query, one receive loop.
//!
//! A session moves through `binding → sending → receiving` and stops for good on the
//! first fatal error. Passive sessions skip the sending step.

use std::net::SocketAddr;
use std::sync::Arc;

use sonar_common::error::SessionError;
use sonar_common::network::interface::Interface;
use sonar_protocols::DiscoveryCodec;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::network::transport;
use crate::reporter::Reporter;

/// Large enough for any mDNS message (RFC 6762 §17).
const RECV_BUFFER_LEN: usize = 9000;

struct Session<C> {
    codec: Arc<C>,
    socket: UdpSocket,
    reporter: Reporter,
    cancel: CancellationToken,
}

/// Binds to `local`, sends the codec's queries to `target` and reports replies.
pub(crate) async fn query_and_listen<C: DiscoveryCodec>(
    codec: Arc<C>,
    local: SocketAddr,
    interface_index: u32,
    target: SocketAddr,
    reporter: Reporter,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    let socket = transport::bind_query_socket(local, interface_index, &target)?;
    let session = Session { codec, socket, reporter, cancel };
    session.query(target).await?;
    session.listen().await
}

/// Joins `group` on `interface` and reports whatever arrives.
pub(crate) async fn listen_multicast<C: DiscoveryCodec>(
    codec: Arc<C>,
    group: SocketAddr,
    interface: Interface,
    reporter: Reporter,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    let socket = transport::join_multicast_socket(group, &interface)?;
    debug!("{}: joined {group} on {}", codec.protocol(), interface.name);
    let session = Session { codec, socket, reporter, cancel };
    session.listen().await
}

impl<C: DiscoveryCodec> Session<C> {
    /// Sends every query. Fails only when none of them could be sent.
    async fn query(&self, target: SocketAddr) -> Result<(), SessionError> {
        let protocol = self.codec.protocol();
        let mut sent: usize = 0;
        let mut failures: Vec<SessionError> = Vec::new();

        for query in self.codec.queries(target) {
            let bytes = match query {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(protocol = %protocol, "{e}");
                    continue;
                }
            };
            match self.socket.send_to(&bytes, target).await {
                Ok(_) => sent += 1,
                Err(source) => failures.push(SessionError::Send { dst: target, source }),
            }
        }

        // The last failure is reported by whoever receives it.
        let fatal = match sent {
            0 => failures.pop(),
            _ => None,
        };
        for e in &failures {
            error!(protocol = %protocol, "{e}");
        }
        fatal.map_or(Ok(()), Err)
    }

    async fn listen(&self) -> Result<(), SessionError> {
        let mut buffer = vec![0u8; RECV_BUFFER_LEN];

        loop {
            let (size, source) = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                received = self.socket.recv_from(&mut buffer) => {
                    received.map_err(SessionError::Receive)?
                }
            };

            let records = self
                .codec
                .decode(&buffer[..size])
                .map_err(|e| SessionError::Decode(e.to_string()))?;

            let source_ip = source.ip().to_canonical();
            for record in records {
                match self.reporter.print(source_ip, &record) {
                    // The aggregator stops reading once the run is cancelled.
                    Err(SessionError::OutputClosed) if self.cancel.is_cancelled() => return Ok(()),
                    result => result?,
                }
            }
        }
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
