//! Report line formatting.
//!
//! The [`Reporter`] is the only place a discovery result becomes text. Sessions hand
//! it a source address and a record; it renders the fixed-width line and pushes it
//! onto the channel shared by every session.

use std::net::IpAddr;

use sonar_common::error::SessionError;
use sonar_common::network::target::Protocol;
use tokio::sync::mpsc::UnboundedSender;

const IP_COLUMN: usize = 24;
const PROTOCOL_COLUMN: usize = 8;

#[derive(Debug, Clone)]
pub struct Reporter {
    output: UnboundedSender<String>,
    protocol: Protocol,
}

impl Reporter {
    pub fn new(output: UnboundedSender<String>, protocol: Protocol) -> Self {
        Self { output, protocol }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Renders `source` and `message` and sends the line to the aggregator.
    pub fn print(&self, source: IpAddr, message: &str) -> Result<(), SessionError> {
        self.output
            .send(render(source, self.protocol, message))
            .map_err(|_| SessionError::OutputClosed)
    }
}

/// `<ip padded to 24> <protocol padded to 8> <message>`
pub fn render(source: IpAddr, protocol: Protocol, message: &str) -> String {
    format!(
        "{:<ip_w$} {:<proto_w$} {}",
        source.to_string(),
        protocol.label(),
        message,
        ip_w = IP_COLUMN,
        proto_w = PROTOCOL_COLUMN,
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
