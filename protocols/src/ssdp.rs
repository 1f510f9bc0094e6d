//! # SSDP
//!
//! `M-SEARCH` request rendering and HTTP-over-UDP response parsing.

use std::net::SocketAddr;

use sonar_common::network::target::Protocol;
use thiserror::Error;
use tracing::trace;

use crate::{CodecError, DiscoveryCodec};

/// Stand-in identity for a response that could not be parsed.
pub const PARSER_ERROR: &str = "[parser error]";

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SsdpError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("header block is not terminated by a blank line")]
    Truncated,
    #[error("malformed status line: {0:?}")]
    BadStatusLine(String),
    #[error("malformed header line: {0:?}")]
    BadHeader(String),
    #[error("response has no Server header")]
    MissingServer,
}

/// Head of an HTTP response received over UDP.
#[derive(Debug, PartialEq, Eq)]
pub struct SsdpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl SsdpResponse {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn build_query(destination: SocketAddr) -> Vec<u8> {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {destination}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         ST: ssdp:all\r\n\
         MX: 1\r\n\
         \r\n"
    )
    .into_bytes()
}

pub fn parse_response(payload: &[u8]) -> Result<SsdpResponse, SsdpError> {
    let text = std::str::from_utf8(payload).map_err(|_| SsdpError::NotUtf8)?;
    let head = head_of(text).ok_or(SsdpError::Truncated)?;

    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status_line(status_line)
        .ok_or_else(|| SsdpError::BadStatusLine(status_line.to_string()))?;

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in lines {
        if line.starts_with([' ', '\t']) {
            // Obsolete line folding continues the previous value.
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| SsdpError::BadHeader(line.to_string()))?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| SsdpError::BadHeader(line.to_string()))?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(SsdpError::BadHeader(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    Ok(SsdpResponse { status, headers })
}

/// The `Server` header of a response, or [`PARSER_ERROR`] when there is none to read.
pub fn server_identity(payload: &[u8]) -> String {
    let parsed = parse_response(payload).and_then(|response| {
        response
            .header("Server")
            .map(str::to_string)
            .ok_or(SsdpError::MissingServer)
    });
    match parsed {
        Ok(server) => server,
        Err(e) => {
            trace!("unparseable SSDP response: {e}");
            PARSER_ERROR.to_string()
        }
    }
}

/// Everything before the first empty line, or `None` if there is no empty line.
fn head_of(text: &str) -> Option<&str> {
    let crlf = text.find("\r\n\r\n");
    let lf = text.find("\n\n");
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some(&text[..end])
}

fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    let code = parts.next()?;

    let (major, minor) = version.strip_prefix("HTTP/")?.split_once('.')?;
    if major.parse::<u8>().is_err() || minor.parse::<u8>().is_err() {
        return None;
    }
    if code.len() != 3 {
        return None;
    }
    code.parse::<u16>().ok().filter(|c| *c >= 100)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SsdpCodec;

impl DiscoveryCodec for SsdpCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Ssdp
    }

    fn queries(&self, destination: SocketAddr) -> Vec<Result<Vec<u8>, CodecError>> {
        vec![Ok(build_query(destination))]
    }

    /// Never fails: junk from one peer must not blind the listener to the next.
    fn decode(&self, payload: &[u8]) -> Result<Vec<String>, CodecError> {
        Ok(vec![server_identity(payload)])
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
