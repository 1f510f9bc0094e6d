//! # mDNS
//!
//! PTR query construction and answer rendering for Multicast DNS (RFC 6762).

use std::net::SocketAddr;

use sonar_common::network::target::Protocol;

use crate::dns::{self, Record, RecordData};
use crate::{CodecError, DiscoveryCodec};

/// Transaction id for multicast queries (RFC 6762 §18.1).
const QUERY_ID: u16 = 0;

/// Builds a single-question PTR query for `service`.
///
/// Recursion is not requested and the top bit of the question class is set, asking
/// responders for a unicast reply (RFC 6762 §18.12).
pub fn build_query(service: &str) -> Result<Vec<u8>, CodecError> {
    dns::encode_query(QUERY_ID, service, dns::TYPE_PTR, true).map_err(|e| CodecError::Build {
        service: service.to_string(),
        reason: e.to_string(),
    })
}

/// One query per service name, in order.
pub fn build_queries<S: AsRef<str>>(services: &[S]) -> Vec<Result<Vec<u8>, CodecError>> {
    services.iter().map(|s| build_query(s.as_ref())).collect()
}

/// Renders every answer record in the message.
pub fn parse_response(payload: &[u8]) -> Result<Vec<String>, CodecError> {
    let message = dns::parse(payload)?;
    Ok(message.answers.iter().map(render_record).collect())
}

/// Zone-file style rendering: `name. ttl class type rdata`, tab separated.
pub fn render_record(record: &Record) -> String {
    let class = match record.class {
        dns::CLASS_IN => "IN".to_string(),
        other => format!("CLASS{other}"),
    };
    let (rtype, rdata) = render_rdata(record.rtype, &record.data);
    format!("{}\t{}\t{}\t{}\t{}", record.name, record.ttl, class, rtype, rdata)
}

fn render_rdata(rtype: u16, data: &RecordData) -> (String, String) {
    match data {
        RecordData::A(a) => ("A".into(), a.to_string()),
        RecordData::Aaaa(aaaa) => ("AAAA".into(), aaaa.to_string()),
        RecordData::Ptr(name) => ("PTR".into(), name.to_string()),
        RecordData::Cname(name) => ("CNAME".into(), name.to_string()),
        RecordData::Ns(name) => ("NS".into(), name.to_string()),
        RecordData::Mx { preference, exchange } => ("MX".into(), format!("{preference} {exchange}")),
        RecordData::Srv { priority, weight, port, target } => {
            ("SRV".into(), format!("{priority} {weight} {port} {target}"))
        }
        RecordData::Txt(strings) => {
            let quoted: Vec<String> = strings
                .iter()
                .map(|s| format!("{:?}", String::from_utf8_lossy(s)))
                .collect();
            ("TXT".into(), quoted.join(" "))
        }
        // RFC 3597 generic form.
        RecordData::Other(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            (format!("TYPE{rtype}"), format!("\\# {} {hex}", bytes.len()).trim_end().to_string())
        }
    }
}

/// mDNS codec probing a fixed list of service names.
#[derive(Debug, Clone)]
pub struct MdnsCodec {
    services: Vec<String>,
}

impl MdnsCodec {
    pub fn new(services: Vec<String>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }
}

impl DiscoveryCodec for MdnsCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Mdns
    }

    fn queries(&self, _destination: SocketAddr) -> Vec<Result<Vec<u8>, CodecError>> {
        build_queries(&self.services)
    }

    fn decode(&self, payload: &[u8]) -> Result<Vec<String>, CodecError> {
        parse_response(payload)
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
