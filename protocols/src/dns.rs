//! # DNS Wire Format
//!
//! Just enough RFC 1035 framing for mDNS: single-question queries out, answer
//! sections in. Labels are kept as raw bytes, so UTF-8 instance names
//! (RFC 6763 §4.3) decode like any other name.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

pub const HEADER_LEN: usize = 12;

pub const TYPE_A: u16 = 1;
pub const TYPE_NS: u16 = 2;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_MX: u16 = 15;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const TYPE_SRV: u16 = 33;

pub const CLASS_IN: u16 = 1;

/// QU bit in questions, cache-flush bit in records (RFC 6762 §18.12, §10.2).
const CLASS_TOP_BIT: u16 = 0x8000;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_HOPS: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("message truncated")]
    Truncated,

    #[error("empty label in {0:?}")]
    EmptyLabel(String),

    #[error("label of {0} bytes is longer than 63")]
    LabelTooLong(usize),

    #[error("name is longer than 255 bytes")]
    NameTooLong,

    #[error("compression pointers form a loop")]
    PointerLoop,

    #[error("reserved label type {0:#04x}")]
    BadLabelType(u8),

    #[error("{rtype} record with {len} bytes of data")]
    BadRdata { rtype: u16, len: usize },
}

/// A domain name as a list of raw labels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(Vec<Vec<u8>>);

/// Fully qualified, with the trailing dot. Invalid UTF-8 is replaced, not rejected.
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for label in &self.0 {
            write!(f, "{}.", String::from_utf8_lossy(label))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub qtype: u16,
    pub qclass: u16,
    pub unicast_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(Name),
    Cname(Name),
    Ns(Name),
    Mx { preference: u16, exchange: Name },
    Srv { priority: u16, weight: u16, port: u16, target: Name },
    Txt(Vec<Vec<u8>>),
    Other(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Name,
    pub rtype: u16,
    pub class: u16,
    pub cache_flush: bool,
    pub ttl: u32,
    pub data: RecordData,
}

/// Header, questions and answers of a message. Authority and additional sections
/// are not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
}

/// Serializes a query with one question and no flags set (RD=0).
pub fn encode_query(id: u16, name: &str, qtype: u16, unicast_response: bool) -> Result<Vec<u8>, DnsError> {
    let mut msg: Vec<u8> = Vec::with_capacity(HEADER_LEN + name.len() + 6);
    msg.extend_from_slice(&id.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg.extend_from_slice(&[0; 6]);

    encode_name(name, &mut msg)?;

    let qclass = match unicast_response {
        true => CLASS_IN | CLASS_TOP_BIT,
        false => CLASS_IN,
    };
    msg.extend_from_slice(&qtype.to_be_bytes());
    msg.extend_from_slice(&qclass.to_be_bytes());
    Ok(msg)
}

/// Appends `name` in uncompressed wire form. A single trailing dot is optional.
pub fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<(), DnsError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(DnsError::EmptyLabel(name.to_string()));
    }

    let mut wire_len: usize = 1;
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(DnsError::EmptyLabel(name.to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::LabelTooLong(label.len()));
        }
        wire_len += label.len() + 1;
        if wire_len > MAX_NAME_LEN {
            return Err(DnsError::NameTooLong);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

pub fn parse(msg: &[u8]) -> Result<Message, DnsError> {
    let mut reader = Reader { msg, pos: 0 };

    let id = reader.u16()?;
    let flags = reader.u16()?;
    let question_count = reader.u16()?;
    let answer_count = reader.u16()?;
    reader.take(4)?;

    let questions = (0..question_count)
        .map(|_| reader.question())
        .collect::<Result<Vec<_>, _>>()?;
    let answers = (0..answer_count)
        .map(|_| reader.record())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Message { id, flags, questions, answers })
}

struct Reader<'a> {
    msg: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DnsError> {
        let end = self.pos.checked_add(len).ok_or(DnsError::Truncated)?;
        let bytes = self.msg.get(self.pos..end).ok_or(DnsError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, DnsError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, DnsError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn name(&mut self) -> Result<Name, DnsError> {
        let (name, end) = read_name(self.msg, self.pos)?;
        self.pos = end;
        Ok(name)
    }

    fn question(&mut self) -> Result<Question, DnsError> {
        let name = self.name()?;
        let qtype = self.u16()?;
        let raw_class = self.u16()?;
        Ok(Question {
            name,
            qtype,
            qclass: raw_class & !CLASS_TOP_BIT,
            unicast_response: raw_class & CLASS_TOP_BIT != 0,
        })
    }

    fn record(&mut self) -> Result<Record, DnsError> {
        let name = self.name()?;
        let rtype = self.u16()?;
        let raw_class = self.u16()?;
        let ttl = self.u32()?;
        let len = usize::from(self.u16()?);
        let start = self.pos;
        let rdata = self.take(len)?;

        Ok(Record {
            name,
            rtype,
            class: raw_class & !CLASS_TOP_BIT,
            cache_flush: raw_class & CLASS_TOP_BIT != 0,
            ttl,
            data: read_rdata(self.msg, rtype, start, rdata)?,
        })
    }
}

/// Reads the name at `start`, following compression pointers.
///
/// Returns the name and the offset just past it in the original stream.
fn read_name(msg: &[u8], start: usize) -> Result<(Name, usize), DnsError> {
    let mut labels: Vec<Vec<u8>> = Vec::new();
    let mut pos = start;
    let mut end: Option<usize> = None;
    let mut hops: usize = 0;
    let mut wire_len: usize = 1;

    loop {
        let len = *msg.get(pos).ok_or(DnsError::Truncated)?;
        match len & 0xc0 {
            0x00 if len == 0 => {
                pos += 1;
                break;
            }
            0x00 => {
                let from = pos + 1;
                let to = from + usize::from(len);
                let label = msg.get(from..to).ok_or(DnsError::Truncated)?;
                wire_len += label.len() + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(DnsError::NameTooLong);
                }
                labels.push(label.to_vec());
                pos = to;
            }
            0xc0 => {
                let low = *msg.get(pos + 1).ok_or(DnsError::Truncated)?;
                end.get_or_insert(pos + 2);
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DnsError::PointerLoop);
                }
                pos = (usize::from(len & 0x3f) << 8) | usize::from(low);
            }
            other => return Err(DnsError::BadLabelType(other)),
        }
    }

    Ok((Name(labels), end.unwrap_or(pos)))
}

fn read_rdata(msg: &[u8], rtype: u16, start: usize, rdata: &[u8]) -> Result<RecordData, DnsError> {
    let bad = || DnsError::BadRdata { rtype, len: rdata.len() };

    let data = match rtype {
        TYPE_A => {
            let octets: [u8; 4] = rdata.try_into().map_err(|_| bad())?;
            RecordData::A(Ipv4Addr::from(octets))
        }
        TYPE_AAAA => {
            let octets: [u8; 16] = rdata.try_into().map_err(|_| bad())?;
            RecordData::Aaaa(Ipv6Addr::from(octets))
        }
        TYPE_PTR => RecordData::Ptr(read_name(msg, start)?.0),
        TYPE_CNAME => RecordData::Cname(read_name(msg, start)?.0),
        TYPE_NS => RecordData::Ns(read_name(msg, start)?.0),
        TYPE_MX => {
            let mut fields = Reader { msg, pos: start };
            let preference = fields.u16()?;
            RecordData::Mx { preference, exchange: fields.name()? }
        }
        TYPE_SRV => {
            let mut fields = Reader { msg, pos: start };
            RecordData::Srv {
                priority: fields.u16()?,
                weight: fields.u16()?,
                port: fields.u16()?,
                target: fields.name()?,
            }
        }
        TYPE_TXT => {
            let mut strings = Vec::new();
            let mut rest = rdata;
            while let Some((&len, tail)) = rest.split_first() {
                let len = usize::from(len);
                if tail.len() < len {
                    return Err(bad());
                }
                strings.push(tail[..len].to_vec());
                rest = &tail[len..];
            }
            RecordData::Txt(strings)
        }
        _ => RecordData::Other(rdata.to_vec()),
    };
    Ok(data)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
