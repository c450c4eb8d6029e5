//! Response decoding.
//!
//! Extracts the first IPv4 address from a DNS response. CNAME records are
//! decoded (and bounds-checked) but never followed with a new query: the
//! answer section of a recursive response already carries the chain, so the
//! walk simply continues to the next record.

use std::net::Ipv4Addr;

use thiserror::Error;

use super::dns::{
    DNS_HEADER_SIZE, DnsHeader, QUESTION_FIXED_LEN, RecordHeader, WireError, qtype, rcode,
    read_name, skip_name,
};

/// Reasons a response does not yield an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("response of {len} bytes is shorter than the 12-byte header")]
    TooShort { len: usize },
    #[error("QR bit is clear; message is a query")]
    NotAResponse,
    #[error("server returned RCODE {rcode}")]
    ServerFailure { rcode: u8 },
    #[error("response has no answer records")]
    NoAnswers,
    #[error("CNAME target overruns its RDATA at offset {offset}")]
    BadRdata { offset: usize },
    #[error("no A record in the answer section")]
    NoAddress,
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Transaction ID echoed by the server.
    pub id: u16,
    /// First A record in the answer section.
    pub address: Ipv4Addr,
    /// TTL of that A record.
    pub ttl: u32,
    /// CNAME targets seen before the A record, in order.
    pub cname_chain: Vec<String>,
}

/// Parse a response and return the first IPv4 address it carries.
pub fn parse_response(buf: &[u8]) -> Result<Ipv4Addr, ResponseError> {
    parse_response_detailed(buf).map(|r| r.address)
}

/// Parse a response, also reporting the transaction ID, TTL and CNAME chain.
pub fn parse_response_detailed(buf: &[u8]) -> Result<Resolution, ResponseError> {
    let header = DnsHeader::decode(buf).ok_or(ResponseError::TooShort { len: buf.len() })?;
    if !header.is_response() {
        return Err(ResponseError::NotAResponse);
    }
    let code = header.rcode();
    if code != rcode::NOERROR {
        return Err(ResponseError::ServerFailure { rcode: code });
    }
    if header.ancount == 0 {
        return Err(ResponseError::NoAnswers);
    }

    // Exactly one question is expected.
    let mut pos = skip_name(buf, DNS_HEADER_SIZE)? + QUESTION_FIXED_LEN;
    if pos > buf.len() {
        return Err(WireError::Truncated { offset: buf.len() }.into());
    }

    let mut cname_chain = Vec::new();
    for _ in 0..header.ancount {
        let (rr, rdata_start) = RecordHeader::read(buf, skip_name(buf, pos)?)?;
        let rdata_end = rdata_start + rr.rdlength as usize;
        let rdata = buf
            .get(rdata_start..rdata_end)
            .ok_or(WireError::Truncated {
                offset: rdata_start,
            })?;

        match rr.rtype {
            qtype::A if rdata.len() == 4 => {
                return Ok(Resolution {
                    id: header.id,
                    address: Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]),
                    ttl: rr.ttl,
                    cname_chain,
                });
            }
            qtype::CNAME => {
                let (target, end) = read_name(buf, rdata_start)?;
                if end > rdata_end {
                    return Err(ResponseError::BadRdata {
                        offset: rdata_start,
                    });
                }
                cname_chain.push(String::from_utf8_lossy(&target).into_owned());
            }
            _ => {}
        }
        pos = rdata_end;
    }

    Err(ResponseError::NoAddress)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
