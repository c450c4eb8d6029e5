//! Query encoding.
//!
//! Builds a single-question A/IN query with recursion desired. The caller
//! supplies the transaction ID so output is deterministic; see
//! [`super::txid`] for ID generation.

use thiserror::Error;

use super::dns::{
    DNS_HEADER_SIZE, DnsHeader, MAX_HOSTNAME_LEN, MAX_LABEL_LEN, MAX_NAME_LEN,
    QUESTION_FIXED_LEN, qclass, qtype,
};

/// Reasons a hostname cannot be encoded into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("hostname is empty")]
    EmptyHostname,
    #[error("empty label at byte {offset}")]
    EmptyLabel { offset: usize },
    #[error("label of {len} bytes exceeds 63")]
    LabelTooLong { len: usize },
    #[error("hostname of {len} bytes exceeds 253")]
    HostnameTooLong { len: usize },
    #[error("output buffer holds {capacity} bytes, query needs {needed}")]
    BufferTooSmall { needed: usize, capacity: usize },
}

/// Validate `hostname` and return it without its trailing dot.
fn validate_hostname(hostname: &[u8]) -> Result<&[u8], QueryError> {
    let name = hostname.strip_suffix(b".").unwrap_or(hostname);
    if name.is_empty() {
        return Err(QueryError::EmptyHostname);
    }
    if name.len() > MAX_HOSTNAME_LEN {
        return Err(QueryError::HostnameTooLong { len: name.len() });
    }

    let mut offset = 0;
    for label in name.split(|&b| b == b'.') {
        if label.is_empty() {
            return Err(QueryError::EmptyLabel { offset });
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(QueryError::LabelTooLong { len: label.len() });
        }
        offset += label.len() + 1;
    }

    // Leading length byte plus root label.
    if name.len() + 2 > MAX_NAME_LEN {
        return Err(QueryError::HostnameTooLong { len: name.len() });
    }
    Ok(name)
}

fn write_labels(name: &[u8], out: &mut [u8]) -> usize {
    let mut pos = 0;
    for label in name.split(|&b| b == b'.') {
        out[pos] = label.len() as u8;
        out[pos + 1..pos + 1 + label.len()].copy_from_slice(label);
        pos += 1 + label.len();
    }
    out[pos] = 0;
    pos + 1
}

/// Encode a hostname in DNS wire format.
///
/// Converts "example.com" (or "example.com.") to "\x07example\x03com\x00".
pub fn encode_hostname(hostname: &[u8]) -> Result<Vec<u8>, QueryError> {
    let name = validate_hostname(hostname)?;
    let mut out = vec![0u8; name.len() + 2];
    let len = write_labels(name, &mut out);
    debug_assert_eq!(len, out.len());
    Ok(out)
}

/// Exact number of bytes [`build_query`] will write for `hostname`.
pub fn encoded_query_len(hostname: &[u8]) -> Result<usize, QueryError> {
    let name = validate_hostname(hostname)?;
    Ok(DNS_HEADER_SIZE + name.len() + 2 + QUESTION_FIXED_LEN)
}

/// Build an A/IN query for `hostname` into `out`.
///
/// Returns the number of bytes written. Nothing is written unless the whole
/// query is valid and fits.
pub fn build_query(hostname: &[u8], id: u16, out: &mut [u8]) -> Result<usize, QueryError> {
    let name = validate_hostname(hostname)?;
    let needed = DNS_HEADER_SIZE + name.len() + 2 + QUESTION_FIXED_LEN;
    if out.len() < needed {
        return Err(QueryError::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }

    let mut pos = DnsHeader::new_query(id)
        .encode(out)
        .ok_or(QueryError::BufferTooSmall {
            needed,
            capacity: out.len(),
        })?;
    pos += write_labels(name, &mut out[pos..]);
    out[pos..pos + 2].copy_from_slice(&qtype::A.to_be_bytes());
    out[pos + 2..pos + 4].copy_from_slice(&qclass::IN.to_be_bytes());
    pos += QUESTION_FIXED_LEN;

    debug_assert_eq!(pos, needed);
    Ok(pos)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
