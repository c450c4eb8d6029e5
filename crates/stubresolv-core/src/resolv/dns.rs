//! DNS wire primitives.
//!
//! Header layout, record header layout, and bounds-checked name decoding for
//! the subset of RFC 1035 the stub resolver understands.
//!
//! # DNS Message Format (RFC 1035)
//!
//! ```text
//! +---------------------+
//! |        Header       | 12 bytes
//! +---------------------+
//! |       Question      | name + type(2) + class(2)
//! +---------------------+
//! |        Answer       | name + type(2) + class(2) + ttl(4) + rdlength(2) + rdata
//! +---------------------+
//! |      Authority      | ignored
//! +---------------------+
//! |      Additional     | ignored
//! +---------------------+
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// DNS Constants
// ---------------------------------------------------------------------------

/// DNS header size in bytes
pub const DNS_HEADER_SIZE: usize = 12;

/// Maximum DNS message size for UDP
pub const DNS_MAX_UDP_SIZE: usize = 512;

/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of an encoded name, root label included
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a textual hostname (without trailing dot)
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Size of the fixed part of a resource record after its name.
pub const RECORD_FIXED_LEN: usize = 10;

/// Size of the type + class trailer of a question.
pub const QUESTION_FIXED_LEN: usize = 4;

/// DNS record types
pub mod qtype {
    /// IPv4 address
    pub const A: u16 = 1;
    /// Canonical name alias
    pub const CNAME: u16 = 5;
    /// IPv6 address
    pub const AAAA: u16 = 28;
}

/// DNS class codes
pub mod qclass {
    /// Internet
    pub const IN: u16 = 1;
}

/// DNS response codes (RCODE)
pub mod rcode {
    /// No error
    pub const NOERROR: u8 = 0;
    /// Format error
    pub const FORMERR: u8 = 1;
    /// Server failure
    pub const SERVFAIL: u8 = 2;
    /// Non-existent domain
    pub const NXDOMAIN: u8 = 3;
    /// Not implemented
    pub const NOTIMP: u8 = 4;
    /// Query refused
    pub const REFUSED: u8 = 5;
}

/// Header flag bits.
pub mod flags {
    /// Query/Response
    pub const QR: u16 = 0x8000;
    /// Truncated
    pub const TC: u16 = 0x0200;
    /// Recursion desired
    pub const RD: u16 = 0x0100;
    /// Recursion available
    pub const RA: u16 = 0x0080;
    /// RCODE mask
    pub const RCODE_MASK: u16 = 0x000f;
}

const POINTER_TAG: u8 = 0xC0;

// ---------------------------------------------------------------------------
// Wire errors
// ---------------------------------------------------------------------------

/// Structural problems found while walking a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("message truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("compression pointer at offset {at} targets {target}, which is not earlier")]
    BadPointer { at: usize, target: usize },
    #[error("reserved label type 0x{byte:02x} at offset {at}")]
    BadLabel { at: usize, byte: u8 },
    #[error("decoded name exceeds 255 octets")]
    NameTooLong,
    #[error("name decoding did not terminate within the message")]
    Unterminated,
}

// ---------------------------------------------------------------------------
// DNS Header
// ---------------------------------------------------------------------------

/// DNS message header (12 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnsHeader {
    /// Transaction ID
    pub id: u16,
    /// Flags: QR, Opcode, AA, TC, RD, RA, Z, RCODE
    pub flags: u16,
    /// Number of questions
    pub qdcount: u16,
    /// Number of answers
    pub ancount: u16,
    /// Number of authority records
    pub nscount: u16,
    /// Number of additional records
    pub arcount: u16,
}

impl DnsHeader {
    /// Create a new query header with the given transaction ID.
    pub fn new_query(id: u16) -> Self {
        Self {
            id,
            flags: flags::RD,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }

    /// Encode the header to bytes.
    pub fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        if buf.len() < DNS_HEADER_SIZE {
            return None;
        }
        buf[0..2].copy_from_slice(&self.id.to_be_bytes());
        buf[2..4].copy_from_slice(&self.flags.to_be_bytes());
        buf[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        buf[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        buf[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        buf[10..12].copy_from_slice(&self.arcount.to_be_bytes());
        Some(DNS_HEADER_SIZE)
    }

    /// Decode the header from bytes.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < DNS_HEADER_SIZE {
            return None;
        }
        Some(Self {
            id: u16::from_be_bytes([buf[0], buf[1]]),
            flags: u16::from_be_bytes([buf[2], buf[3]]),
            qdcount: u16::from_be_bytes([buf[4], buf[5]]),
            ancount: u16::from_be_bytes([buf[6], buf[7]]),
            nscount: u16::from_be_bytes([buf[8], buf[9]]),
            arcount: u16::from_be_bytes([buf[10], buf[11]]),
        })
    }

    /// Check if this is a response (QR bit set).
    pub fn is_response(&self) -> bool {
        (self.flags & flags::QR) != 0
    }

    /// Get the response code (RCODE).
    pub fn rcode(&self) -> u8 {
        (self.flags & flags::RCODE_MASK) as u8
    }

    /// Check if the response is truncated (TC bit).
    pub fn is_truncated(&self) -> bool {
        (self.flags & flags::TC) != 0
    }
}

// ---------------------------------------------------------------------------
// Resource record header
// ---------------------------------------------------------------------------

/// Fixed fields that follow a resource record's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record type
    pub rtype: u16,
    /// Record class
    pub rclass: u16,
    /// TTL in seconds
    pub ttl: u32,
    /// Length of RDATA in bytes
    pub rdlength: u16,
}

impl RecordHeader {
    /// Read the 10 fixed bytes at `pos`, returning the header and the RDATA offset.
    pub fn read(msg: &[u8], pos: usize) -> Result<(Self, usize), WireError> {
        let fixed = msg
            .get(pos..pos + RECORD_FIXED_LEN)
            .ok_or(WireError::Truncated { offset: pos })?;
        Ok((
            Self {
                rtype: u16::from_be_bytes([fixed[0], fixed[1]]),
                rclass: u16::from_be_bytes([fixed[2], fixed[3]]),
                ttl: u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
                rdlength: u16::from_be_bytes([fixed[8], fixed[9]]),
            },
            pos + RECORD_FIXED_LEN,
        ))
    }
}

// ---------------------------------------------------------------------------
// Name decoding
// ---------------------------------------------------------------------------

/// Decode the name at `start`, handling compression pointers.
///
/// Returns the dotted name (empty for the root) and the offset just past the
/// name as it appears at `start`: after the root label, or after the first
/// compression pointer.
///
/// Every pointer must target an offset strictly before the pointer itself, the
/// decoded name may not exceed [`MAX_NAME_LEN`] octets, and the walk is capped
/// at `msg.len()` steps, so hostile input always terminates.
pub fn read_name(msg: &[u8], start: usize) -> Result<(Vec<u8>, usize), WireError> {
    let mut name = Vec::new();
    walk_name(msg, start, |label| {
        if !name.is_empty() {
            name.push(b'.');
        }
        name.extend_from_slice(label);
    })
    .map(|end| (name, end))
}

/// Like [`read_name`] but only validates the name and returns the end offset.
pub fn skip_name(msg: &[u8], start: usize) -> Result<usize, WireError> {
    walk_name(msg, start, |_| {})
}

fn walk_name(
    msg: &[u8],
    start: usize,
    mut on_label: impl FnMut(&[u8]),
) -> Result<usize, WireError> {
    let mut pos = start;
    let mut end = None;
    let mut encoded_len = 0usize;

    for _ in 0..msg.len() {
        let len = *msg.get(pos).ok_or(WireError::Truncated { offset: pos })?;

        if len == 0 {
            encoded_len += 1;
            if encoded_len > MAX_NAME_LEN {
                return Err(WireError::NameTooLong);
            }
            return Ok(end.unwrap_or(pos + 1));
        }

        match len & POINTER_TAG {
            0x00 => {
                let label_len = len as usize;
                let label = msg
                    .get(pos + 1..pos + 1 + label_len)
                    .ok_or(WireError::Truncated { offset: pos })?;
                encoded_len += 1 + label_len;
                if encoded_len > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong);
                }
                on_label(label);
                pos += 1 + label_len;
            }
            POINTER_TAG => {
                let low = *msg
                    .get(pos + 1)
                    .ok_or(WireError::Truncated { offset: pos + 1 })?;
                let target = (((len & !POINTER_TAG) as usize) << 8) | low as usize;
                if target >= pos {
                    return Err(WireError::BadPointer { at: pos, target });
                }
                if end.is_none() {
                    end = Some(pos + 2);
                }
                pos = target;
            }
            _ => return Err(WireError::BadLabel { at: pos, byte: len }),
        }
    }

    Err(WireError::Unterminated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_name_plain() {
        let msg = b"\x07example\x03com\x00";
        let (name, end) = read_name(msg, 0).unwrap();
        assert_eq!(name, b"example.com");
        assert_eq!(end, 13);
    }

    #[test]
    fn test_read_name_root() {
        let (name, end) = read_name(b"\x00", 0).unwrap();
        assert!(name.is_empty());
        assert_eq!(end, 1);
    }

    #[test]
    fn test_read_name_pointer_end_offset() {
        // "example.com" at 0, then "www" + pointer to 0 at 13.
        let msg = b"\x07example\x03com\x00\x03www\xc0\x00";
        let (name, end) = read_name(msg, 13).unwrap();
        assert_eq!(name, b"www.example.com");
        assert_eq!(end, msg.len());
    }

    #[test]
    fn test_read_name_chained_pointers() {
        // 0: com, 5: "example" + ptr(0), 15: ptr(5)
        let msg = b"\x03com\x00\x07example\xc0\x00\xc0\x05";
        let (name, end) = read_name(msg, 15).unwrap();
        assert_eq!(name, b"example.com");
        assert_eq!(end, 17);
    }

    #[test]
    fn test_self_pointer_rejected() {
        let msg = b"\xc0\x00";
        assert_eq!(
            read_name(msg, 0),
            Err(WireError::BadPointer { at: 0, target: 0 })
        );
    }

    #[test]
    fn test_forward_pointer_rejected() {
        let msg = b"\xc0\x04\x00\x00\x03com\x00";
        assert!(matches!(
            read_name(msg, 0),
            Err(WireError::BadPointer { at: 0, target: 4 })
        ));
    }

    #[test]
    fn test_pointer_loop_terminates() {
        // 0: "a" then pointer at 2 back to 0 -> loops through labels.
        let msg = b"\x01a\xc0\x00";
        let err = read_name(msg, 0).unwrap_err();
        assert!(matches!(
            err,
            WireError::NameTooLong | WireError::Unterminated
        ));
    }

    #[test]
    fn test_truncated_label() {
        let msg = b"\x07exam";
        assert_eq!(read_name(msg, 0), Err(WireError::Truncated { offset: 0 }));
    }

    #[test]
    fn test_truncated_pointer() {
        let msg = b"\x03com\x00\xc0";
        assert_eq!(skip_name(msg, 5), Err(WireError::Truncated { offset: 6 }));
    }

    #[test]
    fn test_reserved_label_type() {
        let msg = b"\x41abc\x00";
        assert_eq!(
            skip_name(msg, 0),
            Err(WireError::BadLabel { at: 0, byte: 0x41 })
        );
    }

    #[test]
    fn test_name_too_long() {
        let mut msg = Vec::new();
        for _ in 0..5 {
            msg.push(63);
            msg.extend_from_slice(&[b'a'; 63]);
        }
        msg.push(0);
        assert_eq!(skip_name(&msg, 0), Err(WireError::NameTooLong));
    }

    #[test]
    fn test_dns_header_encode_decode() {
        let header = DnsHeader::new_query(0x1234);
        let mut buf = [0u8; 64];
        let len = header.encode(&mut buf).unwrap();
        assert_eq!(len, 12);
        assert_eq!(&buf[2..4], &[0x01, 0x00]);

        let decoded = DnsHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert!(!decoded.is_response());
    }

    #[test]
    fn test_header_flags() {
        let mut header = DnsHeader::new_query(1);
        assert!(!header.is_response());
        assert!(!header.is_truncated());
        assert_eq!(header.rcode(), rcode::NOERROR);

        header.flags |= flags::QR;
        assert!(header.is_response());

        header.flags |= flags::TC;
        assert!(header.is_truncated());

        header.flags |= rcode::NXDOMAIN as u16;
        assert_eq!(header.rcode(), rcode::NXDOMAIN);
    }

    #[test]
    fn test_record_header_read() {
        let msg = [0x00, 0x05, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04];
        let (rr, rdata) = RecordHeader::read(&msg, 0).unwrap();
        assert_eq!(rr.rtype, qtype::CNAME);
        assert_eq!(rr.rclass, qclass::IN);
        assert_eq!(rr.ttl, 3600);
        assert_eq!(rr.rdlength, 4);
        assert_eq!(rdata, 10);

        assert_eq!(
            RecordHeader::read(&msg[..9], 0),
            Err(WireError::Truncated { offset: 0 })
        );
    }
}
