//! DNS stub resolver.
//!
//! A caller typically reads nameservers ([`nameservers_from_path`]), encodes a
//! query ([`build_query`]), sends it over its own UDP socket, and decodes the
//! reply ([`parse_response`]). The three steps share no state.
//!
//! Supported wire subset (RFC 1035): one question of type A / class IN, answer
//! records of type A or CNAME with label or compression-pointer names. Other
//! answer types are skipped by RDLENGTH.

pub mod config;
pub mod dns;
pub mod query;
pub mod response;
pub mod txid;

pub use config::{
    DNS_PORT, MAX_NAMESERVERS, NAMESERVER_LEN, ResolverConfig, nameservers_from_bytes,
    nameservers_from_path, nameservers_from_str, resolv_conf_path,
};
pub use query::{QueryError, build_query, encode_hostname, encoded_query_len};
pub use response::{Resolution, ResponseError, parse_response, parse_response_detailed};
pub use txid::{TxidSequence, next_txid};
