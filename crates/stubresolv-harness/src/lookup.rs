//! Blocking UDP lookup driver.
//!
//! Sends the core's queries to the configured nameservers and feeds replies
//! back into the parser. One fresh socket and transaction ID per send; replies
//! from other peers or carrying another ID are dropped until the per-attempt
//! deadline passes.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use thiserror::Error;

use stubresolv_core::resolv::dns::{DNS_MAX_UDP_SIZE, rcode};
use stubresolv_core::resolv::{
    DNS_PORT, QueryError, Resolution, ResolverConfig, ResponseError, build_query,
    encoded_query_len, next_txid, parse_response_detailed,
};

use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Reasons a lookup produced no address.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no usable nameserver configured")]
    NoNameservers,
    #[error("invalid hostname: {0}")]
    Query(#[from] QueryError),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{hostname}: name does not exist")]
    NameNotFound { hostname: String },
    #[error("no answer after {attempts} queries")]
    Exhausted { attempts: u32 },
}

/// Knobs for one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOptions {
    /// Destination port on every nameserver.
    pub port: u16,
    /// Wait for a matching reply from one nameserver.
    pub timeout: Duration,
    /// Rounds over the nameserver list.
    pub attempts: u32,
    /// Start each round one server further along.
    pub rotate: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl LookupOptions {
    /// Options taken from the `options` directives of a configuration.
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            port: DNS_PORT,
            timeout: config.query_timeout(),
            attempts: config.attempts.max(1),
            rotate: config.rotate,
        }
    }
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupAnswer {
    /// Candidate name that produced the answer (after the search list).
    pub name: String,
    /// Server that answered.
    pub nameserver: SocketAddr,
    /// Parsed reply.
    pub resolution: Resolution,
}

enum Exchange {
    Answer(Resolution),
    NxDomain,
    Failed,
}

enum CandidateOutcome {
    Answer(SocketAddr, Resolution),
    NxDomain,
    NoAnswer,
}

/// Resolve `hostname` to an IPv4 address through the servers in `config`.
///
/// The search list is applied via [`ResolverConfig::candidates`]. NXDOMAIN
/// for a candidate moves on to the next candidate; it is not retried.
pub fn lookup(
    hostname: &str,
    config: &ResolverConfig,
    options: &LookupOptions,
    log: &mut LogEmitter,
) -> Result<LookupAnswer, LookupError> {
    encoded_query_len(hostname.as_bytes())?;
    let servers = server_addrs(config, options.port, log);
    if servers.is_empty() {
        return Err(LookupError::NoNameservers);
    }

    let mut sent = 0u32;
    let mut all_nxdomain = true;
    for name in config.candidates(hostname) {
        if let Err(err) = encoded_query_len(name.as_bytes()) {
            let entry = log
                .entry(LogLevel::Debug, "candidate_skipped")
                .with_hostname(&name)
                .with_details(serde_json::json!({ "reason": err.to_string() }));
            log.emit_best_effort(entry);
            continue;
        }
        match query_candidate(&name, &servers, options, log, &mut sent)? {
            CandidateOutcome::Answer(nameserver, resolution) => {
                return Ok(LookupAnswer {
                    name,
                    nameserver,
                    resolution,
                });
            }
            CandidateOutcome::NxDomain => {}
            CandidateOutcome::NoAnswer => all_nxdomain = false,
        }
    }

    if all_nxdomain && sent > 0 {
        Err(LookupError::NameNotFound {
            hostname: hostname.to_string(),
        })
    } else {
        Err(LookupError::Exhausted { attempts: sent })
    }
}

fn server_addrs(config: &ResolverConfig, port: u16, log: &mut LogEmitter) -> Vec<SocketAddr> {
    let mut out = Vec::with_capacity(config.nameservers.len());
    for server in &config.nameservers {
        match server.parse::<IpAddr>() {
            Ok(ip) => out.push(SocketAddr::new(ip, port)),
            Err(_) => {
                let entry = log
                    .entry(LogLevel::Warn, "nameserver_skipped")
                    .with_details(serde_json::json!({ "nameserver": server }));
                log.emit_best_effort(entry);
            }
        }
    }
    out
}

fn query_candidate(
    name: &str,
    servers: &[SocketAddr],
    options: &LookupOptions,
    log: &mut LogEmitter,
    sent: &mut u32,
) -> Result<CandidateOutcome, LookupError> {
    for round in 0..options.attempts.max(1) {
        let start = if options.rotate {
            round as usize % servers.len()
        } else {
            0
        };
        for i in 0..servers.len() {
            let server = servers[(start + i) % servers.len()];
            *sent += 1;
            match exchange(name, server, round, options.timeout, log)? {
                Exchange::Answer(resolution) => {
                    return Ok(CandidateOutcome::Answer(server, resolution));
                }
                Exchange::NxDomain => return Ok(CandidateOutcome::NxDomain),
                Exchange::Failed => {}
            }
        }
    }
    Ok(CandidateOutcome::NoAnswer)
}

/// One query to one server, waiting up to `timeout` for the matching reply.
fn exchange(
    name: &str,
    server: SocketAddr,
    round: u32,
    timeout: Duration,
    log: &mut LogEmitter,
) -> Result<Exchange, LookupError> {
    let txid = next_txid();
    let mut packet = [0u8; DNS_MAX_UDP_SIZE];
    let len = build_query(name.as_bytes(), txid, &mut packet)?;

    let local: SocketAddr = match server {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local)?;
    let started = Instant::now();
    let base = |log: &mut LogEmitter, level: LogLevel, event: &str| -> LogEntry {
        log.entry(level, event)
            .with_hostname(name)
            .with_query(server.to_string(), txid, round)
    };

    if let Err(err) = socket.send_to(&packet[..len], server) {
        let entry = base(log, LogLevel::Warn, "send_failed")
            .with_outcome(Outcome::Fail)
            .with_details(serde_json::json!({ "error": err.to_string() }));
        log.emit_best_effort(entry);
        return Ok(Exchange::Failed);
    }
    let entry = base(log, LogLevel::Debug, "query_sent");
    log.emit_best_effort(entry);

    let deadline = started + timeout;
    let mut reply = [0u8; DNS_MAX_UDP_SIZE];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            let entry = base(log, LogLevel::Info, "response")
                .with_outcome(Outcome::Timeout)
                .with_latency_ns(elapsed_ns(started));
            log.emit_best_effort(entry);
            return Ok(Exchange::Failed);
        }
        socket.set_read_timeout(Some(remaining))?;
        let (n, peer) = match socket.recv_from(&mut reply) {
            Ok(got) => got,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(err) => {
                let entry = base(log, LogLevel::Warn, "recv_failed")
                    .with_outcome(Outcome::Fail)
                    .with_details(serde_json::json!({ "error": err.to_string() }));
                log.emit_best_effort(entry);
                return Ok(Exchange::Failed);
            }
        };
        let msg = &reply[..n];
        let reply_id = (n >= 2).then(|| u16::from_be_bytes([msg[0], msg[1]]));
        if peer != server || reply_id != Some(txid) {
            let entry = base(log, LogLevel::Debug, "reply_discarded").with_details(
                serde_json::json!({ "peer": peer.to_string(), "reply_id": reply_id }),
            );
            log.emit_best_effort(entry);
            continue;
        }

        let response = base(log, LogLevel::Info, "response").with_latency_ns(elapsed_ns(started));
        let (entry, exchange) = match parse_response_detailed(msg) {
            Ok(resolution) => (
                response
                    .with_outcome(Outcome::Pass)
                    .with_address(resolution.address),
                Exchange::Answer(resolution),
            ),
            Err(ResponseError::ServerFailure {
                rcode: rcode::NXDOMAIN,
            }) => (
                response
                    .with_outcome(Outcome::Fail)
                    .with_details(serde_json::json!({ "rcode": rcode::NXDOMAIN })),
                Exchange::NxDomain,
            ),
            Err(err) => (
                response
                    .with_outcome(Outcome::Fail)
                    .with_details(serde_json::json!({ "error": err.to_string() })),
                Exchange::Failed,
            ),
        };
        log.emit_best_effort(entry);
        return Ok(exchange);
    }
}

fn elapsed_ns(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
