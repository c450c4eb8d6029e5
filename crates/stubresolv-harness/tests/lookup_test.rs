//! Integration test: lookup driver against an in-process UDP responder.
//!
//! Run: cargo test -p stubresolv-harness --test lookup_test

use std::net::{Ipv4Addr, UdpSocket};
use std::thread::JoinHandle;
use std::time::Duration;

use stubresolv_core::resolv::ResolverConfig;
use stubresolv_harness::structured_log::{LogEmitter, Outcome};
use stubresolv_harness::{LookupError, LookupOptions, lookup};

/// How the responder answers one query.
#[derive(Clone, Copy)]
enum Reply {
    Address([u8; 4]),
    /// A reply with the wrong ID first, then the real answer.
    WrongIdThen([u8; 4]),
    NxDomain,
    Silent,
}

/// Turn a query into a response; `rcode` 0 appends one A record.
fn answer(query: &[u8], rcode: u8, addr: [u8; 4]) -> Vec<u8> {
    let mut pkt = query.to_vec();
    pkt[2] = 0x81;
    pkt[3] = 0x80 | rcode;
    if rcode == 0 {
        pkt[7] = 1;
        pkt.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4]);
        pkt.extend_from_slice(&addr);
    }
    pkt
}

/// Serve `replies` in order, one per received query.
fn responder(replies: Vec<Reply>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind responder");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set timeout");
    let port = socket.local_addr().expect("local addr").port();
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 512];
        for reply in replies {
            let Ok((n, peer)) = socket.recv_from(&mut buf) else {
                break;
            };
            let query = buf[..n].to_vec();
            match reply {
                Reply::Address(addr) => {
                    socket.send_to(&answer(&query, 0, addr), peer).ok();
                }
                Reply::WrongIdThen(addr) => {
                    let mut bogus = answer(&query, 0, [6, 6, 6, 6]);
                    bogus[0] ^= 0xFF;
                    socket.send_to(&bogus, peer).ok();
                    socket.send_to(&answer(&query, 0, addr), peer).ok();
                }
                Reply::NxDomain => {
                    socket.send_to(&answer(&query, 3, [0; 4]), peer).ok();
                }
                Reply::Silent => {}
            }
            seen.push(query);
        }
        seen
    });
    (port, handle)
}

fn options(port: u16, attempts: u32) -> LookupOptions {
    LookupOptions {
        port,
        timeout: Duration::from_millis(300),
        attempts,
        rotate: false,
    }
}

fn local_config(extra: &str) -> ResolverConfig {
    ResolverConfig::parse(&format!("nameserver 127.0.0.1\n{extra}"))
}

#[test]
fn resolves_against_local_responder() {
    let (port, handle) = responder(vec![Reply::Address([93, 184, 216, 34])]);
    let mut log = LogEmitter::to_buffer("ok");
    let answer = lookup("example.com", &local_config(""), &options(port, 1), &mut log)
        .expect("lookup succeeds");
    assert_eq!(answer.resolution.address, Ipv4Addr::new(93, 184, 216, 34));
    assert_eq!(answer.name, "example.com");
    assert_eq!(answer.nameserver.port(), port);

    let seen = handle.join().expect("responder thread");
    assert_eq!(seen.len(), 1);
    assert_eq!(u16::from_be_bytes([seen[0][0], seen[0][1]]), answer.resolution.id);

    let last = log.entries().last().expect("logged");
    assert_eq!(last.outcome, Some(Outcome::Pass));
    assert_eq!(last.address.as_deref(), Some("93.184.216.34"));
    assert_eq!(last.txid, Some(answer.resolution.id));
}

#[test]
fn mismatched_txid_is_discarded() {
    let (port, handle) = responder(vec![Reply::WrongIdThen([10, 0, 0, 7])]);
    let mut log = LogEmitter::to_buffer("txid");
    let answer = lookup("example.com", &local_config(""), &options(port, 1), &mut log)
        .expect("lookup succeeds");
    assert_eq!(answer.resolution.address, Ipv4Addr::new(10, 0, 0, 7));
    handle.join().expect("responder thread");
    assert!(log.entries().iter().any(|e| e.event == "reply_discarded"));
}

#[test]
fn nxdomain_is_final() {
    let (port, handle) = responder(vec![Reply::NxDomain]);
    let mut log = LogEmitter::to_buffer("nx");
    let err = lookup("missing.example", &local_config(""), &options(port, 3), &mut log)
        .unwrap_err();
    assert!(matches!(err, LookupError::NameNotFound { ref hostname } if hostname == "missing.example"));
    assert_eq!(handle.join().expect("responder thread").len(), 1);
}

#[test]
fn search_list_tries_next_candidate_after_nxdomain() {
    let (port, handle) = responder(vec![Reply::NxDomain, Reply::Address([172, 16, 0, 1])]);
    let mut log = LogEmitter::to_buffer("search");
    let answer = lookup(
        "build",
        &local_config("search corp.example\n"),
        &options(port, 1),
        &mut log,
    )
    .expect("second candidate answers");
    assert_eq!(answer.name, "build");
    assert_eq!(answer.resolution.address, Ipv4Addr::new(172, 16, 0, 1));
    let seen = handle.join().expect("responder thread");
    assert_eq!(seen.len(), 2);
    assert_eq!(&seen[0][12..18], b"\x05build");
    assert_eq!(seen[0][18], 4);
}

#[test]
fn silent_server_exhausts_attempts() {
    let (port, handle) = responder(vec![Reply::Silent, Reply::Silent]);
    let mut log = LogEmitter::to_buffer("timeout");
    let err = lookup("example.com", &local_config(""), &options(port, 2), &mut log).unwrap_err();
    assert!(matches!(err, LookupError::Exhausted { attempts: 2 }));
    handle.join().expect("responder thread");
    let timeouts = log
        .entries()
        .iter()
        .filter(|e| e.outcome == Some(Outcome::Timeout))
        .count();
    assert_eq!(timeouts, 2);
    assert!(log.entries().iter().all(|e| e.trace_id.starts_with("stubresolv::timeout::")));
}
