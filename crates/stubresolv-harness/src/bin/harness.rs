//! CLI entrypoint for the stubresolv harness.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use stubresolv_core::resolv::dns::DNS_MAX_UDP_SIZE;
use stubresolv_core::resolv::{
    MAX_NAMESERVERS, ResolverConfig, build_query, nameservers_from_path, next_txid,
    parse_response_detailed, resolv_conf_path,
};
use stubresolv_harness::report::FixtureSource;
use stubresolv_harness::runner::{from_hex, to_hex};
use stubresolv_harness::structured_log::{LogEmitter, validate_log_file};
use stubresolv_harness::{
    ConformanceReport, FixtureSet, LookupOptions, TestRunner, VerificationSummary, lookup,
};

/// Tooling for the stubresolv DNS stub resolver.
#[derive(Debug, Parser)]
#[command(name = "stubresolv-harness")]
#[command(about = "Query encoder, response decoder, lookup driver and fixture verifier")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the A/IN query for a hostname as hex.
    Encode {
        hostname: String,
        /// Transaction ID (random when omitted).
        #[arg(long)]
        id: Option<u16>,
    },
    /// Decode a raw response packet and print the result as JSON.
    Decode {
        /// File holding the packet (raw bytes, or hex with `--hex`).
        #[arg(long)]
        input: PathBuf,
        /// Treat the input as hex text.
        #[arg(long)]
        hex: bool,
    },
    /// List nameservers from a resolv.conf.
    Nameservers {
        /// resolv.conf path (defaults to $STUBRESOLV_RESOLV_CONF or /etc/resolv.conf).
        #[arg(long)]
        resolv_conf: Option<PathBuf>,
        #[arg(long, default_value_t = MAX_NAMESERVERS)]
        max: usize,
    },
    /// Resolve a hostname over UDP.
    Lookup {
        hostname: String,
        /// resolv.conf path (defaults to $STUBRESOLV_RESOLV_CONF or /etc/resolv.conf).
        #[arg(long)]
        resolv_conf: Option<PathBuf>,
        /// Nameserver to use instead of the configured ones (repeatable).
        #[arg(long)]
        nameserver: Vec<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Per-query timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        attempts: Option<u32>,
        /// Write JSONL logs here instead of stderr.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Verify the implementation against fixture sets.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; a .json twin is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct DecodeOutput {
    id: u16,
    address: Ipv4Addr,
    ttl: u32,
    cname_chain: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Encode { hostname, id } => {
            let mut buf = [0u8; DNS_MAX_UDP_SIZE];
            let len = build_query(hostname.as_bytes(), id.unwrap_or_else(next_txid), &mut buf)?;
            println!("{}", to_hex(&buf[..len]));
        }
        Command::Decode { input, hex } => {
            let raw = std::fs::read(&input)?;
            let packet = if hex {
                from_hex(&String::from_utf8_lossy(&raw))?
            } else {
                raw
            };
            let res = parse_response_detailed(&packet)?;
            let out = DecodeOutput {
                id: res.id,
                address: res.address,
                ttl: res.ttl,
                cname_chain: res.cname_chain,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Nameservers { resolv_conf, max } => {
            let path = resolv_conf.unwrap_or_else(resolv_conf_path);
            let servers: Vec<String> = nameservers_from_path(&path, max)
                .iter()
                .map(|addr| String::from_utf8_lossy(addr).into_owned())
                .collect();
            eprintln!("{} nameserver(s) in {}", servers.len(), path.display());
            println!("{}", serde_json::to_string_pretty(&servers)?);
        }
        Command::Lookup {
            hostname,
            resolv_conf,
            nameserver,
            port,
            timeout_ms,
            attempts,
            log,
        } => {
            let path = resolv_conf.unwrap_or_else(resolv_conf_path);
            let mut config = ResolverConfig::from_path(&path);
            if !nameserver.is_empty() {
                config.nameservers = nameserver;
            }
            let mut options = LookupOptions::from_config(&config);
            if let Some(port) = port {
                options.port = port;
            }
            if let Some(ms) = timeout_ms {
                options.timeout = Duration::from_millis(ms);
            }
            if let Some(attempts) = attempts {
                options.attempts = attempts.max(1);
            }

            let run_id = format!("lookup-{:04x}", next_txid());
            let mut emitter = match &log {
                Some(path) => LogEmitter::to_file(path, &run_id)?,
                None => LogEmitter::to_stderr(&run_id),
            };
            let result = lookup(&hostname, &config, &options, &mut emitter);
            emitter.flush()?;
            if let Some(path) = &log {
                let (lines, errors) = validate_log_file(path)?;
                eprintln!("Wrote {lines} log entries to {}", path.display());
                for error in &errors {
                    eprintln!("  invalid log entry: {error}");
                }
            }
            let answer = result?;
            eprintln!(
                "{} answered by {} (ttl {})",
                answer.name, answer.nameserver, answer.resolution.ttl
            );
            println!("{}", answer.resolution.address);
        }
        Command::Verify { fixture, report } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let fixture_sets = FixtureSet::load_dir(&fixture)?;

            let runner = TestRunner::new("verify");
            let mut results = Vec::new();
            let mut sources = Vec::new();
            for set in &fixture_sets {
                eprintln!("  {} ({} cases)", set.family, set.cases.len());
                results.extend(runner.run(set));
                sources.push(FixtureSource {
                    family: set.family.clone(),
                    digest: set.digest.clone(),
                });
            }

            let summary = VerificationSummary::from_results(results);
            let report_doc = ConformanceReport {
                title: String::from("stubresolv conformance"),
                timestamp: stubresolv_harness::structured_log::now_utc(),
                sources,
                summary,
            };

            if let Some(report_path) = report {
                std::fs::write(&report_path, report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
                eprintln!(
                    "Wrote reports: {} and {}",
                    report_path.display(),
                    json_path.display()
                );
            }

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            for failure in report_doc.summary.failures() {
                eprintln!("FAIL {}", failure.case_name);
            }

            if !report_doc.summary.all_passed() {
                return Err(format!(
                    "fixture verification failed: {} case(s) failed",
                    report_doc.summary.failed
                )
                .into());
            }
        }
    }

    Ok(())
}
