//! Test execution engine.
//!
//! Each fixture case names a core operation and carries its inputs as JSON.
//! Outputs are rendered as strings so they compare byte-for-byte against the
//! recorded expectation: packets as lowercase hex, addresses dotted-quad,
//! lists comma-joined, and failures as `-1` like the C boundary.

use stubresolv_core::resolv::dns::DNS_MAX_UDP_SIZE;
use stubresolv_core::resolv::{
    ResolverConfig, build_query, encode_hostname, nameservers_from_str, parse_response,
    parse_response_detailed,
};

use crate::diff;
use crate::fixtures::{FixtureCase, FixtureSet};
use crate::verify::VerificationResult;

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
}

impl TestRunner {
    /// Create a new test runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Run all fixtures in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .map(|case| {
                let (actual, diff) = execute_case(case);
                VerificationResult {
                    case_name: case.name.clone(),
                    reference: case.reference.clone(),
                    passed: actual == case.expected_output,
                    expected: case.expected_output.clone(),
                    actual,
                    diff,
                }
            })
            .collect()
    }
}

fn execute_case(case: &FixtureCase) -> (String, Option<String>) {
    let actual = match execute_fixture_case(&case.function, &case.inputs) {
        Ok(output) => output,
        Err(err) => format!("unsupported:{err}"),
    };
    let diff_out =
        (actual != case.expected_output).then(|| diff::render_diff(&case.expected_output, &actual));
    (actual, diff_out)
}

/// Execute one operation against the core and render its output.
pub fn execute_fixture_case(function: &str, inputs: &serde_json::Value) -> Result<String, String> {
    match function {
        "build_query" => {
            let hostname = str_input(inputs, "hostname")?;
            let id = u16::try_from(u64_input(inputs, "id")?)
                .map_err(|_| "id out of range".to_string())?;
            let capacity = match inputs.get("buflen") {
                Some(_) => usize::try_from(u64_input(inputs, "buflen")?)
                    .map_err(|_| "buflen out of range".to_string())?,
                None => DNS_MAX_UDP_SIZE,
            };
            let mut buf = vec![0u8; capacity];
            Ok(match build_query(hostname.as_bytes(), id, &mut buf) {
                Ok(len) => to_hex(&buf[..len]),
                Err(_) => "-1".to_string(),
            })
        }
        "encode_hostname" => {
            let hostname = str_input(inputs, "hostname")?;
            Ok(match encode_hostname(hostname.as_bytes()) {
                Ok(name) => to_hex(&name),
                Err(_) => "-1".to_string(),
            })
        }
        "parse_response" => {
            let packet = from_hex(str_input(inputs, "packet")?)?;
            Ok(match parse_response(&packet) {
                Ok(addr) => addr.to_string(),
                Err(_) => "-1".to_string(),
            })
        }
        "parse_response_detailed" => {
            let packet = from_hex(str_input(inputs, "packet")?)?;
            Ok(match parse_response_detailed(&packet) {
                Ok(res) => format!(
                    "id={} addr={} ttl={} cname=[{}]",
                    res.id,
                    res.address,
                    res.ttl,
                    res.cname_chain.join(",")
                ),
                Err(_) => "-1".to_string(),
            })
        }
        "nameservers" => {
            let content = str_input(inputs, "content")?;
            let max = usize::try_from(u64_input(inputs, "max")?)
                .map_err(|_| "max out of range".to_string())?;
            Ok(nameservers_from_str(content, max).join(","))
        }
        "candidates" => {
            let content = str_input(inputs, "content")?;
            let name = str_input(inputs, "name")?;
            Ok(ResolverConfig::parse(content).candidates(name).join(","))
        }
        other => Err(format!("unknown function '{other}'")),
    }
}

fn str_input<'a>(inputs: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    inputs
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| format!("missing string input '{key}'"))
}

fn u64_input(inputs: &serde_json::Value, key: &str) -> Result<u64, String> {
    inputs
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| format!("missing integer input '{key}'"))
}

/// Lowercase hex encoding.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode hex, ignoring ASCII whitespace between digits.
pub fn from_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(format!("invalid hex digit in '{}'", String::from_utf8_lossy(pair))),
            }
        })
        .collect()
}
