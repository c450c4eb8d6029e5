//! /etc/resolv.conf reader.
//!
//! Line rules per resolver(5): leading whitespace is trimmed, blank lines and
//! lines starting with `#` or `;` are comments, and each remaining line is a
//! directive followed by whitespace-separated arguments.
//!
//! # Supported Directives
//!
//! - `nameserver <addr>`: DNS server address, copied verbatim
//! - `domain <name>`: Local domain name
//! - `search <name>...`: Search list for hostname lookup
//! - `options <opt>...`: `ndots:N`, `timeout:N`, `attempts:N`, `rotate`
//!
//! Everything else is ignored.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Configuration Limits
// ---------------------------------------------------------------------------

/// Maximum number of nameservers (matches glibc MAXNS)
pub const MAX_NAMESERVERS: usize = 3;

/// Width of a nameserver slot in the C interface, NUL included
pub const NAMESERVER_LEN: usize = 64;

/// Maximum number of search domains (matches glibc)
pub const MAX_SEARCH_DOMAINS: usize = 6;

/// Default DNS port
pub const DNS_PORT: u16 = 53;

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 5;

/// Default number of retry attempts
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// Default ndots threshold
pub const DEFAULT_NDOTS: u32 = 1;

/// Default location of the resolver configuration.
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Environment variable overriding [`DEFAULT_RESOLV_CONF`].
pub const RESOLV_CONF_ENV: &str = "STUBRESOLV_RESOLV_CONF";

/// Path of the resolver configuration file to read.
///
/// `STUBRESOLV_RESOLV_CONF` wins when set and non-empty.
pub fn resolv_conf_path() -> PathBuf {
    match std::env::var_os(RESOLV_CONF_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_RESOLV_CONF),
    }
}

// ---------------------------------------------------------------------------
// Line scanning
// ---------------------------------------------------------------------------

/// Split a line into its directive keyword and arguments, skipping comments.
///
/// Works on raw bytes; only ASCII whitespace separates tokens.
fn directive(line: &[u8]) -> Option<(&[u8], impl Iterator<Item = &[u8]>)> {
    let line = line.trim_ascii_start();
    if line.is_empty() || line[0] == b'#' || line[0] == b';' {
        return None;
    }
    let mut parts = line
        .split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty());
    let keyword = parts.next()?;
    Some((keyword, parts))
}

fn lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split(|&b| b == b'\n')
}

fn text(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}

/// Collect up to `max` `nameserver` addresses from raw resolv.conf bytes.
///
/// Addresses are returned in file order and copied byte for byte; no IP
/// syntax or encoding check is made. Lines past capacity are ignored.
pub fn nameservers_from_bytes(content: &[u8], max: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(max.min(MAX_NAMESERVERS));
    for line in lines(content) {
        if out.len() >= max {
            break;
        }
        if let Some((b"nameserver", mut args)) = directive(line)
            && let Some(addr) = args.next()
        {
            out.push(addr.to_vec());
        }
    }
    out
}

/// [`nameservers_from_bytes`] over text content.
pub fn nameservers_from_str(content: &str, max: usize) -> Vec<String> {
    nameservers_from_bytes(content.as_bytes(), max)
        .into_iter()
        // Splitting valid UTF-8 at ASCII bytes keeps every token valid.
        .map(|addr| String::from_utf8_lossy(&addr).into_owned())
        .collect()
}

/// Read up to `max` nameservers from the file at `path`, byte for byte.
///
/// A missing or unreadable file yields an empty list.
pub fn nameservers_from_path(path: &Path, max: usize) -> Vec<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => nameservers_from_bytes(&bytes, max),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Resolver Configuration
// ---------------------------------------------------------------------------

/// Parsed resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Nameserver addresses in file order (up to MAX_NAMESERVERS)
    pub nameservers: Vec<String>,
    /// Local domain name
    pub domain: Option<String>,
    /// Search list for hostname lookup
    pub search: Vec<String>,
    /// ndots threshold: queries with >= ndots dots are tried as absolute first
    pub ndots: u32,
    /// Timeout for each query attempt in seconds
    pub timeout: u32,
    /// Number of query rounds before giving up
    pub attempts: u32,
    /// Rotate nameservers on each query
    pub rotate: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameservers: Vec::new(),
            domain: None,
            search: Vec::new(),
            ndots: DEFAULT_NDOTS,
            timeout: DEFAULT_TIMEOUT_SECS,
            attempts: DEFAULT_ATTEMPTS,
            rotate: false,
        }
    }
}

impl ResolverConfig {
    /// Parse configuration from resolv.conf content.
    ///
    /// No default nameserver is injected; an empty list means the caller
    /// must supply its own fallback.
    pub fn parse(content: &str) -> Self {
        Self::parse_bytes(content.as_bytes())
    }

    /// Parse configuration from raw resolv.conf bytes.
    ///
    /// Tokens that are not UTF-8 are kept lossily; such a nameserver can
    /// never parse as an IP address anyway.
    pub fn parse_bytes(content: &[u8]) -> Self {
        let mut config = Self::default();

        for line in lines(content) {
            config.parse_line(line);
        }

        // If domain is set but search is empty, use domain as search
        if config.search.is_empty()
            && let Some(ref domain) = config.domain
        {
            config.search.push(domain.clone());
        }

        config
    }

    /// Read and parse the file at `path`; a missing file gives the defaults.
    pub fn from_path(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::parse_bytes(&bytes),
            Err(_) => Self::default(),
        }
    }

    /// Read the file named by [`resolv_conf_path`].
    pub fn load() -> Self {
        Self::from_path(&resolv_conf_path())
    }

    fn parse_line(&mut self, line: &[u8]) {
        let Some((keyword, mut args)) = directive(line) else {
            return;
        };

        match keyword {
            b"nameserver" => {
                if self.nameservers.len() < MAX_NAMESERVERS
                    && let Some(addr) = args.next()
                {
                    self.nameservers.push(text(addr));
                }
            }
            b"domain" => {
                if let Some(name) = args.next() {
                    self.domain = Some(text(name));
                }
            }
            b"search" => {
                self.search = args.take(MAX_SEARCH_DOMAINS).map(text).collect();
            }
            b"options" => {
                for opt in args {
                    self.parse_option(&text(opt));
                }
            }
            _ => {}
        }
    }

    fn parse_option(&mut self, opt: &str) {
        if let Some(n) = opt.strip_prefix("ndots:").and_then(|v| v.parse::<u32>().ok()) {
            self.ndots = n.min(15);
        } else if let Some(n) = opt
            .strip_prefix("timeout:")
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.timeout = n.clamp(1, 30);
        } else if let Some(n) = opt
            .strip_prefix("attempts:")
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.attempts = n.clamp(1, 5);
        } else if opt == "rotate" {
            self.rotate = true;
        }
    }

    /// Timeout for a single query to one nameserver.
    pub fn query_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_secs(self.timeout as u64)
    }

    /// Total budget for resolving a name (all nameservers, all attempts).
    pub fn total_budget(&self) -> core::time::Duration {
        let per_attempt = self.timeout as u64 * self.nameservers.len() as u64;
        core::time::Duration::from_secs(per_attempt * self.attempts as u64)
    }

    /// Returns true if `name` has at least ndots dots.
    pub fn should_try_absolute_first(&self, name: &str) -> bool {
        let dots = name.bytes().filter(|&b| b == b'.').count();
        dots >= self.ndots as usize
    }

    /// Candidate names to query for `name`, in order.
    ///
    /// A trailing dot marks the name absolute and suppresses the search list.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if name.ends_with('.') || self.search.is_empty() {
            return vec![name.to_string()];
        }
        let searched = self.search.iter().map(|domain| format!("{name}.{domain}"));
        if self.should_try_absolute_first(name) {
            std::iter::once(name.to_string()).chain(searched).collect()
        } else {
            searched.chain(std::iter::once(name.to_string())).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
