//! Structured logging for lookups and verification runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL log record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file, stderr, or memory.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Timeout,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<u16>,
    /// Zero-based retry round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            hostname: None,
            nameserver: None,
            txid: None,
            attempt: None,
            outcome: None,
            address: None,
            latency_ns: None,
            details: None,
        }
    }

    /// Set the queried hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the nameserver, transaction ID and retry round of a query.
    #[must_use]
    pub fn with_query(mut self, nameserver: impl Into<String>, txid: u16, attempt: u32) -> Self {
        self.nameserver = Some(nameserver.into());
        self.txid = Some(txid);
        self.attempt = Some(attempt);
        self
    }

    /// Set the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the resolved address.
    #[must_use]
    pub fn with_address(mut self, address: impl ToString) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Set latency in nanoseconds.
    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

enum Sink {
    Writer(Box<dyn Write>),
    Memory(Vec<LogEntry>),
}

/// Writes structured JSONL log entries.
pub struct LogEmitter {
    sink: Sink,
    seq: u64,
    run_id: String,
    sink_failed: bool,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(std::io::BufWriter::new(file), run_id))
    }

    /// Create an emitter that writes to stderr.
    #[must_use]
    pub fn to_stderr(run_id: &str) -> Self {
        Self::to_writer(std::io::stderr(), run_id)
    }

    /// Create an emitter over any writer.
    #[must_use]
    pub fn to_writer(writer: impl Write + 'static, run_id: &str) -> Self {
        Self {
            sink: Sink::Writer(Box::new(writer)),
            seq: 0,
            run_id: run_id.to_string(),
            sink_failed: false,
        }
    }

    /// Create an emitter that keeps entries in memory (for testing).
    #[must_use]
    pub fn to_buffer(run_id: &str) -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
            seq: 0,
            run_id: run_id.to_string(),
            sink_failed: false,
        }
    }

    /// Entries captured by a [`LogEmitter::to_buffer`] emitter.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        match &self.sink {
            Sink::Memory(entries) => entries,
            Sink::Writer(_) => &[],
        }
    }

    /// Generate the next trace ID.
    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("stubresolv::{}::{:03}", self.run_id, self.seq)
    }

    /// Start an entry with a fresh trace ID; pass it to [`LogEmitter::emit_entry`].
    pub fn entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self.next_trace_id();
        LogEntry::new(trace_id, level, event)
    }

    /// Emit a bare entry with an auto-generated trace ID.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let entry = self.entry(level, event);
        self.emit_entry(entry.clone())?;
        Ok(entry)
    }

    /// Emit a fully-populated log entry.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        match &mut self.sink {
            Sink::Writer(writer) => {
                let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
                writeln!(writer, "{line}")
            }
            Sink::Memory(entries) => {
                entries.push(entry);
                Ok(())
            }
        }
    }

    /// Emit an entry without failing the caller.
    ///
    /// The first sink error is reported once on stderr; later entries are
    /// still attempted.
    pub fn emit_best_effort(&mut self, entry: LogEntry) {
        if let Err(err) = self.emit_entry(entry)
            && !self.sink_failed
        {
            self.sink_failed = true;
            eprintln!("stubresolv::{}: log sink failed: {err}", self.run_id);
        }
    }

    /// Whether a [`LogEmitter::emit_best_effort`] write has failed.
    #[must_use]
    pub fn sink_failed(&self) -> bool {
        self.sink_failed
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.sink {
            Sink::Writer(writer) => writer.flush(),
            Sink::Memory(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut push = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        })
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            push("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        push("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            push(field, "required field missing".to_string());
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !["trace", "debug", "info", "warn", "error"].contains(&level)
    {
        push("level", format!("invalid level: '{level}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !["pass", "fail", "skip", "timeout"].contains(&outcome)
    {
        push("outcome", format!("invalid outcome: '{outcome}'"));
    }

    // A query event names the server it went to.
    if obj.contains_key("txid") && !obj.contains_key("nameserver") {
        push("nameserver", "txid present without nameserver".to_string());
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        push(
            "trace_id",
            format!("trace_id should follow <tool>::<run_id>::<seq> format, got: '{trace_id}'"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the total line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    // Days-to-civil conversion (proleptic Gregorian).
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("stubresolv::run::001", LogLevel::Info, "query_sent");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "query_sent");
        assert!(parsed.get("nameserver").is_none());
    }

    #[test]
    fn query_entry_validates() {
        let entry = LogEntry::new("stubresolv::run::002", LogLevel::Info, "response")
            .with_hostname("example.com")
            .with_query("8.8.8.8", 0x1234, 0)
            .with_outcome(Outcome::Pass)
            .with_address(std::net::Ipv4Addr::new(1, 2, 3, 4));
        let line = entry.to_jsonl().unwrap();
        let restored = validate_log_line(&line, 1).unwrap();
        assert_eq!(restored.txid, Some(0x1234));
        assert_eq!(restored.address.as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_invalid_level() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c","level":"critical","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "level"));
    }

    #[test]
    fn validate_txid_requires_nameserver() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c","level":"info","event":"q","txid":7}"#;
        let errors = validate_log_line(json, 3).unwrap_err();
        assert_eq!(errors[0].field, "nameserver");
        assert_eq!(errors[0].line_number, 3);
    }

    #[test]
    fn validate_invalid_json() {
        let errors = validate_log_line("not json at all", 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "<json>"));
    }

    #[test]
    fn emitter_generates_sequential_trace_ids() {
        let mut emitter = LogEmitter::to_buffer("run-42");
        let e1 = emitter.emit(LogLevel::Info, "start").unwrap();
        let e2 = emitter.emit(LogLevel::Info, "end").unwrap();
        assert_eq!(e1.trace_id, "stubresolv::run-42::001");
        assert_eq!(e2.trace_id, "stubresolv::run-42::002");
        assert_eq!(emitter.entries().len(), 2);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn best_effort_emit_records_sink_failure() {
        let mut emitter = LogEmitter::to_writer(BrokenPipe, "broken");
        assert!(!emitter.sink_failed());
        let entry = emitter.entry(LogLevel::Info, "query_sent");
        emitter.emit_best_effort(entry);
        assert!(emitter.sink_failed());
        let entry = emitter.entry(LogLevel::Info, "response");
        emitter.emit_best_effort(entry);
        assert!(emitter.sink_failed());
    }

    #[test]
    fn best_effort_emit_keeps_memory_entries() {
        let mut emitter = LogEmitter::to_buffer("mem");
        let entry = emitter.entry(LogLevel::Debug, "candidate");
        emitter.emit_best_effort(entry);
        assert!(!emitter.sink_failed());
        assert_eq!(emitter.entries().len(), 1);
    }

    #[test]
    fn file_emitter_output_validates() {
        let path = std::env::temp_dir().join(format!("stubresolv-log-{}.jsonl", std::process::id()));
        let mut emitter = LogEmitter::to_file(&path, "file").unwrap();
        emitter.emit(LogLevel::Info, "lookup_start").unwrap();
        let entry = emitter
            .entry(LogLevel::Info, "response")
            .with_hostname("example.com")
            .with_query("127.0.0.1", 0xBEEF, 1)
            .with_outcome(Outcome::Pass)
            .with_address(std::net::Ipv4Addr::new(93, 184, 216, 34));
        emitter.emit_entry(entry).unwrap();
        emitter.flush().unwrap();
        drop(emitter);

        let result = validate_log_file(&path);
        std::fs::remove_file(&path).ok();
        let (lines, errors) = result.unwrap();
        assert_eq!(lines, 2);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn validate_log_file_reports_bad_lines() {
        let path = std::env::temp_dir().join(format!("stubresolv-badlog-{}.jsonl", std::process::id()));
        let good = LogEntry::new("stubresolv::x::001", LogLevel::Warn, "timeout")
            .to_jsonl()
            .unwrap();
        std::fs::write(&path, format!("{good}\n\nnot json\n")).unwrap();
        let result = validate_log_file(&path);
        std::fs::remove_file(&path).ok();
        let (lines, errors) = result.unwrap();
        assert_eq!(lines, 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 3);
    }

    #[test]
    fn format_utc_known_instants() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_utc(951_782_400, 5), "2000-02-29T00:00:00.005Z");
        assert_eq!(format_utc(1_767_225_599, 999), "2025-12-31T23:59:59.999Z");
    }
}
