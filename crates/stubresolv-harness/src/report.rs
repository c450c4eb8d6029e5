//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// One fixture file that contributed to a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSource {
    /// Family name of the set.
    pub family: String,
    /// SHA-256 of the fixture file, when loaded from disk.
    pub digest: Option<String>,
}

/// A conformance report over one or more fixture sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Fixture sets that were run.
    pub sources: Vec<FixtureSource>,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        if !self.sources.is_empty() {
            out.push_str("## Fixtures\n\n");
            for source in &self.sources {
                let digest = source.digest.as_deref().unwrap_or("in-memory");
                out.push_str(&format!("- {} (`sha256:{digest}`)\n", source.family));
            }
            out.push('\n');
        }

        out.push_str("| Case | Reference | Status |\n");
        out.push_str("|------|-----------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("| {} | {} | {} |\n", r.case_name, r.reference, status));
        }

        let failures: Vec<_> = self.summary.failures().collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!("\n### {}\n\n```\n", r.case_name));
                out.push_str(r.diff.as_deref().unwrap_or(""));
                out.push_str("\n```\n");
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::VerificationResult;

    #[test]
    fn markdown_lists_failures_and_digests() {
        let report = ConformanceReport {
            title: "resolv".to_string(),
            timestamp: "2026-10-19T00:00:00.000Z".to_string(),
            sources: vec![FixtureSource {
                family: "resolv/core".to_string(),
                digest: Some("ab".repeat(32)),
            }],
            summary: VerificationSummary::from_results(vec![VerificationResult {
                case_name: "bad_case".to_string(),
                reference: "RFC 1035 4.1.4".to_string(),
                passed: false,
                expected: "1.2.3.4".to_string(),
                actual: "-1".to_string(),
                diff: Some("-1.2.3.4\n+-1".to_string()),
            }]),
        };
        let md = report.to_markdown();
        assert!(md.contains("| bad_case | RFC 1035 4.1.4 | FAIL |"));
        assert!(md.contains("### bad_case"));
        assert!(md.contains("sha256:abab"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["summary"]["failed"], 1);
    }
}
