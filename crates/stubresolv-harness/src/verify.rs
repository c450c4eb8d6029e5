//! Output comparison and verification.

use serde::{Deserialize, Serialize};

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the test case.
    pub case_name: String,
    /// RFC or resolver(5) reference.
    pub reference: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Expected output.
    pub expected: String,
    /// Actual output from our implementation.
    pub actual: String,
    /// Diff if the case failed.
    pub diff: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Total cases run.
    pub total: usize,
    /// Cases passed.
    pub passed: usize,
    /// Cases failed.
    pub failed: usize,
    /// Individual results.
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            results,
        }
    }

    /// Returns true if all cases passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, passed: bool) -> VerificationResult {
        VerificationResult {
            case_name: name.to_string(),
            reference: "RFC 1035 4.1.1".to_string(),
            passed,
            expected: "1".to_string(),
            actual: if passed { "1" } else { "2" }.to_string(),
            diff: None,
        }
    }

    #[test]
    fn summary_counts() {
        let summary =
            VerificationSummary::from_results(vec![result("a", true), result("b", false)]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.failures().next().map(|r| r.case_name.as_str()), Some("b"));
    }
}
