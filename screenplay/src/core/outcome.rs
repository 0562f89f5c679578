//! Severity taxonomy for step and scenario results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a step, a consequence check or a whole scenario.
///
/// Variants are declared in ascending severity, so `Ord` gives the
/// "most severe wins" rule used when folding several results into one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    #[default]
    Success,
    Ignored,
    Pending,
    Skipped,
    Compromised,
    Failure,
    Error,
}

impl TestResult {
    /// Fold `other` into `self`, keeping the more severe of the two.
    pub fn combine(self, other: TestResult) -> TestResult {
        self.max(other)
    }

    /// Most severe result of `results`, or `Success` when empty.
    pub fn overall<I: IntoIterator<Item = TestResult>>(results: I) -> TestResult {
        results
            .into_iter()
            .fold(TestResult::Success, TestResult::combine)
    }

    /// True for results that mean the scenario did not pass.
    pub fn is_unsuccessful(self) -> bool {
        matches!(
            self,
            TestResult::Compromised | TestResult::Failure | TestResult::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestResult::Success => "success",
            TestResult::Ignored => "ignored",
            TestResult::Pending => "pending",
            TestResult::Skipped => "skipped",
            TestResult::Compromised => "compromised",
            TestResult::Failure => "failure",
            TestResult::Error => "error",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
