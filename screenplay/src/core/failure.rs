//! Raised errors and their type identities.
//!
//! Tasks, questions and consequences report problems by returning a
//! [`StepError`]. Each error carries an [`ErrorType`]: a name plus the
//! supertypes it declares. Classification never inspects messages, only the
//! type identity of the root cause (see [`crate::core::analysis`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known error type identifiers used by the default classification rules.
pub mod kinds {
    /// An expected-vs-actual mismatch.
    pub const ASSERTION: &str = "assertion";
    /// Marker supertype for user types that should count as assertion failures.
    pub const CAUSES_ASSERTION_FAILURE: &str = "causes-assertion-failure";
    /// Marker supertype for environment/precondition failures.
    pub const CAUSES_COMPROMISED_TEST_FAILURE: &str = "causes-compromised-test-failure";
    /// A compromised-test error raised by the framework itself.
    pub const COMPROMISED: &str = "compromised";
    /// A step that is explicitly not implemented yet.
    pub const PENDING_STEP: &str = "pending-step";
    /// Generic pending marker (e.g. raised by a BDD runner).
    pub const PENDING: &str = "pending";
    /// A step that should be recorded as ignored.
    pub const IGNORE_STEP: &str = "ignore-step";
    /// A step that was deliberately skipped.
    pub const SKIPPED: &str = "skipped";
    /// A violated assumption; always aborts the current batch.
    pub const ASSUMPTION_VIOLATED: &str = "assumption-violated";
    /// Wrapper raised around a failing step.
    pub const STEP_FAILURE: &str = "step-failure";
    /// Root of the hierarchy; everything else is an error.
    pub const ERROR: &str = "error";
}

/// Type identity of a raised error.
///
/// Matching is "is-a": a type matches an identifier if its own name or one of
/// its declared supertypes equals that identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorType {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supertypes: Vec<String>,
}

impl ErrorType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
        }
    }

    /// Declare an additional supertype this type satisfies.
    pub fn extending(mut self, supertype: impl Into<String>) -> Self {
        let supertype = supertype.into();
        if supertype != self.name && !self.supertypes.contains(&supertype) {
            self.supertypes.push(supertype);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Returns true if this type is, or declares, `identifier`.
    pub fn is_a(&self, identifier: &str) -> bool {
        self.name == identifier || self.supertypes.iter().any(|s| s == identifier)
    }

    /// Parse `name` or `name:super1+super2`.
    pub fn parse(text: &str) -> Option<Self> {
        let (name, supers) = match text.split_once(':') {
            Some((name, supers)) => (name.trim(), supers),
            None => (text.trim(), ""),
        };
        if name.is_empty() {
            return None;
        }
        let ty = supers
            .split('+')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(ErrorType::new(name), ErrorType::extending);
        Some(ty)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An error raised while performing a task, answering a question or checking
/// a consequence.
#[derive(Debug, Clone, Error)]
#[error("{error_type}: {message}")]
pub struct StepError {
    error_type: ErrorType,
    message: String,
    #[source]
    cause: Option<Box<StepError>>,
    suppressed: Vec<StepError>,
}

impl StepError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            cause: None,
            suppressed: Vec::new(),
        }
    }

    /// An assertion failure: the observed state did not match expectations.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::ASSERTION), message)
    }

    /// The step is not implemented yet.
    pub fn pending(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::PENDING_STEP), message)
    }

    /// The step should be recorded as ignored rather than failed.
    pub fn ignore(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::IGNORE_STEP), message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::SKIPPED), message)
    }

    /// The test environment is broken; the scenario result cannot be trusted.
    pub fn compromised(message: impl Into<String>) -> Self {
        Self::new(
            ErrorType::new(kinds::COMPROMISED).extending(kinds::CAUSES_COMPROMISED_TEST_FAILURE),
            message,
        )
    }

    pub fn assumption_violated(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::ASSUMPTION_VIOLATED), message)
    }

    /// Anything else: infrastructure faults, bugs, unexpected states.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorType::new(kinds::ERROR), message)
    }

    /// Wrap `cause` in a step-failure error, keeping its message.
    pub fn step_failure(cause: StepError) -> Self {
        let message = cause.message.clone();
        Self::new(ErrorType::new(kinds::STEP_FAILURE), message).caused_by(cause)
    }

    pub fn caused_by(mut self, cause: StepError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_suppressed(mut self, suppressed: Vec<StepError>) -> Self {
        self.suppressed = suppressed;
        self
    }

    pub fn error_type(&self) -> &ErrorType {
        &self.error_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&StepError> {
        self.cause.as_deref()
    }

    /// Errors folded into this one (the individual consequence failures of an
    /// aggregate failure).
    pub fn suppressed(&self) -> &[StepError] {
        &self.suppressed
    }

    /// Innermost error of the cause chain (`self` when there is no cause).
    pub fn root_cause(&self) -> &StepError {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    pub fn is_a(&self, identifier: &str) -> bool {
        self.error_type.is_a(identifier)
    }

    pub fn is_pending(&self) -> bool {
        self.is_a(kinds::PENDING_STEP) || self.is_a(kinds::PENDING)
    }

    /// True for an ignore signal, raised directly or as the root cause.
    pub fn is_ignore(&self) -> bool {
        self.is_a(kinds::IGNORE_STEP) || self.root_cause().is_a(kinds::IGNORE_STEP)
    }

    pub fn is_assumption_violation(&self) -> bool {
        self.is_a(kinds::ASSUMPTION_VIOLATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_walks_to_innermost_error() {
        let err = StepError::error("outer")
            .caused_by(StepError::error("middle").caused_by(StepError::assertion("inner")));
        assert_eq!(err.root_cause().message(), "inner");
        assert!(err.root_cause().is_a(kinds::ASSERTION));
    }

    #[test]
    fn root_cause_of_error_without_cause_is_itself() {
        let err = StepError::assertion("boom");
        assert_eq!(err.root_cause().message(), "boom");
    }

    #[test]
    fn is_a_matches_declared_supertypes() {
        let ty = ErrorType::new("element-not-found").extending(kinds::CAUSES_ASSERTION_FAILURE);
        assert!(ty.is_a("element-not-found"));
        assert!(ty.is_a(kinds::CAUSES_ASSERTION_FAILURE));
        assert!(!ty.is_a(kinds::ASSERTION));
    }

    #[test]
    fn extending_ignores_duplicates_and_self() {
        let ty = ErrorType::new("a").extending("a").extending("b").extending("b");
        assert_eq!(ty.supertypes(), ["b".to_string()]);
    }

    #[test]
    fn parse_accepts_name_and_supertypes() {
        let ty = ErrorType::parse("timeout:error + causes-compromised-test-failure")
            .expect("parse");
        assert_eq!(ty.name(), "timeout");
        assert!(ty.is_a(kinds::ERROR));
        assert!(ty.is_a(kinds::CAUSES_COMPROMISED_TEST_FAILURE));
    }

    #[test]
    fn parse_rejects_empty_name() {
        assert!(ErrorType::parse(" :error").is_none());
        assert!(ErrorType::parse("").is_none());
    }

    #[test]
    fn source_exposes_cause_chain() {
        use std::error::Error as _;
        let err = StepError::step_failure(StepError::assertion("expected 1 but was 2"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "assertion: expected 1 but was 2");
        assert_eq!(err.message(), "expected 1 but was 2");
    }

    #[test]
    fn pending_and_ignore_signals_are_recognised() {
        assert!(StepError::pending("later").is_pending());
        assert!(StepError::ignore("n/a").is_ignore());
        assert!(StepError::step_failure(StepError::ignore("n/a")).is_ignore());
        assert!(!StepError::assertion("no").is_ignore());
        assert!(StepError::assumption_violated("no db").is_assumption_violation());
    }
}
