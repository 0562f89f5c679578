//! Failure analysis: map a raised error to a [`TestResult`].
//!
//! Classification is an ordered rule table evaluated top to bottom; the first
//! matching rule decides. The table is built from [`ClassificationConfig`] in a
//! fixed category order, so precedence never depends on how the lists were
//! written:
//!
//! 1. root cause is a pending type => `Pending`
//! 2. root cause is a skipped type => `Skipped`
//! 3. error is a step-failure wrapper whose cause is a failure => `Failure`
//! 4. root cause is a failure type => `Failure`
//! 5. root cause is a compromised type => `Compromised`
//! 6. root cause is an explicit error type => `Error`
//! 7. anything else => `Error`

use serde::{Deserialize, Serialize};

use crate::core::failure::{ErrorType, StepError, kinds};
use crate::core::outcome::TestResult;

/// User-extensible lists of error type identifiers per category.
///
/// Each list extends the built-in defaults. Identifiers listed in `error_on`
/// are removed from every other category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub fail_on: Vec<String>,
    pub error_on: Vec<String>,
    pub pending_on: Vec<String>,
    pub skipped_on: Vec<String>,
    pub compromised_on: Vec<String>,
}

const DEFAULT_FAILURE_TYPES: &[&str] = &[kinds::ASSERTION, kinds::CAUSES_ASSERTION_FAILURE];
const DEFAULT_COMPROMISED_TYPES: &[&str] = &[kinds::CAUSES_COMPROMISED_TEST_FAILURE];
const DEFAULT_PENDING_TYPES: &[&str] = &[kinds::PENDING_STEP, kinds::PENDING];
const DEFAULT_SKIPPED_TYPES: &[&str] = &[];

/// What a rule tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleMatch {
    /// The root cause is-a `type_name`.
    RootCauseIsA { type_name: String },
    /// The raw error is a step-failure wrapper whose direct cause classifies
    /// as a failure.
    WrappedFailure,
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    #[serde(flatten)]
    pub matches: RuleMatch,
    pub result: TestResult,
}

/// Ordered classification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAnalysis {
    rules: Vec<Rule>,
    failure_types: Vec<String>,
}

impl Default for FailureAnalysis {
    fn default() -> Self {
        Self::from_config(&ClassificationConfig::default())
    }
}

impl FailureAnalysis {
    pub fn from_config(config: &ClassificationConfig) -> Self {
        let error_types = dedup(config.error_on.iter().map(String::as_str));
        let category = |defaults: &[&str], extra: &[String]| -> Vec<String> {
            dedup(defaults.iter().copied().chain(extra.iter().map(String::as_str)))
                .into_iter()
                .filter(|ty| !error_types.contains(ty))
                .collect()
        };

        let pending = category(DEFAULT_PENDING_TYPES, &config.pending_on);
        let skipped = category(DEFAULT_SKIPPED_TYPES, &config.skipped_on);
        let failure = category(DEFAULT_FAILURE_TYPES, &config.fail_on);
        let compromised = category(DEFAULT_COMPROMISED_TYPES, &config.compromised_on);

        let mut rules = Vec::new();
        push_rules(&mut rules, &pending, TestResult::Pending);
        push_rules(&mut rules, &skipped, TestResult::Skipped);
        rules.push(Rule {
            matches: RuleMatch::WrappedFailure,
            result: TestResult::Failure,
        });
        push_rules(&mut rules, &failure, TestResult::Failure);
        push_rules(&mut rules, &compromised, TestResult::Compromised);
        push_rules(&mut rules, &error_types, TestResult::Error);

        Self {
            rules,
            failure_types: failure,
        }
    }

    /// The table in evaluation order. The implicit fallback (`Error`) is not
    /// listed.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a raised error.
    pub fn result_for(&self, error: &StepError) -> TestResult {
        let root = error.root_cause().error_type();
        self.rules
            .iter()
            .find(|rule| match &rule.matches {
                RuleMatch::RootCauseIsA { type_name } => root.is_a(type_name),
                RuleMatch::WrappedFailure => self.is_wrapped_failure(error),
            })
            .map_or(TestResult::Error, |rule| rule.result)
    }

    /// Classify a bare error type, as if it were raised without a cause.
    ///
    /// Uses the same precedence as [`FailureAnalysis::result_for`], so a type
    /// listed as both a failure and a compromised type is a failure on
    /// either path.
    pub fn result_for_type(&self, error_type: &ErrorType) -> TestResult {
        self.rules
            .iter()
            .find(|rule| match &rule.matches {
                RuleMatch::RootCauseIsA { type_name } => error_type.is_a(type_name),
                RuleMatch::WrappedFailure => false,
            })
            .map_or(TestResult::Error, |rule| rule.result)
    }

    /// Most severe classification among `errors`, or `None` when empty.
    pub fn most_severe<'a, I>(&self, errors: I) -> Option<TestResult>
    where
        I: IntoIterator<Item = &'a StepError>,
    {
        errors.into_iter().map(|err| self.result_for(err)).max()
    }

    fn is_wrapped_failure(&self, error: &StepError) -> bool {
        if !error.is_a(kinds::STEP_FAILURE) {
            return false;
        }
        let Some(cause) = error.cause() else {
            return false;
        };
        let root = cause.root_cause().error_type();
        self.failure_types.iter().any(|ty| root.is_a(ty))
    }
}

fn push_rules(rules: &mut Vec<Rule>, types: &[String], result: TestResult) {
    rules.extend(types.iter().map(|ty| Rule {
        matches: RuleMatch::RootCauseIsA {
            type_name: ty.clone(),
        },
        result,
    }));
}

fn dedup<'a, I: IntoIterator<Item = &'a str>>(types: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ty in types {
        let ty = ty.trim();
        if !ty.is_empty() && !out.iter().any(|seen| seen == ty) {
            out.push(ty.to_string());
        }
    }
    out
}
