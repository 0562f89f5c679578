//! Bookkeeping for performed tasks, expected steps and failed consequence
//! checks.

use crate::core::analysis::FailureAnalysis;
use crate::core::failure::StepError;

/// Count of top-level tasks an actor has performed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskTally {
    performed: usize,
}

impl TaskTally {
    pub fn new_task(&mut self) {
        self.performed += 1;
    }

    pub fn performed_task_count(&self) -> usize {
        self.performed
    }
}

/// Top-level steps the engine expects the sink to hold.
///
/// Every step the engine opens while no other engine step is open adds one:
/// instrumented tasks, reported children of hidden or unreported tasks,
/// consequence checks and consequence groups. Silent tasks add nothing. A
/// sink holding more top-level steps than this has recorded some out of band.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepLedger {
    expected: usize,
    open: usize,
}

impl StepLedger {
    /// A ledger that takes `recorded` existing steps as known.
    pub fn starting_at(recorded: usize) -> Self {
        Self {
            expected: recorded,
            open: 0,
        }
    }

    pub fn step_opened(&mut self) {
        if self.open == 0 {
            self.expected += 1;
        }
        self.open += 1;
    }

    pub fn step_closed(&mut self) {
        self.open = self.open.saturating_sub(1);
    }

    pub fn expected_steps(&self) -> usize {
        self.expected
    }

    /// True when the sink has recorded more top-level steps than expected.
    pub fn is_out_of_step(&self, running_step_count: usize) -> bool {
        running_step_count > self.expected
    }
}

/// A consequence that failed and the error it raised.
#[derive(Debug, Clone)]
pub struct RecordedError {
    pub consequence: String,
    pub error: StepError,
}

/// Errors collected during one `should` call.
#[derive(Debug, Default)]
pub struct ErrorTally {
    errors: Vec<RecordedError>,
}

impl ErrorTally {
    pub fn record_error(&mut self, consequence: impl Into<String>, error: StepError) {
        self.errors.push(RecordedError {
            consequence: consequence.into(),
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    /// Fold the recorded errors into a single error, or `Ok(())` if none.
    ///
    /// A single recorded error is returned unchanged. Several errors produce an
    /// aggregate whose type is the root-cause type of the most severe error (so
    /// it classifies the same way), whose message lists every failure, and
    /// whose suppressed errors are the individual failures in check order.
    pub fn report_any_errors(self, analysis: &FailureAnalysis) -> Result<(), StepError> {
        let mut errors = self.errors;
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0).error),
            _ => Err(aggregate(errors, analysis)),
        }
    }
}

fn aggregate(errors: Vec<RecordedError>, analysis: &FailureAnalysis) -> StepError {
    // First error among the most severe ones decides the aggregate's type.
    let mut dominant = 0;
    let mut dominant_result = analysis.result_for(&errors[0].error);
    for (index, recorded) in errors.iter().enumerate().skip(1) {
        let result = analysis.result_for(&recorded.error);
        if result > dominant_result {
            dominant = index;
            dominant_result = result;
        }
    }
    let error_type = errors[dominant].error.root_cause().error_type().clone();

    let summary = errors
        .iter()
        .map(|recorded| {
            format!(
                "{}: {}",
                recorded.consequence,
                recorded.error.root_cause().message()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let message = format!("{} consequences failed:\n{}", errors.len(), summary);

    StepError::new(error_type, message)
        .with_suppressed(errors.into_iter().map(|recorded| recorded.error).collect())
}
