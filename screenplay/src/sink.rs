//! The event sink: the reporting subsystem as seen by the engine.
//!
//! The engine never records results itself. It tells the sink what happened,
//! in call order, and asks it a handful of questions about the current test
//! (is it suspended, how many steps has it recorded, should consequences be
//! ignored). Implementations live in the reporting layer; an in-memory one is
//! available under `test_support`.

use serde::Serialize;

use crate::core::failure::StepError;
use crate::core::outcome::TestResult;

/// A failed step as reported to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    /// Title of the failing task or consequence.
    pub title: String,
    /// Classification of the error.
    pub result: TestResult,
    /// Type name of the error's root cause.
    pub error_type: String,
    pub message: String,
}

impl StepFailure {
    pub fn new(title: impl Into<String>, error: &StepError, result: TestResult) -> Self {
        let root = error.root_cause();
        Self {
            title: title.into(),
            result,
            error_type: root.error_type().name().to_string(),
            message: error.message().to_string(),
        }
    }
}

/// Handle returned when a lifecycle listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListenerId(pub u64);

/// Notified when the current test finishes.
pub trait LifecycleListener {
    fn test_finished(&mut self, result: TestResult);

    fn describe(&self) -> String {
        "lifecycle listener".to_string()
    }
}

/// Step and lifecycle notifications consumed by the reporting layer.
///
/// Every `step_started` is closed by exactly one `step_finished`.
/// `step_failed`, `step_pending` and `step_ignored` mark the innermost open
/// step (or the test itself when no step is open) without closing it.
pub trait EventSink {
    fn step_started(&mut self, title: &str);

    /// Close the innermost open step.
    fn step_finished(&mut self);

    fn step_failed(&mut self, failure: StepFailure);

    fn step_pending(&mut self);

    fn step_ignored(&mut self);

    /// A suspended test no longer executes task bodies (typically after a
    /// step failed).
    fn current_test_is_suspended(&self) -> bool;

    /// Top-level steps recorded for the current test.
    fn running_step_count(&self) -> usize;

    fn a_step_has_failed(&self) -> bool;

    /// Fold the most recent top-level step into the one before it.
    fn merge_previous_step(&mut self);

    fn recompute_overall_result(&mut self);

    fn should_ignore_consequences(&self) -> bool;

    fn begin_performance(&mut self, actor: &str) {
        let _ = actor;
    }

    fn end_performance(&mut self, actor: &str) {
        let _ = actor;
    }

    fn consequence_checks_began(&mut self, actor: &str) {
        let _ = actor;
    }

    fn consequence_checks_ended(&mut self, actor: &str) {
        let _ = actor;
    }

    /// An ability was granted to `actor`. Announced the next time the actor
    /// is used with a context.
    fn ability_assigned(&mut self, actor: &str, ability: &str) {
        let _ = (actor, ability);
    }

    fn fact_assigned(&mut self, actor: &str, fact: &str) {
        let _ = (actor, fact);
    }

    fn register_listener(&mut self, listener: Box<dyn LifecycleListener>) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn drop_listener(&mut self, id: ListenerId);
}
