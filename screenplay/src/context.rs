//! Explicit execution context threaded through performances.
//!
//! Holds everything the dispatcher and evaluator need beyond the actor: the
//! event sink for the current test, the failure analysis, the performance
//! settings, the nesting state (how deep we are inside composite tasks and
//! whether an enclosing task silenced reporting), and the ledger of steps the
//! engine itself opened. The test-run driver owns the sink and creates one
//! context per test thread.

use crate::core::analysis::FailureAnalysis;
use crate::core::tally::StepLedger;
use crate::sink::EventSink;

/// Process-wide switches that change how task failures propagate and which
/// tasks get reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceSettings {
    /// Return task errors to the caller instead of swallowing them after
    /// reporting.
    pub throw_errors_immediately: bool,
    /// Only report tasks that carry an explicit step marker.
    pub manual_task_instrumentation: bool,
}

pub struct ExecutionContext<'a> {
    sink: &'a mut dyn EventSink,
    analysis: &'a FailureAnalysis,
    settings: PerformanceSettings,
    silent_depth: usize,
    depth: usize,
    ledger: StepLedger,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        sink: &'a mut dyn EventSink,
        analysis: &'a FailureAnalysis,
        settings: PerformanceSettings,
    ) -> Self {
        // Steps already in the sink were not recorded out of band.
        let ledger = StepLedger::starting_at(sink.running_step_count());
        Self {
            sink,
            analysis,
            settings,
            silent_depth: 0,
            depth: 0,
            ledger,
        }
    }

    pub fn sink(&mut self) -> &mut (dyn EventSink + 'a) {
        &mut *self.sink
    }

    pub fn sink_ref(&self) -> &(dyn EventSink + 'a) {
        &*self.sink
    }

    pub fn analysis(&self) -> &FailureAnalysis {
        self.analysis
    }

    pub fn settings(&self) -> PerformanceSettings {
        self.settings
    }

    /// Open a step and account for it in the ledger.
    pub(crate) fn start_step(&mut self, title: &str) {
        self.ledger.step_opened();
        self.sink.step_started(title);
    }

    /// Close the innermost step opened with [`ExecutionContext::start_step`].
    pub(crate) fn finish_step(&mut self) {
        self.ledger.step_closed();
        self.sink.step_finished();
    }

    /// Top-level steps the engine expects the sink to hold.
    pub fn expected_step_count(&self) -> usize {
        self.ledger.expected_steps()
    }

    /// True when the sink holds top-level steps the engine did not open.
    pub fn is_out_of_step(&self) -> bool {
        self.ledger.is_out_of_step(self.sink.running_step_count())
    }

    /// True while running inside a task that suppressed reporting.
    pub fn is_nested_in_silent_task(&self) -> bool {
        self.silent_depth > 0
    }

    /// True while running inside another task's body.
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    /// Run `f` one level deeper in the task hierarchy.
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` with reporting suppressed for everything it performs.
    pub(crate) fn silenced<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.silent_depth += 1;
        let result = f(self);
        self.silent_depth -= 1;
        result
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("settings", &self.settings)
            .field("silent_depth", &self.silent_depth)
            .field("depth", &self.depth)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
