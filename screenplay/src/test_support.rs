//! Test-only doubles: an in-memory event sink, counting abilities and tasks,
//! and temporary config directories.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;

use crate::actor::Actor;
use crate::context::ExecutionContext;
use crate::core::abilities::Ability;
use crate::core::failure::StepError;
use crate::core::outcome::TestResult;
use crate::performable::{AnonymousFunction, Task};
use crate::sink::{EventSink, LifecycleListener, ListenerId, StepFailure};

/// One notification received by a [`RecordingSink`], in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    StepStarted { title: String },
    StepFinished,
    StepFailed { title: String, result: TestResult },
    StepPending,
    StepIgnored,
    StepsMerged,
    BeginPerformance { actor: String },
    EndPerformance { actor: String },
    ConsequenceChecksBegan { actor: String },
    ConsequenceChecksEnded { actor: String },
    AbilityAssigned { actor: String, ability: String },
    FactAssigned { actor: String, fact: String },
    ListenerRegistered { id: u64 },
    ListenerDropped { id: u64 },
}

/// A step as recorded by [`RecordingSink`].
#[derive(Debug, Clone, Serialize)]
pub struct RecordedStep {
    pub title: String,
    pub result: TestResult,
    pub failure: Option<StepFailure>,
    pub children: Vec<RecordedStep>,
}

impl RecordedStep {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            result: TestResult::Success,
            failure: None,
            children: Vec::new(),
        }
    }

    fn mark(&mut self, result: TestResult) {
        self.result = self.result.combine(result);
    }
}

/// In-memory event sink modelling step bookkeeping for a single test.
///
/// Any unsuccessful failure suspends the test, after which the dispatcher
/// stops executing task bodies.
#[derive(Default)]
pub struct RecordingSink {
    events: Vec<Event>,
    open: Vec<RecordedStep>,
    steps: Vec<RecordedStep>,
    test_marks: Vec<TestResult>,
    failures: Vec<StepFailure>,
    step_failed: bool,
    suspended: bool,
    ignore_consequences: bool,
    overall: TestResult,
    listeners: BTreeMap<ListenerId, Box<dyn LifecycleListener>>,
    next_listener: u64,
}

impl RecordingSink {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Closed top-level steps.
    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn step_titles(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.title.as_str()).collect()
    }

    pub fn open_step_count(&self) -> usize {
        self.open.len()
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    pub fn overall_result(&self) -> TestResult {
        self.overall
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn ignore_consequences(&mut self) {
        self.ignore_consequences = true;
    }

    /// Finish the test: recompute the overall result and notify listeners.
    pub fn finish_test(&mut self) -> TestResult {
        self.recompute_overall_result();
        let result = self.overall;
        for listener in self.listeners.values_mut() {
            listener.test_finished(result);
        }
        result
    }

    pub fn events_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.events).unwrap_or(serde_json::Value::Null)
    }

    fn mark_current(&mut self, result: TestResult) {
        match self.open.last_mut() {
            Some(step) => step.mark(result),
            None => self.test_marks.push(result),
        }
    }
}

impl EventSink for RecordingSink {
    fn step_started(&mut self, title: &str) {
        self.events.push(Event::StepStarted {
            title: title.to_string(),
        });
        self.open.push(RecordedStep::new(title));
    }

    fn step_finished(&mut self) {
        self.events.push(Event::StepFinished);
        let Some(mut step) = self.open.pop() else {
            return;
        };
        let children = TestResult::overall(step.children.iter().map(|child| child.result));
        step.mark(children);
        match self.open.last_mut() {
            Some(parent) => parent.children.push(step),
            None => self.steps.push(step),
        }
    }

    fn step_failed(&mut self, failure: StepFailure) {
        self.events.push(Event::StepFailed {
            title: failure.title.clone(),
            result: failure.result,
        });
        if failure.result.is_unsuccessful() {
            self.step_failed = true;
            self.suspended = true;
        }
        self.mark_current(failure.result);
        if let Some(step) = self.open.last_mut() {
            step.failure = Some(failure.clone());
        }
        self.failures.push(failure);
    }

    fn step_pending(&mut self) {
        self.events.push(Event::StepPending);
        self.mark_current(TestResult::Pending);
    }

    fn step_ignored(&mut self) {
        self.events.push(Event::StepIgnored);
        self.mark_current(TestResult::Ignored);
    }

    fn current_test_is_suspended(&self) -> bool {
        self.suspended
    }

    fn running_step_count(&self) -> usize {
        self.steps.len()
    }

    fn a_step_has_failed(&self) -> bool {
        self.step_failed
    }

    fn merge_previous_step(&mut self) {
        if self.steps.len() < 2 {
            return;
        }
        let Some(last) = self.steps.pop() else {
            return;
        };
        self.events.push(Event::StepsMerged);
        if let Some(previous) = self.steps.last_mut() {
            previous.mark(last.result);
            previous.children.push(last);
        }
    }

    fn recompute_overall_result(&mut self) {
        let steps = self.steps.iter().map(|step| step.result);
        let open = self.open.iter().map(|step| step.result);
        self.overall = TestResult::overall(
            steps
                .chain(open)
                .chain(self.test_marks.iter().copied()),
        );
    }

    fn should_ignore_consequences(&self) -> bool {
        self.ignore_consequences
    }

    fn begin_performance(&mut self, actor: &str) {
        self.events.push(Event::BeginPerformance {
            actor: actor.to_string(),
        });
    }

    fn end_performance(&mut self, actor: &str) {
        self.events.push(Event::EndPerformance {
            actor: actor.to_string(),
        });
    }

    fn consequence_checks_began(&mut self, actor: &str) {
        self.events.push(Event::ConsequenceChecksBegan {
            actor: actor.to_string(),
        });
    }

    fn consequence_checks_ended(&mut self, actor: &str) {
        self.events.push(Event::ConsequenceChecksEnded {
            actor: actor.to_string(),
        });
    }

    fn ability_assigned(&mut self, actor: &str, ability: &str) {
        self.events.push(Event::AbilityAssigned {
            actor: actor.to_string(),
            ability: ability.to_string(),
        });
    }

    fn fact_assigned(&mut self, actor: &str, fact: &str) {
        self.events.push(Event::FactAssigned {
            actor: actor.to_string(),
            fact: fact.to_string(),
        });
    }

    fn register_listener(&mut self, listener: Box<dyn LifecycleListener>) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.events.push(Event::ListenerRegistered { id: id.0 });
        self.listeners.insert(id, listener);
        id
    }

    fn drop_listener(&mut self, id: ListenerId) {
        if self.listeners.remove(&id).is_some() {
            self.events.push(Event::ListenerDropped { id: id.0 });
        }
    }
}

/// Record a top-level step straight on `sink`, bypassing the engine, as an
/// asynchronous listener would.
pub fn record_out_of_band_step(sink: &mut dyn EventSink, title: &str) {
    sink.step_started(title);
    sink.step_finished();
}

/// Ability that counts how often it is torn down.
#[derive(Debug, Clone, Default)]
pub struct CountTeardowns {
    pub teardowns: Rc<Cell<u32>>,
}

impl Ability for CountTeardowns {
    fn tear_down(&mut self) {
        self.teardowns.set(self.teardowns.get() + 1);
    }
}

/// A task that records how often its body ran.
pub fn counting_task(title: &str, runs: &Rc<Cell<u32>>) -> AnonymousFunction {
    let runs = Rc::clone(runs);
    Task::from_fn(title, move |_actor: &mut Actor, _ctx: &mut ExecutionContext<'_>| {
        runs.set(runs.get() + 1);
        Ok(())
    })
}

/// A task whose body always fails with a clone of `error`.
pub fn failing_task(title: &str, error: StepError) -> AnonymousFunction {
    Task::from_fn(title, move |_actor: &mut Actor, _ctx: &mut ExecutionContext<'_>| {
        Err(error.clone())
    })
}

/// A temporary directory holding a `screenplay.toml`.
pub struct TempConfigDir {
    dir: tempfile::TempDir,
}

impl TempConfigDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("screenplay.toml")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.config_path();
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
