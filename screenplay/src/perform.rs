//! Task dispatch behind [`Actor::attempts_to`](crate::actor::Actor::attempts_to).
//!
//! Tasks run in order. Each one is classified (nested in a silent task,
//! silent, hidden, unreported, instrumented); instrumented tasks are wrapped
//! in a reported step. The first task that fails with anything other than an
//! ignore or pending signal is reported and stops the rest of the batch. An
//! error is a pending signal when it classifies as pending.

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::context::ExecutionContext;
use crate::core::failure::StepError;
use crate::core::outcome::TestResult;
use crate::core::title::inject_actor;
use crate::performable::{Performable, Visibility};
use crate::sink::StepFailure;

/// How a task is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reporting {
    /// An enclosing task already silenced reporting.
    NestedSilent,
    Silent,
    Hidden,
    /// Not instrumentable, or no step marker in manual instrumentation mode.
    Unreported,
    Instrumented,
}

enum Flow {
    Continue,
    Abort,
}

pub(crate) fn attempts_to(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    tasks: &[&dyn Performable],
) -> Result<(), StepError> {
    let name = actor.name();
    ctx.sink().begin_performance(&name);
    let outcome = perform_in_order(actor, ctx, tasks);
    ctx.sink().end_performance(&name);
    outcome
}

fn perform_in_order(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    tasks: &[&dyn Performable],
) -> Result<(), StepError> {
    for (position, task) in tasks.iter().enumerate() {
        if let Flow::Abort = perform(actor, ctx, *task)? {
            let skipped = tasks.len() - position - 1;
            if skipped > 0 {
                debug!(actor = %actor, skipped, "not performing remaining tasks");
            }
            break;
        }
    }
    Ok(())
}

fn reporting_for(ctx: &ExecutionContext<'_>, task: &dyn Performable) -> Reporting {
    if ctx.is_nested_in_silent_task() {
        return Reporting::NestedSilent;
    }
    match task.visibility() {
        Visibility::Silent => Reporting::Silent,
        Visibility::Hidden => Reporting::Hidden,
        Visibility::Reported => {
            let unmarked =
                ctx.settings().manual_task_instrumentation && task.step_marker().is_none();
            if unmarked || !task.is_instrumentable() {
                Reporting::Unreported
            } else {
                Reporting::Instrumented
            }
        }
    }
}

fn step_title(actor: &Actor, task: &dyn Performable) -> String {
    let template = match task.step_marker() {
        Some(marker) => marker.to_string(),
        None => task.title(),
    };
    inject_actor(&template, &actor.name_or_pronoun())
}

fn perform(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    task: &dyn Performable,
) -> Result<Flow, StepError> {
    let reporting = reporting_for(ctx, task);
    let title = step_title(actor, task);
    let top_level = !ctx.is_nested();
    if top_level {
        actor.tally_mut().new_task();
    }
    debug!(actor = %actor, task = %title, ?reporting, top_level, "performing task");

    let instrumented = reporting == Reporting::Instrumented;
    if instrumented {
        ctx.start_step(&title);
    }
    if task.is_pending() {
        ctx.sink().step_pending();
    }

    let result = if ctx.sink_ref().current_test_is_suspended() {
        debug!(task = %title, "test is suspended; not executing");
        Ok(())
    } else if reporting == Reporting::Silent {
        ctx.silenced(|ctx| ctx.nested(|ctx| task.perform_as(actor, ctx)))
    } else {
        ctx.nested(|ctx| task.perform_as(actor, ctx))
    };

    let succeeded = result.is_ok();
    let flow = match result {
        Ok(()) => Ok(Flow::Continue),
        Err(error) => handle_failure(ctx, &title, instrumented, error),
    };
    if instrumented {
        ctx.finish_step();
    }
    if top_level && succeeded {
        reconcile_step_count(actor, ctx);
    }
    ctx.sink().recompute_overall_result();
    flow
}

fn handle_failure(
    ctx: &mut ExecutionContext<'_>,
    title: &str,
    instrumented: bool,
    error: StepError,
) -> Result<Flow, StepError> {
    if error.is_ignore() {
        debug!(task = %title, "task ignored");
        if instrumented {
            ctx.sink().step_ignored();
        }
        return Ok(Flow::Continue);
    }
    let result = ctx.analysis().result_for(&error);
    if error.is_pending() || result == TestResult::Pending {
        debug!(task = %title, error = %error, "task pending");
        if instrumented {
            ctx.sink().step_pending();
        }
        return Ok(Flow::Continue);
    }

    ctx.sink().step_failed(StepFailure::new(title, &error, result));

    let assumption_violated =
        error.is_assumption_violation() || error.root_cause().is_assumption_violation();
    if ctx.settings().throw_errors_immediately || assumption_violated {
        debug!(task = %title, %result, "returning task failure to caller");
        return Err(error);
    }
    warn!(task = %title, %result, error = %error, "task failed");
    Ok(Flow::Abort)
}

/// Merge a step recorded outside the engine into the previous one.
///
/// Only relevant once a step has failed. At most one merge per task.
fn reconcile_step_count(actor: &Actor, ctx: &mut ExecutionContext<'_>) {
    if !ctx.sink_ref().a_step_has_failed() || !ctx.is_out_of_step() {
        return;
    }
    let performed = actor.tally().performed_task_count();
    debug!(
        steps = ctx.sink_ref().running_step_count(),
        expected = ctx.expected_step_count(),
        performed,
        "merging out-of-step step into the previous one"
    );
    ctx.sink().merge_previous_step();

    if ctx.is_out_of_step() {
        warn!(
            steps = ctx.sink_ref().running_step_count(),
            expected = ctx.expected_step_count(),
            "recorded steps still exceed expected steps after merge"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PerformanceSettings;
    use crate::core::analysis::FailureAnalysis;
    use crate::performable::{Hidden, Silently, Task};
    use crate::test_support::RecordingSink;

    struct Unmarked;

    impl Performable for Unmarked {
        fn perform_as(
            &self,
            _actor: &mut Actor,
            _ctx: &mut ExecutionContext<'_>,
        ) -> Result<(), StepError> {
            Ok(())
        }
    }

    struct NeverReported;

    impl Performable for NeverReported {
        fn perform_as(
            &self,
            _actor: &mut Actor,
            _ctx: &mut ExecutionContext<'_>,
        ) -> Result<(), StepError> {
            Ok(())
        }

        fn is_instrumentable(&self) -> bool {
            false
        }
    }

    fn classify(settings: PerformanceSettings, task: &dyn Performable) -> Reporting {
        let mut sink = RecordingSink::default();
        let analysis = FailureAnalysis::default();
        let ctx = ExecutionContext::new(&mut sink, &analysis, settings);
        reporting_for(&ctx, task)
    }

    #[test]
    fn reporting_follows_visibility_and_instrumentation() {
        let auto = PerformanceSettings::default();
        let manual = PerformanceSettings {
            manual_task_instrumentation: true,
            ..PerformanceSettings::default()
        };
        assert_eq!(classify(auto, &Unmarked), Reporting::Instrumented);
        assert_eq!(classify(manual, &Unmarked), Reporting::Unreported);
        assert_eq!(classify(auto, &NeverReported), Reporting::Unreported);
        assert_eq!(
            classify(manual, &Task::that_performs("marked", || Ok(()))),
            Reporting::Instrumented
        );
        assert_eq!(classify(auto, &Silently::perform(Unmarked)), Reporting::Silent);
        assert_eq!(classify(auto, &Hidden::perform(Unmarked)), Reporting::Hidden);
    }

    #[test]
    fn silence_of_an_enclosing_task_wins() {
        let mut sink = RecordingSink::default();
        let analysis = FailureAnalysis::default();
        let mut ctx = ExecutionContext::new(&mut sink, &analysis, PerformanceSettings::default());
        let reporting = ctx.silenced(|ctx| reporting_for(ctx, &Hidden::perform(Unmarked)));
        assert_eq!(reporting, Reporting::NestedSilent);
    }

    #[test]
    fn step_title_substitutes_the_actor() {
        let mut actor = Actor::named("Dana");
        let log_in = Task::that_performs("{0} logs in", || Ok(()));
        assert_eq!(step_title(&actor, &log_in), "Dana logs in");
        actor.using_pronoun("she");
        assert_eq!(step_title(&actor, &Unmarked), "Unmarked");
        let log_out = Task::that_performs("{0} logs out", || Ok(()));
        assert_eq!(step_title(&actor, &log_out), "she logs out");
    }
}
