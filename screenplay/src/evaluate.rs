//! Consequence evaluation behind [`Actor::should`](crate::actor::Actor::should).
//!
//! Every consequence is checked, even after an earlier one failed. Failures
//! are reported one by one and then returned as a single error. Only an
//! ignore signal is not a failure; a pending check leaves the scenario
//! pending.

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::consequence::Consequence;
use crate::context::ExecutionContext;
use crate::core::failure::StepError;
use crate::core::outcome::TestResult;
use crate::core::tally::ErrorTally;
use crate::core::title::inject_actor;
use crate::sink::StepFailure;

pub(crate) fn should(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    consequences: &[&dyn Consequence],
) -> Result<(), StepError> {
    let name = actor.name();
    ctx.sink().consequence_checks_began(&name);
    ctx.sink().begin_performance(&name);

    let mut errors = ErrorTally::default();
    for consequence in consequences {
        check(actor, ctx, *consequence, &mut errors);
    }

    ctx.sink().end_performance(&name);
    ctx.sink().consequence_checks_ended(&name);
    ctx.sink().recompute_overall_result();

    if !errors.is_empty() {
        debug!(
            actor = %name,
            failed = errors.len(),
            checked = consequences.len(),
            "consequences failed"
        );
    }
    errors.report_any_errors(ctx.analysis())
}

fn check(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    consequence: &dyn Consequence,
    errors: &mut ErrorTally,
) {
    let title = inject_actor(&consequence.describe(), &actor.name_or_pronoun());
    ctx.start_step(&title);

    if ctx.sink_ref().should_ignore_consequences() {
        debug!(check = %title, "ignoring consequence");
        ctx.sink().step_ignored();
        ctx.finish_step();
        return;
    }

    match consequence.evaluate_for(actor) {
        Ok(()) => {}
        Err(error) if error.is_ignore() => {
            debug!(check = %title, "consequence ignored");
            ctx.sink().step_ignored();
        }
        Err(error) => {
            let result = ctx.analysis().result_for(&error);
            if result == TestResult::Pending {
                debug!(check = %title, error = %error, "consequence pending");
                ctx.sink().step_pending();
            } else {
                warn!(check = %title, %result, error = %error, "consequence failed");
                ctx.sink().step_failed(StepFailure::new(title.as_str(), &error, result));
            }
            errors.record_error(title.as_str(), error);
        }
    }
    ctx.finish_step();
}

/// Check `consequences` inside a reported group step.
///
/// The group step is closed whether or not the checks pass.
pub(crate) fn should_group(
    actor: &mut Actor,
    ctx: &mut ExecutionContext<'_>,
    group_title: &str,
    consequences: &[&dyn Consequence],
) -> Result<(), StepError> {
    let title = inject_actor(group_title, &actor.name_or_pronoun());
    ctx.start_step(&title);
    let outcome = should(actor, ctx, consequences);
    ctx.finish_step();
    ctx.sink().recompute_overall_result();
    outcome
}
