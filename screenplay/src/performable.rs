//! Performables: the tasks and interactions an actor can be asked to do.

use std::any::type_name;

use crate::actor::Actor;
use crate::context::ExecutionContext;
use crate::core::failure::StepError;
use crate::core::title::humanize_type_name;

/// How a performable appears in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Reported as a step (unless instrumentation rules say otherwise).
    #[default]
    Reported,
    /// Performed without any step events, and so is everything it performs.
    Silent,
    /// Not reported itself; the tasks it performs are still reported.
    Hidden,
}

/// A unit of work an actor can perform.
pub trait Performable {
    fn perform_as(&self, actor: &mut Actor, ctx: &mut ExecutionContext<'_>)
    -> Result<(), StepError>;

    /// Title used when no explicit step marker is present. Defaults to the
    /// humanized type name.
    fn title(&self) -> String {
        humanize_type_name(type_name::<Self>())
    }

    /// Explicit step title. `{0}` is replaced by the actor.
    ///
    /// In manual instrumentation mode only performables with a step marker
    /// are reported.
    fn step_marker(&self) -> Option<&str> {
        None
    }

    fn visibility(&self) -> Visibility {
        Visibility::Reported
    }

    /// False for performables that can never be reported as steps.
    fn is_instrumentable(&self) -> bool {
        true
    }

    /// Pending performables are reported as pending; their body still runs.
    fn is_pending(&self) -> bool {
        false
    }
}

type PerformFn = dyn Fn(&mut Actor, &mut ExecutionContext<'_>) -> Result<(), StepError>;
type ActionFn = dyn Fn() -> Result<(), StepError>;

/// Constructors for ad-hoc tasks.
pub struct Task;

impl Task {
    /// A named composite of other performables.
    pub fn composed_of(
        title: impl Into<String>,
        steps: Vec<Box<dyn Performable>>,
    ) -> AnonymousTask {
        AnonymousTask {
            title: title.into(),
            steps,
            pending: false,
        }
    }

    /// A task backed by a function of the actor.
    pub fn from_fn<F>(title: impl Into<String>, perform: F) -> AnonymousFunction
    where
        F: Fn(&mut Actor, &mut ExecutionContext<'_>) -> Result<(), StepError> + 'static,
    {
        AnonymousFunction {
            title: title.into(),
            perform: Box::new(perform),
            pending: false,
        }
    }

    /// A task backed by a plain action that does not need the actor.
    pub fn that_performs<F>(title: impl Into<String>, action: F) -> AnonymousRunnable
    where
        F: Fn() -> Result<(), StepError> + 'static,
    {
        AnonymousRunnable {
            title: title.into(),
            action: Box::new(action),
            pending: false,
        }
    }
}

/// Constructors for ad-hoc interactions (leaf actions).
pub struct Interaction;

impl Interaction {
    pub fn from_fn<F>(title: impl Into<String>, perform: F) -> AnonymousFunction
    where
        F: Fn(&mut Actor, &mut ExecutionContext<'_>) -> Result<(), StepError> + 'static,
    {
        Task::from_fn(title, perform)
    }
}

pub struct AnonymousTask {
    title: String,
    steps: Vec<Box<dyn Performable>>,
    pending: bool,
}

impl AnonymousTask {
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub fn then(mut self, step: impl Performable + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }
}

impl Performable for AnonymousTask {
    fn perform_as(
        &self,
        actor: &mut Actor,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), StepError> {
        let steps: Vec<&dyn Performable> = self.steps.iter().map(|step| step.as_ref()).collect();
        actor.attempts_to(ctx, &steps)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn step_marker(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

pub struct AnonymousFunction {
    title: String,
    perform: Box<PerformFn>,
    pending: bool,
}

impl AnonymousFunction {
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }
}

impl Performable for AnonymousFunction {
    fn perform_as(
        &self,
        actor: &mut Actor,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), StepError> {
        (self.perform)(actor, ctx)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn step_marker(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

pub struct AnonymousRunnable {
    title: String,
    action: Box<ActionFn>,
    pending: bool,
}

impl AnonymousRunnable {
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }
}

impl Performable for AnonymousRunnable {
    fn perform_as(
        &self,
        _actor: &mut Actor,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), StepError> {
        (self.action)()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn step_marker(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Performs the wrapped task without reporting it or anything it performs.
pub struct Silently<P>(P);

impl<P: Performable> Silently<P> {
    pub fn perform(task: P) -> Self {
        Self(task)
    }
}

/// Performs the wrapped task without reporting it; nested tasks are still
/// reported.
pub struct Hidden<P>(P);

impl<P: Performable> Hidden<P> {
    pub fn perform(task: P) -> Self {
        Self(task)
    }
}

macro_rules! delegate_performable {
    ($wrapper:ident, $visibility:expr) => {
        impl<P: Performable> Performable for $wrapper<P> {
            fn perform_as(
                &self,
                actor: &mut Actor,
                ctx: &mut ExecutionContext<'_>,
            ) -> Result<(), StepError> {
                self.0.perform_as(actor, ctx)
            }

            fn title(&self) -> String {
                self.0.title()
            }

            fn step_marker(&self) -> Option<&str> {
                self.0.step_marker()
            }

            fn visibility(&self) -> Visibility {
                $visibility
            }

            fn is_instrumentable(&self) -> bool {
                self.0.is_instrumentable()
            }

            fn is_pending(&self) -> bool {
                self.0.is_pending()
            }
        }
    };
}

delegate_performable!(Silently, Visibility::Silent);
delegate_performable!(Hidden, Visibility::Hidden);

#[cfg(test)]
mod tests {
    use super::*;

    struct OpenTheApp;

    impl Performable for OpenTheApp {
        fn perform_as(
            &self,
            _actor: &mut Actor,
            _ctx: &mut ExecutionContext<'_>,
        ) -> Result<(), StepError> {
            Ok(())
        }
    }

    #[test]
    fn default_title_is_humanized_type_name() {
        assert_eq!(OpenTheApp.title(), "Open the app");
        assert_eq!(OpenTheApp.step_marker(), None);
        assert_eq!(OpenTheApp.visibility(), Visibility::Reported);
    }

    #[test]
    fn anonymous_tasks_carry_their_title_as_step_marker() {
        let task = Task::that_performs("{0} waits", || Ok(()));
        assert_eq!(task.step_marker(), Some("{0} waits"));
        assert!(!task.is_pending());
        assert!(task.pending().is_pending());
    }

    #[test]
    fn wrappers_change_visibility_only() {
        let silent = Silently::perform(Task::that_performs("quiet", || Ok(())).pending());
        assert_eq!(silent.visibility(), Visibility::Silent);
        assert_eq!(silent.title(), "quiet");
        assert!(silent.is_pending());

        let hidden = Hidden::perform(OpenTheApp);
        assert_eq!(hidden.visibility(), Visibility::Hidden);
        assert_eq!(hidden.title(), "Open the app");
    }

    #[test]
    fn composed_tasks_accumulate_steps() {
        let task = Task::composed_of("{0} sets up", Vec::new())
            .then(OpenTheApp)
            .then(Task::that_performs("log in", || Ok(())));
        assert_eq!(task.steps.len(), 2);
        assert_eq!(task.title(), "{0} sets up");
    }
}
