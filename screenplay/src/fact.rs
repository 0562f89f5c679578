//! Facts: preconditions an actor sets up before a test and tears down after.

use std::any::type_name;

use crate::actor::Actor;
use crate::core::failure::StepError;
use crate::core::outcome::TestResult;
use crate::core::persona::ActorRef;
use crate::core::title::humanize_type_name;
use crate::sink::LifecycleListener;

pub trait Fact {
    fn setup(&self, actor: &mut Actor) -> Result<(), StepError>;

    /// Undo the setup. Called once when the test finishes.
    fn teardown(&self, actor: &ActorRef) {
        let _ = actor;
    }

    fn describe(&self) -> String {
        humanize_type_name(type_name::<Self>())
    }
}

/// Tears a fact down when the test it was installed for finishes.
pub(crate) struct FactLifecycleListener {
    fact: Box<dyn Fact>,
    actor: ActorRef,
    torn_down: bool,
}

impl FactLifecycleListener {
    pub(crate) fn new(fact: Box<dyn Fact>, actor: ActorRef) -> Self {
        Self {
            fact,
            actor,
            torn_down: false,
        }
    }
}

impl LifecycleListener for FactLifecycleListener {
    fn test_finished(&mut self, result: TestResult) {
        if self.torn_down {
            return;
        }
        tracing::debug!(
            actor = %self.actor,
            fact = %self.fact.describe(),
            %result,
            "tearing down fact"
        );
        self.fact.teardown(&self.actor);
        self.torn_down = true;
    }

    fn describe(&self) -> String {
        format!("{} for {}", self.fact.describe(), self.actor)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct AnAccountExists {
        teardowns: Rc<Cell<u32>>,
    }

    impl Fact for AnAccountExists {
        fn setup(&self, actor: &mut Actor) -> Result<(), StepError> {
            actor.remember("account", "acc-1".to_string());
            Ok(())
        }

        fn teardown(&self, _actor: &ActorRef) {
            self.teardowns.set(self.teardowns.get() + 1);
        }
    }

    #[test]
    fn listener_tears_down_once() {
        let teardowns = Rc::new(Cell::new(0));
        let actor = Actor::named("Fiona");
        let mut listener = FactLifecycleListener::new(
            Box::new(AnAccountExists {
                teardowns: teardowns.clone(),
            }),
            actor.actor_ref(),
        );
        listener.test_finished(TestResult::Success);
        listener.test_finished(TestResult::Failure);
        assert_eq!(teardowns.get(), 1);
        assert_eq!(listener.describe(), "An account exists for Fiona");
    }
}
