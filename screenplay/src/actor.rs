//! The actor: a named persona that holds abilities, remembers things,
//! performs tasks and checks consequences.

use std::any::{Any, type_name};
use std::fmt;

use crate::consequence::Consequence;
use crate::context::ExecutionContext;
use crate::core::abilities::{Ability, AbilityRegistry};
use crate::core::failure::StepError;
use crate::core::notepad::Notepad;
use crate::core::persona::ActorRef;
use crate::core::tally::TaskTally;
use crate::core::title::humanize_type_name;
use crate::evaluate;
use crate::fact::{Fact, FactLifecycleListener};
use crate::perform;
use crate::performable::Performable;
use crate::question::Question;
use crate::sink::ListenerId;

/// One simulated user of the system under test.
///
/// An actor lives for a single test and is confined to the thread that
/// created it.
pub struct Actor {
    persona: ActorRef,
    abilities: AbilityRegistry,
    notepad: Notepad,
    tally: TaskTally,
    fact_listeners: Vec<ListenerId>,
    /// Abilities granted since the actor last had a context to report them.
    unannounced_abilities: Vec<String>,
}

impl Actor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            persona: ActorRef::new(name),
            abilities: AbilityRegistry::default(),
            notepad: Notepad::default(),
            tally: TaskTally::default(),
            fact_listeners: Vec::new(),
            unannounced_abilities: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        self.persona.name()
    }

    /// The pronoun if one is set, otherwise the name. Used in step titles.
    pub fn name_or_pronoun(&self) -> String {
        self.persona.name_or_pronoun()
    }

    pub fn description(&self) -> Option<String> {
        self.persona.description()
    }

    /// A back-reference to this actor's persona.
    pub fn actor_ref(&self) -> ActorRef {
        self.persona.clone()
    }

    pub fn assign_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.persona.rename(name);
        self
    }

    pub fn describe_as(&mut self, description: impl Into<String>) -> &mut Self {
        self.persona.set_description(description);
        self
    }

    pub fn using_pronoun(&mut self, pronoun: impl Into<String>) -> &mut Self {
        self.persona.set_pronoun(Some(pronoun.into()));
        self
    }

    pub fn with_no_pronoun(&mut self) -> &mut Self {
        self.persona.set_pronoun(None);
        self
    }

    /// Grant an ability. An ability of the same type granted earlier is
    /// replaced.
    ///
    /// The sink hears about the grant the next time this actor is used with
    /// an [`ExecutionContext`].
    pub fn can<A: Ability>(&mut self, ability: A) -> &mut Self {
        let granted = self.abilities.grant(ability, &self.persona);
        tracing::debug!(actor = %self.persona, ability = %granted, "granted ability");
        self.unannounced_abilities.push(granted);
        self
    }

    /// Grant an ability and report it to the sink straight away.
    pub fn can_in<A: Ability>(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        ability: A,
    ) -> &mut Self {
        self.can(ability);
        self.announce_abilities(ctx);
        self
    }

    fn announce_abilities(&mut self, ctx: &mut ExecutionContext<'_>) {
        if self.unannounced_abilities.is_empty() {
            return;
        }
        let name = self.name();
        for ability in self.unannounced_abilities.drain(..) {
            ctx.sink().ability_assigned(&name, &ability);
        }
    }

    /// Builder form of [`Actor::can`].
    pub fn who_can<A: Ability>(mut self, ability: A) -> Self {
        self.can(ability);
        self
    }

    pub fn ability_to<A: Ability>(&self) -> Option<&A> {
        self.abilities.get::<A>()
    }

    pub fn ability_to_mut<A: Ability>(&mut self) -> Option<&mut A> {
        self.abilities.get_mut::<A>()
    }

    /// Like [`Actor::ability_to`], but a missing ability is an error.
    pub fn using_ability_to<A: Ability>(&self) -> Result<&A, StepError> {
        self.abilities.get::<A>().ok_or_else(|| self.missing_ability::<A>())
    }

    /// The ability that provides capability `I`, by exact type or by a
    /// capability declared at grant time.
    pub fn ability_providing<I: ?Sized + 'static>(&self) -> Option<&I> {
        self.abilities.providing::<I>()
    }

    pub fn abilities(&self) -> &AbilityRegistry {
        &self.abilities
    }

    fn missing_ability<A: Ability>(&self) -> StepError {
        StepError::error(format!(
            "{} does not have the ability to {}",
            self.name(),
            humanize_type_name(type_name::<A>()).to_lowercase()
        ))
    }

    /// Perform `tasks` in order.
    ///
    /// A task failure is reported to the sink and stops the remaining tasks.
    /// It is returned to the caller only in immediate-throw mode or when it is
    /// an assumption violation.
    pub fn attempts_to(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        tasks: &[&dyn Performable],
    ) -> Result<(), StepError> {
        self.announce_abilities(ctx);
        perform::attempts_to(self, ctx, tasks)
    }

    /// Same as [`Actor::attempts_to`]; reads better for setup steps.
    pub fn was_able_to(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        tasks: &[&dyn Performable],
    ) -> Result<(), StepError> {
        self.attempts_to(ctx, tasks)
    }

    /// Number of top-level tasks performed so far.
    pub fn performed_task_count(&self) -> usize {
        self.tally.performed_task_count()
    }

    pub(crate) fn tally(&self) -> &TaskTally {
        &self.tally
    }

    pub(crate) fn tally_mut(&mut self) -> &mut TaskTally {
        &mut self.tally
    }

    /// Answer `question` inside its own performance.
    pub fn asks_for<Q: Question>(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        question: &Q,
    ) -> Result<Q::Answer, StepError> {
        self.announce_abilities(ctx);
        let name = self.name();
        ctx.sink().begin_performance(&name);
        let answer = question.answered_by(self);
        ctx.sink().end_performance(&name);
        answer
    }

    /// Check every consequence, then fail with one error if any failed.
    pub fn should(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        consequences: &[&dyn Consequence],
    ) -> Result<(), StepError> {
        self.announce_abilities(ctx);
        evaluate::should(self, ctx, consequences)
    }

    pub fn should_see_that(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        consequence: &dyn Consequence,
    ) -> Result<(), StepError> {
        self.should(ctx, &[consequence])
    }

    /// Check consequences under one reported step titled `group_title`.
    pub fn should_group(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        group_title: &str,
        consequences: &[&dyn Consequence],
    ) -> Result<(), StepError> {
        self.announce_abilities(ctx);
        evaluate::should_group(self, ctx, group_title, consequences)
    }

    /// Set up `facts` and arrange for each to be torn down when the test
    /// finishes.
    pub fn has(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        facts: Vec<Box<dyn Fact>>,
    ) -> Result<(), StepError> {
        self.announce_abilities(ctx);
        for fact in facts {
            let description = fact.describe();
            fact.setup(self)?;
            ctx.sink().fact_assigned(&self.name(), &description);
            let listener = FactLifecycleListener::new(fact, self.actor_ref());
            let id = ctx.sink().register_listener(Box::new(listener));
            tracing::debug!(
                actor = %self.persona,
                fact = %description,
                listener = id.0,
                "installed fact"
            );
            self.fact_listeners.push(id);
        }
        Ok(())
    }

    pub fn notepad(&self) -> &Notepad {
        &self.notepad
    }

    pub fn remember<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.notepad.remember(key, value);
    }

    /// Ask `question` and remember the answer under `key`, all inside one
    /// performance.
    pub fn remember_answer<Q>(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        key: impl Into<String>,
        question: &Q,
    ) -> Result<(), StepError>
    where
        Q: Question,
        Q::Answer: Any,
    {
        let name = self.name();
        ctx.sink().begin_performance(&name);
        let answer = self.asks_for(ctx, question);
        ctx.sink().end_performance(&name);
        self.notepad.remember(key, answer?);
        Ok(())
    }

    pub fn recall<T: Any>(&self, key: &str) -> Option<&T> {
        self.notepad.recall(key)
    }

    /// Like [`Actor::recall`], but a missing note is an error.
    pub fn sees<T: Any>(&self, key: &str) -> Result<&T, StepError> {
        self.notepad
            .recall(key)
            .ok_or_else(|| StepError::error(format!("{} does not remember {key}", self.name())))
    }

    pub fn forget<T: Any>(&mut self, key: &str) -> Option<T> {
        self.notepad.forget(key)
    }

    /// Tear down every ability and drop the fact listeners this actor
    /// installed. Safe to call more than once.
    pub fn wrap_up(&mut self, ctx: &mut ExecutionContext<'_>) {
        self.announce_abilities(ctx);
        let torn_down = self.abilities.tear_down_all();
        let listeners = self.fact_listeners.len();
        for id in self.fact_listeners.drain(..) {
            ctx.sink().drop_listener(id);
        }
        tracing::debug!(
            actor = %self.persona,
            abilities = torn_down,
            listeners,
            "wrapped up"
        );
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.persona, f)
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("persona", &self.persona)
            .field("abilities", &self.abilities)
            .field("notepad", &self.notepad)
            .field("performed_tasks", &self.tally.performed_task_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PerformanceSettings;
    use crate::core::analysis::FailureAnalysis;
    use crate::question;
    use crate::test_support::{Event, RecordingSink};

    #[derive(Debug)]
    struct BrowseTheWeb;

    impl Ability for BrowseTheWeb {}

    #[test]
    fn pronoun_replaces_name_in_display() {
        let mut actor = Actor::named("Paula");
        assert_eq!(actor.to_string(), "Paula");
        actor.using_pronoun("she");
        assert_eq!(actor.to_string(), "she");
        assert_eq!(actor.name(), "Paula");
        actor.with_no_pronoun();
        assert_eq!(actor.name_or_pronoun(), "Paula");
    }

    #[test]
    fn renaming_is_visible_through_the_back_reference() {
        let mut actor = Actor::named("Paula");
        let handle = actor.actor_ref();
        actor.assign_name("Pat").describe_as("a returning customer");
        assert_eq!(handle.name(), "Pat");
        assert_eq!(actor.description().as_deref(), Some("a returning customer"));
    }

    #[test]
    fn missing_ability_is_an_error_only_when_required() {
        let actor = Actor::named("Paula");
        assert!(actor.ability_to::<BrowseTheWeb>().is_none());
        let err = actor.using_ability_to::<BrowseTheWeb>().expect_err("missing");
        assert!(err.message().starts_with("Paula does not have the ability to"));

        let actor = Actor::named("Paula").who_can(BrowseTheWeb);
        assert!(actor.using_ability_to::<BrowseTheWeb>().is_ok());
    }

    #[test]
    fn remember_answer_stores_the_answer() {
        let analysis = FailureAnalysis::default();
        let mut sink = RecordingSink::default();
        let mut ctx = ExecutionContext::new(&mut sink, &analysis, PerformanceSettings::default());
        let mut actor = Actor::named("Paula");
        let greeting = question::about("the greeting", |_: &Actor| Ok("hi".to_string()));
        actor
            .remember_answer(&mut ctx, "greeting", &greeting)
            .expect("remember");
        assert_eq!(actor.recall::<String>("greeting").map(String::as_str), Some("hi"));
        assert_eq!(actor.sees::<String>("greeting").ok().map(String::as_str), Some("hi"));
        assert!(actor.sees::<String>("farewell").is_err());
        assert_eq!(actor.forget::<String>("greeting").as_deref(), Some("hi"));
        assert!(actor.notepad().is_empty());
    }

    #[test]
    fn remember_answer_nests_the_question_performance() {
        let analysis = FailureAnalysis::default();
        let mut sink = RecordingSink::default();
        let mut actor = Actor::named("Paula");
        {
            let mut ctx =
                ExecutionContext::new(&mut sink, &analysis, PerformanceSettings::default());
            let total = question::about("the total", |_: &Actor| Ok(12_u32));
            assert_eq!(actor.asks_for(&mut ctx, &total).ok(), Some(12));
            actor
                .remember_answer(&mut ctx, "total", &total)
                .expect("remember");
        }
        let begin = Event::BeginPerformance {
            actor: "Paula".to_string(),
        };
        let end = Event::EndPerformance {
            actor: "Paula".to_string(),
        };
        assert_eq!(
            sink.events(),
            [
                begin.clone(),
                end.clone(),
                begin.clone(),
                begin,
                end.clone(),
                end
            ]
        );
        assert_eq!(actor.recall::<u32>("total"), Some(&12));
    }

    #[test]
    fn granted_abilities_are_announced_once() {
        let analysis = FailureAnalysis::default();
        let mut sink = RecordingSink::default();
        let mut actor = Actor::named("Paula").who_can(BrowseTheWeb);
        {
            let mut ctx =
                ExecutionContext::new(&mut sink, &analysis, PerformanceSettings::default());
            actor.attempts_to(&mut ctx, &[]).expect("nothing to do");
            actor.attempts_to(&mut ctx, &[]).expect("nothing to do");
        }
        let announced: Vec<&Event> = sink
            .events()
            .iter()
            .filter(|event| matches!(event, Event::AbilityAssigned { .. }))
            .collect();
        assert_eq!(
            announced,
            [&Event::AbilityAssigned {
                actor: "Paula".to_string(),
                ability: "Browse the web".to_string(),
            }]
        );
        assert_eq!(
            sink.events()[0],
            Event::AbilityAssigned {
                actor: "Paula".to_string(),
                ability: "Browse the web".to_string(),
            }
        );
    }
}
