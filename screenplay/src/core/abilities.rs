//! Capability registry: the abilities granted to one actor.
//!
//! Abilities are stored by concrete type. An ability may also declare, at
//! grant time, other capabilities it provides (typically trait objects such as
//! `dyn MakesHttpRequests`). Lookups go through explicit indexes built at grant
//! time, so they are O(1) and deterministic: when several granted abilities
//! provide the same capability, the most recently granted one wins.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::core::persona::ActorRef;
use crate::core::title::humanize_type_name;

/// A capability an actor can be granted.
pub trait Ability: Any {
    /// Declare capabilities this ability provides besides its own type.
    fn provides(capabilities: &mut Capabilities<Self>)
    where
        Self: Sized,
    {
        let _ = capabilities;
    }

    /// Bind the back-reference to the owning actor. Called once per grant,
    /// before the ability is stored.
    fn refers_to_actor(&mut self, actor: &ActorRef) {
        let _ = actor;
    }

    /// Release resources held by the ability. Called once when the actor
    /// wraps up.
    fn tear_down(&mut self) {}

    fn describe(&self) -> String {
        humanize_type_name(type_name::<Self>())
    }
}

trait Project<I: ?Sized> {
    fn project<'a>(&self, ability: &'a (dyn Any + 'static)) -> Option<&'a I>;
}

struct Projector<A, I: ?Sized> {
    project: fn(&A) -> &I,
}

impl<A: Any, I: ?Sized> Project<I> for Projector<A, I> {
    fn project<'a>(&self, ability: &'a (dyn Any + 'static)) -> Option<&'a I> {
        ability.downcast_ref::<A>().map(self.project)
    }
}

/// Capabilities declared by an ability of type `A` at grant time.
pub struct Capabilities<A> {
    projections: Vec<(TypeId, &'static str, Box<dyn Any>)>,
    _ability: PhantomData<fn(&A)>,
}

impl<A: Ability> Capabilities<A> {
    fn new() -> Self {
        let mut capabilities = Self {
            projections: Vec::new(),
            _ability: PhantomData,
        };
        capabilities.provides::<A>(|ability| ability);
        capabilities
    }

    /// Declare that the ability can be used as `I`.
    ///
    /// ```ignore
    /// fn provides(capabilities: &mut Capabilities<Self>) {
    ///     capabilities.provides::<dyn SendsEmail>(|ability| ability);
    /// }
    /// ```
    pub fn provides<I: ?Sized + 'static>(&mut self, project: fn(&A) -> &I) -> &mut Self {
        let projector: Box<dyn Project<I>> = Box::new(Projector { project });
        self.projections
            .retain(|(type_id, _, _)| *type_id != TypeId::of::<I>());
        self.projections
            .push((TypeId::of::<I>(), type_name::<I>(), Box::new(projector)));
        self
    }
}

struct Slot {
    name: String,
    value: Box<dyn Any>,
    tear_down: fn(&mut (dyn Any + 'static)),
    torn_down: bool,
    projections: HashMap<TypeId, Box<dyn Any>>,
}

impl Slot {
    fn project<I: ?Sized + 'static>(&self) -> Option<&I> {
        let projector = self
            .projections
            .get(&TypeId::of::<I>())?
            .downcast_ref::<Box<dyn Project<I>>>()?;
        projector.project(&*self.value)
    }
}

fn tear_down_as<A: Ability>(value: &mut (dyn Any + 'static)) {
    if let Some(ability) = value.downcast_mut::<A>() {
        ability.tear_down();
    }
}

/// The abilities granted to one actor.
#[derive(Default)]
pub struct AbilityRegistry {
    slots: Vec<Slot>,
    by_type: HashMap<TypeId, usize>,
    by_capability: HashMap<TypeId, usize>,
}

impl AbilityRegistry {
    /// Store `ability`, replacing an earlier ability of the same type.
    ///
    /// Returns the ability's description.
    pub fn grant<A: Ability>(&mut self, mut ability: A, actor: &ActorRef) -> String {
        ability.refers_to_actor(actor);

        let mut capabilities = Capabilities::<A>::new();
        A::provides(&mut capabilities);

        let name = ability.describe();
        let mut slot = Slot {
            name: name.clone(),
            value: Box::new(ability),
            tear_down: tear_down_as::<A>,
            torn_down: false,
            projections: HashMap::new(),
        };
        let provided: Vec<(TypeId, &'static str)> = capabilities
            .projections
            .iter()
            .map(|(type_id, type_name, _)| (*type_id, *type_name))
            .collect();
        for (type_id, _, projector) in capabilities.projections {
            slot.projections.insert(type_id, projector);
        }

        let index = match self.by_type.get(&TypeId::of::<A>()) {
            Some(&index) => {
                tracing::debug!(ability = %name, "replacing previously granted ability");
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                let index = self.slots.len() - 1;
                self.by_type.insert(TypeId::of::<A>(), index);
                index
            }
        };
        for (type_id, capability) in provided {
            if type_id == TypeId::of::<A>() {
                continue;
            }
            tracing::trace!(ability = %name, capability, "indexing capability");
            self.by_capability.insert(type_id, index);
        }
        name
    }

    /// The ability of exactly type `A`.
    pub fn get<A: Ability>(&self) -> Option<&A> {
        let index = *self.by_type.get(&TypeId::of::<A>())?;
        self.slots[index].value.downcast_ref::<A>()
    }

    pub fn get_mut<A: Ability>(&mut self) -> Option<&mut A> {
        let index = *self.by_type.get(&TypeId::of::<A>())?;
        self.slots[index].value.downcast_mut::<A>()
    }

    /// The ability that is, or declared that it provides, `I`.
    ///
    /// An exact type match wins; otherwise the most recently granted ability
    /// declaring `I` is returned.
    pub fn providing<I: ?Sized + 'static>(&self) -> Option<&I> {
        let id = TypeId::of::<I>();
        let index = self
            .by_type
            .get(&id)
            .or_else(|| self.by_capability.get(&id))?;
        self.slots[*index].project::<I>()
    }

    pub fn contains<A: Ability>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<A>())
    }

    /// Descriptions of the granted abilities, in grant order.
    pub fn descriptions(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tear down every ability that has not been torn down yet.
    ///
    /// Returns the number of abilities torn down by this call.
    pub fn tear_down_all(&mut self) -> usize {
        let mut count = 0;
        for slot in &mut self.slots {
            if slot.torn_down {
                continue;
            }
            tracing::debug!(ability = %slot.name, "tearing down ability");
            (slot.tear_down)(&mut *slot.value);
            slot.torn_down = true;
            count += 1;
        }
        count
    }
}

impl std::fmt::Debug for AbilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptions()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    trait Greets {
        fn greeting(&self) -> String;
    }

    struct GreetInFrench;

    impl Greets for GreetInFrench {
        fn greeting(&self) -> String {
            "Bonjour".to_string()
        }
    }

    impl Ability for GreetInFrench {
        fn provides(capabilities: &mut Capabilities<Self>) {
            capabilities.provides::<dyn Greets>(|ability| ability);
        }
    }

    struct GreetInEnglish;

    impl Greets for GreetInEnglish {
        fn greeting(&self) -> String {
            "Hello".to_string()
        }
    }

    impl Ability for GreetInEnglish {
        fn provides(capabilities: &mut Capabilities<Self>) {
            capabilities.provides::<dyn Greets>(|ability| ability);
        }
    }

    struct CountTeardowns {
        label: &'static str,
        teardowns: Rc<Cell<u32>>,
        bound_to: Option<ActorRef>,
    }

    impl CountTeardowns {
        fn new(label: &'static str, teardowns: Rc<Cell<u32>>) -> Self {
            Self {
                label,
                teardowns,
                bound_to: None,
            }
        }
    }

    impl Ability for CountTeardowns {
        fn refers_to_actor(&mut self, actor: &ActorRef) {
            self.bound_to = Some(actor.clone());
        }

        fn tear_down(&mut self) {
            self.teardowns.set(self.teardowns.get() + 1);
        }
    }

    #[test]
    fn get_returns_exact_type() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(GreetInFrench, &actor);
        assert!(registry.get::<GreetInFrench>().is_some());
        assert!(registry.get::<GreetInEnglish>().is_none());
    }

    #[test]
    fn granting_same_type_twice_replaces_the_first() {
        let actor = ActorRef::new("Toby");
        let counter = Rc::new(Cell::new(0));
        let mut registry = AbilityRegistry::default();
        registry.grant(CountTeardowns::new("first", counter.clone()), &actor);
        registry.grant(CountTeardowns::new("second", counter.clone()), &actor);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get::<CountTeardowns>().map(|a| a.label),
            Some("second")
        );
    }

    #[test]
    fn providing_finds_declared_capability() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(GreetInFrench, &actor);
        let greeter = registry.providing::<dyn Greets>().expect("greeter");
        assert_eq!(greeter.greeting(), "Bonjour");
    }

    #[test]
    fn providing_prefers_most_recently_granted() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(GreetInFrench, &actor);
        registry.grant(GreetInEnglish, &actor);
        assert_eq!(
            registry.providing::<dyn Greets>().map(|g| g.greeting()),
            Some("Hello".to_string())
        );

        registry.grant(GreetInFrench, &actor);
        assert_eq!(
            registry.providing::<dyn Greets>().map(|g| g.greeting()),
            Some("Bonjour".to_string())
        );
    }

    #[test]
    fn providing_concrete_type_is_an_exact_match() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(GreetInEnglish, &actor);
        assert!(registry.providing::<GreetInEnglish>().is_some());
        assert!(registry.providing::<GreetInFrench>().is_none());
    }

    #[test]
    fn missing_capability_is_none() {
        let registry = AbilityRegistry::default();
        assert!(registry.providing::<dyn Greets>().is_none());
    }

    #[test]
    fn grant_binds_back_reference_to_actor() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(CountTeardowns::new("bound", Rc::new(Cell::new(0))), &actor);
        let bound = registry
            .get::<CountTeardowns>()
            .and_then(|a| a.bound_to.clone())
            .expect("bound");
        assert!(bound.same_actor(&actor));
    }

    #[test]
    fn tear_down_all_runs_once_per_ability() {
        let actor = ActorRef::new("Toby");
        let counter = Rc::new(Cell::new(0));
        let mut registry = AbilityRegistry::default();
        registry.grant(CountTeardowns::new("x", counter.clone()), &actor);
        registry.grant(GreetInFrench, &actor);
        assert_eq!(registry.tear_down_all(), 2);
        assert_eq!(registry.tear_down_all(), 0);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn descriptions_are_humanized_type_names() {
        let actor = ActorRef::new("Toby");
        let mut registry = AbilityRegistry::default();
        registry.grant(GreetInFrench, &actor);
        assert_eq!(registry.descriptions(), vec!["Greet in french"]);
    }
}
