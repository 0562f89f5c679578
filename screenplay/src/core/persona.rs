//! Actor identity shared with the abilities and facts that refer back to it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
struct Persona {
    name: String,
    pronoun: Option<String>,
    description: Option<String>,
}

/// Back-reference to an actor's identity.
///
/// Handed to abilities at grant time and to fact listeners. It shares the
/// actor's name, pronoun and description (so renames are visible) but does not
/// own the actor, its abilities or its notepad.
#[derive(Clone)]
pub struct ActorRef {
    persona: Rc<RefCell<Persona>>,
}

impl ActorRef {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            persona: Rc::new(RefCell::new(Persona {
                name: name.into(),
                pronoun: None,
                description: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.persona.borrow().name.clone()
    }

    /// The preferred pronoun if one is set, otherwise the name.
    pub fn name_or_pronoun(&self) -> String {
        let persona = self.persona.borrow();
        persona
            .pronoun
            .clone()
            .unwrap_or_else(|| persona.name.clone())
    }

    pub fn description(&self) -> Option<String> {
        self.persona.borrow().description.clone()
    }

    /// True if both handles refer to the same actor.
    pub fn same_actor(&self, other: &ActorRef) -> bool {
        Rc::ptr_eq(&self.persona, &other.persona)
    }

    pub(crate) fn rename(&self, name: impl Into<String>) {
        self.persona.borrow_mut().name = name.into();
    }

    pub(crate) fn set_pronoun(&self, pronoun: Option<String>) {
        self.persona.borrow_mut().pronoun = pronoun;
    }

    pub(crate) fn set_description(&self, description: impl Into<String>) {
        self.persona.borrow_mut().description = Some(description.into());
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name_or_pronoun())
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let persona = self.persona.borrow();
        f.debug_struct("ActorRef")
            .field("name", &persona.name)
            .field("pronoun", &persona.pronoun)
            .finish()
    }
}
