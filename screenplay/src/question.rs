//! Questions: pure reads of system state made through an actor.

use std::any::type_name;
use std::marker::PhantomData;

use crate::actor::Actor;
use crate::core::failure::StepError;
use crate::core::title::humanize_type_name;

pub trait Question {
    type Answer;

    fn answered_by(&self, actor: &Actor) -> Result<Self::Answer, StepError>;

    /// What the question is about, used in consequence descriptions.
    fn subject(&self) -> String {
        humanize_type_name(type_name::<Self>())
    }
}

/// A question built from a subject and a function of the actor.
pub fn about<T, F>(subject: impl Into<String>, answer: F) -> AnonymousQuestion<T, F>
where
    F: Fn(&Actor) -> Result<T, StepError>,
{
    AnonymousQuestion {
        subject: subject.into(),
        answer,
        _answer: PhantomData,
    }
}

pub struct AnonymousQuestion<T, F> {
    subject: String,
    answer: F,
    _answer: PhantomData<fn() -> T>,
}

impl<T, F> Question for AnonymousQuestion<T, F>
where
    F: Fn(&Actor) -> Result<T, StepError>,
{
    type Answer = T;

    fn answered_by(&self, actor: &Actor) -> Result<T, StepError> {
        (self.answer)(actor)
    }

    fn subject(&self) -> String {
        self.subject.clone()
    }
}
