//! Consequences: expectations checked against the answers to questions.

use std::any::type_name;
use std::fmt::Debug;

use crate::actor::Actor;
use crate::core::failure::{ErrorType, StepError, kinds};
use crate::core::title::humanize_type_name;
use crate::question::Question;

/// A predicate about the system under test, evaluated for an actor.
///
/// Returning an ignore or pending error records the check as ignored rather
/// than failed.
pub trait Consequence {
    fn evaluate_for(&self, actor: &mut Actor) -> Result<(), StepError>;

    /// Step title for the check. `{0}` is replaced by the actor.
    fn describe(&self) -> String {
        humanize_type_name(type_name::<Self>())
    }
}

/// Expect the answer to `question` to satisfy `predicate`.
///
/// `expectation` completes the sentence "`{actor}` should see that
/// `{subject}` ...", e.g. `"is 42"`.
pub fn see_that<Q, P>(
    question: Q,
    expectation: impl Into<String>,
    predicate: P,
) -> QuestionConsequence<Q, P>
where
    Q: Question,
    Q::Answer: Debug,
    P: Fn(&Q::Answer) -> bool,
{
    QuestionConsequence {
        question,
        expectation: expectation.into(),
        predicate,
        complaint: None,
        description: None,
    }
}

pub struct QuestionConsequence<Q, P> {
    question: Q,
    expectation: String,
    predicate: P,
    complaint: Option<ErrorType>,
    description: Option<String>,
}

impl<Q, P> QuestionConsequence<Q, P> {
    /// Raise `error_type` instead of an assertion failure when the
    /// expectation is not met.
    pub fn or_complain_with(mut self, error_type: ErrorType) -> Self {
        self.complaint = Some(error_type);
        self
    }

    pub fn described_as(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<Q, P> Consequence for QuestionConsequence<Q, P>
where
    Q: Question,
    Q::Answer: Debug,
    P: Fn(&Q::Answer) -> bool,
{
    fn evaluate_for(&self, actor: &mut Actor) -> Result<(), StepError> {
        let answer = self.question.answered_by(actor)?;
        if (self.predicate)(&answer) {
            return Ok(());
        }
        let message = format!(
            "Expected {} {} but was {:?}",
            self.question.subject(),
            self.expectation,
            answer
        );
        let error_type = self
            .complaint
            .clone()
            .unwrap_or_else(|| ErrorType::new(kinds::ASSERTION));
        Err(StepError::new(error_type, message))
    }

    fn describe(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!(
                "{{0}} should see that {} {}",
                self.question.subject(),
                self.expectation
            )
        })
    }
}

type CheckFn = dyn Fn(&mut Actor) -> Result<(), StepError>;

/// A consequence backed by a plain check function.
pub fn from_fn<F>(description: impl Into<String>, check: F) -> AnonymousConsequence
where
    F: Fn(&mut Actor) -> Result<(), StepError> + 'static,
{
    AnonymousConsequence {
        description: description.into(),
        check: Box::new(check),
    }
}

pub struct AnonymousConsequence {
    description: String,
    check: Box<CheckFn>,
}

impl Consequence for AnonymousConsequence {
    fn evaluate_for(&self, actor: &mut Actor) -> Result<(), StepError> {
        (self.check)(actor)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question;

    fn remembered_total() -> impl Question<Answer = u32> {
        question::about("the total", |actor: &Actor| {
            Ok(actor.recall::<u32>("total").copied().unwrap_or_default())
        })
    }

    #[test]
    fn met_expectation_passes() {
        let mut actor = Actor::named("Tim");
        actor.remember("total", 10_u32);
        let check = see_that(remembered_total(), "is 10", |total| *total == 10);
        assert!(check.evaluate_for(&mut actor).is_ok());
    }

    #[test]
    fn unmet_expectation_is_an_assertion_failure() {
        let mut actor = Actor::named("Tim");
        actor.remember("total", 9_u32);
        let err = see_that(remembered_total(), "is 10", |total| *total == 10)
            .evaluate_for(&mut actor)
            .expect_err("mismatch");
        assert!(err.is_a(kinds::ASSERTION));
        assert_eq!(err.message(), "Expected the total is 10 but was 9");
    }

    #[test]
    fn complaint_replaces_the_error_type() {
        let mut actor = Actor::named("Tim");
        let complaint =
            ErrorType::new("no-test-data").extending(kinds::CAUSES_COMPROMISED_TEST_FAILURE);
        let err = see_that(remembered_total(), "is positive", |total| *total > 0)
            .or_complain_with(complaint)
            .evaluate_for(&mut actor)
            .expect_err("complaint");
        assert_eq!(err.error_type().name(), "no-test-data");
    }

    #[test]
    fn description_mentions_actor_placeholder_and_subject() {
        let check = see_that(remembered_total(), "is 10", |total| *total == 10);
        assert_eq!(check.describe(), "{0} should see that the total is 10");
        let check = check.described_as("{0} checks the total");
        assert_eq!(check.describe(), "{0} checks the total");
    }

    #[test]
    fn question_errors_propagate_unchanged() {
        let mut actor = Actor::named("Tim");
        let broken = question::about("the page title", |_: &Actor| -> Result<String, StepError> {
            Err(StepError::error("browser closed"))
        });
        let err = see_that(broken, "is Home", |title| title == "Home")
            .evaluate_for(&mut actor)
            .expect_err("question failed");
        assert_eq!(err.message(), "browser closed");
    }
}
