//! Actor performance and consequence-evaluation engine.
//!
//! An [`Actor`](actor::Actor) is granted abilities, performs ordered tasks and
//! then checks consequences against the system under test. Raised errors are
//! classified into a severity taxonomy so the reporting layer records an
//! accurate result. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic state (errors, classification,
//!   abilities, notepad, tallies). No I/O.
//! - **[`io`]**: Side-effecting operations (configuration files, environment).
//!
//! The dispatcher ([`actor::Actor::attempts_to`]) and the evaluator
//! ([`actor::Actor::should`]) report through an [`EventSink`](sink::EventSink)
//! reached via an explicit [`ExecutionContext`](context::ExecutionContext).

pub mod actor;
pub mod consequence;
pub mod context;
pub mod core;
mod evaluate;
pub mod exit_codes;
pub mod fact;
pub mod io;
pub mod logging;
mod perform;
pub mod performable;
pub mod question;
pub mod sink;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::actor::Actor;
pub use crate::context::{ExecutionContext, PerformanceSettings};
pub use crate::core::failure::{ErrorType, StepError};
pub use crate::core::outcome::TestResult;
