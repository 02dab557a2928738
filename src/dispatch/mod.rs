//! Validation and dynamic dispatch.
//!
//! Every invocation, from either transport adapter, flows through the
//! same pipeline: registry lookup, schema-driven validation, behavior
//! execution, and normalization into the [`InvocationOutcome`] envelope.

pub mod dispatcher;
pub mod outcome;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use outcome::{ExecutionError, InvocationOutcome, InvocationRequest};
pub use validator::{validate, ValidatedArgs, ValidationFailure};
