//! The dispatcher: lookup, validate, invoke, normalize.
//!
//! This is the single point where timing instrumentation wraps behavior
//! execution: start, completion, and duration are recorded for every call
//! regardless of outcome, without altering the outcome value. Validation
//! and lookup failures are fully handled here and never propagate past
//! the envelope; no retry is performed.

use std::sync::Arc;
use std::time::Instant;

use super::outcome::{InvocationOutcome, InvocationRequest};
use super::validator;
use crate::registry::Registry;

/// Dispatches invocation requests against an injected registry.
///
/// Stateless apart from the shared read-only registry; concurrent
/// dispatches never contend.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run one invocation to completion and normalize the result.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationOutcome {
        let started = Instant::now();
        let kind = request.kind;
        let name = request.name.clone();
        tracing::debug!(%kind, name = %name, "dispatch.start");

        let outcome = self.run(request).await;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            // Caller fault, not an operational signal.
            InvocationOutcome::ValidationFailure { field, reason } => {
                tracing::debug!(
                    %kind,
                    name = %name,
                    field = %field,
                    reason = %reason,
                    elapsed_ms,
                    "dispatch.complete"
                );
            }
            InvocationOutcome::ExecutionFailure { cause } => {
                tracing::warn!(
                    %kind,
                    name = %name,
                    cause = cause.cause_tag(),
                    elapsed_ms,
                    "dispatch.complete"
                );
            }
            other => {
                tracing::info!(
                    %kind,
                    name = %name,
                    outcome = other.tag(),
                    elapsed_ms,
                    "dispatch.complete"
                );
            }
        }
        outcome
    }

    async fn run(&self, request: InvocationRequest) -> InvocationOutcome {
        let descriptor = match self.registry.get(request.kind, &request.name) {
            Some(descriptor) => descriptor,
            None => {
                return InvocationOutcome::NotFound {
                    kind: request.kind,
                    name: request.name,
                }
            }
        };

        let args = match validator::validate(descriptor, &request.raw_args) {
            Ok(args) => args,
            Err(failure) => {
                return InvocationOutcome::ValidationFailure {
                    field: failure.field,
                    reason: failure.reason,
                }
            }
        };

        match descriptor.behavior().invoke(args).await {
            Ok(value) => InvocationOutcome::Success { value },
            Err(cause) => InvocationOutcome::ExecutionFailure { cause },
        }
    }
}
