//! The normalized outcome envelope shared by all transports.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::CapabilityKind;

/// Failure raised by a capability behavior, tagged by upstream cause.
///
/// This is the only error shape that crosses the dispatcher boundary;
/// collaborator error types are re-tagged into it inside the behaviors
/// so adapters can map causes to transport-specific codes without ever
/// seeing raw provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The upstream data source has no record of the requested entity.
    #[error("{what} not found")]
    NotFoundUpstream { what: String },

    /// The upstream data source rejected the call for rate limiting.
    #[error("upstream rate limit exceeded")]
    RateLimited,

    /// The upstream data source could not be reached.
    #[error("{service} service is unavailable")]
    Unavailable { service: String },

    /// Anything else the behavior could not classify.
    #[error("{0}")]
    Unknown(String),
}

impl ExecutionError {
    /// Stable machine-readable cause tag.
    pub fn cause_tag(&self) -> &'static str {
        match self {
            ExecutionError::NotFoundUpstream { .. } => "not_found_upstream",
            ExecutionError::RateLimited => "rate_limited",
            ExecutionError::Unavailable { .. } => "unavailable",
            ExecutionError::Unknown(_) => "unknown",
        }
    }
}

/// A single invocation, created per call and discarded once the outcome
/// is produced.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub kind: CapabilityKind,
    pub name: String,
    pub raw_args: Map<String, Value>,
}

impl InvocationRequest {
    pub fn new(kind: CapabilityKind, name: impl Into<String>, raw_args: Map<String, Value>) -> Self {
        Self {
            kind,
            name: name.into(),
            raw_args,
        }
    }
}

/// Tagged result of one dispatch, rendered by each adapter in its own
/// format (in-process value vs. HTTP status + JSON body).
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The behavior ran and produced a value.
    Success { value: Value },
    /// The caller's input failed schema validation; execution never began.
    ValidationFailure { field: String, reason: String },
    /// No capability registered under (kind, name).
    NotFound { kind: CapabilityKind, name: String },
    /// The behavior ran but failed, tagged by upstream cause.
    ExecutionFailure { cause: ExecutionError },
}

impl InvocationOutcome {
    /// Short tag used in dispatch logs.
    pub fn tag(&self) -> &'static str {
        match self {
            InvocationOutcome::Success { .. } => "success",
            InvocationOutcome::ValidationFailure { .. } => "validation_failure",
            InvocationOutcome::NotFound { .. } => "not_found",
            InvocationOutcome::ExecutionFailure { .. } => "execution_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_tags_are_distinct() {
        let causes = [
            ExecutionError::NotFoundUpstream {
                what: "symbol 'NOPE'".into(),
            },
            ExecutionError::RateLimited,
            ExecutionError::Unavailable {
                service: "finnhub".into(),
            },
            ExecutionError::Unknown("boom".into()),
        ];
        let tags: std::collections::HashSet<&str> =
            causes.iter().map(|c| c.cause_tag()).collect();
        assert_eq!(tags.len(), causes.len());
    }

    #[test]
    fn test_outcome_tags() {
        let outcome = InvocationOutcome::NotFound {
            kind: CapabilityKind::Tool,
            name: "x".into(),
        };
        assert_eq!(outcome.tag(), "not_found");
    }
}
