//! Native in-process invocation surface.
//!
//! [`McpService`] is the first of the two transport adapters: it maps the
//! shared [`InvocationOutcome`] envelope to in-process return values and
//! typed errors. It holds no capability metadata of its own; discovery
//! and invocation are satisfied entirely by the injected registry and
//! dispatcher.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dispatch::{Dispatcher, ExecutionError, InvocationOutcome, InvocationRequest};
use crate::market::models::ProviderHealth;
use crate::market::provider::MarketDataProvider;
use crate::registry::{CapabilityDescriptor, CapabilityKind, Registry};

/// Typed error surface of the native adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The supplied arguments failed schema validation.
    #[error("invalid argument '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// No capability registered under this kind and name.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: CapabilityKind, name: String },

    /// The capability ran but its collaborator or internal logic failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Discovery entry for one capability: name, documentation, and the
/// derived parameter schema, built from live registry content.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl CapabilityInfo {
    fn from_descriptor(descriptor: &CapabilityDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.summary.clone(),
            parameters: descriptor.schema.clone(),
        }
    }
}

/// The native capability service shared by in-process callers and the
/// HTTP façade.
pub struct McpService {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    provider: Arc<dyn MarketDataProvider>,
}

impl McpService {
    pub fn new(registry: Arc<Registry>, provider: Arc<dyn MarketDataProvider>) -> Self {
        let dispatcher = Dispatcher::new(registry.clone());
        Self {
            registry,
            dispatcher,
            provider,
        }
    }

    // -- Discovery --------------------------------------------------------

    pub fn list_tools(&self) -> Vec<CapabilityInfo> {
        self.list(CapabilityKind::Tool)
    }

    pub fn list_resources(&self) -> Vec<CapabilityInfo> {
        self.list(CapabilityKind::Resource)
    }

    pub fn list_prompts(&self) -> Vec<CapabilityInfo> {
        self.list(CapabilityKind::Prompt)
    }

    fn list(&self, kind: CapabilityKind) -> Vec<CapabilityInfo> {
        self.registry
            .list(kind)
            .into_iter()
            .map(CapabilityInfo::from_descriptor)
            .collect()
    }

    // -- Invocation -------------------------------------------------------

    /// Call a tool with named arguments.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, CallError> {
        self.invoke(CapabilityKind::Tool, name, arguments).await
    }

    /// Read a resource by its URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Value, CallError> {
        self.invoke(CapabilityKind::Resource, uri, Map::new()).await
    }

    /// Render a prompt template with named arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, CallError> {
        let value = self.invoke(CapabilityKind::Prompt, name, arguments).await?;
        match value {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    async fn invoke(
        &self,
        kind: CapabilityKind,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, CallError> {
        let outcome = self
            .dispatcher
            .dispatch(InvocationRequest::new(kind, name, arguments))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => Ok(value),
            InvocationOutcome::ValidationFailure { field, reason } => {
                Err(CallError::Validation { field, reason })
            }
            InvocationOutcome::NotFound { kind, name } => Err(CallError::NotFound { kind, name }),
            InvocationOutcome::ExecutionFailure { cause } => Err(CallError::Execution(cause)),
        }
    }

    /// Dispatch a raw invocation request, returning the outcome envelope.
    /// Used by adapters that render the envelope themselves.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationOutcome {
        self.dispatcher.dispatch(request).await
    }

    /// Probe the market-data collaborator. Independent of the registry.
    pub async fn provider_health(&self) -> ProviderHealth {
        self.provider.ping().await
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
