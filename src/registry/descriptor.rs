//! Capability descriptors, the single declaration site for a capability.
//!
//! A descriptor bundles everything both transport adapters need: identity
//! (kind + name), human-readable documentation, the declarative parameter
//! list, the derived structural schema, and the executable behavior. The
//! behavior is invoked only through the dispatcher, never by an adapter.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::{ExecutionError, ValidatedArgs};

use super::schema::{self, SchemaError};

// ---------------------------------------------------------------------------
// CapabilityKind
// ---------------------------------------------------------------------------

/// The three capability shapes, each with a fixed invocation contract.
///
/// - `Tool`: named arguments in, structured data out.
/// - `Resource`: no arguments, keyed by a URI-like name, representation out.
/// - `Prompt`: named arguments in, rendered text out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityKind::Tool => "tool",
            CapabilityKind::Resource => "resource",
            CapabilityKind::Prompt => "prompt",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Parameter declarations
// ---------------------------------------------------------------------------

/// Supported parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// A JSON array of strings.
    StringList,
}

impl ParamType {
    /// JSON-schema type keyword for this parameter type.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::StringList => "array",
        }
    }
}

/// Constraint predicates attached to a parameter declaration.
///
/// Length bounds apply to strings (character count) and string lists
/// (element count); `pattern` applies to strings only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.min_length.is_none() && self.max_length.is_none() && self.pattern.is_none()
    }
}

/// Declarative specification of one capability parameter.
///
/// Required/optional status is derived, never declared: a parameter is
/// required unless it carries a default or was explicitly marked
/// [`optional`](Self::optional). A required parameter therefore can never
/// have a default, by construction.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: Option<String>,
    pub constraints: Constraints,
    pub default: Option<Value>,
    pub(crate) optional: bool,
    /// Pattern compiled during schema derivation; an invalid pattern is a
    /// fatal registration error, not a per-call one.
    pub(crate) compiled_pattern: Option<Regex>,
}

impl ParameterSpec {
    fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            constraints: Constraints::default(),
            default: None,
            optional: false,
            compiled_pattern: None,
        }
    }

    /// Declare a string parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// Declare an integer parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    /// Declare a floating-point parameter.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    /// Declare a boolean parameter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// Declare a list-of-strings parameter.
    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::StringList)
    }

    /// Attach a human-readable description (documentation only).
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach length bounds (string characters or list elements).
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.constraints.min_length = Some(min);
        self.constraints.max_length = Some(max);
        self
    }

    /// Attach a minimum length only.
    pub fn min_length(mut self, min: usize) -> Self {
        self.constraints.min_length = Some(min);
        self
    }

    /// Attach a regex pattern constraint (strings only).
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Attach a default value; the parameter becomes optional.
    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the parameter optional without a default; absent values fall
    /// back to an implicit null.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether a caller must supply this parameter.
    pub fn required(&self) -> bool {
        self.default.is_none() && !self.optional
    }

    /// Value substituted for an absent optional parameter.
    pub fn effective_default(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// CapabilityHandler
// ---------------------------------------------------------------------------

/// Boxed future returned by a capability behavior.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ExecutionError>> + Send>>;

/// The uniform interface every capability behavior implements.
///
/// Handlers receive arguments that have already passed schema validation
/// and report failures through the dispatch-level [`ExecutionError`]
/// taxonomy; collaborator error types stop at the handler.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn invoke(&self, args: ValidatedArgs) -> Result<Value, ExecutionError>;
}

/// Adapter turning an async closure into a [`CapabilityHandler`].
pub struct FnHandler {
    f: Box<dyn Fn(ValidatedArgs) -> HandlerFuture + Send + Sync>,
}

impl FnHandler {
    pub fn new(
        f: impl Fn(ValidatedArgs) -> HandlerFuture + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self { f: Box::new(f) })
    }
}

#[async_trait]
impl CapabilityHandler for FnHandler {
    async fn invoke(&self, args: ValidatedArgs) -> Result<Value, ExecutionError> {
        (self.f)(args).await
    }
}

// ---------------------------------------------------------------------------
// CapabilityDescriptor
// ---------------------------------------------------------------------------

/// Immutable record describing one registered capability.
///
/// Constructed once at startup via [`CapabilityDescriptor::tool`],
/// [`resource`](CapabilityDescriptor::resource) or
/// [`prompt`](CapabilityDescriptor::prompt), then never mutated.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub kind: CapabilityKind,
    /// One-line summary shown in discovery listings.
    pub summary: String,
    /// Longer documentation; never affects validation.
    pub description: String,
    /// Derived parameter specifications, in declaration order.
    pub params: Vec<ParameterSpec>,
    /// Structural JSON schema derived from `params`, used for discovery.
    pub schema: Value,
    behavior: Arc<dyn CapabilityHandler>,
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("summary", &self.summary)
            .field("params", &self.params)
            .finish()
    }
}

impl CapabilityDescriptor {
    /// Start declaring a tool.
    pub fn tool(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(CapabilityKind::Tool, name)
    }

    /// Start declaring a resource; `name` is its URI.
    pub fn resource(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(CapabilityKind::Resource, name)
    }

    /// Start declaring a prompt template.
    pub fn prompt(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(CapabilityKind::Prompt, name)
    }

    /// The bound behavior. Invoked only by the dispatcher.
    pub(crate) fn behavior(&self) -> &Arc<dyn CapabilityHandler> {
        &self.behavior
    }
}

/// Builder for [`CapabilityDescriptor`].
///
/// `build()` runs schema derivation; a malformed declaration (invalid
/// pattern, constraint on an unsupported type, default violating its own
/// constraints) is reported here so registration fails at startup rather
/// than at first call.
pub struct DescriptorBuilder {
    name: String,
    kind: CapabilityKind,
    summary: String,
    description: String,
    params: Vec<ParameterSpec>,
    behavior: Option<Arc<dyn CapabilityHandler>>,
}

impl DescriptorBuilder {
    fn new(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            summary: String::new(),
            description: String::new(),
            params: Vec::new(),
            behavior: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn handler(mut self, behavior: Arc<dyn CapabilityHandler>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn build(self) -> Result<CapabilityDescriptor, SchemaError> {
        let behavior = self.behavior.ok_or_else(|| SchemaError::MissingBehavior {
            capability: self.name.clone(),
        })?;
        let (params, schema) = schema::derive(&self.name, self.params)?;
        Ok(CapabilityDescriptor {
            name: self.name,
            kind: self.kind,
            summary: self.summary,
            description: self.description,
            params,
            schema,
            behavior,
        })
    }
}
