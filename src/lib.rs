//! # market-mcp
//!
//! Market-data capability server: a registry of typed, named capabilities
//! (tools, resources, prompts) dispatched through two transport surfaces,
//! a native in-process interface and an HTTP/REST façade, from a single
//! set of capability declarations.
//!
//! The core pipeline is: registry lookup → schema-driven validation →
//! dispatch of the bound behavior → a uniform [`dispatch::InvocationOutcome`]
//! envelope that each adapter renders in its own format.

pub mod config;
pub mod dispatch;
pub mod market;
pub mod native;
pub mod registry;
pub mod server;

pub use config::Settings;
pub use dispatch::{Dispatcher, InvocationOutcome, InvocationRequest};
pub use native::McpService;
pub use registry::{CapabilityDescriptor, CapabilityKind, Registry};

/// Library version.
pub const VERSION: &str = "1.0.0";
