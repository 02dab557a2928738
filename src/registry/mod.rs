//! Capability declaration and lookup layer.
//!
//! A capability is declared exactly once as a [`CapabilityDescriptor`]:
//! name, kind, documentation, a declarative parameter list, and the bound
//! behavior. The schema deriver turns the parameter list into a structural
//! schema used for both discovery and validation, and the [`Registry`]
//! holds every descriptor for the lifetime of the process.

pub mod descriptor;
pub mod registry;
pub mod schema;

pub use descriptor::{
    CapabilityDescriptor, CapabilityHandler, CapabilityKind, Constraints, DescriptorBuilder,
    FnHandler, HandlerFuture, ParamType, ParameterSpec,
};
pub use registry::{Registry, RegistryError};
pub use schema::SchemaError;
