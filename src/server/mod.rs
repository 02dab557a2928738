//! HTTP REST façade over the capability registry.
//!
//! Every endpoint is served from live registry content via the shared
//! dispatch pipeline; nothing here holds capability metadata.
//!
//! # Endpoints
//!
//! - `GET  /`                   : API information
//! - `GET  /health`             : Liveness + provider reachability
//! - `GET  /mcp/tools`          : List tools
//! - `POST /mcp/tools/call`     : Call a tool
//! - `GET  /mcp/resources`      : List resources
//! - `GET  /mcp/resources/*uri` : Read a resource
//! - `GET  /mcp/prompts`        : List prompts
//! - `POST /mcp/prompts/get`    : Render a prompt

pub mod routes;

pub use routes::{app_router, AppState};
