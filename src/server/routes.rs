//! Axum route handlers for the HTTP REST façade.
//!
//! The HTTP adapter renders the shared outcome envelope as status codes
//! and JSON bodies: `Success → 200 {"result": ...}`, `ValidationFailure →
//! 422 {"detail": [{"field", "reason"}]}`, `NotFound → 404`, and
//! `ExecutionFailure` by upstream cause (not-found → 404, rate-limited →
//! 429, unavailable → 503, anything else → 500). Identical causes produce
//! identical envelopes on the native surface.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::dispatch::{ExecutionError, InvocationOutcome, InvocationRequest};
use crate::market::capabilities::RESOURCE_SCHEME;
use crate::native::McpService;
use crate::registry::CapabilityKind;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<McpService>,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/mcp/tools", get(list_tools_handler))
        .route("/mcp/tools/call", post(call_tool_handler))
        .route("/mcp/resources", get(list_resources_handler))
        .route("/mcp/resources/*uri", get(get_resource_handler))
        .route("/mcp/prompts", get(list_prompts_handler))
        .route("/mcp/prompts/get", post(get_prompt_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

// ---------------------------------------------------------------------------
// Request models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    tool: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PromptGetRequest {
    prompt: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Outcome rendering
// ---------------------------------------------------------------------------

/// Map an outcome envelope to an HTTP response; `result_key` names the
/// wrapper field on success ("result" for tools, "data" for resources,
/// "prompt" for prompts).
fn render_outcome(outcome: InvocationOutcome, result_key: &str) -> HandlerResult {
    match outcome {
        InvocationOutcome::Success { value } => {
            let mut body = Map::new();
            body.insert(result_key.to_string(), value);
            Ok(Json(Value::Object(body)))
        }
        InvocationOutcome::ValidationFailure { field, reason } => Err(validation_response(
            &field, &reason,
        )),
        InvocationOutcome::NotFound { kind, name } => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"detail": format!("{} '{}' not found", kind, name)})),
        )),
        InvocationOutcome::ExecutionFailure { cause } => {
            let status = match &cause {
                ExecutionError::NotFoundUpstream { .. } => StatusCode::NOT_FOUND,
                ExecutionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ExecutionError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ExecutionError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status,
                Json(json!({
                    "detail": cause.to_string(),
                    "cause": cause.cause_tag(),
                })),
            ))
        }
    }
}

fn validation_response(field: &str, reason: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": [{"field": field, "reason": reason}]})),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /: API information.
async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": "Market MCP REST API",
        "version": crate::VERSION,
        "description": "HTTP REST API for stock market data",
        "endpoints": {
            "tools": "/mcp/tools",
            "resources": "/mcp/resources",
            "prompts": "/mcp/prompts",
            "health": "/health",
        }
    }))
}

/// GET /health: process liveness plus provider reachability. Reported
/// independently of the registry.
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let provider = state.service.provider_health().await;
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "provider": provider,
    }))
}

/// GET /mcp/tools: list tools from live registry content.
async fn list_tools_handler(State(state): State<AppState>) -> Json<Value> {
    let tools = state.service.list_tools();
    tracing::info!(count = tools.len(), "http.list_tools");
    Json(json!({ "tools": tools }))
}

/// POST /mcp/tools/call: call a tool by name.
async fn call_tool_handler(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    let name = request.tool.trim().to_string();
    if name.is_empty() {
        return Err(validation_response("tool", "missing required parameter"));
    }
    tracing::info!(%request_id, tool = %name, "http.call_tool");

    let outcome = state
        .service
        .dispatch(InvocationRequest::new(
            CapabilityKind::Tool,
            name,
            request.arguments,
        ))
        .await;
    render_outcome(outcome, "result")
}

/// GET /mcp/resources: list resources from live registry content.
async fn list_resources_handler(State(state): State<AppState>) -> Json<Value> {
    let resources: Vec<Value> = state
        .service
        .list_resources()
        .into_iter()
        .map(|info| {
            json!({
                "uri": info.name,
                "name": info.name.strip_prefix(RESOURCE_SCHEME).unwrap_or(&info.name),
                "description": info.description,
                "mimeType": "application/json",
            })
        })
        .collect();
    tracing::info!(count = resources.len(), "http.list_resources");
    Json(json!({ "resources": resources }))
}

/// GET /mcp/resources/*uri: read a resource. The path form may omit the
/// `market://` scheme; it is added before lookup.
async fn get_resource_handler(
    State(state): State<AppState>,
    Path(uri): Path<String>,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    let uri = if uri.starts_with(RESOURCE_SCHEME) {
        uri
    } else {
        format!("{}{}", RESOURCE_SCHEME, uri)
    };
    tracing::info!(%request_id, uri = %uri, "http.get_resource");

    let outcome = state
        .service
        .dispatch(InvocationRequest::new(
            CapabilityKind::Resource,
            uri,
            Map::new(),
        ))
        .await;
    render_outcome(outcome, "data")
}

/// GET /mcp/prompts: list prompts from live registry content.
async fn list_prompts_handler(State(state): State<AppState>) -> Json<Value> {
    let prompts = state.service.list_prompts();
    tracing::info!(count = prompts.len(), "http.list_prompts");
    Json(json!({ "prompts": prompts }))
}

/// POST /mcp/prompts/get: render a prompt with arguments.
async fn get_prompt_handler(
    State(state): State<AppState>,
    Json(request): Json<PromptGetRequest>,
) -> HandlerResult {
    let request_id = Uuid::new_v4();
    let name = request.prompt.trim().to_string();
    if name.is_empty() {
        return Err(validation_response("prompt", "missing required parameter"));
    }
    tracing::info!(%request_id, prompt = %name, "http.get_prompt");

    let outcome = state
        .service
        .dispatch(InvocationRequest::new(
            CapabilityKind::Prompt,
            name,
            request.arguments,
        ))
        .await;
    render_outcome(outcome, "prompt")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::provider::{ProviderError, StaticProvider};
    use crate::market::{register_all, CompanyMatch};
    use crate::registry::Registry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn apple_provider() -> StaticProvider {
        StaticProvider::default()
            .with_quote(StaticProvider::quote("AAPL", 150.25, 148.0))
            .with_company(CompanyMatch {
                symbol: "AAPL".into(),
                description: Some("Apple Inc.".into()),
                security_type: Some("Common Stock".into()),
                display_symbol: Some("AAPL".into()),
            })
    }

    fn state_with(provider: StaticProvider, health_provider: StaticProvider) -> AppState {
        let mut registry = Registry::new();
        register_all(&mut registry, Arc::new(provider)).unwrap();
        AppState {
            service: Arc::new(McpService::new(Arc::new(registry), Arc::new(health_provider))),
        }
    }

    fn app() -> Router {
        app_router(state_with(apple_provider(), apple_provider()))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (status, json) = get(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["version"], crate::VERSION);

        let (status, json) = get(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_provider() {
        let state = state_with(
            apple_provider(),
            StaticProvider::failing(ProviderError::Unavailable {
                service: "finnhub".into(),
            }),
        );
        let (status, json) = get(app_router(state), "/health").await;
        // Liveness is still OK; only the provider section degrades.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["provider"]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_discovery_endpoints() {
        let (status, json) = get(app(), "/mcp/tools").await;
        assert_eq!(status, StatusCode::OK);
        let tools = json["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0]["name"], "get_stock_price");
        assert_eq!(
            tools[0]["parameters"]["properties"]["symbol"]["maxLength"],
            10
        );

        let (_, json) = get(app(), "/mcp/resources").await;
        let resources = json["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0]["uri"], "market://popular-stocks");
        assert_eq!(resources[0]["name"], "popular-stocks");

        let (_, json) = get(app(), "/mcp/prompts").await;
        assert_eq!(json["prompts"].as_array().unwrap().len(), 2);
    }

    // Scenario: a valid call returns the quote wrapped in "result".
    #[tokio::test]
    async fn test_call_tool_success() {
        let (status, json) = post(
            app(),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {"symbol": "AAPL"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"]["price"], 150.25);
        assert_eq!(json["result"]["symbol"], "AAPL");
    }

    // Scenario: missing required argument → 422 naming the field.
    #[tokio::test]
    async fn test_call_tool_missing_argument() {
        let (status, json) = post(
            app(),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"][0]["field"], "symbol");
        assert_eq!(json["detail"][0]["reason"], "missing required parameter");
    }

    // Scenario: an 11-character symbol violates the 1..=10 bound.
    #[tokio::test]
    async fn test_call_tool_out_of_bounds() {
        let (status, json) = post(
            app(),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {"symbol": "ZZZZZZZZZZZ"}}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"][0]["field"], "symbol");
        assert_eq!(json["detail"][0]["reason"], "out of bounds");
    }

    // Scenario: upstream not-found maps to 404 with the cause tag.
    #[tokio::test]
    async fn test_call_tool_upstream_not_found() {
        let (status, json) = post(
            app(),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {"symbol": "NOPE"}}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["cause"], "not_found_upstream");
    }

    #[tokio::test]
    async fn test_upstream_rate_limit_and_unavailable_codes() {
        let state = state_with(
            StaticProvider::failing(ProviderError::RateLimited),
            apple_provider(),
        );
        let (status, json) = post(
            app_router(state),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {"symbol": "AAPL"}}),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["cause"], "rate_limited");

        let state = state_with(
            StaticProvider::failing(ProviderError::Unavailable {
                service: "finnhub".into(),
            }),
            apple_provider(),
        );
        let (status, json) = post(
            app_router(state),
            "/mcp/tools/call",
            json!({"tool": "get_stock_price", "arguments": {"symbol": "AAPL"}}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["cause"], "unavailable");
    }

    // Scenario: unknown tool name → 404, registry untouched.
    #[tokio::test]
    async fn test_call_unknown_tool() {
        let state = state_with(apple_provider(), apple_provider());
        let before = state.service.registry().len();

        let (status, json) = post(
            app_router(state.clone()),
            "/mcp/tools/call",
            json!({"tool": "delete_everything", "arguments": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["detail"]
            .as_str()
            .unwrap()
            .contains("delete_everything"));
        assert_eq!(state.service.registry().len(), before);
    }

    #[tokio::test]
    async fn test_empty_tool_name_rejected() {
        let (status, json) = post(app(), "/mcp/tools/call", json!({"tool": "  "})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"][0]["field"], "tool");
    }

    #[tokio::test]
    async fn test_get_resource_with_and_without_scheme() {
        let (status, json) = get(app(), "/mcp/resources/popular-stocks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 10);

        let (status, json) = get(app(), "/mcp/resources/market://indices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["symbol"], "^GSPC");

        let (status, _) = get(app(), "/mcp/resources/no-such-resource").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_prompt() {
        let (status, json) = post(
            app(),
            "/mcp/prompts/get",
            json!({"prompt": "analyze_stock_performance", "arguments": {"symbol": "AAPL"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["prompt"]
            .as_str()
            .unwrap()
            .contains("Analyze the stock performance for AAPL"));

        let (status, json) = post(
            app(),
            "/mcp/prompts/get",
            json!({"prompt": "compare_stocks", "arguments": {"symbols": ["AAPL"]}}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"][0]["field"], "symbols");
    }
}
