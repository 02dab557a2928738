//! Capability declarations, the single definition site for every tool,
//! resource, and prompt this server exposes.
//!
//! Both transport adapters discover and invoke these purely through the
//! registry; adding or changing a capability means touching only this
//! module.

use std::sync::Arc;

use futures::future::join_all;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::dispatch::ExecutionError;
use crate::registry::{
    CapabilityDescriptor, FnHandler, ParameterSpec, Registry, RegistryError,
};

use super::models::{CompanySearch, QuoteBatch, StockPrice};
use super::provider::{normalize_symbol, MarketDataProvider};

/// URI scheme for market resources.
pub const RESOURCE_SCHEME: &str = "market://";

/// Well-known symbols served by the `market://popular-stocks` resource.
static POPULAR_STOCKS: Lazy<Value> = Lazy::new(|| {
    json!([
        {"symbol": "AAPL", "name": "Apple Inc.", "sector": "Technology"},
        {"symbol": "MSFT", "name": "Microsoft Corporation", "sector": "Technology"},
        {"symbol": "GOOGL", "name": "Alphabet Inc.", "sector": "Technology"},
        {"symbol": "AMZN", "name": "Amazon.com Inc.", "sector": "Consumer Cyclical"},
        {"symbol": "TSLA", "name": "Tesla Inc.", "sector": "Automotive"},
        {"symbol": "META", "name": "Meta Platforms Inc.", "sector": "Technology"},
        {"symbol": "NVDA", "name": "NVIDIA Corporation", "sector": "Technology"},
        {"symbol": "JPM", "name": "JPMorgan Chase & Co.", "sector": "Financial"},
        {"symbol": "V", "name": "Visa Inc.", "sector": "Financial"},
        {"symbol": "WMT", "name": "Walmart Inc.", "sector": "Consumer Defensive"},
    ])
});

/// Major index symbols served by the `market://indices` resource.
static MARKET_INDICES: Lazy<Value> = Lazy::new(|| {
    json!([
        {"symbol": "^GSPC", "name": "S&P 500", "description": "US large-cap index"},
        {"symbol": "^DJI", "name": "Dow Jones Industrial Average", "description": "US 30 major companies"},
        {"symbol": "^IXIC", "name": "NASDAQ Composite", "description": "US tech-heavy index"},
        {"symbol": "^RUT", "name": "Russell 2000", "description": "US small-cap index"},
    ])
});

fn to_json(value: impl serde::Serialize) -> Result<Value, ExecutionError> {
    serde_json::to_value(value)
        .map_err(|e| ExecutionError::Unknown(format!("failed to encode result: {}", e)))
}

/// Register every capability this server exposes.
///
/// Called exactly once during startup, before either adapter begins
/// serving; any error here must abort process initialization.
pub fn register_all(
    registry: &mut Registry,
    provider: Arc<dyn MarketDataProvider>,
) -> Result<(), RegistryError> {
    // -- Tools ------------------------------------------------------------

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::tool("get_stock_price")
            .summary("Fetch current stock price for a single symbol")
            .description(
                "Retrieves real-time stock price data including current price, \
                 day high/low, opening price, and previous close.",
            )
            .param(
                ParameterSpec::string("symbol")
                    .describe("Stock ticker symbol (e.g., 'AAPL', 'GOOGL', 'MSFT')")
                    .length(1, 10),
            )
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let quote = p.get_quote(args.str("symbol")).await?;
                    to_json(quote)
                })
            }))
            .build()?,
    )?;

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::tool("get_stock_price_by_company")
            .summary("Fetch stock price by company name")
            .description(
                "Searches for the company by name and returns the quote for the \
                 best matching symbol.",
            )
            .param(
                ParameterSpec::string("company_name")
                    .describe("Company name to search for (e.g., 'Apple', 'Microsoft')")
                    .length(2, 100),
            )
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let company_name = args.str("company_name").to_string();
                    let matches = p.search_companies(&company_name).await?;
                    let best = matches.first().ok_or_else(|| {
                        ExecutionError::NotFoundUpstream {
                            what: format!("company '{}'", company_name),
                        }
                    })?;
                    let mut quote = p.get_quote(&best.symbol).await?;
                    quote.company_name = best.description.clone();
                    to_json(quote)
                })
            }))
            .build()?,
    )?;

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::tool("get_multiple_stock_prices")
            .summary("Fetch stock prices for multiple symbols")
            .description(
                "Looks up each symbol independently; per-symbol failures are \
                 reported inline in the batch result, not as a call failure.",
            )
            .param(
                ParameterSpec::string_list("symbols")
                    .describe("List of stock ticker symbols")
                    .length(1, 20),
            )
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let symbols = args.str_list("symbols");
                    let lookups = symbols.iter().map(|s| p.get_quote(s));
                    let mut stocks: Vec<StockPrice> = Vec::with_capacity(symbols.len());
                    let mut successful = 0;
                    let mut failed = 0;
                    for (symbol, result) in symbols.iter().zip(join_all(lookups).await) {
                        match result {
                            Ok(quote) => {
                                stocks.push(quote);
                                successful += 1;
                            }
                            Err(err) => {
                                stocks.push(StockPrice::failed(
                                    normalize_symbol(symbol),
                                    err.to_string(),
                                ));
                                failed += 1;
                            }
                        }
                    }
                    to_json(QuoteBatch {
                        count: stocks.len(),
                        stocks,
                        source: "finnhub".to_string(),
                        successful,
                        failed,
                    })
                })
            }))
            .build()?,
    )?;

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::tool("search_company")
            .summary("Search for companies by name")
            .param(
                ParameterSpec::string("company_name")
                    .describe("Company name to search for")
                    .length(2, 100),
            )
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let query = args.str("company_name").to_string();
                    let results = p.search_companies(&query).await?;
                    to_json(CompanySearch {
                        count: results.len(),
                        results,
                        query,
                    })
                })
            }))
            .build()?,
    )?;

    // -- Resources --------------------------------------------------------

    registry.register(
        CapabilityDescriptor::resource("market://popular-stocks")
            .summary("List of popular stock symbols")
            .handler(FnHandler::new(|_args| {
                Box::pin(async { Ok(POPULAR_STOCKS.clone()) })
            }))
            .build()?,
    )?;

    registry.register(
        CapabilityDescriptor::resource("market://indices")
            .summary("Major market indices symbols")
            .handler(FnHandler::new(|_args| {
                Box::pin(async { Ok(MARKET_INDICES.clone()) })
            }))
            .build()?,
    )?;

    // -- Prompts ----------------------------------------------------------

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::prompt("analyze_stock_performance")
            .summary("Generate analysis prompt for stock performance")
            .param(ParameterSpec::string("symbol").describe("Stock symbol to analyze"))
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let quote = p.get_quote(args.str("symbol")).await?;
                    Ok(Value::String(render_analysis(&quote)))
                })
            }))
            .build()?,
    )?;

    let p = provider.clone();
    registry.register(
        CapabilityDescriptor::prompt("compare_stocks")
            .summary("Generate comparison prompt for multiple stocks")
            .param(
                ParameterSpec::string_list("symbols")
                    .describe("Stock symbols to compare")
                    .min_length(2),
            )
            .handler(FnHandler::new(move |args| {
                let p = p.clone();
                Box::pin(async move {
                    let symbols = args.str_list("symbols");
                    let lookups = symbols.iter().map(|s| p.get_quote(s));
                    let rows: Vec<(String, Option<StockPrice>)> = symbols
                        .iter()
                        .zip(join_all(lookups).await)
                        .map(|(symbol, result)| (normalize_symbol(symbol), result.ok()))
                        .collect();
                    Ok(Value::String(render_comparison(&rows)))
                })
            }))
            .build()?,
    )?;

    Ok(())
}

fn render_analysis(quote: &StockPrice) -> String {
    let current = quote.price.unwrap_or(0.0);
    let previous = quote.previous_close.unwrap_or(0.0);
    let change = quote.change().unwrap_or(0.0);
    let change_pct = quote.change_percent().unwrap_or(0.0);
    format!(
        "Analyze the stock performance for {}:\n\n\
         Current Price: ${:.2}\n\
         Previous Close: ${:.2}\n\
         Change: ${:.2} ({:+.2}%)\n\
         Day High: ${:.2}\n\
         Day Low: ${:.2}\n\n\
         Based on this data:\n\
         1. Is the stock trending up or down today?\n\
         2. What is the volatility range (high - low)?\n\
         3. Should an investor be concerned or optimistic?\n\
         4. What additional information would help make an investment decision?\n\n\
         Provide a brief analysis with key insights.",
        quote.symbol,
        current,
        previous,
        change,
        change_pct,
        quote.high.unwrap_or(0.0),
        quote.low.unwrap_or(0.0),
    )
}

fn render_comparison(rows: &[(String, Option<StockPrice>)]) -> String {
    let mut table = String::from("Symbol | Price | Change %\n-------|-------|----------\n");
    for (symbol, quote) in rows {
        let price = quote
            .as_ref()
            .and_then(|q| q.price)
            .map(|p| format!("${:.2}", p))
            .unwrap_or_else(|| "N/A".to_string());
        let change_pct = quote
            .as_ref()
            .and_then(|q| q.change_percent())
            .unwrap_or(0.0);
        table.push_str(&format!("{} | {} | {:+.2}%\n", symbol, price, change_pct));
    }
    format!(
        "Compare the following stocks:\n\n{}\n\
         Analysis Questions:\n\
         1. Which stock has the best performance today?\n\
         2. Which stock is most volatile?\n\
         3. What are the key differences between these companies?\n\
         4. Which would you recommend for a long-term investment and why?\n\n\
         Provide a comparative analysis with recommendations.",
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Dispatcher, InvocationOutcome, InvocationRequest};
    use crate::market::models::CompanyMatch;
    use crate::market::provider::{ProviderError, StaticProvider};
    use crate::registry::CapabilityKind;
    use serde_json::Map;

    fn build(provider: StaticProvider) -> Dispatcher {
        let mut registry = Registry::new();
        register_all(&mut registry, Arc::new(provider)).unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

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

    #[test]
    fn test_register_all_counts() {
        let mut registry = Registry::new();
        register_all(&mut registry, Arc::new(StaticProvider::default())).unwrap();
        assert_eq!(registry.list(CapabilityKind::Tool).len(), 4);
        assert_eq!(registry.list(CapabilityKind::Resource).len(), 2);
        assert_eq!(registry.list(CapabilityKind::Prompt).len(), 2);
    }

    #[tokio::test]
    async fn test_get_stock_price_success() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_stock_price",
                args(json!({"symbol": "AAPL"})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                assert_eq!(value["price"], 150.25);
                assert_eq!(value["symbol"], "AAPL");
                assert_eq!(value["source"], "finnhub");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_stock_price_unknown_symbol_is_upstream_not_found() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_stock_price",
                args(json!({"symbol": "NOPE"})),
            ))
            .await;
        assert_eq!(
            outcome,
            InvocationOutcome::ExecutionFailure {
                cause: ExecutionError::NotFoundUpstream {
                    what: "stock symbol 'NOPE'".into()
                }
            }
        );
    }

    #[tokio::test]
    async fn test_by_company_resolves_best_match() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_stock_price_by_company",
                args(json!({"company_name": "Apple"})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                assert_eq!(value["symbol"], "AAPL");
                assert_eq!(value["company_name"], "Apple Inc.");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_by_company_no_match() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_stock_price_by_company",
                args(json!({"company_name": "Nonesuch Industries"})),
            ))
            .await;
        assert!(matches!(
            outcome,
            InvocationOutcome::ExecutionFailure {
                cause: ExecutionError::NotFoundUpstream { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_batch_counts_partial_failures_inline() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_multiple_stock_prices",
                args(json!({"symbols": ["AAPL", "NOPE"]})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                assert_eq!(value["count"], 2);
                assert_eq!(value["successful"], 1);
                assert_eq!(value["failed"], 1);
                assert_eq!(value["stocks"][0]["price"], 150.25);
                assert_eq!(value["stocks"][1]["symbol"], "NOPE");
                assert!(value["stocks"][1]["error"].is_string());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_company_envelope() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "search_company",
                args(json!({"company_name": "Apple"})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                assert_eq!(value["query"], "Apple");
                assert_eq!(value["count"], 1);
                assert_eq!(value["results"][0]["symbol"], "AAPL");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resources_serve_static_payloads() {
        let dispatcher = build(StaticProvider::default());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Resource,
                "market://popular-stocks",
                Map::new(),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                assert_eq!(value.as_array().unwrap().len(), 10);
                assert_eq!(value[0]["symbol"], "AAPL");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_analysis_prompt_renders_quote() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Prompt,
                "analyze_stock_performance",
                args(json!({"symbol": "AAPL"})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                let text = value.as_str().unwrap();
                assert!(text.contains("Analyze the stock performance for AAPL"));
                assert!(text.contains("Current Price: $150.25"));
                assert!(text.contains("Previous Close: $148.00"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compare_prompt_renders_na_for_failures() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Prompt,
                "compare_stocks",
                args(json!({"symbols": ["AAPL", "NOPE"]})),
            ))
            .await;
        match outcome {
            InvocationOutcome::Success { value } => {
                let text = value.as_str().unwrap();
                assert!(text.contains("AAPL | $150.25"));
                assert!(text.contains("NOPE | N/A"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compare_prompt_requires_two_symbols() {
        let dispatcher = build(apple_provider());
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Prompt,
                "compare_stocks",
                args(json!({"symbols": ["AAPL"]})),
            ))
            .await;
        assert_eq!(
            outcome,
            InvocationOutcome::ValidationFailure {
                field: "symbols".into(),
                reason: "out of bounds".into()
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limit_is_preserved_through_dispatch() {
        let dispatcher = build(StaticProvider::failing(ProviderError::RateLimited));
        let outcome = dispatcher
            .dispatch(InvocationRequest::new(
                CapabilityKind::Tool,
                "get_stock_price",
                args(json!({"symbol": "AAPL"})),
            ))
            .await;
        assert_eq!(
            outcome,
            InvocationOutcome::ExecutionFailure {
                cause: ExecutionError::RateLimited
            }
        );
    }
}
