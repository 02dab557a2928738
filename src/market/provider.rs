//! The market-data collaborator: a thin client interface over Finnhub.
//!
//! Capabilities depend only on the [`MarketDataProvider`] trait; the
//! concrete [`FinnhubClient`] talks HTTPS via `reqwest`. Provider errors
//! carry the upstream cause distinction (not found, rate limited,
//! unavailable) that the dispatch layer preserves verbatim.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::ExecutionError;

use super::models::{CompanyMatch, ProviderHealth, StockPrice};

/// Errors raised by a market-data provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("stock symbol '{symbol}' not found")]
    SymbolNotFound { symbol: String },

    #[error("no company matching '{query}' found")]
    CompanyNotFound { query: String },

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{service} service is unavailable")]
    Unavailable { service: String },

    #[error("provider request failed: {message}")]
    Api { message: String },
}

/// Re-tag a provider error into the dispatch-level cause taxonomy. The
/// cause distinction is preserved verbatim; messages are rebuilt here so
/// raw provider errors never reach a transport adapter.
impl From<ProviderError> for ExecutionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::SymbolNotFound { symbol } => ExecutionError::NotFoundUpstream {
                what: format!("stock symbol '{}'", symbol),
            },
            ProviderError::CompanyNotFound { query } => ExecutionError::NotFoundUpstream {
                what: format!("company '{}'", query),
            },
            ProviderError::RateLimited => ExecutionError::RateLimited,
            ProviderError::Unavailable { service } => ExecutionError::Unavailable { service },
            ProviderError::Api { message } => ExecutionError::Unknown(message),
        }
    }
}

/// Trim and upper-case a ticker symbol before any provider call.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// The external market-data collaborator consumed by capability behaviors.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Search for companies by name.
    async fn search_companies(&self, query: &str) -> Result<Vec<CompanyMatch>, ProviderError>;

    /// Fetch the current quote for a ticker symbol.
    async fn get_quote(&self, symbol: &str) -> Result<StockPrice, ProviderError>;

    /// Reachability probe for the health endpoint.
    async fn ping(&self) -> ProviderHealth;
}

// ---------------------------------------------------------------------------
// Finnhub client
// ---------------------------------------------------------------------------

/// Raw Finnhub quote payload.
///
/// Finnhub returns `c` (current), `h`/`l` (day high/low), `o` (open),
/// `pc` (previous close), `t` (unix timestamp). A current price of zero
/// or absent means the symbol is unknown.
#[derive(Debug, Deserialize)]
struct QuotePayload {
    c: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    o: Option<f64>,
    pc: Option<f64>,
    t: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    result: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(default)]
    symbol: String,
    description: Option<String>,
    #[serde(rename = "type")]
    security_type: Option<String>,
    #[serde(rename = "displaySymbol")]
    display_symbol: Option<String>,
}

/// Finnhub REST client.
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    /// Build a client with the given API key, base URL, and request timeout.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Api {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(path, error = %e, "finnhub.request_error");
                ProviderError::Unavailable {
                    service: "finnhub".to_string(),
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ProviderError::Unavailable {
                service: "finnhub".to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                message: format!("finnhub returned HTTP {}", status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|e| ProviderError::Api {
            message: format!("failed to decode finnhub response: {}", e),
        })
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubClient {
    async fn search_companies(&self, query: &str) -> Result<Vec<CompanyMatch>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let payload: SearchPayload = self.get_json("/search", &[("q", query)]).await?;
        tracing::info!(
            query,
            count = payload.result.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "finnhub.search_complete"
        );

        Ok(payload
            .result
            .into_iter()
            .filter(|entry| !entry.symbol.is_empty())
            .map(|entry| CompanyMatch {
                symbol: normalize_symbol(&entry.symbol),
                description: entry.description,
                security_type: entry.security_type,
                display_symbol: entry.display_symbol,
            })
            .collect())
    }

    async fn get_quote(&self, symbol: &str) -> Result<StockPrice, ProviderError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ProviderError::SymbolNotFound { symbol });
        }

        let started = Instant::now();
        let quote: QuotePayload = self.get_json("/quote", &[("symbol", symbol.as_str())]).await?;
        tracing::info!(
            symbol = %symbol,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "finnhub.quote_complete"
        );

        // Finnhub reports unknown symbols as a zero/absent current price.
        let price = match quote.c {
            Some(c) if c != 0.0 => c,
            _ => return Err(ProviderError::SymbolNotFound { symbol }),
        };

        Ok(StockPrice {
            symbol,
            price: Some(price),
            currency: "USD".to_string(),
            timestamp: quote.t,
            company_name: None,
            high: quote.h,
            low: quote.l,
            open: quote.o,
            previous_close: quote.pc,
            source: "finnhub".to_string(),
            error: None,
        })
    }

    async fn ping(&self) -> ProviderHealth {
        let started = Instant::now();
        match self.get_quote("AAPL").await {
            Ok(_) => ProviderHealth::healthy(
                "connected",
                started.elapsed().as_secs_f64() * 1000.0,
            ),
            Err(err) => {
                tracing::warn!(error = %err, "finnhub.health_check_failed");
                ProviderHealth::unhealthy(format!("health check failed: {}", err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test stub
// ---------------------------------------------------------------------------

/// In-memory provider stub used by unit tests across the crate.
#[cfg(test)]
#[derive(Default)]
pub struct StaticProvider {
    pub quotes: std::collections::HashMap<String, StockPrice>,
    pub companies: Vec<CompanyMatch>,
    /// When set, every call fails with this error.
    pub fail_with: Option<ProviderError>,
}

#[cfg(test)]
impl StaticProvider {
    pub fn with_quote(mut self, quote: StockPrice) -> Self {
        self.quotes.insert(quote.symbol.clone(), quote);
        self
    }

    pub fn with_company(mut self, company: CompanyMatch) -> Self {
        self.companies.push(company);
        self
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// A plain quote with the fields the scenarios care about.
    pub fn quote(symbol: &str, price: f64, previous_close: f64) -> StockPrice {
        StockPrice {
            symbol: symbol.to_string(),
            price: Some(price),
            currency: "USD".to_string(),
            timestamp: Some(1_771_016_400),
            company_name: None,
            high: Some(price + 2.0),
            low: Some(price - 2.0),
            open: Some(previous_close),
            previous_close: Some(previous_close),
            source: "finnhub".to_string(),
            error: None,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn search_companies(&self, query: &str) -> Result<Vec<CompanyMatch>, ProviderError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let query = query.to_lowercase();
        Ok(self
            .companies
            .iter()
            .filter(|c| {
                c.description
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&query)
            })
            .cloned()
            .collect())
    }

    async fn get_quote(&self, symbol: &str) -> Result<StockPrice, ProviderError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let symbol = normalize_symbol(symbol);
        self.quotes
            .get(&symbol)
            .cloned()
            .ok_or(ProviderError::SymbolNotFound { symbol })
    }

    async fn ping(&self) -> ProviderHealth {
        match &self.fail_with {
            None => ProviderHealth::healthy("connected", 1.0),
            Some(err) => ProviderHealth::unhealthy(err.to_string()),
        }
    }
}
