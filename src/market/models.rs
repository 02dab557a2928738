//! Typed response models for market-data capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single stock quote.
///
/// `price` is `None` (with `error` set) for entries inside a batch result
/// whose individual lookup failed; single-quote calls surface failures
/// through the outcome envelope instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPrice {
    /// Ticker symbol, upper-cased.
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub currency: String,
    /// Unix timestamp of the quote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Company name when resolved via search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    /// Data source identifier.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StockPrice {
    /// A placeholder entry for a batch lookup that failed.
    pub fn failed(symbol: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: None,
            currency: "USD".to_string(),
            timestamp: None,
            company_name: None,
            high: None,
            low: None,
            open: None,
            previous_close: None,
            source: "finnhub".to_string(),
            error: Some(error.into()),
        }
    }

    /// Price change from previous close, when both are known.
    pub fn change(&self) -> Option<f64> {
        Some(self.price? - self.previous_close?)
    }

    /// Percentage change from previous close, when computable.
    pub fn change_percent(&self) -> Option<f64> {
        let previous = self.previous_close?;
        if previous == 0.0 {
            return None;
        }
        Some((self.price? - previous) / previous * 100.0)
    }
}

/// One match from a company-name search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub security_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_symbol: Option<String>,
}

/// Envelope for company-search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySearch {
    pub results: Vec<CompanyMatch>,
    pub query: String,
    pub count: usize,
}

/// Envelope for a batch quote lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub stocks: Vec<StockPrice>,
    pub source: String,
    pub count: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Result of a provider reachability probe, reported by the health
/// endpoint independently of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// "healthy" or "unhealthy".
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    pub checked_at: DateTime<Utc>,
}

impl ProviderHealth {
    pub fn healthy(message: impl Into<String>, response_time_ms: f64) -> Self {
        Self {
            status: "healthy".to_string(),
            message: message.into(),
            response_time_ms: Some(response_time_ms),
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: message.into(),
            response_time_ms: None,
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
