use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::{dedupe_symbols, html, ApiRateLimiter, HistoryProvider, SymbolSource};
use crate::error::CollectorError;
use crate::models::Config;

/// Id of the symbol dropdown on the history page
const SYMBOL_SELECT_ID: &str = "Code";

/// Client for the Macedonian Stock Exchange symbol history pages
pub struct MseClient {
    client: Client,
    base_url: Url,
    rate_limiter: ApiRateLimiter,
}

impl MseClient {
    /// Create a new client from the application config
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent("mse-stocks/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            rate_limiter: ApiRateLimiter::new(config.requests_per_minute),
        })
    }

    /// Create a client against an arbitrary base URL without pacing
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url)?,
            rate_limiter: ApiRateLimiter::unlimited(),
        })
    }

    /// URL of one history page: `{base}{symbol}?fromDate=...&toDate=...`
    pub fn history_url(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Url> {
        let mut url = self
            .base_url
            .join(symbol)
            .with_context(|| format!("invalid symbol for URL: {}", symbol))?;
        url.query_pairs_mut()
            .append_pair("fromDate", &from.format("%Y-%m-%d").to_string())
            .append_pair("toDate", &to.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    async fn get_page(&self, url: Url) -> Result<String> {
        self.rate_limiter.wait().await;

        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(CollectorError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        Ok(response.text().await?)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    // join() drops the last path segment unless the base ends with a slash
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    Url::parse(&normalized)
        .map_err(|e| CollectorError::Config(format!("invalid base URL '{}': {}", base_url, e)).into())
}

#[async_trait::async_trait]
impl HistoryProvider for MseClient {
    async fn fetch_history_table(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Vec<String>>> {
        let url = self.history_url(symbol, from, to)?;
        let body = self.get_page(url).await?;

        let rows = html::first_table_rows(&body);
        if rows.is_empty() {
            debug!("{}: no data table for {} to {}", symbol, from, to);
            return Ok(rows);
        }

        debug!("{}: {} table rows for {} to {}", symbol, rows.len(), from, to);
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl SymbolSource for MseClient {
    async fn list_symbols(&self) -> Result<Vec<String>> {
        info!("📋 Fetching symbol list from {}", self.base_url);

        let body = self
            .get_page(self.base_url.clone())
            .await
            .map_err(|e| CollectorError::Discovery(e.to_string()))?;

        let codes = html::select_option_values(&body, SYMBOL_SELECT_ID);
        let total = codes.len();

        // Codes with digits are bonds and compensation notes, not shares
        let symbols: Vec<String> = dedupe_symbols(codes)
            .into_iter()
            .filter(|code| !code.chars().any(|c| c.is_ascii_digit()))
            .collect();

        if symbols.is_empty() {
            return Err(CollectorError::Discovery(format!(
                "no symbols found on {}",
                self.base_url
            ))
            .into());
        }

        if symbols.len() < total {
            warn!("Ignored {} non-share or duplicate codes", total - symbols.len());
        }
        info!("✅ Found {} symbols", symbols.len());
        Ok(symbols)
    }
}
