use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::errors::AllocatorError;

use super::{Quote, QuoteSource};

const MAX_RETRIES: u32 = 3;
const RETRY_STEP_MS: u64 = 500;

/// Wire shape of the quote endpoint's response
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Decimal,
    #[serde(default, alias = "securityName")]
    security_name: String,
}

/// HTTP client for the external quote service.
///
/// Each attempt is bounded by a configured timeout (the interactive session
/// must not hang on a dead quote service) and transient failures are retried
/// with linear backoff. An unknown symbol is definitive and never retried.
#[derive(Debug, Clone)]
pub struct QuoteClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl QuoteClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: config.http_client.clone(),
            base_url: config.quote_api_url.trim_end_matches('/').to_string(),
            timeout: config.quote_timeout,
        }
    }

    /// Single lookup attempt against the quote endpoint
    async fn try_fetch_quote(&self, symbol: &str) -> Result<Quote, AllocatorError> {
        let url = format!("{}/{}", self.base_url, symbol);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AllocatorError::TickerNotFound(symbol.to_string()));
        }
        let body: QuoteResponse = response.error_for_status()?.json().await?;

        debug!(symbol = symbol, price = %body.price, "Quote resolved");
        Ok(Quote {
            price: body.price,
            security_name: body.security_name,
        })
    }
}

#[async_trait]
impl QuoteSource for QuoteClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AllocatorError> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            let attempt_result =
                tokio::time::timeout(self.timeout, self.try_fetch_quote(symbol)).await;

            match attempt_result {
                Ok(Ok(quote)) => return Ok(quote),
                // A 404 is a definitive answer, not a transient fault
                Ok(Err(e @ AllocatorError::TickerNotFound(_))) => return Err(e),
                Ok(Err(e)) => last_error = Some(e),
                Err(_) => {
                    last_error = Some(AllocatorError::PriceLookupTimeout(symbol.to_string()))
                }
            }

            if attempt < MAX_RETRIES {
                let delay_ms = attempt as u64 * RETRY_STEP_MS; // Linear backoff: 500ms, 1000ms
                warn!(
                    symbol = symbol,
                    attempt = attempt,
                    delay_ms = delay_ms,
                    error = %last_error.as_ref().unwrap(),
                    "Quote lookup failed, retrying after delay"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        error!(
            symbol = symbol,
            attempts = MAX_RETRIES,
            error = %last_error.as_ref().unwrap(),
            "Quote lookup failed after all retries"
        );
        Err(last_error.unwrap())
    }
}
