pub mod client;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::AllocatorError;

/// A resolved market quote for one ticker symbol
#[derive(Debug, Clone)]
pub struct Quote {
    pub price: Decimal,
    pub security_name: String,
}

/// Seam to the external price-lookup collaborator. The engine only ever sees
/// this trait; tests drive it with a stub and production uses `QuoteClient`.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Resolve the current price and display name for a ticker symbol.
    /// Unknown symbols fail with `AllocatorError::TickerNotFound`; a failed
    /// lookup never mutates engine state.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AllocatorError>;
}
