use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use reqwest::Client;

/// Runtime configuration, loaded once from the environment (.env supported)
#[derive(Debug, Clone)]
pub struct Config {
    pub quote_api_url: String,
    pub quote_timeout: Duration,
    pub http_client: Client,
}

impl Config {
    pub fn load() -> Self {
        dotenv().ok();

        let quote_api_url = env::var("QUOTE_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/quotes".to_string());

        // Bounded wait per lookup attempt so an interactive edit never hangs
        let quote_timeout_ms = env::var("QUOTE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5_000);

        let http_client = Client::new();

        Config {
            quote_api_url,
            quote_timeout: Duration::from_millis(quote_timeout_ms),
            http_client,
        }
    }
}
