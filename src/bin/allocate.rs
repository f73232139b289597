use std::env;

use dotenvy::dotenv;
use futures::StreamExt;
use tracing::{info, warn};

use new_funds_allocator::config::Config;
use new_funds_allocator::export;
use new_funds_allocator::ingest::{industry_weights, portfolio};
use new_funds_allocator::logging;
use new_funds_allocator::model::AllocationState;
use new_funds_allocator::pricing::QuoteSource;
use new_funds_allocator::pricing::client::QuoteClient;

const QUOTE_CONCURRENCY: usize = 8;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    logging::init_logging();

    // Load configuration (shared HTTP client, quote endpoint, timeout)
    let cfg = Config::load();
    info!(quote_api_url = %cfg.quote_api_url, "Configuration loaded and logging initialized");

    let weights_file = env::var("INDUSTRY_WEIGHTS_FILE")
        .map_err(|_| eyre::eyre!("Missing INDUSTRY_WEIGHTS_FILE"))?;
    let portfolio_file = env::var("PORTFOLIO_FILE").ok();
    let total_amount_input = env::var("TOTAL_AMOUNT").unwrap_or_default();
    let account_id = env::var("ACCOUNT_ID").unwrap_or_else(|_| "DEFAULT".to_string());
    let upload_file = env::var("UPLOAD_FILE").unwrap_or_else(|_| "broker_upload.csv".to_string());

    // Build the allocation snapshot: industries, then seeded positions, then cash
    let mut state = AllocationState::new();
    state.load_industries(industry_weights::load_industry_weights(&weights_file)?);
    if let Some(path) = &portfolio_file {
        state.seed_portfolio(portfolio::load_portfolio(path)?);
    }
    state.set_total_amount_input(&total_amount_input);

    // Resolve prices for every row still missing one. Tickets are issued
    // up front; only the most recent ticket per row may write back.
    let quote_client = QuoteClient::new(&cfg);
    let mut pending = Vec::new();
    let unresolved: Vec<(u64, String)> = state
        .tickers()
        .iter()
        .filter(|row| !row.ticker.is_empty() && !row.price_resolved())
        .map(|row| (row.id, row.ticker.clone()))
        .collect();
    for (id, symbol) in unresolved {
        let ticket = state.begin_price_lookup(id)?;
        pending.push((id, ticket, symbol));
    }

    let results: Vec<_> = futures::stream::iter(pending)
        .map(|(id, ticket, symbol)| {
            let client = quote_client.clone();
            async move {
                let result = client.fetch_quote(&symbol).await;
                (id, ticket, symbol, result)
            }
        })
        .buffer_unordered(QUOTE_CONCURRENCY)
        .collect()
        .await;

    for (id, ticket, symbol, result) in results {
        match result {
            Ok(quote) => state.apply_quote(id, ticket, quote)?,
            // Lookup failures leave the row at its previous price
            Err(e) => warn!(symbol = %symbol, error = %e, "Price lookup failed"),
        }
    }

    // Log the allocation table
    for industry in state.industries() {
        info!(
            industry = %industry.name,
            included = industry.included,
            target_weight = format!("{:.2}%", industry.target_weight * 100.0),
            active_weight = format!("{:+.2}%", industry.active_weight * 100.0),
            dollar_allocation = %industry.dollar_allocation,
            remaining = %state.industry_remaining(&industry.name)?,
            "Industry allocation"
        );
    }
    for row in state.tickers() {
        info!(
            ticker = %row.ticker,
            industry = %row.industry,
            pct_of_industry = row.pct_of_industry,
            dollar_amount = %row.dollar_amount,
            shares = row.shares,
            price_resolved = row.price_resolved(),
            "Ticker allocation"
        );
    }
    let summary = state.summary();
    info!(
        total_amount = %summary.total_amount,
        total_allocated = %summary.total_allocated,
        remaining = %summary.remaining,
        "Allocation summary"
    );

    // Write the broker-upload file from the final trade list
    let written = export::write_broker_upload(&upload_file, &account_id, &state.trade_list())?;
    info!(file = %upload_file, trade_count = written, "Done");

    Ok(())
}
