use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use super::weights::BPS_DENOMINATOR;

/// Locally unique ticker-row identifier (not a server key)
pub type TickerId = u64;

/// One sector/grouping bucket with a target weight used as a coarse allocation lever
#[derive(Debug, Clone)]
pub struct Industry {
    pub name: String,
    pub benchmark_weight: f64, // Read-only reference, e.g. S&P sector weight
    pub model_weight: f64,     // Read-only reference, source of the default target
    pub adjustment_bps: i32,   // User fine-tuning, 1 bps = 0.0001
    pub included: bool,        // When false the target weight is forced to zero

    // --- Derived, maintained by the recompute pass ---
    pub target_weight: f64,         // Normalized weight after adjustment and exclusion
    pub active_weight: f64,         // target_weight - benchmark_weight
    pub dollar_allocation: Decimal, // target_weight * total_amount
}

impl Industry {
    pub fn new(name: String, benchmark_weight: f64, model_weight: f64) -> Self {
        Self {
            name,
            benchmark_weight,
            model_weight,
            adjustment_bps: 0,
            included: true,
            target_weight: 0.0,
            active_weight: 0.0,
            dollar_allocation: Decimal::ZERO,
        }
    }

    /// Pre-normalization target. The bps adjustment is remembered while the
    /// industry is excluded, so re-inclusion restores the same raw target.
    pub fn raw_target(&self) -> f64 {
        if !self.included {
            return 0.0;
        }
        (self.model_weight + self.adjustment_bps as f64 / BPS_DENOMINATOR).max(0.0)
    }
}

/// One ticker row nested under an industry. Pure view over industry state:
/// every derived field is recomputed top-down, never edited in place.
#[derive(Debug, Clone)]
pub struct TickerAllocation {
    pub id: TickerId,
    pub industry: String, // Foreign key to Industry.name
    pub ticker: String,   // May be blank while being edited
    pub security_name: String,
    pub pct_of_industry: f64, // 0-100 user input; not constrained to sum to 100
    pub price: Decimal,       // Last fetched market price, 0 until resolved

    // --- Derived ---
    pub dollar_amount: Decimal, // industry.dollar_allocation * pct / 100
    pub shares: i64,            // floor(dollar_amount / price), 0 while price unknown

    // Monotonic price-lookup ticket; only the most recently issued ticket
    // may write the row back (last request wins)
    pub lookup_seq: u64,
}

impl TickerAllocation {
    pub fn new(id: TickerId, industry: String) -> Self {
        Self {
            id,
            industry,
            ticker: String::new(),
            security_name: String::new(),
            pct_of_industry: 0.0,
            price: Decimal::ZERO,
            dollar_amount: Decimal::ZERO,
            shares: 0,
            lookup_seq: 0,
        }
    }

    /// True once the row carries a usable market price
    pub fn price_resolved(&self) -> bool {
        self.price > Decimal::ZERO
    }
}

/// One line of the final executable trade list
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLine {
    pub ticker: String,
    pub shares: i64,
    pub dollar_amount: Decimal,
}

/// Session-level projections over the full snapshot, never stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationSummary {
    pub total_amount: Decimal,
    pub total_allocated: Decimal,
    pub remaining: Decimal,
}

/// Parse a user-entered cash amount. Malformed or negative input degrades to
/// zero so the engine stays usable mid-edit.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    match Decimal::from_str(&cleaned) {
        Ok(value) if value > Decimal::ZERO => value,
        _ => Decimal::ZERO,
    }
}

/// Parse a user-entered percent-of-industry figure (0-100 scale).
/// Malformed, negative, or non-finite input degrades to zero.
pub fn parse_percent(raw: &str) -> f64 {
    let cleaned = raw.trim().trim_end_matches('%');
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}
