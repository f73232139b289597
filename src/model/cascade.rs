use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::debug;

use super::types::{Industry, TickerAllocation};

/// Recompute one ticker row from its industry's current dollar allocation.
///
/// `dollar_amount = dollar_allocation * pct_of_industry / 100`, 0 when the
/// industry is missing, excluded, or the percentage is 0. Shares are whole:
/// `floor(dollar_amount / price)` once a price is known, else 0 — a row can
/// legitimately carry dollars with no share count until its price resolves.
pub fn recompute_row(row: &mut TickerAllocation, industry: Option<&Industry>) {
    let allocation = industry
        .filter(|i| i.included)
        .map(|i| i.dollar_allocation)
        .unwrap_or(Decimal::ZERO);

    let pct = if row.pct_of_industry.is_finite() && row.pct_of_industry > 0.0 {
        row.pct_of_industry
    } else {
        0.0
    };

    row.dollar_amount = allocation * Decimal::from_f64(pct / 100.0).unwrap_or(Decimal::ZERO);
    row.shares = if row.price_resolved() {
        (row.dollar_amount / row.price).floor().to_i64().unwrap_or(0)
    } else {
        0
    };
}

/// Recompute every ticker row in the system from the industry set.
///
/// Any single industry edit renormalizes all industries, so the cascade always
/// covers the whole row set, not just the edited industry's rows. Pure and
/// idempotent: a second pass over unchanged inputs is bit-identical.
pub fn recompute_all(industries: &[Industry], rows: &mut [TickerAllocation]) {
    let by_name: HashMap<&str, &Industry> =
        industries.iter().map(|i| (i.name.as_str(), i)).collect();

    for row in rows.iter_mut() {
        recompute_row(row, by_name.get(row.industry.as_str()).copied());
    }

    debug!(row_count = rows.len(), "Ticker cascade recomputed");
}

/// Unallocated dollars within one industry: its allocation minus the sum its
/// rows currently claim. Over- and under-allocation are surfaced, not blocked,
/// so this can go negative.
pub fn industry_remaining(industry: &Industry, rows: &[TickerAllocation]) -> Decimal {
    let claimed: Decimal = rows
        .iter()
        .filter(|row| row.industry == industry.name)
        .map(|row| row.dollar_amount)
        .sum();
    industry.dollar_allocation - claimed
}
