use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::errors::AllocatorError;
use crate::ingest::industry_weights::IndustryWeightRow;
use crate::ingest::portfolio::PortfolioRow;
use crate::pricing::Quote;

use super::cascade;
use super::types::{
    AllocationSummary, Industry, TickerAllocation, TickerId, TradeLine, parse_amount,
    parse_percent,
};
use super::weights;

/// The full allocation snapshot and single source of truth.
///
/// Industries drive ticker rows top-down: every transition method ends by
/// recomputing whatever the edit can reach, and a ticker edit never mutates
/// industry weights. The state is session-scoped and single-threaded; the
/// only async collaborator (the price lookup) talks to it through the
/// `begin_price_lookup` / `apply_quote` ticket protocol.
#[derive(Debug, Default)]
pub struct AllocationState {
    industries: Vec<Industry>,
    tickers: Vec<TickerAllocation>,
    total_amount: Decimal,
    next_ticker_id: TickerId,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn industries(&self) -> &[Industry] {
        &self.industries
    }

    pub fn tickers(&self) -> &[TickerAllocation] {
        &self.tickers
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn industry(&self, name: &str) -> Option<&Industry> {
        self.industries.iter().find(|i| i.name == name)
    }

    pub fn ticker(&self, id: TickerId) -> Option<&TickerAllocation> {
        self.tickers.iter().find(|t| t.id == id)
    }

    /// Replace the entire industry set from imported weight rows. Imported
    /// weights are percentages and enter the model divided by 100. Clears all
    /// ticker rows, since they key off the old industry names.
    #[instrument(skip(self, rows))]
    pub fn load_industries(&mut self, rows: Vec<IndustryWeightRow>) {
        let mut industries: Vec<Industry> = Vec::new();
        for row in rows {
            let industry = Industry::new(
                row.industry,
                row.benchmark_weight / 100.0,
                row.model_weight / 100.0,
            );
            // Industry names are unique keys; a repeated name in the import
            // replaces the earlier row rather than creating a second record
            match industries.iter_mut().find(|i| i.name == industry.name) {
                Some(existing) => {
                    warn!(industry = %industry.name, "Duplicate industry row in import, keeping the later one");
                    *existing = industry;
                }
                None => industries.push(industry),
            }
        }
        self.industries = industries;
        self.tickers.clear();
        self.recompute();
        info!(industry_count = self.industries.len(), "Industry set loaded");
    }

    /// Bulk-seed ticker rows from a portfolio import, one row per imported
    /// position in file order. Runs the single-row recomputation against
    /// whatever industry state currently exists: with no industries loaded or
    /// a zero total amount the rows seed at 0 dollars and pick up real values
    /// on the first weight or amount edit.
    #[instrument(skip(self, rows))]
    pub fn seed_portfolio(&mut self, rows: Vec<PortfolioRow>) {
        let mut seeded = 0usize;
        for imported in rows {
            let id = self.alloc_ticker_id();
            let mut row = TickerAllocation::new(id, imported.industry);
            row.ticker = imported.ticker;
            row.pct_of_industry = if imported.pct_of_industry.is_finite() {
                imported.pct_of_industry.max(0.0)
            } else {
                0.0
            };
            if let Some(price) = imported.price {
                if price > Decimal::ZERO {
                    row.price = price;
                }
            }
            if let Some(name) = imported.security_name {
                row.security_name = name;
            }
            let industry = self.industry_ref(&row.industry);
            cascade::recompute_row(&mut row, industry);
            self.tickers.push(row);
            seeded += 1;
        }
        info!(seeded = seeded, "Portfolio rows seeded");
    }

    /// Set the cash amount to deploy and cascade through every industry and
    /// every ticker row in the system.
    pub fn set_total_amount(&mut self, amount: Decimal) {
        self.total_amount = amount.max(Decimal::ZERO);
        self.recompute();
        debug!(total_amount = %self.total_amount, "Total amount updated");
    }

    /// Raw-input variant: malformed text degrades to a zero amount.
    pub fn set_total_amount_input(&mut self, raw: &str) {
        self.set_total_amount(parse_amount(raw));
    }

    /// Fine-tune one industry's target by basis points and renormalize the
    /// full set.
    pub fn set_adjustment_bps(&mut self, name: &str, bps: i32) -> Result<(), AllocatorError> {
        let industry = self
            .industries
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| AllocatorError::UnknownIndustry(name.to_string()))?;
        industry.adjustment_bps = bps;
        self.recompute();
        debug!(industry = name, bps = bps, "Adjustment applied");
        Ok(())
    }

    /// Include or exclude one industry. Exclusion zeroes its target and lets
    /// the rest of the set absorb the freed share proportionally; re-inclusion
    /// restores the raw target from the remembered bps adjustment. Always
    /// renormalizes the full set — rescaling only the toggled industry would
    /// break the sum-to-1 invariant.
    pub fn set_included(&mut self, name: &str, included: bool) -> Result<(), AllocatorError> {
        let industry = self
            .industries
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| AllocatorError::UnknownIndustry(name.to_string()))?;
        industry.included = included;
        self.recompute();
        debug!(industry = name, included = included, "Inclusion toggled");
        Ok(())
    }

    /// Add an empty ticker row under an industry and return its id.
    pub fn add_ticker(&mut self, industry: &str) -> Result<TickerId, AllocatorError> {
        if self.industry(industry).is_none() {
            return Err(AllocatorError::UnknownIndustry(industry.to_string()));
        }
        let id = self.alloc_ticker_id();
        self.tickers
            .push(TickerAllocation::new(id, industry.to_string()));
        Ok(id)
    }

    pub fn remove_ticker(&mut self, id: TickerId) -> Result<(), AllocatorError> {
        let position = self
            .tickers
            .iter()
            .position(|t| t.id == id)
            .ok_or(AllocatorError::UnknownTickerRow(id))?;
        self.tickers.remove(position);
        Ok(())
    }

    /// Direct percent-of-industry edit. Recomputes only the edited row;
    /// sibling rows and industry weights are untouched, and per-industry
    /// totals over or under 100% are allowed and merely surfaced through
    /// `industry_remaining`.
    pub fn set_ticker_percent(&mut self, id: TickerId, raw: &str) -> Result<(), AllocatorError> {
        let row = self
            .tickers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AllocatorError::UnknownTickerRow(id))?;
        row.pct_of_industry = parse_percent(raw);
        let industry = self.industries.iter().find(|i| i.name == row.industry);
        cascade::recompute_row(row, industry);
        Ok(())
    }

    /// Change a row's ticker symbol. The caller is expected to follow up with
    /// a price lookup; until a quote lands the row keeps its previous price.
    pub fn set_ticker_symbol(&mut self, id: TickerId, symbol: &str) -> Result<(), AllocatorError> {
        let row = self
            .tickers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AllocatorError::UnknownTickerRow(id))?;
        row.ticker = symbol.trim().to_uppercase();
        Ok(())
    }

    /// Issue a price-lookup ticket for a row. A newer ticket supersedes every
    /// older outstanding one: only the most recent ticket may write back.
    pub fn begin_price_lookup(&mut self, id: TickerId) -> Result<u64, AllocatorError> {
        let row = self
            .tickers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AllocatorError::UnknownTickerRow(id))?;
        row.lookup_seq += 1;
        Ok(row.lookup_seq)
    }

    /// Apply a resolved quote. Stale tickets (a newer lookup was started
    /// before this one resolved) are dropped without touching the row; the
    /// dollar amount is price-independent, so only shares move.
    pub fn apply_quote(
        &mut self,
        id: TickerId,
        ticket: u64,
        quote: Quote,
    ) -> Result<(), AllocatorError> {
        let row = self
            .tickers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AllocatorError::UnknownTickerRow(id))?;
        if row.lookup_seq != ticket {
            debug!(
                ticker = %row.ticker,
                ticket = ticket,
                current = row.lookup_seq,
                "Dropping stale quote"
            );
            return Ok(());
        }
        row.price = quote.price;
        row.security_name = quote.security_name;
        let industry = self.industries.iter().find(|i| i.name == row.industry);
        cascade::recompute_row(row, industry);
        Ok(())
    }

    /// Unallocated dollars within one industry (negative when over-allocated).
    pub fn industry_remaining(&self, name: &str) -> Result<Decimal, AllocatorError> {
        let industry = self
            .industry(name)
            .ok_or_else(|| AllocatorError::UnknownIndustry(name.to_string()))?;
        Ok(cascade::industry_remaining(industry, &self.tickers))
    }

    /// Session-level projection: cash deployed versus cash remaining.
    pub fn summary(&self) -> AllocationSummary {
        let total_allocated: Decimal = self.tickers.iter().map(|t| t.dollar_amount).sum();
        AllocationSummary {
            total_amount: self.total_amount,
            total_allocated,
            remaining: self.total_amount - total_allocated,
        }
    }

    /// The executable trade list in row order. Rows with blank tickers or no
    /// shares are kept here and filtered by the broker-upload writer.
    pub fn trade_list(&self) -> Vec<TradeLine> {
        self.tickers
            .iter()
            .map(|row| TradeLine {
                ticker: row.ticker.clone(),
                shares: row.shares,
                dollar_amount: row.dollar_amount,
            })
            .collect()
    }

    /// Full recompute pass: renormalize all industry weights, then cascade
    /// into every ticker row system-wide.
    fn recompute(&mut self) {
        weights::renormalize(&mut self.industries, self.total_amount);
        cascade::recompute_all(&self.industries, &mut self.tickers);
    }

    fn industry_ref(&self, name: &str) -> Option<&Industry> {
        self.industries.iter().find(|i| i.name == name)
    }

    fn alloc_ticker_id(&mut self) -> TickerId {
        self.next_ticker_id += 1;
        self.next_ticker_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::weights::WEIGHT_EPSILON;
    use rust_decimal::prelude::*;
    use rust_decimal_macros::dec;

    fn weight_row(industry: &str, benchmark: f64, model: f64) -> IndustryWeightRow {
        IndustryWeightRow {
            industry: industry.to_string(),
            benchmark_weight: benchmark,
            model_weight: model,
        }
    }

    // Scenario A industry file: percentages on import, fractions in the model
    fn loaded_state() -> AllocationState {
        let mut state = AllocationState::new();
        state.load_industries(vec![
            weight_row("Tech", 28.0, 30.0),
            weight_row("Health", 13.0, 20.0),
        ]);
        state.set_total_amount(dec!(1000000));
        state
    }

    fn quote(price: Decimal, name: &str) -> Quote {
        Quote {
            price,
            security_name: name.to_string(),
        }
    }

    #[test]
    fn scenario_a_renormalized_dollar_allocations() {
        let state = loaded_state();
        let tech = state.industry("Tech").unwrap();
        let health = state.industry("Health").unwrap();

        assert!((tech.target_weight - 0.6).abs() < 1e-12);
        assert!((health.target_weight - 0.4).abs() < 1e-12);
        assert_eq!(tech.dollar_allocation, dec!(600000));
        assert_eq!(health.dollar_allocation, dec!(400000));
    }

    #[test]
    fn scenario_b_bps_adjustment_renormalizes() {
        let mut state = loaded_state();
        state.set_adjustment_bps("Tech", 500).unwrap();

        let tech = state.industry("Tech").unwrap();
        let health = state.industry("Health").unwrap();
        assert!((tech.target_weight - 0.6364).abs() < 1e-4);
        assert!((health.target_weight - 0.3636).abs() < 1e-4);
        let tech_dollars = tech.dollar_allocation.to_f64().unwrap();
        let health_dollars = health.dollar_allocation.to_f64().unwrap();
        assert!((tech_dollars - 636_400.0).abs() < 100.0);
        assert!((health_dollars - 363_600.0).abs() < 100.0);
    }

    #[test]
    fn scenario_c_whole_shares_under_tech() {
        let mut state = loaded_state();
        let id = state.add_ticker("Tech").unwrap();
        state.set_ticker_symbol(id, "aapl").unwrap();
        state.set_ticker_percent(id, "50").unwrap();
        let ticket = state.begin_price_lookup(id).unwrap();
        state
            .apply_quote(id, ticket, quote(dec!(150.00), "Apple Inc"))
            .unwrap();

        let row = state.ticker(id).unwrap();
        assert_eq!(row.ticker, "AAPL");
        assert_eq!(row.dollar_amount, dec!(300000));
        assert_eq!(row.shares, 2000);
    }

    #[test]
    fn scenario_d_exclusion_cascades_into_rows() {
        let mut state = loaded_state();
        let id = state.add_ticker("Tech").unwrap();
        state.set_ticker_percent(id, "50").unwrap();
        let ticket = state.begin_price_lookup(id).unwrap();
        state
            .apply_quote(id, ticket, quote(dec!(150.00), "Apple Inc"))
            .unwrap();

        state.set_included("Tech", false).unwrap();

        let health = state.industry("Health").unwrap();
        assert!((health.target_weight - 1.0).abs() < 1e-12);
        assert_eq!(health.dollar_allocation, dec!(1000000));

        let row = state.ticker(id).unwrap();
        assert_eq!(row.dollar_amount, Decimal::ZERO);
        assert_eq!(row.shares, 0);
    }

    #[test]
    fn normalization_invariant_over_edit_sequences() {
        let mut state = AllocationState::new();
        state.load_industries(vec![
            weight_row("Tech", 28.0, 30.0),
            weight_row("Health", 13.0, 20.0),
            weight_row("Energy", 5.0, 10.0),
            weight_row("Utilities", 3.0, 5.0),
        ]);
        state.set_total_amount(dec!(500000));

        let edits: &[(&str, i32, bool)] = &[
            ("Tech", 250, true),
            ("Energy", -400, true),
            ("Health", 0, false),
            ("Utilities", 120, true),
            ("Health", 0, true),
            ("Tech", -1000, false),
            ("Tech", -1000, true),
        ];
        for (name, bps, included) in edits {
            state.set_adjustment_bps(name, *bps).unwrap();
            state.set_included(name, *included).unwrap();

            if state.industries().iter().any(|i| i.included) {
                let sum: f64 = state.industries().iter().map(|i| i.target_weight).sum();
                assert!((sum - 1.0).abs() < WEIGHT_EPSILON, "sum drifted to {sum}");
            }
        }
    }

    #[test]
    fn cascade_covers_every_row_on_amount_change() {
        let mut state = loaded_state();
        let tech_row = state.add_ticker("Tech").unwrap();
        let health_row = state.add_ticker("Health").unwrap();
        state.set_ticker_percent(tech_row, "100").unwrap();
        state.set_ticker_percent(health_row, "100").unwrap();

        state.set_total_amount(dec!(2000000));

        assert_eq!(
            state.ticker(tech_row).unwrap().dollar_amount,
            dec!(1200000)
        );
        assert_eq!(
            state.ticker(health_row).unwrap().dollar_amount,
            dec!(800000)
        );
    }

    #[test]
    fn full_exclusion_zeroes_everything() {
        let mut state = loaded_state();
        let id = state.add_ticker("Tech").unwrap();
        state.set_ticker_percent(id, "75").unwrap();

        state.set_included("Tech", false).unwrap();
        state.set_included("Health", false).unwrap();

        for industry in state.industries() {
            assert_eq!(industry.dollar_allocation, Decimal::ZERO);
        }
        assert_eq!(state.ticker(id).unwrap().dollar_amount, Decimal::ZERO);
        assert_eq!(state.summary().total_allocated, Decimal::ZERO);
    }

    #[test]
    fn percent_edit_touches_only_its_own_row() {
        let mut state = loaded_state();
        let first = state.add_ticker("Tech").unwrap();
        let second = state.add_ticker("Tech").unwrap();
        state.set_ticker_percent(first, "60").unwrap();
        state.set_ticker_percent(second, "60").unwrap();
        let sibling_before = state.ticker(second).unwrap().dollar_amount;
        let weights_before: Vec<f64> =
            state.industries().iter().map(|i| i.target_weight).collect();

        state.set_ticker_percent(first, "garbage").unwrap();

        assert_eq!(state.ticker(first).unwrap().dollar_amount, Decimal::ZERO);
        assert_eq!(state.ticker(second).unwrap().dollar_amount, sibling_before);
        let weights_after: Vec<f64> =
            state.industries().iter().map(|i| i.target_weight).collect();
        assert_eq!(weights_before, weights_after);

        // 120% claimed against a 600,000 allocation before the edit; the
        // over-allocation is reported, never clamped
        assert_eq!(state.industry_remaining("Tech").unwrap(), dec!(240000));
    }

    #[test]
    fn stale_quote_ticket_is_dropped() {
        let mut state = loaded_state();
        let id = state.add_ticker("Tech").unwrap();
        state.set_ticker_symbol(id, "AAPL").unwrap();
        state.set_ticker_percent(id, "50").unwrap();

        let first = state.begin_price_lookup(id).unwrap();
        let second = state.begin_price_lookup(id).unwrap();

        state
            .apply_quote(id, second, quote(dec!(150.00), "Apple Inc"))
            .unwrap();
        // The superseded response arrives late and must not overwrite
        state
            .apply_quote(id, first, quote(dec!(999.00), "Apple Inc"))
            .unwrap();

        let row = state.ticker(id).unwrap();
        assert_eq!(row.price, dec!(150.00));
        assert_eq!(row.shares, 2000);
    }

    #[test]
    fn seeding_before_industries_load_recovers_later() {
        let mut state = AllocationState::new();
        state.seed_portfolio(vec![PortfolioRow {
            ticker: "AAPL".to_string(),
            industry: "Tech".to_string(),
            pct_of_industry: 50.0,
            price: Some(dec!(150.00)),
            security_name: Some("Apple Inc".to_string()),
        }]);

        let row = &state.tickers()[0];
        assert_eq!(row.dollar_amount, Decimal::ZERO);
        assert_eq!(row.shares, 0);

        // First weight/amount edit picks the seeded row up. Loading clears
        // rows, so the seed order here mirrors the import screen: industries
        // first would be the usual path, amount arrives last either way.
        let id = row.id;
        state.load_industries(vec![
            weight_row("Tech", 28.0, 30.0),
            weight_row("Health", 13.0, 20.0),
        ]);
        assert!(state.ticker(id).is_none());

        state.seed_portfolio(vec![PortfolioRow {
            ticker: "AAPL".to_string(),
            industry: "Tech".to_string(),
            pct_of_industry: 50.0,
            price: Some(dec!(150.00)),
            security_name: None,
        }]);
        state.set_total_amount(dec!(1000000));

        let row = &state.tickers()[0];
        assert_eq!(row.dollar_amount, dec!(300000));
        assert_eq!(row.shares, 2000);
    }

    #[test]
    fn seeding_with_industries_loaded_computes_immediately() {
        let mut state = loaded_state();
        state.seed_portfolio(vec![PortfolioRow {
            ticker: "AAPL".to_string(),
            industry: "Tech".to_string(),
            pct_of_industry: 50.0,
            price: Some(dec!(150.00)),
            security_name: Some("Apple Inc".to_string()),
        }]);

        // No further edit needed: the seeded row lands with live values
        let row = &state.tickers()[0];
        assert_eq!(row.dollar_amount, dec!(300000));
        assert_eq!(row.shares, 2000);
        assert_eq!(row.security_name, "Apple Inc");
    }

    #[test]
    fn duplicate_industry_names_keep_the_later_row() {
        let mut state = AllocationState::new();
        state.load_industries(vec![
            weight_row("Tech", 28.0, 30.0),
            weight_row("Health", 13.0, 20.0),
            weight_row("Tech", 29.0, 60.0),
        ]);
        state.set_total_amount(dec!(1000000));

        // One record per name, carrying the later row's weights
        assert_eq!(state.industries().len(), 2);
        let tech = state.industry("Tech").unwrap();
        assert_eq!(tech.benchmark_weight, 0.29);
        assert!((tech.target_weight - 0.75).abs() < 1e-12);
        let tech_dollars = tech.dollar_allocation.to_f64().unwrap();
        assert!((tech_dollars - 750_000.0).abs() < 0.01);

        // Lookups by name and the cascade agree on the surviving record
        let id = state.add_ticker("Tech").unwrap();
        state.set_ticker_percent(id, "100").unwrap();
        let row_dollars = state.ticker(id).unwrap().dollar_amount.to_f64().unwrap();
        assert!((row_dollars - 750_000.0).abs() < 0.01);
        assert_eq!(state.industry_remaining("Tech").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn malformed_amount_input_degrades_to_zero() {
        let mut state = loaded_state();
        state.set_total_amount_input("not a number");

        assert_eq!(state.total_amount(), Decimal::ZERO);
        for industry in state.industries() {
            assert_eq!(industry.dollar_allocation, Decimal::ZERO);
        }
        // Weights stay normalized even with no cash to deploy
        let sum: f64 = state.industries().iter().map(|i| i.target_weight).sum();
        assert!((sum - 1.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn removing_a_row_leaves_siblings_alone() {
        let mut state = loaded_state();
        let first = state.add_ticker("Tech").unwrap();
        let second = state.add_ticker("Tech").unwrap();
        state.set_ticker_percent(second, "40").unwrap();

        state.remove_ticker(first).unwrap();

        assert!(state.ticker(first).is_none());
        assert_eq!(state.ticker(second).unwrap().dollar_amount, dec!(240000));
        assert!(matches!(
            state.remove_ticker(first),
            Err(AllocatorError::UnknownTickerRow(_))
        ));
    }
}
