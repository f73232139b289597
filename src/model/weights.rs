use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::debug;

use super::types::Industry;

/// Tolerance for treating a raw-target sum as already normalized. A sum
/// within this band of 1 skips the rescale pass, so trivial bps edits do not
/// introduce floating noise across every industry.
pub const WEIGHT_EPSILON: f64 = 1e-4;

/// 1 bps = 0.0001
pub const BPS_DENOMINATOR: f64 = 10_000.0;

/// Renormalize target weights across the full industry set and refresh every
/// derived industry field from the result.
///
/// Raw targets come from `model_weight + adjustment_bps / 10_000` for
/// included industries and 0 for excluded ones. When the raw sum is positive
/// and off 1 by more than `WEIGHT_EPSILON`, every included industry is
/// rescaled by the sum; excluded industries stay at 0. The all-excluded set
/// is a valid zero state, not an error — no rescale is attempted and every
/// dollar allocation lands on 0.
///
/// This is a pure numeric transform over the whole set. Rescaling only the
/// edited industry would silently break the sum-to-1 invariant, so callers
/// must run it after *any* weight-affecting edit.
pub fn renormalize(industries: &mut [Industry], total_amount: Decimal) {
    let raw_sum: f64 = industries.iter().map(Industry::raw_target).sum();
    let rescale = raw_sum > 0.0 && (raw_sum - 1.0).abs() > WEIGHT_EPSILON;

    for industry in industries.iter_mut() {
        let raw = industry.raw_target();
        industry.target_weight = if rescale { raw / raw_sum } else { raw };
        industry.active_weight = industry.target_weight - industry.benchmark_weight;
        industry.dollar_allocation =
            Decimal::from_f64(industry.target_weight).unwrap_or(Decimal::ZERO) * total_amount;
    }

    debug!(
        industry_count = industries.len(),
        raw_sum = raw_sum,
        rescaled = rescale,
        "Industry weights renormalized"
    );
}
