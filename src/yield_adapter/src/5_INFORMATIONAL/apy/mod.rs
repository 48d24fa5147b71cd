//! APY estimates
//!
//! Linear annualization of a per-second rate. No compounding, so the figure
//! understates a compounding market slightly. It is an estimate for display
//! and allocation hints, never a promised yield.

use candid::Nat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::infrastructure::{Result, multiply_and_divide};
use crate::infrastructure::math::nat_to_u64;
use crate::infrastructure::constants::{BPS_DENOMINATOR, EXCHANGE_RATE_SCALE, SECONDS_PER_YEAR};

/// `rate × SECONDS_PER_YEAR × 10_000 ÷ 1e18`, for a 1e18-scaled per-second rate
pub fn annualize_supply_rate(rate_per_second: &Nat) -> Result<u64> {
    let yearly = rate_per_second.clone() * Nat::from(SECONDS_PER_YEAR);
    let bps = multiply_and_divide(&yearly, &Nat::from(BPS_DENOMINATOR), &Nat::from(EXCHANGE_RATE_SCALE))?;
    nat_to_u64(&bps, "annualize_supply_rate")
}

/// Basis points as a percentage with two decimals (1234 -> 12.34)
pub fn bps_to_percent(bps: u64) -> Decimal {
    (Decimal::from(bps) / dec!(100)).round_dp(2)
}
