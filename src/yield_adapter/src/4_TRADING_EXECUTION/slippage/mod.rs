//! # Slippage Protection Module
//!
//! Pure quote math. Every swap and liquidity operation derives a minimum
//! acceptable output here before it touches a venue, and checks the observed
//! balance delta against that minimum afterwards.
//!
//! ## Key Functions
//! - `min_output`: `expected × (10_000 − tolerance) ÷ 10_000`, rounded down
//! - `quote_amount_out`: constant-product output after the pool fee
//! - `reserve_share`: pro-rata slice of a pool reserve for a liquidity amount
//! - `validate_min_output` / `validate_swap_result`: post-trade checks
//!
//! ## Safety Checks
//! - Minimum never exceeds expected (rounding is always down)
//! - Positive slippage (getting more than expected) is allowed
//! - Zero expected amounts are rejected

use candid::Nat;
use num_traits::ToPrimitive;
use crate::infrastructure::{Result, AdapterError, TradingError, CalculationError};
use crate::infrastructure::{multiply_and_divide, is_zero, BPS_DENOMINATOR};
use crate::infrastructure::config::validate_tolerance;

/// Expected output and the floor we will accept, computed together
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub expected: Nat,
    pub minimum: Nat,
}

impl Quote {
    pub fn new(expected: Nat, tolerance_bps: u32) -> Result<Self> {
        let minimum = min_output(&expected, tolerance_bps)?;
        Ok(Self { expected, minimum })
    }
}

/// Minimum acceptable output for a tolerance in basis points
///
/// ## Example
/// - Expected: 48_000_000
/// - Tolerance: 500 bps (5%)
/// - Result: 45_600_000
pub fn min_output(expected: &Nat, tolerance_bps: u32) -> Result<Nat> {
    validate_tolerance(tolerance_bps)?;
    let keep = BPS_DENOMINATOR - tolerance_bps as u64;
    multiply_and_divide(expected, &Nat::from(keep), &Nat::from(BPS_DENOMINATOR))
}

/// Constant-product output for `amount_in` against `(reserve_in, reserve_out)`
///
/// `out = in·(1−fee)·reserve_out ÷ (reserve_in + in·(1−fee))`, rounded down.
pub fn quote_amount_out(amount_in: &Nat, reserve_in: &Nat, reserve_out: &Nat, fee_bps: u32) -> Result<Nat> {
    if is_zero(reserve_in) || is_zero(reserve_out) {
        return Err(AdapterError::Calculation(CalculationError::DivisionByZero {
            operation: "quote_amount_out: empty pool".to_string(),
        }));
    }
    if fee_bps as u64 >= BPS_DENOMINATOR {
        return Err(AdapterError::Trading(TradingError::InvalidSwapAmount {
            reason: format!("pool fee {} bps leaves no output", fee_bps),
        }));
    }

    let in_with_fee = amount_in.clone() * Nat::from(BPS_DENOMINATOR - fee_bps as u64);
    let denominator = reserve_in.clone() * Nat::from(BPS_DENOMINATOR) + in_with_fee.clone();
    multiply_and_divide(&in_with_fee, reserve_out, &denominator)
}

/// Share of `reserve` owned by `units` out of `total_supply` liquidity units
pub fn reserve_share(units: &Nat, reserve: &Nat, total_supply: &Nat) -> Result<Nat> {
    multiply_and_divide(units, reserve, total_supply)
}

/// Fail unless `actual` reached the quote's minimum
pub fn validate_min_output(actual: &Nat, quote: &Quote) -> Result<()> {
    if *actual < quote.minimum {
        return Err(AdapterError::Trading(TradingError::SlippageExceeded {
            expected: quote.expected.clone(),
            minimum: quote.minimum.clone(),
            actual: actual.clone(),
        }));
    }
    Ok(())
}

/// Validate a realized swap and report its slippage in basis points (0 if positive)
pub fn validate_swap_result(expected: &Nat, actual: &Nat, tolerance_bps: u32) -> Result<u64> {
    if is_zero(expected) {
        return Err(AdapterError::Trading(TradingError::InvalidSwapAmount {
            reason: "Expected amount cannot be zero".to_string(),
        }));
    }

    let quote = Quote::new(expected.clone(), tolerance_bps)?;
    validate_min_output(actual, &quote)?;

    if actual >= expected {
        tracing::debug!(%expected, %actual, "positive slippage");
        return Ok(0);
    }

    let shortfall = expected.clone() - actual.clone();
    let realized = multiply_and_divide(&shortfall, &Nat::from(BPS_DENOMINATOR), expected)?;
    let realized_bps = realized.0.to_u64().unwrap_or(u64::MAX);

    tracing::debug!(realized_bps, tolerance_bps, "slippage acceptable");
    Ok(realized_bps)
}
