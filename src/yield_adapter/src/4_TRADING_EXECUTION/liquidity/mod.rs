//! # Liquidity Module
//!
//! Adding and removing two-sided liquidity with a slippage floor on both legs.
//!
//! Minimums come from current reserves, not from the desired amounts: the
//! router only ever consumes the reserve-ratio-optimal pair, so bounding the
//! desired amounts would either be meaningless or reject every add.
//!
//! Received amounts are balance deltas, same as swaps.

use candid::{Nat, Principal};
use crate::_3_VENUES::{AmmRouter, TokenLedger};
use crate::infrastructure::{Result, AdapterError, VenueError, CalculationError};
use crate::infrastructure::{is_zero, multiply_and_divide, saturating_sub};
use crate::types::venues::{AddLiquidityArgs, RemoveLiquidityArgs};
use super::approvals::ensure_allowance;
use super::slippage::{reserve_share, validate_min_output, Quote};
use super::swaps::{swap_deadline, SwapVenue};

#[derive(Debug, Clone, PartialEq)]
pub struct AddedLiquidity {
    pub used_a: Nat,
    pub used_b: Nat,
    /// Observed liquidity-token balance delta
    pub liquidity: Nat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemovedLiquidity {
    pub received_a: Nat,
    pub received_b: Nat,
}

/// The pair a constant-product router will actually consume from `(desired_a, desired_b)`
pub fn optimal_amounts(desired_a: &Nat, desired_b: &Nat, reserve_a: &Nat, reserve_b: &Nat) -> Result<(Nat, Nat)> {
    if is_zero(reserve_a) || is_zero(reserve_b) {
        return Err(AdapterError::Calculation(CalculationError::DivisionByZero {
            operation: "optimal_amounts: empty pool".to_string(),
        }));
    }

    let optimal_b = multiply_and_divide(desired_a, reserve_b, reserve_a)?;
    if optimal_b <= *desired_b {
        return Ok((desired_a.clone(), optimal_b));
    }
    let optimal_a = multiply_and_divide(desired_b, reserve_a, reserve_b)?;
    Ok((optimal_a, desired_b.clone()))
}

/// Add up to `(desired_a, desired_b)` to the `token_a`/`token_b` pool
pub async fn add_liquidity_bounded<L, R>(
    venue: &SwapVenue<'_, L, R>,
    token_a: Principal,
    token_b: Principal,
    lp_token: Principal,
    desired_a: Nat,
    desired_b: Nat,
) -> Result<AddedLiquidity>
where
    L: TokenLedger + ?Sized,
    R: AmmRouter + ?Sized,
{
    // === STEP 1: Expected Consumption ===
    let reserves = venue.router.get_reserves(token_a, token_b).await?;
    let (expected_a, expected_b) = optimal_amounts(&desired_a, &desired_b, &reserves.reserve_a, &reserves.reserve_b)?;
    let quote_a = Quote::new(expected_a, venue.tolerance_bps)?;
    let quote_b = Quote::new(expected_b, venue.tolerance_bps)?;

    tracing::info!(
        %token_a, %token_b, %desired_a, %desired_b,
        min_a = %quote_a.minimum, min_b = %quote_b.minimum,
        "adding liquidity"
    );

    // === STEP 2: Approve Both Legs ===
    ensure_allowance(venue.ledger, token_a, venue.self_id, venue.router_id, &desired_a, venue.now).await?;
    ensure_allowance(venue.ledger, token_b, venue.self_id, venue.router_id, &desired_b, venue.now).await?;

    // === STEP 3: Execute ===
    let before = venue.ledger.balance_of(lp_token, venue.self_id).await?;
    let receipt = venue
        .router
        .add_liquidity(AddLiquidityArgs {
            token_a,
            token_b,
            amount_a_desired: desired_a,
            amount_b_desired: desired_b,
            amount_a_min: quote_a.minimum.clone(),
            amount_b_min: quote_b.minimum.clone(),
            to: venue.self_id,
            deadline: swap_deadline(venue.now),
        })
        .await?;
    let after = venue.ledger.balance_of(lp_token, venue.self_id).await?;

    // === STEP 4: Observe ===
    let liquidity = saturating_sub(&after, &before);
    if is_zero(&liquidity) {
        return Err(AdapterError::Venue(VenueError::NoPositionChange {
            operation: "add_liquidity".to_string(),
        }));
    }
    if receipt.liquidity != liquidity {
        tracing::warn!(claimed = %receipt.liquidity, %liquidity, "router reply disagrees with liquidity delta");
    }

    Ok(AddedLiquidity {
        used_a: receipt.amount_a,
        used_b: receipt.amount_b,
        liquidity,
    })
}

/// Burn `units` of liquidity for both reserves, bounded by the expected reserve share
pub async fn remove_liquidity_bounded<L, R>(
    venue: &SwapVenue<'_, L, R>,
    token_a: Principal,
    token_b: Principal,
    lp_token: Principal,
    units: Nat,
) -> Result<RemovedLiquidity>
where
    L: TokenLedger + ?Sized,
    R: AmmRouter + ?Sized,
{
    // === STEP 1: Expected Share ===
    let (reserves, supply) = futures::join!(
        venue.router.get_reserves(token_a, token_b),
        venue.ledger.total_supply(lp_token),
    );
    let (reserves, supply) = (reserves?, supply?);

    let quote_a = Quote::new(reserve_share(&units, &reserves.reserve_a, &supply)?, venue.tolerance_bps)?;
    let quote_b = Quote::new(reserve_share(&units, &reserves.reserve_b, &supply)?, venue.tolerance_bps)?;

    tracing::info!(
        %lp_token, %units,
        expected_a = %quote_a.expected, expected_b = %quote_b.expected,
        "removing liquidity"
    );

    // === STEP 2: Approve ===
    ensure_allowance(venue.ledger, lp_token, venue.self_id, venue.router_id, &units, venue.now).await?;

    // === STEP 3: Execute ===
    let (a_before, b_before) = futures::join!(
        venue.ledger.balance_of(token_a, venue.self_id),
        venue.ledger.balance_of(token_b, venue.self_id),
    );
    let (a_before, b_before) = (a_before?, b_before?);

    venue
        .router
        .remove_liquidity(RemoveLiquidityArgs {
            token_a,
            token_b,
            liquidity: units,
            amount_a_min: quote_a.minimum.clone(),
            amount_b_min: quote_b.minimum.clone(),
            to: venue.self_id,
            deadline: swap_deadline(venue.now),
        })
        .await?;

    let (a_after, b_after) = futures::join!(
        venue.ledger.balance_of(token_a, venue.self_id),
        venue.ledger.balance_of(token_b, venue.self_id),
    );

    // === STEP 4: Validate Observed Output ===
    let received_a = saturating_sub(&a_after?, &a_before);
    let received_b = saturating_sub(&b_after?, &b_before);
    validate_min_output(&received_a, &quote_a)?;
    validate_min_output(&received_b, &quote_b)?;

    Ok(RemovedLiquidity { received_a, received_b })
}
