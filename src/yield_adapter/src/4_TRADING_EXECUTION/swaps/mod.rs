//! # Swap Execution Module
//!
//! Exact-input swaps through the AMM router along an explicit token path.
//!
//! ## Swap Flow
//! 1. Validate amount and path
//! 2. Quote the path with `get_amounts_out`
//! 3. Derive the minimum output from the tolerance
//! 4. Ensure the router may pull the input
//! 5. Execute with a forward-looking deadline, paying the adapter itself
//! 6. Measure the output-token balance delta, check it against the minimum and
//!    log the realized slippage
//!
//! The router's own reply is logged but never trusted: the adapter only
//! believes its balance.

use candid::{Nat, Principal};
use crate::_3_VENUES::{AmmRouter, TokenLedger};
use crate::infrastructure::{Result, AdapterError, TradingError};
use crate::infrastructure::{is_zero, saturating_sub};
use crate::infrastructure::config::validate_swap_path;
use crate::infrastructure::constants::SWAP_DEADLINE_NANOS;
use crate::types::venues::SwapArgs;
use super::approvals::ensure_allowance;
use super::slippage::{validate_swap_result, Quote};

/// Everything a swap needs from the calling adapter
pub struct SwapVenue<'a, L: ?Sized, R: ?Sized> {
    pub ledger: &'a L,
    pub router: &'a R,
    pub router_id: Principal,
    /// The adapter canister; pays the input and receives the output
    pub self_id: Principal,
    pub tolerance_bps: u32,
    pub now: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    pub quote: Quote,
    /// Observed output-token balance delta
    pub received: Nat,
}

pub fn swap_deadline(now: u64) -> u64 {
    now + SWAP_DEADLINE_NANOS
}

/// Swap exactly `amount_in` of `path[0]` for as much of `path[last]` as the route gives
pub async fn execute_swap<L, R>(
    venue: &SwapVenue<'_, L, R>,
    path: &[Principal],
    amount_in: Nat,
) -> Result<SwapOutcome>
where
    L: TokenLedger + ?Sized,
    R: AmmRouter + ?Sized,
{
    // === STEP 1: Validate Inputs ===
    let (token_in, token_out) = match (path.first(), path.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(AdapterError::Trading(TradingError::InvalidSwapPath {
                reason: "empty path".to_string(),
            }))
        }
    };
    validate_swap_path(path, &token_in, &token_out)?;

    if is_zero(&amount_in) {
        return Err(AdapterError::Trading(TradingError::InvalidSwapAmount {
            reason: "swap amount must be positive".to_string(),
        }));
    }

    // === STEP 2: Quote ===
    let amounts = venue.router.get_amounts_out(amount_in.clone(), path.to_vec()).await?;
    let expected = match amounts.last() {
        Some(out) if amounts.len() == path.len() && !is_zero(out) => out.clone(),
        _ => {
            return Err(AdapterError::Trading(TradingError::InvalidSwapAmount {
                reason: format!("router quoted no output for {} of {}", amount_in, token_in),
            }))
        }
    };

    // === STEP 3: Minimum Output ===
    let quote = Quote::new(expected, venue.tolerance_bps)?;

    tracing::info!(
        %token_in, %token_out, %amount_in,
        expected = %quote.expected, minimum = %quote.minimum,
        hops = path.len() - 1,
        "executing swap"
    );

    // === STEP 4: Approve ===
    ensure_allowance(venue.ledger, token_in, venue.self_id, venue.router_id, &amount_in, venue.now).await?;

    // === STEP 5: Execute ===
    let before = venue.ledger.balance_of(token_out, venue.self_id).await?;

    let reported = venue
        .router
        .swap_exact_tokens_for_tokens(SwapArgs {
            amount_in: amount_in.clone(),
            amount_out_min: quote.minimum.clone(),
            path: path.to_vec(),
            to: venue.self_id,
            deadline: swap_deadline(venue.now),
        })
        .await?;

    let after = venue.ledger.balance_of(token_out, venue.self_id).await?;

    // === STEP 6: Validate Observed Output ===
    let received = saturating_sub(&after, &before);
    if let Some(claimed) = reported.last() {
        if *claimed != received {
            tracing::warn!(%claimed, %received, "router reply disagrees with balance delta");
        }
    }

    let slippage_bps = validate_swap_result(&quote.expected, &received, venue.tolerance_bps)?;

    tracing::info!(%received, minimum = %quote.minimum, slippage_bps, "swap complete");
    Ok(SwapOutcome { quote, received })
}
