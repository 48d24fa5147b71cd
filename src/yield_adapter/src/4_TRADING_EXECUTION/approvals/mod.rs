//! # ICRC-2 Approval Module
//!
//! Venues pull tokens from the adapter with `icrc2_transfer_from`, so every
//! pull needs an allowance. There are no standing approvals: before each pull
//! the current allowance is read and, only if short, replaced with exactly the
//! amount the pull needs.
//!
//! ## Approval Flow
//! 1. Read allowance (expired allowances read as zero)
//! 2. If it already covers `amount + fee`, stop
//! 3. Otherwise approve exactly `amount + fee`, valid for 15 minutes
//!
//! ## Fees
//! `icrc2_approve` charges the ledger fee to the approver, so a pull out of a
//! held balance can cost two fees: one for the approval, one for the pull.
//! `approval_cost` and `pullable_amount` let callers budget for both before
//! anything moves.

use candid::{Nat, Principal};
use crate::_3_VENUES::TokenLedger;
use futures::join;
use crate::infrastructure::{Result, AdapterError, TradingError};
use crate::infrastructure::{nat_zero, saturating_sub};
use crate::infrastructure::constants::APPROVAL_EXPIRY_NANOS;

/// Fee `ensure_allowance` would pay to let `spender` pull `amount`; zero when
/// the current allowance already covers it
pub async fn approval_cost<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    owner: Principal,
    spender: Principal,
    amount: &Nat,
) -> Result<Nat> {
    let (fee, current) = join!(ledger.fee(token), ledger.allowance(token, owner, spender));
    let (fee, current) = (fee?, current?);

    if current >= amount.clone() + fee.clone() {
        Ok(nat_zero())
    } else {
        Ok(fee)
    }
}

/// Largest amount `spender` can pull out of `held`, after the pull fee and,
/// if the allowance is short, the approval fee
pub async fn pullable_amount<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    owner: Principal,
    spender: Principal,
    held: &Nat,
) -> Result<Nat> {
    let fee = ledger.fee(token).await?;
    let net = saturating_sub(held, &fee);
    let approval = approval_cost(ledger, token, owner, spender, &net).await?;
    Ok(saturating_sub(&net, &approval))
}

/// Make sure `spender` may pull `amount` of `token` from `owner`
///
/// ICRC-2 debits `amount + fee` from the allowance on every `transfer_from`,
/// so the fee is folded into the approval. Returns whether an approval was
/// sent (and its fee paid).
pub async fn ensure_allowance<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    owner: Principal,
    spender: Principal,
    amount: &Nat,
    now: u64,
) -> Result<bool> {
    let fee = ledger.fee(token).await?;
    let needed = amount.clone() + fee;

    let current = ledger.allowance(token, owner, spender).await?;
    if current >= needed {
        tracing::debug!(%token, %spender, %current, %needed, "allowance sufficient");
        return Ok(false);
    }

    tracing::debug!(%token, %spender, %needed, "approving exact allowance");

    ledger
        .approve(token, spender, needed.clone(), now + APPROVAL_EXPIRY_NANOS)
        .await
        .map_err(|e| AdapterError::Trading(TradingError::ApprovalFailed {
            token,
            amount: needed,
            reason: e.to_string(),
        }))?;

    Ok(true)
}
