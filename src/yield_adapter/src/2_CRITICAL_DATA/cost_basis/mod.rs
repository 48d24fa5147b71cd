//! Cost-basis ledger for the farm adapter
//!
//! Running total of asset value accepted into the farm position. It is an
//! accounting device for proportional withdrawal, not a valuation: a request
//! for `assets` unstakes `staked × assets ÷ total` liquidity units.
//!
//! Withdrawals larger than the remaining total floor it at zero. Repeated
//! partial exits can therefore drift from the real position; the floor hides
//! that drift rather than failing the withdrawal.

use candid::{CandidType, Deserialize, Nat};
use crate::infrastructure::{Result, multiply_and_divide, saturating_sub, is_zero, nat_zero};

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CostBasisLedger {
    total: Nat,
}

impl CostBasisLedger {
    pub fn new(total: Nat) -> Self {
        Self { total }
    }

    pub fn total(&self) -> &Nat {
        &self.total
    }

    pub fn is_empty(&self) -> bool {
        is_zero(&self.total)
    }

    pub fn record_deposit(&mut self, accepted: &Nat) {
        self.total = self.total.clone() + accepted.clone();
    }

    /// Decrease by `assets`, flooring at zero. Returns the amount actually removed.
    pub fn record_withdrawal(&mut self, assets: &Nat) -> Nat {
        let remaining = saturating_sub(&self.total, assets);
        let removed = saturating_sub(&self.total, &remaining);
        if *assets > self.total {
            tracing::warn!(requested = %assets, tracked = %self.total, "withdrawal exceeds cost basis; flooring at zero");
        }
        self.total = remaining;
        removed
    }

    /// Zero the ledger, returning what it held
    pub fn clear(&mut self) -> Nat {
        std::mem::replace(&mut self.total, nat_zero())
    }

    /// Liquidity units to unstake for `assets`, clamped to `staked`
    pub fn units_for(&self, assets: &Nat, staked: &Nat) -> Result<Nat> {
        if self.is_empty() {
            return Ok(nat_zero());
        }
        let units = multiply_and_divide(staked, assets, &self.total)?;
        Ok(if units > *staked { staked.clone() } else { units })
    }
}
