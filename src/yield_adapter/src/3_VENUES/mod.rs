//! # External Venues
//!
//! Ports for every canister an adapter talks to, plus `ic_cdk::call` clients
//! implementing them. Adapters are generic over these traits so the same
//! logic runs against live canisters and against the in-memory test world.
//!
//! ## Architecture
//!
//! ### ledger/
//! ICRC-1/ICRC-2 token ledgers: balances, transfers, allowances.
//!
//! ### lending_market/
//! Exchange-rate lending market. `mint`/`redeem*` reply with a raw return
//! code; the adapter maps it at its boundary (`MARKET_SUCCESS_CODE`).
//!
//! ### amm/
//! Constant-product router: quotes, reserves, swaps and liquidity.
//!
//! ### farm/
//! Liquidity-receipt staking farm keyed by pool id.
//!
//! ## Error mapping
//! - transport failure (reject code) -> `VenueError::CallFailed`
//! - venue replied with an error    -> `VenueError::Rejected`

pub mod ledger;
pub mod lending_market;
pub mod amm;
pub mod farm;

use async_trait::async_trait;
use candid::{Nat, Principal};
use crate::infrastructure::{Result, AdapterError, VenueError};
use crate::types::venues::{
    AddLiquidityArgs, AddLiquidityReceipt, RemoveLiquidityArgs, RemoveLiquidityReceipt,
    Reserves, SwapArgs,
};

/// ICRC-1/2 ledger access. Mutating calls act on behalf of this canister.
#[async_trait(?Send)]
pub trait TokenLedger {
    async fn balance_of(&self, token: Principal, owner: Principal) -> Result<Nat>;
    async fn total_supply(&self, token: Principal) -> Result<Nat>;
    async fn fee(&self, token: Principal) -> Result<Nat>;
    async fn transfer(&self, token: Principal, to: Principal, amount: Nat) -> Result<Nat>;
    /// Pull `amount` from `from` using an allowance `from` granted to this canister
    async fn transfer_from(&self, token: Principal, from: Principal, to: Principal, amount: Nat) -> Result<Nat>;
    async fn allowance(&self, token: Principal, owner: Principal, spender: Principal) -> Result<Nat>;
    async fn approve(&self, token: Principal, spender: Principal, amount: Nat, expires_at: u64) -> Result<Nat>;
}

/// Exchange-rate lending market
#[async_trait(?Send)]
pub trait LendingMarket {
    /// Share -> underlying rate scaled by 1e18, without accruing interest
    async fn exchange_rate_stored(&self) -> Result<Nat>;
    /// Per-second supply rate scaled by 1e18
    async fn supply_rate_per_second(&self) -> Result<Nat>;
    async fn mint(&self, amount: Nat) -> Result<u64>;
    async fn redeem_underlying(&self, amount: Nat) -> Result<u64>;
    async fn redeem(&self, shares: Nat) -> Result<u64>;
    /// Claim rewards for `holder` only
    async fn claim_rewards(&self, holder: Principal) -> Result<()>;
    async fn accrued_rewards(&self, holder: Principal) -> Result<Nat>;
}

#[async_trait(?Send)]
pub trait AmmRouter {
    async fn get_amounts_out(&self, amount_in: Nat, path: Vec<Principal>) -> Result<Vec<Nat>>;
    async fn get_reserves(&self, token_a: Principal, token_b: Principal) -> Result<Reserves>;
    async fn swap_exact_tokens_for_tokens(&self, args: SwapArgs) -> Result<Vec<Nat>>;
    async fn add_liquidity(&self, args: AddLiquidityArgs) -> Result<AddLiquidityReceipt>;
    async fn remove_liquidity(&self, args: RemoveLiquidityArgs) -> Result<RemoveLiquidityReceipt>;
}

/// Staking farm. Depositing or withdrawing may pay out pending rewards as a side effect.
#[async_trait(?Send)]
pub trait Farm {
    /// `amount == 0` claims rewards without changing the stake
    async fn deposit(&self, pool_id: u64, amount: Nat) -> Result<()>;
    async fn withdraw(&self, pool_id: u64, amount: Nat) -> Result<()>;
    /// Return the whole stake, forfeiting pending rewards
    async fn emergency_withdraw(&self, pool_id: u64) -> Result<()>;
    async fn staked(&self, pool_id: u64, account: Principal) -> Result<Nat>;
    async fn pending_reward(&self, pool_id: u64, account: Principal) -> Result<Nat>;
}

pub(crate) fn call_failed(venue: &str, method: &str, code: ic_cdk::api::call::RejectionCode, msg: String) -> AdapterError {
    ic_cdk::println!("{}.{} call failed: {:?} - {}", venue, method, code, msg);
    AdapterError::Venue(VenueError::CallFailed {
        venue: venue.to_string(),
        method: method.to_string(),
        reason: format!("{:?}: {}", code, msg),
    })
}

pub(crate) fn rejected(venue: &str, method: &str, reason: impl std::fmt::Debug) -> AdapterError {
    ic_cdk::println!("{}.{} rejected: {:?}", venue, method, reason);
    AdapterError::Venue(VenueError::Rejected {
        venue: venue.to_string(),
        method: method.to_string(),
        reason: format!("{:?}", reason),
    })
}
