//! Lending market client
//!
//! Supply and redeem reply with a bare return code. The code is passed
//! through untouched; interpreting it is the adapter's job.

use async_trait::async_trait;
use candid::{Nat, Principal};
use crate::infrastructure::Result;
use super::{call_failed, LendingMarket};

const VENUE: &str = "lending_market";

#[derive(Debug, Clone, Copy)]
pub struct MarketClient {
    canister: Principal,
}

impl MarketClient {
    pub fn new(canister: Principal) -> Self {
        Self { canister }
    }

    async fn code_call(&self, method: &str, amount: Nat) -> Result<u64> {
        let (code,): (u64,) = ic_cdk::call(self.canister, method, (amount,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, method, code, msg))?;
        Ok(code)
    }

    async fn nat_query<A: candid::utils::ArgumentEncoder>(&self, method: &str, args: A) -> Result<Nat> {
        let (value,): (Nat,) = ic_cdk::call(self.canister, method, args)
            .await
            .map_err(|(code, msg)| call_failed(VENUE, method, code, msg))?;
        Ok(value)
    }
}

#[async_trait(?Send)]
impl LendingMarket for MarketClient {
    async fn exchange_rate_stored(&self) -> Result<Nat> {
        self.nat_query("exchange_rate_stored", ()).await
    }

    async fn supply_rate_per_second(&self) -> Result<Nat> {
        self.nat_query("supply_rate_per_second", ()).await
    }

    async fn mint(&self, amount: Nat) -> Result<u64> {
        self.code_call("mint", amount).await
    }

    async fn redeem_underlying(&self, amount: Nat) -> Result<u64> {
        self.code_call("redeem_underlying", amount).await
    }

    async fn redeem(&self, shares: Nat) -> Result<u64> {
        self.code_call("redeem", shares).await
    }

    async fn claim_rewards(&self, holder: Principal) -> Result<()> {
        let () = ic_cdk::call(self.canister, "claim_rewards", (holder,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "claim_rewards", code, msg))?;
        Ok(())
    }

    async fn accrued_rewards(&self, holder: Principal) -> Result<Nat> {
        self.nat_query("accrued_rewards", (holder,)).await
    }
}
