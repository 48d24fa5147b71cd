//! Staking farm client

use async_trait::async_trait;
use candid::{Nat, Principal};
use crate::infrastructure::Result;
use super::{call_failed, rejected, Farm};

const VENUE: &str = "farm";

#[derive(Debug, Clone, Copy)]
pub struct FarmClient {
    canister: Principal,
}

impl FarmClient {
    pub fn new(canister: Principal) -> Self {
        Self { canister }
    }

    async fn unit_call<A: candid::utils::ArgumentEncoder>(&self, method: &str, args: A) -> Result<()> {
        let (result,): (std::result::Result<(), String>,) = ic_cdk::call(self.canister, method, args)
            .await
            .map_err(|(code, msg)| call_failed(VENUE, method, code, msg))?;
        result.map_err(|e| rejected(VENUE, method, e))
    }

    async fn nat_query(&self, method: &str, pool_id: u64, account: Principal) -> Result<Nat> {
        let (value,): (Nat,) = ic_cdk::call(self.canister, method, (pool_id, account))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, method, code, msg))?;
        Ok(value)
    }
}

#[async_trait(?Send)]
impl Farm for FarmClient {
    async fn deposit(&self, pool_id: u64, amount: Nat) -> Result<()> {
        self.unit_call("deposit", (pool_id, amount)).await
    }

    async fn withdraw(&self, pool_id: u64, amount: Nat) -> Result<()> {
        self.unit_call("withdraw", (pool_id, amount)).await
    }

    async fn emergency_withdraw(&self, pool_id: u64) -> Result<()> {
        self.unit_call("emergency_withdraw", (pool_id,)).await
    }

    async fn staked(&self, pool_id: u64, account: Principal) -> Result<Nat> {
        self.nat_query("staked", pool_id, account).await
    }

    async fn pending_reward(&self, pool_id: u64, account: Principal) -> Result<Nat> {
        self.nat_query("pending_reward", pool_id, account).await
    }
}
