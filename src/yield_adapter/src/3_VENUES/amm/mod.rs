//! AMM router client

use async_trait::async_trait;
use candid::{Nat, Principal};
use crate::infrastructure::Result;
use crate::types::venues::{
    AddLiquidityArgs, AddLiquidityReceipt, RemoveLiquidityArgs, RemoveLiquidityReceipt,
    Reserves, SwapArgs,
};
use super::{call_failed, rejected, AmmRouter};

const VENUE: &str = "amm_router";

#[derive(Debug, Clone, Copy)]
pub struct RouterClient {
    canister: Principal,
}

impl RouterClient {
    pub fn new(canister: Principal) -> Self {
        Self { canister }
    }
}

#[async_trait(?Send)]
impl AmmRouter for RouterClient {
    async fn get_amounts_out(&self, amount_in: Nat, path: Vec<Principal>) -> Result<Vec<Nat>> {
        let (result,): (std::result::Result<Vec<Nat>, String>,) =
            ic_cdk::call(self.canister, "get_amounts_out", (amount_in, path))
                .await
                .map_err(|(code, msg)| call_failed(VENUE, "get_amounts_out", code, msg))?;
        result.map_err(|e| rejected(VENUE, "get_amounts_out", e))
    }

    async fn get_reserves(&self, token_a: Principal, token_b: Principal) -> Result<Reserves> {
        let (result,): (std::result::Result<Reserves, String>,) =
            ic_cdk::call(self.canister, "get_reserves", (token_a, token_b))
                .await
                .map_err(|(code, msg)| call_failed(VENUE, "get_reserves", code, msg))?;
        result.map_err(|e| rejected(VENUE, "get_reserves", e))
    }

    async fn swap_exact_tokens_for_tokens(&self, args: SwapArgs) -> Result<Vec<Nat>> {
        let (result,): (std::result::Result<Vec<Nat>, String>,) =
            ic_cdk::call(self.canister, "swap_exact_tokens_for_tokens", (args,))
                .await
                .map_err(|(code, msg)| call_failed(VENUE, "swap_exact_tokens_for_tokens", code, msg))?;
        result.map_err(|e| rejected(VENUE, "swap_exact_tokens_for_tokens", e))
    }

    async fn add_liquidity(&self, args: AddLiquidityArgs) -> Result<AddLiquidityReceipt> {
        let (result,): (std::result::Result<AddLiquidityReceipt, String>,) =
            ic_cdk::call(self.canister, "add_liquidity", (args,))
                .await
                .map_err(|(code, msg)| call_failed(VENUE, "add_liquidity", code, msg))?;
        result.map_err(|e| rejected(VENUE, "add_liquidity", e))
    }

    async fn remove_liquidity(&self, args: RemoveLiquidityArgs) -> Result<RemoveLiquidityReceipt> {
        let (result,): (std::result::Result<RemoveLiquidityReceipt, String>,) =
            ic_cdk::call(self.canister, "remove_liquidity", (args,))
                .await
                .map_err(|(code, msg)| call_failed(VENUE, "remove_liquidity", code, msg))?;
        result.map_err(|e| rejected(VENUE, "remove_liquidity", e))
    }
}
