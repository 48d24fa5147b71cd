//! Wire types for the lending market, AMM router and farm canisters

use candid::{CandidType, Deserialize, Nat, Principal};
use serde::Serialize;

/// Exact-input swap along `path`; reverts if the final output is below `amount_out_min`
#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SwapArgs {
    pub amount_in: Nat,
    pub amount_out_min: Nat,
    pub path: Vec<Principal>,
    pub to: Principal,
    pub deadline: u64,
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AddLiquidityArgs {
    pub token_a: Principal,
    pub token_b: Principal,
    pub amount_a_desired: Nat,
    pub amount_b_desired: Nat,
    pub amount_a_min: Nat,
    pub amount_b_min: Nat,
    pub to: Principal,
    pub deadline: u64,
}

/// Amounts the router actually consumed, and liquidity minted
#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AddLiquidityReceipt {
    pub amount_a: Nat,
    pub amount_b: Nat,
    pub liquidity: Nat,
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RemoveLiquidityArgs {
    pub token_a: Principal,
    pub token_b: Principal,
    pub liquidity: Nat,
    pub amount_a_min: Nat,
    pub amount_b_min: Nat,
    pub to: Principal,
    pub deadline: u64,
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RemoveLiquidityReceipt {
    pub amount_a: Nat,
    pub amount_b: Nat,
}

/// Pool reserves ordered as requested: `reserve_a` belongs to the first token asked for
#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Reserves {
    pub reserve_a: Nat,
    pub reserve_b: Nat,
}
