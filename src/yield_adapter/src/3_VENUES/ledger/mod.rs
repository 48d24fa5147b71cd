//! ICRC ledger client

use async_trait::async_trait;
use candid::{Nat, Principal};
use serde_bytes::ByteBuf;
use crate::infrastructure::Result;
use crate::infrastructure::constants::LEDGER_MEMO;
use crate::types::icrc::{
    Account, Allowance, AllowanceArgs, ApproveArgs, ApproveResult, TransferArgs,
    TransferFromArgs, TransferFromResult, TransferResult,
};
use super::{call_failed, rejected, TokenLedger};

const VENUE: &str = "ledger";

/// Calls any ICRC-1/2 ledger; the token principal selects the canister
#[derive(Debug, Clone, Copy, Default)]
pub struct IcrcLedger;

#[async_trait(?Send)]
impl TokenLedger for IcrcLedger {
    async fn balance_of(&self, token: Principal, owner: Principal) -> Result<Nat> {
        let (balance,): (Nat,) = ic_cdk::call(token, "icrc1_balance_of", (Account::from(owner),))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc1_balance_of", code, msg))?;
        Ok(balance)
    }

    async fn total_supply(&self, token: Principal) -> Result<Nat> {
        let (supply,): (Nat,) = ic_cdk::call(token, "icrc1_total_supply", ())
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc1_total_supply", code, msg))?;
        Ok(supply)
    }

    async fn fee(&self, token: Principal) -> Result<Nat> {
        let (fee,): (Nat,) = ic_cdk::call(token, "icrc1_fee", ())
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc1_fee", code, msg))?;
        Ok(fee)
    }

    async fn transfer(&self, token: Principal, to: Principal, amount: Nat) -> Result<Nat> {
        let args = TransferArgs {
            from_subaccount: None,
            to: Account::from(to),
            amount,
            fee: None,
            memo: Some(ByteBuf::from(LEDGER_MEMO)),
            created_at_time: Some(ic_cdk::api::time()),
        };

        let (result,): (TransferResult,) = ic_cdk::call(token, "icrc1_transfer", (args,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc1_transfer", code, msg))?;

        match result {
            TransferResult::Ok(block) => Ok(block),
            TransferResult::Err(e) => Err(rejected(VENUE, "icrc1_transfer", e)),
        }
    }

    async fn transfer_from(&self, token: Principal, from: Principal, to: Principal, amount: Nat) -> Result<Nat> {
        let args = TransferFromArgs {
            spender_subaccount: None,
            from: Account::from(from),
            to: Account::from(to),
            amount,
            fee: None,
            memo: Some(ByteBuf::from(LEDGER_MEMO)),
            created_at_time: Some(ic_cdk::api::time()),
        };

        let (result,): (TransferFromResult,) = ic_cdk::call(token, "icrc2_transfer_from", (args,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc2_transfer_from", code, msg))?;

        match result {
            TransferFromResult::Ok(block) => Ok(block),
            TransferFromResult::Err(e) => Err(rejected(VENUE, "icrc2_transfer_from", e)),
        }
    }

    async fn allowance(&self, token: Principal, owner: Principal, spender: Principal) -> Result<Nat> {
        let args = AllowanceArgs {
            account: Account::from(owner),
            spender: Account::from(spender),
        };

        let (allowance,): (Allowance,) = ic_cdk::call(token, "icrc2_allowance", (args,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc2_allowance", code, msg))?;

        // An expired allowance is no allowance
        match allowance.expires_at {
            Some(expiry) if expiry <= ic_cdk::api::time() => Ok(Nat::from(0u64)),
            _ => Ok(allowance.allowance),
        }
    }

    async fn approve(&self, token: Principal, spender: Principal, amount: Nat, expires_at: u64) -> Result<Nat> {
        let args = ApproveArgs {
            from_subaccount: None,
            spender: Account::from(spender),
            amount,
            expected_allowance: None,
            expires_at: Some(expires_at),
            fee: None,
            memo: Some(ByteBuf::from(LEDGER_MEMO)),
            created_at_time: Some(ic_cdk::api::time()),
        };

        let (result,): (ApproveResult,) = ic_cdk::call(token, "icrc2_approve", (args,))
            .await
            .map_err(|(code, msg)| call_failed(VENUE, "icrc2_approve", code, msg))?;

        match result {
            ApproveResult::Ok(block) => Ok(block),
            ApproveResult::Err(e) => Err(rejected(VENUE, "icrc2_approve", e)),
        }
    }
}
