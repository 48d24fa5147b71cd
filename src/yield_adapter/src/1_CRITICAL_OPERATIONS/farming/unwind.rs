//! Farm unwinding
//!
//! A failed deposit drains everything it created back into the asset and
//! refunds the Vault. A failed withdrawal puts whatever it pulled out back
//! into the farm, leaving the cost basis untouched.

use candid::Nat;
use crate::_1_CRITICAL_OPERATIONS::adapter::{held_above, refund_to_vault, unwind_incomplete};
use crate::_3_VENUES::{AmmRouter, Farm, TokenLedger};
use crate::_4_TRADING_EXECUTION::{add_liquidity_bounded, execute_swap, pullable_amount, remove_liquidity_bounded};
use crate::infrastructure::{Result, AdapterError, FarmConfig};
use crate::infrastructure::{is_zero, nat_zero, saturating_sub};
use crate::types::CallContext;
use super::{FarmAdapter, Holdings};

impl<L, R, F> FarmAdapter<L, R, F>
where
    L: TokenLedger,
    R: AmmRouter,
    F: Farm,
{
    /// Undo a partial deposit: unstake, remove, swap back, refund
    pub(super) async fn drain_to_vault(
        &self,
        ctx: &CallContext,
        config: &FarmConfig,
        baseline: &Holdings,
        cause: AdapterError,
    ) -> AdapterError {
        tracing::warn!(%cause, "deposit failed; draining transient position");

        if let Err(unwind_err) = self.drain_to_asset(ctx, config, baseline).await {
            return unwind_incomplete(&cause, unwind_err);
        }

        // Swap costs make a full refund impossible once the entry swap ran
        refund_to_vault(
            &self.ledger,
            config.asset,
            self.core.self_id(),
            self.core.access.vault(),
            &baseline.asset,
            &nat_zero(),
            cause,
        )
        .await
    }

    async fn drain_to_asset(&self, ctx: &CallContext, config: &FarmConfig, baseline: &Holdings) -> Result<()> {
        let venue = self.venue(config, ctx.now);
        let self_id = self.core.self_id();

        let staked = self.farm.staked(config.pool_id, self_id).await?;
        let staked_delta = saturating_sub(&staked, &baseline.staked);
        if !is_zero(&staked_delta) {
            self.unstake(ctx, config, &staked_delta).await?;
        }

        let lp_held = held_above(&self.ledger, config.lp_token, self_id, &baseline.lp).await?;
        let lp_in = pullable_amount(&self.ledger, config.lp_token, self_id, config.router, &lp_held).await?;
        if !is_zero(&lp_in) {
            remove_liquidity_bounded(&venue, config.asset, config.paired_asset, config.lp_token, lp_in).await?;
        }

        let paired_held = held_above(&self.ledger, config.paired_asset, self_id, &baseline.paired).await?;
        let paired_in = pullable_amount(&self.ledger, config.paired_asset, self_id, config.router, &paired_held).await?;
        if !is_zero(&paired_in) {
            execute_swap(&venue, &[config.paired_asset, config.asset], paired_in).await?;
        }
        Ok(())
    }

    /// Undo a partial withdrawal: rebalance, add liquidity, restake
    pub(super) async fn redeploy(
        &self,
        ctx: &CallContext,
        config: &FarmConfig,
        baseline: &Holdings,
        cause: AdapterError,
    ) -> AdapterError {
        tracing::warn!(%cause, "withdrawal failed; redeploying transient balances");

        match self.redeploy_held(ctx, config, baseline).await {
            Ok(restaked) => {
                tracing::warn!(%restaked, "transient balances restaked");
                cause
            }
            Err(unwind_err) => unwind_incomplete(&cause, unwind_err),
        }
    }

    async fn redeploy_held(&self, ctx: &CallContext, config: &FarmConfig, baseline: &Holdings) -> Result<Nat> {
        let venue = self.venue(config, ctx.now);
        let self_id = self.core.self_id();

        let asset_held = held_above(&self.ledger, config.asset, self_id, &baseline.asset).await?;
        let paired_held = held_above(&self.ledger, config.paired_asset, self_id, &baseline.paired).await?;

        // One-sided balance: swap half to the other side
        let half_swap = match (is_zero(&asset_held), is_zero(&paired_held)) {
            (false, true) => Some((config.asset, config.paired_asset, asset_held / Nat::from(2u64))),
            (true, false) => Some((config.paired_asset, config.asset, paired_held / Nat::from(2u64))),
            _ => None,
        };
        if let Some((from, to, half)) = half_swap {
            let amount_in = pullable_amount(&self.ledger, from, self_id, config.router, &half).await?;
            if !is_zero(&amount_in) {
                execute_swap(&venue, &[from, to], amount_in).await?;
            }
        }

        let asset_held = held_above(&self.ledger, config.asset, self_id, &baseline.asset).await?;
        let paired_held = held_above(&self.ledger, config.paired_asset, self_id, &baseline.paired).await?;
        let asset_leg = pullable_amount(&self.ledger, config.asset, self_id, config.router, &asset_held).await?;
        let paired_leg = pullable_amount(&self.ledger, config.paired_asset, self_id, config.router, &paired_held).await?;
        if !is_zero(&asset_leg) && !is_zero(&paired_leg) {
            add_liquidity_bounded(&venue, config.asset, config.paired_asset, config.lp_token, asset_leg, paired_leg).await?;
        }

        let lp_held = held_above(&self.ledger, config.lp_token, self_id, &baseline.lp).await?;
        if is_zero(&lp_held) {
            return Ok(nat_zero());
        }
        self.stake(ctx, config, &lp_held).await
    }
}
