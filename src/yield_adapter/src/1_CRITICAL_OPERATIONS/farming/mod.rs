//! # Liquidity-Farm Adapter
//!
//! Turns the asset into staked pool liquidity: half is swapped into the pool's
//! paired asset, both legs are added to the pool, and the liquidity receipt
//! is staked in the farm.
//!
//! ## State Machine
//! `Active ⇄ Paused → EmergencyExited` (terminal). Pausing blocks deposit,
//! withdraw and harvest; rescue keeps working.
//!
//! ## Cost Basis
//! Withdrawals unstake `staked × assets ÷ cost_basis` units. The ledger is
//! incremented by accepted deposits and decremented (floored at zero) by
//! requested withdrawals. See `CostBasisLedger`.
//!
//! ## Auto-Claimed Rewards
//! The farm pays pending rewards whenever the stake changes. Those arrive in
//! the adapter's reward balance mid-operation; they are measured, journaled as
//! `RewardsCaptured` and converted by the next harvest.

mod unwind;


use std::cell::{Cell, RefCell};
use std::future::Future;
use async_trait::async_trait;
use candid::{Nat, Principal};
use futures::join;
use crate::_1_CRITICAL_OPERATIONS::adapter::{
    held_above, require_nonzero, unwind_incomplete, AdapterCore, YieldAdapter,
};
use crate::_2_CRITICAL_DATA::{farm_position_value, read_pool_position, CostBasisLedger};
use crate::_3_VENUES::{AmmRouter, Farm, TokenLedger};
use crate::_4_TRADING_EXECUTION::{
    add_liquidity_bounded, approval_cost, ensure_allowance, execute_swap, pay_out, pullable_amount,
    quote_amount_out, remove_liquidity_bounded, validate_min_output, Quote, SwapVenue,
};
use crate::_5_INFORMATIONAL::AdapterInfo;
use crate::infrastructure::{Result, AdapterError, SystemError, ValidationError, VenueError};
use crate::infrastructure::{is_zero, nat_zero, saturating_sub, reject_anonymous};
use crate::infrastructure::{AdapterConfig, AdapterOperation, FarmConfig, DEFAULT_POOL_FEE_BPS};
use crate::infrastructure::config::validate_swap_path;
use crate::infrastructure::events::AdapterEvent;
use crate::infrastructure::stable_storage::{AdapterSnapshot, FarmSnapshot};
use crate::types::{AdapterKind, CallContext, FarmState};

/// Adapter balances at the start of an operation; anything above is transient
#[derive(Debug, Clone)]
pub(crate) struct Holdings {
    pub asset: Nat,
    pub paired: Nat,
    pub lp: Nat,
    pub staked: Nat,
}

pub struct FarmAdapter<L, R, F> {
    core: AdapterCore,
    config: RefCell<FarmConfig>,
    state: Cell<FarmState>,
    cost_basis: RefCell<CostBasisLedger>,
    ledger: L,
    router: R,
    farm: F,
}

impl<L, R, F> FarmAdapter<L, R, F>
where
    L: TokenLedger,
    R: AmmRouter,
    F: Farm,
{
    pub fn new(core: AdapterCore, config: FarmConfig, ledger: L, router: R, farm: F) -> Self {
        Self {
            core,
            config: RefCell::new(config),
            state: Cell::new(FarmState::Active),
            cost_basis: RefCell::new(CostBasisLedger::default()),
            ledger,
            router,
            farm,
        }
    }

    /// Reinstate lifecycle state and cost basis after an upgrade
    pub fn with_snapshot(self, snapshot: FarmSnapshot) -> Self {
        self.state.set(snapshot.state);
        *self.cost_basis.borrow_mut() = CostBasisLedger::new(snapshot.cost_basis);
        self
    }

    pub fn core(&self) -> &AdapterCore {
        &self.core
    }

    pub fn config(&self) -> FarmConfig {
        self.config.borrow().clone()
    }

    pub fn state(&self) -> FarmState {
        self.state.get()
    }

    pub fn cost_basis(&self) -> Nat {
        self.cost_basis.borrow().total().clone()
    }

    fn require_active(&self, operation: &str) -> Result<()> {
        match self.state.get() {
            FarmState::Active => Ok(()),
            state => Err(AdapterError::System(SystemError::InvalidState {
                state: state.as_str().to_string(),
                operation: operation.to_string(),
            })),
        }
    }

    fn venue(&self, config: &FarmConfig, now: u64) -> SwapVenue<'_, L, R> {
        SwapVenue {
            ledger: &self.ledger,
            router: &self.router,
            router_id: config.router,
            self_id: self.core.self_id(),
            tolerance_bps: self.core.slippage_bps(),
            now,
        }
    }

    async fn balance(&self, token: Principal) -> Result<Nat> {
        self.ledger.balance_of(token, self.core.self_id()).await
    }

    pub(crate) async fn holdings(&self, config: &FarmConfig) -> Result<Holdings> {
        let (asset, paired, lp, staked) = join!(
            self.balance(config.asset),
            self.balance(config.paired_asset),
            self.balance(config.lp_token),
            self.farm.staked(config.pool_id, self.core.self_id()),
        );
        Ok(Holdings {
            asset: asset?,
            paired: paired?,
            lp: lp?,
            staked: staked?,
        })
    }

    /// Run a stake-changing farm call and journal any rewards it paid out
    async fn with_reward_capture<Fut>(&self, ctx: &CallContext, during: &str, call: Fut) -> Result<Nat>
    where
        Fut: Future<Output = Result<()>>,
    {
        let reward_token = self.config.borrow().reward_token;
        let before = self.balance(reward_token).await?;
        call.await?;
        let after = self.balance(reward_token).await?;

        let captured = saturating_sub(&after, &before);
        if !is_zero(&captured) {
            tracing::info!(%captured, during, "farm paid rewards as a side effect; held for next harvest");
            self.core.emit(ctx.now, AdapterEvent::RewardsCaptured {
                amount: captured.clone(),
                during: during.to_string(),
            });
        }
        Ok(captured)
    }

    /// Stake liquidity units held by the adapter. Returns the observed stake delta.
    pub(crate) async fn stake(&self, ctx: &CallContext, config: &FarmConfig, held: &Nat) -> Result<Nat> {
        let amount = pullable_amount(&self.ledger, config.lp_token, self.core.self_id(), config.farm, held).await?;
        require_nonzero(&amount, "stake")?;
        ensure_allowance(&self.ledger, config.lp_token, self.core.self_id(), config.farm, &amount, ctx.now).await?;

        let before = self.farm.staked(config.pool_id, self.core.self_id()).await?;
        self.with_reward_capture(ctx, "stake", self.farm.deposit(config.pool_id, amount.clone())).await?;
        let after = self.farm.staked(config.pool_id, self.core.self_id()).await?;

        let staked = saturating_sub(&after, &before);
        if is_zero(&staked) {
            return Err(AdapterError::Venue(VenueError::NoPositionChange {
                operation: "farm deposit".to_string(),
            }));
        }
        Ok(staked)
    }

    /// Unstake `units` from the farm
    pub(crate) async fn unstake(&self, ctx: &CallContext, config: &FarmConfig, units: &Nat) -> Result<()> {
        self.with_reward_capture(ctx, "unstake", self.farm.withdraw(config.pool_id, units.clone()))
            .await
            .map(|_| ())
    }

    /// Router allowance that lets the entry swap and the add-liquidity call
    /// both pull the asset: the two pulls together take `assets` plus two fees
    async fn entry_allowance(&self, config: &FarmConfig, assets: &Nat) -> Result<Nat> {
        let fee = self.ledger.fee(config.asset).await?;
        Ok(assets.clone() + fee)
    }

    /// Swap half, add both legs, stake. Returns the stake delta.
    async fn enter_position(&self, ctx: &CallContext, config: &FarmConfig, assets: &Nat) -> Result<Nat> {
        let venue = self.venue(config, ctx.now);
        let self_id = self.core.self_id();
        let half = assets.clone() / Nat::from(2u64);
        let primary_leg = saturating_sub(assets, &half);

        // One approval covers the swap pull and the add-liquidity pull
        let allowance = self.entry_allowance(config, assets).await?;
        ensure_allowance(&self.ledger, config.asset, self_id, config.router, &allowance, ctx.now).await?;

        // === Price the half against the pool reserves ===
        // A low router quote must not lower the floor the reserves imply
        let reserves = self.router.get_reserves(config.asset, config.paired_asset).await?;
        let pool_quote = Quote::new(
            quote_amount_out(&half, &reserves.reserve_a, &reserves.reserve_b, DEFAULT_POOL_FEE_BPS)?,
            venue.tolerance_bps,
        )?;

        // === Swap half into the paired asset ===
        let swapped = execute_swap(&venue, &[config.asset, config.paired_asset], half).await?;
        validate_min_output(&swapped.received, &pool_quote)?;
        let paired_leg =
            pullable_amount(&self.ledger, config.paired_asset, self_id, config.router, &swapped.received).await?;

        // === Add both legs ===
        let added = add_liquidity_bounded(
            &venue,
            config.asset,
            config.paired_asset,
            config.lp_token,
            primary_leg,
            paired_leg,
        )
        .await?;
        tracing::debug!(used_asset = %added.used_a, used_paired = %added.used_b, liquidity = %added.liquidity, "liquidity added");

        // === Stake ===
        self.stake(ctx, config, &added.liquidity).await
    }

    /// Unstake `units`, remove liquidity and swap the paired side back.
    /// Returns the asset held above `baseline` afterwards.
    async fn exit_position(
        &self,
        ctx: &CallContext,
        config: &FarmConfig,
        baseline: &Holdings,
        units: &Nat,
    ) -> Result<Nat> {
        let venue = self.venue(config, ctx.now);

        // === Unstake ===
        self.unstake(ctx, config, units).await?;

        // === Remove liquidity ===
        let self_id = self.core.self_id();
        let lp_held = held_above(&self.ledger, config.lp_token, self_id, &baseline.lp).await?;
        let lp_in = pullable_amount(&self.ledger, config.lp_token, self_id, config.router, &lp_held).await?;
        if !is_zero(&lp_in) {
            let removed = remove_liquidity_bounded(
                &venue,
                config.asset,
                config.paired_asset,
                config.lp_token,
                lp_in,
            )
            .await?;
            tracing::debug!(asset = %removed.received_a, paired = %removed.received_b, "liquidity removed");
        }

        // === Swap paired side back (sweeps earlier rounding dust too) ===
        let paired_balance = self.balance(config.paired_asset).await?;
        let paired_in = pullable_amount(&self.ledger, config.paired_asset, self_id, config.router, &paired_balance).await?;
        if !is_zero(&paired_in) {
            execute_swap(&venue, &[config.paired_asset, config.asset], paired_in).await?;
        }

        held_above(&self.ledger, config.asset, self_id, &baseline.asset).await
    }

    /// Send the asset held above `baseline` back to the Vault. Returns the amount observed.
    async fn return_remainder(&self, config: &FarmConfig, baseline: &Holdings) -> Result<Nat> {
        let remainder = held_above(&self.ledger, config.asset, self.core.self_id(), &baseline.asset).await?;
        if !is_zero(&remainder) {
            let refunded = pay_out(&self.ledger, config.asset, self.core.access.vault(), &remainder).await?;
            tracing::info!(%remainder, %refunded, "unused primary leg returned to vault");
        }
        Ok(remainder)
    }

    /// Exit `units`, pay the asset out, redeploy if anything fails
    async fn exit_and_pay(
        &self,
        ctx: &CallContext,
        config: &FarmConfig,
        baseline: &Holdings,
        units: &Nat,
        recipient: Principal,
    ) -> Result<Nat> {
        let received = match self.exit_position(ctx, config, baseline, units).await {
            Ok(received) => received,
            Err(cause) => return Err(self.redeploy(ctx, config, baseline, cause).await),
        };

        match pay_out(&self.ledger, config.asset, recipient, &received).await {
            Ok(delivered) => Ok(delivered),
            Err(cause) => Err(self.redeploy(ctx, config, baseline, cause).await),
        }
    }

    // ===== ADMIN =====

    pub fn pause(&self, ctx: &CallContext) -> Result<()> {
        self.core.access.require_owner(&ctx.caller)?;
        self.require_active("pause")?;

        self.state.set(FarmState::Paused);
        self.core.access.log_admin_action(ctx, "PAUSE".to_string());
        self.core.emit(ctx.now, AdapterEvent::Paused);
        Ok(())
    }

    pub fn unpause(&self, ctx: &CallContext) -> Result<()> {
        self.core.access.require_owner(&ctx.caller)?;
        if self.state.get() != FarmState::Paused {
            return Err(AdapterError::System(SystemError::InvalidState {
                state: self.state.get().as_str().to_string(),
                operation: "unpause".to_string(),
            }));
        }

        self.state.set(FarmState::Active);
        self.core.access.log_admin_action(ctx, "UNPAUSE".to_string());
        self.core.emit(ctx.now, AdapterEvent::Unpaused);
        Ok(())
    }

    /// Forced full unstake, forfeiting pending rewards. Terminal.
    ///
    /// The recovered liquidity units stay in the adapter and become rescuable.
    pub async fn emergency_exit(&self, ctx: &CallContext) -> Result<Nat> {
        let _guard = self.core.begin_owner_operation(ctx, AdapterOperation::EmergencyExit)?;
        if self.state.get() == FarmState::EmergencyExited {
            return Err(AdapterError::System(SystemError::InvalidState {
                state: FarmState::EmergencyExited.as_str().to_string(),
                operation: "emergency_exit".to_string(),
            }));
        }
        let config = self.config();

        let before = self.balance(config.lp_token).await?;
        self.farm.emergency_withdraw(config.pool_id).await?;
        let after = self.balance(config.lp_token).await?;

        let units_recovered = saturating_sub(&after, &before);
        let cost_basis_cleared = self.cost_basis.borrow_mut().clear();
        self.state.set(FarmState::EmergencyExited);

        tracing::warn!(%units_recovered, %cost_basis_cleared, "emergency exit complete; adapter is terminal");
        self.core.access.log_admin_action(ctx, format!("EMERGENCY_EXIT recovered {} units", units_recovered));
        self.core.emit(ctx.now, AdapterEvent::EmergencyExited {
            units_recovered: units_recovered.clone(),
            cost_basis_cleared,
        });
        Ok(units_recovered)
    }

    pub fn set_swap_path(&self, ctx: &CallContext, path: Vec<Principal>) -> Result<()> {
        self.core.access.require_owner(&ctx.caller)?;
        {
            let config = self.config.borrow();
            validate_swap_path(&path, &config.reward_token, &config.asset)?;
        }

        self.config.borrow_mut().reward_path = path.clone();
        self.core.access.log_admin_action(ctx, format!("SET_SWAP_PATH {:?}", path));
        self.core.emit(ctx.now, AdapterEvent::SwapPathChanged { path });
        Ok(())
    }

    /// Replace the placeholder APY figure
    pub fn set_apy_estimate(&self, ctx: &CallContext, bps: u64) -> Result<()> {
        self.core.access.require_owner(&ctx.caller)?;

        self.config.borrow_mut().apy_estimate_bps = Some(bps);
        self.core.access.log_admin_action(ctx, format!("SET_APY_ESTIMATE {} bps", bps));
        self.core.emit(ctx.now, AdapterEvent::ApyEstimateChanged { bps });
        Ok(())
    }

    /// Send a stray balance to `to`. LP units are refused until the adapter has exited.
    pub async fn rescue_token(&self, ctx: &CallContext, token: Principal, amount: Nat, to: Principal) -> Result<Nat> {
        let _guard = self.core.begin_owner_operation(ctx, AdapterOperation::Rescue)?;
        if token == self.config.borrow().lp_token && self.state.get() != FarmState::EmergencyExited {
            return Err(AdapterError::Validation(ValidationError::ProtectedToken { token }));
        }
        reject_anonymous(&to, "rescue recipient")?;
        require_nonzero(&amount, "rescue_token")?;

        let delivered = pay_out(&self.ledger, token, to, &amount).await?;

        self.core.access.log_admin_action(ctx, format!("RESCUE {} of {} -> {}", delivered, token, to));
        self.core.emit(ctx.now, AdapterEvent::TokenRescued { token, amount: delivered.clone(), to });
        Ok(delivered)
    }

    pub fn info(&self, event_count: u64) -> AdapterInfo {
        let config = self.config.borrow();
        AdapterInfo {
            kind: self.kind(),
            adapter: self.core.self_id(),
            asset: self.asset(),
            owner: self.core.access.owner(),
            vault: self.core.access.vault(),
            slippage_bps: self.core.slippage_bps(),
            reward_path: config.reward_path.clone(),
            active_operation: self.core.active_operation().map(|op| op.as_str().to_string()),
            farm_state: Some(self.state()),
            cost_basis: Some(self.cost_basis()),
            apy_estimate_bps: None,
            apy_estimate_percent: None,
            event_count,
        }
        .with_apy_estimate(config.apy_estimate_bps())
    }

    pub fn snapshot(&self) -> AdapterSnapshot {
        AdapterSnapshot {
            access: self.core.access.snapshot(),
            admin_log: self.core.access.export_log(),
            slippage_bps: self.core.slippage_bps(),
            config: AdapterConfig::Farm(self.config()),
            farm: Some(FarmSnapshot {
                state: self.state.get(),
                cost_basis: self.cost_basis(),
            }),
        }
    }
}

#[async_trait(?Send)]
impl<L, R, F> YieldAdapter for FarmAdapter<L, R, F>
where
    L: TokenLedger,
    R: AmmRouter,
    F: Farm,
{
    fn kind(&self) -> AdapterKind {
        AdapterKind::Farm
    }

    fn asset(&self) -> Principal {
        self.config.borrow().asset
    }

    async fn deposit(&self, ctx: &CallContext, assets: Nat) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Deposit)?;
        self.require_active("deposit")?;
        require_nonzero(&assets, "deposit")?;
        let config = self.config();
        let self_id = self.core.self_id();
        let vault = self.core.access.vault();

        // === STEP 1: Baselines ===
        let baseline = self.holdings(&config).await?;

        // === STEP 2: Pull From Vault ===
        // Swap and add_liquidity each pull the asset once, each paying a fee,
        // and raising the router allowance costs one more
        let allowance = self.entry_allowance(&config, &assets).await?;
        let approval = approval_cost(&self.ledger, config.asset, self_id, config.router, &allowance).await?;
        let gross = allowance + self.ledger.fee(config.asset).await? + approval;
        self.ledger.transfer_from(config.asset, vault, self_id, gross).await?;

        // === STEP 3: Enter Position ===
        let staked = match self.enter_position(ctx, &config, &assets).await {
            Ok(staked) => staked,
            Err(cause) => return Err(self.drain_to_vault(ctx, &config, &baseline, cause).await),
        };

        // === STEP 4: Return Unused Primary Leg ===
        // Accepted is only known once the remainder is observed and returned
        let remainder = match self.return_remainder(&config, &baseline).await {
            Ok(remainder) => remainder,
            Err(cause) => return Err(self.drain_to_vault(ctx, &config, &baseline, cause).await),
        };
        let accepted = saturating_sub(&assets, &remainder);

        // === STEP 5: Record ===
        self.cost_basis.borrow_mut().record_deposit(&accepted);

        tracing::info!(%assets, %accepted, %staked, cost_basis = %self.cost_basis(), "farm deposit complete");
        self.core.emit(ctx.now, AdapterEvent::Deposited {
            assets,
            accepted: accepted.clone(),
            position_delta: staked,
        });
        Ok(accepted)
    }

    async fn withdraw(&self, ctx: &CallContext, assets: Nat, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Withdraw)?;
        self.require_active("withdraw")?;
        require_nonzero(&assets, "withdraw")?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();

        // === STEP 1: Size The Exit ===
        let baseline = self.holdings(&config).await?;
        let units = self.cost_basis.borrow().units_for(&assets, &baseline.staked)?;
        if is_zero(&units) {
            tracing::info!(%assets, staked = %baseline.staked, "nothing tracked to withdraw");
            return Ok(nat_zero());
        }

        // === STEP 2: Exit And Pay ===
        let delivered = self.exit_and_pay(ctx, &config, &baseline, &units, recipient).await?;

        // === STEP 3: Record ===
        self.cost_basis.borrow_mut().record_withdrawal(&assets);
        if delivered < assets {
            tracing::info!(requested = %assets, %delivered, "partial withdrawal; vault reconciles");
        }

        tracing::info!(%units, %delivered, %recipient, cost_basis = %self.cost_basis(), "farm withdrawal complete");
        self.core.emit(ctx.now, AdapterEvent::Withdrawn {
            requested: assets,
            received: delivered.clone(),
            recipient,
        });
        Ok(delivered)
    }

    async fn withdraw_all(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::WithdrawAll)?;
        self.require_active("withdraw_all")?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();

        let baseline = self.holdings(&config).await?;
        if is_zero(&baseline.staked) {
            let cleared = self.cost_basis.borrow_mut().clear();
            if !is_zero(&cleared) {
                tracing::warn!(%cleared, "cost basis without stake cleared");
            }
            return Ok(nat_zero());
        }

        let delivered = self.exit_and_pay(ctx, &config, &baseline, &baseline.staked, recipient).await?;
        let requested = self.cost_basis.borrow_mut().clear();

        tracing::info!(units = %baseline.staked, %delivered, %recipient, "farm position fully withdrawn");
        self.core.emit(ctx.now, AdapterEvent::Withdrawn {
            requested,
            received: delivered.clone(),
            recipient,
        });
        Ok(delivered)
    }

    async fn harvest(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Harvest)?;
        self.require_active("harvest")?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();

        // === STEP 1: Claim (zero-amount deposit) ===
        let before = self.balance(config.reward_token).await?;
        self.farm.deposit(config.pool_id, nat_zero()).await?;
        let reward = self.balance(config.reward_token).await?;
        tracing::debug!(claimed = %saturating_sub(&reward, &before), held = %reward, "farm rewards claimed");

        // === STEP 2: Everything Held, Including Captured Rewards ===
        let amount_in =
            pullable_amount(&self.ledger, config.reward_token, self.core.self_id(), config.router, &reward).await?;
        if is_zero(&amount_in) {
            tracing::info!("no rewards to harvest");
            return Ok(nat_zero());
        }

        // === STEP 3: Swap Along The Reward Route ===
        // A failed swap leaves the rewards held for the next harvest
        let venue = self.venue(&config, ctx.now);
        let outcome = execute_swap(&venue, &config.reward_path, amount_in.clone()).await?;

        // === STEP 4: Forward Proceeds ===
        let proceeds = pay_out(&self.ledger, config.asset, recipient, &outcome.received)
            .await
            .map_err(|cause| unwind_incomplete(&cause, format!("{} of swap proceeds held by adapter", outcome.received)))?;

        tracing::info!(reward = %amount_in, %proceeds, %recipient, "harvest complete");
        self.core.emit(ctx.now, AdapterEvent::Harvested {
            reward: amount_in,
            proceeds: proceeds.clone(),
            recipient,
        });
        Ok(proceeds)
    }

    async fn total_underlying(&self) -> Result<Nat> {
        let config = self.config();
        let position = read_pool_position(&self.ledger, &self.router, &self.farm, &config, self.core.self_id()).await?;
        farm_position_value(&position)
    }

    async fn pending_rewards(&self) -> Result<Nat> {
        let config = self.config();
        let (pending, held) = join!(
            self.farm.pending_reward(config.pool_id, self.core.self_id()),
            self.balance(config.reward_token)
        );
        Ok(pending? + held?)
    }

    async fn estimated_apy_bps(&self) -> Result<u64> {
        Ok(self.config.borrow().apy_estimate_bps())
    }
}
