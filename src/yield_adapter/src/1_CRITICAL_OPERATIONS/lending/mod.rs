//! # Lending Adapter
//!
//! Deploys the asset into an exchange-rate lending market and holds the
//! market's share token.
//!
//! ## Flows
//! - deposit: rate sanity -> pull from Vault -> approve -> `mint` -> share delta
//! - withdraw: `redeem_underlying` -> asset delta -> payout
//! - withdraw_all: `redeem` whole share balance -> asset delta -> payout
//! - harvest: claim (this adapter only) -> swap reward along route -> payout
//!
//! The market replies with a raw return code; anything other than
//! `MARKET_SUCCESS_CODE` becomes `VenueError::NonSuccessCode` here and aborts
//! the operation. A success code with a short balance delta is not an error:
//! the observed delta is what gets forwarded.
//!
//! There is no pause state. `withdraw_all` is the exit path.


use std::cell::RefCell;
use async_trait::async_trait;
use candid::{Nat, Principal};
use futures::join;
use crate::_1_CRITICAL_OPERATIONS::adapter::{
    refund_to_vault, require_nonzero, unwind_incomplete, AdapterCore, YieldAdapter,
};
use crate::_2_CRITICAL_DATA::lending_position_value;
use crate::_3_VENUES::{AmmRouter, LendingMarket, TokenLedger};
use crate::_4_TRADING_EXECUTION::{approval_cost, ensure_allowance, execute_swap, pay_out, pullable_amount, SwapVenue};
use crate::_5_INFORMATIONAL::{annualize_supply_rate, AdapterInfo};
use crate::infrastructure::{Result, AdapterError, VenueError, ValidationError};
use crate::infrastructure::{is_zero, nat_zero, saturating_sub, reject_anonymous};
use crate::infrastructure::{AdapterConfig, AdapterOperation, LendingConfig, MARKET_SUCCESS_CODE};
use crate::infrastructure::config::validate_swap_path;
use crate::infrastructure::events::AdapterEvent;
use crate::infrastructure::stable_storage::AdapterSnapshot;
use crate::types::{AdapterKind, CallContext};

/// How a withdrawal asks the market for funds
#[derive(Debug, Clone)]
enum Redemption {
    /// `redeem_underlying(assets)`
    Underlying(Nat),
    /// `redeem(shares)`
    Shares(Nat),
}

impl Redemption {
    fn method(&self) -> &'static str {
        match self {
            Redemption::Underlying(_) => "redeem_underlying",
            Redemption::Shares(_) => "redeem",
        }
    }
}

pub struct LendingAdapter<L, M, R> {
    core: AdapterCore,
    config: RefCell<LendingConfig>,
    ledger: L,
    market: M,
    router: R,
}

/// Map a market return code into a result
fn check_market_code(operation: &str, code: u64) -> Result<()> {
    if code != MARKET_SUCCESS_CODE {
        tracing::warn!(operation, code, "market returned non-success code");
        return Err(AdapterError::Venue(VenueError::NonSuccessCode {
            operation: operation.to_string(),
            code,
        }));
    }
    Ok(())
}

impl<L, M, R> LendingAdapter<L, M, R>
where
    L: TokenLedger,
    M: LendingMarket,
    R: AmmRouter,
{
    pub fn new(core: AdapterCore, config: LendingConfig, ledger: L, market: M, router: R) -> Self {
        Self {
            core,
            config: RefCell::new(config),
            ledger,
            market,
            router,
        }
    }

    pub fn core(&self) -> &AdapterCore {
        &self.core
    }

    pub fn config(&self) -> LendingConfig {
        self.config.borrow().clone()
    }

    // ===== VENUE READS =====

    /// Stored exchange rate, rejected when degenerate
    async fn live_exchange_rate(&self) -> Result<Nat> {
        let rate = self.market.exchange_rate_stored().await?;
        if is_zero(&rate) {
            return Err(AdapterError::Venue(VenueError::DegenerateExchangeRate { rate }));
        }
        Ok(rate)
    }

    async fn balance(&self, token: Principal) -> Result<Nat> {
        self.ledger.balance_of(token, self.core.self_id()).await
    }

    /// Approve and supply `amount` of the asset already held by the adapter
    async fn supply(&self, ctx: &CallContext, config: &LendingConfig, amount: &Nat) -> Result<()> {
        ensure_allowance(&self.ledger, config.asset, self.core.self_id(), config.market, amount, ctx.now).await?;
        let code = self.market.mint(amount.clone()).await?;
        check_market_code("mint", code)
    }

    /// Redeem, measure, then pay the observed delta to `recipient`
    async fn redeem_and_pay(
        &self,
        ctx: &CallContext,
        config: &LendingConfig,
        redemption: Redemption,
        requested: Nat,
        recipient: Principal,
    ) -> Result<Nat> {
        let method = redemption.method();

        // === STEP 1: Baseline ===
        let before = self.balance(config.asset).await?;

        // === STEP 2: Redeem ===
        let code = match &redemption {
            Redemption::Underlying(assets) => self.market.redeem_underlying(assets.clone()).await?,
            Redemption::Shares(shares) => self.market.redeem(shares.clone()).await?,
        };
        check_market_code(method, code)?;

        // === STEP 3: Observe ===
        let after = self.balance(config.asset).await?;
        let received = saturating_sub(&after, &before);

        if is_zero(&received) {
            // Shares may still have been burned; the journal records the empty redemption
            tracing::warn!(method, %requested, "market reported success but paid nothing");
            self.core.emit(ctx.now, AdapterEvent::Withdrawn {
                requested,
                received: nat_zero(),
                recipient,
            });
            return Ok(nat_zero());
        }
        if received < requested {
            tracing::warn!(method, %requested, %received, "market paid less than requested; forwarding observed amount");
        }

        // === STEP 4: Payout (re-supply on failure) ===
        match pay_out(&self.ledger, config.asset, recipient, &received).await {
            Ok(delivered) => {
                tracing::info!(method, %requested, %received, %delivered, %recipient, "withdrawal complete");
                self.core.emit(ctx.now, AdapterEvent::Withdrawn {
                    requested,
                    received: delivered.clone(),
                    recipient,
                });
                Ok(delivered)
            }
            Err(cause) => {
                let resupply = async {
                    let amount = pullable_amount(
                        &self.ledger,
                        config.asset,
                        self.core.self_id(),
                        config.market,
                        &received,
                    )
                    .await?;
                    self.supply(ctx, config, &amount).await
                };
                match resupply.await {
                    Ok(()) => {
                        tracing::warn!(%cause, %received, "payout failed; redeemed funds re-supplied");
                        Err(cause)
                    }
                    Err(unwind_err) => Err(unwind_incomplete(&cause, unwind_err)),
                }
            }
        }
    }

    // ===== ADMIN =====

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

    /// Send a stray balance to `to`. The share token backs the position and is refused.
    pub async fn rescue_token(&self, ctx: &CallContext, token: Principal, amount: Nat, to: Principal) -> Result<Nat> {
        let _guard = self.core.begin_owner_operation(ctx, AdapterOperation::Rescue)?;
        if token == self.config.borrow().share_token {
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
            farm_state: None,
            cost_basis: None,
            apy_estimate_bps: None,
            apy_estimate_percent: None,
            event_count,
        }
    }

    pub fn snapshot(&self) -> AdapterSnapshot {
        AdapterSnapshot {
            access: self.core.access.snapshot(),
            admin_log: self.core.access.export_log(),
            slippage_bps: self.core.slippage_bps(),
            config: AdapterConfig::Lending(self.config()),
            farm: None,
        }
    }
}

#[async_trait(?Send)]
impl<L, M, R> YieldAdapter for LendingAdapter<L, M, R>
where
    L: TokenLedger,
    M: LendingMarket,
    R: AmmRouter,
{
    fn kind(&self) -> AdapterKind {
        AdapterKind::Lending
    }

    fn asset(&self) -> Principal {
        self.config.borrow().asset
    }

    async fn deposit(&self, ctx: &CallContext, assets: Nat) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Deposit)?;
        require_nonzero(&assets, "deposit")?;
        let config = self.config();
        let self_id = self.core.self_id();
        let vault = self.core.access.vault();

        // === STEP 1: Venue Sanity ===
        let rate = self.live_exchange_rate().await?;

        // === STEP 2: Baselines ===
        let (asset_before, shares_before) = join!(self.balance(config.asset), self.balance(config.share_token));
        let (asset_before, shares_before) = (asset_before?, shares_before?);

        // === STEP 3: Pull From Vault ===
        // The market pull costs one ledger fee on top of `assets`, plus the
        // approval fee when the market's allowance has to be raised
        let (fee, approval) = join!(
            self.ledger.fee(config.asset),
            approval_cost(&self.ledger, config.asset, self_id, config.market, &assets)
        );
        let pull = assets.clone() + fee? + approval?;
        self.ledger.transfer_from(config.asset, vault, self_id, pull).await?;

        // === STEP 4: Supply ===
        if let Err(cause) = self.supply(ctx, &config, &assets).await {
            return Err(refund_to_vault(&self.ledger, config.asset, self_id, vault, &asset_before, &assets, cause).await);
        }

        // === STEP 5: Verify Position Change ===
        let minted = match self.balance(config.share_token).await {
            Ok(after) => saturating_sub(&after, &shares_before),
            Err(e) => {
                tracing::error!(error = %e, "could not read share balance after supply");
                return Err(e);
            }
        };

        if is_zero(&minted) {
            let cause = AdapterError::Venue(VenueError::NoPositionChange { operation: "mint".to_string() });
            return Err(refund_to_vault(&self.ledger, config.asset, self_id, vault, &asset_before, &assets, cause).await);
        }

        tracing::info!(%assets, %minted, %rate, "lending deposit complete");
        self.core.emit(ctx.now, AdapterEvent::Deposited {
            assets: assets.clone(),
            accepted: assets.clone(),
            position_delta: minted,
        });
        Ok(assets)
    }

    async fn withdraw(&self, ctx: &CallContext, assets: Nat, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Withdraw)?;
        require_nonzero(&assets, "withdraw")?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();

        self.redeem_and_pay(ctx, &config, Redemption::Underlying(assets.clone()), assets, recipient).await
    }

    async fn withdraw_all(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::WithdrawAll)?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();

        let (shares, rate) = join!(self.balance(config.share_token), self.market.exchange_rate_stored());
        let shares = shares?;
        if is_zero(&shares) {
            tracing::info!("withdraw_all with no position");
            return Ok(nat_zero());
        }
        let expected = lending_position_value(&shares, &rate?)?;

        self.redeem_and_pay(ctx, &config, Redemption::Shares(shares), expected, recipient).await
    }

    async fn harvest(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat> {
        let _guard = self.core.begin_vault_operation(ctx, AdapterOperation::Harvest)?;
        reject_anonymous(&recipient, "recipient")?;
        let config = self.config();
        let self_id = self.core.self_id();

        // === STEP 1: Claim (this adapter's position only) ===
        self.market.claim_rewards(self_id).await?;

        // === STEP 2: Reward Balance ===
        let reward = self.balance(config.reward_token).await?;
        let amount_in = pullable_amount(&self.ledger, config.reward_token, self_id, config.router, &reward).await?;
        if is_zero(&amount_in) {
            tracing::info!(%reward, "no rewards to harvest");
            return Ok(nat_zero());
        }

        // === STEP 3: Swap To Asset ===
        let venue = SwapVenue {
            ledger: &self.ledger,
            router: &self.router,
            router_id: config.router,
            self_id,
            tolerance_bps: self.core.slippage_bps(),
            now: ctx.now,
        };
        // A failed swap leaves the claimed reward held for the next harvest
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
        let share_token = self.config.borrow().share_token;
        let (shares, rate) = join!(self.balance(share_token), self.market.exchange_rate_stored());
        lending_position_value(&shares?, &rate?)
    }

    async fn pending_rewards(&self) -> Result<Nat> {
        let reward_token = self.config.borrow().reward_token;
        let (accrued, held) = join!(
            self.market.accrued_rewards(self.core.self_id()),
            self.balance(reward_token)
        );
        Ok(accrued? + held?)
    }

    async fn estimated_apy_bps(&self) -> Result<u64> {
        let rate = self.market.supply_rate_per_second().await?;
        annualize_supply_rate(&rate)
    }
}
