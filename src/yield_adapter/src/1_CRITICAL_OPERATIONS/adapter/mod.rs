//! # Adapter Contract
//!
//! The uniform interface the Vault drives, and the pieces every adapter shares:
//! authorization, the per-adapter lock, the event journal and the slippage
//! tolerance.
//!
//! ## Unwinding
//! Each mutating operation records the adapter's balance of every token it
//! touches before it starts. If a later step fails, anything above those
//! baselines is transient and is returned to where it came from. When the
//! return itself fails the caller gets `UnwindIncomplete` carrying both errors.

use std::cell::Cell;
use std::rc::Rc;
use async_trait::async_trait;
use candid::{Nat, Principal};
use crate::_3_VENUES::TokenLedger;
use crate::_4_TRADING_EXECUTION::pay_out;
use crate::infrastructure::{Result, AdapterError, SystemError, ValidationError};
use crate::infrastructure::{is_zero, saturating_sub};
use crate::infrastructure::{AccessControl, AdapterOperation, OperationGuard, ReentrancyLock};
use crate::infrastructure::config::validate_tolerance;
use crate::infrastructure::events::{AdapterEvent, EventSink};
use crate::types::{AdapterKind, CallContext};

/// What the Vault sees of any strategy
///
/// Mutating calls are Vault-only and return the amount that actually moved,
/// measured from balance deltas. Views never mutate and never pay out.
#[async_trait(?Send)]
pub trait YieldAdapter {
    fn kind(&self) -> AdapterKind;

    /// The asset the Vault deposits and receives back
    fn asset(&self) -> Principal;

    /// Pull `assets` from the Vault and deploy them. Returns the amount accepted.
    async fn deposit(&self, ctx: &CallContext, assets: Nat) -> Result<Nat>;

    /// Return roughly `assets` of value to `recipient`. Returns what was delivered.
    async fn withdraw(&self, ctx: &CallContext, assets: Nat, recipient: Principal) -> Result<Nat>;

    /// Unwind the whole position to `recipient`
    async fn withdraw_all(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat>;

    /// Claim rewards, swap them to the asset and send the proceeds to `recipient`
    async fn harvest(&self, ctx: &CallContext, recipient: Principal) -> Result<Nat>;

    /// Current value of the position in asset units
    async fn total_underlying(&self) -> Result<Nat>;

    /// Claimable plus already-claimed reward tokens, in reward units
    async fn pending_rewards(&self) -> Result<Nat>;

    async fn estimated_apy_bps(&self) -> Result<u64>;
}

/// State every adapter carries regardless of strategy
pub struct AdapterCore {
    self_id: Principal,
    pub access: AccessControl,
    lock: ReentrancyLock,
    events: Rc<dyn EventSink>,
    slippage_bps: Cell<u32>,
}

impl AdapterCore {
    pub fn new(self_id: Principal, access: AccessControl, slippage_bps: u32, events: Rc<dyn EventSink>) -> Self {
        Self {
            self_id,
            access,
            lock: ReentrancyLock::new(),
            events,
            slippage_bps: Cell::new(slippage_bps),
        }
    }

    /// The adapter canister itself
    pub fn self_id(&self) -> Principal {
        self.self_id
    }

    pub fn slippage_bps(&self) -> u32 {
        self.slippage_bps.get()
    }

    pub fn active_operation(&self) -> Option<AdapterOperation> {
        self.lock.current()
    }

    /// Vault-only entry point: authorize, then take the adapter lock
    pub fn begin_vault_operation(&self, ctx: &CallContext, op: AdapterOperation) -> Result<OperationGuard<'_>> {
        self.access.require_vault(&ctx.caller)?;
        self.lock.acquire(op)
    }

    /// Owner-only entry point for operations that move funds
    pub fn begin_owner_operation(&self, ctx: &CallContext, op: AdapterOperation) -> Result<OperationGuard<'_>> {
        self.access.require_owner(&ctx.caller)?;
        self.lock.acquire(op)
    }

    pub fn emit(&self, now: u64, event: AdapterEvent) -> u64 {
        self.events.record(now, event)
    }

    pub fn set_vault(&self, ctx: &CallContext, new_vault: Principal) -> Result<()> {
        let previous = self.access.set_vault(ctx, new_vault)?;
        self.emit(ctx.now, AdapterEvent::VaultChanged { previous, current: new_vault });
        Ok(())
    }

    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: Principal) -> Result<()> {
        let previous = self.access.transfer_ownership(ctx, new_owner)?;
        self.emit(ctx.now, AdapterEvent::OwnershipTransferred { previous, current: new_owner });
        Ok(())
    }

    pub fn set_slippage_tolerance(&self, ctx: &CallContext, bps: u32) -> Result<()> {
        self.access.require_owner(&ctx.caller)?;
        validate_tolerance(bps)?;

        let previous_bps = self.slippage_bps.replace(bps);
        self.access.log_admin_action(ctx, format!("SET_SLIPPAGE {} -> {} bps", previous_bps, bps));
        self.emit(ctx.now, AdapterEvent::SlippageToleranceChanged { previous_bps, current_bps: bps });
        Ok(())
    }
}

pub(crate) fn require_nonzero(amount: &Nat, operation: &str) -> Result<()> {
    if is_zero(amount) {
        return Err(AdapterError::Validation(ValidationError::ZeroAmount {
            operation: operation.to_string(),
        }));
    }
    Ok(())
}

/// Balance of `token` above `baseline`
pub(crate) async fn held_above<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    owner: Principal,
    baseline: &Nat,
) -> Result<Nat> {
    let balance = ledger.balance_of(token, owner).await?;
    Ok(saturating_sub(&balance, baseline))
}

pub(crate) fn unwind_incomplete(cause: &AdapterError, unwind_error: impl std::fmt::Display) -> AdapterError {
    tracing::error!(%cause, %unwind_error, "unwind incomplete; funds need owner attention");
    AdapterError::System(SystemError::UnwindIncomplete {
        cause: cause.to_string(),
        unwind_error: unwind_error.to_string(),
    })
}

/// Send everything held above `baseline` back to the Vault after `cause`
///
/// Returns the error the caller should surface: `cause` itself when at least
/// `expected` was returned, `UnwindIncomplete` otherwise. A short balance is
/// still returned before reporting.
pub(crate) async fn refund_to_vault<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    self_id: Principal,
    vault: Principal,
    baseline: &Nat,
    expected: &Nat,
    cause: AdapterError,
) -> AdapterError {
    let held = match held_above(ledger, token, self_id, baseline).await {
        Ok(held) => held,
        Err(e) => return unwind_incomplete(&cause, e),
    };

    let refunded = match pay_out(ledger, token, vault, &held).await {
        Ok(refunded) => refunded,
        Err(refund_err) => return unwind_incomplete(&cause, refund_err),
    };

    if held < *expected {
        return unwind_incomplete(
            &cause,
            format!("only {} of {} {} was still held; refunded {}", held, expected, token, refunded),
        );
    }

    tracing::warn!(%cause, %token, %refunded, "operation failed; transient balance refunded to vault");
    cause
}
