//! Yield Adapter - Security-First Architecture with Numbered Zones
//!
//! One canister hosts one adapter: a lending-market strategy or a
//! liquidity-farm strategy, chosen by the init argument. Only the Vault moves
//! capital; the owner administers.
//!
//! Architecture:
//! 1_CRITICAL_OPERATIONS - Deposit, withdraw, harvest, unwind (highest security)
//! 2_CRITICAL_DATA - Position valuation, cost basis
//! 3_VENUES - Ledger, market, router and farm ports + canister clients
//! 4_TRADING_EXECUTION - Swaps, liquidity, approvals, payouts
//! 5_INFORMATIONAL - APY and adapter info
//! 6_INFRASTRUCTURE - Math, errors, constants, config, events, storage

// Import numbered modules with explicit paths
#[path = "1_CRITICAL_OPERATIONS/mod.rs"]
mod critical_operations_1;
use critical_operations_1 as _1_CRITICAL_OPERATIONS;

#[path = "2_CRITICAL_DATA/mod.rs"]
mod critical_data_2;
use critical_data_2 as _2_CRITICAL_DATA;

#[path = "3_VENUES/mod.rs"]
mod venues_3;
use venues_3 as _3_VENUES;

#[path = "4_TRADING_EXECUTION/mod.rs"]
mod trading_execution_4;
use trading_execution_4 as _4_TRADING_EXECUTION;

#[path = "5_INFORMATIONAL/mod.rs"]
mod informational_5;
use informational_5 as _5_INFORMATIONAL;

#[path = "6_INFRASTRUCTURE/mod.rs"]
mod infrastructure_6;
use infrastructure_6 as infrastructure;

mod types;

#[cfg(test)]
mod testkit;

use std::cell::RefCell;
use std::rc::Rc;
use candid::{candid_method, Nat, Principal};
use ic_cdk::{init, pre_upgrade, post_upgrade, query, update};
use _1_CRITICAL_OPERATIONS::{AdapterCore, FarmAdapter, LendingAdapter, YieldAdapter};
use _3_VENUES::amm::RouterClient;
use _3_VENUES::farm::FarmClient;
use _3_VENUES::ledger::IcrcLedger;
use _3_VENUES::lending_market::MarketClient;
use _5_INFORMATIONAL::AdapterInfo;
use infrastructure::{Result, AdapterError, SystemError, ValidationError};
use infrastructure::{AccessControl, AdapterConfig, AdapterInitArgs, AdminAction, EventJournal, EventRecord};
use infrastructure::stable_storage::{events_memory, restore_snapshot, save_snapshot, CanisterMemory, FarmSnapshot};
use types::CallContext;

type LiveLending = LendingAdapter<IcrcLedger, MarketClient, RouterClient>;
type LiveFarm = FarmAdapter<IcrcLedger, RouterClient, FarmClient>;

#[derive(Clone)]
enum InstalledAdapter {
    Lending(Rc<LiveLending>),
    Farm(Rc<LiveFarm>),
}

impl InstalledAdapter {
    fn strategy(&self) -> &dyn YieldAdapter {
        match self {
            InstalledAdapter::Lending(adapter) => adapter.as_ref(),
            InstalledAdapter::Farm(adapter) => adapter.as_ref(),
        }
    }

    fn core(&self) -> &AdapterCore {
        match self {
            InstalledAdapter::Lending(adapter) => adapter.core(),
            InstalledAdapter::Farm(adapter) => adapter.core(),
        }
    }

    fn farm(&self, operation: &str) -> Result<Rc<LiveFarm>> {
        match self {
            InstalledAdapter::Farm(adapter) => Ok(adapter.clone()),
            InstalledAdapter::Lending(_) => Err(AdapterError::Validation(ValidationError::UnsupportedOperation {
                operation: operation.to_string(),
                adapter: "lending".to_string(),
            })),
        }
    }
}

thread_local! {
    static EVENTS: Rc<EventJournal<CanisterMemory>> = Rc::new(EventJournal::init(events_memory()));
    static ADAPTER: RefCell<Option<InstalledAdapter>> = const { RefCell::new(None) };
}

fn installed() -> Result<InstalledAdapter> {
    ADAPTER
        .with(|a| a.borrow().clone())
        .ok_or(AdapterError::System(SystemError::NotInitialized))
}

fn context() -> CallContext {
    CallContext::new(ic_cdk::caller(), ic_cdk::api::time())
}

fn event_count() -> u64 {
    EVENTS.with(|e| e.len())
}

fn install(access: AccessControl, slippage_bps: u32, config: AdapterConfig, farm: Option<FarmSnapshot>) {
    let events = EVENTS.with(Rc::clone);
    let core = AdapterCore::new(ic_cdk::id(), access, slippage_bps, events);

    let adapter = match config {
        AdapterConfig::Lending(config) => {
            let market = MarketClient::new(config.market);
            let router = RouterClient::new(config.router);
            InstalledAdapter::Lending(Rc::new(LendingAdapter::new(core, config, IcrcLedger, market, router)))
        }
        AdapterConfig::Farm(config) => {
            let router = RouterClient::new(config.router);
            let farm_client = FarmClient::new(config.farm);
            let adapter = FarmAdapter::new(core, config, IcrcLedger, router, farm_client);
            let adapter = match farm {
                Some(snapshot) => adapter.with_snapshot(snapshot),
                None => adapter,
            };
            InstalledAdapter::Farm(Rc::new(adapter))
        }
    };

    ADAPTER.with(|a| *a.borrow_mut() = Some(adapter));
}

// ===== VAULT API =====

#[update]
#[candid_method(update)]
async fn deposit(assets: Nat) -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().deposit(&context(), assets).await
}

#[update]
#[candid_method(update)]
async fn withdraw(assets: Nat, recipient: Principal) -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().withdraw(&context(), assets, recipient).await
}

#[update]
#[candid_method(update)]
async fn withdraw_all(recipient: Principal) -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().withdraw_all(&context(), recipient).await
}

#[update]
#[candid_method(update)]
async fn harvest(recipient: Principal) -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().harvest(&context(), recipient).await
}

// ===== VIEWS =====
// Update calls: every view reads other canisters

#[update]
#[candid_method(update)]
async fn total_underlying() -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().total_underlying().await
}

#[update]
#[candid_method(update)]
async fn pending_rewards() -> Result<Nat> {
    let adapter = installed()?;
    adapter.strategy().pending_rewards().await
}

#[update]
#[candid_method(update)]
async fn estimated_apy_bps() -> Result<u64> {
    let adapter = installed()?;
    adapter.strategy().estimated_apy_bps().await
}

#[query]
#[candid_method(query)]
fn get_adapter_info() -> Result<AdapterInfo> {
    let info = match installed()? {
        InstalledAdapter::Lending(adapter) => adapter.info(event_count()),
        InstalledAdapter::Farm(adapter) => adapter.info(event_count()),
    };
    Ok(info)
}

/// Paginated event journal, oldest first
#[query]
#[candid_method(query)]
fn get_events(offset: u64, limit: u64) -> (Vec<EventRecord>, u64) {
    EVENTS.with(|e| e.page(offset, limit))
}

// ===== ADMIN CONTROLS =====

#[update]
#[candid_method(update)]
fn set_vault(new_vault: Principal) -> Result<()> {
    installed()?.core().set_vault(&context(), new_vault)
}

#[update]
#[candid_method(update)]
fn transfer_ownership(new_owner: Principal) -> Result<()> {
    installed()?.core().transfer_ownership(&context(), new_owner)
}

#[update]
#[candid_method(update)]
fn set_slippage_tolerance(bps: u32) -> Result<()> {
    installed()?.core().set_slippage_tolerance(&context(), bps)
}

#[update]
#[candid_method(update)]
fn set_swap_path(path: Vec<Principal>) -> Result<()> {
    match installed()? {
        InstalledAdapter::Lending(adapter) => adapter.set_swap_path(&context(), path),
        InstalledAdapter::Farm(adapter) => adapter.set_swap_path(&context(), path),
    }
}

#[update]
#[candid_method(update)]
fn set_apy_estimate(bps: u64) -> Result<()> {
    installed()?.farm("set_apy_estimate")?.set_apy_estimate(&context(), bps)
}

#[update]
#[candid_method(update)]
fn pause() -> Result<()> {
    installed()?.farm("pause")?.pause(&context())
}

#[update]
#[candid_method(update)]
fn unpause() -> Result<()> {
    installed()?.farm("unpause")?.unpause(&context())
}

/// Forced unstake forfeiting pending rewards. The adapter cannot be used afterwards.
#[update]
#[candid_method(update)]
async fn emergency_exit() -> Result<Nat> {
    let farm = installed()?.farm("emergency_exit")?;
    let units = farm.emergency_exit(&context()).await?;
    ic_cdk::println!("EMERGENCY EXIT: {} liquidity units recovered", units);
    Ok(units)
}

#[update]
#[candid_method(update)]
async fn rescue_token(token: Principal, amount: Nat, to: Principal) -> Result<Nat> {
    match installed()? {
        InstalledAdapter::Lending(adapter) => adapter.rescue_token(&context(), token, amount, to).await,
        InstalledAdapter::Farm(adapter) => adapter.rescue_token(&context(), token, amount, to).await,
    }
}

/// Get admin action log (owner only)
#[query]
#[candid_method(query)]
fn get_admin_action_log() -> Result<Vec<AdminAction>> {
    installed()?.core().access.admin_log(&ic_cdk::caller())
}

// ===== INITIALIZATION =====

#[init]
fn init(args: AdapterInitArgs) {
    infrastructure::logging::init_logging(tracing::Level::INFO);

    if let Err(e) = args.validate() {
        ic_cdk::trap(&format!("invalid init argument: {}", e));
    }

    let slippage_bps = args.slippage_bps();
    let kind = match &args.adapter {
        AdapterConfig::Lending(_) => "lending",
        AdapterConfig::Farm(_) => "farm",
    };
    install(AccessControl::new(args.owner, args.vault), slippage_bps, args.adapter, None);

    ic_cdk::println!("===================================");
    ic_cdk::println!("Yield Adapter Initialized ({})", kind);
    ic_cdk::println!("Owner: {} Vault: {}", args.owner, args.vault);
    ic_cdk::println!("===================================");
}

#[pre_upgrade]
fn pre_upgrade() {
    match installed() {
        Ok(InstalledAdapter::Lending(adapter)) => save_snapshot(adapter.snapshot()),
        Ok(InstalledAdapter::Farm(adapter)) => save_snapshot(adapter.snapshot()),
        Err(e) => ic_cdk::println!("Nothing to snapshot: {}", e),
    }
}

#[post_upgrade]
fn post_upgrade() {
    infrastructure::logging::init_logging(tracing::Level::INFO);

    let snapshot = match restore_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => ic_cdk::trap(&format!("cannot restore adapter: {}", e)),
    };

    let access = AccessControl::restore(snapshot.access, snapshot.admin_log);
    install(access, snapshot.slippage_bps, snapshot.config, snapshot.farm);

    ic_cdk::println!("Yield Adapter upgraded ({} events in journal)", event_count());
}

// ===== CANDID EXPORT =====

ic_cdk::export_candid!();
