//! Simulated venue world for tests
//!
//! One shared `WorldState` holds every ledger balance plus one lending market,
//! one constant-product router with any number of pairs, and one farm.
//! A `WorldHandle` is the world seen by one caller and implements every venue
//! port, so adapters run against it unchanged.
//!
//! Misbehavior knobs (return-code overrides, short deliveries, ignored
//! minimums, injected call failures) drive the adapters' unwind and
//! validation paths.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use async_trait::async_trait;
use candid::{Nat, Principal};
use num_traits::ToPrimitive;
use crate::_3_VENUES::{AmmRouter, Farm, LendingMarket, TokenLedger};
use crate::infrastructure::{Result, AdapterError, VenueError};
use crate::types::venues::{
    AddLiquidityArgs, AddLiquidityReceipt, RemoveLiquidityArgs, RemoveLiquidityReceipt,
    Reserves, SwapArgs,
};

pub const MARKET: Principal = Principal::from_slice(&[0xA1]);
pub const ROUTER: Principal = Principal::from_slice(&[0xA2]);
pub const FARM: Principal = Principal::from_slice(&[0xA3]);
const POOL_FOUNDER: Principal = Principal::from_slice(&[0xA4]);

const RATE_SCALE: u128 = 1_000_000_000_000_000_000;
const BPS: u128 = 10_000;

/// Compound-style return codes
pub const INSUFFICIENT_SHARES: u64 = 9;
pub const INSUFFICIENT_CASH: u64 = 14;

pub fn p(id: u8) -> Principal {
    Principal::from_slice(&[id])
}

pub fn nat(v: u128) -> Nat {
    Nat::from(v)
}

pub fn to_u128(n: &Nat) -> u128 {
    n.0.to_u128().expect("test amounts fit in u128")
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub token: Principal,
    pub from: Principal,
    pub to: Principal,
    pub amount: u128,
}

struct Pair {
    token_a: Principal,
    token_b: Principal,
    reserve_a: u128,
    reserve_b: u128,
    lp_token: Principal,
}

impl Pair {
    /// Reserves oriented as (reserve of `token`, reserve of the other)
    fn oriented(&self, token: Principal) -> (u128, u128) {
        if token == self.token_a {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    fn adjust(&mut self, token: Principal, add_in: u128, sub_out: u128) {
        if token == self.token_a {
            self.reserve_a += add_in;
            self.reserve_b -= sub_out;
        } else {
            self.reserve_b += add_in;
            self.reserve_a -= sub_out;
        }
    }
}

struct Market {
    underlying: Principal,
    share_token: Principal,
    reward_token: Principal,
    exchange_rate: u128,
    supply_rate: u128,
    accrued: HashMap<Principal, u128>,
    codes: HashMap<&'static str, u64>,
    short_pay_bps: u128,
    mint_noop: bool,
}

struct FarmPool {
    lp_token: Principal,
    reward_token: Principal,
    staked: HashMap<Principal, u128>,
    pending: HashMap<Principal, u128>,
}

struct RouterSettings {
    fee_bps: u128,
    shortfall_bps: u128,
    ignore_min: bool,
    quote_override: Option<u128>,
    swap_output: Option<u128>,
}

pub struct WorldState {
    balances: HashMap<(Principal, Principal), u128>,
    allowances: HashMap<(Principal, Principal, Principal), (u128, Option<u64>)>,
    fees: HashMap<Principal, u128>,
    approve_count: usize,
    transfers: Vec<TransferRecord>,
    failures: HashSet<&'static str>,
    now: u64,
    market: Option<Market>,
    pairs: Vec<Pair>,
    farm_pools: HashMap<u64, FarmPool>,
    router: RouterSettings,
}

type SimResult<T> = std::result::Result<T, String>;

impl WorldState {
    fn balance(&self, token: Principal, owner: Principal) -> u128 {
        self.balances.get(&(token, owner)).copied().unwrap_or(0)
    }

    fn fee(&self, token: Principal) -> u128 {
        self.fees.get(&token).copied().unwrap_or(0)
    }

    fn credit(&mut self, token: Principal, owner: Principal, amount: u128) {
        *self.balances.entry((token, owner)).or_insert(0) += amount;
    }

    fn debit(&mut self, token: Principal, owner: Principal, amount: u128) -> SimResult<()> {
        let balance = self.balance(token, owner);
        if balance < amount {
            return Err(format!("InsufficientFunds {{ balance: {} }}", balance));
        }
        self.balances.insert((token, owner), balance - amount);
        Ok(())
    }

    fn log(&mut self, token: Principal, from: Principal, to: Principal, amount: u128) {
        if amount > 0 {
            self.transfers.push(TransferRecord { token, from, to, amount });
        }
    }

    /// Fee-free movement used by venues paying out of their own balances
    fn move_tokens(&mut self, token: Principal, from: Principal, to: Principal, amount: u128) -> SimResult<()> {
        self.debit(token, from, amount)?;
        self.credit(token, to, amount);
        self.log(token, from, to, amount);
        Ok(())
    }

    fn mint_to(&mut self, token: Principal, to: Principal, amount: u128) {
        self.credit(token, to, amount);
        self.log(token, token, to, amount);
    }

    fn live_allowance(&self, token: Principal, owner: Principal, spender: Principal) -> u128 {
        match self.allowances.get(&(token, owner, spender)) {
            Some((_, Some(expiry))) if *expiry <= self.now => 0,
            Some((amount, _)) => *amount,
            None => 0,
        }
    }

    fn can_pull(&self, token: Principal, owner: Principal, spender: Principal, amount: u128) -> SimResult<()> {
        let needed = amount + self.fee(token);
        let allowance = self.live_allowance(token, owner, spender);
        if allowance < needed {
            return Err(format!("InsufficientAllowance {{ allowance: {} }}", allowance));
        }
        let balance = self.balance(token, owner);
        if balance < needed {
            return Err(format!("InsufficientFunds {{ balance: {} }}", balance));
        }
        Ok(())
    }

    /// ICRC-2 transfer_from: debits `amount + fee` from both balance and allowance
    fn pull(&mut self, token: Principal, owner: Principal, spender: Principal, to: Principal, amount: u128) -> SimResult<()> {
        self.can_pull(token, owner, spender, amount)?;
        let needed = amount + self.fee(token);
        if let Some(entry) = self.allowances.get_mut(&(token, owner, spender)) {
            entry.0 -= needed;
        }
        self.debit(token, owner, needed)?;
        self.credit(token, to, amount);
        self.log(token, owner, to, amount);
        Ok(())
    }

    fn total_supply(&self, token: Principal) -> u128 {
        self.balances
            .iter()
            .filter(|((t, _), _)| *t == token)
            .map(|(_, amount)| *amount)
            .sum()
    }

    fn pair_index(&self, a: Principal, b: Principal) -> SimResult<usize> {
        self.pairs
            .iter()
            .position(|pair| {
                (pair.token_a == a && pair.token_b == b) || (pair.token_a == b && pair.token_b == a)
            })
            .ok_or_else(|| format!("no pair {} / {}", a, b))
    }

    fn curve_out(&self, amount_in: u128, reserve_in: u128, reserve_out: u128) -> u128 {
        let in_with_fee = amount_in * (BPS - self.router.fee_bps);
        in_with_fee * reserve_out / (reserve_in * BPS + in_with_fee)
    }

    fn amounts_out(&self, amount_in: u128, path: &[Principal]) -> SimResult<Vec<u128>> {
        if path.len() < 2 {
            return Err("path too short".to_string());
        }
        let mut amounts = vec![amount_in];
        for hop in path.windows(2) {
            let pair = &self.pairs[self.pair_index(hop[0], hop[1])?];
            let (reserve_in, reserve_out) = pair.oriented(hop[0]);
            let last = *amounts.last().unwrap_or(&0);
            amounts.push(self.curve_out(last, reserve_in, reserve_out));
        }
        Ok(amounts)
    }

    fn check_deadline(&self, deadline: u64) -> SimResult<()> {
        if deadline < self.now {
            return Err("EXPIRED".to_string());
        }
        Ok(())
    }

    fn market(&mut self) -> SimResult<&mut Market> {
        self.market.as_mut().ok_or_else(|| "no market configured".to_string())
    }

    fn pay_pending(&mut self, pool_id: u64, holder: Principal) -> SimResult<()> {
        let pool = self.farm_pools.get_mut(&pool_id).ok_or("no such pool")?;
        let reward_token = pool.reward_token;
        let pending = pool.pending.remove(&holder).unwrap_or(0);
        if pending > 0 {
            self.mint_to(reward_token, holder, pending);
        }
        Ok(())
    }
}

/// Owner of the shared world. Clone-free: tests keep one and hand out handles.
pub struct World {
    state: Rc<RefCell<WorldState>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(WorldState {
                balances: HashMap::new(),
                allowances: HashMap::new(),
                fees: HashMap::new(),
                approve_count: 0,
                transfers: Vec::new(),
                failures: HashSet::new(),
                now: 0,
                market: None,
                pairs: Vec::new(),
                farm_pools: HashMap::new(),
                router: RouterSettings {
                    fee_bps: 30,
                    shortfall_bps: 0,
                    ignore_min: false,
                    quote_override: None,
                    swap_output: None,
                },
            })),
        }
    }

    pub fn handle(&self, caller: Principal) -> WorldHandle {
        WorldHandle {
            state: Rc::clone(&self.state),
            caller,
        }
    }

    // --- ledgers ---

    pub fn mint(&self, token: Principal, owner: Principal, amount: u128) {
        self.state.borrow_mut().credit(token, owner, amount);
    }

    pub fn balance_of(&self, token: Principal, owner: Principal) -> u128 {
        self.state.borrow().balance(token, owner)
    }

    pub fn total_supply(&self, token: Principal) -> u128 {
        self.state.borrow().total_supply(token)
    }

    pub fn set_fee(&self, token: Principal, fee: u128) {
        self.state.borrow_mut().fees.insert(token, fee);
    }

    /// Grant an allowance directly, as the Vault would before calling deposit
    pub fn approve(&self, token: Principal, owner: Principal, spender: Principal, amount: u128) {
        self.state.borrow_mut().allowances.insert((token, owner, spender), (amount, None));
    }

    pub fn allowance_of(&self, token: Principal, owner: Principal, spender: Principal) -> u128 {
        self.state.borrow().live_allowance(token, owner, spender)
    }

    pub fn allowance_expiry(&self, token: Principal, owner: Principal, spender: Principal) -> Option<u64> {
        self.state.borrow().allowances.get(&(token, owner, spender)).and_then(|(_, expiry)| *expiry)
    }

    pub fn approve_count(&self) -> usize {
        self.state.borrow().approve_count
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.state.borrow().transfers.clone()
    }

    pub fn clear_transfers(&self) {
        self.state.borrow_mut().transfers.clear();
    }

    /// Make the next call of `method` through any handle fail at the transport level
    pub fn fail_next(&self, method: &'static str) {
        self.state.borrow_mut().failures.insert(method);
    }

    pub fn set_now(&self, now: u64) {
        self.state.borrow_mut().now = now;
    }

    // --- router ---

    /// Add a pair seeded by a founder; returns its liquidity token
    pub fn add_pair(&self, token_a: Principal, token_b: Principal, reserve_a: u128, reserve_b: u128) -> Principal {
        let index = self.state.borrow().pairs.len() as u8;
        let lp_token = Principal::from_slice(&[0xB0, index]);
        self.add_pair_with_lp(token_a, token_b, reserve_a, reserve_b, lp_token);
        lp_token
    }

    pub fn add_pair_with_lp(&self, token_a: Principal, token_b: Principal, reserve_a: u128, reserve_b: u128, lp_token: Principal) {
        let mut state = self.state.borrow_mut();
        state.credit(token_a, ROUTER, reserve_a);
        state.credit(token_b, ROUTER, reserve_b);
        state.credit(lp_token, POOL_FOUNDER, reserve_a);
        state.pairs.push(Pair { token_a, token_b, reserve_a, reserve_b, lp_token });
    }

    pub fn reserves(&self, token_a: Principal, token_b: Principal) -> (u128, u128) {
        let state = self.state.borrow();
        let index = state.pair_index(token_a, token_b).expect("pair exists");
        state.pairs[index].oriented(token_a)
    }

    /// Deliver `bps` less than the curve on every swap and skip the minimum check
    pub fn set_router_shortfall_bps(&self, bps: u128) {
        let mut state = self.state.borrow_mut();
        state.router.shortfall_bps = bps;
        state.router.ignore_min = true;
    }

    pub fn set_router_ignores_min(&self, ignore: bool) {
        self.state.borrow_mut().router.ignore_min = ignore;
    }

    /// Force the final amount reported by `get_amounts_out`
    pub fn set_quote_override(&self, amount: Option<u128>) {
        self.state.borrow_mut().router.quote_override = amount;
    }

    /// Force the amount a swap actually delivers
    pub fn set_swap_output(&self, amount: Option<u128>) {
        self.state.borrow_mut().router.swap_output = amount;
    }

    // --- lending market ---

    pub fn setup_market(&self, underlying: Principal, share_token: Principal, reward_token: Principal, exchange_rate: u128) {
        self.state.borrow_mut().market = Some(Market {
            underlying,
            share_token,
            reward_token,
            exchange_rate,
            supply_rate: 0,
            accrued: HashMap::new(),
            codes: HashMap::new(),
            short_pay_bps: 0,
            mint_noop: false,
        });
    }

    fn with_market(&self, f: impl FnOnce(&mut Market)) {
        let mut state = self.state.borrow_mut();
        f(state.market.as_mut().expect("market configured"));
    }

    pub fn set_exchange_rate(&self, rate: u128) {
        self.with_market(|m| m.exchange_rate = rate);
    }

    pub fn set_supply_rate(&self, rate_per_second: u128) {
        self.with_market(|m| m.supply_rate = rate_per_second);
    }

    /// Return `code` from `method` without touching state
    pub fn set_market_code(&self, method: &'static str, code: u64) {
        self.with_market(|m| {
            m.codes.insert(method, code);
        });
    }

    /// Redemptions report success but pay `bps` less than owed
    pub fn set_market_short_pay_bps(&self, bps: u128) {
        self.with_market(|m| m.short_pay_bps = bps);
    }

    /// `mint` takes the funds and reports success without issuing shares
    pub fn set_market_mint_noop(&self, noop: bool) {
        self.with_market(|m| m.mint_noop = noop);
    }

    pub fn accrue_market_reward(&self, holder: Principal, amount: u128) {
        self.with_market(|m| {
            *m.accrued.entry(holder).or_insert(0) += amount;
        });
    }

    // --- farm ---

    pub fn add_farm_pool(&self, pool_id: u64, lp_token: Principal, reward_token: Principal) {
        self.state.borrow_mut().farm_pools.insert(pool_id, FarmPool {
            lp_token,
            reward_token,
            staked: HashMap::new(),
            pending: HashMap::new(),
        });
    }

    pub fn accrue_farm_reward(&self, pool_id: u64, holder: Principal, amount: u128) {
        let mut state = self.state.borrow_mut();
        let pool = state.farm_pools.get_mut(&pool_id).expect("pool exists");
        *pool.pending.entry(holder).or_insert(0) += amount;
    }

    pub fn staked(&self, pool_id: u64, holder: Principal) -> u128 {
        let state = self.state.borrow();
        state.farm_pools.get(&pool_id).and_then(|pool| pool.staked.get(&holder).copied()).unwrap_or(0)
    }
}

/// The world as seen by one caller
#[derive(Clone)]
pub struct WorldHandle {
    state: Rc<RefCell<WorldState>>,
    caller: Principal,
}

impl WorldHandle {
    fn injected(&self, method: &'static str) -> Result<()> {
        if self.state.borrow_mut().failures.remove(method) {
            return Err(AdapterError::Venue(VenueError::CallFailed {
                venue: "testkit".to_string(),
                method: method.to_string(),
                reason: "injected failure".to_string(),
            }));
        }
        Ok(())
    }

    fn rejected(method: &str, reason: String) -> AdapterError {
        AdapterError::Venue(VenueError::Rejected {
            venue: "testkit".to_string(),
            method: method.to_string(),
            reason,
        })
    }

    fn sim<T>(&self, method: &'static str, f: impl FnOnce(&mut WorldState, Principal) -> SimResult<T>) -> Result<T> {
        self.injected(method)?;
        let mut state = self.state.borrow_mut();
        f(&mut *state, self.caller).map_err(|reason| Self::rejected(method, reason))
    }
}

#[async_trait(?Send)]
impl TokenLedger for WorldHandle {
    async fn balance_of(&self, token: Principal, owner: Principal) -> Result<Nat> {
        self.sim("balance_of", |s, _| Ok(nat(s.balance(token, owner))))
    }

    async fn total_supply(&self, token: Principal) -> Result<Nat> {
        self.sim("total_supply", |s, _| Ok(nat(s.total_supply(token))))
    }

    async fn fee(&self, token: Principal) -> Result<Nat> {
        self.sim("fee", |s, _| Ok(nat(s.fee(token))))
    }

    async fn transfer(&self, token: Principal, to: Principal, amount: Nat) -> Result<Nat> {
        let amount = to_u128(&amount);
        self.sim("transfer", |s, caller| {
            let fee = s.fee(token);
            s.debit(token, caller, amount + fee)?;
            s.credit(token, to, amount);
            s.log(token, caller, to, amount);
            Ok(nat(s.transfers.len() as u128))
        })
    }

    async fn transfer_from(&self, token: Principal, from: Principal, to: Principal, amount: Nat) -> Result<Nat> {
        let amount = to_u128(&amount);
        self.sim("transfer_from", |s, caller| {
            s.pull(token, from, caller, to, amount)?;
            Ok(nat(s.transfers.len() as u128))
        })
    }

    async fn allowance(&self, token: Principal, owner: Principal, spender: Principal) -> Result<Nat> {
        self.sim("allowance", |s, _| Ok(nat(s.live_allowance(token, owner, spender))))
    }

    async fn approve(&self, token: Principal, spender: Principal, amount: Nat, expires_at: u64) -> Result<Nat> {
        let amount = to_u128(&amount);
        self.sim("approve", |s, caller| {
            // ICRC-2 charges the approver the ledger fee
            let fee = s.fee(token);
            s.debit(token, caller, fee)?;
            s.allowances.insert((token, caller, spender), (amount, Some(expires_at)));
            s.approve_count += 1;
            Ok(nat(s.approve_count as u128))
        })
    }
}

#[async_trait(?Send)]
impl LendingMarket for WorldHandle {
    async fn exchange_rate_stored(&self) -> Result<Nat> {
        self.sim("exchange_rate_stored", |s, _| Ok(nat(s.market()?.exchange_rate)))
    }

    async fn supply_rate_per_second(&self) -> Result<Nat> {
        self.sim("supply_rate_per_second", |s, _| Ok(nat(s.market()?.supply_rate)))
    }

    async fn mint(&self, amount: Nat) -> Result<u64> {
        let amount = to_u128(&amount);
        self.sim("mint", |s, caller| {
            let market = s.market()?;
            if let Some(code) = market.codes.get("mint") {
                return Ok(*code);
            }
            let (underlying, share_token, rate, noop) =
                (market.underlying, market.share_token, market.exchange_rate, market.mint_noop);

            s.pull(underlying, caller, MARKET, MARKET, amount)?;
            if !noop {
                s.mint_to(share_token, caller, amount * RATE_SCALE / rate);
            }
            Ok(0)
        })
    }

    async fn redeem_underlying(&self, amount: Nat) -> Result<u64> {
        let amount = to_u128(&amount);
        self.sim("redeem_underlying", |s, caller| {
            let market = s.market()?;
            if let Some(code) = market.codes.get("redeem_underlying") {
                return Ok(*code);
            }
            let (underlying, share_token, rate, short) =
                (market.underlying, market.share_token, market.exchange_rate, market.short_pay_bps);

            let shares = (amount * RATE_SCALE).div_ceil(rate);
            if s.balance(share_token, caller) < shares {
                return Ok(INSUFFICIENT_SHARES);
            }
            if s.balance(underlying, MARKET) < amount {
                return Ok(INSUFFICIENT_CASH);
            }
            s.debit(share_token, caller, shares)?;
            s.move_tokens(underlying, MARKET, caller, amount - amount * short / BPS)?;
            Ok(0)
        })
    }

    async fn redeem(&self, shares: Nat) -> Result<u64> {
        let shares = to_u128(&shares);
        self.sim("redeem", |s, caller| {
            let market = s.market()?;
            if let Some(code) = market.codes.get("redeem") {
                return Ok(*code);
            }
            let (underlying, share_token, rate, short) =
                (market.underlying, market.share_token, market.exchange_rate, market.short_pay_bps);

            if s.balance(share_token, caller) < shares {
                return Ok(INSUFFICIENT_SHARES);
            }
            let amount = shares * rate / RATE_SCALE;
            if s.balance(underlying, MARKET) < amount {
                return Ok(INSUFFICIENT_CASH);
            }
            s.debit(share_token, caller, shares)?;
            s.move_tokens(underlying, MARKET, caller, amount - amount * short / BPS)?;
            Ok(0)
        })
    }

    async fn claim_rewards(&self, holder: Principal) -> Result<()> {
        self.sim("claim_rewards", |s, _| {
            let market = s.market()?;
            let reward_token = market.reward_token;
            let amount = market.accrued.remove(&holder).unwrap_or(0);
            if amount > 0 {
                s.mint_to(reward_token, holder, amount);
            }
            Ok(())
        })
    }

    async fn accrued_rewards(&self, holder: Principal) -> Result<Nat> {
        self.sim("accrued_rewards", |s, _| {
            Ok(nat(s.market()?.accrued.get(&holder).copied().unwrap_or(0)))
        })
    }
}

#[async_trait(?Send)]
impl AmmRouter for WorldHandle {
    async fn get_amounts_out(&self, amount_in: Nat, path: Vec<Principal>) -> Result<Vec<Nat>> {
        let amount_in = to_u128(&amount_in);
        self.sim("get_amounts_out", |s, _| {
            let mut amounts = s.amounts_out(amount_in, &path)?;
            if let (Some(forced), Some(last)) = (s.router.quote_override, amounts.last_mut()) {
                *last = forced;
            }
            Ok(amounts.into_iter().map(nat).collect())
        })
    }

    async fn get_reserves(&self, token_a: Principal, token_b: Principal) -> Result<Reserves> {
        self.sim("get_reserves", |s, _| {
            let index = s.pair_index(token_a, token_b)?;
            let (reserve_a, reserve_b) = s.pairs[index].oriented(token_a);
            Ok(Reserves { reserve_a: nat(reserve_a), reserve_b: nat(reserve_b) })
        })
    }

    async fn swap_exact_tokens_for_tokens(&self, args: SwapArgs) -> Result<Vec<Nat>> {
        let amount_in = to_u128(&args.amount_in);
        let amount_out_min = to_u128(&args.amount_out_min);
        self.sim("swap", |s, caller| {
            s.check_deadline(args.deadline)?;
            let amounts = s.amounts_out(amount_in, &args.path)?;
            let curve_out = *amounts.last().unwrap_or(&0);

            let forced = s.router.swap_output.unwrap_or(curve_out);
            let delivered = forced - forced * s.router.shortfall_bps / BPS;
            if !s.router.ignore_min && delivered < amount_out_min {
                return Err("INSUFFICIENT_OUTPUT_AMOUNT".to_string());
            }

            s.pull(args.path[0], caller, ROUTER, ROUTER, amount_in)?;
            for (i, hop) in args.path.windows(2).enumerate() {
                let index = s.pair_index(hop[0], hop[1])?;
                s.pairs[index].adjust(hop[0], amounts[i], amounts[i + 1]);
            }

            let token_out = args.path[args.path.len() - 1];
            s.move_tokens(token_out, ROUTER, args.to, delivered)?;

            let mut reported: Vec<Nat> = amounts.into_iter().map(nat).collect();
            if let Some(last) = reported.last_mut() {
                *last = nat(delivered);
            }
            Ok(reported)
        })
    }

    async fn add_liquidity(&self, args: AddLiquidityArgs) -> Result<AddLiquidityReceipt> {
        let desired_a = to_u128(&args.amount_a_desired);
        let desired_b = to_u128(&args.amount_b_desired);
        let min_a = to_u128(&args.amount_a_min);
        let min_b = to_u128(&args.amount_b_min);
        self.sim("add_liquidity", |s, caller| {
            s.check_deadline(args.deadline)?;
            let index = s.pair_index(args.token_a, args.token_b)?;
            let (reserve_a, reserve_b) = s.pairs[index].oriented(args.token_a);
            let lp_token = s.pairs[index].lp_token;

            let optimal_b = desired_a * reserve_b / reserve_a;
            let (amount_a, amount_b) = if optimal_b <= desired_b {
                if optimal_b < min_b {
                    return Err("INSUFFICIENT_B_AMOUNT".to_string());
                }
                (desired_a, optimal_b)
            } else {
                let optimal_a = desired_b * reserve_a / reserve_b;
                if optimal_a < min_a {
                    return Err("INSUFFICIENT_A_AMOUNT".to_string());
                }
                (optimal_a, desired_b)
            };

            let supply = s.total_supply(lp_token);
            let liquidity = (amount_a * supply / reserve_a).min(amount_b * supply / reserve_b);
            if liquidity == 0 {
                return Err("INSUFFICIENT_LIQUIDITY_MINTED".to_string());
            }

            s.can_pull(args.token_a, caller, ROUTER, amount_a)?;
            s.can_pull(args.token_b, caller, ROUTER, amount_b)?;
            s.pull(args.token_a, caller, ROUTER, ROUTER, amount_a)?;
            s.pull(args.token_b, caller, ROUTER, ROUTER, amount_b)?;

            s.pairs[index].adjust(args.token_a, amount_a, 0);
            s.pairs[index].adjust(args.token_b, amount_b, 0);
            s.mint_to(lp_token, args.to, liquidity);

            Ok(AddLiquidityReceipt {
                amount_a: nat(amount_a),
                amount_b: nat(amount_b),
                liquidity: nat(liquidity),
            })
        })
    }

    async fn remove_liquidity(&self, args: RemoveLiquidityArgs) -> Result<RemoveLiquidityReceipt> {
        let liquidity = to_u128(&args.liquidity);
        let min_a = to_u128(&args.amount_a_min);
        let min_b = to_u128(&args.amount_b_min);
        self.sim("remove_liquidity", |s, caller| {
            s.check_deadline(args.deadline)?;
            let index = s.pair_index(args.token_a, args.token_b)?;
            let (reserve_a, reserve_b) = s.pairs[index].oriented(args.token_a);
            let lp_token = s.pairs[index].lp_token;
            let supply = s.total_supply(lp_token);

            let amount_a = liquidity * reserve_a / supply;
            let amount_b = liquidity * reserve_b / supply;
            if amount_a < min_a || amount_b < min_b {
                return Err("INSUFFICIENT_OUTPUT".to_string());
            }

            s.pull(lp_token, caller, ROUTER, ROUTER, liquidity)?;
            s.debit(lp_token, ROUTER, liquidity)?;
            s.pairs[index].adjust(args.token_a, 0, amount_a);
            s.pairs[index].adjust(args.token_b, 0, amount_b);
            s.move_tokens(args.token_a, ROUTER, args.to, amount_a)?;
            s.move_tokens(args.token_b, ROUTER, args.to, amount_b)?;

            Ok(RemoveLiquidityReceipt { amount_a: nat(amount_a), amount_b: nat(amount_b) })
        })
    }
}

#[async_trait(?Send)]
impl Farm for WorldHandle {
    async fn deposit(&self, pool_id: u64, amount: Nat) -> Result<()> {
        let amount = to_u128(&amount);
        self.sim("farm_deposit", |s, caller| {
            let lp_token = s.farm_pools.get(&pool_id).ok_or("no such pool")?.lp_token;
            if amount > 0 {
                s.can_pull(lp_token, caller, FARM, amount)?;
            }
            s.pay_pending(pool_id, caller)?;
            if amount > 0 {
                s.pull(lp_token, caller, FARM, FARM, amount)?;
                let pool = s.farm_pools.get_mut(&pool_id).ok_or("no such pool")?;
                *pool.staked.entry(caller).or_insert(0) += amount;
            }
            Ok(())
        })
    }

    async fn withdraw(&self, pool_id: u64, amount: Nat) -> Result<()> {
        let amount = to_u128(&amount);
        self.sim("farm_withdraw", |s, caller| {
            let pool = s.farm_pools.get(&pool_id).ok_or("no such pool")?;
            let lp_token = pool.lp_token;
            let staked = pool.staked.get(&caller).copied().unwrap_or(0);
            if staked < amount {
                return Err("withdraw: not good".to_string());
            }
            s.pay_pending(pool_id, caller)?;
            if let Some(pool) = s.farm_pools.get_mut(&pool_id) {
                pool.staked.insert(caller, staked - amount);
            }
            s.move_tokens(lp_token, FARM, caller, amount)
        })
    }

    async fn emergency_withdraw(&self, pool_id: u64) -> Result<()> {
        self.sim("emergency_withdraw", |s, caller| {
            let pool = s.farm_pools.get_mut(&pool_id).ok_or("no such pool")?;
            let lp_token = pool.lp_token;
            let amount = pool.staked.remove(&caller).unwrap_or(0);
            pool.pending.remove(&caller);
            s.move_tokens(lp_token, FARM, caller, amount)
        })
    }

    async fn staked(&self, pool_id: u64, account: Principal) -> Result<Nat> {
        self.sim("staked", |s, _| {
            let pool = s.farm_pools.get(&pool_id).ok_or("no such pool")?;
            Ok(nat(pool.staked.get(&account).copied().unwrap_or(0)))
        })
    }

    async fn pending_reward(&self, pool_id: u64, account: Principal) -> Result<Nat> {
        self.sim("pending_reward", |s, _| {
            let pool = s.farm_pools.get(&pool_id).ok_or("no such pool")?;
            Ok(nat(pool.pending.get(&account).copied().unwrap_or(0)))
        })
    }
}
