//! Position valuation
//!
//! Positions are never stored; they are read from venue balances on demand.
//! All divisions round down so a reported value never exceeds what the
//! position could return.
//!
//! ## Lending
//! `shares × exchange_rate_stored ÷ 1e18`, using the stored (non-accruing)
//! rate. Interest accrued since the last market update is not counted.
//!
//! ## Farm
//! The staked share of both pool reserves, with the paired-asset share priced
//! at the instantaneous reserve ratio. This is a spot estimate: it moves with
//! the pool inside a single execution window and is not a safe sole input for
//! an on-chain decision.

use candid::{Nat, Principal};
use crate::_3_VENUES::{AmmRouter, Farm, TokenLedger};
use crate::infrastructure::{Result, multiply_and_divide, is_zero, nat_zero};
use crate::infrastructure::config::FarmConfig;
use crate::infrastructure::constants::EXCHANGE_RATE_SCALE;

/// Underlying value of a share balance
pub fn lending_position_value(shares: &Nat, exchange_rate: &Nat) -> Result<Nat> {
    multiply_and_divide(shares, exchange_rate, &Nat::from(EXCHANGE_RATE_SCALE))
}

/// Staked liquidity and the pool it is a claim on
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPosition {
    pub staked_units: Nat,
    pub total_supply: Nat,
    pub reserve_asset: Nat,
    pub reserve_paired: Nat,
}

/// Primary-asset value of a farm position
pub fn farm_position_value(position: &PoolPosition) -> Result<Nat> {
    if is_zero(&position.staked_units) || is_zero(&position.total_supply) {
        return Ok(nat_zero());
    }

    let asset_share = multiply_and_divide(&position.staked_units, &position.reserve_asset, &position.total_supply)?;
    let paired_share = multiply_and_divide(&position.staked_units, &position.reserve_paired, &position.total_supply)?;

    let paired_in_asset = if is_zero(&position.reserve_paired) {
        nat_zero()
    } else {
        multiply_and_divide(&paired_share, &position.reserve_asset, &position.reserve_paired)?
    };

    Ok(asset_share + paired_in_asset)
}

/// Read stake, LP supply and reserves in parallel
pub async fn read_pool_position<L, R, F>(
    ledger: &L,
    router: &R,
    farm: &F,
    config: &FarmConfig,
    holder: Principal,
) -> Result<PoolPosition>
where
    L: TokenLedger + ?Sized,
    R: AmmRouter + ?Sized,
    F: Farm + ?Sized,
{
    let (staked, supply, reserves) = futures::join!(
        farm.staked(config.pool_id, holder),
        ledger.total_supply(config.lp_token),
        router.get_reserves(config.asset, config.paired_asset),
    );
    let reserves = reserves?;

    Ok(PoolPosition {
        staked_units: staked?,
        total_supply: supply?,
        reserve_asset: reserves.reserve_a,
        reserve_paired: reserves.reserve_b,
    })
}
