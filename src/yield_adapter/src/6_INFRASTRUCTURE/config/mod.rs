//! Canister init configuration
//!
//! One canister hosts one adapter. The init argument selects which adapter and
//! wires it to its venue principals. Everything is validated before the
//! adapter is installed so a bad argument fails the install, not a later call.

use std::collections::HashSet;
use candid::{CandidType, Deserialize, Principal};
use crate::infrastructure::{Result, AdapterError, TradingError, ValidationError};
use crate::infrastructure::admin::reject_anonymous;
use crate::infrastructure::constants::{
    DEFAULT_FARM_APY_BPS, DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS,
    MAX_SWAP_PATH_LEN, MIN_SWAP_PATH_LEN,
};

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct LendingConfig {
    /// Underlying asset ledger
    pub asset: Principal,
    /// Market receipt token ledger
    pub share_token: Principal,
    pub market: Principal,
    pub reward_token: Principal,
    pub router: Principal,
    /// reward_token -> ... -> asset
    pub reward_path: Vec<Principal>,
}

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct FarmConfig {
    /// Primary asset ledger
    pub asset: Principal,
    pub paired_asset: Principal,
    /// Pool liquidity receipt ledger
    pub lp_token: Principal,
    pub router: Principal,
    pub farm: Principal,
    pub pool_id: u64,
    pub reward_token: Principal,
    /// reward_token -> intermediate -> asset
    pub reward_path: Vec<Principal>,
    pub apy_estimate_bps: Option<u64>,
}

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum AdapterConfig {
    Lending(LendingConfig),
    Farm(FarmConfig),
}

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct AdapterInitArgs {
    pub owner: Principal,
    pub vault: Principal,
    pub slippage_bps: Option<u32>,
    pub adapter: AdapterConfig,
}

impl AdapterInitArgs {
    pub fn validate(&self) -> Result<()> {
        reject_anonymous(&self.owner, "owner")?;
        reject_anonymous(&self.vault, "vault")?;
        validate_tolerance(self.slippage_bps())?;

        match &self.adapter {
            AdapterConfig::Lending(config) => config.validate(),
            AdapterConfig::Farm(config) => config.validate(),
        }
    }

    pub fn slippage_bps(&self) -> u32 {
        self.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS)
    }
}

impl LendingConfig {
    pub fn validate(&self) -> Result<()> {
        for (principal, role) in [
            (&self.asset, "asset"),
            (&self.share_token, "share_token"),
            (&self.market, "market"),
            (&self.reward_token, "reward_token"),
            (&self.router, "router"),
        ] {
            reject_anonymous(principal, role)?;
        }

        require_distinct_tokens(&[self.asset, self.share_token, self.reward_token])?;
        validate_swap_path(&self.reward_path, &self.reward_token, &self.asset)
    }
}

impl FarmConfig {
    pub fn validate(&self) -> Result<()> {
        for (principal, role) in [
            (&self.asset, "asset"),
            (&self.paired_asset, "paired_asset"),
            (&self.lp_token, "lp_token"),
            (&self.router, "router"),
            (&self.farm, "farm"),
            (&self.reward_token, "reward_token"),
        ] {
            reject_anonymous(principal, role)?;
        }

        require_distinct_tokens(&[self.asset, self.paired_asset, self.lp_token, self.reward_token])?;
        validate_swap_path(&self.reward_path, &self.reward_token, &self.asset)
    }

    pub fn apy_estimate_bps(&self) -> u64 {
        self.apy_estimate_bps.unwrap_or(DEFAULT_FARM_APY_BPS)
    }
}

fn require_distinct_tokens(tokens: &[Principal]) -> Result<()> {
    let mut seen = HashSet::new();
    for token in tokens {
        if !seen.insert(token) {
            return Err(AdapterError::Validation(ValidationError::InvalidConfig {
                field: "tokens".to_string(),
                reason: format!("token {} configured for more than one role", token),
            }));
        }
    }
    Ok(())
}

/// Tolerance must lie in `[0, MAX_SLIPPAGE_BPS]`
pub fn validate_tolerance(bps: u32) -> Result<()> {
    if bps > MAX_SLIPPAGE_BPS {
        return Err(AdapterError::Trading(TradingError::InvalidTolerance {
            bps,
            max: MAX_SLIPPAGE_BPS,
        }));
    }
    Ok(())
}

/// A route must start at `from`, end at `to`, and never repeat a token back-to-back
pub fn validate_swap_path(path: &[Principal], from: &Principal, to: &Principal) -> Result<()> {
    let invalid = |reason: String| AdapterError::Trading(TradingError::InvalidSwapPath { reason });

    if path.len() < MIN_SWAP_PATH_LEN || path.len() > MAX_SWAP_PATH_LEN {
        return Err(invalid(format!(
            "path has {} hops, expected {}..={}",
            path.len(), MIN_SWAP_PATH_LEN, MAX_SWAP_PATH_LEN
        )));
    }

    if path.first() != Some(from) {
        return Err(invalid(format!("path must start at {}", from)));
    }

    if path.last() != Some(to) {
        return Err(invalid(format!("path must end at {}", to)));
    }

    if path.windows(2).any(|hop| hop[0] == hop[1]) {
        return Err(invalid("path repeats a token in consecutive hops".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two bytes so no id collides with the anonymous principal ([4])
    fn p(id: u8) -> Principal {
        Principal::from_slice(&[0x10, id])
    }

    fn lending() -> LendingConfig {
        LendingConfig {
            asset: p(1),
            share_token: p(2),
            market: p(3),
            reward_token: p(4),
            router: p(5),
            reward_path: vec![p(4), p(1)],
        }
    }

    fn farm() -> FarmConfig {
        FarmConfig {
            asset: p(1),
            paired_asset: p(2),
            lp_token: p(3),
            router: p(4),
            farm: p(5),
            pool_id: 7,
            reward_token: p(6),
            reward_path: vec![p(6), p(2), p(1)],
            apy_estimate_bps: None,
        }
    }

    fn init_args(adapter: AdapterConfig) -> AdapterInitArgs {
        AdapterInitArgs {
            owner: p(100),
            vault: p(101),
            slippage_bps: None,
            adapter,
        }
    }

    #[test]
    fn test_valid_configs_pass() {
        assert!(init_args(AdapterConfig::Lending(lending())).validate().is_ok());
        assert!(init_args(AdapterConfig::Farm(farm())).validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let args = init_args(AdapterConfig::Farm(farm()));
        assert_eq!(args.slippage_bps(), DEFAULT_SLIPPAGE_BPS);
        assert_eq!(farm().apy_estimate_bps(), DEFAULT_FARM_APY_BPS);
    }

    #[test]
    fn test_anonymous_vault_rejected() {
        let mut args = init_args(AdapterConfig::Lending(lending()));
        args.vault = Principal::anonymous();
        assert!(matches!(
            args.validate(),
            Err(AdapterError::Validation(ValidationError::InvalidPrincipal { .. }))
        ));
    }

    #[test]
    fn test_anonymous_venue_rejected() {
        let mut config = farm();
        config.router = Principal::anonymous();
        assert!(matches!(
            init_args(AdapterConfig::Farm(config)).validate(),
            Err(AdapterError::Validation(ValidationError::InvalidPrincipal { .. }))
        ));

        let mut config = lending();
        config.reward_token = Principal::anonymous();
        config.reward_path = vec![Principal::anonymous(), config.asset];
        assert!(init_args(AdapterConfig::Lending(config)).validate().is_err());
    }

    #[test]
    fn test_tolerance_out_of_range_rejected() {
        let mut args = init_args(AdapterConfig::Lending(lending()));
        args.slippage_bps = Some(MAX_SLIPPAGE_BPS + 1);
        assert!(matches!(
            args.validate(),
            Err(AdapterError::Trading(TradingError::InvalidTolerance { .. }))
        ));

        args.slippage_bps = Some(MAX_SLIPPAGE_BPS);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let mut config = farm();
        config.paired_asset = config.asset;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_swap_path_rules() {
        let (from, to) = (p(6), p(1));
        assert!(validate_swap_path(&[from, to], &from, &to).is_ok());
        assert!(validate_swap_path(&[from, p(2), to], &from, &to).is_ok());

        // Too short
        assert!(validate_swap_path(&[from], &from, &to).is_err());
        // Wrong endpoints
        assert!(validate_swap_path(&[p(2), to], &from, &to).is_err());
        assert!(validate_swap_path(&[from, p(2)], &from, &to).is_err());
        // Consecutive repeat
        assert!(validate_swap_path(&[from, from, to], &from, &to).is_err());
        // Too long
        assert!(validate_swap_path(&[from, p(2), p(3), p(4), to], &from, &to).is_err());
    }
}
