//! Display module - Adapter description for operators and the Vault UI

use candid::{CandidType, Deserialize, Nat, Principal};
use serde::Serialize;
use crate::types::{AdapterKind, FarmState};
use super::apy::bps_to_percent;

/// Static configuration plus local state. No venue calls are needed to build it.
#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdapterInfo {
    pub kind: AdapterKind,
    pub adapter: Principal,
    pub asset: Principal,
    pub owner: Principal,
    pub vault: Principal,
    pub slippage_bps: u32,
    pub reward_path: Vec<Principal>,
    /// Operation currently holding the reentrancy lock, if any
    pub active_operation: Option<String>,
    pub farm_state: Option<FarmState>,
    pub cost_basis: Option<Nat>,
    pub apy_estimate_bps: Option<u64>,
    pub apy_estimate_percent: Option<String>,
    pub event_count: u64,
}

impl AdapterInfo {
    pub fn with_apy_estimate(mut self, bps: u64) -> Self {
        self.apy_estimate_bps = Some(bps);
        self.apy_estimate_percent = Some(format!("{:.2}%", bps_to_percent(bps)));
        self
    }
}
