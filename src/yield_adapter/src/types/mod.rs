//! Shared types used across zones

pub mod icrc;
pub mod venues;

use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

/// Who is calling and when, captured once at the canister boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallContext {
    pub caller: Principal,
    /// Nanoseconds since epoch
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: Principal, now: u64) -> Self {
        Self { caller, now }
    }
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Lending,
    Farm,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Lending => "lending",
            AdapterKind::Farm => "farm",
        }
    }
}

/// Farm adapter lifecycle. `EmergencyExited` is terminal.
#[derive(CandidType, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmState {
    Active,
    Paused,
    EmergencyExited,
}

impl FarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarmState::Active => "active",
            FarmState::Paused => "paused",
            FarmState::EmergencyExited => "emergency_exited",
        }
    }
}
