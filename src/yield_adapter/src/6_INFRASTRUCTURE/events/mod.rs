//! Structured adapter events for external indexers
//!
//! Every state-changing call appends one record. Records live in a
//! `StableBTreeMap` so the journal survives upgrades without going through
//! the pre/post-upgrade snapshot.

use std::borrow::Cow;
use std::cell::RefCell;
use candid::{CandidType, Deserialize, Nat, Principal};
use ic_stable_structures::{storable::Bound, Memory, StableBTreeMap, Storable};
use crate::infrastructure::constants::MAX_EVENT_PAGE;

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Deposited {
        assets: Nat,
        accepted: Nat,
        position_delta: Nat,
    },
    Withdrawn {
        requested: Nat,
        received: Nat,
        recipient: Principal,
    },
    Harvested {
        reward: Nat,
        proceeds: Nat,
        recipient: Principal,
    },
    RewardsCaptured {
        amount: Nat,
        during: String,
    },
    VaultChanged {
        previous: Principal,
        current: Principal,
    },
    OwnershipTransferred {
        previous: Principal,
        current: Principal,
    },
    SwapPathChanged {
        path: Vec<Principal>,
    },
    SlippageToleranceChanged {
        previous_bps: u32,
        current_bps: u32,
    },
    ApyEstimateChanged {
        bps: u64,
    },
    Paused,
    Unpaused,
    EmergencyExited {
        units_recovered: Nat,
        cost_basis_cleared: Nat,
    },
    TokenRescued {
        token: Principal,
        amount: Nat,
        to: Principal,
    },
}

impl AdapterEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterEvent::Deposited { .. } => "deposited",
            AdapterEvent::Withdrawn { .. } => "withdrawn",
            AdapterEvent::Harvested { .. } => "harvested",
            AdapterEvent::RewardsCaptured { .. } => "rewards_captured",
            AdapterEvent::VaultChanged { .. } => "vault_changed",
            AdapterEvent::OwnershipTransferred { .. } => "ownership_transferred",
            AdapterEvent::SwapPathChanged { .. } => "swap_path_changed",
            AdapterEvent::SlippageToleranceChanged { .. } => "slippage_tolerance_changed",
            AdapterEvent::ApyEstimateChanged { .. } => "apy_estimate_changed",
            AdapterEvent::Paused => "paused",
            AdapterEvent::Unpaused => "unpaused",
            AdapterEvent::EmergencyExited { .. } => "emergency_exited",
            AdapterEvent::TokenRescued { .. } => "token_rescued",
        }
    }
}

#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub event: AdapterEvent,
}

impl Storable for EventRecord {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(candid::encode_one(self).expect("EventRecord is always candid-encodable"))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        candid::decode_one(&bytes).expect("EventRecord bytes were written by to_bytes")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Destination for adapter events
pub trait EventSink {
    /// Append an event, returning its sequence number
    fn record(&self, timestamp: u64, event: AdapterEvent) -> u64;
}

/// Append-only event journal over stable memory
pub struct EventJournal<M: Memory> {
    records: RefCell<StableBTreeMap<u64, EventRecord, M>>,
}

impl<M: Memory> EventJournal<M> {
    pub fn init(memory: M) -> Self {
        Self {
            records: RefCell::new(StableBTreeMap::init(memory)),
        }
    }

    pub fn len(&self) -> u64 {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Page through the journal oldest-first; `limit` is capped at `MAX_EVENT_PAGE`
    pub fn page(&self, offset: u64, limit: u64) -> (Vec<EventRecord>, u64) {
        let records = self.records.borrow();
        let total = records.len();
        let end = total.min(offset.saturating_add(limit.min(MAX_EVENT_PAGE)));

        let page = (offset..end).filter_map(|seq| records.get(&seq)).collect();
        (page, total)
    }
}

impl<M: Memory> EventSink for EventJournal<M> {
    fn record(&self, timestamp: u64, event: AdapterEvent) -> u64 {
        let mut records = self.records.borrow_mut();
        let seq = records.len();

        tracing::info!(seq, event = event.name(), "adapter event");
        records.insert(seq, EventRecord { seq, timestamp, event });
        seq
    }
}
