//! Stable storage management for upgrade persistence
//!
//! Stable memory is split by a `MemoryManager`:
//! - memory 0: event journal (`StableBTreeMap`, lives across upgrades on its own)
//! - memory 1: adapter snapshot (`StableCell`, written in `pre_upgrade`)

use std::borrow::Cow;
use std::cell::RefCell;
use candid::{CandidType, Deserialize, Nat};
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::{storable::Bound, DefaultMemoryImpl, Memory, StableCell, Storable};
use crate::infrastructure::{Result, AdapterError, SystemError};
use crate::infrastructure::admin::{AccessState, AdminAction};
use crate::infrastructure::config::AdapterConfig;
use crate::types::FarmState;

pub type CanisterMemory = VirtualMemory<DefaultMemoryImpl>;

const EVENTS_MEMORY_ID: MemoryId = MemoryId::new(0);
const SNAPSHOT_MEMORY_ID: MemoryId = MemoryId::new(1);

thread_local! {
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));
}

pub fn events_memory() -> CanisterMemory {
    MEMORY_MANAGER.with(|m| m.borrow().get(EVENTS_MEMORY_ID))
}

fn snapshot_memory() -> CanisterMemory {
    MEMORY_MANAGER.with(|m| m.borrow().get(SNAPSHOT_MEMORY_ID))
}

/// Farm-only mutable state
#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct FarmSnapshot {
    pub state: FarmState,
    pub cost_basis: Nat,
}

/// Everything needed to reinstall the adapter after an upgrade.
/// `config` carries the live route and APY estimate, not the init values.
#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct AdapterSnapshot {
    pub access: AccessState,
    pub admin_log: Vec<AdminAction>,
    pub slippage_bps: u32,
    pub config: AdapterConfig,
    pub farm: Option<FarmSnapshot>,
}

#[derive(CandidType, Deserialize, Default, Debug, Clone, PartialEq)]
struct StoredSnapshot(Option<AdapterSnapshot>);

impl Storable for StoredSnapshot {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(candid::encode_one(self).expect("snapshot is always candid-encodable"))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        // An unreadable cell is treated as empty; restore then reports NotInitialized
        candid::decode_one(&bytes).unwrap_or_default()
    }

    const BOUND: Bound = Bound::Unbounded;
}

pub struct SnapshotStore<M: Memory> {
    cell: StableCell<StoredSnapshot, M>,
}

impl<M: Memory> SnapshotStore<M> {
    pub fn init(memory: M) -> Result<Self> {
        let cell = StableCell::init(memory, StoredSnapshot::default()).map_err(|e| {
            AdapterError::System(SystemError::StableStorage {
                reason: format!("snapshot cell init failed: {:?}", e),
            })
        })?;
        Ok(Self { cell })
    }

    pub fn save(&mut self, snapshot: AdapterSnapshot) -> Result<()> {
        self.cell
            .set(StoredSnapshot(Some(snapshot)))
            .map(|_| ())
            .map_err(|e| AdapterError::System(SystemError::StableStorage {
                reason: format!("snapshot write failed: {:?}", e),
            }))
    }

    pub fn load(&self) -> Option<AdapterSnapshot> {
        self.cell.get().0.clone()
    }
}

/// Write the snapshot. Errors are logged, never trapped, so an upgrade can still proceed.
pub fn save_snapshot(snapshot: AdapterSnapshot) {
    let result = SnapshotStore::init(snapshot_memory()).and_then(|mut store| store.save(snapshot));

    match result {
        Ok(()) => tracing::info!("adapter snapshot saved to stable memory"),
        Err(e) => tracing::error!(error = %e, "failed to save adapter snapshot; state will reset on upgrade"),
    }
}

pub fn restore_snapshot() -> Result<AdapterSnapshot> {
    let store = SnapshotStore::init(snapshot_memory())?;
    store.load().ok_or(AdapterError::System(SystemError::NotInitialized))
}
