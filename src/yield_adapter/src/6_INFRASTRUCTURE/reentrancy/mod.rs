//! Reentrancy guard for adapter operations
//! Serializes every multi-step operation on one adapter instance
//!
//! Each mutating operation awaits several inter-canister calls. Between those
//! awaits the canister can process other messages, so without a lock a second
//! deposit/withdraw/harvest could interleave and corrupt in-flight state (the
//! farm cost-basis ledger in particular). The guard is held for the whole
//! body of the operation and released on drop, including on early `?` returns.

use std::cell::Cell;
use crate::infrastructure::{Result, AdapterError, SystemError};

/// Operations that take the adapter lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOperation {
    Deposit,
    Withdraw,
    WithdrawAll,
    Harvest,
    EmergencyExit,
    Rescue,
}

impl AdapterOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterOperation::Deposit => "deposit",
            AdapterOperation::Withdraw => "withdraw",
            AdapterOperation::WithdrawAll => "withdraw_all",
            AdapterOperation::Harvest => "harvest",
            AdapterOperation::EmergencyExit => "emergency_exit",
            AdapterOperation::Rescue => "rescue",
        }
    }
}

/// Per-adapter lock; at most one operation active at a time
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    active: Cell<Option<AdapterOperation>>,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `op`, failing if any operation is in flight
    pub fn acquire(&self, op: AdapterOperation) -> Result<OperationGuard<'_>> {
        if let Some(active) = self.active.get() {
            return Err(AdapterError::System(SystemError::OperationInProgress {
                operation: op.as_str().to_string(),
                active: active.as_str().to_string(),
            }));
        }

        self.active.set(Some(op));
        tracing::debug!(operation = op.as_str(), "adapter lock acquired");
        Ok(OperationGuard { lock: self, op })
    }

    /// Currently running operation, if any
    pub fn current(&self) -> Option<AdapterOperation> {
        self.active.get()
    }
}

/// Releases the lock when dropped
pub struct OperationGuard<'a> {
    lock: &'a ReentrancyLock,
    op: AdapterOperation,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.lock.active.set(None);
        tracing::debug!(operation = self.op.as_str(), "adapter lock released");
    }
}
