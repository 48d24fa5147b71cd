//! Infrastructure - Shared utilities and types
//! Foundation layer for all other modules

pub mod constants;
pub mod errors;
pub mod math;
pub mod logging;
pub mod config;
pub mod events;
pub mod reentrancy;
pub mod stable_storage;
pub mod admin;

// Re-export commonly used items
pub use constants::*;
pub use errors::{
    AdapterError, Result, AuthorizationError, VenueError, TradingError,
    ValidationError, CalculationError, SystemError,
};
pub use math::{multiply_and_divide, saturating_sub, is_zero, nat_zero};
pub use reentrancy::{ReentrancyLock, AdapterOperation, OperationGuard};
pub use admin::{AccessControl, AdminAction, reject_anonymous};
pub use events::{EventRecord, EventJournal};
pub use config::{AdapterConfig, AdapterInitArgs, LendingConfig, FarmConfig};
