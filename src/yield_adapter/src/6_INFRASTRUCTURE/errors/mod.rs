//! Error taxonomy for the adapter canister
//!
//! Every error crosses the Candid boundary unchanged, so the Vault sees the
//! same structured variant the adapter raised.
//!
//! ## Categories
//! - **Authorization**: caller is not the Vault / Owner. Never retried.
//! - **Venue**: degenerate venue state, non-success return codes, failed calls.
//! - **Trading**: realized output below the computed minimum, bad routes.
//! - **Validation**: malformed requests or configuration.
//! - **Calculation**: arithmetic that cannot produce a meaningful result.
//! - **System**: reentrancy, lifecycle state, unwind and storage failures.

use candid::{CandidType, Deserialize, Nat, Principal};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("calculation error: {0}")]
    Calculation(#[from] CalculationError),

    #[error("system error: {0}")]
    System(#[from] SystemError),
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum AuthorizationError {
    #[error("caller {caller} is not the registered vault")]
    NotVault { caller: Principal },

    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Principal },
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum VenueError {
    #[error("call to {venue}.{method} failed: {reason}")]
    CallFailed {
        venue: String,
        method: String,
        reason: String,
    },

    #[error("{venue}.{method} rejected the request: {reason}")]
    Rejected {
        venue: String,
        method: String,
        reason: String,
    },

    #[error("{operation} returned non-success code {code}")]
    NonSuccessCode { operation: String, code: u64 },

    #[error("market reports degenerate exchange rate {rate}")]
    DegenerateExchangeRate { rate: Nat },

    #[error("{operation} reported success but the position did not change")]
    NoPositionChange { operation: String },
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum TradingError {
    #[error("output {actual} below minimum {minimum} (expected {expected})")]
    SlippageExceeded {
        expected: Nat,
        minimum: Nat,
        actual: Nat,
    },

    #[error("invalid swap path: {reason}")]
    InvalidSwapPath { reason: String },

    #[error("invalid swap amount: {reason}")]
    InvalidSwapAmount { reason: String },

    #[error("slippage tolerance {bps} bps outside [0, {max}]")]
    InvalidTolerance { bps: u32, max: u32 },

    #[error("approval of {amount} {token} failed: {reason}")]
    ApprovalFailed {
        token: Principal,
        amount: Nat,
        reason: String,
    },
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{operation} requires a non-zero amount")]
    ZeroAmount { operation: String },

    #[error("invalid principal {principal} for {role}")]
    InvalidPrincipal { principal: Principal, role: String },

    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("{operation} is not supported by the {adapter} adapter")]
    UnsupportedOperation { operation: String, adapter: String },

    #[error("token {token} backs the live position and cannot be rescued")]
    ProtectedToken { token: Principal },
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("division by zero in {operation}")]
    DivisionByZero { operation: String },

    #[error("overflow in {operation}")]
    Overflow { operation: String },
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq, Error)]
pub enum SystemError {
    #[error("cannot start {operation}: {active} already in progress")]
    OperationInProgress { operation: String, active: String },

    #[error("adapter is {state}; {operation} not allowed")]
    InvalidState { state: String, operation: String },

    #[error("adapter not initialized")]
    NotInitialized,

    #[error("operation failed ({cause}) and unwinding also failed ({unwind_error})")]
    UnwindIncomplete { cause: String, unwind_error: String },

    #[error("stable storage: {reason}")]
    StableStorage { reason: String },
}
