//! # Critical Operations
//!
//! Every path that moves Vault capital lives here.
//!
//! - `adapter/`: the `YieldAdapter` contract and shared core (auth, lock, events, unwind helpers)
//! - `lending/`: exchange-rate lending market strategy
//! - `farming/`: swap-half, add-liquidity, stake strategy

pub mod adapter;
pub mod lending;
pub mod farming;

pub use adapter::{AdapterCore, YieldAdapter};
pub use lending::LendingAdapter;
pub use farming::FarmAdapter;
