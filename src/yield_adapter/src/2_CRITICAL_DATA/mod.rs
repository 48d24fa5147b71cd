//! Critical Data - Position valuation and cost-basis accounting
//! Source of truth for what an adapter reports to the Vault

pub mod position_value;
pub mod cost_basis;

pub use position_value::{farm_position_value, lending_position_value, read_pool_position};
pub use cost_basis::CostBasisLedger;
