//! Informational - APY estimates and adapter descriptions
//! Nothing here moves funds or feeds an accounting decision

pub mod apy;
pub mod display;

pub use apy::{annualize_supply_rate, bps_to_percent};
pub use display::AdapterInfo;
