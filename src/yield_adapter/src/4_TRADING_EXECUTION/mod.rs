//! # Trading Execution Module
//!
//! Token movement for the adapters: approvals, swaps, slippage math and
//! payouts. Nothing here holds state; callers pass the venues in.
//!
//! ## Architecture
//! - **approvals/**: lazy, exact ICRC-2 allowances per pull, and their fee budget
//! - **swaps/**: exact-input swaps along an explicit path
//! - **liquidity/**: two-sided add/remove bounded on both legs
//! - **slippage/**: quote math and post-trade validation
//! - **transfers/**: fee-aware payouts and refunds
//!
//! ## Key Constraints
//! - **ICRC-2 Only**: venues pull from the adapter against an allowance
//! - **No Standing Approvals**: allowance set to exactly what one pull needs
//! - **Deadlines**: every router call expires 5 minutes after the operation began
//! - **Balance Deltas**: realized output is what the adapter's balance says
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let venue = SwapVenue {
//!     ledger: &ledger,
//!     router: &router,
//!     router_id,
//!     self_id,
//!     tolerance_bps: 50,
//!     now: ctx.now,
//! };
//! let outcome = swaps::execute_swap(&venue, &[reward, intermediate, asset], reward_balance).await?;
//! transfers::pay_out(&ledger, asset, recipient, &outcome.received).await?;
//! ```

pub mod approvals;
pub mod swaps;
pub mod liquidity;
pub mod slippage;
pub mod transfers;

pub use approvals::{approval_cost, ensure_allowance, pullable_amount};
pub use slippage::{quote_amount_out, validate_min_output, Quote};
pub use swaps::{execute_swap, SwapVenue};
pub use liquidity::{add_liquidity_bounded, remove_liquidity_bounded};
pub use transfers::pay_out;
