//! Protocol constants shared by both adapters

/// Basis-point denominator (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default slippage tolerance applied to every swap and liquidity leg (0.5%)
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Hard ceiling for any configured slippage tolerance (10%)
pub const MAX_SLIPPAGE_BPS: u32 = 1_000;

/// Swap fee charged by constant-product pools (0.3%)
pub const DEFAULT_POOL_FEE_BPS: u32 = 30;

/// Fixed-point scale of the lending market exchange rate and supply rate (1e18)
pub const EXCHANGE_RATE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Seconds per (non-leap) year, used to annualize per-second supply rates
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Return code the lending market uses to signal success on mint/redeem
pub const MARKET_SUCCESS_CODE: u64 = 0;

/// Forward-looking deadline attached to every router call (5 minutes)
pub const SWAP_DEADLINE_NANOS: u64 = 300_000_000_000;

/// Allowance expiry for lazily granted approvals (15 minutes)
pub const APPROVAL_EXPIRY_NANOS: u64 = 900_000_000_000;

/// Placeholder APY reported by the farm adapter until the owner sets one (12%)
pub const DEFAULT_FARM_APY_BPS: u64 = 1_200;

/// Maximum number of events returned by a single journal page
pub const MAX_EVENT_PAGE: u64 = 100;

/// Admin action log retention
pub const MAX_ADMIN_LOG_ENTRIES: usize = 1_000;

/// Minimum number of tokens in a swap route (input and output)
pub const MIN_SWAP_PATH_LEN: usize = 2;

/// Maximum number of tokens in a swap route
pub const MAX_SWAP_PATH_LEN: usize = 4;

/// Memo attached to ledger operations issued by the adapter
pub const LEDGER_MEMO: &[u8] = b"yield adapter";
