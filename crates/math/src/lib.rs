/// Deterministic arithmetic for the liquidity fee engine
///
/// Every replica must derive identical values from identical inputs, so all
/// Decimal division goes through a single rounding rule and every conversion
/// to ledger units truncates.

pub mod safe;
pub mod selection;
pub mod tick;

// Re-export commonly used functions
pub use safe::*;
pub use selection::*;
pub use tick::*;
