/// Shared types for the liquidity fee engine
///
/// This crate provides the common type definitions, constants, and error
/// taxonomy used by the math helpers and the market liquidity core.

pub mod accounts;
pub mod constants;
pub mod errors;
pub mod events;
pub mod market;

// Re-export all public types
pub use accounts::*;
pub use constants::*;
pub use errors::*;
pub use events::*;
pub use market::*;

pub use rust_decimal::Decimal;

/// Result type alias using the shared error type
pub type LiquidityResult<T> = std::result::Result<T, LiquidityError>;

/// Party identifier, ordered lexicographically wherever iteration is observable
pub type PartyId = String;

/// Market identifier
pub type MarketId = String;

/// Settlement asset identifier
pub type AssetId = String;

/// Integer ledger amount in asset units
pub type Amount = u64;

/// Integer price in market units
pub type Price = u64;

/// Block time in unix nanoseconds
pub type Timestamp = i64;
