//! Market liquidity core: equity-like shares, liquidity commitments, and
//! SLA-driven fee distribution for one market of a replicated exchange.

pub mod config;
pub mod equity_shares;
pub mod fatal;
pub mod fee_distribution;
pub mod market_liquidity;
pub mod scores;
pub mod snapshot;
pub mod traits;

pub use config::LiquidityConfig;
pub use equity_shares::{EquityShareRecord, EquityShares, EquitySharesState, LiquidityProvider};
pub use fatal::{fatal, OrFatal};
pub use fee_distribution::FeeDistribution;
pub use market_liquidity::{lp_price_range, MarketLiquidity};
pub use scores::{LiquidityScoreAverages, ScoreAverage, ScoreRecord};
pub use snapshot::{Checkpoint, SharedComponent, SnapshotEntry, SnapshotRegistry, StatefulComponent};
pub use traits::{Broker, Collateral, LiquidityEngine, MarketContext, OrderBook, Provisions};
