//! Protocol constants used across the liquidity fee engine

use rust_decimal::Decimal;

// ============================================================================
// Arithmetic Constants
// ============================================================================

/// Decimal places kept by every Decimal division
pub const DIVISION_PRECISION: u32 = 16;

// ============================================================================
// Snapshot Namespaces
// ============================================================================

/// Namespace under which market liquidity state is checkpointed
pub const LIQUIDITY_SNAPSHOT_NAMESPACE: &str = "liquidity";

/// Namespace under which rolling liquidity scores are checkpointed
pub const LIQUIDITY_SCORES_SNAPSHOT_NAMESPACE: &str = "liquidity_scores";

// ============================================================================
// Network Parameter Defaults
// ============================================================================

/// Default fraction of an early commitment reduction that is slashed
pub const DEFAULT_EARLY_EXIT_PENALTY: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Default minimum commitment expressed in multiples of the asset quantum
pub const DEFAULT_MIN_LP_STAKE_QUANTUM_MULTIPLE: Decimal = Decimal::ONE;

/// Default relative distance from mid within which LP orders count
pub const DEFAULT_SLA_PRICE_RANGE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Default price tick size
pub const DEFAULT_TICK_SIZE: u64 = 1;

/// Default interval between liquidity fee allocations, in seconds
pub const DEFAULT_FEE_CALCULATION_TIME_STEP_SECS: u64 = 60;
