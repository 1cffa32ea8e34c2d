use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Amount, MarketState, PartyId};

// ============================================================================
// Main Error Enum
// ============================================================================

/// Errors raised by the liquidity fee engine.
///
/// Validation errors reject the triggering action and leave state untouched.
/// Invariant violations mean the replicated state can no longer be trusted;
/// callers route them through the fatal path instead of recovering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiquidityError {
    // ========================================================================
    // Commitment Validation Errors
    // ========================================================================

    /// Commitment is below the quantum-scaled minimum
    #[error("Commitment amount {amount} is below the minimum of {minimum}")]
    CommitmentAmountTooLow { amount: Amount, minimum: Decimal },

    /// Market state does not accept liquidity changes
    #[error("Commitment submission not allowed while market is {state:?}")]
    CommitmentSubmissionNotAllowed { state: MarketState },

    /// Party has no active or pending provision
    #[error("Party {party} is not a liquidity provider")]
    PartyNotLiquidityProvider { party: PartyId },

    /// Party has nothing left to cancel
    #[error("Party {party} has no existing liquidity provision")]
    PartyHasNoExistingLiquidityProvision { party: PartyId },

    /// General account cannot cover the requested bond increase
    #[error("Party {party} cannot cover a bond of {required}")]
    NotEnoughStake { party: PartyId, required: Amount },

    /// Amendment is malformed
    #[error("Invalid amendment: {reason}")]
    InvalidAmendment { reason: String },

    /// Liquidity engine refused the change
    #[error("Liquidity engine rejected {operation}: {reason}")]
    EngineRejected { operation: String, reason: String },

    /// Collateral transfer failed
    #[error("Collateral {operation} failed: {reason}")]
    Collateral { operation: String, reason: String },

    /// Order book has no two-sided market to price against
    #[error("No valid price range: {reason}")]
    NoPriceRange { reason: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================

    /// Configuration value out of range
    #[error("Invalid parameter '{parameter}': got '{value}', expected {expected}")]
    InvalidParameter { parameter: String, value: String, expected: String },

    /// Configuration could not be read or parsed
    #[error("Config error: {message}")]
    Config { message: String },

    // ========================================================================
    // Invariant Violations
    // ========================================================================

    /// Arithmetic overflow occurred
    #[error("Math overflow in '{operation}' with values: {values:?}")]
    MathOverflow { operation: String, values: Vec<String> },

    /// Division by zero
    #[error("Division by zero in context: {context}")]
    DivisionByZero { context: String },

    /// Bond account expected to exist is missing
    #[error("Bond account missing for party {party} in market {market}")]
    BondAccountMissing { party: PartyId, market: String },

    /// Opening auction ended twice
    #[error("Opening auction already ended for market {market}")]
    OpeningAuctionAlreadyEnded { market: String },

    /// Balances or bookkeeping disagree mid-pipeline
    #[error("Inconsistent state: {context}")]
    InconsistentState { context: String },

    /// Checkpoint could not be produced or restored
    #[error("Snapshot error: {reason}")]
    Snapshot { reason: String },
}

// ============================================================================
// Error Helpers
// ============================================================================

impl LiquidityError {
    /// Create a math overflow error
    pub fn math_overflow(operation: &str, values: &[&str]) -> Self {
        Self::MathOverflow {
            operation: operation.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a division by zero error
    pub fn division_by_zero(context: &str) -> Self {
        Self::DivisionByZero {
            context: context.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, value: &str, expected: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create a collateral error
    pub fn collateral(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::Collateral {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an engine rejection error
    pub fn engine_rejected(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::EngineRejected {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an inconsistent state error
    pub fn inconsistent(context: impl Into<String>) -> Self {
        Self::InconsistentState {
            context: context.into(),
        }
    }

    /// Create a snapshot error
    pub fn snapshot(reason: impl std::fmt::Display) -> Self {
        Self::Snapshot {
            reason: reason.to_string(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is an invariant violation that must halt the node
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MathOverflow { .. }
                | Self::DivisionByZero { .. }
                | Self::BondAccountMissing { .. }
                | Self::OpeningAuctionAlreadyEnded { .. }
                | Self::InconsistentState { .. }
                | Self::Snapshot { .. }
        )
    }
}
