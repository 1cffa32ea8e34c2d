//! Market and liquidity provision types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, MarketId, PartyId};

// ============================================================================
// Market State
// ============================================================================

/// Lifecycle state of a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketState {
    Proposed,
    Pending,
    Active,
    Suspended,
    SuspendedViaGovernance,
    TradingTerminated,
    Settled,
    Closed,
    Cancelled,
    Rejected,
}

impl MarketState {
    /// Whether liquidity commitments may be submitted, amended or cancelled
    pub fn accepts_liquidity_changes(&self) -> bool {
        matches!(
            self,
            MarketState::Active
                | MarketState::Pending
                | MarketState::Suspended
                | MarketState::Proposed
                | MarketState::SuspendedViaGovernance
        )
    }
}

// ============================================================================
// Liquidity Provisions
// ============================================================================

/// Status of a liquidity provision as tracked by the liquidity engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisionStatus {
    Active,
    Pending,
    Stopped,
    Cancelled,
    Rejected,
}

/// A party's commitment to provide liquidity on a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProvision {
    pub id: String,
    pub party: PartyId,
    pub market_id: MarketId,
    pub commitment_amount: Amount,
    /// Proposed liquidity fee factor
    pub fee: Decimal,
    pub reference: String,
    pub status: ProvisionStatus,
}

/// Request to open a new commitment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProvisionSubmission {
    pub market_id: MarketId,
    pub commitment_amount: Amount,
    pub fee: Decimal,
    pub reference: String,
}

/// Request to change an existing commitment; unset fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProvisionAmendment {
    pub market_id: MarketId,
    pub commitment_amount: Option<Amount>,
    pub fee: Option<Decimal>,
    pub reference: Option<String>,
}

impl LiquidityProvisionAmendment {
    /// Fill unset fields from the provision being amended
    pub fn complete_from(&self, provision: &LiquidityProvision) -> Self {
        Self {
            market_id: self.market_id.clone(),
            commitment_amount: Some(self.commitment_amount.unwrap_or(provision.commitment_amount)),
            fee: Some(self.fee.unwrap_or(provision.fee)),
            reference: Some(
                self.reference
                    .clone()
                    .unwrap_or_else(|| provision.reference.clone()),
            ),
        }
    }

    /// Amendment that withdraws the whole commitment
    pub fn cancellation(provision: &LiquidityProvision) -> Self {
        Self {
            market_id: provision.market_id.clone(),
            commitment_amount: Some(0),
            fee: Some(provision.fee),
            reference: Some(provision.reference.clone()),
        }
    }
}

// ============================================================================
// SLA Penalties
// ============================================================================

/// Fractions in [0,1] withheld from a party for missing its SLA
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPenalty {
    pub fee: Decimal,
    pub bond: Decimal,
}

/// Penalties computed by the liquidity engine at epoch end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaPenalties {
    pub all_parties_have_full_fee_penalty: bool,
    pub penalties_per_party: std::collections::BTreeMap<PartyId, SlaPenalty>,
}
