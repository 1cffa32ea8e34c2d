//! Ledger accounts, transfers and the movements they produce

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Amount, AssetId, MarketId, PartyId};

/// Owner of market-level accounts that belong to no party
pub const SYSTEM_OWNER: &str = "*";

// ============================================================================
// Accounts
// ============================================================================

/// Kind of ledger account touched by the liquidity engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Party's free collateral
    General,
    /// Party's collateral earmarked against its commitment
    Bond,
    /// Party's accrued, not yet distributed, liquidity fees
    LpLiquidityFees,
    /// Market-wide liquidity fees collected from trades
    FeesLiquidity,
    /// Market-wide pool of unpaid fees awaiting bonus distribution
    LiquidityFeesBonusDistribution,
    /// Market insurance pool receiving slashed collateral
    Insurance,
}

impl AccountType {
    /// Whether the account is held per party rather than per market
    pub fn is_party_account(&self) -> bool {
        matches!(
            self,
            AccountType::General | AccountType::Bond | AccountType::LpLiquidityFees
        )
    }
}

/// A single ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub owner: PartyId,
    pub market_id: MarketId,
    pub asset: AssetId,
    pub account_type: AccountType,
    pub balance: Amount,
}

/// Deterministic account identifier
pub fn account_id(owner: &str, market_id: &str, asset: &str, account_type: AccountType) -> String {
    // General accounts are shared across markets
    let market = if account_type == AccountType::General { "" } else { market_id };
    format!("{}/{}/{}/{:?}", owner, market, asset, account_type)
}

// ============================================================================
// Transfers
// ============================================================================

/// Purpose of a transfer, which also fixes its source and destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferType {
    /// General to bond when a commitment grows
    BondLow,
    /// Bond to general when a commitment shrinks
    BondHigh,
    /// Bond to insurance for an early exit
    BondSlashing,
    /// Bond to insurance for a missed SLA
    SlaPenaltyBondApply,
    /// Accrued fees to insurance when no fees can be paid at all
    SlaPenaltyLpFeeApply,
    /// Market fee pool to a provider's accrued fee account
    LiquidityFeeAllocate,
    /// Accrued fees to the provider's general account
    LiquidityFeeNetDistribute,
    /// Withheld accrued fees to the market bonus pool
    LiquidityFeeUnpaidCollect,
    /// Market bonus pool to a provider's general account
    SlaPerformanceBonusDistribute,
}

impl TransferType {
    /// Source and destination account kinds for this transfer
    pub fn accounts(&self) -> (AccountType, AccountType) {
        use AccountType::*;
        match self {
            TransferType::BondLow => (General, Bond),
            TransferType::BondHigh => (Bond, General),
            TransferType::BondSlashing => (Bond, Insurance),
            TransferType::SlaPenaltyBondApply => (Bond, Insurance),
            TransferType::SlaPenaltyLpFeeApply => (LpLiquidityFees, Insurance),
            TransferType::LiquidityFeeAllocate => (FeesLiquidity, LpLiquidityFees),
            TransferType::LiquidityFeeNetDistribute => (LpLiquidityFees, General),
            TransferType::LiquidityFeeUnpaidCollect => {
                (LpLiquidityFees, LiquidityFeesBonusDistribution)
            }
            TransferType::SlaPerformanceBonusDistribute => {
                (LiquidityFeesBonusDistribution, General)
            }
        }
    }
}

/// Instruction to move funds on behalf of a party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub owner: PartyId,
    pub asset: AssetId,
    pub amount: Amount,
    /// Smallest amount the ledger may move when the source runs short
    pub min_amount: Amount,
    pub transfer_type: TransferType,
}

impl Transfer {
    /// Transfer that must move exactly `amount`
    pub fn exact(owner: &str, asset: &str, amount: Amount, transfer_type: TransferType) -> Self {
        Self {
            owner: owner.to_string(),
            asset: asset.to_string(),
            amount,
            min_amount: amount,
            transfer_type,
        }
    }
}

/// Batch of fee transfers plus the per-party totals it represents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTransfer {
    pub transfers: Vec<Transfer>,
    pub total_fees_per_party: BTreeMap<PartyId, Amount>,
}

impl FeeTransfer {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Append a transfer and account it against its owner
    pub fn push(&mut self, transfer: Transfer) {
        *self
            .total_fees_per_party
            .entry(transfer.owner.clone())
            .or_default() += transfer.amount;
        self.transfers.push(transfer);
    }
}

// ============================================================================
// Ledger Movements
// ============================================================================

/// One debit/credit pair applied by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub from_account: String,
    pub to_account: String,
    pub amount: Amount,
    pub transfer_type: TransferType,
}

/// Balance of an account after a movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBalance {
    pub account_id: String,
    pub balance: Amount,
}

/// Entries and resulting balances produced by one transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub entries: Vec<LedgerEntry>,
    pub balances: Vec<PostBalance>,
}
