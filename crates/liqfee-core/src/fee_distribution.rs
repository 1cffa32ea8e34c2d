//! # SLA Fee Distribution
//!
//! Stateless stages that turn balances, shares and SLA penalties into ledger
//! transfers. The market liquidity coordinator executes each stage's
//! transfers before computing the next one, since later stages read balances
//! produced by earlier ones.
//!
//! Every stage iterates parties in ascending order and converts Decimal
//! amounts to ledger units by truncation.

use std::collections::BTreeMap;

use liqfee_math::{
    decimal_from_uint, div, mul, remainder_recipient_index, sub, sum, uint_from_decimal,
};
use liqfee_types::{
    Amount, FeeTransfer, LiquidityError, LiquidityResult, PartyId, SlaPenalty, Transfer,
    TransferType,
};
use rust_decimal::Decimal;

// ============================================================================
// Stage 0: Fee Allocation
// ============================================================================

/// Multiply each share by the party's average liquidity score and renormalize
///
/// A party without a score counts as scoring zero. If every weighted share is
/// zero the result is all zeros.
pub fn weight_shares_by_scores(
    shares: &BTreeMap<PartyId, Decimal>,
    scores: &BTreeMap<PartyId, Decimal>,
) -> LiquidityResult<BTreeMap<PartyId, Decimal>> {
    let weighted = shares
        .iter()
        .map(|(party, share)| {
            let score = scores.get(party).copied().unwrap_or(Decimal::ZERO);
            Ok((party.clone(), mul(*share, score)?))
        })
        .collect::<LiquidityResult<BTreeMap<PartyId, Decimal>>>()?;

    let total = sum(weighted.values().copied())?;
    if total.is_zero() {
        return Ok(weighted);
    }

    weighted
        .into_iter()
        .map(|(party, value)| Ok((party, div(value, total)?)))
        .collect()
}

/// Split the market's collected liquidity fees across providers
///
/// The rounding remainder stays in the market fee account.
pub fn allocate_fees(
    asset: &str,
    balance: Amount,
    shares: &BTreeMap<PartyId, Decimal>,
    scores: &BTreeMap<PartyId, Decimal>,
) -> LiquidityResult<FeeTransfer> {
    let mut fee_transfer = FeeTransfer::default();
    if balance == 0 || shares.is_empty() {
        return Ok(fee_transfer);
    }

    let weighted = weight_shares_by_scores(shares, scores)?;
    let available = balance;
    let balance = decimal_from_uint(balance);
    let mut allocated: Amount = 0;
    for (party, share) in &weighted {
        // Rounded shares may sum past 1; never allocate beyond the account balance
        let amount = uint_from_decimal(mul(balance, *share)?)?.min(available - allocated);
        if amount == 0 {
            continue;
        }
        allocated += amount;
        fee_transfer.push(Transfer::exact(party, asset, amount, TransferType::LiquidityFeeAllocate));
    }

    Ok(fee_transfer)
}

// ============================================================================
// Stage 1: Bond Penalties
// ============================================================================

/// Slash `bond_penalty * commitment` from each penalized party's bond
///
/// Parties without a commitment are skipped.
pub fn bond_penalty_transfers(
    asset: &str,
    commitments: &BTreeMap<PartyId, Amount>,
    penalties: &BTreeMap<PartyId, SlaPenalty>,
) -> LiquidityResult<Vec<Transfer>> {
    let mut transfers = Vec::new();
    for (party, penalty) in penalties {
        let Some(commitment) = commitments.get(party) else {
            continue;
        };
        if penalty.bond.is_zero() {
            continue;
        }

        let amount = uint_from_decimal(mul(decimal_from_uint(*commitment), penalty.bond)?)?;
        if amount == 0 {
            continue;
        }
        transfers.push(Transfer::exact(party, asset, amount, TransferType::SlaPenaltyBondApply));
    }
    Ok(transfers)
}

// ============================================================================
// Stage 2: Net Fees and Bonus Weights
// ============================================================================

/// Net fee transfers plus each party's normalized bonus weight
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeDistribution {
    pub fee_transfer: FeeTransfer,
    pub bonus_weights: BTreeMap<PartyId, Decimal>,
}

/// Pay out accrued fees net of fee penalties and collect the rest for bonuses
pub fn distribute_fees(
    asset: &str,
    accrued: &BTreeMap<PartyId, Amount>,
    penalties: &BTreeMap<PartyId, SlaPenalty>,
) -> LiquidityResult<FeeDistribution> {
    let mut distribution = FeeDistribution::default();
    let total_accrued = accrued.values().copied().try_fold(0u64, |acc, v| {
        acc.checked_add(v).ok_or_else(|| {
            LiquidityError::math_overflow("accrued fee total", &[&acc.to_string(), &v.to_string()])
        })
    })?;
    let total_accrued = decimal_from_uint(total_accrued);

    let mut raw_weights = BTreeMap::new();
    for (party, penalty) in penalties {
        let balance = accrued.get(party).copied().unwrap_or(0);
        let payable = sub(Decimal::ONE, penalty.fee)?;
        let balance_dec = decimal_from_uint(balance);

        let net = uint_from_decimal(mul(payable, balance_dec)?)?;
        let unpaid = balance.saturating_sub(net);

        if net > 0 {
            distribution.fee_transfer.push(Transfer::exact(
                party,
                asset,
                net,
                TransferType::LiquidityFeeNetDistribute,
            ));
        }
        if unpaid > 0 {
            distribution.fee_transfer.push(Transfer::exact(
                party,
                asset,
                unpaid,
                TransferType::LiquidityFeeUnpaidCollect,
            ));
        }

        let weight = if total_accrued.is_zero() {
            Decimal::ZERO
        } else {
            div(mul(payable, balance_dec)?, total_accrued)?
        };
        raw_weights.insert(party.clone(), weight);
    }

    let total_weight = sum(raw_weights.values().copied())?;
    if total_weight.is_zero() {
        return Ok(distribution);
    }

    for (party, weight) in raw_weights {
        if weight.is_zero() {
            continue;
        }
        distribution.bonus_weights.insert(party, div(weight, total_weight)?);
    }

    Ok(distribution)
}

/// Move every party's accrued fees to the insurance pool
///
/// Used when no party is entitled to any fee for the epoch.
pub fn sweep_fees(asset: &str, accrued: &BTreeMap<PartyId, Amount>) -> FeeTransfer {
    let mut fee_transfer = FeeTransfer::default();
    for (party, balance) in accrued {
        if *balance == 0 {
            continue;
        }
        fee_transfer.push(Transfer::exact(party, asset, *balance, TransferType::SlaPenaltyLpFeeApply));
    }
    fee_transfer
}

// ============================================================================
// Stage 3: Performance Bonuses
// ============================================================================

/// Distribute the bonus pool by weight; the rounding remainder goes to one party
///
/// The remainder recipient is chosen by [`remainder_recipient_index`] over
/// the parties holding a bonus weight, in ascending order.
pub fn performance_bonus_transfers(
    asset: &str,
    pool_balance: Amount,
    bonus_weights: &BTreeMap<PartyId, Decimal>,
) -> LiquidityResult<FeeTransfer> {
    let mut fee_transfer = FeeTransfer::default();
    if pool_balance == 0 || bonus_weights.is_empty() {
        return Ok(fee_transfer);
    }

    let pool = decimal_from_uint(pool_balance);
    let mut amounts: Vec<(PartyId, Amount)> = Vec::with_capacity(bonus_weights.len());
    let mut distributed: Amount = 0;
    for (party, weight) in bonus_weights {
        let amount = uint_from_decimal(mul(pool, *weight)?)?.min(pool_balance - distributed);
        distributed += amount;
        amounts.push((party.clone(), amount));
    }

    let remainder = pool_balance - distributed;
    if remainder > 0 {
        if let Some(index) = remainder_recipient_index(pool_balance, amounts.len()) {
            amounts[index].1 += remainder;
        }
    }

    for (party, amount) in amounts {
        if amount == 0 {
            continue;
        }
        fee_transfer.push(Transfer::exact(
            &party,
            asset,
            amount,
            TransferType::SlaPerformanceBonusDistribute,
        ));
    }
    Ok(fee_transfer)
}
