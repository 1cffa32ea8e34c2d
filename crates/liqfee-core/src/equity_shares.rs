//! # Equity-Like Shares
//!
//! Tracks each liquidity provider's proportional entitlement to liquidity
//! fees. Committed capital (`stake`) is grown into a `virtual_stake` by the
//! market's value growth once the opening auction has ended, and each share is
//! `virtual_stake / total_virtual_stake`.
//!
//! Providers are held in a `BTreeMap` so every aggregate and every emitted
//! row is produced in ascending party order.

use std::collections::{BTreeMap, BTreeSet};

use liqfee_math::{add, div, mul, mul_div, sub, sum};
use liqfee_types::{LiquidityError, LiquidityResult, MarketId, PartyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-party ledger row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProvider {
    /// Physically committed capital
    pub stake: Decimal,
    /// Growth-adjusted capital, never below `stake`
    pub virtual_stake: Decimal,
    /// Weighted average market valuation at which capital was committed
    pub avg_entry_valuation: Decimal,
    /// Cached share, refreshed whenever the ledger is marked stale
    pub share: Decimal,
}

/// Serialized ledger row, also used to inherit rows from a predecessor market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityShareRecord {
    pub party: PartyId,
    pub stake: Decimal,
    pub virtual_stake: Decimal,
    pub avg_entry_valuation: Decimal,
    pub share: Decimal,
}

impl EquityShareRecord {
    fn from_provider(party: &str, provider: &LiquidityProvider) -> Self {
        Self {
            party: party.to_string(),
            stake: provider.stake,
            virtual_stake: provider.virtual_stake,
            avg_entry_valuation: provider.avg_entry_valuation,
            share: provider.share,
        }
    }

    fn to_provider(&self) -> LiquidityProvider {
        LiquidityProvider {
            stake: self.stake,
            virtual_stake: self.virtual_stake.max(self.stake),
            avg_entry_valuation: self.avg_entry_valuation,
            share: self.share,
        }
    }
}

/// Checkpointed ledger contents; totals are re-derived on restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySharesState {
    pub market_value_proxy: Decimal,
    pub growth_rate: Decimal,
    pub opening_auction_ended: bool,
    pub providers: Vec<EquityShareRecord>,
    pub pending_inheritance: Vec<EquityShareRecord>,
}

/// Equity-like share ledger of a single market
#[derive(Debug, Clone)]
pub struct EquityShares {
    market_id: MarketId,
    market_value_proxy: Decimal,
    growth_rate: Decimal,
    total_physical_stake: Decimal,
    total_virtual_stake: Decimal,
    providers: BTreeMap<PartyId, LiquidityProvider>,
    opening_auction_ended: bool,
    pending_inheritance: Vec<EquityShareRecord>,
    stale: bool,
}

impl EquityShares {
    pub fn new(market_id: impl Into<MarketId>) -> Self {
        Self {
            market_id: market_id.into(),
            market_value_proxy: Decimal::ZERO,
            growth_rate: Decimal::ZERO,
            total_physical_stake: Decimal::ZERO,
            total_virtual_stake: Decimal::ZERO,
            providers: BTreeMap::new(),
            opening_auction_ended: false,
            pending_inheritance: Vec::new(),
            stale: false,
        }
    }

    // ========================================================================
    // Commitments
    // ========================================================================

    /// Set a party's committed stake; zero withdraws the party entirely
    pub fn set_party_stake(&mut self, party: &str, new_stake: Decimal) -> LiquidityResult<()> {
        if new_stake.is_sign_negative() && !new_stake.is_zero() {
            return Err(LiquidityError::inconsistent(format!(
                "negative stake {} for party {} in market {}",
                new_stake, party, self.market_id
            )));
        }

        let current = self.providers.get(party).cloned();
        match current {
            None if new_stake.is_zero() => return Ok(()),
            Some(_) if new_stake.is_zero() => {
                self.providers.remove(party);
            }
            Some(provider) if provider.stake == new_stake => return Ok(()),
            Some(provider) if new_stake < provider.stake => {
                let updated = self.decrease(&provider, new_stake)?;
                self.providers.insert(party.to_string(), updated);
            }
            existing => {
                let provider = existing.unwrap_or_default();
                let updated = self.increase(&provider, new_stake)?;
                self.providers.insert(party.to_string(), updated);
            }
        }

        self.reconcile_totals()?;
        self.stale = true;
        Ok(())
    }

    /// Grow a commitment; a new provider is an increase from zero
    fn increase(&self, provider: &LiquidityProvider, new_stake: Decimal) -> LiquidityResult<LiquidityProvider> {
        let delta = sub(new_stake, provider.stake)?;
        let total_after = add(self.total_virtual_stake, delta)?;

        let kept = mul_div(provider.avg_entry_valuation, provider.stake, new_stake)?;
        let added = mul_div(total_after, delta, new_stake)?;

        Ok(LiquidityProvider {
            stake: new_stake,
            virtual_stake: add(provider.virtual_stake, delta)?,
            avg_entry_valuation: add(kept, added)?,
            share: provider.share,
        })
    }

    /// Shrink a commitment; virtual stake scales, entry valuation is unchanged
    fn decrease(&self, provider: &LiquidityProvider, new_stake: Decimal) -> LiquidityResult<LiquidityProvider> {
        let virtual_stake = mul_div(provider.virtual_stake, new_stake, provider.stake)?;
        Ok(LiquidityProvider {
            stake: new_stake,
            virtual_stake: virtual_stake.max(new_stake),
            avg_entry_valuation: provider.avg_entry_valuation,
            share: provider.share,
        })
    }

    fn reconcile_totals(&mut self) -> LiquidityResult<()> {
        self.total_physical_stake = sum(self.providers.values().map(|p| p.stake))?;
        self.total_virtual_stake = sum(self.providers.values().map(|p| p.virtual_stake))?;
        Ok(())
    }

    // ========================================================================
    // Market Growth
    // ========================================================================

    /// Feed a new market value proxy observation
    pub fn record_growth(&mut self, market_value_proxy: Decimal) -> LiquidityResult<()> {
        if !self.opening_auction_ended {
            self.market_value_proxy = market_value_proxy;
            self.growth_rate = Decimal::ZERO;
            return Ok(());
        }

        if market_value_proxy.is_zero() {
            self.growth_rate = Decimal::ZERO;
            return Ok(());
        }

        self.growth_rate = if self.market_value_proxy.is_zero() {
            Decimal::ZERO
        } else {
            div(sub(market_value_proxy, self.market_value_proxy)?, self.market_value_proxy)?
        };
        self.market_value_proxy = market_value_proxy;

        if self.growth_rate.is_zero() {
            return Ok(());
        }

        let factor = add(Decimal::ONE, self.growth_rate)?;
        for provider in self.providers.values_mut() {
            let grown = mul(provider.virtual_stake, factor)?;
            provider.virtual_stake = grown.max(provider.stake);
        }

        let previous_total = self.total_virtual_stake;
        self.reconcile_totals()?;
        if self.total_virtual_stake != previous_total {
            self.stale = true;
        }
        Ok(())
    }

    /// Mark the end of the opening auction; allowed exactly once
    pub fn end_opening_auction(&mut self) -> LiquidityResult<()> {
        if self.opening_auction_ended {
            return Err(LiquidityError::OpeningAuctionAlreadyEnded {
                market: self.market_id.clone(),
            });
        }

        let pending = std::mem::take(&mut self.pending_inheritance);
        self.apply_inheritance(&pending)?;

        self.opening_auction_ended = true;
        self.growth_rate = Decimal::ZERO;
        Ok(())
    }

    // ========================================================================
    // Inheritance
    // ========================================================================

    /// Merge a predecessor market's rows, deferred until the opening auction ends
    ///
    /// Batches received before the auction ends accumulate; a later row for
    /// the same party replaces the earlier one.
    pub fn inherit(&mut self, records: Vec<EquityShareRecord>) -> LiquidityResult<()> {
        let mut merged: BTreeMap<PartyId, EquityShareRecord> = BTreeMap::new();
        if !self.opening_auction_ended {
            for record in std::mem::take(&mut self.pending_inheritance) {
                merged.insert(record.party.clone(), record);
            }
        }
        for record in records {
            merged.insert(record.party.clone(), record);
        }
        let records: Vec<EquityShareRecord> = merged.into_values().collect();

        if self.opening_auction_ended {
            return self.apply_inheritance(&records);
        }

        self.pending_inheritance = records;
        Ok(())
    }

    fn apply_inheritance(&mut self, records: &[EquityShareRecord]) -> LiquidityResult<()> {
        for record in records {
            // Only parties still committed in this market inherit
            let current_stake = match self.providers.get(&record.party) {
                Some(provider) => provider.stake,
                None => continue,
            };

            self.providers.insert(record.party.clone(), record.to_provider());
            self.reconcile_totals()?;
            self.set_party_stake(&record.party, current_stake)?;
        }

        self.reconcile_totals()?;
        self.stale = true;
        Ok(())
    }

    // ========================================================================
    // Shares
    // ========================================================================

    fn refresh_shares(&mut self) -> LiquidityResult<()> {
        let total = self.total_virtual_stake;
        for provider in self.providers.values_mut() {
            provider.share = if total.is_zero() {
                Decimal::ZERO
            } else {
                div(provider.virtual_stake, total)?
            };
        }
        self.stale = false;
        Ok(())
    }

    /// Share of a single party; zero for unknown parties
    pub fn share(&mut self, party: &str) -> LiquidityResult<Decimal> {
        if self.stale {
            self.refresh_shares()?;
        }
        Ok(self.providers.get(party).map(|p| p.share).unwrap_or(Decimal::ZERO))
    }

    /// Shares of every provider, recomputing the cache if stale
    pub fn all_shares(&mut self) -> LiquidityResult<BTreeMap<PartyId, Decimal>> {
        if self.stale {
            self.refresh_shares()?;
        }
        Ok(self
            .providers
            .iter()
            .map(|(party, provider)| (party.clone(), provider.share))
            .collect())
    }

    /// Shares of every provider not in `excluded`, as if the excluded were absent
    ///
    /// Does not touch the cached shares unless `excluded` is empty.
    pub fn shares_except(&mut self, excluded: &BTreeSet<PartyId>) -> LiquidityResult<BTreeMap<PartyId, Decimal>> {
        if excluded.is_empty() {
            return self.all_shares();
        }

        let included: Vec<(&PartyId, &LiquidityProvider)> = self
            .providers
            .iter()
            .filter(|(party, _)| !excluded.contains(*party))
            .collect();
        let total = sum(included.iter().map(|(_, p)| p.virtual_stake))?;

        included
            .into_iter()
            .map(|(party, provider)| {
                let share = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    div(provider.virtual_stake, total)?
                };
                Ok((party.clone(), share))
            })
            .collect()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn avg_entry_valuation(&self, party: &str) -> Decimal {
        self.providers
            .get(party)
            .map(|p| p.avg_entry_valuation)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn provider(&self, party: &str) -> Option<&LiquidityProvider> {
        self.providers.get(party)
    }

    pub fn providers(&self) -> impl Iterator<Item = (&PartyId, &LiquidityProvider)> {
        self.providers.iter()
    }

    pub fn total_physical_stake(&self) -> Decimal {
        self.total_physical_stake
    }

    pub fn total_virtual_stake(&self) -> Decimal {
        self.total_virtual_stake
    }

    pub fn market_value_proxy(&self) -> Decimal {
        self.market_value_proxy
    }

    pub fn growth_rate(&self) -> Decimal {
        self.growth_rate
    }

    pub fn opening_auction_ended(&self) -> bool {
        self.opening_auction_ended
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Ledger contents with rows sorted by party
    pub fn get_state(&mut self) -> LiquidityResult<EquitySharesState> {
        if self.stale {
            self.refresh_shares()?;
        }
        Ok(EquitySharesState {
            market_value_proxy: self.market_value_proxy,
            growth_rate: self.growth_rate,
            opening_auction_ended: self.opening_auction_ended,
            providers: self
                .providers
                .iter()
                .map(|(party, provider)| EquityShareRecord::from_provider(party, provider))
                .collect(),
            pending_inheritance: self.pending_inheritance.clone(),
        })
    }

    /// Rebuild a ledger from checkpointed contents
    pub fn from_state(market_id: impl Into<MarketId>, state: EquitySharesState) -> LiquidityResult<Self> {
        let mut ledger = Self::new(market_id);
        ledger.market_value_proxy = state.market_value_proxy;
        ledger.growth_rate = state.growth_rate;
        ledger.opening_auction_ended = state.opening_auction_ended;
        ledger.pending_inheritance = state.pending_inheritance;

        for record in &state.providers {
            if ledger.providers.insert(record.party.clone(), record.to_provider()).is_some() {
                return Err(LiquidityError::snapshot(format!(
                    "duplicate equity share row for party {}",
                    record.party
                )));
            }
        }

        ledger.reconcile_totals()?;
        ledger.stale = true;
        Ok(ledger)
    }
}
