//! In-memory collaborators for driving a market through its lifecycle

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use liqfee_core::{Broker, Collateral, LiquidityEngine, LiquidityScoreAverages, OrderBook, Provisions};
use liqfee_types::{
    account_id, Account, AccountType, Amount, Event, FeeTransfer, LedgerEntry, LedgerMovement,
    LiquidityError, LiquidityProvision, LiquidityProvisionAmendment, LiquidityProvisionSubmission,
    LiquidityResult, PartyId, PostBalance, Price, ProvisionStatus, SlaPenalties, Timestamp, Transfer,
    SYSTEM_OWNER,
};
use rust_decimal::Decimal;

// ============================================================================
// Collateral
// ============================================================================

/// Account ledger backed by a sorted map
#[derive(Debug, Default)]
pub struct InMemoryCollateral {
    accounts: BTreeMap<String, Account>,
    quanta: BTreeMap<String, Decimal>,
    /// Fail every bond update, to exercise rollback paths
    pub reject_bond_updates: bool,
}

impl InMemoryCollateral {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_for(owner: &str, account_type: AccountType) -> String {
        if account_type.is_party_account() {
            owner.to_string()
        } else {
            SYSTEM_OWNER.to_string()
        }
    }

    fn get_or_create(&mut self, owner: &str, market_id: &str, asset: &str, account_type: AccountType) -> Account {
        let owner = Self::owner_for(owner, account_type);
        let id = account_id(&owner, market_id, asset, account_type);
        self.accounts
            .entry(id.clone())
            .or_insert_with(|| Account {
                id,
                owner,
                market_id: market_id.to_string(),
                asset: asset.to_string(),
                account_type,
                balance: 0,
            })
            .clone()
    }

    fn get(&self, owner: &str, market_id: &str, asset: &str, account_type: AccountType) -> LiquidityResult<Account> {
        let owner = Self::owner_for(owner, account_type);
        let id = account_id(&owner, market_id, asset, account_type);
        self.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| LiquidityError::collateral("account lookup", format!("no account {}", id)))
    }

    fn credit(&mut self, owner: &str, market_id: &str, asset: &str, account_type: AccountType, amount: Amount) {
        let account = self.get_or_create(owner, market_id, asset, account_type);
        if let Some(account) = self.accounts.get_mut(&account.id) {
            account.balance += amount;
        }
    }

    /// Credit a party's general account
    pub fn deposit(&mut self, party: &str, asset: &str, amount: Amount) {
        self.credit(party, "", asset, AccountType::General, amount);
    }

    /// Credit the market's collected liquidity fees
    pub fn seed_market_fees(&mut self, market_id: &str, asset: &str, amount: Amount) {
        self.credit(SYSTEM_OWNER, market_id, asset, AccountType::FeesLiquidity, amount);
    }

    /// Credit a party's accrued liquidity fees
    pub fn seed_party_fees(&mut self, party: &str, market_id: &str, asset: &str, amount: Amount) {
        self.credit(party, market_id, asset, AccountType::LpLiquidityFees, amount);
    }

    pub fn set_quantum(&mut self, asset: &str, quantum: Decimal) {
        self.quanta.insert(asset.to_string(), quantum);
    }

    /// Balance of an account, zero if it does not exist
    pub fn balance(&self, owner: &str, market_id: &str, asset: &str, account_type: AccountType) -> Amount {
        self.get(owner, market_id, asset, account_type)
            .map(|account| account.balance)
            .unwrap_or(0)
    }

    pub fn general(&self, party: &str, asset: &str) -> Amount {
        self.balance(party, "", asset, AccountType::General)
    }

    /// Sum of every account balance in `asset`
    pub fn total_balance(&self, asset: &str) -> Amount {
        self.accounts
            .values()
            .filter(|account| account.asset == asset)
            .map(|account| account.balance)
            .sum()
    }

    /// Apply one transfer between the accounts its type designates
    fn apply(&mut self, market_id: &str, transfer: &Transfer) -> LiquidityResult<LedgerMovement> {
        let (from_type, to_type) = transfer.transfer_type.accounts();
        let from = self.get(&transfer.owner, market_id, &transfer.asset, from_type)?;
        let to = self.get_or_create(&transfer.owner, market_id, &transfer.asset, to_type);

        let amount = transfer.amount.min(from.balance);
        if amount < transfer.min_amount {
            return Err(LiquidityError::collateral(
                "transfer",
                format!(
                    "{:?} of {} from {} exceeds balance {}",
                    transfer.transfer_type, transfer.amount, from.id, from.balance
                ),
            ));
        }

        let mut balances = Vec::with_capacity(2);
        if let Some(account) = self.accounts.get_mut(&from.id) {
            account.balance -= amount;
            balances.push(PostBalance {
                account_id: account.id.clone(),
                balance: account.balance,
            });
        }
        if let Some(account) = self.accounts.get_mut(&to.id) {
            account.balance += amount;
            balances.push(PostBalance {
                account_id: account.id.clone(),
                balance: account.balance,
            });
        }

        Ok(LedgerMovement {
            entries: vec![LedgerEntry {
                from_account: from.id,
                to_account: to.id,
                amount,
                transfer_type: transfer.transfer_type,
            }],
            balances,
        })
    }
}

impl Collateral for InMemoryCollateral {
    fn get_or_create_party_bond_account(&mut self, party: &str, market_id: &str, asset: &str) -> LiquidityResult<Account> {
        Ok(self.get_or_create(party, market_id, asset, AccountType::Bond))
    }

    fn get_or_create_party_liquidity_fee_account(
        &mut self,
        party: &str,
        market_id: &str,
        asset: &str,
    ) -> LiquidityResult<Account> {
        Ok(self.get_or_create(party, market_id, asset, AccountType::LpLiquidityFees))
    }

    fn get_or_create_liquidity_fees_bonus_distribution_account(
        &mut self,
        market_id: &str,
        asset: &str,
    ) -> LiquidityResult<Account> {
        Ok(self.get_or_create(SYSTEM_OWNER, market_id, asset, AccountType::LiquidityFeesBonusDistribution))
    }

    fn get_party_bond_account(&self, market_id: &str, party: &str, asset: &str) -> LiquidityResult<Account> {
        self.get(party, market_id, asset, AccountType::Bond)
    }

    fn get_party_liquidity_fee_account(&self, market_id: &str, party: &str, asset: &str) -> LiquidityResult<Account> {
        self.get(party, market_id, asset, AccountType::LpLiquidityFees)
    }

    fn get_market_liquidity_fee_account(&self, market_id: &str, asset: &str) -> LiquidityResult<Account> {
        self.get(SYSTEM_OWNER, market_id, asset, AccountType::FeesLiquidity)
    }

    fn bond_spot_update(&mut self, market_id: &str, transfer: &Transfer) -> LiquidityResult<LedgerMovement> {
        if self.reject_bond_updates {
            return Err(LiquidityError::collateral("bond update", "rejected by test ledger"));
        }
        self.apply(market_id, transfer)
    }

    fn get_asset_quantum(&self, asset: &str) -> LiquidityResult<Decimal> {
        Ok(self.quanta.get(asset).copied().unwrap_or(Decimal::ONE))
    }

    fn can_cover_bond(&self, market_id: &str, party: &str, asset: &str, amount: Amount) -> bool {
        let general = self.balance(party, market_id, asset, AccountType::General);
        let bond = self.balance(party, market_id, asset, AccountType::Bond);
        general + bond >= amount
    }

    fn transfer_spot_fees(
        &mut self,
        market_id: &str,
        _asset: &str,
        fee_transfer: &FeeTransfer,
    ) -> LiquidityResult<Vec<LedgerMovement>> {
        fee_transfer
            .transfers
            .iter()
            .map(|transfer| self.apply(market_id, transfer))
            .collect()
    }
}

// ============================================================================
// Broker
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingBroker {
    pub events: Vec<Event>,
}

impl RecordingBroker {
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Every ledger entry published so far, in order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.events
            .iter()
            .flat_map(|event| match event {
                Event::LedgerMovements(movements) => movements.iter().flat_map(|m| m.entries.clone()).collect::<Vec<_>>(),
            })
            .collect()
    }
}

impl Broker for RecordingBroker {
    fn send(&mut self, event: Event) {
        self.events.push(event);
    }
}

// ============================================================================
// Order Book
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct FakeOrderBook {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

impl FakeOrderBook {
    pub fn with_prices(best_bid: Price, best_ask: Price) -> Self {
        Self {
            best_bid: Some(best_bid),
            best_ask: Some(best_ask),
        }
    }
}

impl OrderBook for FakeOrderBook {
    fn best_static_bid_price(&self) -> LiquidityResult<Price> {
        self.best_bid.ok_or_else(|| LiquidityError::NoPriceRange {
            reason: "no best bid".to_string(),
        })
    }

    fn best_static_ask_price(&self) -> LiquidityResult<Price> {
        self.best_ask.ok_or_else(|| LiquidityError::NoPriceRange {
            reason: "no best ask".to_string(),
        })
    }
}

// ============================================================================
// Liquidity Engine
// ============================================================================

/// Liquidity engine with scripted scores and penalties
#[derive(Debug)]
pub struct FakeLiquidityEngine {
    pub provisions: Provisions,
    pub pending: Provisions,

    /// Whether submissions become active at once rather than pending
    pub submit_applies_immediately: bool,
    /// Whether amendments apply at once rather than at the next epoch
    pub amend_applies_immediately: bool,

    /// Instantaneous scores folded in on each score update
    pub instant_scores: BTreeMap<PartyId, Decimal>,
    pub averages: LiquidityScoreAverages,
    /// Replaces the running averages when set
    pub average_override: Option<BTreeMap<PartyId, Decimal>>,
    pub last_price_range: Option<(Price, Price)>,

    pub penalties: SlaPenalties,
    pub ready_for_fees: bool,
    pub fee_step: Option<Duration>,
    pub epoch_resets: Vec<(Timestamp, Price, Decimal)>,
    pub fee_period_resets: Vec<Timestamp>,
    pub stopped: BTreeSet<PartyId>,
    pub reject_stop: BTreeSet<PartyId>,
}

impl FakeLiquidityEngine {
    pub fn new(market_id: &str) -> Self {
        Self {
            provisions: Provisions::new(),
            pending: Provisions::new(),
            submit_applies_immediately: true,
            amend_applies_immediately: false,
            instant_scores: BTreeMap::new(),
            averages: LiquidityScoreAverages::new(market_id),
            average_override: None,
            last_price_range: None,
            penalties: SlaPenalties::default(),
            ready_for_fees: false,
            fee_step: None,
            epoch_resets: Vec::new(),
            fee_period_resets: Vec::new(),
            stopped: BTreeSet::new(),
            reject_stop: BTreeSet::new(),
        }
    }

    fn provision_from(
        party: &str,
        id: &str,
        market_id: &str,
        commitment_amount: Amount,
        fee: Decimal,
        reference: &str,
        status: ProvisionStatus,
    ) -> LiquidityProvision {
        LiquidityProvision {
            id: id.to_string(),
            party: party.to_string(),
            market_id: market_id.to_string(),
            commitment_amount,
            fee,
            reference: reference.to_string(),
            status,
        }
    }
}

impl LiquidityEngine for FakeLiquidityEngine {
    fn submit_liquidity_provision(
        &mut self,
        submission: &LiquidityProvisionSubmission,
        party: &str,
        id: &str,
    ) -> LiquidityResult<bool> {
        if self.provisions.contains_key(party) || self.pending.contains_key(party) {
            return Err(LiquidityError::engine_rejected("submission", "party already committed"));
        }

        let status = if self.submit_applies_immediately {
            ProvisionStatus::Active
        } else {
            ProvisionStatus::Pending
        };
        let provision = Self::provision_from(
            party,
            id,
            &submission.market_id,
            submission.commitment_amount,
            submission.fee,
            &submission.reference,
            status,
        );

        if self.submit_applies_immediately {
            self.provisions.insert(party.to_string(), provision);
        } else {
            self.pending.insert(party.to_string(), provision);
        }
        Ok(self.submit_applies_immediately)
    }

    fn reject_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()> {
        self.provisions.remove(party);
        self.pending.remove(party);
        Ok(())
    }

    fn validate_liquidity_provision_amendment(&self, amendment: &LiquidityProvisionAmendment) -> LiquidityResult<()> {
        if amendment.market_id.is_empty() {
            return Err(LiquidityError::InvalidAmendment {
                reason: "missing market".to_string(),
            });
        }
        if amendment.fee.is_some_and(|fee| fee < Decimal::ZERO) {
            return Err(LiquidityError::InvalidAmendment {
                reason: "negative fee".to_string(),
            });
        }
        Ok(())
    }

    fn amend_liquidity_provision(
        &mut self,
        amendment: &LiquidityProvisionAmendment,
        party: &str,
        is_cancel: bool,
    ) -> LiquidityResult<bool> {
        let base = self
            .provisions
            .get(party)
            .or_else(|| self.pending.get(party))
            .cloned()
            .ok_or_else(|| LiquidityError::engine_rejected("amendment", "unknown party"))?;
        let complete = amendment.complete_from(&base);
        let mut provision = base;
        provision.commitment_amount = complete.commitment_amount.unwrap_or(provision.commitment_amount);
        provision.fee = complete.fee.unwrap_or(provision.fee);
        provision.reference = complete.reference.unwrap_or(provision.reference);

        if !self.amend_applies_immediately {
            provision.status = ProvisionStatus::Pending;
            self.pending.insert(party.to_string(), provision);
            return Ok(false);
        }

        self.pending.remove(party);
        if is_cancel || provision.commitment_amount == 0 {
            self.provisions.remove(party);
        } else {
            provision.status = ProvisionStatus::Active;
            self.provisions.insert(party.to_string(), provision);
        }
        Ok(true)
    }

    fn cancel_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()> {
        self.provisions.remove(party);
        self.pending.remove(party);
        self.averages.remove(party);
        Ok(())
    }

    fn stop_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()> {
        if self.reject_stop.contains(party) {
            return Err(LiquidityError::engine_rejected("stop", "scripted failure"));
        }
        if self.provisions.remove(party).is_none() {
            return Err(LiquidityError::PartyNotLiquidityProvider {
                party: party.to_string(),
            });
        }
        self.stopped.insert(party.to_string());
        Ok(())
    }

    fn is_liquidity_provider(&self, party: &str) -> bool {
        self.provisions.contains_key(party) || self.pending.contains_key(party)
    }

    fn liquidity_provision_by_party_id(&self, party: &str) -> Option<LiquidityProvision> {
        self.provisions.get(party).cloned()
    }

    fn provisions_per_party(&self) -> Provisions {
        self.provisions.clone()
    }

    fn pending_provision(&self) -> Provisions {
        self.pending.clone()
    }

    fn pending_provision_by_party_id(&self, party: &str) -> Option<LiquidityProvision> {
        self.pending.get(party).cloned()
    }

    fn apply_pending_provisions(&mut self, _now: Timestamp) -> Provisions {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = Provisions::new();
        for (party, mut provision) in pending {
            if provision.commitment_amount == 0 {
                self.provisions.remove(&party);
                provision.status = ProvisionStatus::Cancelled;
            } else {
                provision.status = ProvisionStatus::Active;
                self.provisions.insert(party.clone(), provision.clone());
            }
            applied.insert(party, provision);
        }
        applied
    }

    fn update_party_commitment(&mut self, party: &str, amount: Amount) -> LiquidityResult<LiquidityProvision> {
        let provision = self
            .provisions
            .get_mut(party)
            .ok_or_else(|| LiquidityError::engine_rejected("update commitment", "unknown party"))?;
        provision.commitment_amount = amount;
        Ok(provision.clone())
    }

    fn calculate_supplied_stake(&self) -> Amount {
        let mut total = self.calculate_supplied_stake_without_pending();
        for (party, pending) in &self.pending {
            let current = self.provisions.get(party).map(|p| p.commitment_amount).unwrap_or(0);
            total += pending.commitment_amount.saturating_sub(current);
        }
        total
    }

    fn calculate_supplied_stake_without_pending(&self) -> Amount {
        self.provisions.values().map(|p| p.commitment_amount).sum()
    }

    fn calculate_sla_penalties(&mut self, _now: Timestamp) -> SlaPenalties {
        self.penalties.clone()
    }

    fn reset_sla_epoch(&mut self, now: Timestamp, mark_price: Price, position_factor: Decimal) {
        self.epoch_resets.push((now, mark_price, position_factor));
    }

    fn update_average_liquidity_scores(
        &mut self,
        _best_bid: Decimal,
        _best_ask: Decimal,
        min_lp_price: Price,
        max_lp_price: Price,
    ) -> LiquidityResult<()> {
        self.last_price_range = Some((min_lp_price, max_lp_price));
        self.averages.update(&self.instant_scores)
    }

    fn get_average_liquidity_scores(&self) -> BTreeMap<PartyId, Decimal> {
        match &self.average_override {
            Some(scores) => scores.clone(),
            None => self.averages.averages(),
        }
    }

    fn reset_average_liquidity_scores(&mut self) {
        self.averages.reset();
        self.average_override = None;
    }

    fn ready_for_fees_allocation(&self, _now: Timestamp) -> bool {
        self.ready_for_fees
    }

    fn reset_fee_allocation_period(&mut self, now: Timestamp) {
        self.ready_for_fees = false;
        self.fee_period_resets.push(now);
    }

    fn on_providers_fee_calculation_time_step(&mut self, step: Duration) {
        self.fee_step = Some(step);
    }
}
