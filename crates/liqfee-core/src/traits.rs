//! # Collaborator Interfaces
//!
//! The market liquidity core drives these synchronously, in-process, from
//! within a single block-processing step. Implementations must not defer or
//! retry effects.

use std::collections::BTreeMap;
use std::time::Duration;

use liqfee_types::{
    Account, Amount, Event, FeeTransfer, LedgerMovement, LiquidityProvision,
    LiquidityProvisionAmendment, LiquidityProvisionSubmission, LiquidityResult, PartyId, Price,
    SlaPenalties, Timestamp, Transfer,
};
use rust_decimal::Decimal;

/// Provisions keyed by party
pub type Provisions = BTreeMap<PartyId, LiquidityProvision>;

/// Account ledger
pub trait Collateral {
    fn get_or_create_party_bond_account(
        &mut self,
        party: &str,
        market_id: &str,
        asset: &str,
    ) -> LiquidityResult<Account>;

    fn get_or_create_party_liquidity_fee_account(
        &mut self,
        party: &str,
        market_id: &str,
        asset: &str,
    ) -> LiquidityResult<Account>;

    fn get_or_create_liquidity_fees_bonus_distribution_account(
        &mut self,
        market_id: &str,
        asset: &str,
    ) -> LiquidityResult<Account>;

    fn get_party_bond_account(&self, market_id: &str, party: &str, asset: &str) -> LiquidityResult<Account>;

    fn get_party_liquidity_fee_account(
        &self,
        market_id: &str,
        party: &str,
        asset: &str,
    ) -> LiquidityResult<Account>;

    fn get_market_liquidity_fee_account(&self, market_id: &str, asset: &str) -> LiquidityResult<Account>;

    /// Move funds into or out of a party's bond account
    fn bond_spot_update(&mut self, market_id: &str, transfer: &Transfer) -> LiquidityResult<LedgerMovement>;

    fn get_asset_quantum(&self, asset: &str) -> LiquidityResult<Decimal>;

    /// Whether general plus bond balances cover `amount`
    fn can_cover_bond(&self, market_id: &str, party: &str, asset: &str, amount: Amount) -> bool;

    /// Apply a batch of fee transfers in order
    fn transfer_spot_fees(
        &mut self,
        market_id: &str,
        asset: &str,
        fee_transfer: &FeeTransfer,
    ) -> LiquidityResult<Vec<LedgerMovement>>;
}

/// Commitment bookkeeping and SLA scoring
pub trait LiquidityEngine {
    /// Returns whether the provision became active immediately
    fn submit_liquidity_provision(
        &mut self,
        submission: &LiquidityProvisionSubmission,
        party: &str,
        id: &str,
    ) -> LiquidityResult<bool>;

    /// Undo a submission whose collateral could not be set up
    fn reject_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()>;

    fn validate_liquidity_provision_amendment(
        &self,
        amendment: &LiquidityProvisionAmendment,
    ) -> LiquidityResult<()>;

    /// Returns whether the amendment was applied immediately rather than queued
    fn amend_liquidity_provision(
        &mut self,
        amendment: &LiquidityProvisionAmendment,
        party: &str,
        is_cancel: bool,
    ) -> LiquidityResult<bool>;

    fn cancel_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()>;

    fn stop_liquidity_provision(&mut self, party: &str) -> LiquidityResult<()>;

    fn is_liquidity_provider(&self, party: &str) -> bool;

    fn liquidity_provision_by_party_id(&self, party: &str) -> Option<LiquidityProvision>;

    fn provisions_per_party(&self) -> Provisions;

    fn pending_provision(&self) -> Provisions;

    fn pending_provision_by_party_id(&self, party: &str) -> Option<LiquidityProvision>;

    /// Promote pending amendments and return the provisions that changed
    fn apply_pending_provisions(&mut self, now: Timestamp) -> Provisions;

    /// Align a provision's commitment with its bond balance
    fn update_party_commitment(&mut self, party: &str, amount: Amount) -> LiquidityResult<LiquidityProvision>;

    fn calculate_supplied_stake(&self) -> Amount;

    fn calculate_supplied_stake_without_pending(&self) -> Amount;

    fn calculate_sla_penalties(&mut self, now: Timestamp) -> SlaPenalties;

    fn reset_sla_epoch(&mut self, now: Timestamp, mark_price: Price, position_factor: Decimal);

    fn update_average_liquidity_scores(
        &mut self,
        best_bid: Decimal,
        best_ask: Decimal,
        min_lp_price: Price,
        max_lp_price: Price,
    ) -> LiquidityResult<()>;

    fn get_average_liquidity_scores(&self) -> BTreeMap<PartyId, Decimal>;

    fn reset_average_liquidity_scores(&mut self);

    fn ready_for_fees_allocation(&self, now: Timestamp) -> bool;

    fn reset_fee_allocation_period(&mut self, now: Timestamp);

    fn on_providers_fee_calculation_time_step(&mut self, step: Duration);
}

/// Event sink; events are never read back
pub trait Broker {
    fn send(&mut self, event: Event);

    fn send_batch(&mut self, events: Vec<Event>) {
        for event in events {
            self.send(event);
        }
    }
}

/// Best static prices of the market's book
pub trait OrderBook {
    fn best_static_bid_price(&self) -> LiquidityResult<Price>;

    fn best_static_ask_price(&self) -> LiquidityResult<Price>;
}

/// Collaborators a market liquidity operation runs against
pub struct MarketContext<'a> {
    pub collateral: &'a mut dyn Collateral,
    pub broker: &'a mut dyn Broker,
    pub order_book: &'a dyn OrderBook,
}

impl<'a> MarketContext<'a> {
    pub fn new(
        collateral: &'a mut dyn Collateral,
        broker: &'a mut dyn Broker,
        order_book: &'a dyn OrderBook,
    ) -> Self {
        Self {
            collateral,
            broker,
            order_book,
        }
    }

    /// Publish movements as one event, skipping empty batches
    pub fn send_ledger_movements(&mut self, movements: Vec<LedgerMovement>) {
        if !movements.is_empty() {
            self.broker.send(Event::ledger_movements(movements));
        }
    }
}
