//! # Market Liquidity
//!
//! Per-market coordinator for liquidity commitments. Validates and forwards
//! commitment changes to the liquidity engine, keeps bond collateral in step
//! through the collateral ledger, feeds the equity-like share ledger, and
//! runs the SLA fee distribution at epoch boundaries.
//!
//! Validation failures are returned to the caller. Broken invariants halt
//! through [`crate::fatal`].

use std::collections::BTreeMap;
use std::time::Duration;

use liqfee_math::{
    add, ceil_to_tick, decimal_from_uint, div, floor_to_tick, mul, sub, sum, uint_from_decimal,
};
use liqfee_types::{
    Amount, AssetId, FeeTransfer, LiquidityError, LiquidityProvisionAmendment, LiquidityProvisionSubmission,
    LiquidityResult, MarketId, MarketState, PartyId, Price, SlaPenalties, Timestamp, Transfer,
    TransferType, LIQUIDITY_SNAPSHOT_NAMESPACE,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::LiquidityConfig;
use crate::equity_shares::{EquityShareRecord, EquityShares, EquitySharesState};
use crate::fatal::{fatal, OrFatal};
use crate::fee_distribution;
use crate::snapshot::{decode, encode, StatefulComponent};
use crate::traits::{LiquidityEngine, MarketContext, OrderBook, Provisions};

pub struct MarketLiquidity<E: LiquidityEngine> {
    market_id: MarketId,
    asset: AssetId,
    engine: E,
    equity_shares: EquityShares,

    price_range: Decimal,
    tick_size: Price,
    early_exit_penalty: Decimal,
    min_lp_stake_quantum_multiple: Decimal,
}

impl<E: LiquidityEngine> MarketLiquidity<E> {
    pub fn new(
        market_id: impl Into<MarketId>,
        asset: impl Into<AssetId>,
        mut engine: E,
        config: &LiquidityConfig,
    ) -> Self {
        let market_id = market_id.into();
        engine.on_providers_fee_calculation_time_step(config.fee_calculation_time_step());
        Self {
            equity_shares: EquityShares::new(market_id.clone()),
            market_id,
            asset: asset.into(),
            engine,
            price_range: config.price_range,
            tick_size: config.tick_size,
            early_exit_penalty: config.early_exit_penalty,
            min_lp_stake_quantum_multiple: config.min_lp_stake_quantum_multiple,
        }
    }

    // ========================================================================
    // Commitment Submission
    // ========================================================================

    /// Open a new commitment for `party`
    pub fn submit_liquidity_provision(
        &mut self,
        cx: &mut MarketContext<'_>,
        submission: &LiquidityProvisionSubmission,
        party: &str,
        id: &str,
        market_state: MarketState,
    ) -> LiquidityResult<()> {
        if !market_state.accepts_liquidity_changes() {
            return Err(LiquidityError::CommitmentSubmissionNotAllowed { state: market_state });
        }

        self.ensure_min_commitment_amount(cx, submission.commitment_amount)?;

        let applied_immediately = self.engine.submit_liquidity_provision(submission, party, id)?;

        if let Err(err) = self.make_per_party_accounts_and_transfers(cx, party, submission.commitment_amount) {
            if let Err(reject_err) = self.engine.reject_liquidity_provision(party) {
                debug!(
                    party,
                    id,
                    error = %reject_err,
                    "unable to reject liquidity provision submission"
                );
                return Err(LiquidityError::collateral(
                    "liquidity provision submission",
                    format!("{}, {}", err, reject_err),
                ));
            }
            return Err(err);
        }

        if applied_immediately {
            self.set_party_stake(party, submission.commitment_amount);
        }

        Ok(())
    }

    /// Create the party's per-market accounts and move the commitment into bond
    fn make_per_party_accounts_and_transfers(
        &mut self,
        cx: &mut MarketContext<'_>,
        party: &str,
        commitment_amount: Amount,
    ) -> LiquidityResult<()> {
        let bond = cx
            .collateral
            .get_or_create_party_bond_account(party, &self.market_id, &self.asset)?;
        cx.collateral
            .get_or_create_party_liquidity_fee_account(party, &self.market_id, &self.asset)?;

        let Some(transfer) = self.bond_delta_transfer(party, commitment_amount, bond.balance) else {
            return Ok(());
        };

        let movement = cx
            .collateral
            .bond_spot_update(&self.market_id, &transfer)
            .map_err(|err| {
                debug!(party, market = %self.market_id, error = %err, "bond update error");
                err
            })?;
        cx.send_ledger_movements(vec![movement]);

        Ok(())
    }

    // ========================================================================
    // Commitment Amendment
    // ========================================================================

    /// Change an existing commitment
    ///
    /// Increases are bonded at once. Decreases are released at the next epoch
    /// start unless the engine applies the amendment immediately.
    pub fn amend_liquidity_provision(
        &mut self,
        cx: &mut MarketContext<'_>,
        amendment: &LiquidityProvisionAmendment,
        party: &str,
        market_state: MarketState,
    ) -> LiquidityResult<()> {
        if !market_state.accepts_liquidity_changes() {
            return Err(LiquidityError::CommitmentSubmissionNotAllowed { state: market_state });
        }

        self.engine.validate_liquidity_provision_amendment(amendment)?;

        if let Some(amount) = amendment.commitment_amount {
            self.ensure_min_commitment_amount(cx, amount)?;
        }

        if !self.engine.is_liquidity_provider(party) {
            return Err(LiquidityError::PartyNotLiquidityProvider {
                party: party.to_string(),
            });
        }

        let pending = self.engine.pending_provision_by_party_id(party);
        let current = self.engine.liquidity_provision_by_party_id(party);

        let Some(to_copy) = current.as_ref().or(pending.as_ref()) else {
            fatal(
                "amend liquidity provision",
                &LiquidityError::inconsistent(format!(
                    "party {} is a liquidity provider without a provision",
                    party
                )),
            );
        };

        let mut amendment = amendment.clone();
        if amendment.commitment_amount == Some(0) {
            amendment.commitment_amount = None;
        }
        if amendment.fee == Some(Decimal::ZERO) {
            amendment.fee = None;
        }
        if amendment.reference.as_deref() == Some("") {
            amendment.reference = None;
        }
        let amendment = amendment.complete_from(to_copy);
        let new_amount = amendment.commitment_amount.unwrap_or(to_copy.commitment_amount);

        // Positive when the commitment shrinks
        let variation: i128 = match &pending {
            Some(p) if new_amount < p.commitment_amount => {
                // Only the bond raised for a pending increase is returned now
                let floor = new_amount.max(current.as_ref().map_or(0, |c| c.commitment_amount));
                let excess = p.commitment_amount.saturating_sub(floor);
                self.release_pending_bond_collateral(cx, excess, party)
                    .map_err(|err| {
                        debug!(party, market = %self.market_id, error = %err, "could not release pending bond");
                        err
                    })?;
                p.commitment_amount as i128 - new_amount as i128
            }
            _ => match (&current, &pending) {
                (Some(c), _) => c.commitment_amount as i128 - new_amount as i128,
                (None, Some(p)) => p.commitment_amount as i128 - new_amount as i128,
                (None, None) => 0,
            },
        };

        if variation < 0 {
            self.ensure_and_transfer_collateral(cx, new_amount, party).map_err(|err| {
                debug!(party, market = %self.market_id, error = %err, "could not bond lp amendment");
                err
            })?;
        }

        let applied = self
            .engine
            .amend_liquidity_provision(&amendment, party, false)
            .or_fatal("amend validated liquidity provision");

        if let (Some(current), true) = (&current, applied) {
            // Whatever the bond holds above the new commitment once pending releases are done
            let release = self.bond_balance(cx, party).saturating_sub(new_amount);
            if variation > 0 && new_amount != 0 && release > 0 {
                if let Err(err) = self.release_pending_bond_collateral(cx, release, party) {
                    debug!(party, market = %self.market_id, error = %err, "could not release bond for lp amendment");

                    let mut rollback = amendment.clone();
                    rollback.commitment_amount = Some(current.commitment_amount);
                    if let Err(rollback_err) = self.engine.amend_liquidity_provision(&rollback, party, false) {
                        warn!(party, error = %rollback_err, "amendment rollback failed");
                    }
                    return Err(err);
                }
            }
        }

        if applied {
            self.set_party_stake(party, new_amount);
        }

        Ok(())
    }

    // ========================================================================
    // Commitment Cancellation
    // ========================================================================

    /// Withdraw a party's whole commitment
    pub fn cancel_liquidity_provision(&mut self, cx: &mut MarketContext<'_>, party: &str) -> LiquidityResult<()> {
        let current = self.engine.liquidity_provision_by_party_id(party);
        let pending = self.engine.pending_provision_by_party_id(party);

        let Some(existing) = current.as_ref().or(pending.as_ref()) else {
            return Err(LiquidityError::PartyHasNoExistingLiquidityProvision {
                party: party.to_string(),
            });
        };
        let amendment = LiquidityProvisionAmendment::cancellation(existing);

        if let Some(pending) = pending.as_ref().filter(|p| p.commitment_amount > 0) {
            self.release_pending_bond_collateral(cx, pending.commitment_amount, party)
                .map_err(|err| {
                    debug!(party, market = %self.market_id, error = %err, "could not release bond for pending amendment");
                    err
                })?;
        }

        let applied = self
            .engine
            .amend_liquidity_provision(&amendment, party, true)
            .or_fatal("cancel liquidity provision");

        if let (Some(current), true) = (&current, applied) {
            let bonded = cx
                .collateral
                .get_party_bond_account(&self.market_id, party, &self.asset)
                .map(|acc| acc.balance)
                .unwrap_or(0);
            let release = current.commitment_amount.min(bonded);

            if let Err(err) = self.release_pending_bond_collateral(cx, release, party) {
                debug!(party, market = %self.market_id, error = %err, "could not release bond for cancellation");

                let rollback = LiquidityProvisionAmendment {
                    market_id: self.market_id.clone(),
                    commitment_amount: Some(current.commitment_amount),
                    fee: Some(current.fee),
                    reference: Some(current.reference.clone()),
                };
                if let Err(rollback_err) = self.engine.amend_liquidity_provision(&rollback, party, false) {
                    warn!(party, error = %rollback_err, "cancellation rollback failed");
                }
                return Err(err);
            }
        }

        if applied {
            self.set_party_stake(party, 0);
        }

        Ok(())
    }

    /// Stop every active provision, in party order
    pub fn stop_all_liquidity_provision(&mut self) {
        for party in self.engine.provisions_per_party().into_keys() {
            if let Err(err) = self.engine.stop_liquidity_provision(&party) {
                warn!(party = %party, market = %self.market_id, error = %err, "could not stop liquidity provision");
            }
        }
    }

    // ========================================================================
    // Collateral Helpers
    // ========================================================================

    /// Transfer that brings a bond balance to `commitment_amount`, if any is needed
    fn bond_delta_transfer(&self, party: &str, commitment_amount: Amount, bond_balance: Amount) -> Option<Transfer> {
        let (amount, transfer_type) = if commitment_amount >= bond_balance {
            (commitment_amount - bond_balance, TransferType::BondLow)
        } else {
            (bond_balance - commitment_amount, TransferType::BondHigh)
        };
        if amount == 0 {
            return None;
        }
        Some(Transfer::exact(party, &self.asset, amount, transfer_type))
    }

    /// Check the party can afford the new commitment and bond it
    fn ensure_and_transfer_collateral(
        &mut self,
        cx: &mut MarketContext<'_>,
        commitment_amount: Amount,
        party: &str,
    ) -> LiquidityResult<()> {
        let bond = cx
            .collateral
            .get_or_create_party_bond_account(party, &self.market_id, &self.asset)?;

        if !cx
            .collateral
            .can_cover_bond(&self.market_id, party, &self.asset, commitment_amount)
        {
            return Err(LiquidityError::NotEnoughStake {
                party: party.to_string(),
                required: commitment_amount,
            });
        }

        let Some(transfer) = self.bond_delta_transfer(party, commitment_amount, bond.balance) else {
            return Ok(());
        };
        let movement = cx.collateral.bond_spot_update(&self.market_id, &transfer)?;
        cx.send_ledger_movements(vec![movement]);
        Ok(())
    }

    /// Move `amount` from the party's bond back to its general account
    fn release_pending_bond_collateral(
        &mut self,
        cx: &mut MarketContext<'_>,
        amount: Amount,
        party: &str,
    ) -> LiquidityResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let transfer = Transfer::exact(party, &self.asset, amount, TransferType::BondHigh);
        let movement = cx.collateral.bond_spot_update(&self.market_id, &transfer)?;
        cx.send_ledger_movements(vec![movement]);
        Ok(())
    }

    fn ensure_min_commitment_amount(&self, cx: &MarketContext<'_>, amount: Amount) -> LiquidityResult<()> {
        let quantum = cx
            .collateral
            .get_asset_quantum(&self.asset)
            .or_fatal("asset quantum lookup");
        let minimum = mul(quantum, self.min_lp_stake_quantum_multiple).or_fatal("minimum stake");

        if decimal_from_uint(amount) < minimum {
            return Err(LiquidityError::CommitmentAmountTooLow { amount, minimum });
        }
        Ok(())
    }

    fn set_party_stake(&mut self, party: &str, amount: Amount) {
        self.equity_shares
            .set_party_stake(party, decimal_from_uint(amount))
            .or_fatal("set party stake");
        // Refresh every cached share
        self.equity_shares.all_shares().or_fatal("recompute shares");
    }

    fn bond_balance(&self, cx: &MarketContext<'_>, party: &str) -> Amount {
        match cx.collateral.get_party_bond_account(&self.market_id, party, &self.asset) {
            Ok(account) => account.balance,
            Err(err) => fatal(
                "bond account lookup",
                &LiquidityError::BondAccountMissing {
                    party: format!("{} ({})", party, err),
                    market: self.market_id.clone(),
                },
            ),
        }
    }

    // ========================================================================
    // Epoch Boundaries
    // ========================================================================

    /// Start of an SLA epoch: settle pending decreases, then align commitments with bonds
    pub fn on_epoch_start(
        &mut self,
        cx: &mut MarketContext<'_>,
        now: Timestamp,
        mark_price: Price,
        target_stake: Amount,
        position_factor: Decimal,
    ) {
        self.engine.reset_sla_epoch(now, mark_price, position_factor);

        let applied = self.apply_pending_provisions(cx, now, target_stake);
        self.sync_party_commitment_with_bond_account(cx, applied);
    }

    /// Release pending decreases, slashing the part beyond the penalty-free headroom
    fn apply_pending_provisions(&mut self, cx: &mut MarketContext<'_>, now: Timestamp, target_stake: Amount) -> Provisions {
        let provisions = self.engine.provisions_per_party();
        let pending = self.engine.pending_provision();

        let supplied = decimal_from_uint(self.engine.calculate_supplied_stake_without_pending());
        let headroom = sub(supplied, decimal_from_uint(target_stake)).or_fatal("penalty-free headroom");
        let max_penalty_free_reduction = headroom.max(Decimal::ZERO);

        let mut variations: BTreeMap<PartyId, Decimal> = BTreeMap::new();
        for (party, provision) in &provisions {
            let bond_balance = self.bond_balance(cx, party);

            let Some(amendment) = pending.get(party) else {
                continue;
            };

            // Increases carry no penalty
            if amendment.commitment_amount >= provision.commitment_amount {
                continue;
            }

            let proposed = decimal_from_uint(provision.commitment_amount - amendment.commitment_amount);
            let variation = proposed.min(decimal_from_uint(bond_balance));
            if variation.is_zero() {
                continue;
            }
            variations.insert(party.clone(), variation);
        }

        let total_variation = sum(variations.values().copied()).or_fatal("sum of commitment variations");

        let mut movements = Vec::with_capacity(variations.len());
        for (party, variation) in &variations {
            let transfers = self
                .early_exit_transfers(party, *variation, total_variation, max_penalty_free_reduction)
                .or_fatal("early exit transfers");

            for transfer in transfers {
                let movement = cx
                    .collateral
                    .bond_spot_update(&self.market_id, &transfer)
                    .or_fatal("release pending bond collateral");
                movements.push(movement);
            }
        }
        cx.send_ledger_movements(movements);

        self.engine.apply_pending_provisions(now)
    }

    /// Bond transfers for one party's reduction
    fn early_exit_transfers(
        &self,
        party: &str,
        variation: Decimal,
        total_variation: Decimal,
        max_penalty_free_reduction: Decimal,
    ) -> LiquidityResult<Vec<Transfer>> {
        let mut transfers = Vec::new();
        let penalty_free = mul(div(variation, total_variation)?, max_penalty_free_reduction)?;

        if variation <= penalty_free {
            let amount = uint_from_decimal(variation)?;
            if amount > 0 {
                transfers.push(Transfer::exact(party, &self.asset, amount, TransferType::BondHigh));
            }
            return Ok(transfers);
        }

        let penalty_free_amount = uint_from_decimal(penalty_free)?;
        if penalty_free_amount > 0 {
            transfers.push(Transfer::exact(party, &self.asset, penalty_free_amount, TransferType::BondHigh));
        }

        let penalized = sub(variation, penalty_free)?;

        let released = uint_from_decimal(mul(sub(Decimal::ONE, self.early_exit_penalty)?, penalized)?)?;
        if released > 0 {
            transfers.push(Transfer::exact(party, &self.asset, released, TransferType::BondHigh));
        }

        let slashed = uint_from_decimal(mul(self.early_exit_penalty, penalized)?)?;
        if slashed > 0 {
            transfers.push(Transfer::exact(party, &self.asset, slashed, TransferType::BondSlashing));
        }

        Ok(transfers)
    }

    /// Make every provision's commitment match its bond balance and update shares
    fn sync_party_commitment_with_bond_account(&mut self, cx: &mut MarketContext<'_>, mut applied: Provisions) {
        for (party, mut provision) in self.engine.provisions_per_party() {
            let bond_balance = self.bond_balance(cx, &party);

            if provision.commitment_amount == bond_balance {
                continue;
            }

            if bond_balance == 0 {
                self.engine
                    .cancel_liquidity_provision(&party)
                    .or_fatal("cancel liquidity provision with empty bond");
                provision.commitment_amount = 0;
                applied.insert(party, provision);
                continue;
            }

            let updated = self
                .engine
                .update_party_commitment(&party, bond_balance)
                .or_fatal("update party commitment");
            applied.insert(party, updated);
        }

        for (party, provision) in &applied {
            self.set_party_stake(party, provision.commitment_amount);
        }
    }

    /// End of an SLA epoch: apply penalties and distribute fees and bonuses
    pub fn on_epoch_end(&mut self, cx: &mut MarketContext<'_>, now: Timestamp) {
        self.calculate_and_distribute(cx, now);
    }

    /// Final distribution when the market closes
    pub fn on_market_closed(&mut self, cx: &mut MarketContext<'_>, now: Timestamp) {
        self.calculate_and_distribute(cx, now);
    }

    fn calculate_and_distribute(&mut self, cx: &mut MarketContext<'_>, now: Timestamp) {
        let penalties = self.engine.calculate_sla_penalties(now);
        self.distribute_fees_bonuses_and_apply_penalties(cx, &penalties);
    }

    fn distribute_fees_bonuses_and_apply_penalties(&mut self, cx: &mut MarketContext<'_>, penalties: &SlaPenalties) {
        let per_party = &penalties.penalties_per_party;

        // Bond penalties
        let commitments: BTreeMap<PartyId, Amount> = per_party
            .keys()
            .filter_map(|party| {
                self.engine
                    .liquidity_provision_by_party_id(party)
                    .map(|p| (party.clone(), p.commitment_amount))
            })
            .collect();
        let bond_transfers = fee_distribution::bond_penalty_transfers(&self.asset, &commitments, per_party)
            .or_fatal("bond penalty transfers");
        let mut movements = Vec::with_capacity(bond_transfers.len());
        for transfer in &bond_transfers {
            let movement = cx
                .collateral
                .bond_spot_update(&self.market_id, transfer)
                .or_fatal("apply SLA penalty to bond account");
            movements.push(movement);
        }
        cx.send_ledger_movements(movements);

        // Net fees
        let accrued: BTreeMap<PartyId, Amount> = per_party
            .keys()
            .map(|party| {
                let account = cx
                    .collateral
                    .get_party_liquidity_fee_account(&self.market_id, party, &self.asset)
                    .or_fatal("liquidity fee account lookup");
                (party.clone(), account.balance)
            })
            .collect();

        let all_full_fee_penalty = penalties.all_parties_have_full_fee_penalty
            || (!per_party.is_empty() && per_party.values().all(|p| p.fee >= Decimal::ONE));
        if all_full_fee_penalty {
            let sweep = fee_distribution::sweep_fees(&self.asset, &accrued);
            self.transfer_fees(cx, &sweep);
            return;
        }

        let distribution =
            fee_distribution::distribute_fees(&self.asset, &accrued, per_party).or_fatal("distribute fees");
        self.transfer_fees(cx, &distribution.fee_transfer);

        // Performance bonuses
        let pool = cx
            .collateral
            .get_or_create_liquidity_fees_bonus_distribution_account(&self.market_id, &self.asset)
            .or_fatal("bonus distribution account lookup");
        let bonuses =
            fee_distribution::performance_bonus_transfers(&self.asset, pool.balance, &distribution.bonus_weights)
                .or_fatal("performance bonus transfers");
        self.transfer_fees(cx, &bonuses);
    }

    fn transfer_fees(&self, cx: &mut MarketContext<'_>, fee_transfer: &FeeTransfer) {
        if fee_transfer.is_empty() {
            return;
        }
        let movements = cx
            .collateral
            .transfer_spot_fees(&self.market_id, &self.asset, fee_transfer)
            .or_fatal("transfer liquidity fees");
        cx.send_ledger_movements(movements);
    }

    // ========================================================================
    // Block Ticks
    // ========================================================================

    /// Allocate fees when the allocation period has elapsed, otherwise sample scores
    pub fn on_tick(&mut self, cx: &mut MarketContext<'_>, now: Timestamp) {
        if self.engine.ready_for_fees_allocation(now) {
            self.allocate_fees(cx).or_fatal("liquidity fee allocation");
            self.engine.reset_average_liquidity_scores();
            self.engine.reset_fee_allocation_period(now);
            return;
        }

        self.update_liquidity_scores(cx);
    }

    /// Move collected market liquidity fees into each provider's fee account
    pub fn allocate_fees(&mut self, cx: &mut MarketContext<'_>) -> LiquidityResult<()> {
        let account = cx
            .collateral
            .get_market_liquidity_fee_account(&self.market_id, &self.asset)?;
        if account.balance == 0 {
            return Ok(());
        }

        let shares = self.equity_shares.all_shares()?;
        if shares.is_empty() {
            return Ok(());
        }

        let scores = self.engine.get_average_liquidity_scores();
        let fee_transfer = fee_distribution::allocate_fees(&self.asset, account.balance, &shares, &scores)?;
        if fee_transfer.is_empty() {
            return Ok(());
        }

        let movements = cx
            .collateral
            .transfer_spot_fees(&self.market_id, &self.asset, &fee_transfer)?;
        cx.send_ledger_movements(movements);
        Ok(())
    }

    fn update_liquidity_scores(&mut self, cx: &mut MarketContext<'_>) {
        let (min_lp_price, max_lp_price) = match self.valid_orders_price_range(cx.order_book) {
            Ok(range) => range,
            Err(err) => {
                debug!(market = %self.market_id, error = %err, "liquidity score update skipped");
                return;
            }
        };

        let best_prices = cx
            .order_book
            .best_static_bid_price()
            .and_then(|bid| cx.order_book.best_static_ask_price().map(|ask| (bid, ask)));
        let (best_bid, best_ask) = match best_prices {
            Ok(prices) => prices,
            Err(err) => {
                debug!(market = %self.market_id, error = %err, "liquidity score update skipped");
                return;
            }
        };

        self.engine
            .update_average_liquidity_scores(
                decimal_from_uint(best_bid),
                decimal_from_uint(best_ask),
                min_lp_price,
                max_lp_price,
            )
            .or_fatal("update average liquidity scores");
    }

    /// Price band within which LP orders count towards the SLA
    pub fn valid_orders_price_range(&self, order_book: &dyn OrderBook) -> LiquidityResult<(Price, Price)> {
        let best_bid = order_book.best_static_bid_price()?;
        let best_ask = order_book.best_static_ask_price()?;
        lp_price_range(best_bid, best_ask, self.price_range, self.tick_size)
    }

    // ========================================================================
    // Equity-Like Shares
    // ========================================================================

    pub fn end_opening_auction(&mut self) {
        self.equity_shares.end_opening_auction().or_fatal("end opening auction");
    }

    pub fn record_market_value_proxy(&mut self, market_value_proxy: Decimal) {
        self.equity_shares
            .record_growth(market_value_proxy)
            .or_fatal("record market value proxy");
    }

    pub fn inherit_equity_shares(&mut self, records: Vec<EquityShareRecord>) {
        self.equity_shares.inherit(records).or_fatal("inherit equity shares");
    }

    // ========================================================================
    // Network Parameters
    // ========================================================================

    pub fn on_early_exit_penalty(&mut self, early_exit_penalty: Decimal) {
        self.early_exit_penalty = early_exit_penalty;
    }

    pub fn on_min_lp_stake_quantum_multiple(&mut self, multiple: Decimal) {
        self.min_lp_stake_quantum_multiple = multiple;
    }

    pub fn update_sla_price_range(&mut self, price_range: Decimal) {
        self.price_range = price_range;
    }

    pub fn on_tick_size(&mut self, tick_size: Price) {
        self.tick_size = tick_size;
    }

    pub fn on_providers_fee_calculation_time_step(&mut self, step: Duration) {
        self.engine.on_providers_fee_calculation_time_step(step);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn equity_shares(&self) -> &EquityShares {
        &self.equity_shares
    }

    pub fn equity_shares_mut(&mut self) -> &mut EquityShares {
        &mut self.equity_shares
    }

    pub fn provisions_per_party(&self) -> Provisions {
        self.engine.provisions_per_party()
    }

    pub fn calculate_supplied_stake(&self) -> Amount {
        self.engine.calculate_supplied_stake()
    }

    pub fn get_average_liquidity_scores(&self) -> BTreeMap<PartyId, Decimal> {
        self.engine.get_average_liquidity_scores()
    }
}

/// Band of `price_range` around the mid price, snapped inwards to ticks
///
/// The band always spans at least one tick. A lower bound at or above the
/// best ask, or an upper bound at or below the best bid, is moved one tick
/// past the touch.
pub fn lp_price_range(
    best_bid: Price,
    best_ask: Price,
    price_range: Decimal,
    tick_size: Price,
) -> LiquidityResult<(Price, Price)> {
    let mid = div(add(decimal_from_uint(best_bid), decimal_from_uint(best_ask))?, Decimal::TWO)?;
    let lower_bound = mul(sub(Decimal::ONE, price_range)?, mid)?;
    let upper_bound = mul(add(Decimal::ONE, price_range)?, mid)?;

    let mut lower = ceil_to_tick(lower_bound, tick_size)?;
    let mut upper = floor_to_tick(upper_bound, tick_size)?;

    if lower == 0 {
        lower = tick_size;
    }

    if lower >= upper {
        upper = checked_price_add(lower, tick_size)?;
    }

    if lower >= best_ask {
        lower = best_ask.saturating_sub(tick_size);
    }

    if upper <= best_bid {
        upper = checked_price_add(best_bid, tick_size)?;
    }

    Ok((lower, upper))
}

fn checked_price_add(price: Price, tick: Price) -> LiquidityResult<Price> {
    price
        .checked_add(tick)
        .ok_or_else(|| LiquidityError::math_overflow("price plus tick", &[&price.to_string(), &tick.to_string()]))
}

impl<E: LiquidityEngine> StatefulComponent for MarketLiquidity<E> {
    fn namespace(&self) -> &str {
        LIQUIDITY_SNAPSHOT_NAMESPACE
    }

    fn keys(&self) -> Vec<String> {
        vec![self.market_id.clone()]
    }

    fn get_state(&mut self, key: &str) -> LiquidityResult<Vec<u8>> {
        if key != self.market_id {
            return Err(LiquidityError::snapshot(format!("unknown market liquidity key {}", key)));
        }
        encode(&self.equity_shares.get_state()?)
    }

    fn load_state(&mut self, key: &str, payload: &[u8]) -> LiquidityResult<()> {
        if key != self.market_id {
            return Err(LiquidityError::snapshot(format!("unknown market liquidity key {}", key)));
        }
        let state: EquitySharesState = decode(payload)?;
        self.equity_shares = EquityShares::from_state(self.market_id.clone(), state)?;
        Ok(())
    }
}
