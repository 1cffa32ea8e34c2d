//! Shared test infrastructure for the market liquidity core
//!
//! [`TestMarket`] wires a [`MarketLiquidity`] to in-memory collaborators so
//! tests can drive commitments, ticks and epochs and then inspect balances.

#![allow(dead_code)]

pub mod fakes;
pub mod tracing;

use std::str::FromStr;

use liqfee_core::{LiquidityConfig, MarketContext, MarketLiquidity};
use liqfee_types::{
    AccountType, Amount, LiquidityProvisionAmendment, LiquidityProvisionSubmission, LiquidityResult,
    MarketState, Price, Timestamp,
};
use rust_decimal::Decimal;

pub use fakes::{FakeLiquidityEngine, FakeOrderBook, InMemoryCollateral, RecordingBroker};
pub use self::tracing::init_test_tracing;

pub type TestResult<T = ()> = anyhow::Result<T>;

pub const MARKET: &str = "market-1";
pub const ASSET: &str = "USDT";

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// `lp-1` .. `lp-n`
pub fn parties(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("lp-{}", i)).collect()
}

pub fn submission(commitment_amount: Amount) -> LiquidityProvisionSubmission {
    LiquidityProvisionSubmission {
        market_id: MARKET.to_string(),
        commitment_amount,
        fee: d("0.01"),
        reference: "ref".to_string(),
    }
}

pub fn amendment(commitment_amount: Amount) -> LiquidityProvisionAmendment {
    LiquidityProvisionAmendment {
        market_id: MARKET.to_string(),
        commitment_amount: Some(commitment_amount),
        ..Default::default()
    }
}

/// A market with its collaborators
pub struct TestMarket {
    pub liquidity: MarketLiquidity<FakeLiquidityEngine>,
    pub collateral: InMemoryCollateral,
    pub broker: RecordingBroker,
    pub order_book: FakeOrderBook,
    pub state: MarketState,
}

impl TestMarket {
    pub fn new() -> Self {
        Self::with_config(&LiquidityConfig::default())
    }

    pub fn with_config(config: &LiquidityConfig) -> Self {
        init_test_tracing();

        let mut collateral = InMemoryCollateral::new();
        collateral.seed_market_fees(MARKET, ASSET, 0);

        Self {
            liquidity: MarketLiquidity::new(MARKET, ASSET, FakeLiquidityEngine::new(MARKET), config),
            collateral,
            broker: RecordingBroker::default(),
            order_book: FakeOrderBook::with_prices(100, 102),
            state: MarketState::Active,
        }
    }

    /// Run `f` against the market with a fresh collaborator context
    pub fn with_context<R>(
        &mut self,
        f: impl FnOnce(&mut MarketLiquidity<FakeLiquidityEngine>, &mut MarketContext<'_>) -> R,
    ) -> R {
        let mut cx = MarketContext::new(&mut self.collateral, &mut self.broker, &self.order_book);
        f(&mut self.liquidity, &mut cx)
    }

    pub fn engine(&mut self) -> &mut FakeLiquidityEngine {
        self.liquidity.engine_mut()
    }

    pub fn submit(&mut self, party: &str, commitment_amount: Amount) -> LiquidityResult<()> {
        let state = self.state;
        self.with_context(|ml, cx| {
            ml.submit_liquidity_provision(cx, &submission(commitment_amount), party, &format!("{}-lp", party), state)
        })
    }

    /// Deposit then commit the whole deposit
    pub fn fund_and_submit(&mut self, party: &str, commitment_amount: Amount) -> LiquidityResult<()> {
        self.collateral.deposit(party, ASSET, commitment_amount);
        self.submit(party, commitment_amount)
    }

    pub fn amend(&mut self, party: &str, commitment_amount: Amount) -> LiquidityResult<()> {
        let state = self.state;
        self.with_context(|ml, cx| ml.amend_liquidity_provision(cx, &amendment(commitment_amount), party, state))
    }

    pub fn cancel(&mut self, party: &str) -> LiquidityResult<()> {
        self.with_context(|ml, cx| ml.cancel_liquidity_provision(cx, party))
    }

    pub fn epoch_start(&mut self, now: Timestamp, target_stake: Amount) {
        self.with_context(|ml, cx| ml.on_epoch_start(cx, now, 101, target_stake, Decimal::ONE));
    }

    pub fn epoch_end(&mut self, now: Timestamp) {
        self.with_context(|ml, cx| ml.on_epoch_end(cx, now));
    }

    pub fn tick(&mut self, now: Timestamp) {
        self.with_context(|ml, cx| ml.on_tick(cx, now));
    }

    pub fn set_prices(&mut self, best_bid: Price, best_ask: Price) {
        self.order_book = FakeOrderBook::with_prices(best_bid, best_ask);
    }

    pub fn general(&self, party: &str) -> Amount {
        self.collateral.general(party, ASSET)
    }

    pub fn bond(&self, party: &str) -> Amount {
        self.collateral.balance(party, MARKET, ASSET, AccountType::Bond)
    }

    pub fn accrued_fees(&self, party: &str) -> Amount {
        self.collateral.balance(party, MARKET, ASSET, AccountType::LpLiquidityFees)
    }

    pub fn market_account(&self, account_type: AccountType) -> Amount {
        self.collateral.balance(liqfee_types::SYSTEM_OWNER, MARKET, ASSET, account_type)
    }

    pub fn commitment(&self, party: &str) -> Option<Amount> {
        self.liquidity
            .engine()
            .provisions
            .get(party)
            .map(|p| p.commitment_amount)
    }
}
