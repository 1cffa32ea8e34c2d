//! # Liquidity Score Averages
//!
//! Running per-party average of instantaneous liquidity scores over the
//! current fee allocation period. Liquidity engines embed this to answer
//! average-score queries and to checkpoint the `{party, score, tick}` rows.

use std::collections::BTreeMap;

use liqfee_math::{add, div, sub};
use liqfee_types::{
    LiquidityError, LiquidityResult, MarketId, PartyId, LIQUIDITY_SCORES_SNAPSHOT_NAMESPACE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::snapshot::{decode, encode, StatefulComponent};

/// Running average for one party
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreAverage {
    pub score: Decimal,
    /// Number of observations folded into `score`
    pub tick: u64,
}

/// Serialized score row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub party: PartyId,
    pub score: Decimal,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityScoreAverages {
    market_id: MarketId,
    averages: BTreeMap<PartyId, ScoreAverage>,
}

impl LiquidityScoreAverages {
    pub fn new(market_id: impl Into<MarketId>) -> Self {
        Self {
            market_id: market_id.into(),
            averages: BTreeMap::new(),
        }
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    /// Fold one observation into every tracked party's average
    ///
    /// Parties tracked earlier but absent from `scores` observe zero.
    pub fn update(&mut self, scores: &BTreeMap<PartyId, Decimal>) -> LiquidityResult<()> {
        for party in scores.keys() {
            self.averages.entry(party.clone()).or_default();
        }

        for (party, average) in self.averages.iter_mut() {
            let score = scores.get(party).copied().unwrap_or(Decimal::ZERO);
            average.tick += 1;
            let step = div(sub(score, average.score)?, Decimal::from(average.tick))?;
            average.score = add(average.score, step)?;
        }
        Ok(())
    }

    /// Current averages in party order
    pub fn averages(&self) -> BTreeMap<PartyId, Decimal> {
        self.averages
            .iter()
            .map(|(party, average)| (party.clone(), average.score))
            .collect()
    }

    pub fn get(&self, party: &str) -> Option<ScoreAverage> {
        self.averages.get(party).copied()
    }

    pub fn remove(&mut self, party: &str) {
        self.averages.remove(party);
    }

    /// Start a new averaging window
    pub fn reset(&mut self) {
        self.averages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }

    pub fn get_state(&self) -> Vec<ScoreRecord> {
        self.averages
            .iter()
            .map(|(party, average)| ScoreRecord {
                party: party.clone(),
                score: average.score,
                tick: average.tick,
            })
            .collect()
    }

    pub fn from_state(market_id: impl Into<MarketId>, records: Vec<ScoreRecord>) -> Self {
        let averages = records
            .into_iter()
            .map(|r| (r.party, ScoreAverage { score: r.score, tick: r.tick }))
            .collect();
        Self {
            market_id: market_id.into(),
            averages,
        }
    }
}

impl StatefulComponent for LiquidityScoreAverages {
    fn namespace(&self) -> &str {
        LIQUIDITY_SCORES_SNAPSHOT_NAMESPACE
    }

    fn keys(&self) -> Vec<String> {
        vec![self.market_id.clone()]
    }

    fn get_state(&mut self, key: &str) -> LiquidityResult<Vec<u8>> {
        if key != self.market_id {
            return Err(LiquidityError::snapshot(format!("unknown liquidity scores key {}", key)));
        }
        encode(&LiquidityScoreAverages::get_state(self))
    }

    fn load_state(&mut self, key: &str, payload: &[u8]) -> LiquidityResult<()> {
        if key != self.market_id {
            return Err(LiquidityError::snapshot(format!("unknown liquidity scores key {}", key)));
        }
        let records: Vec<ScoreRecord> = decode(payload)?;
        *self = LiquidityScoreAverages::from_state(key, records);
        Ok(())
    }
}
