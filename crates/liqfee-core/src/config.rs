use std::fs;
use std::path::Path;
use std::time::Duration;

use liqfee_types::{
    LiquidityError, LiquidityResult, Price, DEFAULT_EARLY_EXIT_PENALTY,
    DEFAULT_FEE_CALCULATION_TIME_STEP_SECS, DEFAULT_MIN_LP_STAKE_QUANTUM_MULTIPLE,
    DEFAULT_SLA_PRICE_RANGE, DEFAULT_TICK_SIZE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market liquidity parameters loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LiquidityConfig {
    /// Fraction of a commitment reduction slashed when it exceeds the penalty-free headroom
    pub early_exit_penalty: Decimal,

    /// Minimum commitment in multiples of the settlement asset quantum
    pub min_lp_stake_quantum_multiple: Decimal,

    /// Relative distance from mid within which LP orders count towards the SLA
    pub price_range: Decimal,

    /// Smallest price increment of the market
    pub tick_size: Price,

    /// Interval between liquidity fee allocations (seconds)
    pub fee_calculation_time_step_secs: u64,
}

impl LiquidityConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> LiquidityResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LiquidityError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> LiquidityResult<Self> {
        let config: LiquidityConfig = toml::from_str(content)
            .map_err(|e| LiquidityError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> LiquidityResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| LiquidityError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            LiquidityError::config(format!("Failed to write config file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> LiquidityResult<()> {
        if self.early_exit_penalty < Decimal::ZERO || self.early_exit_penalty > Decimal::ONE {
            return Err(LiquidityError::invalid_parameter(
                "early_exit_penalty",
                &self.early_exit_penalty.to_string(),
                "between 0 and 1",
            ));
        }

        if self.min_lp_stake_quantum_multiple < Decimal::ZERO {
            return Err(LiquidityError::invalid_parameter(
                "min_lp_stake_quantum_multiple",
                &self.min_lp_stake_quantum_multiple.to_string(),
                "at least 0",
            ));
        }

        if self.price_range < Decimal::ZERO || self.price_range > Decimal::ONE {
            return Err(LiquidityError::invalid_parameter(
                "price_range",
                &self.price_range.to_string(),
                "between 0 and 1",
            ));
        }

        if self.tick_size == 0 {
            return Err(LiquidityError::invalid_parameter("tick_size", "0", "greater than 0"));
        }

        if self.fee_calculation_time_step_secs == 0 {
            return Err(LiquidityError::invalid_parameter(
                "fee_calculation_time_step_secs",
                "0",
                "greater than 0",
            ));
        }

        Ok(())
    }

    /// Fee allocation interval as a duration
    pub fn fee_calculation_time_step(&self) -> Duration {
        Duration::from_secs(self.fee_calculation_time_step_secs)
    }
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            early_exit_penalty: DEFAULT_EARLY_EXIT_PENALTY,
            min_lp_stake_quantum_multiple: DEFAULT_MIN_LP_STAKE_QUANTUM_MULTIPLE,
            price_range: DEFAULT_SLA_PRICE_RANGE,
            tick_size: DEFAULT_TICK_SIZE,
            fee_calculation_time_step_secs: DEFAULT_FEE_CALCULATION_TIME_STEP_SECS,
        }
    }
}
