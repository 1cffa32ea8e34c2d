//! Price tick rounding

use liqfee_types::{LiquidityError, LiquidityResult, Price};
use rust_decimal::Decimal;

use crate::safe::{mul, uint_from_decimal};

fn tick_decimal(tick_size: Price) -> LiquidityResult<Decimal> {
    if tick_size == 0 {
        return Err(LiquidityError::division_by_zero("tick rounding with zero tick size"));
    }
    Ok(Decimal::from(tick_size))
}

/// Smallest multiple of `tick_size` that is >= `value`
pub fn ceil_to_tick(value: Decimal, tick_size: Price) -> LiquidityResult<Price> {
    let tick = tick_decimal(tick_size)?;
    let ticks = value
        .checked_div(tick)
        .ok_or_else(|| LiquidityError::math_overflow("tick ceil", &[&value.to_string()]))?;
    uint_from_decimal(mul(ticks.ceil(), tick)?)
}

/// Largest multiple of `tick_size` that is <= `value`
pub fn floor_to_tick(value: Decimal, tick_size: Price) -> LiquidityResult<Price> {
    let tick = tick_decimal(tick_size)?;
    let ticks = value
        .checked_div(tick)
        .ok_or_else(|| LiquidityError::math_overflow("tick floor", &[&value.to_string()]))?;
    uint_from_decimal(mul(ticks.floor(), tick)?)
}
