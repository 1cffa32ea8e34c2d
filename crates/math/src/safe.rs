//! Safe Decimal arithmetic with overflow protection
//!
//! All operations return errors instead of panicking.

use liqfee_types::{Amount, LiquidityError, LiquidityResult, DIVISION_PRECISION};
use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

// ============================================================================
// Safe Basic Arithmetic
// ============================================================================

/// Safe addition
pub fn add(a: Decimal, b: Decimal) -> LiquidityResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| LiquidityError::math_overflow("decimal addition", &[&a.to_string(), &b.to_string()]))
}

/// Safe subtraction
pub fn sub(a: Decimal, b: Decimal) -> LiquidityResult<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| LiquidityError::math_overflow("decimal subtraction", &[&a.to_string(), &b.to_string()]))
}

/// Safe multiplication
pub fn mul(a: Decimal, b: Decimal) -> LiquidityResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| LiquidityError::math_overflow("decimal multiplication", &[&a.to_string(), &b.to_string()]))
}

/// Safe division rounded to `DIVISION_PRECISION` places, half away from zero
pub fn div(a: Decimal, b: Decimal) -> LiquidityResult<Decimal> {
    if b.is_zero() {
        return Err(LiquidityError::division_by_zero(&format!("decimal division: {} / {}", a, b)));
    }
    let quotient = a
        .checked_div(b)
        .ok_or_else(|| LiquidityError::math_overflow("decimal division", &[&a.to_string(), &b.to_string()]))?;
    Ok(quotient.round_dp_with_strategy(DIVISION_PRECISION, RoundingStrategy::MidpointAwayFromZero))
}

/// `a * b / c` with the product formed before dividing
pub fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> LiquidityResult<Decimal> {
    div(mul(a, b)?, c)
}

/// Sum a sequence of values in iteration order
pub fn sum<I>(values: I) -> LiquidityResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, add)
}

// ============================================================================
// Ledger Unit Conversion
// ============================================================================

/// Decimal value of a ledger amount
pub fn decimal_from_uint(amount: Amount) -> Decimal {
    Decimal::from(amount)
}

/// Ledger amount from a Decimal, truncating toward zero
///
/// Negative values convert to zero.
pub fn uint_from_decimal(value: Decimal) -> LiquidityResult<Amount> {
    if value <= Decimal::ZERO {
        return Ok(0);
    }
    value
        .trunc()
        .to_u64()
        .ok_or_else(|| LiquidityError::math_overflow("decimal to ledger amount", &[&value.to_string()]))
}
