//! # Fatal Invariant Handling
//!
//! Invariant violations leave replicated state in a condition no replica can
//! safely continue from. They are logged with full context and then halt the
//! process; release builds abort on panic.

use liqfee_types::{LiquidityError, LiquidityResult};

/// Log an invariant violation and halt
#[track_caller]
pub fn fatal(context: &str, error: &LiquidityError) -> ! {
    tracing::error!(
        context,
        error = %error,
        location = %std::panic::Location::caller(),
        "invariant violation, halting node"
    );
    panic!("{}: {}", context, error);
}

/// Unwrap a result or halt through [`fatal`]
pub trait OrFatal<T> {
    fn or_fatal(self, context: &str) -> T;
}

impl<T> OrFatal<T> for LiquidityResult<T> {
    #[track_caller]
    fn or_fatal(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => fatal(context, &err),
        }
    }
}
