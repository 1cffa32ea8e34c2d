//! Deterministic choice of a rounding-remainder recipient
//!
//! The index is derived from the SHA-256 digest of the balance being
//! distributed, encoded as an 8-byte big-endian integer. The first eight
//! digest bytes, read big-endian, are reduced modulo the number of
//! candidates. Candidates must be supplied in ascending party order.

use liqfee_types::Amount;
use sha2::{Digest, Sha256};

/// Index into a sorted candidate list of length `candidates`
///
/// Returns `None` when there is nobody to choose from.
pub fn remainder_recipient_index(balance: Amount, candidates: usize) -> Option<usize> {
    if candidates == 0 {
        return None;
    }
    let digest = Sha256::digest(balance.to_be_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    let seed = u64::from_be_bytes(seed);
    Some((seed % candidates as u64) as usize)
}
