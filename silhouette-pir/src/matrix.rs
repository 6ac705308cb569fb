//! Deterministic generation of the public PIR matrix `A`.
//!
//! Both the server (building a shard's hint) and the client (generating a
//! query) need the same `A` without transmitting it: every row is derived
//! from the shard's seed and its row index via a `blake3`-keyed extendable
//! hash, which seeds a [`ChaCha20Rng`] that is then sampled for the row's
//! `lwe_dim` `u32` entries.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Derives row `row_index` of the public matrix `A` for a shard seeded
/// with `seed`, as a dense vector of `lwe_dim` `u32` entries.
pub fn derive_row(seed: &[u8; 32], row_index: u64, lwe_dim: usize) -> Vec<u32> {
    let mut hasher = blake3::Hasher::new_keyed(seed);
    hasher.update(&row_index.to_le_bytes());
    let mut row_seed = [0u8; 32];
    hasher.finalize_xof().fill(&mut row_seed);

    let mut rng = ChaCha20Rng::from_seed(row_seed);
    (0..lwe_dim).map(|_| rng.next_u32()).collect()
}
