//! Random-Band Oblivious Key-Value Store (C3).
//!
//! Encodes `(String, [u8; 8])` pairs into a length-`m` solution vector over
//! `GF(2)^64` such that, for every encoded key, XOR-ing the 64-bit words at
//! a pseudorandom, key-derived band of the vector reproduces the encoded
//! value exactly. Keys that were never encoded decode to whatever the band
//! happens to XOR to — a value indistinguishable from noise, which is the
//! obliviousness property this codec exists for.
//!
//! Construction solves the banded linear system with forward elimination
//! (assign each row the leftmost column it can pivot on, eliminating
//! against already-assigned pivots) followed by back-substitution in
//! decreasing pivot-column order. Unlike a literal banded implementation
//! that only ever touches a fixed-width window per row, rows here carry a
//! dense bitset over all `m` columns once elimination starts touching
//! columns outside their initial band; this keeps the linear algebra simple
//! and correct at the cost of the asymptotic sparsity a production PSI
//! library would exploit.

use rand::Rng;

const MIN_PAIRS: usize = 100;
const MAX_BUILD_ATTEMPTS: u32 = 16;
const VALUE_BYTES: usize = 8;

/// Error returned while encoding or decoding an OKVS blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OkvsError {
    /// Fewer than [`MIN_PAIRS`] pairs were supplied to [`encode`].
    #[error("okvs requires at least {MIN_PAIRS} pairs")]
    TooFewPairs,
    /// A value was not exactly 8 bytes.
    #[error("okvs values must be exactly 8 bytes")]
    BadValueSize,
    /// The band system did not converge within the retry budget.
    #[error("okvs construction did not converge")]
    ConstructionFailed,
    /// The blob is too short or its header is inconsistent.
    #[error("malformed okvs blob")]
    Malformed,
}

fn band_width(n: usize, m: usize) -> usize {
    let log2 = if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    };
    (log2 * 2 + 40).min(m).max(8)
}

/// Derives a key's band start column and its per-column coefficient bits
/// (length `w`) from `seed` using `blake3`'s extendable output.
fn band_for(key: &str, seed: u64, m: usize, w: usize) -> (usize, Vec<bool>) {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(key.as_bytes());
    let mut reader = hasher.finalize_xof();

    let mut start_bytes = [0u8; 8];
    reader.fill(&mut start_bytes);
    let start_range = (m - w + 1).max(1);
    let start = (u64::from_le_bytes(start_bytes) as usize) % start_range;

    let coeff_bytes = w.div_ceil(8);
    let mut coeffs = vec![0u8; coeff_bytes];
    reader.fill(&mut coeffs);
    let bits = (0..w)
        .map(|i| (coeffs[i / 8] >> (i % 8)) & 1 == 1)
        .collect();
    (start, bits)
}

struct DenseRow {
    /// One bit per column, packed into 64-bit words.
    words: Vec<u64>,
    target: u64,
}

impl DenseRow {
    fn new(word_count: usize, start: usize, band: &[bool], target: u64) -> Self {
        let mut words = vec![0u64; word_count];
        for (offset, &bit) in band.iter().enumerate() {
            if bit {
                let col = start + offset;
                words[col / 64] |= 1u64 << (col % 64);
            }
        }
        Self { words, target }
    }

    fn leftmost_set_column(&self) -> Option<usize> {
        for (word_idx, &word) in self.words.iter().enumerate() {
            if word != 0 {
                return Some(word_idx * 64 + word.trailing_zeros() as usize);
            }
        }
        None
    }

    fn xor_with(&mut self, other: &DenseRow) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a ^= b;
        }
        self.target ^= other.target;
    }

    fn is_set(&self, col: usize) -> bool {
        (self.words[col / 64] >> (col % 64)) & 1 == 1
    }
}

fn try_build(pairs: &[(String, u64)], seed: u64, m: usize, w: usize) -> Option<Vec<u64>> {
    let word_count = m.div_ceil(64);
    let mut order: Vec<usize> = (0..pairs.len()).collect();
    let starts: Vec<usize> = pairs
        .iter()
        .map(|(key, _)| band_for(key, seed, m, w).0)
        .collect();
    order.sort_by_key(|&i| starts[i]);

    let mut pivot_of_col: Vec<Option<usize>> = vec![None; m];
    let mut pivot_rows: Vec<Option<DenseRow>> = (0..pairs.len()).map(|_| None).collect();
    let mut pivot_cols: Vec<Option<usize>> = vec![None; pairs.len()];

    for &i in &order {
        let (key, value) = &pairs[i];
        let (start, band) = band_for(key, seed, m, w);
        let mut row = DenseRow::new(word_count, start, &band, *value);

        loop {
            match row.leftmost_set_column() {
                None => {
                    if row.target != 0 {
                        return None;
                    }
                    break;
                }
                Some(col) => match pivot_of_col[col] {
                    None => {
                        pivot_of_col[col] = Some(i);
                        pivot_cols[i] = Some(col);
                        pivot_rows[i] = Some(row);
                        break;
                    }
                    Some(pivot_row_idx) => {
                        let pivot_row = pivot_rows[pivot_row_idx]
                            .as_ref()
                            .expect("pivot_of_col only points at assigned rows");
                        row.xor_with(pivot_row);
                    }
                },
            }
        }
    }

    let mut solved_order: Vec<(usize, usize)> = pivot_cols
        .iter()
        .enumerate()
        .filter_map(|(i, col)| col.map(|c| (c, i)))
        .collect();
    solved_order.sort_by(|a, b| b.0.cmp(&a.0));

    let mut y = vec![0u64; m];
    for (col, row_idx) in solved_order {
        let row = pivot_rows[row_idx].as_ref().expect("solved row exists");
        let mut val = row.target;
        for c in 0..m {
            if c != col && row.is_set(c) {
                val ^= y[c];
            }
        }
        y[col] = val;
    }
    Some(y)
}

/// Encodes `pairs` into an OKVS blob.
///
/// # Errors
/// [`OkvsError::TooFewPairs`] if fewer than 100 pairs are supplied,
/// [`OkvsError::BadValueSize`] if any value is not exactly 8 bytes, or
/// [`OkvsError::ConstructionFailed`] if the band system fails to converge
/// within the retry budget (astronomically unlikely for random bands).
pub fn encode(pairs: &[(String, Vec<u8>)]) -> Result<Vec<u8>, OkvsError> {
    if pairs.len() < MIN_PAIRS {
        return Err(OkvsError::TooFewPairs);
    }
    let mut words = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if value.len() != VALUE_BYTES {
            return Err(OkvsError::BadValueSize);
        }
        let word = u64::from_le_bytes(value.as_slice().try_into().unwrap());
        words.push((key.clone(), word));
    }

    let m = ((pairs.len() as f64) * 1.25).ceil() as usize;
    let w = band_width(pairs.len(), m);

    let mut rng = rand::thread_rng();
    let mut seed: u64 = rng.r#gen();
    for _ in 0..MAX_BUILD_ATTEMPTS {
        if let Some(y) = try_build(&words, seed, m, w) {
            let mut out = Vec::with_capacity(8 + 4 + 4 + y.len() * 8);
            out.extend_from_slice(&seed.to_le_bytes());
            out.extend_from_slice(&(m as u32).to_le_bytes());
            out.extend_from_slice(&(w as u32).to_le_bytes());
            for word in &y {
                out.extend_from_slice(&word.to_le_bytes());
            }
            return Ok(out);
        }
        seed = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    }
    Err(OkvsError::ConstructionFailed)
}

/// Decodes the value associated with `key`. Always succeeds for a
/// well-formed blob, including for keys that were never encoded (the
/// obliviousness property).
pub fn decode(blob: &[u8], key: &str) -> Result<[u8; 8], OkvsError> {
    if blob.len() < 16 {
        return Err(OkvsError::Malformed);
    }
    let seed = u64::from_le_bytes(blob[0..8].try_into().unwrap());
    let m = u32::from_le_bytes(blob[8..12].try_into().unwrap()) as usize;
    let w = u32::from_le_bytes(blob[12..16].try_into().unwrap()) as usize;
    if blob.len() != 16 + m * 8 || w == 0 || w > m {
        return Err(OkvsError::Malformed);
    }

    let (start, band) = band_for(key, seed, m, w);
    let mut acc = 0u64;
    for (offset, &bit) in band.iter().enumerate() {
        if bit {
            let col = start + offset;
            let word_start = 16 + col * 8;
            let word = u64::from_le_bytes(blob[word_start..word_start + 8].try_into().unwrap());
            acc ^= word;
        }
    }
    Ok(acc.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(n: usize) -> Vec<(String, Vec<u8>)> {
        (0..n)
            .map(|i| (format!("key-{i}"), ((i as u64) * 7 + 3).to_le_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn rejects_fewer_than_minimum_pairs() {
        assert_eq!(encode(&pairs(99)).unwrap_err(), OkvsError::TooFewPairs);
    }

    #[test]
    fn accepts_exactly_minimum_pairs() {
        assert!(encode(&pairs(100)).is_ok());
    }

    #[test]
    fn rejects_bad_value_size() {
        let mut data = pairs(100);
        data[0].1 = vec![0u8; 4];
        assert_eq!(encode(&data).unwrap_err(), OkvsError::BadValueSize);
    }

    #[test]
    fn round_trips_every_inserted_key() {
        let data = pairs(250);
        let blob = encode(&data).unwrap();
        for (key, value) in &data {
            assert_eq!(&decode(&blob, key).unwrap(), value.as_slice());
        }
    }

    #[test]
    fn unknown_key_decodes_without_error() {
        let data = pairs(150);
        let blob = encode(&data).unwrap();
        // No assertion on the value itself: any deterministic 8 bytes are
        // acceptable, the defining property is the absence of an error.
        decode(&blob, "never-inserted").unwrap();
    }
}
