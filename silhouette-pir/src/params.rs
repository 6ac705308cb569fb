//! Shard parameter selection and the wire format clients fetch via
//! `GetBaseParams`.

use crate::PirError;

/// Parameters fixing the shape of a shard's matrix-LWE instance.
///
/// `elem_size_bytes` is the padded row width (one byte per plaintext
/// symbol); `lwe_dim` is the dimension of the secret/query vector;
/// `plaintext_bits` bounds how many bits of headroom a symbol is encoded
/// with, which in turn fixes the scaling factor `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirParams {
    /// Seed from which both sides regenerate the public matrix `A`.
    pub seed: [u8; 32],
    /// Number of rows (keys) addressable in this shard.
    pub num_rows: usize,
    /// Row width in bytes; also the number of columns in the hint matrix.
    pub elem_size_bytes: usize,
    /// Dimension of the client secret and of each row of `A`.
    pub lwe_dim: usize,
    /// Number of bits of plaintext headroom; fixes `delta = 2^(32 - plaintext_bits)`.
    pub plaintext_bits: u32,
}

impl PirParams {
    /// Selects parameters for a shard with `num_rows` rows whose values
    /// are at most `max_value_len` bytes, using `seed` to derive the
    /// shard's public matrix.
    pub fn select(num_rows: usize, max_value_len: usize, seed: [u8; 32]) -> Self {
        let elem_size_bytes = max_value_len.max(64).next_power_of_two();
        Self {
            seed,
            num_rows,
            elem_size_bytes,
            lwe_dim: 512,
            plaintext_bits: 10,
        }
    }

    /// The scaling factor `delta = 2^(32 - plaintext_bits)` a client adds
    /// to its query at the target row.
    pub fn delta(&self) -> u32 {
        1u32 << (32 - self.plaintext_bits)
    }
}

/// The published parameters and precomputed hint matrix for a sealed
/// round's shard; the opaque byte form of this is what `GetBaseParams`
/// returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseParams {
    /// The shard's fixed parameters.
    pub params: PirParams,
    /// The `elem_size_bytes x lwe_dim` hint matrix `D^T * A`.
    pub hint: Vec<Vec<u32>>,
}

impl BaseParams {
    /// Serializes to the opaque byte form transmitted over the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let p = &self.params;
        let mut out = Vec::with_capacity(32 + 16 + p.elem_size_bytes * p.lwe_dim * 4);
        out.extend_from_slice(&p.seed);
        out.extend_from_slice(&(p.num_rows as u32).to_le_bytes());
        out.extend_from_slice(&(p.elem_size_bytes as u32).to_le_bytes());
        out.extend_from_slice(&(p.lwe_dim as u32).to_le_bytes());
        out.extend_from_slice(&p.plaintext_bits.to_le_bytes());
        for row in &self.hint {
            for &word in row {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
        out
    }

    /// Parses a [`BaseParams`] from its opaque byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PirError> {
        if bytes.len() < 48 {
            return Err(PirError::MalformedParams);
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[0..32]);
        let num_rows = u32::from_le_bytes(bytes[32..36].try_into().unwrap()) as usize;
        let elem_size_bytes = u32::from_le_bytes(bytes[36..40].try_into().unwrap()) as usize;
        let lwe_dim = u32::from_le_bytes(bytes[40..44].try_into().unwrap()) as usize;
        let plaintext_bits = u32::from_le_bytes(bytes[44..48].try_into().unwrap());

        let expected_len = 48 + elem_size_bytes * lwe_dim * 4;
        if bytes.len() != expected_len {
            return Err(PirError::MalformedParams);
        }

        let mut hint = Vec::with_capacity(elem_size_bytes);
        let mut cursor = 48;
        for _ in 0..elem_size_bytes {
            let mut row = Vec::with_capacity(lwe_dim);
            for _ in 0..lwe_dim {
                row.push(u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()));
                cursor += 4;
            }
            hint.push(row);
        }

        Ok(Self {
            params: PirParams {
                seed,
                num_rows,
                elem_size_bytes,
                lwe_dim,
                plaintext_bits,
            },
            hint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_round_trip_through_bytes() {
        let params = PirParams::select(17, 40, [9u8; 32]);
        let base = BaseParams {
            hint: vec![vec![1, 2, 3, 4]; params.elem_size_bytes],
            params,
        };
        let bytes = base.to_bytes();
        let parsed = BaseParams::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, base);
    }

    #[test]
    fn select_pads_small_values_up_to_64_bytes() {
        let params = PirParams::select(10, 8, [0u8; 32]);
        assert_eq!(params.elem_size_bytes, 64);
    }

    #[test]
    fn select_rounds_larger_values_to_a_power_of_two() {
        let params = PirParams::select(10, 100, [0u8; 32]);
        assert_eq!(params.elem_size_bytes, 128);
    }
}
