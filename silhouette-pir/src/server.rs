//! Server-side PIR shard: hint precomputation and query processing (C4).

use crate::{PirError, matrix, params::{BaseParams, PirParams}};

/// A built shard: the round's row-indexed database plus the precomputed
/// hint matrix published to clients.
pub struct PirShard {
    params: PirParams,
    rows: Vec<Vec<u8>>,
    hint: Vec<Vec<u32>>,
}

impl PirShard {
    /// Builds a shard from `params` and the round's ordered rows.
    ///
    /// `rows.len()` must equal `params.num_rows` and every row must be
    /// exactly `params.elem_size_bytes` long (callers pad short values
    /// before calling this).
    pub fn build(params: PirParams, rows: Vec<Vec<u8>>) -> Result<Self, PirError> {
        if rows.len() != params.num_rows {
            return Err(PirError::BadRowLength);
        }
        for row in &rows {
            if row.len() != params.elem_size_bytes {
                return Err(PirError::BadRowLength);
            }
        }

        let mut hint = vec![vec![0u32; params.lwe_dim]; params.elem_size_bytes];
        for (r, row) in rows.iter().enumerate() {
            let a_row = matrix::derive_row(&params.seed, r as u64, params.lwe_dim);
            for (k, &byte) in row.iter().enumerate() {
                if byte == 0 {
                    continue;
                }
                let coeff = byte as u32;
                let hint_row = &mut hint[k];
                for (h, a) in hint_row.iter_mut().zip(a_row.iter()) {
                    *h = h.wrapping_add(coeff.wrapping_mul(*a));
                }
            }
        }

        Ok(Self {
            params,
            rows,
            hint,
        })
    }

    /// The published parameters and hint matrix for this shard.
    pub fn base_params(&self) -> BaseParams {
        BaseParams {
            params: self.params,
            hint: self.hint.clone(),
        }
    }

    /// Answers a client query, returning the opaque response bytes.
    ///
    /// # Errors
    /// [`PirError::BadQueryLength`] if `query.len() != num_rows`.
    pub fn process_query(&self, query: &[u32]) -> Result<Vec<u32>, PirError> {
        if query.len() != self.params.num_rows {
            return Err(PirError::BadQueryLength);
        }

        let mut response = vec![0u32; self.params.elem_size_bytes];
        for (k, resp_k) in response.iter_mut().enumerate() {
            let mut acc = 0u32;
            for (r, row) in self.rows.iter().enumerate() {
                let coeff = row[k] as u32;
                if coeff != 0 {
                    acc = acc.wrapping_add(coeff.wrapping_mul(query[r]));
                }
            }
            *resp_k = acc;
        }
        Ok(response)
    }

    /// Number of rows addressable in this shard.
    pub fn num_rows(&self) -> usize {
        self.params.num_rows
    }
}
