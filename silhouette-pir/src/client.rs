//! Client-side PIR session (C5).
//!
//! A session is single-use: [`PirSession::generate_query`] may be called
//! exactly once, and [`PirSession::decode_response`] exactly once after
//! it, matching the `Ready -> Queried -> Decoded` lifecycle. The secret
//! vector is zeroized as soon as the response has been decoded (or the
//! session is dropped without completing).

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

use crate::{PirError, matrix, params::BaseParams};

/// The session's position in its single-use lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No query has been generated yet.
    Ready,
    /// A query has been generated; awaiting a response to decode.
    Queried,
    /// The response has been decoded; the session is spent.
    Decoded,
}

/// A single-use client session against one round's PIR shard.
pub struct PirSession {
    base: BaseParams,
    secret: Vec<u32>,
    state: SessionState,
}

impl PirSession {
    /// Builds a new, unqueried session from the round's published
    /// [`BaseParams`].
    pub fn new(base: BaseParams) -> Self {
        Self {
            base,
            secret: Vec::new(),
            state: SessionState::Ready,
        }
    }

    /// The session's current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Generates a single-use query for `row_index`.
    ///
    /// # Errors
    /// [`PirError::IndexOutOfRange`] if `row_index >= num_rows`,
    /// [`PirError::SessionMisuse`] if a query was already generated.
    pub fn generate_query(&mut self, row_index: usize) -> Result<Vec<u32>, PirError> {
        if self.state != SessionState::Ready {
            return Err(PirError::SessionMisuse);
        }
        if row_index >= self.base.params.num_rows {
            return Err(PirError::IndexOutOfRange);
        }

        let lwe_dim = self.base.params.lwe_dim;
        let mut rng = ChaCha20Rng::from_rng(rand::thread_rng()).expect("rng seeding cannot fail");
        let secret: Vec<u32> = (0..lwe_dim).map(|_| rng.next_u32()).collect();

        let delta = self.base.params.delta();
        let mut query = Vec::with_capacity(self.base.params.num_rows);
        for r in 0..self.base.params.num_rows {
            let a_row = matrix::derive_row(&self.base.params.seed, r as u64, lwe_dim);
            let mut dot = 0u32;
            for (a, s) in a_row.iter().zip(secret.iter()) {
                dot = dot.wrapping_add(a.wrapping_mul(*s));
            }
            if r == row_index {
                dot = dot.wrapping_add(delta);
            }
            query.push(dot);
        }

        self.secret = secret;
        self.state = SessionState::Queried;
        Ok(query)
    }

    /// Decodes a server response produced for this session's query,
    /// recovering the target row's `elem_size_bytes` value bytes.
    ///
    /// # Errors
    /// [`PirError::SessionMisuse`] if called before [`Self::generate_query`]
    /// or more than once.
    pub fn decode_response(&mut self, response: &[u32]) -> Result<Vec<u8>, PirError> {
        if self.state != SessionState::Queried {
            return Err(PirError::SessionMisuse);
        }
        if response.len() != self.base.params.elem_size_bytes {
            return Err(PirError::BadRowLength);
        }

        let shift = 32 - self.base.params.plaintext_bits;
        let mut out = Vec::with_capacity(response.len());
        for (k, &resp_k) in response.iter().enumerate() {
            let hint_row = &self.base.hint[k];
            let mut bias = 0u32;
            for (h, s) in hint_row.iter().zip(self.secret.iter()) {
                bias = bias.wrapping_add(h.wrapping_mul(*s));
            }
            let scaled = resp_k.wrapping_sub(bias);
            out.push((scaled >> shift) as u8);
        }

        self.state = SessionState::Decoded;
        self.close();
        Ok(out)
    }

    /// Zeroizes the session's secret. Safe to call multiple times; called
    /// automatically once [`Self::decode_response`] completes and on drop.
    pub fn close(&mut self) {
        self.secret.zeroize();
    }
}

impl Drop for PirSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PirParams;

    fn build_shard(rows: &[Vec<u8>], seed: [u8; 32]) -> BaseParams {
        let params = PirParams::select(rows.len(), rows[0].len(), seed);
        let shard = crate::server::PirShard::build(params, rows.to_vec()).unwrap();
        shard.base_params()
    }

    #[test]
    fn session_decodes_the_queried_row() {
        let mut rows = vec![vec![0u8; 64]; 5];
        rows[2][0] = 42;
        rows[2][1] = 7;

        let base = build_shard(&rows, [11u8; 32]);
        let shard = crate::server::PirShard::build(base.params, rows.clone()).unwrap();

        let mut session = PirSession::new(shard.base_params());
        assert_eq!(session.state(), SessionState::Ready);
        let query = session.generate_query(2).unwrap();
        assert_eq!(session.state(), SessionState::Queried);
        let response = shard.process_query(&query).unwrap();
        let decoded = session.decode_response(&response).unwrap();
        assert_eq!(session.state(), SessionState::Decoded);
        assert_eq!(decoded, rows[2]);
    }

    #[test]
    fn session_rejects_reuse() {
        let rows = vec![vec![0u8; 64]; 3];
        let base = build_shard(&rows, [1u8; 32]);
        let mut session = PirSession::new(base);
        session.generate_query(0).unwrap();
        assert_eq!(
            session.generate_query(1).unwrap_err(),
            PirError::SessionMisuse
        );
    }

    #[test]
    fn session_rejects_out_of_range_index() {
        let rows = vec![vec![0u8; 64]; 3];
        let base = build_shard(&rows, [1u8; 32]);
        let mut session = PirSession::new(base);
        assert_eq!(
            session.generate_query(99).unwrap_err(),
            PirError::IndexOutOfRange
        );
    }
}
