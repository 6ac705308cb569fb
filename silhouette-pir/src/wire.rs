//! Opaque byte encoding for PIR queries and responses.
//!
//! `GetValue` carries both as plain byte strings over the RPC surface; this
//! module is the shared LE-`u32`-vector codec both sides use to get there,
//! matching the manual binary format [`crate::params::BaseParams`] uses.

use crate::PirError;

/// Serializes a query or response vector to its wire form.
pub fn encode(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Parses a query or response vector from its wire form.
///
/// # Errors
/// [`PirError::MalformedParams`] if `bytes.len()` is not a multiple of 4.
pub fn decode(bytes: &[u8]) -> Result<Vec<u32>, PirError> {
    if bytes.len() % 4 != 0 {
        return Err(PirError::MalformedParams);
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_query() {
        let values = vec![1u32, 2, 3, u32::MAX];
        assert_eq!(decode(&encode(&values)).unwrap(), values);
    }

    #[test]
    fn rejects_truncated_bytes() {
        assert_eq!(decode(&[1, 2, 3]).unwrap_err(), PirError::MalformedParams);
    }
}
