//! Lattice-based private information retrieval over a sealed round's
//! row-indexed database (C4 + C5).
//!
//! This is a noise-free, Regev-style matrix-LWE construction shaped after
//! FrodoPIR: a public matrix `A` is regenerated deterministically by both
//! sides from a shared seed, the server precomputes a "hint" matrix once
//! per shard, and each client query is single-use. It deliberately omits
//! LWE noise (see the crate-level design note in `DESIGN.md`) in exchange
//! for an exact, always-correct decode.
//!
//! [`client`] builds and decodes queries; the `server` feature (on by
//! default) adds [`server::PirShard`], which builds shards and answers
//! queries. Splitting them lets a pure client build without pulling in the
//! shard-construction code a coordinator needs.

pub mod client;
pub mod matrix;
pub mod params;
#[cfg(feature = "server")]
pub mod server;
pub mod wire;

pub use client::{PirSession, SessionState};
pub use params::{BaseParams, PirParams};

/// Errors produced while building or using a PIR shard or session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PirError {
    /// A row did not match the shard's declared `elem_size_bytes`.
    #[error("row length does not match elem_size_bytes")]
    BadRowLength,
    /// A query did not match the shard's declared `num_rows`.
    #[error("query length does not match num_rows")]
    BadQueryLength,
    /// The requested row index is out of range for this shard.
    #[error("row index out of range")]
    IndexOutOfRange,
    /// A session method was called out of order (e.g. decoding before
    /// querying, or reusing a session after it queried once).
    #[error("session used out of order")]
    SessionMisuse,
    /// A serialized [`BaseParams`] blob was malformed.
    #[error("malformed base params")]
    MalformedParams,
}
