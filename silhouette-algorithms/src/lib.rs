#![deny(missing_docs)]
//! Round-based graph algorithms driven over silhouette-db (C9, C10).
//!
//! [`driver`] provides the algorithm driver contract every algorithm in
//! this crate is expressed over: `StartRound`/publish/poll-for-seal/
//! private-read primitives plus deterministic vertex→worker assignment.
//! [`degree_collector`] and [`k_core`] are the two example algorithms spec
//! §4.10 sketches: an exact two-round degree collector, and a many-round
//! Locally-Edge-Differentially-Private k-core decomposition.

pub mod degree_collector;
pub mod driver;
pub mod k_core;
pub mod noise;

pub use driver::{DriverConfig, NoiseSampler, RoundDriver, ZeroNoise, vertex_to_worker};
pub use noise::TwoSidedGeometricSampler;
