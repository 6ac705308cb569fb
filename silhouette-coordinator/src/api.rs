//! API module for the silhouette-db coordinator.
//!
//! This module defines the HTTP endpoints a coordinator node serves and
//! organizes them into submodules:
//!
//! - [`errors`] – Maps coordinator errors onto HTTP responses.
//! - [`v1`] – The version 1 coordination RPC surface (`StartRound`,
//!   `PublishValues`, `GetValue`, `GetBaseParams`, `GetKeyMapping`).

pub(crate) mod errors;
pub(crate) mod v1;
