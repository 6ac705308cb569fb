//! Encodings for a sealed round's key/value map.
//!
//! A round is encoded with one of two codecs before it is wrapped by a PIR
//! shard (see `silhouette-pir`):
//!
//! * [`kvs`] — a self-describing, non-oblivious blob used for rounds below
//!   the OKVS minimum pair count. Keys are recoverable from the blob and
//!   point decode is O(1) average case.
//! * [`okvs`] — a Random-Band Oblivious Key-Value Store used once a round
//!   reaches the minimum pair count. Decoding a key that was never inserted
//!   yields a deterministic but unpredictable value rather than an error;
//!   the blob itself does not reveal which keys were inserted.

pub mod kvs;
pub mod okvs;

pub use kvs::{KvsDecodeError, decode as kvs_decode, encode as kvs_encode, keys as kvs_keys};
pub use okvs::{OkvsError, decode as okvs_decode, encode as okvs_encode};
