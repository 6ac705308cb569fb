//! Self-describing key/value blob (C2).
//!
//! Layout: a fixed-size open-addressing hash table (slots keyed by the
//! `blake3` hash of the key) followed by a flat arena holding the raw key
//! and value bytes every slot points into. Point decode hashes the query
//! key, then linearly probes the table until the stored key bytes compare
//! equal or an empty slot is reached.
//!
//! The blob preserves value bytes exactly; it makes no obliviousness claim
//! (see [`okvs`](crate::okvs) for that).

const SLOT_SIZE: usize = 8 + 4 + 4 + 4 + 4;
const HEADER_SIZE: usize = 4 + 4;
const EMPTY_HASH: u64 = u64::MAX;

/// Error returned when a [`decode`] call cannot recover a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KvsDecodeError {
    /// The blob is too short or its header is inconsistent.
    #[error("malformed kvs blob")]
    Malformed,
    /// The queried key was never inserted.
    #[error("key not present")]
    NotFound,
}

fn key_hash(key: &str) -> u64 {
    let digest = blake3::hash(key.as_bytes());
    let bytes = digest.as_bytes();
    u64::from_le_bytes(bytes[0..8].try_into().expect("8-byte slice"))
}

fn table_size_for(entries: usize) -> usize {
    let min_slots = (entries * 2).max(4);
    min_slots.next_power_of_two()
}

/// Encodes `pairs` into a self-describing blob.
///
/// Keys must be unique; if `pairs` contains a duplicate key the later
/// occurrence silently shadows the earlier one in the built table (callers
/// in this workspace never produce duplicates, since the coordinator
/// aggregates last-write-wins per worker before encoding).
pub fn encode(pairs: &[(String, Vec<u8>)]) -> Vec<u8> {
    let table_size = table_size_for(pairs.len());
    let mut slot_hash = vec![EMPTY_HASH; table_size];
    let mut slot_key_offset = vec![0u32; table_size];
    let mut slot_key_len = vec![0u32; table_size];
    let mut slot_value_offset = vec![0u32; table_size];
    let mut slot_value_len = vec![0u32; table_size];

    let mut arena = Vec::new();
    for (key, value) in pairs {
        let key_offset = arena.len() as u32;
        arena.extend_from_slice(key.as_bytes());
        let value_offset = arena.len() as u32;
        arena.extend_from_slice(value);

        let hash = key_hash(key);
        let mut idx = (hash as usize) % table_size;
        loop {
            if slot_hash[idx] == EMPTY_HASH {
                slot_hash[idx] = hash;
                slot_key_offset[idx] = key_offset;
                slot_key_len[idx] = key.len() as u32;
                slot_value_offset[idx] = value_offset;
                slot_value_len[idx] = value.len() as u32;
                break;
            }
            idx = (idx + 1) % table_size;
        }
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + table_size * SLOT_SIZE + arena.len());
    out.extend_from_slice(&(table_size as u32).to_le_bytes());
    out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
    for i in 0..table_size {
        out.extend_from_slice(&slot_hash[i].to_le_bytes());
        out.extend_from_slice(&slot_key_offset[i].to_le_bytes());
        out.extend_from_slice(&slot_key_len[i].to_le_bytes());
        out.extend_from_slice(&slot_value_offset[i].to_le_bytes());
        out.extend_from_slice(&slot_value_len[i].to_le_bytes());
    }
    out.extend_from_slice(&arena);
    out
}

/// Decodes the value stored under `key`, or [`KvsDecodeError::NotFound`] if
/// `key` was never encoded.
pub fn decode(blob: &[u8], key: &str) -> Result<Vec<u8>, KvsDecodeError> {
    if blob.len() < HEADER_SIZE {
        return Err(KvsDecodeError::Malformed);
    }
    let table_size = u32::from_le_bytes(blob[0..4].try_into().unwrap()) as usize;
    let table_bytes = table_size * SLOT_SIZE;
    let arena_start = HEADER_SIZE + table_bytes;
    if blob.len() < arena_start {
        return Err(KvsDecodeError::Malformed);
    }
    let arena = &blob[arena_start..];

    if table_size == 0 {
        return Err(KvsDecodeError::NotFound);
    }

    let hash = key_hash(key);
    let mut idx = (hash as usize) % table_size;
    for _ in 0..table_size {
        let slot_start = HEADER_SIZE + idx * SLOT_SIZE;
        let slot = &blob[slot_start..slot_start + SLOT_SIZE];
        let slot_hash = u64::from_le_bytes(slot[0..8].try_into().unwrap());
        if slot_hash == EMPTY_HASH {
            return Err(KvsDecodeError::NotFound);
        }
        if slot_hash == hash {
            let key_offset = u32::from_le_bytes(slot[8..12].try_into().unwrap()) as usize;
            let key_len = u32::from_le_bytes(slot[12..16].try_into().unwrap()) as usize;
            let value_offset = u32::from_le_bytes(slot[16..20].try_into().unwrap()) as usize;
            let value_len = u32::from_le_bytes(slot[20..24].try_into().unwrap()) as usize;
            let stored_key = arena
                .get(key_offset..key_offset + key_len)
                .ok_or(KvsDecodeError::Malformed)?;
            if stored_key == key.as_bytes() {
                let value = arena
                    .get(value_offset..value_offset + value_len)
                    .ok_or(KvsDecodeError::Malformed)?;
                return Ok(value.to_vec());
            }
        }
        idx = (idx + 1) % table_size;
    }
    Err(KvsDecodeError::NotFound)
}

/// Enumerates every key stored in a well-formed blob.
///
/// Unlike [`okvs`](crate::okvs), KVS makes no obliviousness claim: keys are
/// stored in plaintext in the arena, so a full listing is recoverable
/// directly from the blob. Used to rebuild a round's `key_to_index` after a
/// leader change, when only the persisted encoding survives.
pub fn keys(blob: &[u8]) -> Result<Vec<String>, KvsDecodeError> {
    if blob.len() < HEADER_SIZE {
        return Err(KvsDecodeError::Malformed);
    }
    let table_size = u32::from_le_bytes(blob[0..4].try_into().unwrap()) as usize;
    let count = u32::from_le_bytes(blob[4..8].try_into().unwrap()) as usize;
    let table_bytes = table_size * SLOT_SIZE;
    let arena_start = HEADER_SIZE + table_bytes;
    if blob.len() < arena_start {
        return Err(KvsDecodeError::Malformed);
    }
    let arena = &blob[arena_start..];

    let mut keys = Vec::with_capacity(count);
    for i in 0..table_size {
        let slot_start = HEADER_SIZE + i * SLOT_SIZE;
        let slot = &blob[slot_start..slot_start + SLOT_SIZE];
        let slot_hash = u64::from_le_bytes(slot[0..8].try_into().unwrap());
        if slot_hash == EMPTY_HASH {
            continue;
        }
        let key_offset = u32::from_le_bytes(slot[8..12].try_into().unwrap()) as usize;
        let key_len = u32::from_le_bytes(slot[12..16].try_into().unwrap()) as usize;
        let stored_key = arena
            .get(key_offset..key_offset + key_len)
            .ok_or(KvsDecodeError::Malformed)?;
        keys.push(String::from_utf8_lossy(stored_key).into_owned());
    }
    Ok(keys)
}
