//! Common types and tunable defaults shared across the storage engine.

mod page_id;

pub use page_id::PageId;

use serde::{Deserialize, Serialize};

/// Page size in bytes (default 8 KiB).
pub const PAGE_SIZE: usize = 8192;

/// Size of the on-disk page header (page_id, checksum, lower, upper, special,
/// flags, lsn).
pub const PAGE_HEADER_SIZE: usize = 24;

/// Size of a line pointer entry (offset, length, flags).
pub const LINE_POINTER_SIZE: usize = 6;

/// Default buffer pool capacity, in frames.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Default in-memory WAL buffer size, in bytes.
pub const DEFAULT_WAL_BUFFER_SIZE: usize = 65536;

/// Default arena capacity, in bytes (16 MiB).
pub const DEFAULT_ARENA_CAPACITY: usize = 16 * 1024 * 1024;

/// Default B-tree order.
pub const DEFAULT_BTREE_ORDER: usize = 128;

/// Default hash index bucket count.
pub const DEFAULT_HASH_BUCKETS: usize = 1024;

/// Default bloom filter bit count.
pub const DEFAULT_BLOOM_BITS: usize = 10000;

/// Default bloom filter hash count.
pub const DEFAULT_BLOOM_HASHES: usize = 3;

/// Maximum key size accepted by any index or page tuple.
pub const MAX_KEY_SIZE: usize = PAGE_SIZE / 4;

/// Maximum value size accepted by a page tuple.
pub const MAX_VALUE_SIZE: usize = PAGE_SIZE / 2;

/// Tunable engine parameters, overriding the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub page_size: usize,
    pub buffer_pool_capacity: usize,
    pub wal_buffer_size: usize,
    pub arena_capacity: usize,
    pub btree_order: usize,
    pub hash_buckets: usize,
    pub bloom_bits: usize,
    pub bloom_hashes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            buffer_pool_capacity: DEFAULT_POOL_CAPACITY,
            wal_buffer_size: DEFAULT_WAL_BUFFER_SIZE,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            btree_order: DEFAULT_BTREE_ORDER,
            hash_buckets: DEFAULT_HASH_BUCKETS,
            bloom_bits: DEFAULT_BLOOM_BITS,
            bloom_hashes: DEFAULT_BLOOM_HASHES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.page_size, 8192);
        assert_eq!(cfg.buffer_pool_capacity, 1024);
        assert_eq!(cfg.wal_buffer_size, 65536);
        assert_eq!(cfg.arena_capacity, 16 * 1024 * 1024);
        assert_eq!(cfg.btree_order, 128);
        assert_eq!(cfg.hash_buckets, 1024);
        assert_eq!(cfg.bloom_bits, 10000);
        assert_eq!(cfg.bloom_hashes, 3);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut cfg = EngineConfig::default();
        cfg.btree_order = 64;
        cfg.bloom_hashes = 5;

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"btreeOrder\":64"));

        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.page_size, cfg.page_size);
        assert_eq!(restored.buffer_pool_capacity, cfg.buffer_pool_capacity);
        assert_eq!(restored.wal_buffer_size, cfg.wal_buffer_size);
        assert_eq!(restored.arena_capacity, cfg.arena_capacity);
        assert_eq!(restored.btree_order, cfg.btree_order);
        assert_eq!(restored.hash_buckets, cfg.hash_buckets);
        assert_eq!(restored.bloom_bits, cfg.bloom_bits);
        assert_eq!(restored.bloom_hashes, cfg.bloom_hashes);
    }
}
