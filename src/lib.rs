//! # Storage Core
//!
//! The storage core of an embedded relational engine: a paged file, a
//! buffer pool on top of it, a write-ahead log for durability, a bump
//! arena for transient allocation, and a set of volatile secondary
//! indexes (ordered, hash, bloom) that a higher query layer composes over.
//!
//! ## Architecture
//!
//! - **Page Layer** (`page`): slotted page format with tombstone deletes
//! - **Storage Layer** (`storage`): disk I/O and page allocation
//! - **Buffer Pool** (`buffer`): fixed-capacity page cache with pin/unpin
//! - **Write-Ahead Log** (`wal`): typed records, group commit, replay
//! - **Arena** (`memory`): bump allocator for per-request scratch memory
//! - **Indexes** (`index`): in-memory B-tree, chained hash, bloom filter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use minsql_storage::{StorageHandle, Config};
//!
//! let handle = StorageHandle::init(Config::new("my_data_dir"))?;
//!
//! let (page_id, guard) = handle.new_page()?.unwrap();
//! handle.put_page(&guard, |page| { page.add_tuple(b"hello").unwrap(); })?;
//! handle.release_page(page_id)?;
//!
//! handle.checkpoint()?;
//! ```

pub mod buffer;
pub mod error;
pub mod index;
pub mod memory;
pub mod page;
pub mod storage;
pub mod types;
pub mod wal;

pub use error::{Result, StorageError};
pub use types::{EngineConfig, PageId, PAGE_SIZE};

use types::MAX_KEY_SIZE;

fn check_key_size(key: &[u8]) -> Result<()> {
    if key.len() > MAX_KEY_SIZE {
        return Err(StorageError::KeyTooLarge {
            size: key.len(),
            max: MAX_KEY_SIZE,
        });
    }
    Ok(())
}

pub use buffer::{BufferPoolImpl, PageGuard};
pub use index::{BTree, BloomFilter, HashIndex};
pub use memory::Arena;
pub use page::Page;
pub use storage::{DiskManager, DiskManagerImpl};
pub use wal::{WalRecord, WalRecordType, WriteAheadLog};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Storage configuration: where it lives on disk, and the tunables that
/// size each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `pages.dat` and `wal.log`.
    pub data_dir: PathBuf,
    pub engine: EngineConfig,
}

impl Config {
    /// Configuration with default tunables, rooted at `data_dir`.
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            engine: EngineConfig::default(),
        }
    }

    /// Override the engine tunables.
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Storage-core diagnostics, analogous to a catalog layer's health check.
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub page_count: usize,
    pub buffer_pool_capacity: usize,
    pub btree_count: usize,
    pub hash_index_count: usize,
    pub bloom_filter_count: usize,
}

/// Composes the page manager, buffer pool, write-ahead log and arena into
/// a single handle, and hosts named volatile secondary indexes on top.
///
/// This is the primary entry point for the storage core; a query/catalog
/// layer builds table and row semantics on top of it.
pub struct StorageHandle {
    buffer_pool: Arc<BufferPoolImpl>,
    #[allow(dead_code)]
    disk_manager: Arc<DiskManagerImpl>,
    wal: WriteAheadLog,
    arena: Mutex<Arena>,
    btrees: Mutex<HashMap<String, BTree>>,
    hash_indexes: Mutex<HashMap<String, HashIndex>>,
    bloom_filters: Mutex<HashMap<String, BloomFilter>>,
    config: Config,
    next_row_id: AtomicU64,
}

impl StorageHandle {
    /// Open or create the storage core at `config.data_dir`.
    pub fn init(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let disk_manager = Arc::new(DiskManagerImpl::open(&config.data_dir.join("pages.dat"))?);
        let buffer_pool = Arc::new(BufferPoolImpl::new(
            disk_manager.clone(),
            config.engine.buffer_pool_capacity,
        ));
        let wal = WriteAheadLog::open(
            &config.data_dir.join("wal.log"),
            config.engine.wal_buffer_size,
        )?;
        let arena = Mutex::new(Arena::new(config.engine.arena_capacity)?);

        log::info!("storage handle: opened at {:?}", config.data_dir);

        Ok(Self {
            buffer_pool,
            disk_manager,
            wal,
            arena,
            btrees: Mutex::new(HashMap::new()),
            hash_indexes: Mutex::new(HashMap::new()),
            bloom_filters: Mutex::new(HashMap::new()),
            config,
            next_row_id: AtomicU64::new(0),
        })
    }

    /// Flush all dirty pages and the WAL buffer. Does not close any files;
    /// the handle remains usable afterwards.
    pub fn shutdown(&self) -> Result<()> {
        self.buffer_pool.flush_all()?;
        self.wal.flush()?;
        log::info!("storage handle: shut down cleanly");
        Ok(())
    }

    // -- Page manager / buffer pool -----------------------------------

    /// Fetch a page, pinning it. `Ok(None)` if the buffer pool is
    /// saturated (every frame pinned).
    pub fn get_page(&self, page_id: PageId) -> Result<Option<PageGuard>> {
        self.buffer_pool.get(page_id)
    }

    /// Allocate a fresh page, pinned and dirty. `Ok(None)` if the buffer
    /// pool is saturated (every frame pinned).
    pub fn new_page(&self) -> Result<Option<(PageId, PageGuard)>> {
        self.buffer_pool.new_page()
    }

    /// Mutate the pinned page behind `guard`, marking it dirty.
    pub fn put_page<R>(&self, guard: &PageGuard, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        self.buffer_pool.with_mut(guard, f)
    }

    /// Read the pinned page behind `guard`.
    pub fn read_page<R>(&self, guard: &PageGuard, f: impl FnOnce(&Page) -> R) -> Result<R> {
        self.buffer_pool.with(guard, f)
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        self.buffer_pool.flush_page(page_id)
    }

    /// Unpin a page, making it eligible for eviction once its pin count
    /// reaches zero.
    pub fn release_page(&self, page_id: PageId) {
        self.buffer_pool.unpin(page_id)
    }

    // -- Write-ahead log ------------------------------------------------

    /// Buffer a WAL record, assigning it the next LSN. Not durable until
    /// `wal_flush`.
    pub fn wal_append(&self, record: WalRecord) -> Result<u64> {
        self.wal.append(record)
    }

    pub fn wal_flush(&self) -> Result<()> {
        self.wal.flush()
    }

    /// Replay the log from the start, dispatching each well-formed record
    /// to `redo`.
    pub fn wal_replay(&self, redo: impl FnMut(&WalRecord)) -> Result<()> {
        self.wal.replay(redo)
    }

    /// Flush every dirty page, append a `Checkpoint` WAL record and fsync:
    /// everything before this call is durable, and replay can use the
    /// trailing `Checkpoint` record as a recovery marker.
    pub fn checkpoint(&self) -> Result<()> {
        self.buffer_pool.flush_all()?;
        self.wal
            .append(WalRecord::new(0, 0, WalRecordType::Checkpoint, vec![]))?;
        self.wal.flush()?;
        log::debug!("storage handle: checkpoint complete");
        Ok(())
    }

    /// Replay the WAL to reconstruct state after a restart. Thin wrapper
    /// over `wal_replay`; a catalog layer supplies the redo logic.
    pub fn recover(&self, redo: impl FnMut(&WalRecord)) -> Result<()> {
        self.wal_replay(redo)
    }

    // -- Arena ------------------------------------------------------------

    pub fn arena_alloc(&self, size: usize) -> Option<Vec<u8>> {
        let mut arena = self.arena.lock();
        arena.alloc(size).map(|s| s.to_vec())
    }

    pub fn arena_reset(&self) {
        self.arena.lock().reset();
    }

    // -- Row-id allocation ------------------------------------------------

    /// Monotonic row-id counter, shared by every named index on this
    /// handle. A catalog layer consumes this; the storage core only
    /// allocates it.
    pub fn next_row_id(&self) -> u64 {
        self.next_row_id.fetch_add(1, Ordering::Relaxed)
    }

    // -- Ordered (B-tree) index registry -----------------------------------

    pub fn create_btree(&self, name: impl Into<String>) {
        let order = self.config.engine.btree_order;
        self.btrees
            .lock()
            .entry(name.into())
            .or_insert_with(|| BTree::new(order));
    }

    pub fn btree_insert(&self, name: &str, key: Vec<u8>, value: u64) -> Result<()> {
        check_key_size(&key)?;
        let mut trees = self.btrees.lock();
        let tree = trees
            .get_mut(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no B-tree index named {name}")))?;
        tree.insert(key, value);
        Ok(())
    }

    pub fn btree_search(&self, name: &str, key: &[u8]) -> Result<Option<u64>> {
        let trees = self.btrees.lock();
        let tree = trees
            .get(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no B-tree index named {name}")))?;
        Ok(tree.search(key))
    }

    pub fn btree_delete(&self, name: &str, key: &[u8]) -> Result<bool> {
        let mut trees = self.btrees.lock();
        let tree = trees
            .get_mut(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no B-tree index named {name}")))?;
        Ok(tree.delete(key))
    }

    // -- Hash index registry -----------------------------------------------

    pub fn create_hash_index(&self, name: impl Into<String>) {
        let buckets = self.config.engine.hash_buckets;
        self.hash_indexes
            .lock()
            .entry(name.into())
            .or_insert_with(|| HashIndex::new(buckets));
    }

    pub fn hash_insert(&self, name: &str, key: Vec<u8>, value: u64) -> Result<()> {
        check_key_size(&key)?;
        let mut indexes = self.hash_indexes.lock();
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no hash index named {name}")))?;
        index.insert(key, value);
        Ok(())
    }

    pub fn hash_search(&self, name: &str, key: &[u8]) -> Result<Option<u64>> {
        let indexes = self.hash_indexes.lock();
        let index = indexes
            .get(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no hash index named {name}")))?;
        Ok(index.search(key))
    }

    pub fn hash_delete(&self, name: &str, key: &[u8]) -> Result<bool> {
        let mut indexes = self.hash_indexes.lock();
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no hash index named {name}")))?;
        Ok(index.delete(key))
    }

    // -- Bloom filter registry ----------------------------------------------

    pub fn create_bloom_filter(&self, name: impl Into<String>) {
        let bits = self.config.engine.bloom_bits;
        let hashes = self.config.engine.bloom_hashes;
        self.bloom_filters
            .lock()
            .entry(name.into())
            .or_insert_with(|| BloomFilter::new(bits, hashes));
    }

    pub fn bloom_insert(&self, name: &str, key: &[u8]) -> Result<()> {
        check_key_size(key)?;
        let mut filters = self.bloom_filters.lock();
        let filter = filters
            .get_mut(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no bloom filter named {name}")))?;
        filter.insert(key);
        Ok(())
    }

    pub fn bloom_might_contain(&self, name: &str, key: &[u8]) -> Result<bool> {
        let filters = self.bloom_filters.lock();
        let filter = filters
            .get(name)
            .ok_or_else(|| StorageError::invalid_operation(format!("no bloom filter named {name}")))?;
        Ok(filter.might_contain(key))
    }

    // -- Diagnostics ----------------------------------------------------------

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            page_count: self.buffer_pool.page_count(),
            buffer_pool_capacity: self.buffer_pool.capacity(),
            btree_count: self.btrees.lock().len(),
            hash_index_count: self.hash_indexes.lock().len(),
            bloom_filter_count: self.bloom_filters.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn handle() -> (tempfile::TempDir, StorageHandle) {
        let dir = tempdir().unwrap();
        let handle = StorageHandle::init(Config::new(dir.path())).unwrap();
        (dir, handle)
    }

    #[test]
    fn page_round_trips_through_put_and_get() -> Result<()> {
        let (_dir, handle) = handle();

        let (page_id, guard) = handle.new_page()?.unwrap();
        handle.put_page(&guard, |p| p.add_tuple(b"hello").unwrap())?;
        handle.flush_page(page_id)?;
        handle.release_page(page_id);

        let guard = handle.get_page(page_id)?.unwrap();
        let tuple = handle.read_page(&guard, |p| p.get_tuple(0).map(|t| t.to_vec()))?;
        assert_eq!(tuple, Some(b"hello".to_vec()));
        Ok(())
    }

    #[test]
    fn checkpoint_appends_a_trailing_checkpoint_record() -> Result<()> {
        let (_dir, handle) = handle();

        let (page_id, guard) = handle.new_page()?.unwrap();
        handle.put_page(&guard, |p| p.add_tuple(b"row").unwrap())?;
        let lsn = handle.wal_append(WalRecord::new(1, 0, WalRecordType::Insert, b"row".to_vec()))?;
        handle.checkpoint()?;
        handle.release_page(page_id);

        let mut replayed = vec![];
        handle.wal_replay(|r| replayed.push((r.lsn, r.record_type)))?;
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0], (lsn, WalRecordType::Insert));
        assert_eq!(replayed[1].1, WalRecordType::Checkpoint);
        Ok(())
    }

    #[test]
    fn btree_index_is_accessible_through_the_handle() -> Result<()> {
        let (_dir, handle) = handle();
        handle.create_btree("by_name");
        handle.btree_insert("by_name", b"alice".to_vec(), 1)?;
        assert_eq!(handle.btree_search("by_name", b"alice")?, Some(1));
        assert!(handle.btree_delete("by_name", b"alice")?);
        assert_eq!(handle.btree_search("by_name", b"alice")?, None);
        Ok(())
    }

    #[test]
    fn hash_and_bloom_indexes_are_accessible_through_the_handle() -> Result<()> {
        let (_dir, handle) = handle();
        handle.create_hash_index("by_id");
        handle.hash_insert("by_id", b"42".to_vec(), 7)?;
        assert_eq!(handle.hash_search("by_id", b"42")?, Some(7));

        handle.create_bloom_filter("seen_ids");
        handle.bloom_insert("seen_ids", b"42")?;
        assert!(handle.bloom_might_contain("seen_ids", b"42")?);
        Ok(())
    }

    #[test]
    fn next_row_id_is_monotonic_per_handle() -> Result<()> {
        let (_dir, handle) = handle();
        assert_eq!(handle.next_row_id(), 0);
        assert_eq!(handle.next_row_id(), 1);
        assert_eq!(handle.next_row_id(), 2);
        Ok(())
    }

    #[test]
    fn arena_round_trips_and_resets() -> Result<()> {
        let (_dir, handle) = handle();
        assert_eq!(handle.arena_alloc(4), Some(vec![0u8; 4]));
        handle.arena_reset();
        assert_eq!(handle.arena_alloc(4), Some(vec![0u8; 4]));
        Ok(())
    }

    #[test]
    fn missing_index_name_is_an_error() -> Result<()> {
        let (_dir, handle) = handle();
        assert!(handle.btree_search("nope", b"k").is_err());
        Ok(())
    }

    #[test]
    fn oversized_key_is_rejected_by_every_index() -> Result<()> {
        let (_dir, handle) = handle();
        let huge_key = vec![0u8; types::MAX_KEY_SIZE + 1];

        handle.create_btree("t");
        assert!(matches!(
            handle.btree_insert("t", huge_key.clone(), 1),
            Err(StorageError::KeyTooLarge { .. })
        ));

        handle.create_hash_index("h");
        assert!(matches!(
            handle.hash_insert("h", huge_key.clone(), 1),
            Err(StorageError::KeyTooLarge { .. })
        ));

        handle.create_bloom_filter("b");
        assert!(matches!(
            handle.bloom_insert("b", &huge_key),
            Err(StorageError::KeyTooLarge { .. })
        ));
        Ok(())
    }
}
