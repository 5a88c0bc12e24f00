//! End-to-end tests driving `StorageHandle` the way a catalog layer would:
//! open a directory, mutate pages and the WAL, close, and reopen.

use minsql_storage::{Config, Result, StorageHandle, WalRecord, WalRecordType};
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn page_crud_survives_a_close_and_reopen() -> Result<()> {
    init_logging();
    let dir = tempdir().unwrap();

    {
        let handle = StorageHandle::init(Config::new(dir.path()))?;

        let (page0, guard) = handle.new_page()?.unwrap();
        assert_eq!(page0.value(), 0);
        let slot0 = handle.put_page(&guard, |p| p.add_tuple(b"hello").unwrap())?;
        let slot1 = handle.put_page(&guard, |p| p.add_tuple(b"world!").unwrap())?;
        assert_eq!(slot0, 0);
        assert_eq!(slot1, 1);

        handle.put_page(&guard, |p| p.delete_tuple(0).unwrap())?;
        handle.flush_page(page0)?;
        handle.release_page(page0);
    }

    let handle = StorageHandle::init(Config::new(dir.path()))?;
    let guard = handle.get_page(minsql_storage::PageId::new(0))?.unwrap();
    let tuple0 = handle.read_page(&guard, |p| p.get_tuple(0).map(|t| t.to_vec()))?;
    let tuple1 = handle.read_page(&guard, |p| p.get_tuple(1).map(|t| t.to_vec()))?;
    assert_eq!(tuple0, None);
    assert_eq!(tuple1, Some(b"world!".to_vec()));

    Ok(())
}

#[test]
fn checkpoint_orders_appended_records_before_the_checkpoint_marker() -> Result<()> {
    init_logging();
    let dir = tempdir().unwrap();
    let handle = StorageHandle::init(Config::new(dir.path()))?;

    let (page0, guard0) = handle.new_page()?.unwrap();
    let (page1, guard1) = handle.new_page()?.unwrap();
    handle.put_page(&guard0, |p| p.add_tuple(b"a").unwrap())?;
    handle.put_page(&guard1, |p| p.add_tuple(b"b").unwrap())?;

    let lsn0 = handle.wal_append(WalRecord::new(1, 0, WalRecordType::Insert, b"a".to_vec()))?;
    let lsn1 = handle.wal_append(WalRecord::new(1, 1, WalRecordType::Insert, b"b".to_vec()))?;

    handle.checkpoint()?;
    handle.release_page(page0);
    handle.release_page(page1);

    let mut seen = vec![];
    handle.wal_replay(|r| seen.push((r.lsn, r.record_type)))?;

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], (lsn0, WalRecordType::Insert));
    assert_eq!(seen[1], (lsn1, WalRecordType::Insert));
    assert_eq!(seen[2].1, WalRecordType::Checkpoint);
    Ok(())
}
