//! Write-ahead log: typed records, group commit, and replay.

mod log;
mod record;

pub use log::WriteAheadLog;
pub use record::{WalRecord, WalRecordType, WAL_HEADER_SIZE};
