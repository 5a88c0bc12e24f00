//! Write-ahead log: an append-only record stream with an in-memory buffer,
//! group commit via explicit flush, and a replay driver for recovery.

use crate::error::Result;
use crate::wal::record::WalRecord;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

struct WalState {
    file: File,
    buffer: Vec<u8>,
    buffer_pos: usize,
    next_lsn: u64,
}

impl WalState {
    /// Write the buffered bytes out and fsync. No-op if the buffer is empty.
    fn flush_locked(&mut self) -> Result<()> {
        if self.buffer_pos == 0 {
            return Ok(());
        }
        self.file.write_all(&self.buffer[..self.buffer_pos])?;
        self.file.sync_data()?;
        self.buffer_pos = 0;
        Ok(())
    }
}

/// Write-ahead log over `<data_dir>/wal.log`.
pub struct WriteAheadLog {
    state: Mutex<WalState>,
    buffer_capacity: usize,
}

impl WriteAheadLog {
    pub fn open(path: &Path, buffer_capacity: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let next_lsn = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            state: Mutex::new(WalState {
                file,
                buffer: vec![0u8; buffer_capacity],
                buffer_pos: 0,
                next_lsn,
            }),
            buffer_capacity,
        })
    }

    /// Append a record, assigning it the next LSN. Buffers it in memory;
    /// durability requires a subsequent `flush`. Returns the assigned LSN.
    pub fn append(&self, mut record: WalRecord) -> Result<u64> {
        let mut state = self.state.lock();
        let entry_size = record.encoded_size();

        if state.buffer_pos + entry_size > self.buffer_capacity {
            state.flush_locked()?;
        }

        record.lsn = state.next_lsn;
        let encoded = record.encode();

        if encoded.len() > self.buffer_capacity {
            // Record larger than the whole buffer: bypass buffering, write
            // and sync it directly so out-of-band records still append in
            // LSN order.
            state.file.write_all(&encoded)?;
            state.file.sync_data()?;
        } else {
            let pos = state.buffer_pos;
            state.buffer[pos..pos + encoded.len()].copy_from_slice(&encoded);
            state.buffer_pos += encoded.len();
        }

        state.next_lsn += entry_size as u64;
        log::trace!("wal: appended record at lsn {}", record.lsn);
        Ok(record.lsn)
    }

    /// Flush the in-memory buffer and fsync. Every record appended before
    /// this call returns is durable.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.flush_locked()?;
        log::debug!("wal: flushed to lsn {}", state.next_lsn);
        Ok(())
    }

    /// Replay the on-disk log from the start, dispatching each well-formed
    /// record to `redo`. A truncated trailing record stops replay without
    /// error.
    pub fn replay(&self, mut redo: impl FnMut(&WalRecord)) -> Result<()> {
        let mut state = self.state.lock();
        let file_size = state.file.seek(SeekFrom::End(0))?;
        if file_size == 0 {
            return Ok(());
        }

        state.file.seek(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; file_size as usize];
        state.file.read_exact(&mut buf)?;

        let mut offset = 0usize;
        while offset < buf.len() {
            match WalRecord::decode(&buf[offset..])? {
                Some((record, consumed)) => {
                    redo(&record);
                    offset += consumed;
                }
                None => break, // truncated trailing record: benign
            }
        }

        Ok(())
    }
}
