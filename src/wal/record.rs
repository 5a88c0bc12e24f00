//! WAL record: a 24-byte header followed by `length` payload bytes.

use crate::error::{Result, StorageError};

/// Header size in bytes: lsn(8) + transaction_id(4) + logical_time(8) +
/// type(2) + length(2).
pub const WAL_HEADER_SIZE: usize = 24;

/// Type tag of a WAL record.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalRecordType {
    Insert = 1,
    Update = 2,
    Delete = 3,
    Commit = 4,
    Abort = 5,
    Checkpoint = 6,
}

impl WalRecordType {
    pub fn from_u16(v: u16) -> Result<Self> {
        Ok(match v {
            1 => Self::Insert,
            2 => Self::Update,
            3 => Self::Delete,
            4 => Self::Commit,
            5 => Self::Abort,
            6 => Self::Checkpoint,
            other => return Err(StorageError::corruption(format!("unknown WAL record type {other}"))),
        })
    }
}

/// A single WAL record: header plus opaque payload.
#[derive(Debug, Clone)]
pub struct WalRecord {
    pub lsn: u64,
    pub transaction_id: u32,
    pub logical_time: u64,
    pub record_type: WalRecordType,
    pub payload: Vec<u8>,
}

impl WalRecord {
    pub fn new(
        transaction_id: u32,
        logical_time: u64,
        record_type: WalRecordType,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            lsn: 0,
            transaction_id,
            logical_time,
            record_type,
            payload,
        }
    }

    pub fn encoded_size(&self) -> usize {
        WAL_HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.encoded_size()];
        buf[0..8].copy_from_slice(&self.lsn.to_le_bytes());
        buf[8..12].copy_from_slice(&self.transaction_id.to_le_bytes());
        buf[12..20].copy_from_slice(&self.logical_time.to_le_bytes());
        buf[20..22].copy_from_slice(&(self.record_type as u16).to_le_bytes());
        buf[22..24].copy_from_slice(&(self.payload.len() as u16).to_le_bytes());
        buf[24..].copy_from_slice(&self.payload);
        buf
    }

    /// Decode a record starting at `bytes[0]`. Returns the record and the
    /// number of bytes consumed. `None` if the header claims a length
    /// extending past `bytes`, i.e. a truncated trailing record.
    pub fn decode(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < WAL_HEADER_SIZE {
            return Ok(None);
        }
        let lsn = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let transaction_id = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let logical_time = u64::from_le_bytes(bytes[12..20].try_into().unwrap());
        let type_raw = u16::from_le_bytes(bytes[20..22].try_into().unwrap());
        let length = u16::from_le_bytes(bytes[22..24].try_into().unwrap()) as usize;

        let total = WAL_HEADER_SIZE + length;
        if bytes.len() < total {
            return Ok(None);
        }
        let record_type = WalRecordType::from_u16(type_raw)?;
        let payload = bytes[WAL_HEADER_SIZE..total].to_vec();

        Ok(Some((
            Self {
                lsn,
                transaction_id,
                logical_time,
                record_type,
                payload,
            },
            total,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_bytes() {
        let mut rec = WalRecord::new(1, 0, WalRecordType::Insert, vec![0xAA, 0xBB]);
        rec.lsn = 0;
        let bytes = rec.encode();
        assert_eq!(bytes.len(), WAL_HEADER_SIZE + 2);

        let (decoded, consumed) = WalRecord::decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.lsn, 0);
        assert_eq!(decoded.transaction_id, 1);
        assert_eq!(decoded.record_type, WalRecordType::Insert);
        assert_eq!(decoded.payload, vec![0xAA, 0xBB]);
    }

    #[test]
    fn truncated_tail_decodes_as_none() {
        let rec = WalRecord::new(1, 1, WalRecordType::Commit, vec![]);
        let mut bytes = rec.encode();
        bytes.truncate(bytes.len() - 1);
        // Not even a full header in this case (commit has no payload), so
        // decode reports no record rather than erroring.
        let result = WalRecord::decode(&bytes).unwrap();
        assert!(result.is_none());
    }
}
