//! On-disk page header: 24 bytes, little-endian.

use crate::types::PAGE_HEADER_SIZE;

/// Fixed 24-byte header prefixing every page.
///
/// Layout (little-endian): `page_id:u32, checksum:u32, lower:u16, upper:u16,
/// special:u16, flags:u16, lsn:u64`. `dirty`/`pin_count` are buffer-pool
/// bookkeeping, never persisted, and so never appear in this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_id: u32,
    pub checksum: u32,
    /// First free offset in the line-pointer array.
    pub lower: u16,
    /// First used offset of the tuple heap (grows downward).
    pub upper: u16,
    pub special: u16,
    pub flags: u16,
    /// LSN of the last WAL record that modified this page.
    pub lsn: u64,
}

impl PageHeader {
    /// Build a freshly allocated page's header: empty, full free space.
    pub fn new_empty(page_id: u32, page_size: usize) -> Self {
        Self {
            page_id,
            checksum: 0,
            lower: PAGE_HEADER_SIZE as u16,
            upper: page_size as u16,
            special: 0,
            flags: 0,
            lsn: 0,
        }
    }

    pub fn read_from(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= PAGE_HEADER_SIZE);
        Self {
            page_id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            checksum: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            lower: u16::from_le_bytes(bytes[8..10].try_into().unwrap()),
            upper: u16::from_le_bytes(bytes[10..12].try_into().unwrap()),
            special: u16::from_le_bytes(bytes[12..14].try_into().unwrap()),
            flags: u16::from_le_bytes(bytes[14..16].try_into().unwrap()),
            lsn: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        }
    }

    pub fn write_to(&self, bytes: &mut [u8]) {
        debug_assert!(bytes.len() >= PAGE_HEADER_SIZE);
        bytes[0..4].copy_from_slice(&self.page_id.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.lower.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.upper.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.special.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.flags.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.lsn.to_le_bytes());
    }

    pub fn free_space(&self) -> usize {
        self.upper.saturating_sub(self.lower) as usize
    }
}
