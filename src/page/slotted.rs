//! Slotted page: a line-pointer array grows forward from the header while
//! tuple bodies grow backward from the end of the page. Free space is the
//! gap in between (`upper - lower`).
//!
//! ```text
//! ┌────────────┬──────────────────────┬───────────────────────┐
//! │   header   │  line pointers  →    │   ← tuple bodies       │
//! └────────────┴──────────────────────┴───────────────────────┘
//! ```

use crate::error::{Result, StorageError};
use crate::page::PageHeader;
use crate::types::{PageId, LINE_POINTER_SIZE, MAX_VALUE_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE};

/// Tombstone bit within a line pointer's flags.
const FLAG_DELETED: u16 = 0x0001;

/// A fixed-size entry in the line-pointer array: `{offset, length, flags}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePointer {
    pub offset: u16,
    pub length: u16,
    pub flags: u16,
}

impl LinePointer {
    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    fn read_from(bytes: &[u8]) -> Self {
        Self {
            offset: u16::from_le_bytes([bytes[0], bytes[1]]),
            length: u16::from_le_bytes([bytes[2], bytes[3]]),
            flags: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[0..2].copy_from_slice(&self.offset.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.length.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.flags.to_le_bytes());
    }
}

/// A fixed-size (`PAGE_SIZE`) page: 24-byte header plus a slotted payload of
/// generic byte-string tuples.
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    header: PageHeader,
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            header: self.header,
        }
    }
}

impl Page {
    /// Build a freshly allocated, empty page with full free space.
    pub fn new_empty(page_id: PageId) -> Self {
        let header = PageHeader::new_empty(page_id.value(), PAGE_SIZE);
        let mut data = Box::new([0u8; PAGE_SIZE]);
        header.write_to(data.as_mut_slice());
        Self { data, header }
    }

    /// Load a page from exactly `PAGE_SIZE` on-disk bytes, verifying its
    /// checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(StorageError::invalid_page(format!(
                "expected {} bytes, got {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }
        let header = PageHeader::read_from(bytes);
        let mut data = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(bytes);

        let page = Self { data, header };
        let expected = page.compute_checksum();
        if expected != header.checksum {
            return Err(StorageError::corruption(format!(
                "page {} checksum mismatch: stored {:#x}, computed {:#x}",
                header.page_id, header.checksum, expected
            )));
        }
        Ok(page)
    }

    /// Recompute the checksum and serialize header + payload into
    /// `PAGE_SIZE` bytes ready to write to disk.
    pub fn as_bytes(&mut self) -> &[u8] {
        self.header.checksum = self.compute_checksum();
        self.header.write_to(self.data.as_mut_slice());
        self.data.as_slice()
    }

    /// CRC32C over the header with the checksum field zeroed, followed by
    /// the payload.
    fn compute_checksum(&self) -> u32 {
        let mut header_for_hash = self.header;
        header_for_hash.checksum = 0;
        let mut buf = [0u8; PAGE_HEADER_SIZE];
        header_for_hash.write_to(&mut buf);
        let mut crc = crc32c::crc32c(&buf);
        crc = crc32c::crc32c_append(crc, &self.data[PAGE_HEADER_SIZE..]);
        crc
    }

    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(self.header.page_id)
    }

    pub fn lsn(&self) -> u64 {
        self.header.lsn
    }

    pub fn set_lsn(&mut self, lsn: u64) {
        self.header.lsn = lsn;
    }

    pub fn free_space(&self) -> usize {
        self.header.free_space()
    }

    fn num_slots(&self) -> usize {
        (self.header.lower as usize - PAGE_HEADER_SIZE) / LINE_POINTER_SIZE
    }

    fn line_pointer_offset(index: usize) -> usize {
        PAGE_HEADER_SIZE + index * LINE_POINTER_SIZE
    }

    fn line_pointer(&self, index: usize) -> LinePointer {
        let off = Self::line_pointer_offset(index);
        LinePointer::read_from(&self.data[off..off + LINE_POINTER_SIZE])
    }

    fn set_line_pointer(&mut self, index: usize, lp: LinePointer) {
        let off = Self::line_pointer_offset(index);
        lp.write_to(&mut self.data[off..off + LINE_POINTER_SIZE]);
    }

    /// Append a tuple, writing its bytes into the heap and a new line
    /// pointer into the slot array. Returns the new slot id.
    pub fn add_tuple(&mut self, tuple: &[u8]) -> Result<u16> {
        let size = tuple.len();
        if size > MAX_VALUE_SIZE {
            return Err(StorageError::ValueTooLarge {
                size,
                max: MAX_VALUE_SIZE,
            });
        }
        if self.free_space() < size + LINE_POINTER_SIZE {
            return Err(StorageError::PageFull {
                page_id: self.page_id(),
                needed: size + LINE_POINTER_SIZE,
                available: self.free_space(),
            });
        }

        let slot = self.num_slots() as u16;
        let new_upper = self.header.upper as usize - size;
        self.data[new_upper..new_upper + size].copy_from_slice(tuple);

        self.set_line_pointer(
            slot as usize,
            LinePointer {
                offset: new_upper as u16,
                length: size as u16,
                flags: 0,
            },
        );

        self.header.lower += LINE_POINTER_SIZE as u16;
        self.header.upper = new_upper as u16;
        Ok(slot)
    }

    /// Fetch a tuple's bytes by slot id. Out-of-range or tombstoned slots
    /// return `None`.
    pub fn get_tuple(&self, slot: u16) -> Option<&[u8]> {
        let slot = slot as usize;
        if slot >= self.num_slots() {
            return None;
        }
        let lp = self.line_pointer(slot);
        if lp.is_deleted() {
            return None;
        }
        let start = lp.offset as usize;
        let end = start + lp.length as usize;
        Some(&self.data[start..end])
    }

    /// Tombstone a slot. Slot numbering is preserved; space is reclaimed
    /// only by a separate vacuum concern, out of scope here.
    pub fn delete_tuple(&mut self, slot: u16) -> Result<()> {
        let idx = slot as usize;
        if idx >= self.num_slots() {
            return Err(StorageError::invalid_operation(format!(
                "slot {} out of bounds",
                slot
            )));
        }
        let mut lp = self.line_pointer(idx);
        lp.flags |= FLAG_DELETED;
        self.set_line_pointer(idx, lp);
        Ok(())
    }
}
