//! Bump allocator over a single anonymous private mapping. No growth, no
//! individual free — only bulk `reset`.

use crate::types::DEFAULT_ARENA_CAPACITY;
use memmap2::MmapMut;

/// Round `size` up to the next multiple of 8.
fn align8(size: usize) -> usize {
    (size + 7) & !7
}

/// Arena allocator. Not `Send`/`Sync`: callers serialize externally, per the
/// per-request use this type is designed for.
pub struct Arena {
    map: MmapMut,
    capacity: usize,
    offset: usize,
}

impl Arena {
    /// Create an arena with the given capacity, or the default (16 MiB) if
    /// `capacity` is 0.
    pub fn new(capacity: usize) -> std::io::Result<Self> {
        let capacity = if capacity == 0 {
            DEFAULT_ARENA_CAPACITY
        } else {
            capacity
        };
        let map = MmapMut::map_anon(capacity)?;
        Ok(Self {
            map,
            capacity,
            offset: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.offset
    }

    /// Bump-allocate `size` bytes, 8-byte aligned. Returns `None` if the
    /// bump would overrun capacity. The returned slice stays valid until the
    /// next `reset`.
    pub fn alloc(&mut self, size: usize) -> Option<&mut [u8]> {
        let aligned = align8(size);
        if self.offset + aligned > self.capacity {
            return None;
        }
        let start = self.offset;
        self.offset += aligned;
        Some(&mut self.map[start..start + size])
    }

    /// Reset the bump offset to zero, invalidating all outstanding slices
    /// simultaneously (enforced by `alloc` taking `&mut self`).
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
