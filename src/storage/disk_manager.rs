//! Page manager: owns `<data_dir>/pages.dat`, a flat concatenation of
//! fixed-size pages addressable by `page_id · PAGE_SIZE`.

use crate::error::{Result, StorageError};
use crate::page::Page;
use crate::types::{PageId, PAGE_SIZE};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Trait for page I/O, so the buffer pool can be tested against a mock.
pub trait DiskManager: Send + Sync {
    fn read(&self, page_id: PageId) -> Result<Page>;
    fn write(&self, page: &mut Page) -> Result<()>;
    fn alloc(&self) -> Result<Page>;
    fn num_pages(&self) -> u32;
}

/// File-backed page manager over `pages.dat`.
pub struct DiskManagerImpl {
    file: Mutex<File>,
    num_pages: Mutex<u32>,
}

impl DiskManagerImpl {
    /// Open or create `<data_dir>/pages.dat`, deriving `num_pages` from the
    /// file's current size.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let num_pages = (len / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file: Mutex::new(file),
            num_pages: Mutex::new(num_pages),
        })
    }
}

impl DiskManager for DiskManagerImpl {
    fn read(&self, page_id: PageId) -> Result<Page> {
        if page_id.value() >= self.num_pages() {
            return Err(StorageError::PageNotFound(page_id));
        }

        let offset = page_id.file_offset(PAGE_SIZE);
        let mut buf = vec![0u8; PAGE_SIZE];

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;

        log::trace!("page manager: read page {}", page_id);
        Page::from_bytes(&buf)
    }

    fn write(&self, page: &mut Page) -> Result<()> {
        let page_id = page.page_id();
        let offset = page_id.file_offset(PAGE_SIZE);
        let bytes = page.as_bytes().to_vec();

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        file.sync_data()?;

        log::trace!("page manager: wrote page {}", page_id);
        Ok(())
    }

    fn alloc(&self) -> Result<Page> {
        let mut num_pages = self.num_pages.lock();
        let page_id = PageId::new(*num_pages);
        let mut page = Page::new_empty(page_id);

        let offset = page_id.file_offset(PAGE_SIZE);
        let bytes = page.as_bytes().to_vec();

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        drop(file);

        *num_pages += 1;
        log::debug!("page manager: allocated page {}", page_id);
        Ok(page)
    }

    fn num_pages(&self) -> u32 {
        *self.num_pages.lock()
    }
}
