//! Storage layer: page manager I/O over `pages.dat`.

mod disk_manager;

pub use disk_manager::{DiskManager, DiskManagerImpl};
