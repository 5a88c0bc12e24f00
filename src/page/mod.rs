//! Page layer: fixed-size pages with a 24-byte header and a slotted tuple
//! payload. Line pointers grow forward from the header; tuple bodies grow
//! backward from the end of the page.

mod header;
mod slotted;

pub use header::PageHeader;
pub use slotted::{LinePointer, Page};
