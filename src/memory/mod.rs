//! Transient request-scoped memory: the bump-allocator arena.

mod arena;

pub use arena::Arena;
