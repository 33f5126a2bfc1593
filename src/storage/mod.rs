//! Storage backends
//!
//! Production engines live outside this crate and implement
//! [`Storer`](crate::resource::Storer). The in-memory backend is the
//! reference implementation of that contract.

mod memory;

pub use memory::MemoryStorer;
