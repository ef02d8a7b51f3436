//! Content-addressed record storage for the NataCoin record engine.
//!
//! Every record payload (proposal, property record, ...) is stored as an
//! immutable byte string identified by its domain-separated BLAKE3 hash.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileContentStore`] -- one file per record under a root directory
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; there is no update or delete.
//! 2. A failed `put` leaves nothing behind.
//! 3. An identifier already bound to different bytes is never rebound.
//! 4. The store never interprets payloads -- it is a pure key-value store.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileContentStore;
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
