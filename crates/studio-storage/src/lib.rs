//! Object storage for rendered media.
//!
//! This crate provides:
//! - The `ObjectStore` trait used by workers to publish media
//! - A Cloudflare R2 implementation over the S3 API
//! - An in-memory implementation for tests and local runs
//! - Organization-scoped object key helpers

pub mod error;
pub mod key;
pub mod memory;
pub mod r2;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use key::{content_type_for, object_key, MediaCategory};
pub use memory::{MemoryObjectStore, StoredObject};
pub use r2::{R2Client, R2Config};
pub use store::ObjectStore;
