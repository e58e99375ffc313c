//! Persistence for organizations, articles, submissions and generated media.
//!
//! The `Store` trait is the seam between the pipeline and whatever database
//! backs it. Every write to a state-machine row is conditional on the
//! version the writer read, so concurrent workers and webhook handlers can
//! never blindly overwrite each other.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::Store;
