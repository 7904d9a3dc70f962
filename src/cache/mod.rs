//! Cache-aside storage for upstream proxy responses.
//!
//! - [`CacheStore`] is the document-store seam ([`MongoCacheStore`], [`MemoryCacheStore`]).
//! - [`CacheAccessor`] adds TTL semantics and turns store faults into cache misses.

/// Cache-aside accessor.
pub mod accessor;
/// Cache error types.
pub mod error;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
pub mod mongo;
/// Store trait.
pub mod store;
/// Entry + status types.
pub mod types;

#[cfg(test)]
mod tests;

pub use accessor::CacheAccessor;
pub use error::{CacheError, CacheResult};
pub use memory::MemoryCacheStore;
pub use mongo::MongoCacheStore;
pub use store::CacheStore;
pub use types::{CacheEntry, CacheStatus};

#[cfg(any(test, feature = "mock"))]
pub use store::FailingCacheStore;
