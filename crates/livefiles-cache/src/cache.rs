//! Cache entries and the concurrent cache store
//!
//! Entries are immutable and published as `Arc`s, so a reader either sees the
//! previous entry for a route or the complete new one.

pub mod entry;
pub mod etag;
pub mod statistics;
pub mod store;

pub use entry::{CacheEntry, ContentMetadata};
pub use etag::generate_etag;
pub use statistics::CacheStatistics;
pub use store::{CacheStore, Lookup, Redirect};
