//! # livefiles-cache
//!
//! Live-updating, precompressed static file cache.
//!
//! At construction the served root is crawled once and every file is read,
//! passed through a content transform and gzipped into an immutable
//! [`CacheEntry`]. A background reconciliation loop then consumes filesystem
//! notifications and keeps the cache consistent with the disk while any
//! number of threads serve lookups.
//!
//! ## Features
//!
//! - **Precompression**: entries hold the gzip body plus content metadata
//!   (MIME type, sizes, ETag) and render their own response headers
//! - **Concurrent lookups**: sharded store with atomic per-route publish
//! - **Redirects**: a directory route without its trailing `/` yields a 301
//! - **Live updates**: create, modify, delete and rename are applied within
//!   one bounded wait; new directories are watched without restart
//! - **Pluggable notifications**: native `notify` backends, polling, or any
//!   [`WatchService`](watch::WatchService) implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livefiles_cache::{LiveFilesConfig, LocalFiles, Lookup};
//! use std::time::Duration;
//!
//! let config = LiveFilesConfig::new("public")
//!     .with_index_file("index.html")
//!     .with_poll_timeout(Duration::from_secs(1));
//!
//! let files = LocalFiles::new(config)?;
//! files.start()?;
//!
//! if let Lookup::Found(entry) = files.get_file("/") {
//!     let headers = entry.headers();
//!     let body = entry.body().clone();
//!     // hand headers and body to the HTTP layer
//! }
//!
//! files.shutdown();
//! # Ok::<(), livefiles_cache::LiveFilesError>(())
//! ```
//!
//! ## Module Structure
//!
//! - [`config`] - Configuration
//! - [`cache`] - Entries, the concurrent store and statistics
//! - [`compression`] - Crawling, content transform and entry building
//! - [`watch`] - Notification facility and directory registrar
//! - [`reconcile`] - The background reconciliation loop
//! - [`local_files`] - Lifecycle and serving surface
//! - [`route`] - Route path helpers
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod local_files;
pub mod reconcile;
pub mod route;
pub mod watch;

pub use cache::{CacheEntry, CacheStatistics, CacheStore, ContentMetadata, Lookup, Redirect};
pub use compression::{ContentTransform, CrawlResult, Identity, ResponseBuilder, TreeCrawler};
pub use config::{LiveFilesConfig, OverflowPolicy, WatchBackend};
pub use error::{LiveFilesError, Result};
pub use local_files::{LocalFiles, LocalFilesBuilder};
pub use reconcile::{LoopState, ReconcileLoop};
pub use watch::{NotifyWatchService, WatchBatch, WatchEvent, WatchEventKind, WatchHandle, WatchRegistrar, WatchService};
