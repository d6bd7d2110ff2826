//! # livefiles
//!
//! Live-updating, precompressed static file cache.
//!
//! A root directory is crawled once, every file is transformed and gzipped
//! into a ready-to-send entry, and a background reconciliation loop keeps
//! the cache consistent with filesystem changes while request handlers read
//! from it concurrently.
//!
//! This crate re-exports [`livefiles_cache`] and adds a [`prelude`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livefiles::prelude::*;
//!
//! let files = LocalFiles::new(LiveFilesConfig::new("public"))?;
//! files.start()?;
//!
//! match files.get_file("/") {
//!     Lookup::Found(entry) => println!("{} gzip bytes", entry.body().len()),
//!     Lookup::Redirect(redirect) => println!("{} {}", redirect.status(), redirect.location),
//!     Lookup::NotFound => println!("404"),
//! }
//!
//! files.shutdown();
//! # Ok::<(), livefiles::LiveFilesError>(())
//! ```

#![warn(missing_docs)]

pub use livefiles_cache::*;

/// Commonly used types
pub mod prelude {
	pub use crate::{
		CacheEntry, CacheStatistics, CacheStore, ContentTransform, LiveFilesConfig, LiveFilesError,
		LocalFiles, LoopState, Lookup, OverflowPolicy, Redirect, Result, WatchBackend,
	};
}
