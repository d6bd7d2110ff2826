//! Turning files on disk into cache entries
//!
//! - [`scanner`] - one-shot recursive crawl of the served tree
//! - [`transform`] - content transform applied before compression
//! - [`builder`] - read, transform, gzip, and wrap as a [`CacheEntry`](crate::CacheEntry)

pub mod builder;
pub mod scanner;
pub mod transform;

pub use builder::ResponseBuilder;
pub use scanner::{CrawlResult, TreeCrawler};
pub use transform::{ContentTransform, Identity};
