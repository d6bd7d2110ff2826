//! Tree crawler run once at startup and on directory rescans

use crate::config::LiveFilesConfig;
use crate::error::{LiveFilesError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regular files and directories found below a root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
	/// Regular files, recursively
	pub files: Vec<PathBuf>,
	/// Directories, recursively, including the crawled root
	pub directories: Vec<PathBuf>,
}

/// Recursive directory walker
#[derive(Debug, Clone)]
pub struct TreeCrawler {
	/// Follow symbolic links (loops are detected and skipped)
	follow_symlinks: bool,
	/// Depth guard below the crawled root
	max_depth: usize,
}

impl TreeCrawler {
	/// Creates a crawler
	///
	/// # Example
	///
	/// ```rust
	/// use livefiles_cache::TreeCrawler;
	///
	/// let crawler = TreeCrawler::new(false, 32);
	/// ```
	pub fn new(follow_symlinks: bool, max_depth: usize) -> Self {
		Self {
			follow_symlinks,
			max_depth,
		}
	}

	/// Creates a crawler from configuration
	pub fn from_config(config: &LiveFilesConfig) -> Self {
		Self::new(config.follow_symlinks, config.max_depth)
	}

	/// Returns `true` if symbolic links are followed
	pub fn follows_symlinks(&self) -> bool {
		self.follow_symlinks
	}

	/// Crawls `root`
	///
	/// An unreadable subdirectory is logged and left out together with its
	/// subtree; only an unreadable `root` is an error.
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::RootUnavailable`] if `root` cannot be listed.
	pub fn crawl(&self, root: &Path) -> Result<CrawlResult> {
		self.walk(root, self.max_depth)
	}

	/// Crawls `directory`, a descendant of `root`, counting the depth guard
	/// from `root`
	///
	/// A directory already past the guard yields an empty result.
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::OutsideRoot`] if `directory` is not below
	/// `root`, and [`LiveFilesError::RootUnavailable`] if it cannot be listed.
	pub fn crawl_below(&self, root: &Path, directory: &Path) -> Result<CrawlResult> {
		let depth = directory
			.strip_prefix(root)
			.map_err(|_| LiveFilesError::OutsideRoot(directory.to_path_buf()))?
			.components()
			.count();

		match self.max_depth.checked_sub(depth) {
			Some(remaining) => self.walk(directory, remaining),
			None => {
				tracing::debug!(path = %directory.display(), depth, "directory beyond depth guard");
				Ok(CrawlResult::default())
			}
		}
	}

	fn walk(&self, root: &Path, max_depth: usize) -> Result<CrawlResult> {
		fs::read_dir(root).map_err(|source| LiveFilesError::RootUnavailable {
			path: root.to_path_buf(),
			source,
		})?;

		let mut result = CrawlResult::default();
		let mut unreadable: HashSet<PathBuf> = HashSet::new();

		let walker = WalkDir::new(root)
			.follow_links(self.follow_symlinks)
			.max_depth(max_depth);

		for entry in walker {
			let entry = match entry {
				Ok(entry) => entry,
				Err(err) => {
					if let Some(path) = err.path() {
						tracing::warn!(path = %path.display(), error = %err, "skipping unreadable subtree");
						unreadable.insert(path.to_path_buf());
					} else {
						tracing::warn!(error = %err, "skipping unreadable entry");
					}
					continue;
				}
			};

			let file_type = entry.file_type();
			if file_type.is_dir() {
				result.directories.push(entry.into_path());
			} else if file_type.is_file() {
				result.files.push(entry.into_path());
			}
		}

		if !unreadable.is_empty() {
			result.directories.retain(|dir| !unreadable.contains(dir));
		}

		tracing::debug!(
			root = %root.display(),
			files = result.files.len(),
			directories = result.directories.len(),
			"crawl finished"
		);
		Ok(result)
	}
}
