//! Builds precompressed cache entries from files

use super::transform::{ContentTransform, Identity};
use crate::cache::{CacheEntry, ContentMetadata};
use crate::error::{LiveFilesError, Result};
use crate::route::route_for;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Reads a file, applies the content transform and gzips the result
#[derive(Clone)]
pub struct ResponseBuilder {
	root: PathBuf,
	transform: Arc<dyn ContentTransform>,
	level: Compression,
}

impl ResponseBuilder {
	/// Creates a builder for files below `root` using the identity transform
	///
	/// # Example
	///
	/// ```rust,no_run
	/// use livefiles_cache::ResponseBuilder;
	/// use std::path::Path;
	///
	/// let builder = ResponseBuilder::new("/srv/www");
	/// let entry = builder.build(Path::new("/srv/www/index.html"))?;
	/// assert_eq!(entry.route(), "/index.html");
	/// # Ok::<(), livefiles_cache::LiveFilesError>(())
	/// ```
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			transform: Arc::new(Identity),
			level: Compression::default(),
		}
	}

	/// Replaces the content transform
	pub fn with_transform(mut self, transform: Arc<dyn ContentTransform>) -> Self {
		self.transform = transform;
		self
	}

	/// Sets the gzip level (clamped to 9)
	pub fn with_compression_level(mut self, level: u32) -> Self {
		self.level = Compression::new(level.min(9));
		self
	}

	/// Served root
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Builds the entry for `path`
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::OutsideRoot`] for paths outside the root and
	/// [`LiveFilesError::Io`] when the file cannot be read or compressed.
	pub fn build(&self, path: &Path) -> Result<CacheEntry> {
		let route = route_for(&self.root, path)?;

		let content = fs::read(path).map_err(|e| LiveFilesError::io(path, e))?;
		let modified = fs::metadata(path)
			.and_then(|meta| meta.modified())
			.unwrap_or_else(|_| SystemTime::now());

		let content = self.transform.apply(path, content);

		let mut encoder = GzEncoder::new(Vec::with_capacity(content.len() / 2), self.level);
		encoder
			.write_all(&content)
			.map_err(|e| LiveFilesError::io(path, e))?;
		let body = encoder.finish().map_err(|e| LiveFilesError::io(path, e))?;

		let metadata = ContentMetadata::new(
			path,
			content.len() as u64,
			body.len() as u64,
			modified,
		);

		Ok(CacheEntry::new(
			route,
			path.to_path_buf(),
			Bytes::from(body),
			metadata,
		))
	}
}

impl std::fmt::Debug for ResponseBuilder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResponseBuilder")
			.field("root", &self.root)
			.field("level", &self.level)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use tempfile::TempDir;

	#[rstest]
	fn test_build_round_trips_content() {
		// Arrange
		let temp_dir = TempDir::new().unwrap();
		let file_path = temp_dir.path().join("app.js");
		fs::write(&file_path, "console.log('test');".repeat(50)).unwrap();
		let builder = ResponseBuilder::new(temp_dir.path());

		// Act
		let entry = builder.build(&file_path).unwrap();

		// Assert
		assert_eq!(entry.route(), "/app.js");
		assert_eq!(entry.source(), file_path.as_path());
		assert_eq!(
			entry.decompress().unwrap(),
			"console.log('test');".repeat(50).into_bytes()
		);
		assert_eq!(entry.metadata().original_size, 1000);
		assert!(entry.metadata().compressed_size < 1000);
		assert!(entry.metadata().mime_type.contains("javascript"));
	}

	#[rstest]
	fn test_build_applies_transform() {
		let temp_dir = TempDir::new().unwrap();
		let file_path = temp_dir.path().join("index.html");
		fs::write(&file_path, "<p>{{name}}</p>").unwrap();
		let builder = ResponseBuilder::new(temp_dir.path()).with_transform(Arc::new(
			|_: &Path, content: Vec<u8>| {
				String::from_utf8_lossy(&content)
					.replace("{{name}}", "go")
					.into_bytes()
			},
		));

		let entry = builder.build(&file_path).unwrap();

		assert_eq!(entry.decompress().unwrap(), b"<p>go</p>");
		assert_eq!(entry.metadata().original_size, 9);
	}

	#[rstest]
	fn test_build_missing_file_is_io_error() {
		let temp_dir = TempDir::new().unwrap();
		let builder = ResponseBuilder::new(temp_dir.path());

		let result = builder.build(&temp_dir.path().join("gone.css"));

		assert!(matches!(result, Err(LiveFilesError::Io { .. })));
	}

	#[rstest]
	fn test_build_outside_root() {
		let root = TempDir::new().unwrap();
		let other = TempDir::new().unwrap();
		let file_path = other.path().join("x.txt");
		fs::write(&file_path, "x").unwrap();

		let result = ResponseBuilder::new(root.path()).build(&file_path);

		assert!(matches!(result, Err(LiveFilesError::OutsideRoot(_))));
	}

	#[rstest]
	fn test_compression_level_zero_still_gzip() {
		let temp_dir = TempDir::new().unwrap();
		let file_path = temp_dir.path().join("a.txt");
		fs::write(&file_path, "aaaa").unwrap();

		let entry = ResponseBuilder::new(temp_dir.path())
			.with_compression_level(0)
			.build(&file_path)
			.unwrap();

		assert_eq!(&entry.body()[..2], &[0x1f, 0x8b]);
		assert_eq!(entry.decompress().unwrap(), b"aaaa");
	}
}
