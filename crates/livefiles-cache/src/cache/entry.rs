//! Cache entry and content metadata

use super::etag::generate_etag;
use bytes::Bytes;
use flate2::read::GzDecoder;
use http::header::{
	CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, HeaderValue, VARY,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Encoding of every cached body
pub const CONTENT_ENCODING_GZIP: &str = "gzip";

/// Metadata describing a cached file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
	/// MIME type guessed from the file extension
	pub mime_type: String,

	/// Size of the transformed content before compression
	pub original_size: u64,

	/// Size of the compressed body
	pub compressed_size: u64,

	/// File modification time at build time
	pub modified: SystemTime,

	/// ETag for conditional requests
	pub etag: String,
}

impl ContentMetadata {
	/// Creates metadata for content read from `path`
	///
	/// # Example
	///
	/// ```rust
	/// use livefiles_cache::cache::ContentMetadata;
	/// use std::path::Path;
	/// use std::time::SystemTime;
	///
	/// let meta = ContentMetadata::new(Path::new("site.css"), 120, 40, SystemTime::now());
	/// assert_eq!(meta.mime_type, "text/css");
	/// ```
	pub fn new(path: &Path, original_size: u64, compressed_size: u64, modified: SystemTime) -> Self {
		let mime_type = mime_guess::from_path(path)
			.first_or_octet_stream()
			.to_string();

		Self {
			mime_type,
			original_size,
			compressed_size,
			modified,
			etag: generate_etag(modified, original_size),
		}
	}
}

/// Immutable, precompressed representation of one file
///
/// Created by [`ResponseBuilder`](crate::ResponseBuilder) and never mutated;
/// a modification replaces the whole entry in the store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
	route: String,
	source: PathBuf,
	body: Bytes,
	metadata: ContentMetadata,
}

impl CacheEntry {
	/// Assembles an entry from an already compressed body
	pub fn new(route: String, source: PathBuf, body: Bytes, metadata: ContentMetadata) -> Self {
		Self {
			route,
			source,
			body,
			metadata,
		}
	}

	/// Route the entry is stored under
	pub fn route(&self) -> &str {
		&self.route
	}

	/// File the entry was built from
	pub fn source(&self) -> &Path {
		&self.source
	}

	/// gzip-compressed body
	pub fn body(&self) -> &Bytes {
		&self.body
	}

	/// Content metadata
	pub fn metadata(&self) -> &ContentMetadata {
		&self.metadata
	}

	/// Content encoding of [`body`](Self::body)
	pub fn content_encoding(&self) -> &'static str {
		CONTENT_ENCODING_GZIP
	}

	/// Inflates the body back to the transformed file content
	pub fn decompress(&self) -> io::Result<Vec<u8>> {
		let mut decoder = GzDecoder::new(self.body.as_ref());
		let mut content = Vec::with_capacity(self.metadata.original_size as usize);
		decoder.read_to_end(&mut content)?;
		Ok(content)
	}

	/// Response headers describing the entry
	///
	/// Values that cannot be represented as header values are skipped.
	pub fn headers(&self) -> HeaderMap {
		let mut headers = HeaderMap::new();
		if let Ok(value) = HeaderValue::from_str(&self.metadata.mime_type) {
			headers.insert(CONTENT_TYPE, value);
		}
		headers.insert(
			CONTENT_ENCODING,
			HeaderValue::from_static(CONTENT_ENCODING_GZIP),
		);
		headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len() as u64));
		if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", self.metadata.etag)) {
			headers.insert(ETAG, value);
		}
		headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
		headers
	}
}
