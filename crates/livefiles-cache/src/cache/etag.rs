//! ETag generation

use std::time::{SystemTime, UNIX_EPOCH};

/// Generates an ETag from modification time and size
///
/// Format: `{mtime_millis_hex}-{size_hex}`. Times before the Unix epoch
/// collapse to `0`.
///
/// # Example
///
/// ```rust
/// use livefiles_cache::cache::generate_etag;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let etag = generate_etag(UNIX_EPOCH + Duration::from_millis(255), 16);
/// assert_eq!(etag, "ff-10");
/// ```
pub fn generate_etag(modified: SystemTime, size: u64) -> String {
	let millis = modified
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or(0);
	format!("{:x}-{:x}", millis, size)
}
