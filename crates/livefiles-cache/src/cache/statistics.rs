//! Cache statistics

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
	/// Lookups answered with an entry
	pub hits: u64,
	/// Lookups answered with NotFound
	pub misses: u64,
	/// Lookups answered with a trailing-slash redirect
	pub redirects: u64,
	/// Current number of cached files
	pub entry_count: u64,
	/// Current number of known directories
	pub directory_count: u64,
	/// Sum of compressed body sizes in bytes
	pub compressed_bytes: u64,
	/// Sum of uncompressed content sizes in bytes
	pub original_bytes: u64,
}

impl CacheStatistics {
	/// Total number of lookups
	pub fn total_requests(&self) -> u64 {
		self.hits + self.misses + self.redirects
	}

	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use livefiles_cache::CacheStatistics;
	///
	/// let stats = CacheStatistics { hits: 3, misses: 1, ..Default::default() };
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		let total = self.total_requests();
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Ratio of compressed to original bytes (1.0 when empty)
	pub fn compression_ratio(&self) -> f64 {
		if self.original_bytes == 0 {
			1.0
		} else {
			self.compressed_bytes as f64 / self.original_bytes as f64
		}
	}
}
