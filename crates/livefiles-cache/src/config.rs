//! Configuration for the live file cache

use crate::error::{LiveFilesError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which change-notification backend drives the reconciliation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchBackend {
	/// Platform-native notifications (inotify, FSEvents, ReadDirectoryChangesW)
	#[default]
	Native,
	/// Periodic re-scan of watched directories
	Poll {
		/// Interval between scans in milliseconds
		interval_ms: u64,
	},
}

/// What to do when the notification facility reports lost events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
	/// Log and skip; the cache may lag the disk until the files change again
	Ignore,
	/// Re-crawl the affected directory and reconcile its entries
	#[default]
	Rescan,
}

/// Configuration for [`LocalFiles`](crate::LocalFiles)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveFilesConfig {
	/// Directory whose tree is served
	pub root: PathBuf,

	/// File served when the root route `/` is requested
	pub index_file: String,

	/// Upper bound, in milliseconds, of one wait for notifications.
	/// This is also the shutdown latency of the reconciliation loop.
	pub poll_timeout_ms: u64,

	/// Notification backend
	pub backend: WatchBackend,

	/// Handling of overflow notifications
	pub overflow_policy: OverflowPolicy,

	/// Follow symbolic links while crawling
	pub follow_symlinks: bool,

	/// Maximum crawl depth below the root
	pub max_depth: usize,

	/// gzip level (0-9)
	pub compression_level: u32,

	/// Retry `route + index_file` for routes ending in `/`
	pub serve_directory_index: bool,
}

impl Default for LiveFilesConfig {
	fn default() -> Self {
		Self {
			root: PathBuf::from("public"),
			index_file: "index.html".to_string(),
			poll_timeout_ms: 5_000,
			backend: WatchBackend::Native,
			overflow_policy: OverflowPolicy::Rescan,
			follow_symlinks: false,
			max_depth: 64,
			compression_level: 6,
			serve_directory_index: false,
		}
	}
}

impl LiveFilesConfig {
	/// Creates a configuration serving `root` with default settings
	///
	/// # Example
	///
	/// ```rust
	/// use livefiles_cache::LiveFilesConfig;
	/// use std::time::Duration;
	///
	/// let config = LiveFilesConfig::new("public")
	///     .with_index_file("home.html")
	///     .with_poll_timeout(Duration::from_millis(500));
	/// assert_eq!(config.index_file, "home.html");
	/// ```
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			..Self::default()
		}
	}

	/// Sets the index file name
	pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
		self.index_file = index_file.into();
		self
	}

	/// Sets the bounded wait of the reconciliation loop
	pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
		self.poll_timeout_ms = timeout.as_millis() as u64;
		self
	}

	/// Sets the notification backend
	pub fn with_backend(mut self, backend: WatchBackend) -> Self {
		self.backend = backend;
		self
	}

	/// Sets the overflow policy
	pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
		self.overflow_policy = policy;
		self
	}

	/// Enables or disables following symbolic links
	pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
		self.follow_symlinks = follow;
		self
	}

	/// Sets the maximum crawl depth
	pub fn with_max_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;
		self
	}

	/// Sets the gzip compression level
	pub fn with_compression_level(mut self, level: u32) -> Self {
		self.compression_level = level;
		self
	}

	/// Enables index lookup for routes with a trailing separator
	pub fn with_directory_index(mut self, enable: bool) -> Self {
		self.serve_directory_index = enable;
		self
	}

	/// Bounded wait as a [`Duration`]
	pub fn poll_timeout(&self) -> Duration {
		Duration::from_millis(self.poll_timeout_ms)
	}

	/// Parses a TOML document and validates it
	///
	/// # Example
	///
	/// ```rust
	/// use livefiles_cache::{LiveFilesConfig, OverflowPolicy};
	///
	/// let config = LiveFilesConfig::from_toml_str(r#"
	/// root = "site"
	/// overflow_policy = "ignore"
	/// "#).unwrap();
	/// assert_eq!(config.overflow_policy, OverflowPolicy::Ignore);
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and validates a TOML configuration file
	pub fn from_file(path: &Path) -> Result<Self> {
		let source =
			std::fs::read_to_string(path).map_err(|e| LiveFilesError::io(path, e))?;
		Self::from_toml_str(&source)
	}

	/// Checks the configuration for values the cache cannot work with
	pub fn validate(&self) -> Result<()> {
		if self.index_file.is_empty() {
			return Err(LiveFilesError::InvalidConfig(
				"index_file must not be empty".to_string(),
			));
		}
		if self.index_file.contains('/') || self.index_file.contains('\\') {
			return Err(LiveFilesError::InvalidConfig(format!(
				"index_file must be a bare file name: {}",
				self.index_file
			)));
		}
		if self.compression_level > 9 {
			return Err(LiveFilesError::InvalidConfig(format!(
				"compression_level must be 0-9, got {}",
				self.compression_level
			)));
		}
		if self.poll_timeout_ms == 0 {
			return Err(LiveFilesError::InvalidConfig(
				"poll_timeout_ms must be positive".to_string(),
			));
		}
		if self.max_depth == 0 {
			return Err(LiveFilesError::InvalidConfig(
				"max_depth must be positive".to_string(),
			));
		}
		if let WatchBackend::Poll { interval_ms: 0 } = self.backend {
			return Err(LiveFilesError::InvalidConfig(
				"poll backend interval must be positive".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_config_defaults() {
		let config = LiveFilesConfig::default();
		assert_eq!(config.index_file, "index.html");
		assert_eq!(config.poll_timeout(), Duration::from_secs(5));
		assert_eq!(config.backend, WatchBackend::Native);
		assert_eq!(config.overflow_policy, OverflowPolicy::Rescan);
		assert!(!config.follow_symlinks);
		assert!(!config.serve_directory_index);
		assert!(config.validate().is_ok());
	}

	#[rstest]
	fn test_config_builder() {
		let config = LiveFilesConfig::new("/srv/www")
			.with_index_file("main.html")
			.with_poll_timeout(Duration::from_millis(250))
			.with_backend(WatchBackend::Poll { interval_ms: 100 })
			.with_overflow_policy(OverflowPolicy::Ignore)
			.with_follow_symlinks(true)
			.with_max_depth(3)
			.with_compression_level(9)
			.with_directory_index(true);

		assert_eq!(config.root, PathBuf::from("/srv/www"));
		assert_eq!(config.index_file, "main.html");
		assert_eq!(config.poll_timeout_ms, 250);
		assert_eq!(config.backend, WatchBackend::Poll { interval_ms: 100 });
		assert_eq!(config.overflow_policy, OverflowPolicy::Ignore);
		assert!(config.follow_symlinks);
		assert_eq!(config.max_depth, 3);
		assert_eq!(config.compression_level, 9);
		assert!(config.serve_directory_index);
	}

	#[rstest]
	fn test_from_toml_str_fills_defaults() {
		// Arrange
		let source = r#"
root = "/var/www"
poll_timeout_ms = 1000

[backend]
kind = "poll"
interval_ms = 200
"#;

		// Act
		let config = LiveFilesConfig::from_toml_str(source).unwrap();

		// Assert
		assert_eq!(config.root, PathBuf::from("/var/www"));
		assert_eq!(config.poll_timeout_ms, 1000);
		assert_eq!(config.backend, WatchBackend::Poll { interval_ms: 200 });
		assert_eq!(config.index_file, "index.html");
	}

	#[rstest]
	#[case(LiveFilesConfig::default().with_index_file(""))]
	#[case(LiveFilesConfig::default().with_index_file("docs/index.html"))]
	#[case(LiveFilesConfig::default().with_compression_level(10))]
	#[case(LiveFilesConfig::default().with_poll_timeout(Duration::ZERO))]
	#[case(LiveFilesConfig::default().with_max_depth(0))]
	#[case(LiveFilesConfig::default().with_backend(WatchBackend::Poll { interval_ms: 0 }))]
	fn test_validate_rejects(#[case] config: LiveFilesConfig) {
		let result = config.validate();
		assert!(matches!(result, Err(LiveFilesError::InvalidConfig(_))));
	}

	#[rstest]
	fn test_from_toml_str_reports_parse_errors() {
		let result = LiveFilesConfig::from_toml_str("root = [");
		assert!(matches!(result, Err(LiveFilesError::ConfigParse(_))));
	}

	#[rstest]
	fn test_from_file_missing() {
		let result = LiveFilesConfig::from_file(Path::new("/definitely/not/here.toml"));
		assert!(matches!(result, Err(LiveFilesError::Io { .. })));
	}
}
