//! Error types for the live file cache.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or maintaining the file cache.
#[derive(Debug, Error)]
pub enum LiveFilesError {
	/// The served root directory could not be read.
	#[error("Root directory unavailable: {}: {source}", path.display())]
	RootUnavailable {
		/// Configured root.
		path: PathBuf,
		/// Underlying I/O failure.
		source: io::Error,
	},

	/// A file or directory below the root could not be read.
	#[error("IO error on {}: {source}", path.display())]
	Io {
		/// Path being read.
		path: PathBuf,
		/// Underlying I/O failure.
		source: io::Error,
	},

	/// A path handed to the cache does not live below the served root.
	#[error("Path is outside the served root: {}", .0.display())]
	OutsideRoot(PathBuf),

	/// The change-notification facility could not be created.
	#[error("Watch facility unavailable: {0}")]
	WatchUnavailable(notify::Error),

	/// The change-notification facility rejected a request.
	#[error("Watch error: {0}")]
	Watch(#[from] notify::Error),

	/// The notification channel was closed by its producer.
	#[error("Watcher channel closed")]
	WatcherClosed,

	/// `start()` was called after the reconciliation loop was already launched.
	#[error("Reconciliation loop already started")]
	AlreadyStarted,

	/// The background thread or its runtime could not be created.
	#[error("Runtime error: {0}")]
	Runtime(io::Error),

	/// Configuration values failed validation.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// Configuration text could not be parsed.
	#[error("Config parse error: {0}")]
	ConfigParse(#[from] toml::de::Error),
}

impl LiveFilesError {
	/// Wraps an I/O error with the path that caused it.
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	/// Returns `true` for errors that abort initialization.
	///
	/// Everything else is logged by the cache and the affected path is left out.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::RootUnavailable { .. }
				| Self::WatchUnavailable(_)
				| Self::Runtime(_)
				| Self::InvalidConfig(_)
				| Self::ConfigParse(_)
		)
	}
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, LiveFilesError>;
