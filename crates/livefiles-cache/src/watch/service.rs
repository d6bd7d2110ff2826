//! Notification facility abstraction

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opaque token identifying one directory subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(u64);

impl WatchHandle {
	/// Wraps a raw handle value
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Raw handle value
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for WatchHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "watch#{}", self.0)
	}
}

/// Kind of a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
	/// An entry appeared in the directory
	Create,
	/// An entry's content changed
	Modify,
	/// An entry disappeared from the directory
	Delete,
	/// Events were lost or coalesced; no per-file information
	Overflow,
}

/// One change notification, relative to the subscribed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
	/// What happened
	pub kind: WatchEventKind,
	/// Entry name relative to the subscribed directory (empty for overflow)
	pub name: PathBuf,
}

impl WatchEvent {
	/// Creates an event
	pub fn new(kind: WatchEventKind, name: impl Into<PathBuf>) -> Self {
		Self {
			kind,
			name: name.into(),
		}
	}

	/// Creates an overflow event
	pub fn overflow() -> Self {
		Self::new(WatchEventKind::Overflow, PathBuf::new())
	}
}

/// Events delivered together for a single subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBatch {
	/// Subscription the events belong to
	pub handle: WatchHandle,
	/// Events in arrival order; may be empty when only the subscription's
	/// validity changed
	pub events: Vec<WatchEvent>,
}

/// Directory change-notification facility
///
/// Implementations must be `Send` so the reconciliation loop can own one on
/// its background thread. Only the loop calls these methods.
#[async_trait]
pub trait WatchService: Send {
	/// Subscribes a directory (non-recursively) and returns its handle
	///
	/// # Errors
	///
	/// Returns an error if the directory cannot be watched.
	fn subscribe(&mut self, directory: &Path) -> Result<WatchHandle>;

	/// Waits up to `timeout` for the next batch
	///
	/// `Ok(None)` means the wait elapsed without events.
	///
	/// # Errors
	///
	/// Returns an error if the facility reported a failure or was closed.
	async fn next_batch(&mut self, timeout: Duration) -> Result<Option<WatchBatch>>;

	/// Returns `false` once the subscription can no longer deliver events
	fn is_valid(&self, handle: WatchHandle) -> bool;

	/// Drops a subscription; unknown handles are ignored
	fn cancel(&mut self, handle: WatchHandle);
}
