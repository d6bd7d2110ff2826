//! Directory subscriptions and the handle → directory map

use super::service::{WatchBatch, WatchHandle, WatchService};
use crate::cache::CacheStore;
use crate::error::Result;
use crate::route::route_for;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Subscribes directories and resolves notification handles back to them
///
/// Owned by the reconciliation loop. Registered directories are mirrored into
/// the store's directory set so lookups can answer with redirects.
pub struct WatchRegistrar {
	service: Box<dyn WatchService>,
	directories: HashMap<WatchHandle, PathBuf>,
	handles: HashMap<PathBuf, WatchHandle>,
	store: Arc<CacheStore>,
	root: PathBuf,
}

impl WatchRegistrar {
	/// Creates a registrar for directories below `root`
	pub fn new(service: Box<dyn WatchService>, store: Arc<CacheStore>, root: impl Into<PathBuf>) -> Self {
		Self {
			service,
			directories: HashMap::new(),
			handles: HashMap::new(),
			store,
			root: root.into(),
		}
	}

	/// Subscribes `directory` and records it as known
	///
	/// # Errors
	///
	/// Returns an error if the directory lies outside the root or the
	/// facility refuses the subscription. Nothing is recorded in that case.
	pub fn register(&mut self, directory: &Path) -> Result<WatchHandle> {
		let route = route_for(&self.root, directory)?;
		let handle = self.service.subscribe(directory)?;

		if let Some(previous) = self.handles.insert(directory.to_path_buf(), handle)
			&& previous != handle
		{
			self.directories.remove(&previous);
		}
		self.directories.insert(handle, directory.to_path_buf());
		self.store.insert_directory(route.clone());
		tracing::info!(route = %route, %handle, "watching directory");
		Ok(handle)
	}

	/// Directory watched by `handle`
	pub fn resolve(&self, handle: WatchHandle) -> Option<&Path> {
		self.directories.get(&handle).map(PathBuf::as_path)
	}

	/// Returns `true` if `directory` has a live subscription
	pub fn is_registered(&self, directory: &Path) -> bool {
		self.handles.contains_key(directory)
	}

	/// Handle of the subscription watching `directory`
	pub fn handle_of(&self, directory: &Path) -> Option<WatchHandle> {
		self.handles.get(directory).copied()
	}

	/// Handles of `directory` and every registered directory below it
	pub fn registered_under(&self, directory: &Path) -> Vec<(WatchHandle, PathBuf)> {
		self.directories
			.iter()
			.filter(|(_, known)| known.starts_with(directory))
			.map(|(&handle, known)| (handle, known.clone()))
			.collect()
	}

	/// Invalidates `directory` and every registered directory below it;
	/// returns how many subscriptions were dropped
	pub fn invalidate_tree(&mut self, directory: &Path) -> usize {
		let handles = self.registered_under(directory);
		let count = handles.len();
		for (handle, _) in handles {
			self.invalidate(handle);
		}
		count
	}

	/// Drops a subscription that is no longer valid
	///
	/// Removes the handle mapping, the directory from the store's directory
	/// set and every cached file below it. Returns the directory, if known.
	pub fn invalidate(&mut self, handle: WatchHandle) -> Option<PathBuf> {
		self.service.cancel(handle);
		let directory = self.directories.remove(&handle)?;
		self.handles.remove(&directory);

		match route_for(&self.root, &directory) {
			Ok(route) => {
				self.store.remove_directory(&route);
				let purged = self.store.remove_under(&route);
				tracing::info!(route = %route, %handle, purged, "subscription invalidated");
			}
			Err(err) => {
				tracing::warn!(path = %directory.display(), error = %err, "invalidated directory outside root");
			}
		}
		Some(directory)
	}

	/// Waits up to `timeout` for the next batch of notifications
	///
	/// # Errors
	///
	/// Propagates facility failures.
	pub async fn next_batch(&mut self, timeout: Duration) -> Result<Option<WatchBatch>> {
		self.service.next_batch(timeout).await
	}

	/// Returns `false` once the subscription behind `handle` is gone
	pub fn is_valid(&self, handle: WatchHandle) -> bool {
		self.service.is_valid(handle)
	}

	/// Number of live subscriptions
	pub fn len(&self) -> usize {
		self.directories.len()
	}

	/// Returns `true` if nothing is registered
	pub fn is_empty(&self) -> bool {
		self.directories.is_empty()
	}

	/// Served root
	pub fn root(&self) -> &Path {
		&self.root
	}
}

impl std::fmt::Debug for WatchRegistrar {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WatchRegistrar")
			.field("root", &self.root)
			.field("directories", &self.directories)
			.finish_non_exhaustive()
	}
}
