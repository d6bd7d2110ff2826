//! Reconciliation loop keeping the cache in sync with the filesystem
//!
//! The loop owns the [`WatchRegistrar`] and is the only writer of the
//! [`CacheStore`] once started. It waits for notification batches with a
//! bounded timeout and re-checks its running flag after every wait, so a
//! stop request takes effect within one timeout.

use crate::cache::CacheStore;
use crate::compression::{CrawlResult, ResponseBuilder, TreeCrawler};
use crate::config::OverflowPolicy;
use crate::error::{LiveFilesError, Result};
use crate::route::route_for;
use crate::watch::{WatchBatch, WatchEventKind, WatchHandle, WatchRegistrar};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default bounded wait for one batch of notifications
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the reconciliation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
	/// Not consuming notifications
	Stopped,
	/// Consuming notifications on the background thread
	Running,
}

impl LoopState {
	/// State corresponding to a running flag
	pub fn from_flag(running: &AtomicBool) -> Self {
		if running.load(Ordering::Acquire) {
			LoopState::Running
		} else {
			LoopState::Stopped
		}
	}
}

/// Background task applying filesystem changes to the cache
pub struct ReconcileLoop {
	registrar: WatchRegistrar,
	builder: Arc<ResponseBuilder>,
	store: Arc<CacheStore>,
	crawler: TreeCrawler,
	running: Arc<AtomicBool>,
	poll_timeout: Duration,
	overflow_policy: OverflowPolicy,
}

impl ReconcileLoop {
	/// Creates a loop; `running` is the shared liveness flag
	pub fn new(
		registrar: WatchRegistrar,
		builder: Arc<ResponseBuilder>,
		store: Arc<CacheStore>,
		crawler: TreeCrawler,
		running: Arc<AtomicBool>,
	) -> Self {
		Self {
			registrar,
			builder,
			store,
			crawler,
			running,
			poll_timeout: DEFAULT_POLL_TIMEOUT,
			overflow_policy: OverflowPolicy::default(),
		}
	}

	/// Sets the bounded wait (and therefore the shutdown latency)
	pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
		self.poll_timeout = timeout;
		self
	}

	/// Sets the overflow handling
	pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
		self.overflow_policy = policy;
		self
	}

	/// Current state as seen through the running flag
	pub fn state(&self) -> LoopState {
		LoopState::from_flag(&self.running)
	}

	/// The registrar owned by this loop
	pub fn registrar(&self) -> &WatchRegistrar {
		&self.registrar
	}

	/// Crawls `root`, registers every directory and publishes every file
	///
	/// # Errors
	///
	/// Only an unreadable `root` is an error; individual directories and
	/// files that fail are logged and left out.
	pub fn populate(&mut self, root: &Path) -> Result<()> {
		let listing = self.crawler.crawl(root)?;
		self.absorb_listing(&listing);
		tracing::info!(
			root = %root.display(),
			files = self.store.len(),
			directories = self.registrar.len(),
			"initial crawl complete"
		);
		Ok(())
	}

	/// Runs until the running flag is cleared
	pub async fn run(mut self) {
		tracing::info!(timeout = ?self.poll_timeout, "reconciliation loop started");

		while self.running.load(Ordering::Acquire) {
			match self.registrar.next_batch(self.poll_timeout).await {
				Ok(Some(batch)) => self.apply_batch(batch),
				Ok(None) => {}
				Err(LiveFilesError::WatcherClosed) => {
					tracing::error!("notification channel closed; stopping reconciliation");
					self.running.store(false, Ordering::Release);
					break;
				}
				Err(err) => {
					tracing::warn!(error = %err, "wait for notifications interrupted");
				}
			}
		}

		tracing::info!("reconciliation loop stopped");
	}

	/// Applies every event of `batch`, then drops the subscription if it is
	/// no longer valid
	pub fn apply_batch(&mut self, batch: WatchBatch) {
		let handle = batch.handle;
		tracing::debug!(%handle, events = batch.events.len(), "applying batch");

		for event in batch.events {
			let Some(parent) = self.registrar.resolve(handle).map(Path::to_path_buf) else {
				tracing::error!(
					%handle,
					kind = ?event.kind,
					name = %event.name.display(),
					"event for unknown subscription"
				);
				continue;
			};

			match event.kind {
				WatchEventKind::Create => {
					let path = parent.join(&event.name);
					if self.is_unfollowed_link(&path) {
						self.skip_link(&path);
					} else if path.is_dir() {
						self.directory_created(&path);
					} else {
						self.publish(&path);
					}
				}
				WatchEventKind::Modify => {
					let path = parent.join(&event.name);
					if !path.is_dir() {
						self.publish(&path);
					}
				}
				WatchEventKind::Delete => self.unpublish(&parent.join(&event.name)),
				WatchEventKind::Overflow => self.overflow(&parent),
			}
		}

		if self.registrar.resolve(handle).is_some() && !self.registrar.is_valid(handle) {
			self.registrar.invalidate(handle);
		}
	}

	fn publish(&self, path: &Path) {
		if self.is_unfollowed_link(path) {
			self.skip_link(path);
			return;
		}

		match self.builder.build(path) {
			Ok(entry) => {
				let route = entry.route().to_string();
				let size = entry.metadata().compressed_size;
				let replaced = self.store.put(route.clone(), entry).is_some();
				tracing::info!(route = %route, size, replaced, "published");
			}
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "build failed; entry not cached");
			}
		}
	}

	fn unpublish(&mut self, path: &Path) {
		if self.registrar.is_registered(path) {
			let dropped = self.registrar.invalidate_tree(path);
			tracing::info!(path = %path.display(), dropped, "directory removed");
			return;
		}

		let route = match route_for(self.builder.root(), path) {
			Ok(route) => route,
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "cannot unpublish");
				return;
			}
		};
		if self.store.remove(&route) {
			tracing::info!(route = %route, "unpublished");
			return;
		}

		// an unwatched directory still has cached files below it
		let dropped = self.registrar.invalidate_tree(path);
		let purged = self.store.remove_under(&route);
		self.store.remove_directory(&route);
		tracing::info!(route = %route, dropped, purged, "unpublished");
	}

	fn is_unfollowed_link(&self, path: &Path) -> bool {
		!self.crawler.follows_symlinks()
			&& fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
	}

	fn skip_link(&self, path: &Path) {
		tracing::debug!(path = %path.display(), "symbolic link not followed");
		if let Ok(route) = route_for(self.builder.root(), path)
			&& self.store.remove(&route)
		{
			tracing::info!(route = %route, "unpublished");
		}
	}

	fn directory_created(&mut self, path: &Path) {
		match self.crawler.crawl_below(self.registrar.root(), path) {
			Ok(listing) => self.absorb_listing(&listing),
			Err(err) => {
				tracing::warn!(path = %path.display(), error = %err, "new directory unreadable");
			}
		}
	}

	fn overflow(&mut self, directory: &Path) {
		match self.overflow_policy {
			OverflowPolicy::Ignore => {
				tracing::warn!(path = %directory.display(), "notification overflow ignored");
			}
			OverflowPolicy::Rescan => {
				tracing::warn!(path = %directory.display(), "notification overflow; rescanning");
				self.rescan(directory);
			}
		}
	}

	/// Re-crawls `directory` and reconciles everything cached below it
	fn rescan(&mut self, directory: &Path) {
		let listing = match self.crawler.crawl_below(self.registrar.root(), directory) {
			Ok(listing) => listing,
			Err(err) => {
				tracing::warn!(path = %directory.display(), error = %err, "rescan failed; dropping directory");
				self.registrar.invalidate_tree(directory);
				return;
			}
		};

		let present_dirs: HashSet<&PathBuf> = listing.directories.iter().collect();
		for (handle, known) in self.registrar.registered_under(directory) {
			if !present_dirs.contains(&known) {
				self.registrar.invalidate(handle);
			}
		}

		if let Ok(route) = route_for(self.builder.root(), directory) {
			let present: HashSet<String> = listing
				.files
				.iter()
				.filter_map(|file| route_for(self.builder.root(), file).ok())
				.collect();
			for key in self.store.keys_under(&route) {
				if !present.contains(&key) {
					self.store.remove(&key);
					tracing::info!(route = %key, "unpublished stale entry");
				}
			}
		}

		self.absorb_listing(&listing);
	}

	fn absorb_listing(&mut self, listing: &CrawlResult) {
		for directory in &listing.directories {
			if self.registrar.is_registered(directory) {
				continue;
			}
			if let Err(err) = self.registrar.register(directory) {
				tracing::warn!(path = %directory.display(), error = %err, "directory left unwatched");
			}
		}
		for file in &listing.files {
			self.publish(file);
		}
	}

	/// Handle of the subscription watching `directory`, if any
	pub fn handle_of(&self, directory: &Path) -> Option<WatchHandle> {
		self.registrar.handle_of(directory)
	}
}

impl std::fmt::Debug for ReconcileLoop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ReconcileLoop")
			.field("registrar", &self.registrar)
			.field("state", &self.state())
			.field("poll_timeout", &self.poll_timeout)
			.field("overflow_policy", &self.overflow_policy)
			.finish_non_exhaustive()
	}
}
