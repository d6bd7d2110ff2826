//! [`WatchService`] backed by the `notify` crate
//!
//! Each subscribed directory is watched non-recursively. Raw `notify` events
//! carry absolute paths; they are attributed to the subscription of their
//! parent directory and grouped into one [`WatchBatch`] per handle.

use super::service::{WatchBatch, WatchEvent, WatchEventKind, WatchHandle, WatchService};
use crate::config::WatchBackend;
use crate::error::{LiveFilesError, Result};
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Filesystem notification facility using native events or polling
pub struct NotifyWatchService {
	watcher: Box<dyn Watcher + Send>,
	receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
	next_handle: u64,
	directories: HashMap<WatchHandle, PathBuf>,
	handles: HashMap<PathBuf, WatchHandle>,
	invalid: HashSet<WatchHandle>,
	pending: VecDeque<WatchBatch>,
}

impl NotifyWatchService {
	/// Creates a service using the platform's native notifications
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::WatchUnavailable`] if the facility cannot be
	/// created.
	///
	/// # Example
	///
	/// ```rust,no_run
	/// use livefiles_cache::watch::{NotifyWatchService, WatchService};
	/// use std::path::Path;
	///
	/// let mut service = NotifyWatchService::recommended()?;
	/// let handle = service.subscribe(Path::new("./public"))?;
	/// assert!(service.is_valid(handle));
	/// # Ok::<(), livefiles_cache::LiveFilesError>(())
	/// ```
	pub fn recommended() -> Result<Self> {
		let (tx, rx) = mpsc::unbounded_channel();
		let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
			let _ = tx.send(res);
		})
		.map_err(LiveFilesError::WatchUnavailable)?;
		Ok(Self::with_watcher(Box::new(watcher), rx))
	}

	/// Creates a service that re-scans watched directories every `interval`
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::WatchUnavailable`] if the poll thread cannot
	/// be created.
	pub fn polling(interval: Duration) -> Result<Self> {
		let (tx, rx) = mpsc::unbounded_channel();
		let config = notify::Config::default().with_poll_interval(interval);
		let watcher = PollWatcher::new(
			move |res: notify::Result<Event>| {
				let _ = tx.send(res);
			},
			config,
		)
		.map_err(LiveFilesError::WatchUnavailable)?;
		Ok(Self::with_watcher(Box::new(watcher), rx))
	}

	/// Creates the service selected by configuration
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::WatchUnavailable`] if the backend cannot be
	/// started.
	pub fn from_backend(backend: WatchBackend) -> Result<Self> {
		match backend {
			WatchBackend::Native => Self::recommended(),
			WatchBackend::Poll { interval_ms } => Self::polling(Duration::from_millis(interval_ms)),
		}
	}

	fn with_watcher(
		watcher: Box<dyn Watcher + Send>,
		receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
	) -> Self {
		Self {
			watcher,
			receiver,
			next_handle: 1,
			directories: HashMap::new(),
			handles: HashMap::new(),
			invalid: HashSet::new(),
			pending: VecDeque::new(),
		}
	}

	/// Number of live subscriptions
	pub fn subscription_count(&self) -> usize {
		self.directories.len()
	}

	/// Translates one raw event and appends the results to `batches`
	fn absorb(&mut self, event: Event, batches: &mut Vec<WatchBatch>) {
		if event.need_rescan() {
			self.absorb_overflow(&event, batches);
			return;
		}

		let changes: Vec<(WatchEventKind, &PathBuf)> = match event.kind {
			EventKind::Create(_) => event
				.paths
				.iter()
				.map(|path| (WatchEventKind::Create, path))
				.collect(),
			EventKind::Remove(_) => event
				.paths
				.iter()
				.map(|path| (WatchEventKind::Delete, path))
				.collect(),
			EventKind::Modify(ModifyKind::Name(mode)) => match mode {
				RenameMode::From => event
					.paths
					.iter()
					.map(|path| (WatchEventKind::Delete, path))
					.collect(),
				RenameMode::To => event
					.paths
					.iter()
					.map(|path| (WatchEventKind::Create, path))
					.collect(),
				RenameMode::Both if event.paths.len() == 2 => vec![
					(WatchEventKind::Delete, &event.paths[0]),
					(WatchEventKind::Create, &event.paths[1]),
				],
				_ => event
					.paths
					.iter()
					.map(|path| {
						if path.exists() {
							(WatchEventKind::Create, path)
						} else {
							(WatchEventKind::Delete, path)
						}
					})
					.collect(),
			},
			EventKind::Modify(_) => event
				.paths
				.iter()
				.map(|path| (WatchEventKind::Modify, path))
				.collect(),
			_ => Vec::new(),
		};

		for (kind, path) in changes {
			if kind == WatchEventKind::Delete
				&& let Some(&handle) = self.handles.get(path.as_path())
			{
				self.invalid.insert(handle);
				batch_for(batches, handle);
			}

			let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
				continue;
			};
			match self.handles.get(parent) {
				Some(&handle) => batch_for(batches, handle)
					.events
					.push(WatchEvent::new(kind, name)),
				None => {
					tracing::debug!(path = %path.display(), ?kind, "dropping event outside watched directories");
				}
			}
		}
	}

	fn absorb_overflow(&self, event: &Event, batches: &mut Vec<WatchBatch>) {
		let mut targets: Vec<WatchHandle> = event
			.paths
			.iter()
			.filter_map(|path| {
				self.handles
					.get(path.as_path())
					.or_else(|| path.parent().and_then(|parent| self.handles.get(parent)))
					.copied()
			})
			.collect();

		// only directories without a watched ancestor; their rescan covers the rest
		if targets.is_empty() {
			targets = self
				.directories
				.iter()
				.filter(|(_, directory)| {
					!directory
						.ancestors()
						.skip(1)
						.any(|ancestor| self.handles.contains_key(ancestor))
				})
				.map(|(&handle, _)| handle)
				.collect();
		}
		targets.sort();
		targets.dedup();

		tracing::debug!(subscriptions = targets.len(), "notification overflow");
		for handle in targets {
			batch_for(batches, handle).events.push(WatchEvent::overflow());
		}
	}
}

fn batch_for(batches: &mut Vec<WatchBatch>, handle: WatchHandle) -> &mut WatchBatch {
	let index = match batches.iter().position(|batch| batch.handle == handle) {
		Some(index) => index,
		None => {
			batches.push(WatchBatch {
				handle,
				events: Vec::new(),
			});
			batches.len() - 1
		}
	};
	&mut batches[index]
}

#[async_trait]
impl WatchService for NotifyWatchService {
	fn subscribe(&mut self, directory: &Path) -> Result<WatchHandle> {
		if let Some(&handle) = self.handles.get(directory) {
			return Ok(handle);
		}

		self.watcher.watch(directory, RecursiveMode::NonRecursive)?;

		let handle = WatchHandle::new(self.next_handle);
		self.next_handle += 1;
		self.directories.insert(handle, directory.to_path_buf());
		self.handles.insert(directory.to_path_buf(), handle);
		Ok(handle)
	}

	async fn next_batch(&mut self, timeout: Duration) -> Result<Option<WatchBatch>> {
		if let Some(batch) = self.pending.pop_front() {
			return Ok(Some(batch));
		}

		let first = match tokio::time::timeout(timeout, self.receiver.recv()).await {
			Err(_) => return Ok(None),
			Ok(None) => return Err(LiveFilesError::WatcherClosed),
			Ok(Some(result)) => result?,
		};

		let mut batches = Vec::new();
		self.absorb(first, &mut batches);
		while let Ok(result) = self.receiver.try_recv() {
			match result {
				Ok(event) => self.absorb(event, &mut batches),
				Err(err) => tracing::warn!(error = %err, "notification error"),
			}
		}

		self.pending.extend(batches);
		Ok(self.pending.pop_front())
	}

	fn is_valid(&self, handle: WatchHandle) -> bool {
		!self.invalid.contains(&handle)
			&& self
				.directories
				.get(&handle)
				.is_some_and(|directory| directory.is_dir())
	}

	fn cancel(&mut self, handle: WatchHandle) {
		self.invalid.remove(&handle);
		let Some(directory) = self.directories.remove(&handle) else {
			return;
		};
		self.handles.remove(&directory);
		if let Err(err) = self.watcher.unwatch(&directory) {
			tracing::debug!(path = %directory.display(), error = %err, "unwatch failed");
		}
	}
}

impl std::fmt::Debug for NotifyWatchService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NotifyWatchService")
			.field("directories", &self.directories)
			.field("invalid", &self.invalid)
			.field("pending", &self.pending.len())
			.finish_non_exhaustive()
	}
}
