//! Lifecycle and serving surface
//!
//! [`LocalFiles`] crawls and precompresses the configured root when it is
//! constructed, then serves lookups from the shared [`CacheStore`]. Calling
//! [`LocalFiles::start`] moves the reconciliation loop onto its own thread.

use crate::cache::{CacheStatistics, CacheStore, Lookup};
use crate::compression::{ContentTransform, ResponseBuilder, TreeCrawler};
use crate::config::LiveFilesConfig;
use crate::error::{LiveFilesError, Result};
use crate::reconcile::{LoopState, ReconcileLoop};
use crate::watch::{NotifyWatchService, WatchRegistrar, WatchService};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

const WORKER_NAME: &str = "livefiles-reconcile";

/// Live-updating cache of precompressed files below a root directory
///
/// # Example
///
/// ```rust,no_run
/// use livefiles_cache::{LiveFilesConfig, LocalFiles, Lookup};
///
/// let files = LocalFiles::new(LiveFilesConfig::new("public"))?;
/// files.start()?;
///
/// match files.get_file("/css/site.css") {
///     Lookup::Found(entry) => println!("{} bytes", entry.body().len()),
///     Lookup::Redirect(redirect) => println!("301 {}", redirect.location),
///     Lookup::NotFound => println!("404"),
/// }
///
/// files.shutdown();
/// # Ok::<(), livefiles_cache::LiveFilesError>(())
/// ```
pub struct LocalFiles {
	config: LiveFilesConfig,
	root: PathBuf,
	store: Arc<CacheStore>,
	running: Arc<AtomicBool>,
	pending: Mutex<Option<ReconcileLoop>>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl LocalFiles {
	/// Crawls the configured root and builds every entry
	///
	/// # Errors
	///
	/// Fails on invalid configuration, an unreadable root, or when the
	/// notification facility cannot be created.
	pub fn new(config: LiveFilesConfig) -> Result<Self> {
		Self::builder(config).build()
	}

	/// Starts a builder for custom transforms or notification services
	pub fn builder(config: LiveFilesConfig) -> LocalFilesBuilder {
		LocalFilesBuilder::new(config)
	}

	/// Launches the reconciliation loop on a background thread
	///
	/// The loop runs once per instance; it cannot be restarted after
	/// [`stop`](Self::stop).
	///
	/// # Errors
	///
	/// Returns [`LiveFilesError::AlreadyStarted`] on a second call and
	/// [`LiveFilesError::Runtime`] if the thread or its runtime cannot be
	/// created.
	pub fn start(&self) -> Result<()> {
		let mut pending = self.pending.lock();
		let Some(reconcile) = pending.take() else {
			return Err(LiveFilesError::AlreadyStarted);
		};

		let runtime = match tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
		{
			Ok(runtime) => runtime,
			Err(err) => {
				*pending = Some(reconcile);
				return Err(LiveFilesError::Runtime(err));
			}
		};

		self.running.store(true, Ordering::Release);
		let spawned = std::thread::Builder::new()
			.name(WORKER_NAME.to_string())
			.spawn(move || runtime.block_on(reconcile.run()));

		match spawned {
			Ok(handle) => {
				*self.worker.lock() = Some(handle);
				tracing::info!(root = %self.root.display(), "live file cache started");
				Ok(())
			}
			Err(err) => {
				self.running.store(false, Ordering::Release);
				Err(LiveFilesError::Runtime(err))
			}
		}
	}

	/// Requests loop termination
	///
	/// The loop exits after its current bounded wait, i.e. within
	/// `poll_timeout_ms`.
	pub fn stop(&self) {
		if self.running.swap(false, Ordering::AcqRel) {
			tracing::info!(root = %self.root.display(), "stop requested");
		}
	}

	/// Stops the loop and waits for its thread to finish
	pub fn shutdown(&self) {
		self.stop();
		let worker = self.worker.lock().take();
		if let Some(worker) = worker
			&& worker.join().is_err()
		{
			tracing::error!("reconciliation thread panicked");
		}
	}

	/// Returns `true` while the loop is running
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	/// Loop state
	pub fn state(&self) -> LoopState {
		LoopState::from_flag(&self.running)
	}

	/// Looks up a route; see [`CacheStore::get`]
	pub fn get_file(&self, route: &str) -> Lookup {
		self.store.get(route)
	}

	/// All known directory and file routes, sorted
	pub fn browse(&self) -> Vec<String> {
		self.store.list_all()
	}

	/// Shared store, for serving layers that hold it directly
	pub fn store(&self) -> Arc<CacheStore> {
		Arc::clone(&self.store)
	}

	/// Counters and sizes
	pub fn statistics(&self) -> CacheStatistics {
		self.store.statistics()
	}

	/// Canonical served root
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Configuration in effect
	pub fn config(&self) -> &LiveFilesConfig {
		&self.config
	}
}

impl Drop for LocalFiles {
	fn drop(&mut self) {
		self.stop();
	}
}

impl std::fmt::Debug for LocalFiles {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalFiles")
			.field("root", &self.root)
			.field("state", &self.state())
			.field("entries", &self.store.len())
			.finish_non_exhaustive()
	}
}

/// Builder for [`LocalFiles`]
pub struct LocalFilesBuilder {
	config: LiveFilesConfig,
	transform: Option<Arc<dyn ContentTransform>>,
	service: Option<Box<dyn WatchService>>,
}

impl LocalFilesBuilder {
	/// Creates a builder from configuration
	pub fn new(config: LiveFilesConfig) -> Self {
		Self {
			config,
			transform: None,
			service: None,
		}
	}

	/// Content transform applied to every file before compression
	pub fn transform(mut self, transform: impl ContentTransform + 'static) -> Self {
		self.transform = Some(Arc::new(transform));
		self
	}

	/// Notification facility to use instead of the configured backend
	pub fn watch_service(mut self, service: Box<dyn WatchService>) -> Self {
		self.service = Some(service);
		self
	}

	/// Validates configuration, crawls the root and builds the cache
	///
	/// # Errors
	///
	/// See [`LocalFiles::new`].
	pub fn build(self) -> Result<LocalFiles> {
		let Self {
			config,
			transform,
			service,
		} = self;
		config.validate()?;

		let root = config
			.root
			.canonicalize()
			.map_err(|source| LiveFilesError::RootUnavailable {
				path: config.root.clone(),
				source,
			})?;

		let store = Arc::new(
			CacheStore::new(config.index_file.clone())
				.with_directory_index(config.serve_directory_index),
		);

		let mut builder =
			ResponseBuilder::new(&root).with_compression_level(config.compression_level);
		if let Some(transform) = transform {
			builder = builder.with_transform(transform);
		}

		let service: Box<dyn WatchService> = match service {
			Some(service) => service,
			None => Box::new(NotifyWatchService::from_backend(config.backend)?),
		};

		let running = Arc::new(AtomicBool::new(false));
		let registrar = WatchRegistrar::new(service, Arc::clone(&store), &root);
		let mut reconcile = ReconcileLoop::new(
			registrar,
			Arc::new(builder),
			Arc::clone(&store),
			TreeCrawler::from_config(&config),
			Arc::clone(&running),
		)
		.with_poll_timeout(config.poll_timeout())
		.with_overflow_policy(config.overflow_policy);

		reconcile.populate(&root)?;

		Ok(LocalFiles {
			config,
			root,
			store,
			running,
			pending: Mutex::new(Some(reconcile)),
			worker: Mutex::new(None),
		})
	}
}

impl std::fmt::Debug for LocalFilesBuilder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalFilesBuilder")
			.field("config", &self.config)
			.field("custom_transform", &self.transform.is_some())
			.field("custom_service", &self.service.is_some())
			.finish()
	}
}
