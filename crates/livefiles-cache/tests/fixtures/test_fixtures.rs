//! Shared fixtures for livefiles-cache integration tests
//!
//! Provides an on-disk sample site, a polling wait helper, a scripted
//! notification service driven from the test, and a log capture layer.

#![allow(dead_code)]

use async_trait::async_trait;
use livefiles_cache::{
	LiveFilesConfig, LiveFilesError, LocalFiles, Result, WatchBatch, WatchEvent, WatchEventKind,
	WatchHandle, WatchService,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const INDEX_HTML: &str = "<!doctype html><h1>Home</h1>";
pub const STYLE_CSS: &str = "body { color: red; }";
pub const APP_JS: &str = "console.log('app');";

/// Sample site on disk; removed when dropped
pub struct Site {
	temp_dir: tempfile::TempDir,
	root: PathBuf,
}

impl Site {
	/// Canonical root of the site
	pub fn path(&self) -> &Path {
		&self.root
	}

	/// Absolute path of a relative entry
	pub fn join(&self, relative: &str) -> PathBuf {
		self.root.join(relative)
	}

	/// Writes a file, creating parent directories
	pub fn write(&self, relative: &str, content: &str) -> PathBuf {
		let path = self.join(relative);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(&path, content).unwrap();
		path
	}
}

/// Creates `index.html`, `css/style.css` and `js/app.js`
pub fn static_site() -> Site {
	let temp_dir = tempfile::TempDir::new().unwrap();
	let root = temp_dir.path().canonicalize().unwrap();

	let mut index = File::create(root.join("index.html")).unwrap();
	write!(index, "{}", INDEX_HTML).unwrap();

	fs::create_dir(root.join("css")).unwrap();
	fs::write(root.join("css").join("style.css"), STYLE_CSS).unwrap();

	fs::create_dir(root.join("js")).unwrap();
	fs::write(root.join("js").join("app.js"), APP_JS).unwrap();

	Site { temp_dir, root }
}

/// Creates a site whose only file is large and compressible
pub fn large_site(size: usize) -> Site {
	let site = static_site();
	site.write("large.txt", &"x".repeat(size));
	site
}

/// Configuration for `site` with a short bounded wait
pub fn site_config(site: &Site) -> LiveFilesConfig {
	LiveFilesConfig::new(site.path()).with_poll_timeout(Duration::from_millis(100))
}

/// Polls `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	loop {
		if condition() {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		std::thread::sleep(Duration::from_millis(20));
	}
}

/// Decompressed body served for `route`, if any
pub fn served(files: &LocalFiles, route: &str) -> Option<Vec<u8>> {
	files
		.get_file(route)
		.entry()
		.map(|entry| entry.decompress().unwrap())
}

#[derive(Default)]
struct ScriptedState {
	next: u64,
	subscriptions: HashMap<PathBuf, WatchHandle>,
	invalid: HashSet<WatchHandle>,
	refused: HashSet<PathBuf>,
	cancelled: Vec<WatchHandle>,
}

/// Notification service whose batches are pushed by a [`ScriptedController`]
pub struct ScriptedWatchService {
	state: Arc<Mutex<ScriptedState>>,
	receiver: mpsc::UnboundedReceiver<WatchBatch>,
}

/// Test-side handle of a [`ScriptedWatchService`]
#[derive(Clone)]
pub struct ScriptedController {
	state: Arc<Mutex<ScriptedState>>,
	sender: mpsc::UnboundedSender<WatchBatch>,
}

/// Creates a connected service/controller pair
pub fn scripted() -> (ScriptedWatchService, ScriptedController) {
	let (sender, receiver) = mpsc::unbounded_channel();
	let state = Arc::new(Mutex::new(ScriptedState::default()));
	(
		ScriptedWatchService {
			state: Arc::clone(&state),
			receiver,
		},
		ScriptedController { state, sender },
	)
}

#[async_trait]
impl WatchService for ScriptedWatchService {
	fn subscribe(&mut self, directory: &Path) -> Result<WatchHandle> {
		let mut state = self.state.lock();
		if state.refused.contains(directory) {
			return Err(LiveFilesError::io(
				directory,
				std::io::Error::from(std::io::ErrorKind::PermissionDenied),
			));
		}
		if let Some(&handle) = state.subscriptions.get(directory) {
			return Ok(handle);
		}
		state.next += 1;
		let handle = WatchHandle::new(state.next);
		state.subscriptions.insert(directory.to_path_buf(), handle);
		Ok(handle)
	}

	async fn next_batch(&mut self, timeout: Duration) -> Result<Option<WatchBatch>> {
		match tokio::time::timeout(timeout, self.receiver.recv()).await {
			Err(_) => Ok(None),
			Ok(None) => Err(LiveFilesError::WatcherClosed),
			Ok(Some(batch)) => Ok(Some(batch)),
		}
	}

	fn is_valid(&self, handle: WatchHandle) -> bool {
		let state = self.state.lock();
		!state.invalid.contains(&handle) && !state.cancelled.contains(&handle)
	}

	fn cancel(&mut self, handle: WatchHandle) {
		let mut state = self.state.lock();
		state.cancelled.push(handle);
		state.subscriptions.retain(|_, known| *known != handle);
	}
}

impl ScriptedController {
	/// Makes future subscriptions of `directory` fail
	pub fn refuse(&self, directory: &Path) {
		self.state.lock().refused.insert(directory.to_path_buf());
	}

	/// Handle currently subscribed for `directory`
	pub fn handle(&self, directory: &Path) -> Option<WatchHandle> {
		self.state.lock().subscriptions.get(directory).copied()
	}

	/// Returns `true` if `directory` is subscribed
	pub fn is_subscribed(&self, directory: &Path) -> bool {
		self.handle(directory).is_some()
	}

	/// Handles passed to `cancel`
	pub fn cancelled(&self) -> Vec<WatchHandle> {
		self.state.lock().cancelled.clone()
	}

	/// Sends one event for the subscription of `directory`
	pub fn emit(&self, directory: &Path, kind: WatchEventKind, name: &str) {
		let handle = self
			.handle(directory)
			.unwrap_or_else(|| panic!("{} is not subscribed", directory.display()));
		self.send(handle, vec![WatchEvent::new(kind, name)]);
	}

	/// Sends a raw batch
	pub fn send(&self, handle: WatchHandle, events: Vec<WatchEvent>) {
		self.sender.send(WatchBatch { handle, events }).unwrap();
	}

	/// Marks the subscription of `directory` invalid and wakes the loop
	pub fn invalidate(&self, directory: &Path) {
		let handle = self.handle(directory).unwrap();
		self.state.lock().invalid.insert(handle);
		self.send(handle, Vec::new());
	}
}

impl fmt::Debug for ScriptedController {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptedController").finish_non_exhaustive()
	}
}

/// Builds `LocalFiles` for `config` backed by a scripted service
pub fn scripted_files(config: LiveFilesConfig) -> (LocalFiles, ScriptedController) {
	let (service, controller) = scripted();
	let files = LocalFiles::builder(config)
		.watch_service(Box::new(service))
		.build()
		.unwrap();
	(files, controller)
}

/// Log records captured by [`CapturedLogs`]
#[derive(Clone, Default)]
pub struct CapturedLogs {
	records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
	/// Returns `true` if a record at `level` contains `needle`
	pub fn contains(&self, level: Level, needle: &str) -> bool {
		self.records
			.lock()
			.iter()
			.any(|(recorded, message)| *recorded == level && message.contains(needle))
	}
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			self.0 = format!("{:?}", value);
		}
	}
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
		let mut visitor = MessageVisitor(String::new());
		event.record(&mut visitor);
		self.records
			.lock()
			.push((*event.metadata().level(), visitor.0));
	}
}
