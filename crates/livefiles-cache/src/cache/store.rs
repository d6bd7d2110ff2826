//! Concurrent route → entry store

use super::entry::CacheEntry;
use super::statistics::CacheStatistics;
use crate::route::{self, SEPARATOR};
use dashmap::{DashMap, DashSet};
use http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Permanent redirect to the same route with a trailing separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
	/// Target route
	pub location: String,
}

impl Redirect {
	/// HTTP status of the redirect (always 301)
	pub fn status(&self) -> StatusCode {
		StatusCode::MOVED_PERMANENTLY
	}
}

/// Result of a route lookup
#[derive(Debug, Clone)]
pub enum Lookup {
	/// The route is cached
	Found(Arc<CacheEntry>),
	/// The route names a known directory without its trailing separator
	Redirect(Redirect),
	/// Nothing is cached for the route
	NotFound,
}

impl Lookup {
	/// Returns the entry of a `Found` result
	pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
		match self {
			Lookup::Found(entry) => Some(entry),
			_ => None,
		}
	}

	/// Returns `true` for `NotFound`
	pub fn is_not_found(&self) -> bool {
		matches!(self, Lookup::NotFound)
	}
}

/// Route-keyed cache of prebuilt entries plus the set of known directories
///
/// Many threads may call [`get`](Self::get) and [`list_all`](Self::list_all)
/// while the reconciliation loop mutates the store. Both maps are sharded, so
/// readers never wait on one global lock, and an entry becomes visible only
/// as a complete `Arc<CacheEntry>`.
#[derive(Debug)]
pub struct CacheStore {
	index_route: String,
	index_file: String,
	serve_directory_index: bool,
	pages: DashMap<String, Arc<CacheEntry>>,
	directories: DashSet<String>,
	hits: AtomicU64,
	misses: AtomicU64,
	redirects: AtomicU64,
}

impl CacheStore {
	/// Creates an empty store
	///
	/// # Example
	///
	/// ```rust
	/// use livefiles_cache::{CacheStore, Lookup};
	///
	/// let store = CacheStore::new("index.html");
	/// assert!(matches!(store.get("/"), Lookup::NotFound));
	/// ```
	pub fn new(index_file: impl Into<String>) -> Self {
		let index_file = index_file.into();
		Self {
			index_route: route::join("/", &index_file),
			index_file,
			serve_directory_index: false,
			pages: DashMap::new(),
			directories: DashSet::new(),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			redirects: AtomicU64::new(0),
		}
	}

	/// Retries `route + index_file` for routes that end in a separator
	pub fn with_directory_index(mut self, enable: bool) -> Self {
		self.serve_directory_index = enable;
		self
	}

	/// Looks up a route
	///
	/// `/` is rewritten to the index file. A miss on a known directory route
	/// without a trailing separator yields a [`Redirect`].
	pub fn get(&self, route_path: &str) -> Lookup {
		let mut key = route::normalize_route(route_path);
		if key == "/" {
			key.clone_from(&self.index_route);
		}

		if let Some(entry) = self.lookup_entry(&key) {
			return self.hit(entry);
		}

		if key.ends_with(SEPARATOR) {
			if self.serve_directory_index
				&& let Some(entry) = self.lookup_entry(&route::join(&key, &self.index_file))
			{
				return self.hit(entry);
			}
		} else if self.directories.contains(&key) {
			self.redirects.fetch_add(1, Ordering::Relaxed);
			return Lookup::Redirect(Redirect {
				location: format!("{}/", key),
			});
		}

		self.misses.fetch_add(1, Ordering::Relaxed);
		Lookup::NotFound
	}

	fn lookup_entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
		self.pages.get(key).map(|entry| Arc::clone(entry.value()))
	}

	fn hit(&self, entry: Arc<CacheEntry>) -> Lookup {
		self.hits.fetch_add(1, Ordering::Relaxed);
		Lookup::Found(entry)
	}

	/// Publishes an entry, replacing any previous one for the same route
	///
	/// Returns the replaced entry.
	pub fn put(&self, key: impl Into<String>, entry: CacheEntry) -> Option<Arc<CacheEntry>> {
		self.pages.insert(key.into(), Arc::new(entry))
	}

	/// Removes an entry; returns whether one was present
	pub fn remove(&self, key: &str) -> bool {
		self.pages.remove(key).is_some()
	}

	/// Removes every file entry below a directory route; returns how many
	pub fn remove_under(&self, directory: &str) -> usize {
		let before = self.pages.len();
		self.pages.retain(|key, _| !route::is_under(key, directory));
		before.saturating_sub(self.pages.len())
	}

	/// File routes strictly below a directory route
	pub fn keys_under(&self, directory: &str) -> Vec<String> {
		self.pages
			.iter()
			.filter(|entry| route::is_under(entry.key(), directory))
			.map(|entry| entry.key().clone())
			.collect()
	}

	/// Returns `true` if a file entry exists for `key`
	pub fn contains(&self, key: &str) -> bool {
		self.pages.contains_key(key)
	}

	/// Records a known directory route
	pub fn insert_directory(&self, directory: impl Into<String>) -> bool {
		self.directories.insert(directory.into())
	}

	/// Forgets a directory route; returns whether it was known
	pub fn remove_directory(&self, directory: &str) -> bool {
		self.directories.remove(directory).is_some()
	}

	/// Returns `true` if `directory` is a known directory route
	pub fn is_directory(&self, directory: &str) -> bool {
		self.directories.contains(directory)
	}

	/// Union of directory routes and file routes, sorted
	pub fn list_all(&self) -> Vec<String> {
		let mut routes = Vec::with_capacity(self.directories.len() + self.pages.len());
		routes.extend(self.directories.iter().map(|dir| dir.key().clone()));
		routes.extend(self.pages.iter().map(|entry| entry.key().clone()));
		routes.sort();
		routes
	}

	/// Number of cached files
	pub fn len(&self) -> usize {
		self.pages.len()
	}

	/// Returns `true` if no file is cached
	pub fn is_empty(&self) -> bool {
		self.pages.is_empty()
	}

	/// Snapshot of counters and sizes
	pub fn statistics(&self) -> CacheStatistics {
		let (compressed_bytes, original_bytes) =
			self.pages.iter().fold((0, 0), |(compressed, original), entry| {
				let meta = entry.value().metadata();
				(
					compressed + meta.compressed_size,
					original + meta.original_size,
				)
			});

		CacheStatistics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			redirects: self.redirects.load(Ordering::Relaxed),
			entry_count: self.pages.len() as u64,
			directory_count: self.directories.len() as u64,
			compressed_bytes,
			original_bytes,
		}
	}
}
