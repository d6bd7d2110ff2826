//! Route paths: cache keys relative to the served root
//!
//! A route always starts with `/` and uses `/` as separator regardless of the
//! platform. The root directory itself maps to `/`.

use crate::error::{LiveFilesError, Result};
use std::path::{Component, Path};

/// Route separator
pub const SEPARATOR: char = '/';

/// Computes the route of `path` relative to `root`
///
/// # Errors
///
/// Returns [`LiveFilesError::OutsideRoot`] if `path` is not below `root`.
///
/// # Example
///
/// ```rust
/// use livefiles_cache::route::route_for;
/// use std::path::Path;
///
/// let route = route_for(Path::new("/srv/www"), Path::new("/srv/www/css/site.css")).unwrap();
/// assert_eq!(route, "/css/site.css");
/// ```
pub fn route_for(root: &Path, path: &Path) -> Result<String> {
	let relative = path
		.strip_prefix(root)
		.map_err(|_| LiveFilesError::OutsideRoot(path.to_path_buf()))?;

	let mut route = String::new();
	for component in relative.components() {
		match component {
			Component::Normal(part) => {
				route.push(SEPARATOR);
				route.push_str(&part.to_string_lossy());
			}
			Component::CurDir => {}
			_ => return Err(LiveFilesError::OutsideRoot(path.to_path_buf())),
		}
	}

	if route.is_empty() {
		route.push(SEPARATOR);
	}
	Ok(route)
}

/// Brings a requested route into key form: backslashes become `/` and a
/// leading `/` is added when missing
pub fn normalize_route(route: &str) -> String {
	let route = route.replace('\\', "/");
	if route.starts_with(SEPARATOR) {
		route
	} else {
		format!("/{}", route)
	}
}

/// Returns `true` if `route` lies strictly below the directory route `directory`
pub fn is_under(route: &str, directory: &str) -> bool {
	if directory == "/" {
		return route != "/";
	}
	route
		.strip_prefix(directory)
		.is_some_and(|rest| rest.starts_with(SEPARATOR) && rest.len() > 1)
}

/// Appends a file name to a directory route
pub fn join(directory: &str, name: &str) -> String {
	if directory.ends_with(SEPARATOR) {
		format!("{}{}", directory, name)
	} else {
		format!("{}/{}", directory, name)
	}
}
