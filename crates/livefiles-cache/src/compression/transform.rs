//! Content transform hook

use std::path::Path;

/// Pure transformation of file content applied before compression
///
/// Closures with the matching signature implement the trait, so template or
/// tag substitution can be plugged in without a dedicated type.
///
/// # Example
///
/// ```rust
/// use livefiles_cache::ContentTransform;
/// use std::path::Path;
///
/// let upper = |_: &Path, content: Vec<u8>| content.to_ascii_uppercase();
/// assert_eq!(upper.apply(Path::new("a.txt"), b"abc".to_vec()), b"ABC");
/// ```
pub trait ContentTransform: Send + Sync {
	/// Returns the transformed content of the file at `path`
	fn apply(&self, path: &Path, content: Vec<u8>) -> Vec<u8>;
}

/// Transform that returns content unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ContentTransform for Identity {
	fn apply(&self, _path: &Path, content: Vec<u8>) -> Vec<u8> {
		content
	}
}

impl<F> ContentTransform for F
where
	F: Fn(&Path, Vec<u8>) -> Vec<u8> + Send + Sync,
{
	fn apply(&self, path: &Path, content: Vec<u8>) -> Vec<u8> {
		self(path, content)
	}
}
