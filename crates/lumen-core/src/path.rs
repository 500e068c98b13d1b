//! Canonical path handling.
//!
//! Every component that keys state by file path (the script registry, the
//! project graph, watch subscriptions) must agree on file identity. Two
//! paths that differ only in separator style — or, on case-insensitive
//! hosts, only in case — refer to the same file. [`NormalizedPath`] keeps
//! the caller's spelling for display while comparing and hashing by a
//! canonical key, so the "same file, different spelling" decision is made
//! in exactly one place.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Convert backslashes to forward slashes and strip a trailing separator
/// (except for a bare root).
pub fn normalize_slashes(path: &str) -> String {
    let mut out = path.replace('\\', "/");
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// The comparison key for a path: separator-normalized, and lowercased on
/// hosts that do not distinguish file-name case.
pub fn canonical_key(path: &str, case_sensitive: bool) -> String {
    let normalized = normalize_slashes(path);
    if case_sensitive {
        normalized
    } else {
        normalized.to_lowercase()
    }
}

/// A file path carrying both its display spelling and its canonical
/// comparison key.
///
/// Equality, ordering, and hashing use the key only, so paths that differ
/// by case on a case-insensitive host collapse to one identity while the
/// user-visible spelling survives.
#[derive(Clone, Debug)]
pub struct NormalizedPath {
    display: String,
    key: String,
    case_sensitive: bool,
}

impl NormalizedPath {
    pub fn new(path: &str, case_sensitive: bool) -> Self {
        Self {
            display: normalize_slashes(path),
            key: canonical_key(path, case_sensitive),
            case_sensitive,
        }
    }

    /// The user-visible spelling (separator-normalized, case preserved).
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The canonical comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The containing directory, or `None` at a filesystem root.
    pub fn parent(&self) -> Option<NormalizedPath> {
        let display = parent_of(&self.display)?;
        Some(NormalizedPath::new(display, self.case_sensitive))
    }

    /// Append one component. `name` must not contain separators.
    pub fn join(&self, name: &str) -> NormalizedPath {
        let display = if self.display.ends_with('/') {
            format!("{}{}", self.display, name)
        } else {
            format!("{}/{}", self.display, name)
        };
        NormalizedPath::new(&display, self.case_sensitive)
    }

    /// The final path component, or the whole path when there is none.
    pub fn file_name(&self) -> &str {
        match self.display.rfind('/') {
            Some(idx) => &self.display[idx + 1..],
            None => &self.display,
        }
    }

    /// Iterate over ancestor directories, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NormalizedPath> {
        let mut current = self.parent();
        std::iter::from_fn(move || {
            let next = current.take()?;
            current = next.parent();
            Some(next)
        })
    }
}

fn parent_of(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        // "/foo" -> "/", and "/" itself has no parent.
        if path.len() > 1 {
            Some("/")
        } else {
            None
        }
    } else {
        Some(&path[..idx])
    }
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
