//! Resource location resolution
//!
//! Schema references come from three places: the bundled schema directory,
//! an explicit path given by the caller, and `xsi:schemaLocation` tokens
//! inside the document. All of them end up as a [`Location`].

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// In-memory resource content
    String(String),
}

impl Location {
    /// Resolve a schema reference as written in a document.
    ///
    /// Absolute URLs stay URLs, `file:` URLs become paths, and anything else
    /// is a path taken relative to `base_dir` when one is given.
    pub fn resolve(reference: &str, base_dir: Option<&Path>) -> Result<Self> {
        if let Ok(url) = Url::parse(reference) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // Single-letter schemes are Windows drive letters
                return Ok(Location::Url(url));
            }
        }

        let path = PathBuf::from(reference);
        let path = match base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        };
        Ok(Location::Path(path))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(_) => "<inline>".to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}
