//! Resource loading utilities
//!
//! Loads documents and schemas from the locations they are referenced by.
//! Remote `http(s)` resources are fetched with a blocking client, and only
//! when the loader allows it.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;
use std::io::Read;
use std::time::Duration;
use url::Url;

/// Time allowed for connecting to and reading from a remote resource
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource loader for schemas and documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings. Remote resources are refused.
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                let metadata = fs::metadata(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;
                self.limits
                    .check_document_size(usize::try_from(metadata.len()).unwrap_or(usize::MAX))?;

                fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(format!(
                        "Remote resources are not allowed: {}",
                        url
                    )));
                }
                self.fetch(url)
            }
            Location::String(s) => {
                self.limits.check_document_size(s.len())?;
                Ok(s.clone())
            }
        }
    }

    fn fetch(&self, url: &Url) -> Result<String> {
        log::debug!("fetching {}", url);

        let agent = ureq::AgentBuilder::new().timeout(REMOTE_TIMEOUT).build();
        let response = agent
            .get(url.as_str())
            .call()
            .map_err(|e| Error::Resource(format!("Failed to fetch '{}': {}", url, e)))?;

        if let Some(length) = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<usize>().ok())
        {
            self.limits.check_document_size(length)?;
        }

        // one byte past the limit is enough to know it was exceeded
        let cap = u64::try_from(self.limits.max_document_size)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let mut content = String::new();
        response
            .into_reader()
            .take(cap)
            .read_to_string(&mut content)
            .map_err(|e| Error::Resource(format!("Failed to read '{}': {}", url, e)))?;
        self.limits.check_document_size(content.len())?;

        Ok(content)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
