//! Error handling types and utilities.

/// A specialized Result type for stddoc-mcp plumbing (config, storage, startup).
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods throughout the codebase. Pipeline stages return the
/// typed errors below instead.
pub type Result<T> = anyhow::Result<T>;

/// Every candidate location for a version's search index was unreachable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No search index found for version '{version}' (tried: {})", attempted.join(", "))]
pub struct ResolutionError {
    pub version: String,
    pub attempted: Vec<String>,
}

/// The resolved index URL could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Fetching {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("Fetching {url} failed: {cause}")]
    Network { url: String, cause: String },
    #[error("Search index at {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
    #[error("Search index at {url} is not valid text: {cause}")]
    Body { url: String, cause: String },
}

/// Malformed search-index content. `position` is a byte offset into the fetched text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid search index at byte {position}: {reason}")]
pub struct DecodeError {
    pub position: usize,
    pub reason: String,
}

impl DecodeError {
    pub(crate) fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

/// Terminal error surfaced to the interactive caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Search index pipeline aborted: {0}")]
    Aborted(String),
}
