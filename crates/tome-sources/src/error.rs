//! Error type shared by all source services.

use std::path::PathBuf;

/// Failure to obtain bytes or records from a collaborator.
///
/// None of these are retried; the caller is expected to abort the run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The asset store has no entry under this key.
    #[error("asset store has no entry for `{0}`")]
    MissingAsset(String),

    /// Reading a local file failed.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote fetch failed (transport error or HTTP status >= 400).
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// The compositor process could not be started or fed.
    #[error("failed to run compositor `{program}`")]
    CompositorIo {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compositor process exited unsuccessfully.
    #[error("compositor `{program}` exited with {status}: {stderr}")]
    CompositorFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// A composited resource was requested but no compositor is configured.
    #[error("no compositor configured")]
    NoCompositor,

    /// The data set file is not valid JSON of the expected shape.
    #[error("invalid data set")]
    Data(#[from] serde_json::Error),
}

impl SourceError {
    /// Build an [`SourceError::Io`] for the given path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
