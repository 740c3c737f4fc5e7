//! Build failures.

use std::path::PathBuf;

use tome_html::{RenderError, ResourceError};

/// Error that aborts a site build.
///
/// Nothing is retried and no archive is left behind.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Filesystem access failed.
    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive writer failed.
    #[error("archive error")]
    Archive(#[from] zip::result::ZipError),

    /// A document failed to render.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A dependency's producer failed.
    #[error("failed to materialize {path}")]
    Dependency {
        path: String,
        #[source]
        source: ResourceError,
    },

    /// Two documents map to the same archive path.
    #[error("more than one document would be written to {0}")]
    DuplicatePath(String),

    /// The worker pool could not be created.
    #[error("failed to create worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The search index could not be serialized.
    #[error("failed to serialize search index")]
    Index(#[from] serde_json::Error),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
