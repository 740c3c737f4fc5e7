//! Error taxonomy for building and rendering documents.

use std::path::PathBuf;

use tome_sources::SourceError;

/// Misuse of the node construction API.
///
/// Raised immediately at the call that breaks an invariant, never deferred
/// to render time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// `class` was passed to the generic attribute setter.
    #[error("`class` must be set through the class slot, not as an attribute")]
    ClassAttribute,

    /// The same attribute name was assigned twice.
    #[error("attribute `{0}` is already set")]
    DuplicateAttribute(String),

    /// The class slot was assigned twice.
    #[error("class is already set to `{0}`")]
    DuplicateClass(String),

    /// Content was appended to a void element.
    #[error("void element <{0}> cannot have content")]
    VoidContent(String),

    /// An exact id was requested that the context already issued.
    #[error("id `{0}` is already in use")]
    DuplicateId(String),
}

/// Failure to resolve or materialize a resource.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A collaborator service failed (missing asset, fetch, compositor).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A local file origin could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No MIME type is known for the destination's extension.
    #[error("no MIME type known for `{0}`")]
    UnknownMime(String),

    /// An inert resource was asked for its bytes.
    #[error("resource `{0}` has no content")]
    Inert(String),
}

/// Failure while rendering a node tree or materializing its output.
///
/// Errors that cross a document or module boundary are wrapped in
/// [`RenderError::Boundary`] naming that boundary, so the chain of
/// `source()` calls reads from the outermost document down to the cause.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Writing to the output sink failed.
    #[error("failed to write output")]
    Io(#[from] std::io::Error),

    /// The node tree broke a construction invariant.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A resource could not be resolved.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// An error raised inside the named document or module.
    #[error("error in {boundary}")]
    Boundary {
        boundary: String,
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Wrap this error with the identity of the boundary it escaped from.
    #[must_use]
    pub fn within(self, boundary: impl Into<String>) -> Self {
        Self::Boundary {
            boundary: boundary.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, below all boundary wrappers.
    pub fn cause(&self) -> &RenderError {
        match self {
            Self::Boundary { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Boundary names from outermost to innermost.
    pub fn boundaries(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = self;
        while let Self::Boundary { boundary, source } = current {
            names.push(boundary.as_str());
            current = source.as_ref();
        }
        names
    }
}

impl From<SourceError> for RenderError {
    fn from(e: SourceError) -> Self {
        Self::Resource(ResourceError::Source(e))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_boundaries_nest_outermost_first() {
        let err = RenderError::from(StructuralError::VoidContent("br".to_owned()))
            .within("module Tooltip")
            .within("document Fireball");

        assert_eq!(err.boundaries(), vec!["document Fireball", "module Tooltip"]);
        assert!(matches!(
            err.cause(),
            RenderError::Structural(StructuralError::VoidContent(tag)) if tag == "br"
        ));
    }

    #[test]
    fn test_source_chain_is_preserved() {
        let err = RenderError::from(SourceError::MissingAsset("a.png".to_owned()))
            .within("document Rope");

        assert_eq!(err.to_string(), "error in document Rope");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "asset store has no entry for `a.png`");
    }

    #[test]
    fn test_io_cause_is_reported_once() {
        let err = RenderError::from(std::io::Error::other("disk full"));

        assert_eq!(err.to_string(), "failed to write output");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }
}
