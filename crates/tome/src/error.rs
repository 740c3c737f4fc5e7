//! CLI error types.

use tome_config::ConfigError;
use tome_html::ResourceError;
use tome_site::BuildError;
use tome_sources::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{0}")]
    Validation(String),
}
