//! Collaborator services for tome.
//!
//! Everything a render needs to read from outside the document tree lives
//! here, behind traits so tests can swap in fakes:
//!
//! - [`DataProvider`]: keyed lookup tables of domain records ([`JsonDataSet`])
//! - [`AssetStore`]: content-addressed asset store ([`DirAssetStore`],
//!   [`MockAssetStore`] behind the `mock` feature)
//! - [`RemoteCache`]: process-wide, URL-keyed memo of remote fetches with
//!   per-key single flight ([`HttpFetcher`] does the actual HTTP)
//! - [`Compositor`]: external byte-stream filter process
//!
//! The services are bundled into [`Sources`], which is cheap to clone and is
//! handed to every render session.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tome_sources::{DirAssetStore, HttpFetcher, JsonDataSet, RemoteCache, Sources};
//!
//! let sources = Sources::new(
//!     Arc::new(JsonDataSet::load("records.json".as_ref())?),
//!     Arc::new(DirAssetStore::new("rsc/assets".into())),
//!     Arc::new(RemoteCache::new(Box::new(HttpFetcher::new(Duration::from_secs(30))))),
//! );
//! ```

mod assets;
mod compositor;
mod data;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod remote;

use std::sync::Arc;

pub use assets::{AssetStore, DirAssetStore};
pub use compositor::Compositor;
pub use data::{DataProvider, EmptyData, JsonDataSet};
pub use error::SourceError;
#[cfg(feature = "mock")]
pub use mock::MockAssetStore;
pub use remote::{Fetcher, HttpFetcher, RemoteCache};

/// Read-only services shared by every render session of a run.
#[derive(Clone)]
pub struct Sources {
    /// Domain records.
    pub data: Arc<dyn DataProvider>,
    /// Content-addressed asset store.
    pub assets: Arc<dyn AssetStore>,
    /// Remote fetch memo.
    pub remote: Arc<RemoteCache>,
    compositor: Option<Arc<Compositor>>,
}

impl Sources {
    /// Bundle the given services. No compositor is configured.
    #[must_use]
    pub fn new(
        data: Arc<dyn DataProvider>,
        assets: Arc<dyn AssetStore>,
        remote: Arc<RemoteCache>,
    ) -> Self {
        Self {
            data,
            assets,
            remote,
            compositor: None,
        }
    }

    /// Attach an external compositing tool.
    #[must_use]
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = Some(Arc::new(compositor));
        self
    }

    /// The configured compositor.
    ///
    /// Asking for it when none is configured is an error, not a silent
    /// passthrough.
    pub fn compositor(&self) -> Result<&Compositor, SourceError> {
        self.compositor.as_deref().ok_or(SourceError::NoCompositor)
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("compositor", &self.compositor)
            .finish_non_exhaustive()
    }
}
