//! Site build pipeline for tome.
//!
//! [`Pipeline::build`] renders a set of documents in parallel into one zip
//! archive, materializes the files they depend on exactly once each, and
//! adds the site-wide bundles and search index.
//!
//! # Example
//!
//! ```ignore
//! use tome_site::{BuildOptions, Pipeline};
//!
//! let pipeline = Pipeline::new(BuildOptions::default(), sources);
//! let report = pipeline.build(&shell, &documents)?;
//! println!("{} entries in {}", report.entries, report.archive.display());
//! ```

mod archive;
mod error;
mod index;
mod pipeline;

pub use archive::{ArchiveStats, ArchiveWriter};
pub use error::BuildError;
pub use index::{IndexEntry, index_entries, redirect_lines, search_index_module};
pub use pipeline::{BuildOptions, BuildReport, Pipeline, REDIRECTS_FILE, StaticFile};
