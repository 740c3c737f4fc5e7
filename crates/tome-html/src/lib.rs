//! Deferred-rendering document model.
//!
//! Documents are built as trees of [`Node`]s and rendered later through a
//! per-document [`Context`]. Rendering resolves values that depend on the
//! document's location, and collects what the site build needs as side
//! effects:
//!
//! - stylesheet and script fragments, deduplicated per context
//! - file dependencies, registered in a process-wide [`DependencyRegistry`]
//!   keyed by archive path
//!
//! Resources are described by [`ResourceRef`], which resolves to a link or an
//! inline `data:` URI depending on the [`ReferenceMode`].
//!
//! # Example
//!
//! ```ignore
//! use tome_html::{Context, DependencyRegistry, Node, Sink, tags};
//!
//! let mut ctx = Context::new(Sink::Buffer(String::new()), sources, registry)
//!     .with_folder_depth(1);
//! let node: Node = tags::div().class("x")?.text("<hi>")?.into();
//! node.render(&mut ctx)?;
//! assert_eq!(ctx.close()?.output.unwrap(), "<div class='x'>&lt;hi&gt;</div>");
//! ```

mod context;
mod deps;
mod document;
mod error;
mod escape;
mod ids;
mod node;
mod resource;
mod set;
mod shell;
pub mod tags;
#[cfg(test)]
mod testing;

pub use context::{Context, Drained, Sink};
pub use deps::{DependencyRegistry, Producer, producer};
pub use document::{ContentProducer, Document, DocumentKind, Layout};
pub use error::{RenderError, ResourceError, StructuralError};
pub use escape::{escape_attr, escape_file_name, escape_text};
pub use ids::IdRegistry;
pub use node::{AttrValue, Component, Element, Module, Node};
pub use resource::{Origin, RESOURCE_DIR, ReferenceMode, ResourceRef, UnknownReferenceMode};
pub use set::OrderedSet;
pub use shell::{SCRIPT, STYLESHEET, Shell};
