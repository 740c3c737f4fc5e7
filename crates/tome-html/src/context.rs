//! Per-document render session.

use std::io::Write;
use std::sync::Arc;

use tome_sources::Sources;

use crate::deps::{DependencyRegistry, Producer};
use crate::error::{RenderError, StructuralError};
use crate::ids::IdRegistry;
use crate::resource::ReferenceMode;
use crate::set::OrderedSet;

/// Destination for rendered markup.
pub enum Sink {
    /// Collect output in memory.
    Buffer(String),
    /// Stream output to a writer.
    Stream(Box<dyn Write + Send>),
    /// Drop output; only side effects (styles, scripts, dependencies) remain.
    Discard,
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Discard => f.write_str("Discard"),
        }
    }
}

/// What a closed [`Context`] hands back to the build.
#[derive(Debug, Default)]
pub struct Drained {
    /// Rendered markup, for a [`Sink::Buffer`] context.
    pub output: Option<String>,
    /// Stylesheet fragments in first-registration order.
    pub css: Vec<String>,
    /// Script fragments in first-registration order.
    pub scripts: Vec<String>,
}

/// Render session for a single document.
///
/// A context is owned by exactly one task. It resolves values that depend on
/// where the document lives (relative paths, unique ids) and collects the
/// build artifacts a render produces as a side effect. File dependencies go
/// straight into the shared [`DependencyRegistry`]; styles and scripts stay
/// local until [`Context::close`].
#[derive(Debug)]
pub struct Context {
    sink: Sink,
    folder_depth: usize,
    ids: IdRegistry,
    css: OrderedSet,
    scripts: OrderedSet,
    dependencies: Arc<DependencyRegistry>,
    sources: Sources,
    reference_mode: ReferenceMode,
}

impl Context {
    /// Open a context at the output root using [`ReferenceMode::Internal`].
    #[must_use]
    pub fn new(sink: Sink, sources: Sources, dependencies: Arc<DependencyRegistry>) -> Self {
        Self {
            sink,
            folder_depth: 0,
            ids: IdRegistry::new(),
            css: OrderedSet::new(),
            scripts: OrderedSet::new(),
            dependencies,
            sources,
            reference_mode: ReferenceMode::default(),
        }
    }

    /// Place the document `depth` folders below the output root.
    #[must_use]
    pub fn with_folder_depth(mut self, depth: usize) -> Self {
        self.folder_depth = depth;
        self
    }

    /// Choose how resources are referenced.
    #[must_use]
    pub fn with_reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.reference_mode = mode;
        self
    }

    /// Append text to the sink.
    pub fn write(&mut self, text: &str) -> Result<(), RenderError> {
        match &mut self.sink {
            Sink::Buffer(buf) => buf.push_str(text),
            Sink::Stream(writer) => writer.write_all(text.as_bytes())?,
            Sink::Discard => {}
        }
        Ok(())
    }

    /// Folder depth of the document below the output root.
    pub fn folder_depth(&self) -> usize {
        self.folder_depth
    }

    /// How resources are referenced in this session.
    pub fn reference_mode(&self) -> ReferenceMode {
        self.reference_mode
    }

    /// Collaborator services.
    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Path from this document to `target`, given relative to the output root.
    pub fn path_to(&self, target: &str) -> String {
        let target = target.trim_start_matches('/');
        let mut path = "../".repeat(self.folder_depth);
        path.push_str(target);
        path
    }

    /// Unique id derived from `base`; see [`IdRegistry::id_for`].
    pub fn id_for(&mut self, base: &str) -> String {
        self.ids.id_for(base)
    }

    /// Issue exactly `id`, failing if it is already taken.
    pub fn try_id(&mut self, id: &str) -> Result<String, StructuralError> {
        self.ids.try_id(id)
    }

    /// Ids for each base sharing one numeric suffix.
    pub fn ids_with_shared_suffix(&mut self, bases: &[&str]) -> Vec<String> {
        self.ids.ids_with_shared_suffix(bases)
    }

    /// Add a stylesheet fragment for the site bundle.
    pub fn register_css(&mut self, css: &str) {
        self.css.insert(css);
    }

    /// Add a script fragment for the site bundle.
    pub fn register_script(&mut self, script: &str) {
        self.scripts.insert(script);
    }

    /// Record that the output needs a file at `path` produced by `producer`.
    ///
    /// Returns `false` if another registration for `path` already exists;
    /// that one is kept.
    pub fn add_file_dependency(&self, path: &str, producer: Producer) -> bool {
        let inserted = self.dependencies.register(path, producer);
        if inserted {
            tracing::debug!(path, "Registered file dependency");
        }
        inserted
    }

    /// Close the session and return its aggregates.
    ///
    /// A streaming sink is flushed first.
    pub fn close(self) -> Result<Drained, RenderError> {
        let output = match self.sink {
            Sink::Buffer(buf) => Some(buf),
            Sink::Stream(mut writer) => {
                writer.flush()?;
                None
            }
            Sink::Discard => None,
        };
        Ok(Drained {
            output,
            css: self.css.into_vec(),
            scripts: self.scripts.into_vec(),
        })
    }
}
