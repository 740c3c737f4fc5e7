//! The three-phase site build.
//!
//! - Phase A renders every document in parallel, writing each straight into
//!   the archive and collecting its styles, scripts and file dependencies.
//! - Phase B materializes each distinct dependency once, in parallel.
//! - Phase C writes the style and script bundles, static files, themes and
//!   the search index, then moves the finished archive into place.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::prelude::*;
use tome_html::{
    Context, DependencyRegistry, Document, Drained, OrderedSet, Producer, RESOURCE_DIR,
    ReferenceMode, SCRIPT, STYLESHEET, Shell, Sink,
};
use tome_sources::Sources;

use crate::archive::ArchiveWriter;
use crate::error::BuildError;
use crate::index::{index_entries, redirect_lines, search_index_module};

/// Progress is logged every this many items.
const PROGRESS_INTERVAL: usize = 500;

/// File name of the redirect map written next to the archive.
pub const REDIRECTS_FILE: &str = "redirects.map";

/// A file copied verbatim into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// File on disk.
    pub source: PathBuf,
    /// Archive path.
    pub path: String,
}

/// Settings for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory the archive and redirect map are written to.
    pub output_dir: PathBuf,
    /// File name of the archive.
    pub archive_name: String,
    /// Deflate entries instead of storing them.
    pub compression: bool,
    /// Extensions whose entries also get a `.gz` sibling.
    pub pre_compressed: Vec<String>,
    /// Skip materializing dependencies.
    pub skip_resources: bool,
    /// Worker threads; `0` uses the available parallelism.
    pub threads: usize,
    /// How documents reference resources.
    pub reference_mode: ReferenceMode,
    /// Files copied into the archive as-is.
    pub static_files: Vec<StaticFile>,
    /// Directory copied under `themes/`.
    pub theme_dir: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            archive_name: "website.zip".to_owned(),
            compression: false,
            pre_compressed: ["html", "css", "js", "json", "txt"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            skip_resources: false,
            threads: 0,
            reference_mode: ReferenceMode::default(),
            static_files: Vec::new(),
            theme_dir: None,
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Path of the written archive.
    pub archive: PathBuf,
    /// Path of the written redirect map.
    pub redirects: PathBuf,
    /// Documents rendered.
    pub documents: usize,
    /// Distinct dependencies registered.
    pub dependencies: usize,
    /// Whether dependencies were materialized.
    pub resources_written: bool,
    /// Archive entries, `.gz` siblings included.
    pub entries: usize,
    /// Uncompressed bytes written into the archive.
    pub bytes: u64,
    /// Wall time of the build.
    pub elapsed: Duration,
}

/// Runs builds with fixed options against fixed collaborator services.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: BuildOptions,
    sources: Sources,
}

impl Pipeline {
    pub fn new(options: BuildOptions, sources: Sources) -> Self {
        Self { options, sources }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the archive for `documents` framed by `shell`.
    ///
    /// On failure no archive is left in the output directory.
    pub fn build(&self, shell: &Shell, documents: &[Document]) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        if documents.is_empty() {
            tracing::warn!("No documents to build");
        }
        check_unique_paths(documents)?;

        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| BuildError::io(output_dir, e))?;
        let temp = tempfile::NamedTempFile::new_in(output_dir)
            .map_err(|e| BuildError::io(output_dir, e))?;
        let file = temp
            .as_file()
            .try_clone()
            .map_err(|e| BuildError::io(temp.path(), e))?;
        let archive = ArchiveWriter::new(file, self.options.compression, &self.options.pre_compressed);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()?;
        let registry = Arc::new(DependencyRegistry::new());

        tracing::info!(
            documents = documents.len(),
            threads = pool.current_num_threads(),
            "Rendering documents"
        );
        let drained = self.render_documents(&pool, shell, documents, &registry, &archive)?;

        let mut index_ctx = self.context(Sink::Discard, 0, &registry);
        let search_index = search_index_module(&index_entries(documents, &mut index_ctx)?)?;
        index_ctx.close()?;

        let dependencies = registry.snapshot();
        if self.options.skip_resources {
            tracing::info!(dependencies = dependencies.len(), "Skipping resources");
        } else {
            tracing::info!(dependencies = dependencies.len(), "Writing resources");
            self.materialize(&pool, &dependencies, &archive)?;
        }

        tracing::info!("Writing bundles");
        let (css, scripts) = merge_bundles(drained);
        archive.write_entry(STYLESHEET, bundle(&css).as_bytes())?;
        archive.write_entry(SCRIPT, bundle(&scripts).as_bytes())?;
        for file in &self.options.static_files {
            let bytes = fs::read(&file.source).map_err(|e| BuildError::io(&file.source, e))?;
            archive.write_entry(&file.path, &bytes)?;
        }
        if let Some(theme_dir) = &self.options.theme_dir {
            copy_tree(&archive, theme_dir, "themes")?;
        }
        archive.write_entry(&format!("{RESOURCE_DIR}/searchindex.js"), search_index.as_bytes())?;

        let stats = archive.finish()?;
        let archive_path = output_dir.join(&self.options.archive_name);
        temp.persist(&archive_path)
            .map_err(|e| BuildError::io(&archive_path, e.error))?;

        let redirects_path = output_dir.join(REDIRECTS_FILE);
        let mut redirects = redirect_lines(documents).join("\n");
        if !redirects.is_empty() {
            redirects.push('\n');
        }
        fs::write(&redirects_path, redirects).map_err(|e| BuildError::io(&redirects_path, e))?;

        let report = BuildReport {
            archive: archive_path,
            redirects: redirects_path,
            documents: documents.len(),
            dependencies: dependencies.len(),
            resources_written: !self.options.skip_resources,
            entries: stats.entries,
            bytes: stats.bytes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            archive = %report.archive.display(),
            entries = report.entries,
            bytes = report.bytes,
            elapsed_ms = report.elapsed.as_millis(),
            "Build finished"
        );
        Ok(report)
    }

    /// Phase A. Results come back in document order.
    fn render_documents(
        &self,
        pool: &ThreadPool,
        shell: &Shell,
        documents: &[Document],
        registry: &Arc<DependencyRegistry>,
        archive: &ArchiveWriter,
    ) -> Result<Vec<Drained>, BuildError> {
        let progress = Progress::new("documents");
        pool.install(|| {
            documents
                .par_iter()
                .map(|document| -> Result<Drained, BuildError> {
                    let drained = self.render_document(shell, document, registry, archive)?;
                    progress.tick();
                    Ok(drained)
                })
                .collect()
        })
    }

    fn render_document(
        &self,
        shell: &Shell,
        document: &Document,
        registry: &Arc<DependencyRegistry>,
        archive: &ArchiveWriter,
    ) -> Result<Drained, BuildError> {
        let mut ctx = self.context(Sink::Buffer(String::new()), document.folder_depth(), registry);
        document.render(shell, &mut ctx)?;
        let mut drained = ctx.close()?;
        let output = drained.output.take().unwrap_or_default();
        archive.write_entry(&document.path(), output.as_bytes())?;
        Ok(drained)
    }

    /// Phase B.
    fn materialize(
        &self,
        pool: &ThreadPool,
        dependencies: &[(String, Producer)],
        archive: &ArchiveWriter,
    ) -> Result<(), BuildError> {
        let progress = Progress::new("resources");
        pool.install(|| {
            dependencies.par_iter().try_for_each(|(path, produce)| -> Result<(), BuildError> {
                let bytes = produce(&self.sources).map_err(|source| BuildError::Dependency {
                    path: path.clone(),
                    source,
                })?;
                archive.write_entry(path, &bytes)?;
                progress.tick();
                Ok(())
            })
        })
    }

    fn context(&self, sink: Sink, depth: usize, registry: &Arc<DependencyRegistry>) -> Context {
        Context::new(sink, self.sources.clone(), Arc::clone(registry))
            .with_folder_depth(depth)
            .with_reference_mode(self.options.reference_mode)
    }
}

/// Fail if two documents would be written to the same archive path.
fn check_unique_paths(documents: &[Document]) -> Result<(), BuildError> {
    let mut seen = HashSet::with_capacity(documents.len());
    for document in documents {
        let path = document.path();
        if !seen.insert(path.clone()) {
            return Err(BuildError::DuplicatePath(path));
        }
    }
    Ok(())
}

/// Merge per-document styles and scripts in document order.
fn merge_bundles(drained: Vec<Drained>) -> (OrderedSet, OrderedSet) {
    let mut css = OrderedSet::new();
    let mut scripts = OrderedSet::new();
    for item in drained {
        css.extend(item.css);
        scripts.extend(item.scripts);
    }
    (css, scripts)
}

/// Concatenate bundle fragments, each followed by a blank line.
fn bundle(fragments: &OrderedSet) -> String {
    let mut out = String::new();
    for fragment in fragments.iter() {
        out.push_str(fragment);
        out.push_str("\n\n");
    }
    out
}

/// Copy every file below `dir` into the archive under `prefix`, in path order.
fn copy_tree(archive: &ArchiveWriter, dir: &Path, prefix: &str) -> Result<(), BuildError> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| BuildError::io(dir, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| BuildError::io(dir, e))?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let archive_path = format!("{prefix}/{name}");
        if path.is_dir() {
            copy_tree(archive, &path, &archive_path)?;
        } else {
            let bytes = fs::read(&path).map_err(|e| BuildError::io(&path, e))?;
            archive.write_entry(&archive_path, &bytes)?;
        }
    }
    Ok(())
}

/// Counts finished items and logs every [`PROGRESS_INTERVAL`].
struct Progress {
    label: &'static str,
    done: AtomicUsize,
}

impl Progress {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            done: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            tracing::info!(label = self.label, done, "Progress");
        }
    }
}
