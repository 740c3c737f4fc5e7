//! `tome build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tome_config::{CliSettings, Config};
use tome_html::{ReferenceMode, Shell};
use tome_site::{BuildOptions, BuildReport, Pipeline, StaticFile};
use tome_sources::{
    AssetStore, Compositor, DataProvider, DirAssetStore, EmptyData, HttpFetcher, JsonDataSet,
    RemoteCache, Sources,
};

use crate::error::CliError;
use crate::output::Output;
use crate::pages;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover tome.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record data set (JSON with a top-level `tables` object).
    #[arg(short, long, env = "TOME_DATA")]
    data: Option<PathBuf>,

    /// Output directory for the archive and redirect map (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Worker pool size (overrides config).
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// How resources are referenced: external, internal or data-uri.
    #[arg(long)]
    reference_mode: Option<String>,

    /// Do not write dependency files into the archive.
    #[arg(long)]
    skip_resources: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl BuildArgs {
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output_dir.clone(),
            threads: self.threads,
            reference_mode: self.reference_mode.clone(),
            skip_resources: self.skip_resources.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config = ?config.config_path, "Loaded configuration");
        let deployment_url = config.require_deployment_url()?;

        let data: Arc<dyn DataProvider> = match &self.data {
            Some(path) => Arc::new(JsonDataSet::load(path)?),
            None => {
                output.warning("No data set given (--data), building the index page only");
                Arc::new(EmptyData)
            }
        };
        let assets: Arc<dyn AssetStore> =
            Arc::new(DirAssetStore::new(config.build_resolved.asset_dir.clone()));
        let remote = Arc::new(RemoteCache::new(Box::new(HttpFetcher::new(
            config.remote.timeout(),
        ))));
        let mut sources = Sources::new(Arc::clone(&data), Arc::clone(&assets), remote);
        if let Some(compositor) = &config.compositor {
            sources = sources.with_compositor(Compositor::new(
                compositor.command.clone(),
                compositor.args.clone(),
            ));
        }

        let records = pages::record_documents(data.as_ref(), assets.as_ref())?;
        let mut documents = vec![pages::index_document(&config.site.name, records.clone())];
        documents.extend(records);

        let site_name = config.site.name.clone();
        let version = version.to_owned();
        let shell = Shell::new(&config.site.name, &config.site.abbreviation, deployment_url)
            .with_lang(&config.site.lang)
            .with_css(pages::SITE_CSS)
            .with_header(move |_ctx| pages::header(&site_name))
            .with_footer(move |_ctx| pages::footer(&version));

        let options = build_options(&config, &output)?;
        output.highlight(&format!(
            "Building {} documents into {}",
            documents.len(),
            options.output_dir.display()
        ));

        let report = Pipeline::new(options, sources).build(&shell, &documents)?;
        print_report(&output, &report);
        Ok(())
    }
}

/// Pipeline options from the resolved configuration.
///
/// Missing static files and theme directories are skipped with a warning.
fn build_options(config: &Config, output: &Output) -> Result<BuildOptions, CliError> {
    let build = &config.build_resolved;
    let reference_mode = build
        .reference_mode
        .parse::<ReferenceMode>()
        .map_err(|e| CliError::Validation(e.to_string()))?;

    let static_files = build
        .static_files
        .iter()
        .filter_map(|name| {
            let source = build.resource_dir.join(name);
            if source.is_file() {
                Some(StaticFile {
                    source,
                    path: name.clone(),
                })
            } else {
                output.warning(&format!(
                    "Static file not found, skipping: {}",
                    source.display()
                ));
                None
            }
        })
        .collect();

    let theme_dir = build.theme_dir.clone().filter(|dir| {
        let exists = dir.is_dir();
        if !exists {
            output.warning(&format!(
                "Theme directory not found, skipping: {}",
                dir.display()
            ));
        }
        exists
    });

    Ok(BuildOptions {
        output_dir: build.output_dir.clone(),
        archive_name: build.archive_name.clone(),
        compression: build.compression,
        pre_compressed: build.pre_compressed.clone(),
        skip_resources: build.skip_resources,
        threads: build.threads,
        reference_mode,
        static_files,
        theme_dir,
    })
}

fn print_report(output: &Output, report: &BuildReport) {
    output.info(&format!("Documents: {}", report.documents));
    if report.resources_written {
        output.info(&format!("Resources: {}", report.dependencies));
    } else {
        output.warning(&format!("Resources: {} (skipped)", report.dependencies));
    }
    output.info(&format!("Redirects: {}", report.redirects.display()));
    output.success(&format!(
        "Built {} ({} entries, {} bytes) in {:.2?}",
        report.archive.display(),
        report.entries,
        report.bytes,
        report.elapsed
    ));
}
