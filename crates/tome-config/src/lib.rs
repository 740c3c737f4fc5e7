//! Configuration management for tome.
//!
//! Parses `tome.toml` with serde, auto-discovering it in the current
//! directory and its parents. CLI settings are applied during load via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` expands to the value of VAR, errors if unset
//! - `${VAR:-default}` expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.deployment_url`
//! - `compositor.command`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tome.toml";

/// Accepted values of `build.reference_mode`.
///
/// Mirrors the names parsed by `tome_html::ReferenceMode`; this crate does
/// not depend on the renderer, so the CLI checks the two agree.
pub const REFERENCE_MODES: &[&str] = &["external", "internal", "data-uri"];

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override worker pool size.
    pub threads: Option<usize>,
    /// Override resource reference mode.
    pub reference_mode: Option<String>,
    /// Override the skip-resources flag.
    pub skip_resources: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site identity.
    pub site: SiteConfig,
    /// Build settings (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Remote fetch settings.
    pub remote: RemoteConfig,
    /// External compositing tool (optional section).
    pub compositor: Option<CompositorConfig>,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Site identity shown in every page head.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name for `og:site_name`.
    pub name: String,
    /// Prefix of every page title.
    pub abbreviation: String,
    /// Public base URL, always ending with `/` after loading.
    pub deployment_url: Option<String>,
    /// Value of `<html lang=…>`.
    pub lang: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "tome".to_owned(),
            abbreviation: "tome".to_owned(),
            deployment_url: None,
            lang: "en".to_owned(),
        }
    }
}

/// Raw build configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BuildConfigRaw {
    output_dir: Option<String>,
    resource_dir: Option<String>,
    asset_dir: Option<String>,
    archive_name: Option<String>,
    compression: Option<bool>,
    pre_compressed: Option<Vec<String>>,
    skip_resources: Option<bool>,
    threads: Option<usize>,
    reference_mode: Option<String>,
    static_files: Option<Vec<String>>,
    theme_dir: Option<String>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug)]
pub struct BuildConfig {
    /// Where the archive and redirect map are written.
    pub output_dir: PathBuf,
    /// Root of static files and the asset store.
    pub resource_dir: PathBuf,
    /// Asset store root.
    pub asset_dir: PathBuf,
    /// Archive file name inside `output_dir`.
    pub archive_name: String,
    /// Deflate entries instead of storing them.
    pub compression: bool,
    /// Extensions that get a `.gz` sibling entry.
    pub pre_compressed: Vec<String>,
    /// Skip writing dependency files.
    pub skip_resources: bool,
    /// Worker pool size, 0 for available parallelism.
    pub threads: usize,
    /// One of [`REFERENCE_MODES`].
    pub reference_mode: String,
    /// Files under `resource_dir` copied into the archive root.
    pub static_files: Vec<String>,
    /// Directory copied under `themes/`.
    pub theme_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."), &BuildConfigRaw::default())
    }
}

impl BuildConfig {
    fn with_base(base: &Path, raw: &BuildConfigRaw) -> Self {
        let resolve = |path: Option<&str>, default: &str| base.join(path.unwrap_or(default));
        let resource_dir = resolve(raw.resource_dir.as_deref(), "rsc");

        Self {
            output_dir: resolve(raw.output_dir.as_deref(), "output"),
            asset_dir: resource_dir.join(raw.asset_dir.as_deref().unwrap_or("assets")),
            resource_dir,
            archive_name: raw
                .archive_name
                .clone()
                .unwrap_or_else(|| "website.zip".to_owned()),
            compression: raw.compression.unwrap_or(false),
            pre_compressed: raw.pre_compressed.clone().unwrap_or_else(|| {
                ["html", "css", "js", "json", "txt"]
                    .map(str::to_owned)
                    .to_vec()
            }),
            skip_resources: raw.skip_resources.unwrap_or(false),
            threads: raw.threads.unwrap_or(0),
            reference_mode: raw
                .reference_mode
                .clone()
                .unwrap_or_else(|| "internal".to_owned()),
            static_files: raw
                .static_files
                .clone()
                .unwrap_or_else(|| vec!["favicon.ico".to_owned()]),
            theme_dir: raw.theme_dir.as_deref().map(|dir| base.join(dir)),
        }
    }
}

/// Remote fetch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl RemoteConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External compositing tool.
#[derive(Debug, Deserialize)]
pub struct CompositorConfig {
    /// Program to run.
    pub command: String,
    /// Arguments passed before any per-resource arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.deployment_url`").
        field: String,
        /// Error message (e.g., "${`TOME_URL`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `tome.toml` in the current directory and its parents, falling back
    /// to defaults relative to the current directory.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// The deployment URL, which every build needs for absolute links.
    pub fn require_deployment_url(&self) -> Result<&str, ConfigError> {
        self.site
            .deployment_url
            .as_deref()
            .ok_or_else(|| ConfigError::Validation("site.deployment_url must be set".to_owned()))
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(threads) = settings.threads {
            self.build_resolved.threads = threads;
        }
        if let Some(reference_mode) = &settings.reference_mode {
            self.build_resolved.reference_mode.clone_from(reference_mode);
        }
        if let Some(skip_resources) = settings.skip_resources {
            self.build_resolved.skip_resources = skip_resources;
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            build_resolved: BuildConfig::with_base(base, &BuildConfigRaw::default()),
            ..Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.normalize();

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values. Called automatically after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.site.deployment_url {
            require_http_url(url, "site.deployment_url")?;
        }
        require_non_empty(&self.site.lang, "site.lang")?;
        require_non_empty(&self.build_resolved.archive_name, "build.archive_name")?;

        let mode = &self.build_resolved.reference_mode;
        if !REFERENCE_MODES.contains(&mode.as_str()) {
            return Err(ConfigError::Validation(format!(
                "build.reference_mode must be one of {}, got `{mode}`",
                REFERENCE_MODES.join(", ")
            )));
        }

        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        if let Some(compositor) = &self.compositor {
            require_non_empty(&compositor.command, "compositor.command")?;
        }

        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = &self.site.deployment_url {
            self.site.deployment_url = Some(expand::expand_env(url, "site.deployment_url")?);
        }
        if let Some(ref mut compositor) = self.compositor {
            compositor.command = expand::expand_env(&compositor.command, "compositor.command")?;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        if let Some(url) = &mut self.site.deployment_url
            && !url.ends_with('/')
        {
            url.push('/');
        }
        for ext in self.build.pre_compressed.iter_mut().flatten() {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        self.build_resolved = BuildConfig::with_base(config_dir, &self.build);
    }
}
