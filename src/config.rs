use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use crate::{
    codec::highlight::{available_themes, DEFAULT_THEME},
    error::SiteError,
    redirect::{default_shapes, LegacyShape},
};

/// Overrides [BuildConfig::base_url].
pub const BASE_URL_ENV: &str = "PEPSITE_BASE_URL";
/// Seconds since the epoch; sets [BuildConfig::build_timestamp] for reproducible builds.
pub const SOURCE_DATE_EPOCH_ENV: &str = "SOURCE_DATE_EPOCH";

fn default_source_dir() -> PathBuf {
    PathBuf::from("peps")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

fn default_site_title() -> String {
    "Python Enhancement Proposals".to_string()
}

fn default_site_root() -> String {
    "/".to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

/// Everything one build needs to know besides the documents themselves.
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File extensions (without the dot) treated as documents.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_site_title")]
    pub site_title: String,
    /// URL path prefix the site is served under.
    #[serde(default = "default_site_root")]
    pub site_root: String,
    /// Absolute origin used for canonical links and the sitemap.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_theme")]
    pub highlight_theme: String,
    /// Worker threads; defaults to the number of available cores.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Remove the output directory before writing.
    #[serde(default)]
    pub clean: bool,
    /// Shown on index pages only.
    #[serde(default)]
    pub build_timestamp: Option<DateTime<Utc>>,
    /// Historical URL shapes to redirect. Must stay the last field: TOML tables follow plain values.
    #[serde(default = "default_shapes")]
    pub legacy_shapes: Vec<LegacyShape>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            extensions: default_extensions(),
            site_title: default_site_title(),
            site_root: default_site_root(),
            base_url: None,
            highlight_theme: default_theme(),
            jobs: None,
            clean: false,
            build_timestamp: None,
            legacy_shapes: default_shapes(),
        }
    }
}

impl BuildConfig {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        BuildConfig {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            ..BuildConfig::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, SiteError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file. Relative directories in the file are resolved against the
    /// file's own directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let path = path.as_ref();
        tracing::debug!("Reading config from: {:?}", path);
        let mut config = Self::from_toml(&read_to_string(path)?)?;
        if let Some(dir) = path.parent() {
            if config.source_dir.is_relative() {
                config.source_dir = dir.join(&config.source_dir);
            }
            if config.output_dir.is_relative() {
                config.output_dir = dir.join(&config.output_dir);
            }
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, SiteError> {
        Ok(toml::to_string(self)?)
    }

    /// Apply `PEPSITE_BASE_URL` and `SOURCE_DATE_EPOCH` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), SiteError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, var: F) -> Result<(), SiteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = var(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using base URL from {}", BASE_URL_ENV);
            self.base_url = Some(base_url.trim().to_string());
        }
        if let Some(epoch) = var(SOURCE_DATE_EPOCH_ENV).filter(|v| !v.trim().is_empty()) {
            let seconds = epoch.trim().parse::<i64>().map_err(|e| {
                SiteError::Config(format!("{SOURCE_DATE_EPOCH_ENV} '{epoch}': {e}"))
            })?;
            let stamp = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
                SiteError::Config(format!("{SOURCE_DATE_EPOCH_ENV} '{epoch}' is out of range"))
            })?;
            self.build_timestamp = Some(stamp);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SiteError> {
        if let Some(base_url) = &self.base_url {
            let parsed = url::Url::parse(base_url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SiteError::Config(format!(
                    "base_url must be http(s), got '{base_url}'"
                )));
            }
        }
        if self.jobs == Some(0) {
            return Err(SiteError::Config("jobs must be at least 1".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(SiteError::Config(
                "at least one document extension is required".to_string(),
            ));
        }
        if !available_themes().contains(&self.highlight_theme) {
            return Err(SiteError::Config(format!(
                "unknown highlight theme '{}' (available: {})",
                self.highlight_theme,
                available_themes().join(", ")
            )));
        }
        for shape in self.legacy_shapes.iter() {
            if !shape.prefix().starts_with('/') {
                return Err(SiteError::Config(format!(
                    "legacy shape prefix '{}' must start with '/'",
                    shape.prefix()
                )));
            }
        }
        Ok(())
    }

    /// Whether `path` has one of the configured document extensions.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}
