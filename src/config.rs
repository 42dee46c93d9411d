//! Configuration file support
//!
//! Settings are read from TOML, looked up in this order:
//!
//! 1. `./pdf-a11y-tagger.toml`
//! 2. `<config dir>/pdf-a11y-tagger/config.toml`
//!
//! Command-line flags override file values through [`CliOverrides`].
//!
//! ```toml
//! [classify]
//! heading1_ratio = 0.9
//! heading2_ratio = 0.75
//! bullet_chars = ["-", "•"]
//! threshold_scope = "document"
//! mcid_scope = "page"
//!
//! [extract]
//! y_tolerance = 3.0
//! merge_lines = true
//!
//! [metadata]
//! lang = "en-US"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classify::{ClassifyOptions, McidScope, ThresholdScope};
use crate::layout::ExtractOptions;
use crate::metadata::DocumentMetadata;
use crate::pipeline::TaggingOptions;

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "pdf-a11y-tagger.toml";

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "pdf-a11y-tagger";

/// Config error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// `[classify]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub heading1_ratio: Option<f32>,
    pub heading2_ratio: Option<f32>,
    pub bullet_chars: Option<Vec<char>>,
    pub threshold_scope: Option<ThresholdScope>,
    pub mcid_scope: Option<McidScope>,
}

/// `[extract]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub y_tolerance: Option<f32>,
    pub merge_lines: Option<bool>,
}

/// `[metadata]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: Option<String>,
    pub lang: Option<String>,
}

/// File configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classify: ClassifyConfig,
    pub extract: ExtractConfig,
    pub metadata: MetadataConfig,
}

impl Config {
    /// Candidate config files, highest priority first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Combine file values and CLI overrides (CLI wins) into run options
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> TaggingOptions {
        let mut classify = ClassifyOptions::builder();
        if let Some(ratio) = cli.heading1_ratio.or(self.classify.heading1_ratio) {
            classify = classify.heading1_ratio(ratio);
        }
        if let Some(ratio) = cli.heading2_ratio.or(self.classify.heading2_ratio) {
            classify = classify.heading2_ratio(ratio);
        }
        if let Some(chars) = &self.classify.bullet_chars {
            classify = classify.bullet_chars(chars.iter().copied());
        }
        if let Some(scope) = cli.threshold_scope.or(self.classify.threshold_scope) {
            classify = classify.threshold_scope(scope);
        }
        if let Some(scope) = cli.mcid_scope.or(self.classify.mcid_scope) {
            classify = classify.mcid_scope(scope);
        }

        let mut extract = ExtractOptions::builder();
        if let Some(tolerance) = cli.y_tolerance.or(self.extract.y_tolerance) {
            extract = extract.y_tolerance(tolerance);
        }
        if let Some(merge) = cli.merge_lines.or(self.extract.merge_lines) {
            extract = extract.merge_lines(merge);
        }

        let mut metadata = DocumentMetadata::default();
        if let Some(title) = cli.title.clone().or_else(|| self.metadata.title.clone()) {
            metadata = metadata.with_title(title);
        }
        if let Some(lang) = cli.lang.clone().or_else(|| self.metadata.lang.clone()) {
            metadata = metadata.with_lang(lang);
        }
        if cli.skip_metadata {
            metadata = DocumentMetadata::none();
        }

        TaggingOptions {
            extract: extract.build(),
            classify: classify.build(),
            metadata,
            alt_text: None,
            in_place: cli.in_place,
        }
    }
}

/// Values given on the command line; `None` leaves the file value in place
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub heading1_ratio: Option<f32>,
    pub heading2_ratio: Option<f32>,
    pub threshold_scope: Option<ThresholdScope>,
    pub mcid_scope: Option<McidScope>,
    pub y_tolerance: Option<f32>,
    pub merge_lines: Option<bool>,
    pub title: Option<String>,
    pub lang: Option<String>,
    pub skip_metadata: bool,
    pub in_place: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Tests
// ============================================================
