//! Export configuration.
//!
//! Follows a builder pattern for complex configuration with validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target application of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// AppFlowy template import: block-tree JSON documents
    #[default]
    AppFlowy,
    /// Notion-style flat markdown with 32-hex page ids
    Notion,
    /// Outline JSON export with ProseMirror documents
    Outline,
}

impl ExportFormat {
    /// All supported formats, in CLI order.
    pub const ALL: [ExportFormat; 3] = [Self::AppFlowy, Self::Notion, Self::Outline];

    /// Lowercase identifier used on the command line and in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppFlowy => "appflowy",
            Self::Notion => "notion",
            Self::Outline => "outline",
        }
    }

    /// Human-readable application name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AppFlowy => "AppFlowy",
            Self::Notion => "Notion",
            Self::Outline => "Outline",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "appflowy" => Ok(Self::AppFlowy),
            "notion" => Ok(Self::Notion),
            "outline" => Ok(Self::Outline),
            other => Err(Error::config_error(format!(
                "Unknown export format '{}'. Valid options: appflowy, notion, outline",
                other
            ))),
        }
    }
}

fn default_threshold() -> f64 {
    0.8
}

fn default_excluded_dirs() -> Vec<String> {
    [".obsidian", ".trash", ".git"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

/// Configuration for one export run.
///
/// Passed explicitly through the pipeline; nothing in the workspace reads
/// run settings from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Path to the vault directory
    pub vault_path: PathBuf,
    /// Output ZIP path; derived from the vault name when absent
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Target format
    #[serde(default)]
    pub format: ExportFormat,
    /// Package (and collection) name; defaults to the vault directory name
    #[serde(default)]
    pub package_name: Option<String>,
    /// Only scan and transform, never write a package
    #[serde(default)]
    pub validate_only: bool,
    /// Enable the similarity fallback for links that match nothing exactly
    #[serde(default)]
    pub fuzzy_matching: bool,
    /// Minimum similarity (0, 1] accepted by the fallback
    #[serde(default = "default_threshold")]
    pub fuzzy_threshold: f64,
    /// Carry frontmatter into documents where the format allows it
    #[serde(default = "default_true")]
    pub include_frontmatter: bool,
    /// Directory names skipped while scanning
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

impl ExportConfig {
    /// Create a new export config with builder
    pub fn builder(vault_path: impl Into<PathBuf>) -> ExportConfigBuilder {
        ExportConfigBuilder::new(vault_path)
    }

    /// Validate the export configuration
    pub fn validate(&self) -> Result<()> {
        if self.vault_path.as_os_str().is_empty() {
            return Err(Error::config_error("Vault path cannot be empty"));
        }

        if !self.vault_path.exists() {
            return Err(Error::config_error(format!(
                "Vault path does not exist: {}",
                self.vault_path.display()
            )));
        }

        if !self.vault_path.is_dir() {
            return Err(Error::config_error(format!(
                "Vault path is not a directory: {}",
                self.vault_path.display()
            )));
        }

        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(Error::config_error(format!(
                "Fuzzy threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }

        if let Some(name) = &self.package_name
            && name.trim().is_empty()
        {
            return Err(Error::config_error("Package name cannot be empty"));
        }

        Ok(())
    }

    /// Name used for the package, the Outline collection and the default output file.
    pub fn package_name(&self) -> String {
        if let Some(name) = &self.package_name {
            return name.trim().to_string();
        }
        self.vault_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "vault".to_string())
    }

    /// Output path, defaulting to `<vault parent>/<name>_<format>.zip`.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output_path {
            return path.clone();
        }
        let file_name = format!("{}_{}.zip", self.package_name(), self.format);
        match self.vault_path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Save configuration as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::config_error(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, yaml).map_err(|e| {
            Error::config_error(format!(
                "Failed to save config to {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config_error(format!(
                "Failed to load config from {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid export configuration: {}", e)))
    }
}

/// Builder for ExportConfig
pub struct ExportConfigBuilder {
    vault_path: PathBuf,
    output_path: Option<PathBuf>,
    format: ExportFormat,
    package_name: Option<String>,
    validate_only: bool,
    fuzzy_matching: bool,
    fuzzy_threshold: f64,
    include_frontmatter: bool,
    excluded_dirs: Vec<String>,
}

impl ExportConfigBuilder {
    /// Create a new builder
    pub fn new(vault_path: impl Into<PathBuf>) -> Self {
        Self {
            vault_path: vault_path.into(),
            output_path: None,
            format: ExportFormat::default(),
            package_name: None,
            validate_only: false,
            fuzzy_matching: false,
            fuzzy_threshold: default_threshold(),
            include_frontmatter: true,
            excluded_dirs: default_excluded_dirs(),
        }
    }

    /// Set the output ZIP path
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the target format
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the package name
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    /// Only validate, do not write a package
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    /// Enable the similarity fallback with the given threshold
    pub fn fuzzy_matching(mut self, threshold: f64) -> Self {
        self.fuzzy_matching = true;
        self.fuzzy_threshold = threshold;
        self
    }

    /// Toggle frontmatter passthrough
    pub fn include_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Add a directory name to skip while scanning
    pub fn exclude_dir(mut self, dir: impl Into<String>) -> Self {
        let dir = dir.into();
        if !self.excluded_dirs.contains(&dir) {
            self.excluded_dirs.push(dir);
        }
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<ExportConfig> {
        let config = ExportConfig {
            vault_path: self.vault_path,
            output_path: self.output_path,
            format: self.format,
            package_name: self.package_name,
            validate_only: self.validate_only,
            fuzzy_matching: self.fuzzy_matching,
            fuzzy_threshold: self.fuzzy_threshold,
            include_frontmatter: self.include_frontmatter,
            excluded_dirs: self.excluded_dirs,
        };
        config.validate()?;
        Ok(config)
    }
}
