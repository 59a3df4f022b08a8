//! Layered run settings: an optional settings file, then `VAULTPORT_*`
//! environment variables. Command-line flags are applied on top by the caller.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use vaultport_core::{Error, ExportConfig, ExportConfigBuilder, ExportFormat, Result};

/// Environment variable prefix (`VAULTPORT_FORMAT=notion`, ...)
pub const ENV_PREFIX: &str = "VAULTPORT";

/// Settings that may come from a file or the environment. Every field is
/// optional; unset fields keep the builder defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Settings {
    pub output_path: Option<PathBuf>,
    pub format: Option<String>,
    pub package_name: Option<String>,
    pub validate_only: Option<bool>,
    pub fuzzy_matching: Option<bool>,
    pub fuzzy_threshold: Option<f64>,
    pub include_frontmatter: Option<bool>,
    pub excluded_dirs: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from `file` (if given) and the process environment.
    /// A missing file is an error; the format follows the file extension.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            if !path.is_file() {
                return Err(Error::file_not_found(path));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_dirs"),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .map_err(|e| Error::config_error(format!("Invalid settings: {}", e)))
    }

    /// Apply these settings to a config builder.
    pub fn apply(&self, mut builder: ExportConfigBuilder) -> Result<ExportConfigBuilder> {
        if let Some(path) = &self.output_path {
            builder = builder.output_path(path);
        }
        if let Some(format) = &self.format {
            builder = builder.format(format.parse::<ExportFormat>()?);
        }
        if let Some(name) = &self.package_name {
            builder = builder.package_name(name);
        }
        if let Some(validate_only) = self.validate_only {
            builder = builder.validate_only(validate_only);
        }
        if self.fuzzy_matching == Some(true) || self.fuzzy_threshold.is_some() {
            let threshold = self
                .fuzzy_threshold
                .unwrap_or(vaultport_graph::SimilarityMatcher::DEFAULT_THRESHOLD);
            builder = builder.fuzzy_matching(threshold);
        }
        if let Some(include) = self.include_frontmatter {
            builder = builder.include_frontmatter(include);
        }
        for dir in self.excluded_dirs.iter().flatten() {
            builder = builder.exclude_dir(dir);
        }
        Ok(builder)
    }

    /// Build a validated configuration for `vault`.
    pub fn into_config(self, vault: impl Into<PathBuf>) -> Result<ExportConfig> {
        self.apply(ExportConfig::builder(vault))?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_settings_applied() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("vaultport.yaml");
        fs::write(
            &file,
            "format: outline\npackage_name: Team Notes\nfuzzy_threshold: 0.7\nexcluded_dirs:\n  - templates\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&file)).unwrap();
        assert_eq!(settings.format.as_deref(), Some("outline"));

        let config = settings.into_config(dir.path()).unwrap();
        assert_eq!(config.format, ExportFormat::Outline);
        assert_eq!(config.package_name(), "Team Notes");
        assert!(config.fuzzy_matching);
        assert_eq!(config.fuzzy_threshold, 0.7);
        assert!(config.excluded_dirs.contains(&"templates".to_string()));
        assert!(config.excluded_dirs.contains(&".obsidian".to_string()));
    }

    #[test]
    fn test_missing_settings_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_bad_format_rejected() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            format: Some("evernote".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.into_config(dir.path()),
            Err(Error::ConfigError { .. })
        ));
    }

    #[test]
    fn test_defaults_untouched() {
        let dir = TempDir::new().unwrap();
        let config = Settings::default().into_config(dir.path()).unwrap();
        assert_eq!(config.format, ExportFormat::default());
        assert!(!config.fuzzy_matching);
        assert!(config.include_frontmatter);
    }
}
