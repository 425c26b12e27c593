//! Engine configuration.
//!
//! ABM reads an optional `abm.toml` from the working directory (or the path
//! given with `--config`). Every key has a default, so an empty or missing
//! file yields a working production setup.
//!
//! # File Format
//!
//! ```toml
//! profile = "production"            # or "development"
//! resolution_strategy = ["webapp", "file", "cdn"]
//! aggregation = true
//! minification = true
//! versioning = "content-hash"       # "asset", "fixed" or "content-hash"
//! fixed_version = "1.0"
//! cache_max_entries = 0             # 0 = unbounded
//! aggregation_url_prefix = "/abm/aggregate"
//! file_url_prefix = "/abm/file"
//! context_path = "/shop"
//! bundles_dir = "bundles"
//! webapp_root = "src/main/webapp"
//! file_root = "."
//!
//! [processors]                      # default chain per asset type
//! css = ["css-url-rewriting"]
//! js = []
//!
//! [minifiers]                       # minifier per asset type
//! css = "css-min"
//! js = "js-min"
//! ```
//!
//! Relative paths are resolved against the directory containing the file.
//!
//! # Profiles
//!
//! The development profile turns aggregation and minification off whatever
//! the flags say, so assets are served one by one and readable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CDN_LOCATION, CSS_MIN, CSS_URL_REWRITING, DEFAULT_AGGREGATION_URL_PREFIX, DEFAULT_BUNDLES_DIR,
    DEFAULT_FILE_URL_PREFIX, FILE_LOCATION, JS_MIN, WEBAPP_LOCATION,
};
use crate::core::{AbmError, AssetType};

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Aggregation and minification follow their flags
    #[default]
    Production,
    /// Aggregation and minification are always off
    Development,
}

fn default_resolution_strategy() -> Vec<String> {
    vec![WEBAPP_LOCATION.to_string(), FILE_LOCATION.to_string(), CDN_LOCATION.to_string()]
}

fn default_processors() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (AssetType::Css.extension().to_string(), vec![CSS_URL_REWRITING.to_string()]),
        (AssetType::Js.extension().to_string(), Vec::new()),
        (AssetType::Less.extension().to_string(), vec![CSS_URL_REWRITING.to_string()]),
    ])
}

fn default_minifiers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (AssetType::Css.extension().to_string(), CSS_MIN.to_string()),
        (AssetType::Js.extension().to_string(), JS_MIN.to_string()),
    ])
}

const fn default_true() -> bool {
    true
}

fn default_versioning() -> String {
    "asset".to_string()
}

fn default_fixed_version() -> String {
    "1.0".to_string()
}

fn default_aggregation_url_prefix() -> String {
    DEFAULT_AGGREGATION_URL_PREFIX.to_string()
}

fn default_file_url_prefix() -> String {
    DEFAULT_FILE_URL_PREFIX.to_string()
}

fn default_bundles_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUNDLES_DIR)
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Engine configuration, as read from `abm.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deployment profile
    #[serde(default)]
    pub profile: Profile,

    /// Location keys in order of preference
    #[serde(default = "default_resolution_strategy")]
    pub resolution_strategy: Vec<String>,

    /// Default processor chain per asset type extension
    #[serde(default = "default_processors")]
    pub processors: BTreeMap<String, Vec<String>>,

    /// Minifier processor key per asset type extension
    #[serde(default = "default_minifiers")]
    pub minifiers: BTreeMap<String, String>,

    /// Whether assets of the same type are aggregated
    #[serde(default = "default_true")]
    pub aggregation: bool,

    /// Whether assets are minified
    #[serde(default = "default_true")]
    pub minification: bool,

    /// Name of the versioning strategy
    #[serde(default = "default_versioning")]
    pub versioning: String,

    /// Version used by the `fixed` strategy
    #[serde(default = "default_fixed_version")]
    pub fixed_version: String,

    /// Maximum number of stored entries; 0 means unbounded
    #[serde(default)]
    pub cache_max_entries: u64,

    /// URL prefix under which aggregates are served
    #[serde(default = "default_aggregation_url_prefix")]
    pub aggregation_url_prefix: String,

    /// URL prefix under which `file` assets are served from the store
    #[serde(default = "default_file_url_prefix")]
    pub file_url_prefix: String,

    /// Context path of the web application
    #[serde(default)]
    pub context_path: String,

    /// Directory holding JSON bundle definitions
    #[serde(default = "default_bundles_dir")]
    pub bundles_dir: PathBuf,

    /// Root of the `webapp` locator
    #[serde(default = "default_root")]
    pub webapp_root: PathBuf,

    /// Root of the `file` locator
    #[serde(default = "default_root")]
    pub file_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            resolution_strategy: default_resolution_strategy(),
            processors: default_processors(),
            minifiers: default_minifiers(),
            aggregation: default_true(),
            minification: default_true(),
            versioning: default_versioning(),
            fixed_version: default_fixed_version(),
            cache_max_entries: 0,
            aggregation_url_prefix: default_aggregation_url_prefix(),
            file_url_prefix: default_file_url_prefix(),
            context_path: String::new(),
            bundles_dir: default_bundles_dir(),
            webapp_root: default_root(),
            file_root: default_root(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path`, or defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if it fails [`validate`](Self::validate).
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// Relative directories in the file are resolved against the file's
    /// parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (permissions, not found, etc.)
    /// - The file contains invalid TOML syntax
    /// - A value is invalid (see [`validate`](Self::validate))
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(AbmError::from)
            .with_context(|| format!("Failed to parse configuration from {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Make relative directories relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for dir in [&mut self.bundles_dir, &mut self.webapp_root, &mut self.file_root] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    /// Check values that have no sensible fallback.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), AbmError> {
        if self.resolution_strategy.iter().all(|key| key.trim().is_empty()) {
            return Err(AbmError::ConfigError {
                message: "resolution_strategy must name at least one location key".to_string(),
            });
        }

        if self.versioning.trim().is_empty() {
            return Err(AbmError::ConfigError {
                message: "versioning must name a strategy".to_string(),
            });
        }

        for key in self.processors.keys().chain(self.minifiers.keys()) {
            if AssetType::from_extension(key).is_none() {
                return Err(AbmError::ConfigError {
                    message: format!("Unknown asset type '{key}' (expected css, js or less)"),
                });
            }
        }

        for (name, prefix) in
            [("aggregation_url_prefix", &self.aggregation_url_prefix), ("file_url_prefix", &self.file_url_prefix)]
        {
            if prefix.trim().is_empty() {
                return Err(AbmError::ConfigError {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        Ok(())
    }

    /// Whether the development profile is active.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.profile == Profile::Development
    }

    /// Whether aggregation runs, taking the profile into account.
    #[must_use]
    pub fn aggregation_enabled(&self) -> bool {
        self.aggregation && !self.is_development()
    }

    /// Whether minification runs, taking the profile into account.
    #[must_use]
    pub fn minification_enabled(&self) -> bool {
        self.minification && !self.is_development()
    }

    /// Default processor chain for a type; empty when none is configured.
    #[must_use]
    pub fn default_chain(&self, asset_type: AssetType) -> &[String] {
        self.processors.get(asset_type.extension()).map_or(&[], Vec::as_slice)
    }

    /// Minifier key for a type.
    #[must_use]
    pub fn minifier_for(&self, asset_type: AssetType) -> Option<&String> {
        self.minifiers.get(asset_type.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.resolution_strategy, vec!["webapp", "file", "cdn"]);
        assert_eq!(config.default_chain(AssetType::Css), ["css-url-rewriting".to_string()]);
        assert!(config.default_chain(AssetType::Js).is_empty());
        assert_eq!(config.minifier_for(AssetType::Js).map(String::as_str), Some("js-min"));
        assert!(config.minifier_for(AssetType::Less).is_none());
        assert!(config.aggregation_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_profile_overrides_flags() {
        let config = EngineConfig {
            profile: Profile::Development,
            ..EngineConfig::default()
        };
        assert!(config.aggregation);
        assert!(!config.aggregation_enabled());
        assert!(!config.minification_enabled());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            profile = "development"
            versioning = "content-hash"

            [processors]
            js = ["js-min"]
            "#,
        )
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.versioning, "content-hash");
        assert_eq!(config.default_chain(AssetType::Js), ["js-min".to_string()]);
        // a [processors] table replaces the whole default map
        assert!(config.default_chain(AssetType::Css).is_empty());
        assert_eq!(config.resolution_strategy, default_resolution_strategy());
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let mut config = EngineConfig::default();
        config.minifiers.insert("sass".to_string(), "sass-min".to_string());
        assert!(matches!(config.validate(), Err(AbmError::ConfigError { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_strategy() {
        let config = EngineConfig {
            resolution_strategy: vec![],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_url_prefix() {
        let config = EngineConfig {
            file_url_prefix: " ".to_string(),
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("file_url_prefix"), "{err}");
    }

    #[tokio::test]
    async fn test_load_from_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abm.toml");
        std::fs::write(&path, "bundles_dir = \"defs\"\nwebapp_root = \"web\"\n").unwrap();

        let config = EngineConfig::load_from(&path).await.unwrap();
        assert_eq!(config.bundles_dir, dir.path().join("defs"));
        assert_eq!(config.webapp_root, dir.path().join("web"));
        assert_eq!(config.file_root, dir.path().join("."));
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_or_default(&dir.path().join("abm.toml")).await.unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abm.toml");
        std::fs::write(&path, "profile = [").unwrap();

        let err = EngineConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration"));
    }
}
