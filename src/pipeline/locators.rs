//! Built-in locators.
//!
//! | Key      | Locator             | Final location              | Content              |
//! |----------|---------------------|-----------------------------|----------------------|
//! | `webapp` | [`WebappLocator`]   | context path + raw path     | read from webapp dir |
//! | `file`   | [`FileLocator`]     | URL prefix + raw path       | read from root dir   |
//! | `cdn`    | [`CdnLocator`]      | raw URL, unchanged          | never fetched        |
//! | `memory` | [`InMemoryLocator`] | raw name                    | registered bytes     |
//!
//! Local locators refuse raw locations containing `..` so an asset definition
//! cannot read outside its root directory.

use anyhow::{Context, Result, anyhow, bail};
use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};

use super::{Locator, RequestContext, join_url};
use crate::constants::{CDN_LOCATION, FILE_LOCATION, WEBAPP_LOCATION};
use crate::core::AssetUnit;

/// Relative form of a raw location, rejecting parent directory references.
fn relative_path(raw: &str) -> Result<&Path> {
    let relative = Path::new(raw.trim().trim_start_matches('/'));
    for component in relative.components() {
        if component == Component::ParentDir {
            bail!("Location contains parent directory reference (..): {raw}");
        }
    }
    Ok(relative)
}

/// Join a raw location below `root`.
fn path_below(root: &Path, raw: &str) -> Result<PathBuf> {
    Ok(root.join(relative_path(raw)?))
}

/// Assets packaged with the web application.
///
/// Raw locations are paths relative to the webapp root; the final location is
/// prefixed with the request's context path.
#[derive(Debug, Clone)]
pub struct WebappLocator {
    root: PathBuf,
}

impl WebappLocator {
    /// Locator reading from the webapp directory `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }
}

impl Locator for WebappLocator {
    fn key(&self) -> &str {
        WEBAPP_LOCATION
    }

    fn resolve(&self, _asset: &AssetUnit, raw: &str, request: &RequestContext) -> String {
        join_url(&request.context_path, raw)
    }

    fn fetch_content(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> Result<Vec<u8>> {
        let path = path_below(&self.root, raw)?;
        std::fs::read(&path).with_context(|| format!("Failed to read webapp asset {}", path.display()))
    }
}

/// Assets on the local filesystem below a root directory.
///
/// Files are not reachable by the browser, so the final location is the raw
/// path below a serving URL prefix and the content is served from the store.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
    url_prefix: String,
}

impl FileLocator {
    /// Locator reading below `root`, served under `url_prefix`.
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }
}

impl Locator for FileLocator {
    fn key(&self) -> &str {
        FILE_LOCATION
    }

    fn resolve(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> String {
        let path = relative_path(raw)
            .map_or_else(|_| raw.trim().to_string(), |path| path.to_string_lossy().replace('\\', "/"));
        join_url(&self.url_prefix, &path)
    }

    fn fetch_content(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> Result<Vec<u8>> {
        let path = path_below(&self.root, raw)?;
        std::fs::read(&path).with_context(|| format!("Failed to read asset file {}", path.display()))
    }
}

/// Assets served from a content delivery network.
///
/// The URL is emitted as-is and the content is never downloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdnLocator;

impl Locator for CdnLocator {
    fn key(&self) -> &str {
        CDN_LOCATION
    }

    fn resolve(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> String {
        raw.trim().to_string()
    }

    fn fetch_content(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> Result<Vec<u8>> {
        Err(anyhow!("Remote content is not fetched: {raw}"))
    }

    fn is_remote(&self) -> bool {
        true
    }
}

/// Assets whose content is supplied programmatically.
///
/// Content has no URL of its own, so caching is always forced and the asset
/// is served from the store.
#[derive(Debug, Default)]
pub struct InMemoryLocator {
    key: String,
    contents: DashMap<String, Vec<u8>>,
}

impl InMemoryLocator {
    /// Locator registered under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            contents: DashMap::new(),
        }
    }

    /// Register or replace the content served for a raw location.
    pub fn insert(&self, raw: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.contents.insert(raw.into(), content.into());
    }
}

impl Locator for InMemoryLocator {
    fn key(&self) -> &str {
        &self.key
    }

    fn resolve(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> String {
        raw.to_string()
    }

    fn fetch_content(&self, _asset: &AssetUnit, raw: &str, _request: &RequestContext) -> Result<Vec<u8>> {
        self.contents
            .get(raw)
            .map(|content| content.value().clone())
            .ok_or_else(|| anyhow!("No in-memory content registered for '{raw}'"))
    }

    fn is_caching_forced(&self) -> bool {
        true
    }
}
