//! Asset type definitions and the [`AssetUnit`] data model
//!
//! An asset is a single web resource (a stylesheet, a script or a LESS source)
//! that belongs to a bundle. This module defines:
//!
//! - [`AssetType`] - The kind of asset, derived from the file extension when not
//!   declared explicitly
//! - [`DomPosition`] - Where the asset is injected in the page
//! - [`AssetUnit`] - The declaration of one asset with its candidate locations
//!
//! # Identity
//!
//! Two assets are the *same* asset when their names are equal ignoring case and
//! their types are equal. This identity drives consolidation in the
//! [`BundleStore`](crate::resolver::BundleStore): a later declaration of an
//! existing asset overwrites it in place instead of creating a duplicate.
//!
//! # Locations
//!
//! An asset lists one or more candidate locations keyed by locator name
//! (`webapp`, `file`, `cdn`, ...). The pipeline picks one of them at request
//! time according to the configured resolution strategy.
//!
//! # Examples
//!
//! ```rust
//! use abm_cli::core::{AssetType, AssetUnit};
//!
//! let asset = AssetUnit::new("jquery", "3.7.1")
//!     .with_location("webapp", "/js/jquery.js")
//!     .with_location("cdn", "https://cdn.example.com/jquery.min.js");
//!
//! assert_eq!(asset.resolved_type(), Some(AssetType::Js));
//! assert_eq!(asset.key(), "jquery.js");
//! ```

use crate::core::AbmError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of web asset handled by the engine
///
/// Serialized in lowercase (`"css"`, `"js"`, `"less"`) in bundle definitions
/// and configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// Cascading style sheet
    Css,
    /// JavaScript
    Js,
    /// LESS stylesheet source
    Less,
}

impl AssetType {
    /// All known asset types, in declaration order
    pub const ALL: [Self; 3] = [Self::Css, Self::Js, Self::Less];

    /// File extension (without the dot) used for this type.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
            Self::Less => "less",
        }
    }

    /// Map a file extension to a type, ignoring case.
    ///
    /// Returns `None` for extensions the engine does not handle.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "css" => Some(Self::Css),
            "js" => Some(Self::Js),
            "less" => Some(Self::Less),
            _ => None,
        }
    }

    /// Derive the type from a raw location (path or URL).
    ///
    /// Query strings and fragments are ignored, so
    /// `/css/site.css?v=2#top` is still recognized as CSS.
    ///
    /// ```rust
    /// use abm_cli::core::AssetType;
    ///
    /// assert_eq!(AssetType::from_location("/a/b.js?x=1"), Some(AssetType::Js));
    /// assert_eq!(AssetType::from_location("/a/b.png"), None);
    /// ```
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let path = strip_query(location);
        Path::new(path).extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }

    /// MIME content type served for this asset type.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Css => "text/css",
            Self::Js => "application/javascript",
            Self::Less => "text/css",
        }
    }

    /// Default DOM position when an asset does not declare one.
    ///
    /// Stylesheets go to `<head>`, scripts to the end of `<body>`.
    #[must_use]
    pub const fn default_dom_position(&self) -> DomPosition {
        match self {
            Self::Css | Self::Less => DomPosition::Head,
            Self::Js => DomPosition::Body,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AssetType {
    type Err = AbmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim()).ok_or_else(|| AbmError::InvalidAssetType {
            value: s.to_string(),
        })
    }
}

/// Position in the HTML document where an asset is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomPosition {
    /// Inside `<head>`
    Head,
    /// At the end of `<body>`
    Body,
}

impl fmt::Display for DomPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("head"),
            Self::Body => f.write_str("body"),
        }
    }
}

/// Declaration of one asset inside a bundle
///
/// Deserialized from the `assets` array of a bundle definition:
///
/// ```json
/// {
///   "name": "site",
///   "version": "1.0.0",
///   "type": "css",
///   "locations": { "webapp": "/css/site.css" },
///   "attributes": { "media": "screen" }
/// }
/// ```
///
/// `bundle_name` is filled during consolidation and is never read from input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUnit {
    /// Asset name; derived from the first location when left empty
    #[serde(default)]
    pub name: String,

    /// Declared version
    #[serde(default)]
    pub version: String,

    /// Explicit type; derived from the first location's extension when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,

    /// Explicit DOM position
    #[serde(rename = "dom", default, skip_serializing_if = "Option::is_none")]
    pub dom_position: Option<DomPosition>,

    /// Candidate locations keyed by locator name
    #[serde(default)]
    pub locations: BTreeMap<String, String>,

    /// Conditional comment (e.g. `lt IE 9`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Explicit processor chain; `None` selects the default chain for the type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processors: Option<Vec<String>>,

    /// Bundle that last declared this asset
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,

    /// Whether the asset comes from a vendor loader
    #[serde(default)]
    pub vendor: bool,

    /// Identifier of the generator that produced this asset, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_uid: Option<String>,

    /// Extra HTML attributes for the generated tag
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl AssetUnit {
    /// Create an asset with a name and version and no locations.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            asset_type: None,
            dom_position: None,
            locations: BTreeMap::new(),
            condition: None,
            processors: None,
            bundle_name: None,
            vendor: false,
            generator_uid: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Add a candidate location.
    #[must_use]
    pub fn with_location(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.locations.insert(key.into(), value.into());
        self
    }

    /// Set the type explicitly.
    #[must_use]
    pub const fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    /// Set an explicit processor chain.
    #[must_use]
    pub fn with_processors<I, S>(mut self, processors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.processors = Some(processors.into_iter().map(Into::into).collect());
        self
    }

    /// Set a conditional comment.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set an HTML attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The effective type: explicit if declared, otherwise derived from the
    /// first location carrying a recognizable extension.
    #[must_use]
    pub fn resolved_type(&self) -> Option<AssetType> {
        self.asset_type.or_else(|| self.locations.values().find_map(|loc| AssetType::from_location(loc)))
    }

    /// The effective DOM position: explicit, else the type default.
    #[must_use]
    pub fn resolved_dom_position(&self) -> Option<DomPosition> {
        self.dom_position.or_else(|| self.resolved_type().map(|t| t.default_dom_position()))
    }

    /// Identity key: lowercase name, a dot and the type extension.
    ///
    /// Assets whose type cannot be determined use `unknown` as extension so
    /// they still show up in diagnostics.
    #[must_use]
    pub fn key(&self) -> String {
        let ext = self.resolved_type().map_or("unknown", |t| t.extension());
        format!("{}.{}", self.name.to_lowercase(), ext)
    }

    /// Same asset per name (case-insensitive) and type.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.resolved_type() == other.resolved_type()
    }

    /// Whether the asset has everything needed to be processed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.version.trim().is_empty()
            && self.resolved_type().is_some()
            && !self.locations.is_empty()
    }

    /// Fill derived fields after deserialization.
    ///
    /// An empty name becomes the file stem of the first location, so
    /// `{"locations": {"webapp": "/js/app.js"}}` is named `app`.
    pub fn finalize(&mut self) {
        if self.name.trim().is_empty()
            && let Some(stem) = self.locations.values().find_map(|loc| {
                Path::new(strip_query(loc)).file_stem().and_then(|s| s.to_str()).map(str::to_string)
            })
        {
            self.name = stem;
        }
    }

    /// Overwrite the mutable fields of this asset with a later declaration.
    ///
    /// Name and type are the identity and stay untouched; the type is pinned
    /// before the locations it may have been derived from are replaced.
    /// Processors are only replaced when the later declaration lists them
    /// explicitly.
    pub fn merge_from(&mut self, other: &Self, bundle_name: &str) {
        self.asset_type = other.asset_type.or_else(|| self.resolved_type());
        self.version.clone_from(&other.version);
        self.locations.clone_from(&other.locations);
        if other.dom_position.is_some() {
            self.dom_position = other.dom_position;
        }
        self.attributes.clone_from(&other.attributes);
        self.condition.clone_from(&other.condition);
        if other.processors.is_some() {
            self.processors.clone_from(&other.processors);
        }
        self.vendor = other.vendor;
        self.generator_uid.clone_from(&other.generator_uid);
        self.bundle_name = Some(bundle_name.to_string());
    }
}

fn strip_query(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}
