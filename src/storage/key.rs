//! Storage key derivation.
//!
//! Keys are plain strings so they can double as serving paths. Single-asset
//! keys embed the effective version, so a version change never serves stale
//! content:
//!
//! ```text
//! <context>|<location>|processing|<ext>|<version>
//! <context>|<location>|compression|<ext>|<version>
//! aggregate-<sha256 hex>.<ext>
//! ```

use sha2::{Digest, Sha256};

use crate::constants::AGGREGATE_KEY_PREFIX;
use crate::core::AssetType;

/// Make a request URL safe to embed in a storage key.
///
/// ```rust
/// use abm_cli::storage::key::sanitize_context;
///
/// assert_eq!(sanitize_context("/shop?page=2&lang=en"), "/shop_page=2_lang=en");
/// ```
#[must_use]
pub fn sanitize_context(url: &str) -> String {
    url.replace(['?', '&'], "_")
}

/// Key of an asset after its processor chain ran.
#[must_use]
pub fn processing_key(context: &str, location: &str, asset_type: AssetType, version: &str) -> String {
    format!("{}|{location}|processing|{}|{version}", sanitize_context(context), asset_type.extension())
}

/// Key of an asset after minification.
#[must_use]
pub fn compression_key(context: &str, location: &str, asset_type: AssetType, version: &str) -> String {
    format!("{}|{location}|compression|{}|{version}", sanitize_context(context), asset_type.extension())
}

/// Key of an aggregate, from the ordered `(asset key, version)` pairs of its
/// constituents.
///
/// The same constituents in the same order always give the same key; any
/// change in membership, order or version gives a different one.
#[must_use]
pub fn aggregation_key<'a, I>(constituents: I, asset_type: AssetType) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();
    for (key, version) in constituents {
        hasher.update(key.as_bytes());
        hasher.update(b"@");
        hasher.update(version.as_bytes());
        hasher.update(b"\n");
    }
    format!("{AGGREGATE_KEY_PREFIX}{}.{}", hex::encode(hasher.finalize()), asset_type.extension())
}
