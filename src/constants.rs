//! Global constants used throughout the ABM codebase.
//!
//! File names, default keys and numeric limits shared by several modules.

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "abm.toml";

/// Default directory scanned for JSON bundle definitions.
pub const DEFAULT_BUNDLES_DIR: &str = "bundles";

/// Origin recorded for bundles loaded without a loader.
pub const DIRECT_ORIGIN: &str = "direct";

/// Maximum Levenshtein distance, as a percentage of the name length, for a
/// bundle name to be suggested in "did you mean" hints.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Maximum number of "did you mean" suggestions.
pub const MAX_SUGGESTIONS: usize = 3;

/// Number of hex characters kept by the `content-hash` versioning strategy.
pub const CONTENT_HASH_LENGTH: usize = 12;

/// File name prefix of aggregated storage keys.
pub const AGGREGATE_KEY_PREFIX: &str = "aggregate-";

/// Default URL prefix under which aggregated assets are served.
pub const DEFAULT_AGGREGATION_URL_PREFIX: &str = "/abm/aggregate";

/// Default URL prefix under which `file` assets are served.
pub const DEFAULT_FILE_URL_PREFIX: &str = "/abm/file";

/// Location key of the webapp locator.
pub const WEBAPP_LOCATION: &str = "webapp";

/// Location key of the file locator.
pub const FILE_LOCATION: &str = "file";

/// Location key of the CDN locator.
pub const CDN_LOCATION: &str = "cdn";

/// Key of the CSS `url(...)` rewriting processor.
pub const CSS_URL_REWRITING: &str = "css-url-rewriting";

/// Key of the CSS minifier.
pub const CSS_MIN: &str = "css-min";

/// Key of the JavaScript minifier.
pub const JS_MIN: &str = "js-min";

/// Rank assigned to processors that do not declare one.
///
/// Rank 0 is reserved for location resolution, which always runs first.
pub const DEFAULT_PROCESSOR_RANK: u32 = 1000;
