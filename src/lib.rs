//! ABM - Asset Bundle Manager
//!
//! An engine that turns declarative bundle definitions into the ordered list of
//! stylesheet and script resources a web page needs, processing their content
//! (URL rewriting, minification, aggregation) and keeping the results in a
//! content store a serving layer can read from.
//!
//! # Architecture Overview
//!
//! ABM follows a load-then-serve model:
//! - Bundle definitions (`bundles/**/*.json`) declare assets and dependencies
//! - Loaders consolidate definitions into one dependency graph at startup
//! - Each request resolves a set of bundle names to assets in dependency order
//! - The pipeline processes those assets and stores their content by key
//!
//! ## Key Features
//!
//! - **Ordered resolution**: Dependencies always come before the bundles needing them
//! - **Cycle safety**: An edge that would close a cycle is rejected at load time
//! - **Merging**: Later declarations of an asset override earlier ones field by field
//! - **Graceful degradation**: A broken asset never fails a whole request
//! - **Deterministic keys**: Processed content is cached under reproducible keys
//!
//! # Core Modules
//!
//! - [`core`] - Asset and bundle types, error handling
//! - [`resolver`] - Bundle graph, consolidation, resolution and validation
//! - [`loader`] - Sources of bundle definitions and load precedence
//! - [`pipeline`] - Locators, processors, compression and aggregation
//! - [`storage`] - Content store implementations and storage keys
//! - [`versioning`] - Version strategies for cache busting
//! - [`config`] - Engine configuration (`abm.toml`)
//! - [`engine`] - The [`engine::AssetEngine`] handle tying it all together
//! - [`cli`] - The `abm` command-line interface
//!
//! # Bundle Definition Format
//!
//! ```json
//! {
//!   "bundle": "app",
//!   "dependencies": ["jquery"],
//!   "assets": [
//!     { "name": "app", "version": "1.0", "locations": { "webapp": "/js/app.js" } },
//!     { "name": "app", "version": "1.0", "locations": { "webapp": "/css/app.css" },
//!       "processors": ["css-url-rewriting", "css-min"] }
//!   ]
//! }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! abm validate                       # Check every bundle definition
//! abm resolve app --format json      # Assets for a bundle, dependencies first
//! abm tree app                       # Dependency tree of a bundle
//! abm build app --url /index.html    # Run the pipeline and report storage keys
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod loader;
pub mod pipeline;
pub mod resolver;
pub mod storage;
pub mod versioning;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
