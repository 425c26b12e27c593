//! Core types for ABM
//!
//! This module holds the data model shared by every other part of the engine
//! and the error types used throughout the crate.
//!
//! # Modules
//!
//! ## `error` - Error Handling
//! - [`AbmError`] - Enumerated error types covering every failure mode
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! ## `asset` - Asset Model
//! - [`AssetType`] - CSS, JS or LESS
//! - [`DomPosition`] - Head or body injection
//! - [`AssetUnit`] - One asset with its candidate locations
//!
//! ## `bundle` - Bundle Model
//! - [`BundleUnit`] - A named collection of assets with dependencies
//! - [`ResolvedBundle`] - A bundle snapshot returned by resolution queries
//!
//! # Examples
//!
//! ```rust
//! use abm_cli::core::{AssetUnit, BundleUnit};
//!
//! let bundle = BundleUnit::new("app")
//!     .with_dependency("jquery")
//!     .with_asset(AssetUnit::new("app", "1.0").with_location("webapp", "/js/app.js"));
//!
//! assert_eq!(bundle.dependencies, vec!["jquery"]);
//! ```

pub mod asset;
pub mod bundle;
pub mod error;

pub use asset::{AssetType, AssetUnit, DomPosition};
pub use bundle::{BundleUnit, ResolvedBundle, normalize_name};
pub use error::{AbmError, ErrorContext, user_friendly_error};
