//! Error handling for ABM
//!
//! This module provides the error types and user-friendly error reporting for the
//! asset bundle manager. Like the rest of the crate it follows two principles:
//! 1. **Strongly-typed errors** for precise handling inside the engine
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`AbmError`] - Enumerated error types for every failure mode of the engine
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Fatal vs. degraded errors
//!
//! Errors fall into two groups with very different handling:
//!
//! - **Load-time, fatal**: [`AbmError::CircularDependency`] aborts a whole
//!   [`BundleStore::load`](crate::resolver::BundleStore::load) call because the
//!   graph would become inconsistent.
//! - **Request-time, degraded**: [`AbmError::LocationUnresolved`],
//!   [`AbmError::UnknownProcessor`], [`AbmError::ProcessorFailure`] and
//!   [`AbmError::ContentFetchFailed`] never fail a request. The pipeline records
//!   them as warnings on the [`ProcessOutcome`](crate::pipeline::ProcessOutcome)
//!   and keeps going with the remaining assets.
//!
//! [`AbmError::InvalidBundle`] sits in between: validation accumulates every
//! problem into a report and the caller decides what to do with it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use abm_cli::core::{AbmError, ErrorContext, user_friendly_error};
//!
//! let error = AbmError::CircularDependency {
//!     bundle: "app".to_string(),
//!     path: vec!["app".into(), "core".into(), "app".into()],
//! };
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for ABM operations
///
/// Each variant carries enough context (bundle names, asset keys, processor keys)
/// to produce a useful message without access to the engine state that raised it.
///
/// # Error Categories
///
/// ## Bundle graph
/// - [`CircularDependency`] - A dependency edge would close a cycle
/// - [`InvalidBundle`] - Accumulated validation failures for one bundle
/// - [`BundleNotFound`] - A named bundle is not part of the graph
///
/// ## Pipeline
/// - [`LocationUnresolved`] - No location matches the resolution strategy
/// - [`UnknownLocator`] - A location key has no registered locator
/// - [`UnknownProcessor`] - A processor key has no registered processor
/// - [`ProcessorFailure`] - A processor stage failed for one asset
/// - [`ContentFetchFailed`] - A locator could not produce raw content
/// - [`UnknownVersioningStrategy`] - Configured versioning name is not registered
///
/// ## Input and configuration
/// - [`InvalidAssetType`] - An asset type string is not recognized
/// - [`BundleDefinitionParseError`] - A bundle definition file is malformed
/// - [`ConfigError`] - Engine configuration is invalid
/// - [`IoError`], [`TomlError`], [`JsonError`] - Wrapped library errors
///
/// [`CircularDependency`]: AbmError::CircularDependency
/// [`InvalidBundle`]: AbmError::InvalidBundle
/// [`BundleNotFound`]: AbmError::BundleNotFound
/// [`LocationUnresolved`]: AbmError::LocationUnresolved
/// [`UnknownLocator`]: AbmError::UnknownLocator
/// [`UnknownProcessor`]: AbmError::UnknownProcessor
/// [`ProcessorFailure`]: AbmError::ProcessorFailure
/// [`ContentFetchFailed`]: AbmError::ContentFetchFailed
/// [`UnknownVersioningStrategy`]: AbmError::UnknownVersioningStrategy
/// [`InvalidAssetType`]: AbmError::InvalidAssetType
/// [`BundleDefinitionParseError`]: AbmError::BundleDefinitionParseError
/// [`ConfigError`]: AbmError::ConfigError
/// [`IoError`]: AbmError::IoError
/// [`TomlError`]: AbmError::TomlError
/// [`JsonError`]: AbmError::JsonError
#[derive(Error, Debug)]
pub enum AbmError {
    /// Adding a dependency edge would create a cycle in the bundle graph
    ///
    /// The edge is rolled back before this error is returned, so the graph is
    /// left exactly as it was.
    ///
    /// # Fields
    /// - `bundle`: The bundle whose dependency declaration closed the cycle
    /// - `path`: Vertex names in traversal order, first name repeated at the end
    #[error("Circular dependency detected while loading '{bundle}': {}", path.join(" → "))]
    CircularDependency {
        /// The bundle whose dependency declaration closed the cycle
        bundle: String,
        /// Bundle names along the cycle, reading root → … → root
        path: Vec<String>,
    },

    /// Bundle failed validation
    ///
    /// Validation never stops at the first problem: `reasons` holds every
    /// issue found in the bundle.
    #[error("Bundle '{bundle}' is invalid: {}", reasons.join("; "))]
    InvalidBundle {
        /// Name of the invalid bundle
        bundle: String,
        /// Every validation failure found for this bundle
        reasons: Vec<String>,
    },

    /// Named bundle is not part of the graph
    #[error("Bundle '{name}' not found")]
    BundleNotFound {
        /// The requested bundle name
        name: String,
    },

    /// No location of the asset matches the resolution strategy
    #[error("No location of asset '{asset}' matches the resolution strategy")]
    LocationUnresolved {
        /// Key (`name.ext`) of the asset
        asset: String,
    },

    /// A location key has no registered locator
    #[error("No locator registered for location key '{key}'")]
    UnknownLocator {
        /// The location key
        key: String,
    },

    /// A processor key has no registered processor
    #[error("Unknown processor '{key}'")]
    UnknownProcessor {
        /// The processor key
        key: String,
    },

    /// A processor stage failed while transforming an asset
    #[error("Processor '{processor}' failed on asset '{asset}': {cause}")]
    ProcessorFailure {
        /// Key (`name.ext`) of the asset being processed
        asset: String,
        /// Key of the failing processor
        processor: String,
        /// Error reported by the processor
        cause: String,
    },

    /// A locator could not fetch the raw content of an asset
    #[error("Failed to fetch content of asset '{asset}' from '{location}': {reason}")]
    ContentFetchFailed {
        /// Key (`name.ext`) of the asset
        asset: String,
        /// The location that was read
        location: String,
        /// Error reported by the locator
        reason: String,
    },

    /// Configured versioning strategy is not registered
    #[error("Unknown versioning strategy '{name}'")]
    UnknownVersioningStrategy {
        /// The strategy name from configuration
        name: String,
    },

    /// Asset type string is not recognized
    #[error("Invalid asset type: {value}")]
    InvalidAssetType {
        /// The rejected value
        value: String,
    },

    /// A bundle definition file could not be parsed
    #[error("Invalid bundle definition in {file}: {reason}")]
    BundleDefinitionParseError {
        /// Path to the definition file
        file: String,
        /// Parser error message
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl AbmError {
    /// Whether the error is tolerated at request time.
    ///
    /// Degraded errors are collected on a
    /// [`ProcessOutcome`](crate::pipeline::ProcessOutcome) instead of failing the
    /// request.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::LocationUnresolved { .. }
                | Self::UnknownLocator { .. }
                | Self::UnknownProcessor { .. }
                | Self::ProcessorFailure { .. }
                | Self::ContentFetchFailed { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps an [`AbmError`] with an optional suggestion (printed in green) and
/// optional details (printed in yellow).
///
/// # Examples
///
/// ```rust,no_run
/// use abm_cli::core::{AbmError, ErrorContext};
///
/// let context = ErrorContext::new(AbmError::BundleNotFound { name: "app".into() })
///     .with_suggestion("Check the bundle name")
///     .with_details("Bundle names are case-insensitive");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying ABM error
    pub error: AbmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: AbmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Walks the error chain looking for an [`AbmError`] (errors wrapped by
/// `anyhow::Context` are found too), then falls back to IO and TOML errors,
/// and finally to a generic message that includes the whole cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(abm_error) = cause.downcast_ref::<AbmError>() {
            let context = create_error_context(abm_error);
            // Keep outer anyhow context (e.g. which file was being read) visible
            if error.chain().count() > 1 && context.details.is_none() {
                return context.with_details(error.to_string());
            }
            return context;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(AbmError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the bundles directory and configuration path are correct");
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(AbmError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check file ownership and permissions of the asset sources");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(AbmError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in abm.toml. Verify quotes, brackets, and key names");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AbmError::Other {
        message,
    })
}

/// Map each [`AbmError`] variant to a context with a tailored suggestion.
fn create_error_context(error: &AbmError) -> ErrorContext {
    match error {
        AbmError::CircularDependency { bundle, path } => ErrorContext::new(AbmError::CircularDependency {
            bundle: bundle.clone(),
            path: path.clone(),
        })
            .with_suggestion("Remove one of the dependency declarations along the cycle")
            .with_details(format!(
                "Bundles cannot depend on themselves directly or indirectly. Cycle: {}",
                path.join(" → ")
            )),

        AbmError::InvalidBundle { bundle, reasons } => ErrorContext::new(AbmError::InvalidBundle {
            bundle: bundle.clone(),
            reasons: reasons.clone(),
        })
            .with_suggestion(format!(
                "Fix the definition of bundle '{bundle}': every asset needs a name, a version and at least one location"
            )),

        AbmError::BundleNotFound { name } => ErrorContext::new(AbmError::BundleNotFound {
            name: name.clone(),
        })
            .with_suggestion("Run 'abm validate' to list the loaded bundles")
            .with_details("Bundle names are matched case-insensitively"),

        AbmError::UnknownProcessor { key } => ErrorContext::new(AbmError::UnknownProcessor {
            key: key.clone(),
        })
            .with_suggestion("Use one of the built-in processors: css-url-rewriting, css-min, js-min"),

        AbmError::UnknownVersioningStrategy { name } => ErrorContext::new(AbmError::UnknownVersioningStrategy {
            name: name.clone(),
        })
            .with_suggestion("Set 'versioning' in abm.toml to one of: asset, fixed, content-hash"),

        AbmError::BundleDefinitionParseError { file, reason } => ErrorContext::new(AbmError::BundleDefinitionParseError {
            file: file.clone(),
            reason: reason.clone(),
        })
            .with_suggestion(format!("Check the JSON syntax in {file}"))
            .with_details("A bundle definition is an object with 'bundle', optional 'dependencies' and 'assets'"),

        AbmError::ConfigError { message } => ErrorContext::new(AbmError::ConfigError {
            message: message.clone(),
        })
            .with_suggestion("Check abm.toml or the --config path"),

        // Remaining variants are displayed as-is
        other => ErrorContext::new(AbmError::Other {
            message: other.to_string(),
        }),
    }
}
