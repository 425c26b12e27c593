//! Content processors and processor chains.
//!
//! A [`Processor`] transforms the bytes of one asset. Processors are
//! registered once in a [`ProcessorRegistry`] under a unique key; per asset a
//! [`ProcessorChain`] is built from the registry and executed as a sequential
//! composition of `bytes -> Result<bytes>` stages.
//!
//! # Chain construction
//!
//! - An asset with an explicit `processors` list gets exactly that chain, in
//!   that order.
//! - Any other asset gets the default chain configured for its type, sorted
//!   by [`rank`](Processor::rank).
//!
//! In both cases processors that are not compatible with the asset type are
//! skipped with a warning, and a key with no registered processor fails chain
//! construction for that asset with
//! [`UnknownProcessor`](crate::core::AbmError::UnknownProcessor).
//!
//! Rank 0 is reserved for location resolution, which runs before every
//! processor.

use std::collections::HashMap;
use std::sync::Arc;

use super::ProcessingContext;
use super::builtin::{CssMinifier, CssUrlRewriter, JsMinifier};
use crate::constants::DEFAULT_PROCESSOR_RANK;
use crate::core::{AbmError, AssetType, AssetUnit};

/// Transforms the content of an asset.
pub trait Processor: Send + Sync {
    /// Unique key used in configuration and asset definitions.
    fn key(&self) -> &str;

    /// Asset types the processor accepts.
    fn compatible_types(&self) -> &[AssetType];

    /// Position in default chains; lower runs first. Must be greater than 0.
    fn rank(&self) -> u32 {
        DEFAULT_PROCESSOR_RANK
    }

    /// Transform `content`.
    ///
    /// # Errors
    ///
    /// A failure stops the chain for this asset only; the asset is served with
    /// its unprocessed content.
    fn process(&self, content: &[u8], context: &ProcessingContext<'_>) -> anyhow::Result<Vec<u8>>;

    /// Whether the processor accepts `asset_type`.
    fn is_compatible(&self, asset_type: AssetType) -> bool {
        self.compatible_types().contains(&asset_type)
    }
}

/// Processors indexed by key.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry").field("processors", &self.keys()).finish()
    }
}

impl ProcessorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in processors: `css-url-rewriting`,
    /// `css-min` and `js-min`.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in processor cannot be compiled.
    pub fn with_defaults() -> Result<Self, AbmError> {
        let compile = |e: anyhow::Error| AbmError::Other {
            message: format!("Failed to initialize built-in processors: {e:#}"),
        };

        let mut registry = Self::new();
        registry.register(Arc::new(CssUrlRewriter::new().map_err(compile)?))?;
        registry.register(Arc::new(CssMinifier::new().map_err(compile)?))?;
        registry.register(Arc::new(JsMinifier))?;
        Ok(registry)
    }

    /// Add a processor, replacing one with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::ConfigError`] for a processor of rank 0.
    pub fn register(&mut self, processor: Arc<dyn Processor>) -> Result<(), AbmError> {
        if processor.rank() == 0 {
            return Err(AbmError::ConfigError {
                message: format!(
                    "Processor '{}' uses rank 0, which is reserved for location resolution",
                    processor.key()
                ),
            });
        }
        self.processors.insert(processor.key().to_string(), processor);
        Ok(())
    }

    /// Processor for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(key).cloned()
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.processors.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Build the chain for one asset.
    ///
    /// `defaults` is the configured default chain for the asset's type and is
    /// only used when the asset has no explicit processor list.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::UnknownProcessor`] when a key is not registered.
    pub fn chain_for(
        &self,
        asset: &AssetUnit,
        asset_type: AssetType,
        defaults: &[String],
    ) -> Result<ProcessorChain, AbmError> {
        let (keys, explicit) = match &asset.processors {
            Some(explicit) => (explicit.as_slice(), true),
            None => (defaults, false),
        };

        let mut stages = Vec::with_capacity(keys.len());
        for key in keys {
            let processor = self.get(key).ok_or_else(|| AbmError::UnknownProcessor {
                key: key.clone(),
            })?;

            if !processor.is_compatible(asset_type) {
                tracing::warn!(
                    "Processor '{}' does not handle {} assets, skipping it for '{}'",
                    key,
                    asset_type,
                    asset.key()
                );
                continue;
            }
            stages.push(processor);
        }

        if !explicit {
            // Stable: equal ranks keep their configured order
            stages.sort_by_key(|p| p.rank());
        }

        Ok(ProcessorChain {
            stages,
        })
    }
}

/// Ordered processors for one asset.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    stages: Vec<Arc<dyn Processor>>,
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl ProcessorChain {
    /// Keys of the stages, in execution order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.stages.iter().map(|p| p.key()).collect()
    }

    /// Whether a stage with `key` is part of the chain.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.stages.iter().any(|p| p.key() == key)
    }

    /// Whether the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::ProcessorFailure`] naming the first failing stage.
    pub fn run(&self, content: &[u8], context: &ProcessingContext<'_>) -> Result<Vec<u8>, AbmError> {
        let mut current = content.to_vec();
        for processor in &self.stages {
            current = processor.process(&current, context).map_err(|e| AbmError::ProcessorFailure {
                asset: context.asset.key(),
                processor: processor.key().to_string(),
                cause: format!("{e:#}"),
            })?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RequestContext;

    struct Suffix {
        key: &'static str,
        rank: u32,
        types: Vec<AssetType>,
    }

    impl Processor for Suffix {
        fn key(&self) -> &str {
            self.key
        }

        fn compatible_types(&self) -> &[AssetType] {
            &self.types
        }

        fn rank(&self) -> u32 {
            self.rank
        }

        fn process(&self, content: &[u8], _context: &ProcessingContext<'_>) -> anyhow::Result<Vec<u8>> {
            let mut out = content.to_vec();
            out.extend_from_slice(format!("[{}]", self.key).as_bytes());
            Ok(out)
        }
    }

    struct Failing;

    impl Processor for Failing {
        fn key(&self) -> &str {
            "failing"
        }

        fn compatible_types(&self) -> &[AssetType] {
            &AssetType::ALL
        }

        fn process(&self, _content: &[u8], _context: &ProcessingContext<'_>) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("boom")
        }
    }

    fn registry() -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::new();
        registry
            .register(Arc::new(Suffix {
                key: "late",
                rank: 500,
                types: vec![AssetType::Js],
            }))
            .unwrap();
        registry
            .register(Arc::new(Suffix {
                key: "early",
                rank: 10,
                types: vec![AssetType::Js],
            }))
            .unwrap();
        registry
            .register(Arc::new(Suffix {
                key: "css-only",
                rank: 20,
                types: vec![AssetType::Css],
            }))
            .unwrap();
        registry.register(Arc::new(Failing)).unwrap();
        registry
    }

    fn defaults(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn test_rank_zero_rejected() {
        let mut registry = ProcessorRegistry::new();
        let result = registry.register(Arc::new(Suffix {
            key: "bad",
            rank: 0,
            types: vec![AssetType::Js],
        }));
        assert!(matches!(result, Err(AbmError::ConfigError { .. })));
        assert!(registry.get("bad").is_none());
    }

    #[test]
    fn test_default_chain_sorted_by_rank() {
        let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js");
        let chain = registry().chain_for(&asset, AssetType::Js, &defaults(&["late", "early"])).unwrap();
        assert_eq!(chain.keys(), vec!["early", "late"]);
    }

    #[test]
    fn test_explicit_chain_keeps_order_and_skips_incompatible() {
        let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js").with_processors([
            "late",
            "css-only",
            "early",
        ]);
        let chain = registry().chain_for(&asset, AssetType::Js, &defaults(&[])).unwrap();
        assert_eq!(chain.keys(), vec!["late", "early"]);
        assert!(chain.contains("early"));
        assert!(!chain.contains("css-only"));
    }

    #[test]
    fn test_unknown_processor() {
        let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js").with_processors(["sass"]);
        let result = registry().chain_for(&asset, AssetType::Js, &defaults(&[]));
        assert!(matches!(result, Err(AbmError::UnknownProcessor { ref key }) if key == "sass"));
    }

    #[test]
    fn test_run_composes_stages() {
        let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js");
        let request = RequestContext::new("/", "");
        let context = ProcessingContext {
            asset: &asset,
            asset_type: AssetType::Js,
            location: "/a.js",
            request: &request,
        };

        let chain = registry().chain_for(&asset, AssetType::Js, &defaults(&["early", "late"])).unwrap();
        let out = chain.run(b"x", &context).unwrap();
        assert_eq!(out, b"x[early][late]");
    }

    #[test]
    fn test_run_reports_failing_stage() {
        let asset = AssetUnit::new("a", "1").with_location("webapp", "/a.js").with_processors(["early", "failing"]);
        let request = RequestContext::new("/", "");
        let context = ProcessingContext {
            asset: &asset,
            asset_type: AssetType::Js,
            location: "/a.js",
            request: &request,
        };

        let chain = registry().chain_for(&asset, AssetType::Js, &defaults(&[])).unwrap();
        let err = chain.run(b"x", &context).unwrap_err();
        match err {
            AbmError::ProcessorFailure { asset, processor, cause } => {
                assert_eq!(asset, "a.js");
                assert_eq!(processor, "failing");
                assert!(cause.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
