//! Loader for bundles built in code.

use anyhow::Result;

use super::{Loader, LoaderKind};
use crate::core::BundleUnit;

/// Serves a fixed list of bundles.
#[derive(Debug, Clone)]
pub struct StaticLoader {
    name: String,
    kind: LoaderKind,
    units: Vec<BundleUnit>,
}

impl StaticLoader {
    /// Loader named `name` serving `units`.
    pub fn new(name: impl Into<String>, kind: LoaderKind, units: Vec<BundleUnit>) -> Self {
        Self {
            name: name.into(),
            kind,
            units,
        }
    }
}

impl Loader for StaticLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> LoaderKind {
        self.kind
    }

    fn load(&self) -> Result<Vec<BundleUnit>> {
        Ok(self.units.clone())
    }
}
