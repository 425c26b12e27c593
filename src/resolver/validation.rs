//! Bundle validation.
//!
//! Validation collects every problem in a bundle instead of stopping at the
//! first one, so a single `abm validate` run shows the complete list.

use serde::Serialize;

use crate::core::{AbmError, AssetType, AssetUnit, BundleUnit};

/// Outcome of validating one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Name of the validated bundle
    pub bundle: String,
    /// Every problem found; empty when the bundle is valid
    pub reasons: Vec<String>,
}

impl ValidationReport {
    /// Create an empty report for `bundle`.
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            reasons: Vec::new(),
        }
    }

    /// Whether no problem was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Convert to [`AbmError::InvalidBundle`] when invalid.
    #[must_use]
    pub fn into_error(self) -> Option<AbmError> {
        if self.is_valid() {
            None
        } else {
            Some(AbmError::InvalidBundle {
                bundle: self.bundle,
                reasons: self.reasons,
            })
        }
    }

    fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }
}

/// Validate a bundle and every asset it declares.
#[must_use]
pub fn validate_bundle(bundle: &BundleUnit) -> ValidationReport {
    let mut report = ValidationReport::new(&bundle.name);

    if !bundle.is_defined() {
        report.push("missing bundle definition");
        return report;
    }

    if bundle.assets.is_empty() {
        report.push("bundle has no assets");
    }

    for (position, asset) in bundle.assets.iter().enumerate() {
        validate_asset(asset, position, &mut report);
    }

    report
}

fn validate_asset(asset: &AssetUnit, position: usize, report: &mut ValidationReport) {
    let label = if asset.name.trim().is_empty() {
        format!("asset #{}", position + 1)
    } else {
        format!("asset '{}'", asset.name)
    };

    if asset.name.trim().is_empty() {
        report.push(format!("{label} has an empty name"));
    }

    if asset.version.trim().is_empty() {
        report.push(format!("{label} has an empty version"));
    }

    if asset.locations.is_empty() {
        report.push(format!("{label} has no locations"));
    }

    for (key, value) in &asset.locations {
        if key.trim().is_empty() {
            report.push(format!("{label} has a location with an empty key"));
        }
        if value.trim().is_empty() {
            report.push(format!("{label} has an empty '{key}' location"));
        }
    }

    if asset.asset_type.is_none() {
        for value in asset.locations.values().filter(|v| !v.trim().is_empty()) {
            if AssetType::from_location(value).is_none() {
                report.push(format!("{label} location '{value}' has an unknown file extension"));
            }
        }
    }
}
