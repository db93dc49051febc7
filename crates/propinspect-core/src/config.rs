//! Scan configuration types.

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ScanError;

/// Root set a scan starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanScope {
    /// Every top-level item of the loaded models.
    #[default]
    Full,
    /// Only the current selection (and everything below it).
    Selection,
}

/// Configuration for a scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root set to traverse.
    #[builder(default)]
    #[serde(default)]
    pub scope: ScanScope,

    /// Maximum depth to descend below the scope roots (None = unlimited).
    /// Roots are depth 0.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Category name patterns to index (glob syntax). Empty indexes all.
    #[builder(default)]
    #[serde(default)]
    pub include_categories: Vec<String>,

    /// Number of items between progress updates.
    #[builder(default = "1000")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_progress_interval() -> u64 {
    1000
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be at least 1".to_string());
        }
        if let Some(ref patterns) = self.include_categories {
            compile_patterns(patterns)?;
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for the given scope.
    pub fn new(scope: ScanScope) -> Self {
        Self {
            scope,
            max_depth: None,
            include_categories: Vec::new(),
            progress_interval: default_progress_interval(),
        }
    }

    /// Check the config and compile its category filter.
    ///
    /// Configs built through the builder are already valid, but configs can
    /// also be constructed directly or deserialized.
    pub fn category_filter(&self) -> Result<CategoryFilter, ScanError> {
        if self.progress_interval == 0 {
            return Err(ScanError::invalid_config("Progress interval must be at least 1"));
        }
        compile_patterns(&self.include_categories).map_err(ScanError::invalid_config)
    }

    /// Check if children at `depth` should still be descended into.
    pub fn should_descend(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(ScanScope::Full)
    }
}

/// Compiled category include patterns.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    set: Option<GlobSet>,
}

impl CategoryFilter {
    /// A filter that accepts every category.
    pub fn all() -> Self {
        Self { set: None }
    }

    /// Check if a category should be indexed.
    pub fn matches(&self, category: &str) -> bool {
        self.set.as_ref().is_none_or(|set| set.is_match(category))
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

fn compile_patterns(patterns: &[String]) -> Result<CategoryFilter, String> {
    if patterns.is_empty() {
        return Ok(CategoryFilter::all());
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| format!("Invalid category pattern: {e}"))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| format!("Invalid category patterns: {e}"))?;
    Ok(CategoryFilter { set: Some(set) })
}
