//! Rule-set loading.
//!
//! Provides two loading methods:
//! - `default_rules()` - Loads the embedded MSCC5 rule set compiled into the binary
//! - `load_rules(path)` - Loads a custom rule set from a JSON file

use std::path::Path;

use tracing::info;

use super::types::RuleSet;
use crate::error::RuleLoadError;

/// Default rules embedded in the binary at compile time.
/// These are loaded from `config/mscc5_rules.json`.
const DEFAULT_RULES: &str = include_str!("../../config/mscc5_rules.json");

/// Load and compile a rule set from a JSON file.
pub fn load_rules(path: &Path) -> Result<RuleSet, RuleLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rule_set = RuleSet::from_json(&content)?;
    info!(
        "Loaded rule set {} ({} rules) from {:?}",
        rule_set.version,
        rule_set.rules.len(),
        path
    );
    Ok(rule_set)
}

/// Get the default MSCC5 rule set embedded in the binary.
///
/// # Panics
/// Panics if the embedded JSON is invalid (this would be a compile-time bug).
pub fn default_rules() -> RuleSet {
    RuleSet::from_json(DEFAULT_RULES).expect("embedded mscc5_rules.json must be a valid rule set")
}
