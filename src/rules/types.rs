//! Type definitions for the classification rule set.
//!
//! The `*File` types mirror the JSON rule document; [`RuleSet`] is the
//! validated, compiled form the engine evaluates.

use serde::{Deserialize, Serialize};

use super::pattern::CodePattern;
use crate::error::RuleLoadError;

// =============================================================================
// FILE TYPES (loaded from JSON)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSetFile {
    pub version: String,
    #[serde(default)]
    pub notes: String,
    pub defaults: Defaults,
    #[serde(default)]
    pub rules: Vec<RuleFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    /// Outcome for observations no rule matches
    pub unknown: Outcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub when: Condition,
    pub outcome: Outcome,
}

/// Match condition. Absent fields always match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub code_regex: Option<String>,
    /// Explicit code list, an alternative to `codeRegex`
    pub codes: Option<Vec<String>>,
    pub min_grade: Option<u8>,
}

/// Recommended action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecType {
    Patch,
    Liner,
    Clean,
    Reinspect,
    /// No action beyond routine monitoring (sections without defects)
    Monitor,
}

impl RecType {
    pub fn label(&self) -> &'static str {
        match self {
            RecType::Patch => "patch",
            RecType::Liner => "liner",
            RecType::Clean => "clean",
            RecType::Reinspect => "reinspect",
            RecType::Monitor => "monitor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub rec_type: RecType,
    pub severity: u8,
    /// WRc / MSCC5 clause reference
    #[serde(alias = "wrRef")]
    pub standard_reference: String,
    #[serde(default, alias = "operationalActionCode")]
    pub operational_action: u32,
    #[serde(default)]
    pub rationale: String,
}

// =============================================================================
// COMPILED TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: CodePattern,
    pub min_grade: Option<u8>,
    pub outcome: Outcome,
}

impl Rule {
    pub fn matches(&self, code: &str, grade: u8) -> bool {
        self.pattern.matches(code) && self.min_grade.map_or(true, |min| grade >= min)
    }
}

/// A versioned, ordered rule list. First match wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub version: String,
    pub notes: String,
    pub rules: Vec<Rule>,
    pub unknown: Outcome,
}

impl RuleSet {
    /// Parse and compile a JSON rule document.
    pub fn from_json(json: &str) -> Result<RuleSet, RuleLoadError> {
        let file: RuleSetFile = serde_json::from_str(json)?;
        RuleSet::compile(file)
    }

    pub fn compile(file: RuleSetFile) -> Result<RuleSet, RuleLoadError> {
        if file.defaults.unknown.rationale.trim().is_empty() {
            return Err(RuleLoadError::MissingDefault(file.version));
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        for (index, rule) in file.rules.into_iter().enumerate() {
            let pattern = match (&rule.when.code_regex, &rule.when.codes) {
                (Some(_), Some(_)) => {
                    return Err(RuleLoadError::InvalidPattern {
                        index,
                        pattern: "codeRegex + codes".to_string(),
                        reason: "a rule may declare either codeRegex or codes, not both".to_string(),
                    })
                }
                (Some(text), None) => {
                    CodePattern::parse(text).map_err(|reason| RuleLoadError::InvalidPattern {
                        index,
                        pattern: text.clone(),
                        reason,
                    })?
                }
                (None, Some(codes)) => CodePattern::from_codes(codes),
                (None, None) => CodePattern::Any,
            };
            rules.push(Rule {
                pattern,
                min_grade: rule.when.min_grade,
                outcome: rule.outcome,
            });
        }

        Ok(RuleSet {
            version: file.version,
            notes: file.notes,
            rules,
            unknown: file.defaults.unknown,
        })
    }
}

// =============================================================================
// EVALUATION TYPES
// =============================================================================

/// An observation reduced to what the rules look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedObservation {
    pub code: String,
    pub grade: u8,
    pub position_m: f64,
}

/// Outcome of rule evaluation for one observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub rec_type: RecType,
    pub severity: u8,
    pub standard_reference: String,
    pub operational_action: u32,
    pub rationale: String,
    /// Originating observation
    pub code: String,
    pub grade: u8,
    pub position_m: f64,
    /// Index of the matching rule, `None` when the default outcome applied
    pub rule_index: Option<usize>,
    pub rule_set_version: String,
}

/// Recommendations for a whole section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecommendation {
    /// Highest-severity recommendation (earliest on ties)
    pub primary: Recommendation,
    pub recommendations: Vec<Recommendation>,
    /// e.g. `2x patch, reinspect`
    pub summary: String,
}
