//! Rule evaluation engine.
//!
//! The `RuleEngine` matches observations against the cached rule set and
//! aggregates the results per section.

use std::sync::Arc;

use crate::error::RuleLoadError;
use crate::extraction::{summary, DefectCategory, Observation, Section};

use super::cache::RuleSetCache;
use super::types::*;

/// Standard reference attached to the no-defect recommendation.
const MONITOR_REFERENCE: &str = "MSCC5 routine inspection cycle";

/// The rule evaluation engine.
///
/// Owns a [`RuleSetCache`]; every entry point takes one snapshot and evaluates
/// the whole call against it, so a batch never mixes rule-set versions.
pub struct RuleEngine {
    cache: RuleSetCache,
}

impl RuleEngine {
    pub fn new(cache: RuleSetCache) -> Self {
        Self { cache }
    }

    /// Engine over the embedded MSCC5 rule set.
    pub fn with_default_rules() -> Self {
        Self::new(RuleSetCache::embedded())
    }

    /// Current rule-set snapshot (refreshed if stale).
    pub fn rule_set(&self) -> Result<Arc<RuleSet>, RuleLoadError> {
        self.cache.current()
    }

    /// Evaluate one observation.
    ///
    /// The only error is a rule set that cannot be (re)loaded; an unmatched
    /// code resolves to the rule set's default outcome.
    pub fn evaluate(&self, observation: &GradedObservation) -> Result<Vec<Recommendation>, RuleLoadError> {
        Ok(self.rule_set()?.evaluate(observation))
    }

    /// Evaluate a section from its defect summary and grade rollups.
    pub fn evaluate_section(&self, section: &Section) -> Result<SectionRecommendation, RuleLoadError> {
        Ok(self.rule_set()?.evaluate_section(section))
    }

    /// Evaluate a batch of sections against one snapshot.
    pub fn evaluate_sections(
        &self,
        sections: &[Section],
    ) -> Result<Vec<SectionRecommendation>, RuleLoadError> {
        let rule_set = self.rule_set()?;
        Ok(sections.iter().map(|s| rule_set.evaluate_section(s)).collect())
    }
}

impl RuleSet {
    /// First matching rule wins; no match yields the default outcome.
    ///
    /// Always returns at least one recommendation.
    pub fn evaluate(&self, observation: &GradedObservation) -> Vec<Recommendation> {
        let matched = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(&observation.code, observation.grade));

        let (rule_index, outcome) = match matched {
            Some((index, rule)) => (Some(index), &rule.outcome),
            None => (None, &self.unknown),
        };

        vec![self.recommendation(outcome, observation, rule_index)]
    }

    /// Evaluate a section from its extracted observations. Each observation
    /// keeps its own grade when it has one and otherwise takes the section
    /// rollup for its category.
    pub fn evaluate_observed(&self, section: &Section, observations: &[&Observation]) -> SectionRecommendation {
        let graded: Vec<GradedObservation> = observations
            .iter()
            .map(|o| GradedObservation {
                code: o.code.clone(),
                grade: o.effective_grade(&section.grades),
                position_m: o.position_m,
            })
            .collect();
        self.recommend(&graded)
    }

    /// Evaluate a section known only by its summary string: decode it, grade
    /// each entry from the section rollup for its category, then aggregate.
    pub fn evaluate_section(&self, section: &Section) -> SectionRecommendation {
        let observations: Vec<GradedObservation> = summary::decode(&section.defect_summary)
            .into_iter()
            .map(|entry| {
                let category = DefectCategory::for_code(&entry.code);
                GradedObservation {
                    grade: section.grades.get(category).unwrap_or(0),
                    code: entry.code,
                    position_m: entry.position_m,
                }
            })
            .collect();
        self.recommend(&observations)
    }

    /// Aggregate recommendations for a set of observations.
    pub fn recommend(&self, observations: &[GradedObservation]) -> SectionRecommendation {
        let recommendations: Vec<Recommendation> =
            observations.iter().flat_map(|o| self.evaluate(o)).collect();

        let primary = recommendations
            .iter()
            .fold(None::<&Recommendation>, |best, rec| match best {
                Some(b) if b.severity >= rec.severity => Some(b),
                _ => Some(rec),
            })
            .cloned()
            .unwrap_or_else(|| self.monitor_recommendation());

        let summary = if recommendations.is_empty() {
            RecType::Monitor.label().to_string()
        } else {
            summarize_kinds(&recommendations)
        };

        SectionRecommendation {
            primary,
            recommendations,
            summary,
        }
    }

    fn recommendation(
        &self,
        outcome: &Outcome,
        observation: &GradedObservation,
        rule_index: Option<usize>,
    ) -> Recommendation {
        Recommendation {
            rec_type: outcome.rec_type,
            severity: outcome.severity,
            standard_reference: outcome.standard_reference.clone(),
            operational_action: outcome.operational_action,
            rationale: outcome.rationale.clone(),
            code: observation.code.clone(),
            grade: observation.grade,
            position_m: observation.position_m,
            rule_index,
            rule_set_version: self.version.clone(),
        }
    }

    fn monitor_recommendation(&self) -> Recommendation {
        Recommendation {
            rec_type: RecType::Monitor,
            severity: 0,
            standard_reference: MONITOR_REFERENCE.to_string(),
            operational_action: 0,
            rationale: "No defects recorded; continue routine monitoring".to_string(),
            code: String::new(),
            grade: 0,
            position_m: 0.0,
            rule_index: None,
            rule_set_version: self.version.clone(),
        }
    }
}

/// `2x patch, reinspect`: kinds in order of first appearance.
fn summarize_kinds(recommendations: &[Recommendation]) -> String {
    let mut counts: Vec<(RecType, usize)> = Vec::new();
    for rec in recommendations {
        match counts.iter_mut().find(|(kind, _)| *kind == rec.rec_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((rec.rec_type, 1)),
        }
    }
    counts
        .iter()
        .map(|(kind, n)| match n {
            1 => kind.label().to_string(),
            _ => format!("{}x {}", n, kind.label()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
