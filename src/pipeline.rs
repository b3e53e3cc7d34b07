//! Extraction -> rule engine -> sector classifier.

use serde::Serialize;
use tracing::info;

use crate::error::{RuleLoadError, SurveyError};
use crate::extraction::{DefectCategory, ExtractionResult, InspectionExport, Section};
use crate::rules::{RecType, RuleEngine, SectionRecommendation};
use crate::sector::{classify_section, SectionClassification, SectorProfile};

/// One section with its rule-engine recommendation and sector classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedSection {
    pub section: Section,
    pub recommendation: SectionRecommendation,
    pub classification: SectionClassification,
}

impl ClassifiedSection {
    pub fn item_no(&self) -> u32 {
        self.section.item_no
    }

    /// Dominant grading scale for pricing: structural when it is graded and at
    /// least as bad as service.
    pub fn defect_category(&self) -> DefectCategory {
        let structural = self.section.grades.structural_or_zero();
        let service = self.section.grades.service_or_zero();
        if structural > 0 && structural >= service {
            DefectCategory::Structural
        } else {
            DefectCategory::Service
        }
    }

    /// Work category the primary recommendation is priced under.
    pub fn work_category(&self) -> &'static str {
        work_category_for(self.recommendation.primary.rec_type)
    }
}

pub fn work_category_for(rec_type: RecType) -> &'static str {
    match rec_type {
        RecType::Patch => "Patch Repair",
        RecType::Liner => "Structural Lining",
        RecType::Clean => "Cleansing",
        RecType::Reinspect | RecType::Monitor => "CCTV Survey",
    }
}

/// Runs a batch through the rule engine and sector classifier.
pub struct Pipeline {
    engine: RuleEngine,
    profile: SectorProfile,
}

impl Pipeline {
    pub fn new(engine: RuleEngine, profile: SectorProfile) -> Self {
        Self { engine, profile }
    }

    pub fn profile(&self) -> &SectorProfile {
        &self.profile
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Classify an extracted batch against a single rule-set snapshot.
    pub fn classify(&self, extraction: &ExtractionResult) -> Result<Vec<ClassifiedSection>, RuleLoadError> {
        let rule_set = self.engine.rule_set()?;
        let classified: Vec<ClassifiedSection> = extraction
            .sections
            .iter()
            .map(|section| {
                let observations = extraction.observations_for(section.item_no);
                ClassifiedSection {
                    recommendation: rule_set.evaluate_observed(section, &observations),
                    classification: classify_section(section, &observations, &self.profile),
                    section: section.clone(),
                }
            })
            .collect();

        info!(
            "Classified {} sections with rule set {} under {} profile",
            classified.len(),
            rule_set.version,
            self.profile.sector
        );
        Ok(classified)
    }

    /// Extract and classify in one pass.
    pub fn run(&self, export: &InspectionExport) -> Result<Vec<ClassifiedSection>, SurveyError> {
        let extraction = export.extract()?;
        Ok(self.classify(&extraction)?)
    }
}
