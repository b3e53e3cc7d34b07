//! Canonical records produced by an import.
//!
//! These are created once per import and never mutated afterwards. A re-import
//! replaces the whole set (see [`ImportCatalog`](super::ImportCatalog)).

use serde::{Deserialize, Serialize};

/// The two independent MSCC5 grading scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectCategory {
    Structural,
    Service,
}

/// MSCC5 structural code families. Everything else is graded on the service scale.
const STRUCTURAL_CODES: &[&str] = &[
    "B", "BJ", "CC", "CL", "CM", "CS", "D", "DI", "FC", "FL", "FM", "FS", "H", "JD", "JDL",
    "JDM", "JDS", "JN", "OJ", "OJL", "OJM", "OJS", "SA", "SAM", "SRI", "SS", "SSS", "X", "XB",
    "XP", "LX", "WXC", "WXL",
];

impl DefectCategory {
    /// Classify an observation code. Unknown codes fall back to service.
    pub fn for_code(code: &str) -> DefectCategory {
        let upper = code.trim().to_uppercase();
        if STRUCTURAL_CODES.contains(&upper.as_str()) {
            DefectCategory::Structural
        } else {
            DefectCategory::Service
        }
    }

    /// Parse the category tag used in grade rollup tables ("STR", "Structural", "SER", ...).
    pub fn from_tag(tag: &str) -> Option<DefectCategory> {
        let upper = tag.trim().to_uppercase();
        if upper.starts_with("STR") {
            Some(DefectCategory::Structural)
        } else if upper.starts_with("SER") || upper.starts_with("OPS") || upper.starts_with("OPE") {
            Some(DefectCategory::Service)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DefectCategory::Structural => "structural",
            DefectCategory::Service => "service",
        }
    }
}

/// Highest grade recorded for one category of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRollup {
    pub category: DefectCategory,
    /// 0-5
    pub highest_grade: u8,
}

/// Per-section grade rollups, at most one per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionGrades {
    pub structural: Option<u8>,
    pub service: Option<u8>,
}

impl SectionGrades {
    /// Merge a rollup row, keeping the highest grade when a category repeats.
    pub fn record(&mut self, rollup: GradeRollup) {
        let slot = match rollup.category {
            DefectCategory::Structural => &mut self.structural,
            DefectCategory::Service => &mut self.service,
        };
        *slot = Some(slot.map_or(rollup.highest_grade, |g| g.max(rollup.highest_grade)));
    }

    pub fn get(&self, category: DefectCategory) -> Option<u8> {
        match category {
            DefectCategory::Structural => self.structural,
            DefectCategory::Service => self.service,
        }
    }

    pub fn structural_or_zero(&self) -> u8 {
        self.structural.unwrap_or(0)
    }

    pub fn service_or_zero(&self) -> u8 {
        self.service.unwrap_or(0)
    }

    pub fn rollups(&self) -> Vec<GradeRollup> {
        let mut out = Vec::with_capacity(2);
        if let Some(g) = self.structural {
            out.push(GradeRollup {
                category: DefectCategory::Structural,
                highest_grade: g,
            });
        }
        if let Some(g) = self.service {
            out.push(GradeRollup {
                category: DefectCategory::Service,
                highest_grade: g,
            });
        }
        out
    }
}

/// One inspected pipe run between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// 1-based sequence number, unique per import
    pub item_no: u32,
    /// Primary key of the section row in the export
    pub key: String,
    pub upstream_node: String,
    pub downstream_node: String,
    /// Pipe size as recorded (usually mm)
    pub pipe_size: String,
    pub material: String,
    /// Surveyed length in metres
    pub length_m: Option<f64>,
    pub grades: SectionGrades,
    /// `CODE at p1m, p2m; CODE2 at p3m`, or [`NO_DEFECTS`](super::summary::NO_DEFECTS)
    pub defect_summary: String,
}

/// One coded defect or event at a position along a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// `item_no` of the owning section
    pub section_item_no: u32,
    pub code: String,
    /// Distance along the run in metres
    pub position_m: f64,
    pub detail: Option<String>,
    /// Grade recorded against the observation itself, when the export carries one
    pub grade: Option<u8>,
}

impl Observation {
    pub fn category(&self) -> DefectCategory {
        DefectCategory::for_code(&self.code)
    }

    /// Own grade when recorded, else the section rollup for the code's category.
    pub fn effective_grade(&self, grades: &SectionGrades) -> u8 {
        self.grade
            .or_else(|| grades.get(self.category()))
            .unwrap_or(0)
    }
}

/// Output of one import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub sections: Vec<Section>,
    pub observations: Vec<Observation>,
}

impl ExtractionResult {
    /// Observations belonging to one section, in position order.
    pub fn observations_for(&self, item_no: u32) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|o| o.section_item_no == item_no)
            .collect()
    }
}
