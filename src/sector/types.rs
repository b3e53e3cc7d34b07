use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Regulatory domain a batch is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Utilities,
    Adoption,
    Highways,
    Insurance,
    Construction,
    Domestic,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Utilities,
        Sector::Adoption,
        Sector::Highways,
        Sector::Insurance,
        Sector::Construction,
        Sector::Domestic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Sector::Utilities => "utilities",
            Sector::Adoption => "adoption",
            Sector::Highways => "highways",
            Sector::Insurance => "insurance",
            Sector::Construction => "construction",
            Sector::Domestic => "domestic",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Sector::ALL
            .into_iter()
            .find(|sector| sector.name() == lower)
            .ok_or_else(|| ConfigError::UnknownSector(s.to_string()))
    }
}

/// Escalation policy for one regulatory domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorProfile {
    pub sector: Sector,
    pub display_name: String,
    /// Structural grade at or above which a repair is urgent
    pub structural_threshold: u8,
    /// Service grade at or above which cleaning and re-survey are required
    pub service_threshold: u8,
    /// Structural grade at or above which the section cannot be adopted
    pub adoption_reject_structural: u8,
    /// Service grade at or above which the section cannot be adopted
    pub adoption_reject_service: u8,
    pub required_standards: Vec<String>,
}

/// Escalation priority, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

/// Escalation flags for one defect, or accumulated over a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub urgent_repair: bool,
    pub cleaning_required: bool,
    pub reinspection_needed: bool,
    pub priority: Priority,
    pub adoptable: bool,
    pub actions: Vec<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            urgent_repair: false,
            cleaning_required: false,
            reinspection_needed: false,
            priority: Priority::Low,
            adoptable: true,
            actions: Vec::new(),
        }
    }
}

impl Classification {
    pub fn raise(&mut self, priority: Priority) {
        self.priority = self.priority.max(priority);
    }

    pub fn push_action(&mut self, action: &str) {
        if !self.actions.iter().any(|a| a == action) {
            self.actions.push(action.to_string());
        }
    }

    /// OR the flags, keep the higher priority, append unseen actions.
    pub fn merge(&mut self, other: &Classification) {
        self.urgent_repair |= other.urgent_repair;
        self.cleaning_required |= other.cleaning_required;
        self.reinspection_needed |= other.reinspection_needed;
        self.adoptable &= other.adoptable;
        self.raise(other.priority);
        for action in &other.actions {
            self.push_action(action);
        }
    }
}

/// Classification of a whole section plus its Pipeline Likelihood Rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionClassification {
    pub item_no: u32,
    #[serde(flatten)]
    pub flags: Classification,
    pub plr: u8,
}
