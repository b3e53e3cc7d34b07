//! Sector-specific escalation over rule-engine output.
//!
//! A [`SectorProfile`] carries the grade thresholds and required standards of
//! one regulatory domain. The classifier derives urgent-repair, cleaning and
//! re-survey flags, adoptability and priority from grades and defect codes,
//! and computes the Pipeline Likelihood Rating used at export.

mod classifier;
mod profiles;
mod types;

pub use classifier::{classify, classify_observation, classify_section, pipeline_likelihood_rating};
pub use profiles::{profile_for, DEFAULT_THRESHOLD};
pub use types::*;
