//! Export-readiness validation.
//!
//! Four independent checks run over a classified batch: pricing coverage,
//! minimum quantity, travel beyond the baseline allowance, and vehicle rate
//! coverage. Business-rule problems are reported as [`ValidationIssue`]s,
//! never as errors, so one call surfaces the complete picture.

pub mod checks;
mod engine;
mod types;

pub use checks::{names_match, TRAVEL_BASELINE_MINUTES};
pub use engine::{
    validate, ValidationContext, ValidationEngine, SUMMARY_BLOCKED, SUMMARY_READY,
    SUMMARY_WARNINGS,
};
pub use types::*;
