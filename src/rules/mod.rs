//! MSCC5 classification rule engine.
//!
//! This module provides a JSON-driven rule engine that turns coded defect
//! observations into WRc repair and cleansing recommendations.
//!
//! # Architecture
//!
//! - **Rules**: an ordered JSON rule list, first match wins, with a declared
//!   default outcome for unmatched codes
//! - **Patterns**: textual code patterns compiled to tagged [`CodePattern`]s
//! - **Cache**: [`RuleSetCache`] re-reads the rule file after a staleness
//!   window and swaps in the new set atomically
//! - **Aggregation**: per-section primary recommendation and kind summary
//!
//! # Example
//!
//! ```ignore
//! use drainsurvey::rules::{GradedObservation, RuleEngine, RuleSetCache};
//!
//! let engine = RuleEngine::new(RuleSetCache::from_file(Path::new("rules.json"))?);
//! let recs = engine.evaluate(&GradedObservation {
//!     code: "DER".to_string(),
//!     grade: 3,
//!     position_m: 1.8,
//! })?;
//! println!("{}: {}", recs[0].rec_type.label(), recs[0].rationale);
//! ```

mod cache;
mod engine;
mod loader;
mod pattern;
mod types;

pub use cache::{RuleSetCache, RuleSource, DEFAULT_STALENESS};
pub use engine::RuleEngine;
pub use loader::{default_rules, load_rules};
pub use pattern::CodePattern;
pub use types::*;
