//! Drain and sewer inspection processing.
//!
//! Extracts sections and coded observations from a survey export, applies an
//! MSCC5 rule set, escalates findings per sector, validates pricing readiness
//! and formats the compliance export.

pub mod config;
pub mod error;
pub mod export;
pub mod extraction;
pub mod pipeline;
pub mod rules;
pub mod sector;
pub mod validation;

pub use config::SurveyConfig;
pub use error::{ConfigError, ExtractionError, RuleLoadError, SurveyError};
pub use export::{ExportFormat, ExportFormatter, ExportRecord};
pub use extraction::{ExtractionResult, ImportCatalog, InspectionExport};
pub use pipeline::{ClassifiedSection, Pipeline};
pub use rules::{RuleEngine, RuleSetCache};
pub use validation::{ValidationEngine, ValidationReport};

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
