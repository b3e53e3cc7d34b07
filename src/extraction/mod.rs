//! Inspection export extraction.
//!
//! Reads a relational survey export (SQLite) into canonical [`Section`] and
//! [`Observation`] records.
//!
//! # Architecture
//!
//! - **Schema**: a fixed column-name table per export table ([`schema`])
//! - **Reader**: resolves the schema, then reads nodes, sections, observations
//!   and grade rollups in one blocking pass ([`InspectionExport`])
//! - **Summary**: `CODE at p1m, p2m; CODE2 at p3m` encode/decode ([`summary`])
//!
//! # Example
//!
//! ```ignore
//! use drainsurvey::extraction::InspectionExport;
//!
//! let export = InspectionExport::open(Path::new("survey.db3"))?;
//! let result = export.extract()?;
//! for section in &result.sections {
//!     println!("{} {}-{}: {}", section.item_no, section.upstream_node,
//!         section.downstream_node, section.defect_summary);
//! }
//! ```

use std::collections::HashMap;

use tracing::info;

mod reader;
pub mod schema;
pub mod summary;
mod types;

pub use reader::{derive_node_names, natural_cmp, InspectionExport};
pub use types::*;

/// Extraction results keyed by import id.
///
/// Re-importing under the same id replaces the previous result wholesale.
#[derive(Debug, Default)]
pub struct ImportCatalog {
    imports: HashMap<String, ExtractionResult>,
}

impl ImportCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, returning the one it replaced.
    pub fn replace(&mut self, import_id: &str, result: ExtractionResult) -> Option<ExtractionResult> {
        info!(
            "Storing import '{}' ({} sections)",
            import_id,
            result.sections.len()
        );
        self.imports.insert(import_id.to_string(), result)
    }

    pub fn get(&self, import_id: &str) -> Option<&ExtractionResult> {
        self.imports.get(import_id)
    }

    pub fn remove(&mut self, import_id: &str) -> Option<ExtractionResult> {
        self.imports.remove(import_id)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(n: u32) -> ExtractionResult {
        ExtractionResult {
            sections: (1..=n)
                .map(|item_no| Section {
                    item_no,
                    key: format!("S{}", item_no),
                    upstream_node: "A".to_string(),
                    downstream_node: "B".to_string(),
                    pipe_size: "150".to_string(),
                    material: "VC".to_string(),
                    length_m: Some(10.0),
                    grades: SectionGrades::default(),
                    defect_summary: summary::NO_DEFECTS.to_string(),
                })
                .collect(),
            observations: vec![],
        }
    }

    #[test]
    fn test_reimport_replaces_not_merges() {
        let mut catalog = ImportCatalog::new();
        assert!(catalog.replace("job-1", result_with(3)).is_none());
        let previous = catalog.replace("job-1", result_with(1));
        assert_eq!(previous.map(|r| r.sections.len()), Some(3));
        assert_eq!(catalog.get("job-1").map(|r| r.sections.len()), Some(1));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_imports_are_isolated() {
        let mut catalog = ImportCatalog::new();
        catalog.replace("a", result_with(2));
        catalog.replace("b", result_with(5));
        catalog.remove("a");
        assert!(catalog.get("a").is_none());
        assert_eq!(catalog.get("b").map(|r| r.sections.len()), Some(5));
    }
}
