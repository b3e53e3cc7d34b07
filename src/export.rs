//! Compliance export (CSV and JSON).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SurveyError;
use crate::pipeline::ClassifiedSection;
use crate::sector::{pipeline_likelihood_rating, SectorProfile};

pub const CSV_HEADER: [&str; 9] = [
    "Item No",
    "PLR",
    "Upstream Node",
    "Downstream Node",
    "Structural Grade",
    "Service Grade",
    "Defect Description",
    "Recommended Action",
    "Action Type",
];

const EXPORT_FORMAT_NAME: &str = "MSCC5 condition report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(SurveyError::Export(format!("unknown export format '{}'", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Json => f.write_str("json"),
        }
    }
}

/// One exported row. Field names match the CSV columns one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub item_no: u32,
    /// Computed from the grades when absent
    pub plr: Option<u8>,
    pub upstream_node: String,
    pub downstream_node: String,
    pub structural_grade: u8,
    pub service_grade: u8,
    pub defect_description: String,
    pub recommended_action: String,
    pub action_type: String,
}

impl From<&ClassifiedSection> for ExportRecord {
    fn from(classified: &ClassifiedSection) -> Self {
        let section = &classified.section;
        let primary = &classified.recommendation.primary;
        let actions = &classified.classification.flags.actions;
        let recommended_action = if actions.is_empty() {
            primary.rationale.clone()
        } else {
            format!("{}; {}", primary.rationale, actions.join("; "))
        };
        ExportRecord {
            item_no: section.item_no,
            plr: Some(classified.classification.plr),
            upstream_node: section.upstream_node.clone(),
            downstream_node: section.downstream_node.clone(),
            structural_grade: section.grades.structural_or_zero(),
            service_grade: section.grades.service_or_zero(),
            defect_description: section.defect_summary.clone(),
            recommended_action,
            action_type: primary.rec_type.label().to_string(),
        }
    }
}

impl ExportRecord {
    pub fn plr_or_computed(&self) -> u8 {
        self.plr
            .unwrap_or_else(|| pipeline_likelihood_rating(self.structural_grade, self.service_grade))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    sector: &'a str,
    standards_applied: &'a [String],
    export_format: &'a str,
    generated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSection<'a> {
    #[serde(flatten)]
    record: &'a ExportRecord,
    compatible_with: String,
}

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    metadata: JsonMetadata<'a>,
    sections: Vec<JsonSection<'a>>,
}

/// Serializes classified sections for a sector.
pub struct ExportFormatter<'a> {
    profile: &'a SectorProfile,
    generated_at: DateTime<Utc>,
}

impl<'a> ExportFormatter<'a> {
    pub fn new(profile: &'a SectorProfile) -> Self {
        Self {
            profile,
            generated_at: Utc::now(),
        }
    }

    /// Fix the generation timestamp (reproducible output).
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn format(&self, sections: &[ClassifiedSection], format: ExportFormat) -> Result<String, SurveyError> {
        let records: Vec<ExportRecord> = sections.iter().map(ExportRecord::from).collect();
        self.format_records(&records, format)
    }

    pub fn format_records(&self, records: &[ExportRecord], format: ExportFormat) -> Result<String, SurveyError> {
        // Fill in any missing PLR before either serializer sees the rows
        let records: Vec<ExportRecord> = records
            .iter()
            .map(|r| ExportRecord {
                plr: Some(r.plr_or_computed()),
                ..r.clone()
            })
            .collect();
        match format {
            ExportFormat::Csv => Ok(to_csv(&records)),
            ExportFormat::Json => self.to_json(&records),
        }
    }

    fn to_json(&self, records: &[ExportRecord]) -> Result<String, SurveyError> {
        let compatible_with = self.profile.required_standards.join(", ");
        let export = JsonExport {
            metadata: JsonMetadata {
                sector: self.profile.sector.name(),
                standards_applied: &self.profile.required_standards,
                export_format: EXPORT_FORMAT_NAME,
                generated_at: self.generated_at.to_rfc3339(),
            },
            sections: records
                .iter()
                .map(|record| JsonSection {
                    record,
                    compatible_with: compatible_with.clone(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| SurveyError::Export(format!("failed to serialize JSON export: {}", e)))
    }
}

fn to_csv(records: &[ExportRecord]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for r in records {
        let row = [
            r.item_no.to_string(),
            r.plr_or_computed().to_string(),
            quote(&r.upstream_node),
            quote(&r.downstream_node),
            r.structural_grade.to_string(),
            r.service_grade.to_string(),
            quote(&r.defect_description),
            quote(&r.recommended_action),
            quote(&r.action_type),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::{profile_for, Sector};
    use chrono::TimeZone;

    fn record(item_no: u32, plr: Option<u8>, structural: u8, service: u8) -> ExportRecord {
        ExportRecord {
            item_no,
            plr,
            upstream_node: "MH1".to_string(),
            downstream_node: "MH2".to_string(),
            structural_grade: structural,
            service_grade: service,
            defect_description: "FC at 2m; DER at 3m".to_string(),
            recommended_action: "Patch \"A\"".to_string(),
            action_type: "patch".to_string(),
        }
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let profile = profile_for(Sector::Utilities);
        let csv = ExportFormatter::new(&profile)
            .format_records(&[record(1, Some(4), 4, 2)], ExportFormat::Csv)
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Item No,PLR,Upstream Node,Downstream Node,Structural Grade,Service Grade,Defect Description,Recommended Action,Action Type"
        );
        assert_eq!(
            lines[1],
            r#"1,4,"MH1","MH2",4,2,"FC at 2m; DER at 3m","Patch ""A""","patch""#
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_missing_plr_is_computed() {
        let profile = profile_for(Sector::Utilities);
        let csv = ExportFormatter::new(&profile)
            .format_records(&[record(7, None, 3, 3)], ExportFormat::Csv)
            .unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("7,3,"));
    }

    #[test]
    fn test_json_metadata_and_sections() {
        let profile = profile_for(Sector::Highways);
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let json = ExportFormatter::new(&profile)
            .with_timestamp(ts)
            .format_records(&[record(1, None, 5, 1)], ExportFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["sector"], "highways");
        assert_eq!(value["metadata"]["generatedAt"], "2026-03-01T09:30:00+00:00");
        assert_eq!(value["metadata"]["standardsApplied"][1], "DMRB CD 535");
        assert_eq!(value["sections"][0]["plr"], 5);
        assert_eq!(value["sections"][0]["upstreamNode"], "MH1");
        assert_eq!(value["sections"][0]["actionType"], "patch");
        assert!(value["sections"][0]["compatibleWith"]
            .as_str()
            .unwrap()
            .contains("MSCC5"));
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
