//! Type definitions for export-readiness validation.
//!
//! Inputs arrive from the pricing/travel collaborators as JSON; the report is
//! serialized back to the presentation layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extraction::DefectCategory;
use crate::pipeline::ClassifiedSection;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// What the validator needs to know about one classified section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationItem {
    pub item_no: u32,
    pub defect_category: DefectCategory,
    /// Work category the section is priced under
    pub work_category: String,
}

impl From<&ClassifiedSection> for ValidationItem {
    fn from(classified: &ClassifiedSection) -> Self {
        ValidationItem {
            item_no: classified.item_no(),
            defect_category: classified.defect_category(),
            work_category: classified.work_category().to_string(),
        }
    }
}

/// A priced work category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfiguration {
    pub id: String,
    pub category_name: String,
    pub day_rate: f64,
    /// Items needed per day for the day rate to be met
    #[serde(default)]
    pub minimum_quantity: Option<u32>,
}

impl PricingConfiguration {
    pub fn covers(&self, item: &ValidationItem) -> bool {
        self.category_name
            .trim()
            .eq_ignore_ascii_case(item.work_category.trim())
    }
}

/// Already-resolved travel context for the job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelInfo {
    pub travel_minutes: f64,
    /// Cost of the travel beyond the baseline allowance
    pub additional_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTravelRate {
    pub work_category_id: String,
    pub vehicle_type: String,
    pub hourly_rate: f64,
}

// =============================================================================
// OUTPUT TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Configuration,
    Quantity,
    Travel,
    Vehicle,
}

/// Ordered so that `Error` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One export blocker or warning. Derived data, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_ids: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_value: Option<f64>,
    /// Defect-category group the issue was computed for, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<DefectCategory>,
}

/// Suggested pricing for one item, derived from the calculated values in a
/// report.
///
/// A quantity shortfall replaces the item's rate (day rate spread over the
/// items present); a travel split is added on top of whatever rate applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateAdjustment {
    pub item_no: u32,
    /// Replacement per-item rate from a minimum-quantity shortfall
    pub rate: Option<f64>,
    /// Extra travel cost carried by this item
    pub travel_surcharge: f64,
}

impl RateAdjustment {
    /// Replacement rate plus travel surcharge. `None` when only a surcharge
    /// applies, since the base rate is then the configured one.
    pub fn adjusted_rate(&self) -> Option<f64> {
        self.rate.map(|rate| round_currency(rate + self.travel_surcharge))
    }
}

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_ready: bool,
    pub issues: Vec<ValidationIssue>,
    pub summary: String,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Per-item pricing suggestions from every issue carrying a calculated
    /// value. Quantity values become the item's rate; travel values add up
    /// into its surcharge.
    pub fn rate_adjustments(&self) -> Vec<RateAdjustment> {
        let mut adjustments: BTreeMap<u32, RateAdjustment> = BTreeMap::new();
        for issue in &self.issues {
            let Some(value) = issue.calculated_value else {
                continue;
            };
            if !matches!(issue.issue_type, IssueType::Quantity | IssueType::Travel) {
                continue;
            }
            for &item_no in &issue.item_ids {
                let entry = adjustments.entry(item_no).or_insert(RateAdjustment {
                    item_no,
                    rate: None,
                    travel_surcharge: 0.0,
                });
                if issue.issue_type == IssueType::Quantity {
                    entry.rate = Some(value);
                } else {
                    entry.travel_surcharge = round_currency(entry.travel_surcharge + value);
                }
            }
        }
        adjustments.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_serializes_type_field() {
        let issue = ValidationIssue {
            issue_type: IssueType::Quantity,
            severity: IssueSeverity::Warning,
            message: "below minimum".to_string(),
            item_ids: vec![1, 2],
            suggested_action: None,
            calculated_value: Some(50.0),
            category: Some(DefectCategory::Service),
        };
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""type":"quantity""#));
        assert!(json.contains(r#""severity":"warning""#));
        assert!(json.contains(r#""itemIds":[1,2]"#));
        assert!(json.contains(r#""calculatedValue":50.0"#));
        assert!(!json.contains("suggestedAction"));
    }

    #[test]
    fn test_pricing_configuration_deserialize() {
        let json = r#"{ "id": "cfg-1", "categoryName": "Cleansing", "dayRate": 150, "minimumQuantity": 5 }"#;
        let config: PricingConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.day_rate, 150.0);
        assert_eq!(config.minimum_quantity, Some(5));

        let item = ValidationItem {
            item_no: 1,
            defect_category: DefectCategory::Service,
            work_category: "cleansing ".to_string(),
        };
        assert!(config.covers(&item));
    }

    #[test]
    fn test_rate_adjustments_separate_rate_and_surcharge() {
        let issue = |issue_type, ids: Vec<u32>, value| ValidationIssue {
            issue_type,
            severity: IssueSeverity::Warning,
            message: String::new(),
            item_ids: ids,
            suggested_action: None,
            calculated_value: value,
            category: None,
        };
        let report = ValidationReport {
            is_ready: true,
            issues: vec![
                issue(IssueType::Quantity, vec![1, 2], Some(50.0)),
                issue(IssueType::Travel, vec![2, 3], Some(20.0)),
                issue(IssueType::Vehicle, vec![], None),
            ],
            summary: String::new(),
        };
        let adjustments = report.rate_adjustments();
        assert_eq!(adjustments.len(), 3);
        assert_eq!(
            adjustments[0],
            RateAdjustment { item_no: 1, rate: Some(50.0), travel_surcharge: 0.0 }
        );
        assert_eq!(
            adjustments[1],
            RateAdjustment { item_no: 2, rate: Some(50.0), travel_surcharge: 20.0 }
        );
        assert_eq!(
            adjustments[2],
            RateAdjustment { item_no: 3, rate: None, travel_surcharge: 20.0 }
        );

        assert_eq!(adjustments[0].adjusted_rate(), Some(50.0));
        assert_eq!(adjustments[1].adjusted_rate(), Some(70.0), "rate plus surcharge");
        assert_eq!(adjustments[2].adjusted_rate(), None);
    }

    #[test]
    fn test_error_sorts_before_warning() {
        assert!(IssueSeverity::Error < IssueSeverity::Warning);
    }
}
