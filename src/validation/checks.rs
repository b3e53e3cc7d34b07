//! The four validation phases.
//!
//! Each phase is a pure function of its inputs and returns its own issue
//! list; the engine merges them.

use std::collections::BTreeMap;

use crate::extraction::DefectCategory;

use super::types::{
    IssueSeverity, IssueType, PricingConfiguration, TravelInfo, ValidationIssue, ValidationItem,
    VehicleTravelRate, WorkCategory,
};

/// Travel above this many minutes is charged on top of the day rate.
pub const TRAVEL_BASELINE_MINUTES: f64 = 120.0;

/// Category groups are always reported structural first.
const CATEGORY_ORDER: [DefectCategory; 2] = [DefectCategory::Structural, DefectCategory::Service];

fn configuration_for<'a>(
    item: &ValidationItem,
    configurations: &'a [PricingConfiguration],
) -> Option<&'a PricingConfiguration> {
    configurations.iter().find(|config| config.covers(item))
}

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Phase 1: every item must be priced.
pub fn check_configuration_coverage(
    items: &[ValidationItem],
    configurations: &[PricingConfiguration],
) -> Vec<ValidationIssue> {
    let mut missing_ids = Vec::new();
    let mut missing_categories: Vec<&str> = Vec::new();
    for item in items {
        if configuration_for(item, configurations).is_none() {
            missing_ids.push(item.item_no);
            if !missing_categories.contains(&item.work_category.as_str()) {
                missing_categories.push(&item.work_category);
            }
        }
    }

    if missing_ids.is_empty() {
        return Vec::new();
    }

    vec![ValidationIssue {
        issue_type: IssueType::Configuration,
        severity: IssueSeverity::Error,
        message: format!(
            "{} item(s) have no pricing configuration: {}",
            missing_ids.len(),
            join_ids(&missing_ids)
        ),
        item_ids: missing_ids,
        suggested_action: Some(format!(
            "Create pricing configuration(s) for: {}",
            missing_categories.join(", ")
        )),
        calculated_value: None,
        category: None,
    }]
}

/// Phase 2: items whose configuration's minimum quantity is not met.
///
/// Short items are grouped by defect category; each group's suggested value
/// spreads the day rate over the items actually present.
pub fn check_minimum_quantity(
    items: &[ValidationItem],
    configurations: &[PricingConfiguration],
) -> Vec<ValidationIssue> {
    // Count items per configuration first; the minimum applies to the whole job
    let mut per_config: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        if let Some(config) = configuration_for(item, configurations) {
            *per_config.entry(config.id.as_str()).or_default() += 1;
        }
    }

    let mut groups: BTreeMap<DefectCategory, (Vec<u32>, f64)> = BTreeMap::new();
    for item in items {
        let Some(config) = configuration_for(item, configurations) else {
            continue;
        };
        let Some(minimum) = config.minimum_quantity else {
            continue;
        };
        let count = per_config.get(config.id.as_str()).copied().unwrap_or(0);
        if count >= minimum as usize {
            continue;
        }
        // Day rate of the group is the first short configuration encountered
        let group = groups
            .entry(item.defect_category)
            .or_insert_with(|| (Vec::new(), config.day_rate));
        group.0.push(item.item_no);
    }

    CATEGORY_ORDER
        .iter()
        .filter_map(|category| {
            let (item_ids, day_rate) = groups.remove(category)?;
            let per_item = round_currency(day_rate / item_ids.len() as f64);
            Some(ValidationIssue {
                issue_type: IssueType::Quantity,
                severity: IssueSeverity::Warning,
                message: format!(
                    "{} {} item(s) do not meet the minimum quantity for their day rate",
                    item_ids.len(),
                    category.label()
                ),
                suggested_action: Some(format!(
                    "Spread the {:.2} day rate across {} item(s) at {:.2} each, or add work to reach the minimum",
                    day_rate,
                    item_ids.len(),
                    per_item
                )),
                item_ids,
                calculated_value: Some(per_item),
                category: Some(*category),
            })
        })
        .collect()
}

/// Phase 3: split extra travel cost evenly across each category group.
pub fn check_travel(
    items: &[ValidationItem],
    travel: &TravelInfo,
    baseline_minutes: f64,
) -> Vec<ValidationIssue> {
    if travel.travel_minutes <= baseline_minutes {
        return Vec::new();
    }

    let excess = travel.travel_minutes - baseline_minutes;
    CATEGORY_ORDER
        .iter()
        .filter_map(|category| {
            let item_ids: Vec<u32> = items
                .iter()
                .filter(|item| item.defect_category == *category)
                .map(|item| item.item_no)
                .collect();
            if item_ids.is_empty() {
                return None;
            }
            let per_item = round_currency(travel.additional_cost / item_ids.len() as f64);
            Some(ValidationIssue {
                issue_type: IssueType::Travel,
                severity: IssueSeverity::Warning,
                message: format!(
                    "Travel time of {:.0} minutes exceeds the {:.0} minute allowance by {:.0} minutes",
                    travel.travel_minutes, baseline_minutes, excess
                ),
                suggested_action: Some(format!(
                    "Add {:.2} travel cost to each of the {} {} item(s)",
                    per_item,
                    item_ids.len(),
                    category.label()
                )),
                item_ids,
                calculated_value: Some(per_item),
                category: Some(*category),
            })
        })
        .collect()
}

/// Phase 4: priced categories that resolve to a known work category but
/// have no vehicle travel rate.
pub fn check_vehicle_rates(
    configurations: &[PricingConfiguration],
    work_categories: &[WorkCategory],
    vehicle_rates: &[VehicleTravelRate],
) -> Vec<ValidationIssue> {
    let mut uncovered: Vec<&str> = Vec::new();
    for config in configurations {
        let Some(work_category) = work_categories
            .iter()
            .find(|wc| names_match(&wc.name, &config.category_name))
        else {
            continue;
        };
        let has_rate = vehicle_rates
            .iter()
            .any(|rate| rate.work_category_id == work_category.id);
        if !has_rate && !uncovered.contains(&config.category_name.as_str()) {
            uncovered.push(&config.category_name);
        }
    }

    if uncovered.is_empty() {
        return Vec::new();
    }

    vec![ValidationIssue {
        issue_type: IssueType::Vehicle,
        severity: IssueSeverity::Warning,
        message: format!(
            "No vehicle travel rate for: {}",
            uncovered.join(", ")
        ),
        item_ids: Vec::new(),
        suggested_action: Some("Add a vehicle travel rate for each listed category".to_string()),
        calculated_value: None,
        category: None,
    }]
}

/// Loose name comparison: case, spacing and punctuation are ignored, and
/// either name may contain the other ("Cleansing" ~ "Drain Cleansing").
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(item_no: u32, category: DefectCategory, work_category: &str) -> ValidationItem {
        ValidationItem {
            item_no,
            defect_category: category,
            work_category: work_category.to_string(),
        }
    }

    fn config(id: &str, name: &str, day_rate: f64, minimum: Option<u32>) -> PricingConfiguration {
        PricingConfiguration {
            id: id.to_string(),
            category_name: name.to_string(),
            day_rate,
            minimum_quantity: minimum,
        }
    }

    #[test]
    fn test_coverage_lists_every_unpriced_item() {
        let items = vec![
            item(1, DefectCategory::Structural, "Patch Repair"),
            item(2, DefectCategory::Service, "Cleansing"),
            item(3, DefectCategory::Service, "CCTV Survey"),
        ];
        let configs = vec![config("c1", "Cleansing", 150.0, None)];
        let issues = check_configuration_coverage(&items, &configs);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert_eq!(issues[0].item_ids, vec![1, 3]);
        let action = issues[0].suggested_action.as_deref().unwrap();
        assert!(action.contains("Patch Repair") && action.contains("CCTV Survey"));
    }

    #[test]
    fn test_coverage_ok_when_all_priced() {
        let items = vec![item(1, DefectCategory::Service, "Cleansing")];
        let configs = vec![config("c1", "cleansing", 150.0, None)];
        assert!(check_configuration_coverage(&items, &configs).is_empty());
    }

    #[test]
    fn test_minimum_quantity_spreads_day_rate() {
        let items = vec![
            item(1, DefectCategory::Service, "Cleansing"),
            item(2, DefectCategory::Service, "Cleansing"),
            item(3, DefectCategory::Service, "Cleansing"),
        ];
        let configs = vec![config("c1", "Cleansing", 150.0, Some(5))];
        let issues = check_minimum_quantity(&items, &configs);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Quantity);
        assert_eq!(issues[0].calculated_value, Some(50.0));
        assert_eq!(issues[0].category, Some(DefectCategory::Service));
    }

    #[test]
    fn test_minimum_quantity_met_or_absent() {
        let items = vec![
            item(1, DefectCategory::Service, "Cleansing"),
            item(2, DefectCategory::Service, "Cleansing"),
        ];
        assert!(check_minimum_quantity(&items, &[config("c1", "Cleansing", 150.0, Some(2))]).is_empty());
        assert!(check_minimum_quantity(&items, &[config("c1", "Cleansing", 150.0, None)]).is_empty());
    }

    #[test]
    fn test_minimum_quantity_splits_by_category() {
        let items = vec![
            item(1, DefectCategory::Structural, "Patch Repair"),
            item(2, DefectCategory::Service, "Cleansing"),
            item(3, DefectCategory::Service, "Cleansing"),
        ];
        let configs = vec![
            config("c1", "Patch Repair", 300.0, Some(4)),
            config("c2", "Cleansing", 120.0, Some(4)),
        ];
        let issues = check_minimum_quantity(&items, &configs);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category, Some(DefectCategory::Structural));
        assert_eq!(issues[0].calculated_value, Some(300.0));
        assert_eq!(issues[1].item_ids, vec![2, 3]);
        assert_eq!(issues[1].calculated_value, Some(60.0));
    }

    #[test]
    fn test_travel_split_per_group() {
        let items = vec![
            item(1, DefectCategory::Structural, "Patch Repair"),
            item(2, DefectCategory::Structural, "Patch Repair"),
        ];
        let travel = TravelInfo {
            travel_minutes: 150.0,
            additional_cost: 40.0,
        };
        let issues = check_travel(&items, &travel, TRAVEL_BASELINE_MINUTES);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Travel);
        assert_eq!(issues[0].calculated_value, Some(20.0));
        assert_eq!(issues[0].item_ids, vec![1, 2]);
    }

    #[test]
    fn test_travel_within_baseline() {
        let items = vec![item(1, DefectCategory::Service, "Cleansing")];
        let travel = TravelInfo {
            travel_minutes: 120.0,
            additional_cost: 40.0,
        };
        assert!(check_travel(&items, &travel, TRAVEL_BASELINE_MINUTES).is_empty());
    }

    #[test]
    fn test_vehicle_rate_missing() {
        let configs = vec![
            config("c1", "Cleansing", 150.0, None),
            config("c2", "Patch Repair", 300.0, None),
            config("c3", "Unlisted Work", 100.0, None),
        ];
        let work_categories = vec![
            WorkCategory { id: "wc1".to_string(), name: "Drain Cleansing".to_string() },
            WorkCategory { id: "wc2".to_string(), name: "patch-repair".to_string() },
        ];
        let rates = vec![VehicleTravelRate {
            work_category_id: "wc1".to_string(),
            vehicle_type: "Jetting unit".to_string(),
            hourly_rate: 85.0,
        }];
        let issues = check_vehicle_rates(&configs, &work_categories, &rates);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Vehicle);
        assert!(issues[0].message.contains("Patch Repair"));
        assert!(!issues[0].message.contains("Cleansing"));
        assert!(!issues[0].message.contains("Unlisted"));
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Patch Repair", "patch-repair"));
        assert!(names_match("Cleansing", "Drain Cleansing"));
        assert!(!names_match("Cleansing", "Lining"));
        assert!(!names_match("", "Lining"));
    }
}
