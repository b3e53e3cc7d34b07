use tracing::{debug, info};

use crate::pipeline::ClassifiedSection;

use super::checks::{
    check_configuration_coverage, check_minimum_quantity, check_travel, check_vehicle_rates,
    TRAVEL_BASELINE_MINUTES,
};
use super::types::{
    IssueSeverity, PricingConfiguration, TravelInfo, ValidationItem, ValidationReport,
    VehicleTravelRate, WorkCategory,
};

pub const SUMMARY_READY: &str = "Ready for export";
pub const SUMMARY_WARNINGS: &str = "Ready for export with warnings present";
pub const SUMMARY_BLOCKED: &str = "Issues must be resolved before export";

/// Optional context for the travel and vehicle phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    pub travel: Option<&'a TravelInfo>,
    pub work_categories: Option<&'a [WorkCategory]>,
    pub vehicle_rates: Option<&'a [VehicleTravelRate]>,
}

/// Export-readiness checks over a classified batch.
///
/// Holds no state between calls; `validate` can be re-run whenever any
/// input changes.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    travel_baseline_minutes: f64,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(TRAVEL_BASELINE_MINUTES)
    }
}

impl ValidationEngine {
    pub fn new(travel_baseline_minutes: f64) -> Self {
        Self {
            travel_baseline_minutes,
        }
    }

    pub fn travel_baseline_minutes(&self) -> f64 {
        self.travel_baseline_minutes
    }

    pub fn validate_sections(
        &self,
        sections: &[ClassifiedSection],
        configurations: &[PricingConfiguration],
        context: ValidationContext<'_>,
    ) -> ValidationReport {
        let items: Vec<ValidationItem> = sections.iter().map(ValidationItem::from).collect();
        self.validate(&items, configurations, context)
    }

    /// Run every applicable phase and merge the findings, errors first.
    pub fn validate(
        &self,
        items: &[ValidationItem],
        configurations: &[PricingConfiguration],
        context: ValidationContext<'_>,
    ) -> ValidationReport {
        let mut issues = check_configuration_coverage(items, configurations);
        issues.extend(check_minimum_quantity(items, configurations));

        if let Some(travel) = context.travel {
            issues.extend(check_travel(items, travel, self.travel_baseline_minutes));
        } else {
            debug!("No travel context, skipping travel check");
        }

        match (context.work_categories, context.vehicle_rates) {
            (Some(work_categories), Some(vehicle_rates)) => {
                issues.extend(check_vehicle_rates(configurations, work_categories, vehicle_rates));
            }
            _ => debug!("No vehicle rate context, skipping vehicle check"),
        }

        // Stable: phase order is kept within each severity
        issues.sort_by_key(|issue| issue.severity);

        let has_errors = issues.iter().any(|i| i.severity == IssueSeverity::Error);
        let summary = if has_errors {
            SUMMARY_BLOCKED
        } else if issues.is_empty() {
            SUMMARY_READY
        } else {
            SUMMARY_WARNINGS
        };

        info!(
            "Validated {} items: {} issue(s), {}",
            items.len(),
            issues.len(),
            summary
        );

        ValidationReport {
            is_ready: !has_errors,
            issues,
            summary: summary.to_string(),
        }
    }
}

/// Validate with the default travel baseline.
pub fn validate(
    items: &[ValidationItem],
    configurations: &[PricingConfiguration],
    context: ValidationContext<'_>,
) -> ValidationReport {
    ValidationEngine::default().validate(items, configurations, context)
}
