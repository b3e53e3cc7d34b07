//! Sector escalation.
//!
//! Turns a graded defect into escalation flags under a sector profile, and
//! rolls those up per section. Every function here is pure.

use crate::extraction::{DefectCategory, Observation, Section};

use super::types::{Classification, Priority, SectionClassification, SectorProfile};

const ROOT_CODES: &[&str] = &["RF", "RM", "RT"];
const INFILTRATION_CODES: &[&str] = &["I", "IS", "ID", "IR", "IG", "EX"];
/// Collapse / severe fracture family, urgent at any grade.
const ALWAYS_URGENT_CODES: &[&str] = &["X", "XP", "XB", "FM", "B"];

const MAX_GRADE: u8 = 5;

const ACTION_URGENT_REPAIR: &str = "Urgent structural repair required";
const ACTION_EXCAVATE_OR_LINE: &str = "Consider excavation and replacement or structural lining";
const ACTION_JETTING: &str = "High-pressure jetting to clear the obstruction";
const ACTION_RESURVEY: &str = "Re-survey after cleansing to confirm condition";
const ACTION_ROOT_CUT: &str = "Mechanical root cutting";
const ACTION_PRESSURE_TEST: &str = "Pressure test and seal the leaking defect";
const ACTION_COLLAPSE: &str = "Immediate intervention: collapse or severe fracture";

/// Classify one defect code at a grade.
///
/// Triggers are applied in a fixed order (grade escalation, root ingress,
/// infiltration, always-urgent codes) and accumulate.
pub fn classify(
    code: &str,
    grade: u8,
    category: DefectCategory,
    profile: &SectorProfile,
) -> Classification {
    classify_with_detail(code, None, grade, category, profile)
}

/// As [`classify`], also scanning the observation's free text for root mentions.
pub fn classify_observation(
    observation: &Observation,
    grade: u8,
    profile: &SectorProfile,
) -> Classification {
    classify_with_detail(
        &observation.code,
        observation.detail.as_deref(),
        grade,
        observation.category(),
        profile,
    )
}

fn classify_with_detail(
    code: &str,
    detail: Option<&str>,
    grade: u8,
    category: DefectCategory,
    profile: &SectorProfile,
) -> Classification {
    let code = code.trim().to_uppercase();
    let mut result = Classification::default();

    // Grade escalation
    match category {
        DefectCategory::Structural => {
            if grade >= profile.structural_threshold {
                result.urgent_repair = true;
                result.adoptable = false;
                result.raise(Priority::Urgent);
                result.push_action(ACTION_URGENT_REPAIR);
                result.push_action(ACTION_EXCAVATE_OR_LINE);
            }
            if grade >= profile.adoption_reject_structural {
                result.adoptable = false;
            }
        }
        DefectCategory::Service => {
            if grade >= profile.service_threshold {
                result.cleaning_required = true;
                result.reinspection_needed = true;
                result.adoptable = false;
                result.raise(if grade >= MAX_GRADE {
                    Priority::Urgent
                } else {
                    Priority::High
                });
                result.push_action(ACTION_JETTING);
                result.push_action(ACTION_RESURVEY);
            }
            if grade >= profile.adoption_reject_service {
                result.adoptable = false;
            }
        }
    }

    let trigger_priority = if grade >= 3 { Priority::High } else { Priority::Medium };

    let mentions_root = code.contains("ROOT")
        || detail.map_or(false, |d| d.to_lowercase().contains("root"));
    if ROOT_CODES.contains(&code.as_str()) || mentions_root {
        result.cleaning_required = true;
        result.raise(trigger_priority);
        result.push_action(ACTION_ROOT_CUT);
    }

    if INFILTRATION_CODES.contains(&code.as_str()) {
        result.raise(trigger_priority);
        result.push_action(ACTION_PRESSURE_TEST);
    }

    if ALWAYS_URGENT_CODES.contains(&code.as_str()) {
        result.urgent_repair = true;
        result.adoptable = false;
        result.raise(Priority::Urgent);
        result.push_action(ACTION_COLLAPSE);
    }

    result
}

/// Classify a section from its grade rollups and every observation in it.
///
/// Observations without their own grade take the section rollup for their
/// category.
pub fn classify_section(
    section: &Section,
    observations: &[&Observation],
    profile: &SectorProfile,
) -> SectionClassification {
    let structural = section.grades.structural_or_zero();
    let service = section.grades.service_or_zero();

    let mut flags = classify("", structural, DefectCategory::Structural, profile);
    flags.merge(&classify("", service, DefectCategory::Service, profile));

    for observation in observations {
        let grade = observation.effective_grade(&section.grades);
        flags.merge(&classify_observation(observation, grade, profile));
    }

    SectionClassification {
        item_no: section.item_no,
        flags,
        plr: pipeline_likelihood_rating(structural, service),
    }
}

/// Pipeline Likelihood Rating (1-5) from the two grade scales.
pub fn pipeline_likelihood_rating(structural: u8, service: u8) -> u8 {
    let worst = structural.max(service);
    if worst >= 5 {
        return 5;
    }
    if worst >= 4 {
        return 4;
    }
    let average = (structural as f64 + service as f64) / 2.0;
    if average >= 3.0 {
        3
    } else if average >= 2.0 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::SectionGrades;
    use crate::sector::{profile_for, Sector};

    fn utilities() -> SectorProfile {
        profile_for(Sector::Utilities)
    }

    #[test]
    fn test_structural_escalation() {
        let result = classify("FC", 4, DefectCategory::Structural, &utilities());
        assert!(result.urgent_repair);
        assert!(!result.adoptable);
        assert_eq!(result.priority, Priority::Urgent);
        assert_eq!(result.actions, vec![ACTION_URGENT_REPAIR, ACTION_EXCAVATE_OR_LINE]);

        let below = classify("FC", 3, DefectCategory::Structural, &utilities());
        assert!(!below.urgent_repair);
        assert!(below.adoptable);
        assert_eq!(below.priority, Priority::Low);
    }

    #[test]
    fn test_service_escalation_priority() {
        let high = classify("DER", 4, DefectCategory::Service, &utilities());
        assert!(high.cleaning_required && high.reinspection_needed);
        assert_eq!(high.priority, Priority::High);
        assert!(!high.adoptable);

        let max = classify("DER", 5, DefectCategory::Service, &utilities());
        assert_eq!(max.priority, Priority::Urgent);
    }

    #[test]
    fn test_root_trigger_independent_of_threshold() {
        let low = classify("RF", 2, DefectCategory::Service, &utilities());
        assert!(low.cleaning_required);
        assert_eq!(low.priority, Priority::Medium);
        assert_eq!(low.actions, vec![ACTION_ROOT_CUT]);

        let mid = classify("RM", 3, DefectCategory::Service, &utilities());
        assert_eq!(mid.priority, Priority::High);
    }

    #[test]
    fn test_root_mention_in_free_text() {
        let observation = Observation {
            section_item_no: 1,
            code: "SO".to_string(),
            position_m: 3.0,
            detail: Some("Fine Roots at joint".to_string()),
            grade: None,
        };
        let result = classify_observation(&observation, 1, &utilities());
        assert!(result.cleaning_required);
        assert!(result.actions.contains(&ACTION_ROOT_CUT.to_string()));
    }

    #[test]
    fn test_infiltration_trigger() {
        let result = classify("IR", 3, DefectCategory::Service, &utilities());
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.actions, vec![ACTION_PRESSURE_TEST]);
        assert!(result.adoptable);
    }

    #[test]
    fn test_always_urgent_regardless_of_grade() {
        let result = classify("XP", 1, DefectCategory::Structural, &utilities());
        assert!(result.urgent_repair);
        assert!(!result.adoptable);
        assert_eq!(result.priority, Priority::Urgent);
    }

    #[test]
    fn test_triggers_accumulate_in_order() {
        // Service escalation then root
        let result = classify("RM", 5, DefectCategory::Service, &utilities());
        assert_eq!(
            result.actions,
            vec![ACTION_JETTING, ACTION_RESURVEY, ACTION_ROOT_CUT]
        );
        assert_eq!(result.priority, Priority::Urgent);
    }

    #[test]
    fn test_escalation_is_monotonic_in_grade() {
        for sector in Sector::ALL {
            let profile = profile_for(sector);
            for code in ["FC", "DER", "RF", "IS", "XP", "WL", "X"] {
                for category in [DefectCategory::Structural, DefectCategory::Service] {
                    let mut previous = classify(code, 0, category, &profile);
                    for grade in 1..=5 {
                        let current = classify(code, grade, category, &profile);
                        assert!(current.priority >= previous.priority, "{code} {grade}");
                        assert!(current.urgent_repair || !previous.urgent_repair);
                        assert!(current.cleaning_required || !previous.cleaning_required);
                        assert!(current.reinspection_needed || !previous.reinspection_needed);
                        assert!(!current.adoptable || previous.adoptable);
                        previous = current;
                    }
                }
            }
        }
    }

    #[test]
    fn test_adoption_profile_rejects_grade_three() {
        let profile = profile_for(Sector::Adoption);
        let result = classify("FC", 3, DefectCategory::Structural, &profile);
        assert!(!result.adoptable);
        assert!(!result.urgent_repair);
    }

    #[test]
    fn test_plr_formula() {
        assert_eq!(pipeline_likelihood_rating(5, 1), 5);
        assert_eq!(pipeline_likelihood_rating(4, 0), 4);
        assert_eq!(pipeline_likelihood_rating(3, 3), 3);
        assert_eq!(pipeline_likelihood_rating(3, 1), 2);
        assert_eq!(pipeline_likelihood_rating(1, 1), 1);
        assert_eq!(pipeline_likelihood_rating(0, 0), 1);
    }

    #[test]
    fn test_clean_section_is_adoptable() {
        let section = Section {
            item_no: 4,
            key: "S4".to_string(),
            upstream_node: "MH4".to_string(),
            downstream_node: "MH5".to_string(),
            pipe_size: "225".to_string(),
            material: "PVC".to_string(),
            length_m: Some(30.0),
            grades: SectionGrades {
                structural: Some(0),
                service: Some(0),
            },
            defect_summary: "No defects observed".to_string(),
        };
        let result = classify_section(&section, &[], &utilities());
        assert!(result.flags.adoptable);
        assert_eq!(result.flags.priority, Priority::Low);
        assert_eq!(result.plr, 1);
    }
}
