use super::types::{Sector, SectorProfile};

/// Escalation threshold used by most sectors.
pub const DEFAULT_THRESHOLD: u8 = 4;

fn standards(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Built-in policy profile for a sector.
pub fn profile_for(sector: Sector) -> SectorProfile {
    match sector {
        Sector::Utilities => SectorProfile {
            sector,
            display_name: "Water utilities".to_string(),
            structural_threshold: DEFAULT_THRESHOLD,
            service_threshold: DEFAULT_THRESHOLD,
            adoption_reject_structural: DEFAULT_THRESHOLD,
            adoption_reject_service: DEFAULT_THRESHOLD,
            required_standards: standards(&["MSCC5", "WRc SRM4", "WRc Drain Repair Book"]),
        },
        // Adoption is stricter about what can be accepted than about what is urgent
        Sector::Adoption => SectorProfile {
            sector,
            display_name: "Section 104 adoption".to_string(),
            structural_threshold: DEFAULT_THRESHOLD,
            service_threshold: DEFAULT_THRESHOLD,
            adoption_reject_structural: 3,
            adoption_reject_service: 3,
            required_standards: standards(&["MSCC5", "Design and Construction Guidance", "WRc SRM4"]),
        },
        Sector::Highways => SectorProfile {
            sector,
            display_name: "Highways drainage".to_string(),
            structural_threshold: DEFAULT_THRESHOLD,
            service_threshold: DEFAULT_THRESHOLD,
            adoption_reject_structural: DEFAULT_THRESHOLD,
            adoption_reject_service: DEFAULT_THRESHOLD,
            required_standards: standards(&["MSCC5", "DMRB CD 535", "WRc SRM4"]),
        },
        Sector::Insurance => SectorProfile {
            sector,
            display_name: "Insurance claims".to_string(),
            structural_threshold: 3,
            service_threshold: DEFAULT_THRESHOLD,
            adoption_reject_structural: DEFAULT_THRESHOLD,
            adoption_reject_service: DEFAULT_THRESHOLD,
            required_standards: standards(&["MSCC5", "WRc Drain Repair Book"]),
        },
        Sector::Construction => SectorProfile {
            sector,
            display_name: "New-build construction".to_string(),
            structural_threshold: DEFAULT_THRESHOLD,
            service_threshold: 3,
            adoption_reject_structural: 3,
            adoption_reject_service: 3,
            required_standards: standards(&["MSCC5", "BS EN 1610", "Building Regulations Part H"]),
        },
        Sector::Domestic => SectorProfile {
            sector,
            display_name: "Domestic drainage".to_string(),
            structural_threshold: DEFAULT_THRESHOLD,
            service_threshold: DEFAULT_THRESHOLD,
            adoption_reject_structural: DEFAULT_THRESHOLD,
            adoption_reject_service: DEFAULT_THRESHOLD,
            required_standards: standards(&["MSCC5", "WRc Drain Repair Book"]),
        },
    }
}
