//! Defect summary strings.
//!
//! The export and downstream tooling exchange a section's observations as
//! `CODE at p1m, p2m; CODE2 at p3m`. This is a serialization of the canonical
//! observation list: [`encode`] produces it, [`decode`] reverses it.

use tracing::debug;

use super::types::Observation;

/// Summary used for a section with no coded observations.
pub const NO_DEFECTS: &str = "No defects observed";

/// One `(code, position)` pair recovered from a summary string.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub code: String,
    pub position_m: f64,
}

/// Encode observations (already in position order) into a summary string.
///
/// Same-code observations share one `CODE at ...` group; groups appear in
/// order of each code's first position.
pub fn encode(observations: &[Observation]) -> String {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for obs in observations {
        let code = obs.code.trim().to_uppercase();
        match groups.iter_mut().find(|(c, _)| *c == code) {
            Some((_, positions)) => positions.push(obs.position_m),
            None => groups.push((code, vec![obs.position_m])),
        }
    }

    if groups.is_empty() {
        return NO_DEFECTS.to_string();
    }

    groups
        .iter()
        .map(|(code, positions)| {
            let list = positions
                .iter()
                .map(|p| format!("{}m", format_position(*p)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} at {}", code, list)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decode a summary string back into `(code, position)` entries.
///
/// Unparseable fragments are skipped rather than failing the section.
pub fn decode(summary: &str) -> Vec<SummaryEntry> {
    let trimmed = summary.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_DEFECTS) {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for group in trimmed.split(';') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let Some((code, positions)) = group.split_once(" at ") else {
            debug!("Skipping summary fragment without positions: '{}'", group);
            continue;
        };
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            continue;
        }
        for raw in positions.split(',') {
            let raw = raw.trim().trim_end_matches('m').trim();
            match raw.parse::<f64>() {
                Ok(position_m) => entries.push(SummaryEntry {
                    code: code.clone(),
                    position_m,
                }),
                Err(_) => debug!("Skipping unparseable position '{}' for {}", raw, code),
            }
        }
    }
    entries
}

/// Positions are printed with at most two decimals and no trailing zeros.
fn format_position(position: f64) -> String {
    let rounded = (position * 100.0).round() / 100.0;
    // Avoid "-0"
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}
