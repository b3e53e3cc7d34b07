use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use super::schema::{self, ResolvedTable, TRAVERSAL_MARKERS};
use super::summary;
use super::types::{DefectCategory, ExtractionResult, GradeRollup, Observation, Section, SectionGrades};
use crate::error::ExtractionError;

const PLACEHOLDER: &str = "Unknown";

static NULL: Value = Value::Null;

/// A read-only handle on one inspection export (SQLite).
///
/// Each import owns its own connection, so concurrent imports never share state.
/// All operations are synchronous (rusqlite is blocking).
pub struct InspectionExport {
    conn: Connection,
}

struct RawSection {
    pk: String,
    key: Option<String>,
    sort_order: Option<f64>,
    size: Option<String>,
    material: Option<String>,
    length: Option<f64>,
    from_node: Option<String>,
    to_node: Option<String>,
}

impl RawSection {
    fn display_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.pk)
    }
}

impl InspectionExport {
    /// Open an export file read-only.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| ExtractionError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Opened inspection export at {:?}", path);
        Ok(Self { conn })
    }

    /// Wrap an already open connection (used for in-memory exports).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Produce the canonical section and observation records.
    ///
    /// Required tables and columns are resolved before any row is read, so a
    /// structural problem aborts the import without partial output. Malformed
    /// rows are skipped with a warning.
    pub fn extract(&self) -> Result<ExtractionResult, ExtractionError> {
        let sections_table = required(&self.conn, schema::SECTIONS)?;
        let observations_table = required(&self.conn, schema::OBSERVATIONS)?;
        let grades_table = required(&self.conn, schema::GRADES)?;
        let nodes_table = ResolvedTable::resolve(&self.conn, schema::NODES)?;
        let inspections_table = ResolvedTable::resolve(&self.conn, schema::INSPECTIONS)?;

        let node_names = match &nodes_table {
            Some(table) => self.read_node_names(table)?,
            None => {
                warn!("No node lookup table; node names will be derived from section keys");
                HashMap::new()
            }
        };

        let raw_sections = self.read_sections(&sections_table)?;
        let item_numbers = assign_item_numbers(&raw_sections, sections_table.has("sort_order"));

        // section pk -> item number
        let by_pk: HashMap<&str, u32> = raw_sections
            .iter()
            .zip(item_numbers.iter())
            .map(|(s, n)| (s.pk.as_str(), *n))
            .collect();

        let inspection_to_section = match &inspections_table {
            Some(table) => Some(self.read_inspections(table)?),
            None => None,
        };
        let resolve_section = |inspection: &str| -> Option<u32> {
            let section_pk = match &inspection_to_section {
                Some(map) => map.get(inspection)?.as_str(),
                None => inspection,
            };
            by_pk.get(section_pk).copied()
        };

        let observations = self.read_observations(&observations_table, &resolve_section)?;
        let grades = self.read_grades(&grades_table, &resolve_section)?;

        let mut sections = Vec::with_capacity(raw_sections.len());
        for (raw, item_no) in raw_sections.iter().zip(item_numbers) {
            let (derived_up, derived_down) = derive_node_names(raw.display_key());
            let upstream_node = lookup_node(&node_names, raw.from_node.as_deref()).unwrap_or(derived_up);
            let downstream_node = lookup_node(&node_names, raw.to_node.as_deref()).unwrap_or(derived_down);

            let own: Vec<Observation> = observations
                .iter()
                .filter(|o| o.section_item_no == item_no)
                .cloned()
                .collect();

            sections.push(Section {
                item_no,
                key: raw.pk.clone(),
                upstream_node,
                downstream_node,
                pipe_size: raw.size.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                material: raw.material.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                length_m: raw.length,
                grades: grades.get(&item_no).copied().unwrap_or_default(),
                defect_summary: summary::encode(&own),
            });
        }

        sections.sort_by_key(|s| s.item_no);

        info!(
            "Extracted {} sections and {} observations",
            sections.len(),
            observations.len()
        );
        Ok(ExtractionResult { sections, observations })
    }

    fn read_node_names(&self, table: &ResolvedTable) -> Result<HashMap<String, String>, ExtractionError> {
        let mut names = HashMap::new();
        for row in read_rows(&self.conn, table)? {
            match (text(field(table, &row, "pk")), text(field(table, &row, "name"))) {
                (Some(pk), Some(name)) => {
                    names.insert(pk, name);
                }
                _ => warn!("Skipping {} row without id or name", table.schema.table),
            }
        }
        Ok(names)
    }

    fn read_sections(&self, table: &ResolvedTable) -> Result<Vec<RawSection>, ExtractionError> {
        let mut sections = Vec::new();
        for row in read_rows(&self.conn, table)? {
            let Some(pk) = text(field(table, &row, "pk")) else {
                warn!("Skipping {} row without primary key", table.schema.table);
                continue;
            };
            sections.push(RawSection {
                pk,
                key: text(field(table, &row, "key")),
                sort_order: number(field(table, &row, "sort_order")),
                size: text(field(table, &row, "size")),
                material: text(field(table, &row, "material")),
                length: number(field(table, &row, "length")),
                from_node: text(field(table, &row, "from_node")),
                to_node: text(field(table, &row, "to_node")),
            });
        }
        Ok(sections)
    }

    fn read_inspections(&self, table: &ResolvedTable) -> Result<HashMap<String, String>, ExtractionError> {
        let mut map = HashMap::new();
        for row in read_rows(&self.conn, table)? {
            match (text(field(table, &row, "pk")), text(field(table, &row, "section"))) {
                (Some(pk), Some(section)) => {
                    map.insert(pk, section);
                }
                _ => warn!("Skipping {} row without inspection or section key", table.schema.table),
            }
        }
        Ok(map)
    }

    fn read_observations(
        &self,
        table: &ResolvedTable,
        resolve_section: &dyn Fn(&str) -> Option<u32>,
    ) -> Result<Vec<Observation>, ExtractionError> {
        let mut observations = Vec::new();
        for row in read_rows(&self.conn, table)? {
            let Some(code) = text(field(table, &row, "code")).map(|c| c.to_uppercase()) else {
                warn!("Skipping observation without a code");
                continue;
            };
            if TRAVERSAL_MARKERS.contains(&code.as_str()) {
                continue;
            }
            let Some(inspection) = text(field(table, &row, "inspection")) else {
                warn!("Skipping {} observation without an inspection reference", code);
                continue;
            };
            let Some(section_item_no) = resolve_section(&inspection) else {
                warn!("Skipping {} observation for unknown inspection '{}'", code, inspection);
                continue;
            };
            let Some(position_m) = number(field(table, &row, "distance")) else {
                warn!("Skipping {} observation with unreadable distance", code);
                continue;
            };
            let grade = number(field(table, &row, "grade")).and_then(grade_from);

            observations.push(Observation {
                section_item_no,
                code,
                position_m,
                detail: text(field(table, &row, "text")),
                grade,
            });
        }

        observations.sort_by(|a, b| {
            a.section_item_no
                .cmp(&b.section_item_no)
                .then(a.position_m.total_cmp(&b.position_m))
        });
        Ok(observations)
    }

    fn read_grades(
        &self,
        table: &ResolvedTable,
        resolve_section: &dyn Fn(&str) -> Option<u32>,
    ) -> Result<HashMap<u32, SectionGrades>, ExtractionError> {
        let mut grades: HashMap<u32, SectionGrades> = HashMap::new();
        for row in read_rows(&self.conn, table)? {
            let Some(inspection) = text(field(table, &row, "inspection")) else {
                warn!("Skipping grade row without an inspection reference");
                continue;
            };
            let Some(item_no) = resolve_section(&inspection) else {
                warn!("Skipping grade row for unknown inspection '{}'", inspection);
                continue;
            };
            let Some(category) = text(field(table, &row, "category"))
                .as_deref()
                .and_then(DefectCategory::from_tag)
            else {
                warn!("Skipping grade row with unknown category for section {}", item_no);
                continue;
            };
            let Some(highest_grade) = number(field(table, &row, "grade")).and_then(grade_from) else {
                warn!("Skipping grade row with invalid grade for section {}", item_no);
                continue;
            };
            grades.entry(item_no).or_default().record(GradeRollup {
                category,
                highest_grade,
            });
        }
        Ok(grades)
    }
}

fn required(conn: &Connection, schema: schema::TableSchema) -> Result<ResolvedTable, ExtractionError> {
    ResolvedTable::resolve(conn, schema)?
        .ok_or_else(|| ExtractionError::MissingTable(schema.table.to_string()))
}

fn read_rows(conn: &Connection, table: &ResolvedTable) -> Result<Vec<Vec<Value>>, ExtractionError> {
    let width = table.columns.len();
    let mut stmt = conn.prepare(&table.select_sql())?;
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn field<'a>(table: &ResolvedTable, row: &'a [Value], name: &str) -> &'a Value {
    table.index(name).and_then(|i| row.get(i)).unwrap_or(&NULL)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) if f.is_finite() => Some(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn grade_from(value: f64) -> Option<u8> {
    (0.0..=5.0).contains(&value).then(|| value.round() as u8)
}

/// Stable item numbering aligned with `sections`.
///
/// The sort key (when the export has one) only decides the order; numbers are
/// always 1-based positions, so every section gets a distinct item number
/// whatever the key's base or gaps. Ties fall back to natural key order.
fn assign_item_numbers(sections: &[RawSection], has_sort_key: bool) -> Vec<u32> {
    let mut order: Vec<usize> = (0..sections.len()).collect();
    order.sort_by(|&a, &b| {
        let (sa, sb) = (&sections[a], &sections[b]);
        let by_sort = if has_sort_key {
            match (sa.sort_order, sb.sort_order) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        } else {
            Ordering::Equal
        };
        by_sort.then_with(|| natural_cmp(sa.display_key(), sb.display_key()))
    });

    let mut numbers = vec![0; sections.len()];
    for (position, &idx) in order.iter().enumerate() {
        numbers[idx] = position as u32 + 1;
    }
    numbers
}

/// Compare strings treating embedded digit runs as numbers ("S2" < "S10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut na = String::new();
                while let Some(c) = ai.peek().copied().filter(|c| c.is_ascii_digit()) {
                    na.push(c);
                    ai.next();
                }
                let mut nb = String::new();
                while let Some(c) = bi.peek().copied().filter(|c| c.is_ascii_digit()) {
                    nb.push(c);
                    bi.next();
                }
                let ta = na.trim_start_matches('0');
                let tb = nb.trim_start_matches('0');
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

/// Node names from a section key: `A-B` gives (`A`, `B`), anything else
/// gives (`key_US`, `key_DS`).
pub fn derive_node_names(key: &str) -> (String, String) {
    match key.split_once('-') {
        Some((up, down)) if !up.trim().is_empty() && !down.trim().is_empty() => {
            (up.trim().to_string(), down.trim().to_string())
        }
        _ => (format!("{}_US", key), format!("{}_DS", key)),
    }
}

fn lookup_node(names: &HashMap<String, String>, reference: Option<&str>) -> Option<String> {
    names.get(reference?).cloned()
}
