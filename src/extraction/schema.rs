//! Fixed column-name tables for the inspection export.
//!
//! Every table the reader touches is described here: which logical field maps
//! to which export column, and whether the table/column is required. Extra
//! columns in the export are ignored.

use rusqlite::Connection;

use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub required: bool,
    pub columns: &'static [ColumnSpec],
}

const fn req(field: &'static str, column: &'static str) -> ColumnSpec {
    ColumnSpec { field, column, required: true }
}

const fn opt(field: &'static str, column: &'static str) -> ColumnSpec {
    ColumnSpec { field, column, required: false }
}

pub const SECTIONS: TableSchema = TableSchema {
    table: "SECTION",
    required: true,
    columns: &[
        req("pk", "OBJ_PK"),
        opt("key", "OBJ_Key"),
        opt("sort_order", "OBJ_SortOrder"),
        opt("size", "OBJ_Size1"),
        opt("material", "OBJ_Material"),
        opt("length", "OBJ_Length"),
        opt("from_node", "OBJ_FromNode_REF"),
        opt("to_node", "OBJ_ToNode_REF"),
    ],
};

pub const NODES: TableSchema = TableSchema {
    table: "NODE",
    required: false,
    columns: &[req("pk", "OBJ_PK"), req("name", "OBJ_Key")],
};

pub const INSPECTIONS: TableSchema = TableSchema {
    table: "SECINSP",
    required: false,
    columns: &[req("pk", "INS_PK"), req("section", "INS_Section_FK")],
};

pub const OBSERVATIONS: TableSchema = TableSchema {
    table: "SECOBS",
    required: true,
    columns: &[
        req("inspection", "OBS_Inspection_FK"),
        req("code", "OBS_OpCode"),
        req("distance", "OBS_Distance"),
        opt("text", "OBS_Observation"),
        opt("grade", "OBS_Grade"),
    ],
};

pub const GRADES: TableSchema = TableSchema {
    table: "SECSTAT",
    required: true,
    columns: &[
        req("inspection", "STA_Inspection_FK"),
        req("category", "STA_Type"),
        req("grade", "STA_HighestGrade"),
    ],
};

/// Start/finish-of-traversal marker codes. These are not defects.
pub const TRAVERSAL_MARKERS: &[&str] = &["MH", "MHF"];

/// A table schema resolved against an actual export.
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    pub schema: TableSchema,
    /// Table name as spelled in the export
    pub table: String,
    /// Export column name per schema column (same order), `None` when absent
    pub columns: Vec<Option<String>>,
}

impl ResolvedTable {
    /// Resolve a schema. Returns `Ok(None)` for an absent optional table.
    pub fn resolve(
        conn: &Connection,
        schema: TableSchema,
    ) -> Result<Option<ResolvedTable>, ExtractionError> {
        let Some(table) = find_table(conn, schema.table)? else {
            if schema.required {
                return Err(ExtractionError::MissingTable(schema.table.to_string()));
            }
            return Ok(None);
        };

        let existing = table_columns(conn, &table)?;
        let mut columns = Vec::with_capacity(schema.columns.len());
        for spec in schema.columns {
            let found = existing
                .iter()
                .find(|c| c.eq_ignore_ascii_case(spec.column))
                .cloned();
            if found.is_none() && spec.required {
                return Err(ExtractionError::MissingColumn {
                    table: schema.table.to_string(),
                    column: spec.column.to_string(),
                });
            }
            columns.push(found);
        }

        Ok(Some(ResolvedTable { schema, table, columns }))
    }

    pub fn has(&self, field: &str) -> bool {
        self.index(field)
            .map_or(false, |i| self.columns[i].is_some())
    }

    /// Position of a logical field in the `SELECT` list.
    pub fn index(&self, field: &str) -> Option<usize> {
        self.schema.columns.iter().position(|c| c.field == field)
    }

    /// `SELECT` every schema column in schema order; absent columns read as NULL.
    pub fn select_sql(&self) -> String {
        let list = self
            .columns
            .iter()
            .map(|c| match c {
                Some(name) => quote_ident(name),
                None => "NULL".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("SELECT {} FROM {}", list, quote_ident(&self.table))
    }
}

fn find_table(conn: &Connection, name: &str) -> Result<Option<String>, ExtractionError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.into_iter().find(|n| n.eq_ignore_ascii_case(name)))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, ExtractionError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
