use std::path::PathBuf;

use thiserror::Error;

/// Fatal import failure. Any of these aborts the whole extraction; no partial
/// section set is returned.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to open inspection export at {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Required table '{0}' is missing from the export")]
    MissingTable(String),

    #[error("Required column '{column}' is missing from table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A rule file that cannot be used for classification.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("Failed to read rule file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rule file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rule {index} has an invalid code pattern '{pattern}': {reason}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("Rule set '{0}' declares an empty default outcome rationale")]
    MissingDefault(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown sector '{0}'")]
    UnknownSector(String),
}

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    RuleLoad(#[from] RuleLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Export error: {0}")]
    Export(String),
}

impl From<SurveyError> for String {
    fn from(err: SurveyError) -> Self {
        err.to_string()
    }
}
