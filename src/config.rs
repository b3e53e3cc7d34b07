use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, RuleLoadError};
use crate::export::ExportFormat;
use crate::rules::{RuleSetCache, RuleSource, DEFAULT_STALENESS};
use crate::sector::{profile_for, Sector, SectorProfile};
use crate::validation::{ValidationEngine, TRAVEL_BASELINE_MINUTES};

/// Process configuration, read from a TOML file. Every field is optional.
///
/// ```toml
/// rules_path = "config/mscc5_rules.json"
/// rule_staleness_secs = 5
/// sector = "highways"
/// travel_baseline_minutes = 120
/// export_format = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Rule-set JSON; the embedded MSCC5 rules are used when unset
    pub rules_path: Option<PathBuf>,
    pub rule_staleness_secs: u64,
    pub sector: String,
    pub travel_baseline_minutes: f64,
    pub export_format: ExportFormat,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            rule_staleness_secs: DEFAULT_STALENESS.as_secs(),
            sector: Sector::Utilities.name().to_string(),
            travel_baseline_minutes: TRAVEL_BASELINE_MINUTES,
            export_format: ExportFormat::Csv,
        }
    }
}

impl SurveyConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SurveyConfig = toml::from_str(content)?;
        // Fail at load time rather than at first classification
        config.sector()?;
        Ok(config)
    }

    pub fn sector(&self) -> Result<Sector, ConfigError> {
        self.sector.parse()
    }

    pub fn sector_profile(&self) -> Result<SectorProfile, ConfigError> {
        Ok(profile_for(self.sector()?))
    }

    pub fn rule_staleness(&self) -> Duration {
        Duration::from_secs(self.rule_staleness_secs)
    }

    /// File-backed cache when a rules path is set, embedded rules otherwise.
    pub fn rule_cache(&self) -> Result<RuleSetCache, RuleLoadError> {
        match &self.rules_path {
            Some(path) => RuleSetCache::new(RuleSource::File(path.clone()), self.rule_staleness()),
            None => Ok(RuleSetCache::embedded()),
        }
    }

    pub fn validation_engine(&self) -> ValidationEngine {
        ValidationEngine::new(self.travel_baseline_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SurveyConfig::default();
        assert_eq!(config.rules_path, None);
        assert_eq!(config.rule_staleness(), Duration::from_secs(5));
        assert_eq!(config.sector().unwrap(), Sector::Utilities);
        assert_eq!(config.travel_baseline_minutes, 120.0);
        assert_eq!(config.export_format, ExportFormat::Csv);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SurveyConfig::from_toml("sector = \"highways\"\nexport_format = \"json\"\n").unwrap();
        assert_eq!(config.sector().unwrap(), Sector::Highways);
        assert_eq!(config.export_format, ExportFormat::Json);
        assert_eq!(config.rule_staleness_secs, 5);
        assert_eq!(
            config.sector_profile().unwrap().required_standards[1],
            "DMRB CD 535"
        );
    }

    #[test]
    fn test_unknown_sector_rejected() {
        let err = SurveyConfig::from_toml("sector = \"aviation\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSector(ref s) if s == "aviation"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rule_staleness_secs = 30").unwrap();
        writeln!(file, "travel_baseline_minutes = 90.0").unwrap();
        let config = SurveyConfig::load(file.path()).unwrap();
        assert_eq!(config.rule_staleness(), Duration::from_secs(30));
        assert_eq!(config.validation_engine().travel_baseline_minutes(), 90.0);
    }

    #[test]
    fn test_missing_file() {
        let err = SurveyConfig::load(Path::new("/nonexistent/drainsurvey.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_embedded_rule_cache() {
        let cache = SurveyConfig::default().rule_cache().unwrap();
        assert!(!cache.current().unwrap().rules.is_empty());
    }
}
