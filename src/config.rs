use crate::calc::{SchoolSettings, StageRules};
use std::env;
use thiserror::Error;

/// Startup configuration. Requests may override the school settings; the
/// stage rules are fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub default_settings: SchoolSettings,
    pub stage_rules: StageRules,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidCount { key: &'static str, value: String },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = get("GRADESD_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let defaults = SchoolSettings::default();
        let decision_points =
            parse_count(&get, "GRADESD_DECISION_POINTS")?.unwrap_or(defaults.decision_points);
        let supplementary_subjects_count = parse_count(&get, "GRADESD_SUPPLEMENTARY_SUBJECTS")?
            .unwrap_or(defaults.supplementary_subjects_count);

        let mut stage_rules = StageRules::default();
        if let Some(raw) = get("GRADESD_MONTHLY_STAGES") {
            stage_rules.monthly_stages = parse_list(&raw);
        }
        if let Some(raw) = get("GRADESD_MINISTERIAL_STAGES") {
            stage_rules.ministerial_stages = parse_list(&raw);
        }

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            default_settings: SchoolSettings {
                decision_points,
                supplementary_subjects_count,
            },
            stage_rules,
        })
    }
}

fn parse_count<F>(get: &F, key: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidCount { key, value: raw })
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_missing() {
        let config = AppConfig::from_lookup(lookup(&[])).expect("config loads with defaults");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.default_settings, SchoolSettings::default());
        assert_eq!(config.stage_rules, StageRules::default());
    }

    #[test]
    fn overrides_settings_and_stage_lists() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GRADESD_LOG_LEVEL", "debug"),
            ("GRADESD_DECISION_POINTS", " 7 "),
            ("GRADESD_SUPPLEMENTARY_SUBJECTS", "2"),
            ("GRADESD_MONTHLY_STAGES", "Grade 1, Grade 2,,"),
            ("GRADESD_MINISTERIAL_STAGES", ""),
        ]))
        .expect("config loads");
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.default_settings.decision_points, 7);
        assert_eq!(config.default_settings.supplementary_subjects_count, 2);
        assert_eq!(config.stage_rules.monthly_stages, vec!["Grade 1", "Grade 2"]);
        assert!(config.stage_rules.ministerial_stages.is_empty());
    }

    #[test]
    fn rejects_negative_counts() {
        let err = AppConfig::from_lookup(lookup(&[("GRADESD_DECISION_POINTS", "-1")]))
            .expect_err("negative pool rejected");
        assert_eq!(
            err,
            ConfigError::InvalidCount {
                key: "GRADESD_DECISION_POINTS",
                value: "-1".to_string()
            }
        );
    }
}
