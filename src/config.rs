use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::cohort::CohortSpec;
use crate::error::{RfmError, RfmResult};
use crate::scoring::QuantilePolicy;

/// Parameters for one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Recency is measured in days up to midnight of this date.
    pub reference_date: NaiveDate,
    pub quantile_policy: QuantilePolicy,
    pub cohorts: Vec<CohortSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_date: default_reference_date(),
            quantile_policy: QuantilePolicy::Collapse,
            cohorts: vec![
                CohortSpec::new_brand_targets(),
                CohortSpec::discount_targets(),
            ],
        }
    }
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 2).unwrap_or(NaiveDate::MIN)
}

impl AnalysisConfig {
    pub fn from_json_str(raw: &str) -> RfmResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> RfmResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        log::info!(
            "config: loaded {} cohorts from {}",
            config.cohorts.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn reference_timestamp(&self) -> NaiveDateTime {
        self.reference_date.and_time(chrono::NaiveTime::MIN)
    }

    pub fn validate(&self) -> RfmResult<()> {
        let mut names = HashSet::new();
        for cohort in &self.cohorts {
            cohort.validate()?;
            if !names.insert(cohort.name.as_str()) {
                return Err(RfmError::InvalidConfig(format!(
                    "cohort '{}' is defined more than once",
                    cohort.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;

    #[test]
    fn defaults_match_the_business_cohorts() {
        let config = AnalysisConfig::default();
        assert_eq!(config.reference_date, NaiveDate::from_ymd_opt(2021, 6, 2).unwrap());
        assert_eq!(config.quantile_policy, QuantilePolicy::Collapse);
        assert_eq!(config.cohorts.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = AnalysisConfig::from_json_str(r#"{"reference_date": "2022-01-15"}"#).unwrap();
        assert_eq!(config.reference_date, NaiveDate::from_ymd_opt(2022, 1, 15).unwrap());
        assert_eq!(config.cohorts, AnalysisConfig::default().cohorts);
    }

    #[test]
    fn parses_custom_cohorts() {
        let raw = r#"{
            "quantile_policy": "strict",
            "cohorts": [{
                "name": "winback",
                "segments": ["at_risk", "hibernating"],
                "categories": {"any_of": ["AKTIFSPOR"], "matching": "exact"},
                "min_average_order_value": 120.5
            }]
        }"#;
        let config = AnalysisConfig::from_json_str(raw).unwrap();
        assert_eq!(config.quantile_policy, QuantilePolicy::Strict);
        let cohort = &config.cohorts[0];
        assert_eq!(cohort.segments, vec![Segment::AtRisk, Segment::Hibernating]);
        assert_eq!(cohort.min_average_order_value, Some(120.5));
    }

    #[test]
    fn rejects_unknown_segments_and_duplicate_names() {
        let unknown = r#"{"cohorts": [{"name": "x", "segments": ["vip"], "categories": {"any_of": ["A"]}}]}"#;
        assert!(AnalysisConfig::from_json_str(unknown).is_err());

        let duplicate = r#"{"cohorts": [
            {"name": "x", "segments": ["champions"], "categories": {"any_of": ["A"]}},
            {"name": "x", "segments": ["at_risk"], "categories": {"any_of": ["B"]}}
        ]}"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(duplicate),
            Err(RfmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reference_timestamp_is_midnight() {
        let config = AnalysisConfig::default();
        assert_eq!(config.reference_timestamp().to_string(), "2021-06-02 00:00:00");
    }
}
