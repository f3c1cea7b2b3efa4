use crate::aggregation::{OwnerPricePolicy, UnitPolicy};
use crate::error::{ReportError, Result};
use crate::season::SeasonAnchor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Earliest season year accepted in a configuration.
const MIN_FIRST_YEAR: i32 = 1900;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    #[schemars(description = "Name of the cooperative, shown in report headers")]
    pub organization_name: String,

    #[serde(default)]
    #[schemars(
        with = "String",
        description = "Day the reporting season starts, as MM-DD. Use 01-01 for calendar years, 06-01 for June-May seasons."
    )]
    pub season_start: SeasonAnchor,

    #[serde(default)]
    #[schemars(
        description = "Year of the first season to report. When absent, the earliest activity date is used."
    )]
    pub first_year: Option<i32>,

    #[serde(default)]
    #[schemars(
        description = "How volumes of one valorisation type recorded in different units are reported"
    )]
    pub unit_policy: UnitPolicy,

    #[serde(default)]
    #[schemars(
        description = "Whether owner prices of a valorisation type come from its last activity or are summed over the season"
    )]
    pub owner_price_policy: OwnerPricePolicy,
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.organization_name.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "organization_name must not be empty".to_string(),
            ));
        }

        if let Some(year) = self.first_year {
            if year < MIN_FIRST_YEAR {
                return Err(ReportError::InvalidConfig(format!(
                    "first_year {} is before {}",
                    year, MIN_FIRST_YEAR
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
