use crate::apportionment::allocate_activity_price;
use crate::bucketing::{compute_activities_by_season, SeasonActivities};
use crate::error::{ReportError, Result, ResultExt};
use crate::schema::{Activity, Unit, ValoType};
use crate::season::{SeasonAnchor, SeasonBoundary};
use crate::store::Store;
use chrono::NaiveDate;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do when activities of one valorisation type use different units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnitPolicy {
    /// The unit of the last activity folded in is reported. Volumes are summed as-is.
    #[default]
    LastWriteWins,

    /// Mixed units within one valorisation type abort the report.
    Strict,
}

/// How the owner split of a valorisation type is built from its activities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OwnerPricePolicy {
    /// Each activity replaces the split, so only the last activity's owners and
    /// prices are reported.
    #[default]
    LastActivity,

    /// Owner prices are summed over every activity of the season.
    Accumulate,
}

/// Totals of one valorisation type within a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValoTotal {
    pub type_valo: ValoType,
    pub volume: f64,
    pub unit: Unit,
    /// Price excl. tax per owner id.
    pub price_by_owner: BTreeMap<i64, f64>,
}

impl ValoTotal {
    fn new(type_valo: ValoType, unit: Unit) -> Self {
        Self {
            type_valo,
            volume: 0.0,
            unit,
            price_by_owner: BTreeMap::new(),
        }
    }

    pub fn total_price(&self) -> f64 {
        self.price_by_owner.values().sum()
    }
}

/// Report of one season having at least one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeasonSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Ordered by valorisation code.
    pub totals: Vec<ValoTotal>,
}

impl SeasonSummary {
    pub fn boundary(&self) -> SeasonBoundary {
        SeasonBoundary {
            start: self.start,
            end: self.end,
        }
    }

    pub fn total_for(&self, type_valo: ValoType) -> Option<&ValoTotal> {
        self.totals.iter().find(|t| t.type_valo == type_valo)
    }
}

fn fold_activity<S>(
    store: &S,
    totals: &mut BTreeMap<ValoType, ValoTotal>,
    activity: &Activity,
    policy: UnitPolicy,
    owner_prices: OwnerPricePolicy,
) -> Result<()>
where
    S: Store + ?Sized,
{
    let entry = totals
        .entry(activity.type_valo)
        .or_insert_with(|| ValoTotal::new(activity.type_valo, activity.unit));

    if entry.unit != activity.unit {
        match policy {
            UnitPolicy::LastWriteWins => warn!(
                "Valorisation {} mixes units {} and {} ({}); keeping {}",
                activity.type_valo,
                entry.unit,
                activity.unit,
                activity.describe(),
                activity.unit
            ),
            UnitPolicy::Strict => {
                return Err(ReportError::MixedUnits {
                    type_valo: activity.type_valo.code().to_string(),
                    first: entry.unit.code().to_string(),
                    second: activity.unit.code().to_string(),
                });
            }
        }
    }

    entry.volume += activity.volume;
    entry.unit = activity.unit;

    let prices = allocate_activity_price(store, activity)
        .context(&format!("allocate_activity_price({})", activity.describe()))?;
    match owner_prices {
        OwnerPricePolicy::LastActivity => entry.price_by_owner = prices,
        OwnerPricePolicy::Accumulate => {
            for (owner, price) in prices {
                *entry.price_by_owner.entry(owner).or_insert(0.0) += price;
            }
        }
    }

    Ok(())
}

/// Folds bucketed activities into per-valorisation totals, skipping empty seasons.
pub fn summarize_seasons<S>(
    store: &S,
    groups: &[SeasonActivities],
    policy: UnitPolicy,
    owner_prices: OwnerPricePolicy,
) -> Result<Vec<SeasonSummary>>
where
    S: Store + ?Sized,
{
    let mut summaries = Vec::new();

    for group in groups {
        if group.is_empty() {
            continue;
        }

        let mut totals: BTreeMap<ValoType, ValoTotal> = BTreeMap::new();
        for activity in &group.activities {
            fold_activity(store, &mut totals, activity, policy, owner_prices)?;
        }

        debug!(
            "Season {}: {} activities over {} valorisation type(s)",
            group.boundary().label(),
            group.activities.len(),
            totals.len()
        );

        summaries.push(SeasonSummary {
            start: group.start,
            end: group.end,
            totals: totals.into_values().collect(),
        });
    }

    Ok(summaries)
}

/// Partitions, buckets and summarizes in one pass. Seasons are oldest first.
pub fn compute_season_summaries<S>(
    store: &S,
    anchor: SeasonAnchor,
    first_year: i32,
    last_date: NaiveDate,
    activities: &[Activity],
    policy: UnitPolicy,
    owner_prices: OwnerPricePolicy,
) -> Result<Vec<SeasonSummary>>
where
    S: Store + ?Sized,
{
    let groups = compute_activities_by_season(anchor, first_year, last_date, activities)
        .context("compute_activities_by_season()")?;
    summarize_seasons(store, &groups, policy, owner_prices)
}

/// JSON array of season summaries, as handed to API consumers.
pub fn summaries_to_json(summaries: &[SeasonSummary]) -> Result<String> {
    Ok(serde_json::to_string_pretty(summaries)?)
}
