//! # BDL Reporting
//!
//! Seasonal activity reports for a forestry cooperative: wood-chip sites and
//! sales, standing-timber sales, farmer firewood deals and other
//! valorisations are bucketed into reporting seasons, totalled per
//! valorisation type and split between parcel owners.
//!
//! ## Core Concepts
//!
//! - **Season**: a year-long reporting period starting on a configurable day (`"06-01"`)
//! - **Activity**: a priced operation reduced to date, valorisation, volume, unit and price
//! - **Apportionment**: the price of an activity shared between owners by worked surface
//! - **Timeline**: every operation an actor or a management unit (UG) took part in
//!
//! All data is read through the [`Store`] trait. [`InMemoryStore`] implements it
//! over plain vectors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bdl_reporting::*;
//!
//! let config = ReportConfig::from_json_str(
//!     r#"{"organization_name": "Bois du Larzac", "season_start": "06-01"}"#,
//! )?;
//! let store = InMemoryStore::from_json_str(&std::fs::read_to_string("data.json")?)?;
//!
//! let activities: Vec<Activity> = store.other_valorisations.iter().map(Activity::from).collect();
//! let reporter = ActivityReporter::new(config, &store)?;
//! for season in reporter.season_summaries(&activities)? {
//!     println!("{}: {} valorisation(s)", season.boundary().label(), season.totals.len());
//! }
//! ```

pub mod aggregation;
pub mod apportionment;
pub mod bucketing;
pub mod config;
pub mod error;
pub mod management_unit;
pub mod recap;
pub mod schema;
pub mod season;
pub mod store;
pub mod timeline;
pub mod utils;

pub use aggregation::{
    compute_season_summaries, summaries_to_json, summarize_seasons, OwnerPricePolicy,
    SeasonSummary, UnitPolicy, ValoTotal,
};
pub use apportionment::{
    allocate_activity_price, allocate_price, compute_owner_surfaces, OwnerSurfaces,
};
pub use bucketing::{bucket_activities, compute_activities_by_season, SeasonActivities};
pub use config::ReportConfig;
pub use error::{ReportError, Result, ResultExt};
pub use management_unit::{
    compare_unit_codes, compute_unit_recap, group_units_by_roman_prefix, sort_units_by_code,
    sorted_recap_years, RecapLine, UnitRecap,
};
pub use recap::compute_filter_recap;
pub use schema::*;
pub use season::{
    compute_season_limits, compute_season_limits_for_dates, SeasonAnchor, SeasonBoundary,
};
pub use store::{ChantierParcelLink, InMemoryStore, OperationTable, RoleColumn, Store, UnitLink};
pub use timeline::{
    build_actor_timeline, build_unit_timeline, is_actor_deletable, TimelineEntry,
    ACTOR_ROLE_SOURCES, UNIT_SOURCES,
};
pub use utils::*;

use chrono::Datelike;
use log::{debug, info};
use std::collections::BTreeMap;

/// Reports of one cooperative, read from one store.
pub struct ActivityReporter<'a, S: Store + ?Sized> {
    config: ReportConfig,
    store: &'a S,
}

impl<'a, S: Store + ?Sized> ActivityReporter<'a, S> {
    pub fn new(config: ReportConfig, store: &'a S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Seasons covering the activities, most recent first.
    ///
    /// The first season is the configured `first_year` or, when unset, the
    /// season of the oldest activity.
    pub fn season_limits(&self, activities: &[Activity]) -> Result<Vec<SeasonBoundary>> {
        let anchor = self.config.season_start;
        let Some(last_date) = activities.iter().map(|a| a.date).max() else {
            return Ok(Vec::new());
        };

        match self.config.first_year {
            Some(first_year) => compute_season_limits(anchor, first_year, last_date),
            None => compute_season_limits_for_dates(anchor, activities.iter().map(|a| a.date)),
        }
    }

    /// Per-season, per-valorisation totals, oldest season first.
    pub fn season_summaries(&self, activities: &[Activity]) -> Result<Vec<SeasonSummary>> {
        info!(
            "Building season summaries for {} ({} activities, seasons starting {})",
            self.config.organization_name,
            activities.len(),
            self.config.season_start
        );

        let mut limits = self.season_limits(activities)?;
        limits.reverse();
        debug!("{} season(s) to fill", limits.len());

        let groups = bucket_activities(&limits, activities);
        let summaries = summarize_seasons(
            self.store,
            &groups,
            self.config.unit_policy,
            self.config.owner_price_policy,
        )?;

        info!("{} season(s) with activity", summaries.len());
        Ok(summaries)
    }

    pub fn season_summaries_json(&self, activities: &[Activity]) -> Result<String> {
        let summaries = self.season_summaries(activities)?;
        summaries_to_json(&summaries)
    }

    pub fn actor_timeline(&self, id_actor: i64) -> Result<Vec<TimelineEntry>> {
        debug!("Building timeline of actor {}", id_actor);
        build_actor_timeline(self.store, id_actor)
            .context(&format!("build_actor_timeline({})", id_actor))
    }

    pub fn unit_timeline(&self, id_ug: i64) -> Result<Vec<TimelineEntry>> {
        debug!("Building timeline of UG {}", id_ug);
        build_unit_timeline(self.store, id_ug).context(&format!("build_unit_timeline({})", id_ug))
    }

    pub fn is_actor_deletable(&self, id_actor: i64) -> Result<bool> {
        let actor = self.store.get_actor(id_actor).context("get_actor()")?;
        is_actor_deletable(self.store, &actor)
    }

    pub fn filter_recap(&self, filters: &BTreeMap<String, Vec<String>>) -> Result<String> {
        compute_filter_recap(self.store, filters)
    }

    /// Yearly recap of a UG with its years, most recent first.
    pub fn unit_recap(&self, id_ug: i64) -> Result<(BTreeMap<i32, UnitRecap>, Vec<i32>)> {
        let recaps = compute_unit_recap(self.store, id_ug)
            .context(&format!("compute_unit_recap({})", id_ug))?;
        let years = sorted_recap_years(&recaps);
        if let (Some(latest), Some(oldest)) = (years.first(), years.last()) {
            debug!("UG {}: activity from {} to {}", id_ug, oldest, latest);
        }
        Ok((recaps, years))
    }
}

pub fn process_season_summaries<S>(
    config: &ReportConfig,
    store: &S,
    activities: &[Activity],
) -> Result<Vec<SeasonSummary>>
where
    S: Store + ?Sized,
{
    ActivityReporter::new(config.clone(), store)?.season_summaries(activities)
}

/// Start year of the season containing the oldest activity.
pub fn earliest_season_year(
    anchor: SeasonAnchor,
    activities: &[Activity],
) -> Result<Option<i32>> {
    match activities.iter().map(|a| a.date).min() {
        Some(date) => Ok(Some(anchor.season_start_for(date)?.year())),
        None => Ok(None),
    }
}
