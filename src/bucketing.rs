use crate::error::Result;
use crate::schema::Activity;
use crate::season::{compute_season_limits, SeasonAnchor, SeasonBoundary};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Activities taking place within one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonActivities {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub activities: Vec<Activity>,
}

impl SeasonActivities {
    pub fn boundary(&self) -> SeasonBoundary {
        SeasonBoundary {
            start: self.start,
            end: self.end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Places each activity in the first boundary containing its date.
///
/// One group is returned per boundary, in the order given, including empty
/// ones. Activities outside every boundary are dropped.
pub fn bucket_activities(
    boundaries: &[SeasonBoundary],
    activities: &[Activity],
) -> Vec<SeasonActivities> {
    let mut groups: Vec<SeasonActivities> = boundaries
        .iter()
        .map(|b| SeasonActivities {
            start: b.start,
            end: b.end,
            activities: Vec::new(),
        })
        .collect();

    let mut dropped = 0usize;
    for activity in activities {
        match groups
            .iter_mut()
            .find(|g| g.start <= activity.date && activity.date < g.end)
        {
            Some(group) => group.activities.push(activity.clone()),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(
            "{} of {} activities fall outside the {} season(s) and were not bucketed",
            dropped,
            activities.len(),
            boundaries.len()
        );
    }

    groups
}

/// Partitions the history into seasons (oldest first) and buckets the activities.
pub fn compute_activities_by_season(
    anchor: SeasonAnchor,
    first_year: i32,
    last_date: NaiveDate,
    activities: &[Activity],
) -> Result<Vec<SeasonActivities>> {
    let mut limits = compute_season_limits(anchor, first_year, last_date)?;
    limits.reverse();

    Ok(bucket_activities(&limits, activities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChantierKind, Unit, ValoType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(id: i64, date: NaiveDate) -> Activity {
        Activity {
            kind: ChantierKind::OtherValorisation,
            id_chantier: id,
            date,
            type_valo: ValoType::Firewood,
            volume: 1.0,
            unit: Unit::Stere,
            price_ht: 10.0,
        }
    }

    #[test]
    fn test_season_start_is_inclusive_end_exclusive() {
        let anchor = SeasonAnchor::parse("06-01").unwrap();
        let activities = vec![activity(1, date(2022, 6, 1)), activity(2, date(2023, 5, 31))];

        let groups =
            compute_activities_by_season(anchor, 2021, date(2023, 5, 31), &activities).unwrap();

        assert_eq!(groups.len(), 2);
        assert!(groups[0].is_empty());
        assert_eq!(groups[1].start, date(2022, 6, 1));
        assert_eq!(groups[1].activities.len(), 2);
    }

    #[test]
    fn test_out_of_range_activity_is_dropped() {
        let boundaries = vec![SeasonBoundary {
            start: date(2022, 1, 1),
            end: date(2023, 1, 1),
        }];
        let activities = vec![activity(1, date(2021, 12, 31)), activity(2, date(2022, 7, 1))];

        let groups = bucket_activities(&boundaries, &activities);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].activities.len(), 1);
        assert_eq!(groups[0].activities[0].id_chantier, 2);
    }

    #[test]
    fn test_first_matching_boundary_wins() {
        // Overlapping ranges are a caller error; the activity still lands once.
        let boundaries = vec![
            SeasonBoundary {
                start: date(2022, 1, 1),
                end: date(2023, 1, 1),
            },
            SeasonBoundary {
                start: date(2022, 6, 1),
                end: date(2023, 6, 1),
            },
        ];
        let groups = bucket_activities(&boundaries, &[activity(1, date(2022, 7, 1))]);
        assert_eq!(groups[0].activities.len(), 1);
        assert!(groups[1].is_empty());
    }

    #[test]
    fn test_bucketing_is_idempotent() {
        let anchor = SeasonAnchor::parse("03-15").unwrap();
        let activities: Vec<Activity> = (0..40)
            .map(|i| activity(i, date(2019 + (i as i32 % 5), 1 + (i as u32 % 12), 10)))
            .collect();

        let first =
            compute_activities_by_season(anchor, 2018, date(2024, 1, 1), &activities).unwrap();
        let second =
            compute_activities_by_season(anchor, 2018, date(2024, 1, 1), &activities).unwrap();
        assert_eq!(first, second);

        let placed: usize = first.iter().map(|g| g.activities.len()).sum();
        assert_eq!(placed, activities.len());
        for group in &first {
            for a in &group.activities {
                assert!(group.boundary().contains(a.date));
            }
        }
    }
}
