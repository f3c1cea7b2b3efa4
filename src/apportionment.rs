use crate::error::{ReportError, Result, ResultExt};
use crate::schema::Activity;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Surface worked on each owner's parcels for one activity, in hectares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerSurfaces {
    pub by_owner: BTreeMap<i64, f64>,
    pub total: f64,
}

impl OwnerSurfaces {
    /// Accumulates `(owner, surface)` pairs; the total is kept equal to their sum.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let mut surfaces = Self::default();
        for (owner, surface) in pairs {
            surfaces.add(owner, surface);
        }
        surfaces
    }

    pub fn add(&mut self, owner: i64, surface: f64) {
        *self.by_owner.entry(owner).or_insert(0.0) += surface;
        self.total += surface;
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

/// Smallest total surface, in hectares, a price can be split over.
const MIN_TOTAL_SURFACE: f64 = 1e-9;

/// Splits `price` between owners proportionally to their surface.
///
/// Owner surfaces must be finite and non-negative. A total at or below
/// [`MIN_TOTAL_SURFACE`] is only accepted when every owner surface is zero,
/// in which case each owner gets nothing.
pub fn allocate_price(
    activity: &str,
    price: f64,
    surfaces: &OwnerSurfaces,
) -> Result<BTreeMap<i64, f64>> {
    for (&owner, &surface) in &surfaces.by_owner {
        if !surface.is_finite() || surface < 0.0 {
            return Err(ReportError::InvalidSurface {
                activity: activity.to_string(),
                owner,
                surface,
            });
        }
    }

    if !surfaces.total.is_finite() || surfaces.total <= MIN_TOTAL_SURFACE {
        let allocated: f64 = surfaces.by_owner.values().sum();
        if allocated != 0.0 || !surfaces.total.is_finite() || surfaces.total < 0.0 {
            return Err(ReportError::ZeroTotalSurface {
                activity: activity.to_string(),
                total: surfaces.total,
                surface: allocated,
            });
        }
        return Ok(surfaces.by_owner.keys().map(|&owner| (owner, 0.0)).collect());
    }

    Ok(surfaces
        .by_owner
        .iter()
        .map(|(&owner, &surface)| (owner, price * surface / surfaces.total))
        .collect())
}

/// Resolves the owner apportionment of an activity from its parcel links.
///
/// Whole-parcel links count the parcel's registered surface, partial links
/// their own surface.
pub fn compute_owner_surfaces<S>(store: &S, activity: &Activity) -> Result<OwnerSurfaces>
where
    S: Store + ?Sized,
{
    let links = store
        .parcel_links(activity.kind, activity.id_chantier)
        .context("parcel_links()")?;

    let mut surfaces = OwnerSurfaces::default();
    for link in links {
        let parcel = store.get_parcel(link.id_parcelle).context("get_parcel()")?;
        let surface = if link.entiere {
            parcel.surface
        } else {
            link.surface
        };
        surfaces.add(parcel.id_proprietaire, surface);
    }

    Ok(surfaces)
}

/// Per-owner price of one activity, resolving apportionment through the store.
pub fn allocate_activity_price<S>(store: &S, activity: &Activity) -> Result<BTreeMap<i64, f64>>
where
    S: Store + ?Sized,
{
    let surfaces = compute_owner_surfaces(store, activity)?;
    allocate_price(&activity.describe(), activity.price_ht, &surfaces)
}
