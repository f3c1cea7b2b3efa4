//! Yearly recap of a management unit and ordering of unit codes.

use crate::error::{Result, ResultExt};
use crate::schema::{ChantierKind, ManagementUnit, OperationRecord, ValoType};
use crate::store::Store;
use chrono::Datelike;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

const ROMANS: [&str; 19] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV",
    "XV", "XVI", "XVII", "XVIII", "XIX",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecapLine {
    pub quantity: f64,
    /// Hectares.
    pub surface: f64,
    pub operating_cost: f64,
    pub profit: f64,
}

impl RecapLine {
    fn add(&mut self, quantity: f64, profit: f64) {
        self.quantity += quantity;
        self.profit += profit;
    }
}

/// Everything harvested on a unit during one calendar year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnitRecap {
    pub year: i32,
    pub chips: RecapLine,
    pub pulp: RecapLine,
    pub farmer_firewood: RecapLine,
    pub firewood: RecapLine,
    pub pallet: RecapLine,
    pub stakes: RecapLine,
    pub timber: RecapLine,
    pub standing_timber: RecapLine,
}

impl UnitRecap {
    fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    /// Line receiving a given valorisation.
    pub fn line_mut(&mut self, type_valo: ValoType) -> &mut RecapLine {
        match type_valo {
            ValoType::Chips => &mut self.chips,
            ValoType::Pulp => &mut self.pulp,
            ValoType::FarmerFirewood => &mut self.farmer_firewood,
            ValoType::Firewood => &mut self.firewood,
            ValoType::Pallet => &mut self.pallet,
            ValoType::Stakes => &mut self.stakes,
            ValoType::Timber => &mut self.timber,
            ValoType::StandingTimber => &mut self.standing_timber,
        }
    }
}

fn recap_of(recaps: &mut BTreeMap<i32, UnitRecap>, year: i32) -> &mut UnitRecap {
    recaps.entry(year).or_insert_with(|| UnitRecap::new(year))
}

/// Quantities and profits of the chantiers of a management unit, per year.
///
/// Years without any chantier are absent from the map.
pub fn compute_unit_recap<S>(store: &S, id_ug: i64) -> Result<BTreeMap<i32, UnitRecap>>
where
    S: Store + ?Sized,
{
    let mut recaps = BTreeMap::new();

    let kinds = [
        ChantierKind::ChipsSite,
        ChantierKind::FarmerFirewood,
        ChantierKind::OtherValorisation,
        ChantierKind::StandingTimber,
    ];

    for kind in kinds {
        let records = store
            .select_by_management_unit(kind, id_ug)
            .context(&format!("select_by_management_unit({})", kind.type_chantier()))?;

        for record in records {
            let recap = recap_of(&mut recaps, record.date().year());
            match record {
                OperationRecord::ChipsSite(site) => {
                    recap.chips.quantity += site.volume;
                    recap.chips.surface += site.surface;
                }
                OperationRecord::FarmerFirewood(chantier) => {
                    recap.farmer_firewood.add(chantier.volume, 0.0);
                }
                OperationRecord::OtherValorisation(chantier) => match chantier.type_valo {
                    ValoType::Timber
                    | ValoType::Firewood
                    | ValoType::Stakes
                    | ValoType::Pallet
                    | ValoType::Pulp => {
                        recap
                            .line_mut(chantier.type_valo)
                            .add(chantier.volume, chantier.volume * chantier.unit_price);
                    }
                    // Chips, farmer firewood and standing timber have their own chantiers.
                    other => debug!(
                        "UG {}: chautre {} of type {} not part of the recap",
                        id_ug,
                        chantier.id,
                        other.code()
                    ),
                },
                OperationRecord::StandingTimberSale(sale) => {
                    recap.standing_timber.add(sale.volume, sale.price_ht);
                }
                other => {
                    debug!("UG {}: record {} not part of the recap", id_ug, other.id());
                }
            }
        }
    }

    Ok(recaps)
}

/// Years present in a recap, most recent first.
pub fn sorted_recap_years(recaps: &BTreeMap<i32, UnitRecap>) -> Vec<i32> {
    recaps.keys().rev().copied().collect()
}

/// Splits a code like `XIX-5` (or the legacy `XIX.5`) into its Roman prefix
/// and its number.
fn split_code(code: &str) -> (&str, u32) {
    let (prefix, number) = match code.find(['-', '.']) {
        Some(pos) => (&code[..pos], &code[pos + 1..]),
        None => (code, ""),
    };
    (prefix, number.trim().parse().unwrap_or(0))
}

/// Position of a Roman prefix; unknown prefixes sort last.
fn roman_rank(prefix: &str) -> usize {
    ROMANS
        .iter()
        .position(|r| *r == prefix)
        .unwrap_or(ROMANS.len())
}

pub fn compare_unit_codes(a: &str, b: &str) -> Ordering {
    let (prefix_a, number_a) = split_code(a);
    let (prefix_b, number_b) = split_code(b);
    roman_rank(prefix_a)
        .cmp(&roman_rank(prefix_b))
        .then(number_a.cmp(&number_b))
        .then_with(|| a.cmp(b))
}

/// Orders units by Roman prefix, then by number within a prefix.
pub fn sort_units_by_code(units: &mut [ManagementUnit]) {
    units.sort_by(|a, b| compare_unit_codes(&a.code, &b.code));
}

/// Sorts the units and groups consecutive units sharing a Roman prefix.
pub fn group_units_by_roman_prefix(mut units: Vec<ManagementUnit>) -> Vec<Vec<ManagementUnit>> {
    sort_units_by_code(&mut units);

    let mut groups: Vec<Vec<ManagementUnit>> = Vec::new();
    for unit in units {
        let same_prefix = groups
            .last()
            .and_then(|g| g.last())
            .is_some_and(|prev| split_code(&prev.code).0 == split_code(&unit.code).0);
        match groups.last_mut() {
            Some(group) if same_prefix => group.push(unit),
            _ => groups.push(vec![unit]),
        }
    }
    groups
}
