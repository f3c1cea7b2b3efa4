use crate::utils::{date_fr, join_names};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ************************** Valorisations *******************************

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ValoType {
    #[serde(rename = "BO")]
    #[schemars(description = "Structural timber (bois d'œuvre)")]
    Timber,

    #[serde(rename = "CF")]
    #[schemars(description = "Firewood cut by a farmer for their own use (chauffage fermier)")]
    FarmerFirewood,

    #[serde(rename = "CH")]
    #[schemars(description = "Firewood sold to clients (bois de chauffage)")]
    Firewood,

    #[serde(rename = "PI")]
    #[schemars(description = "Stakes (piquets)")]
    Stakes,

    #[serde(rename = "PL")]
    #[schemars(description = "Pallet wood (palette)")]
    Pallet,

    #[serde(rename = "PP")]
    #[schemars(description = "Pulpwood (pâte à papier)")]
    Pulp,

    #[serde(rename = "PQ")]
    #[schemars(description = "Wood chips (plaquettes)")]
    Chips,

    #[serde(rename = "BSP")]
    #[schemars(description = "Standing timber sold before harvest (bois sur pied)")]
    StandingTimber,
}

impl ValoType {
    pub const ALL: [ValoType; 8] = [
        ValoType::Timber,
        ValoType::FarmerFirewood,
        ValoType::Firewood,
        ValoType::Stakes,
        ValoType::Pallet,
        ValoType::Pulp,
        ValoType::Chips,
        ValoType::StandingTimber,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ValoType::Timber => "BO",
            ValoType::FarmerFirewood => "CF",
            ValoType::Firewood => "CH",
            ValoType::Stakes => "PI",
            ValoType::Pallet => "PL",
            ValoType::Pulp => "PP",
            ValoType::Chips => "PQ",
            ValoType::StandingTimber => "BSP",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValoType::Timber => "Bois d'œuvre",
            ValoType::FarmerFirewood => "Chauffage fermier",
            ValoType::Firewood => "Bois de chauffage",
            ValoType::Stakes => "Piquets",
            ValoType::Pallet => "Palette",
            ValoType::Pulp => "Pâte à papier",
            ValoType::Chips => "Plaquettes",
            ValoType::StandingTimber => "Bois sur pied",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }
}

impl fmt::Display for ValoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Unit {
    #[serde(rename = "m3")]
    CubicMeter,

    #[serde(rename = "st")]
    Stere,

    #[serde(rename = "t")]
    Tonne,

    /// Bulk cubic meter of chips (mètre cube apparent plaquettes).
    #[serde(rename = "map")]
    BulkCubicMeter,
}

impl Unit {
    pub fn code(&self) -> &'static str {
        match self {
            Unit::CubicMeter => "m3",
            Unit::Stere => "st",
            Unit::Tonne => "t",
            Unit::BulkCubicMeter => "map",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Species codes used by the search filters.
pub fn essence_label(code: &str) -> Option<&'static str> {
    match code {
        "CHE" => Some("Chêne"),
        "HET" => Some("Hêtre"),
        "PIN" => Some("Pin"),
        "PNO" => Some("Pin noir"),
        "PSY" => Some("Pin sylvestre"),
        "SAP" => Some("Sapin"),
        "BOU" => Some("Bouleau"),
        "DOU" => Some("Douglas"),
        _ => None,
    }
}

// ************************** Entities *******************************

/// Row of table `acteur`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    /// Non-zero when the actor is mirrored from the SCTL register.
    #[serde(default)]
    pub id_sctl: i64,
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
}

impl Actor {
    pub fn is_sctl(&self) -> bool {
        self.id_sctl != 0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_name.is_empty() {
            write!(f, "{}", self.last_name)
        } else {
            write!(f, "{} {}", self.first_name, self.last_name)
        }
    }
}

/// Row of table `fermier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: i64,
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
}

impl fmt::Display for Farmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_name.is_empty() {
            write!(f, "{}", self.last_name)
        } else {
            write!(f, "{} {}", self.first_name, self.last_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commune {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Commune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Management unit (table `ug`), identified by codes like `XIX-5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementUnit {
    pub id: i64,
    pub code: String,
}

impl fmt::Display for ManagementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: i64,
    pub code: String,
    /// Registered surface, in hectares.
    pub surface: f64,
    pub id_proprietaire: i64,
    #[serde(default)]
    pub id_commune: i64,
}

impl fmt::Display for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Link between a chantier and one of the parcels it was carried out on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelLink {
    pub id_parcelle: i64,
    /// The whole parcel was worked; `surface` is then ignored.
    pub entiere: bool,
    #[serde(default)]
    pub surface: f64,
}

// ************************** Chantiers *******************************

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChantierKind {
    ChipsSite,
    ChipsSale,
    StandingTimber,
    OtherValorisation,
    FarmerFirewood,
}

impl ChantierKind {
    /// Value of `chantier_ug.type_chantier` / `chantier_parcelle.type_chantier`.
    pub fn type_chantier(&self) -> &'static str {
        match self {
            ChantierKind::ChipsSite => "plaq",
            ChantierKind::ChipsSale => "venteplaq",
            ChantierKind::StandingTimber => "bspied",
            ChantierKind::OtherValorisation => "chautre",
            ChantierKind::FarmerFirewood => "chaufer",
        }
    }
}

/// Chips site (table `plaq`). Place names are resolved by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipsSite {
    pub id: i64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub places: Vec<String>,
    pub volume: f64,
    pub surface: f64,
}

impl ChipsSite {
    pub fn name(&self) -> String {
        format!("{} {}", join_names(&self.places), date_fr(self.start_date))
    }

    pub fn full_name(&self) -> String {
        format!("Chantier plaquettes {}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipsOperationKind {
    #[serde(rename = "AB")]
    Felling,
    #[serde(rename = "DB")]
    Skidding,
    #[serde(rename = "DC")]
    Chipping,
    #[serde(rename = "BR")]
    Crushing,
}

impl ChipsOperationKind {
    pub fn role_name(&self) -> &'static str {
        match self {
            ChipsOperationKind::Felling => "abatteur",
            ChipsOperationKind::Skidding => "débardeur",
            ChipsOperationKind::Chipping => "déchiqueteur",
            ChipsOperationKind::Crushing => "broyeur",
        }
    }
}

/// Simple operation on a chips site (table `plaqop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipsOperation {
    pub id: i64,
    pub id_chantier: i64,
    pub id_acteur: i64,
    pub kind: ChipsOperationKind,
    pub start_date: NaiveDate,
}

/// Transport from a chips site to a storage place (table `plaqtrans`).
///
/// Either a global-cost `id_transporteur`, or a driver plus a tool owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipsTransport {
    pub id: i64,
    pub id_chantier: i64,
    pub id_transporteur: Option<i64>,
    pub id_conducteur: Option<i64>,
    pub id_proprioutil: Option<i64>,
    pub date: NaiveDate,
}

/// Stacking of chips after transport (table `plaqrange`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipsStorage {
    pub id: i64,
    pub id_chantier: i64,
    pub id_rangeur: Option<i64>,
    pub id_conducteur: Option<i64>,
    pub id_proprioutil: Option<i64>,
    pub date: NaiveDate,
}

/// Chips sale to a client (table `venteplaq`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipsSale {
    pub id: i64,
    pub id_client: i64,
    pub date: NaiveDate,
    /// Quantity sold, in bulk cubic meters.
    pub quantity: f64,
    /// Unit price excl. tax.
    pub unit_price: f64,
}

impl ChipsSale {
    pub fn full_name(&self, client: &Actor) -> String {
        format!("Vente plaquettes {} {}", client, date_fr(self.date))
    }
}

/// Delivery for a chips sale (table `ventelivre`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDelivery {
    pub id: i64,
    pub id_vente: i64,
    pub id_livreur: Option<i64>,
    pub id_conducteur: Option<i64>,
    pub id_proprioutil: Option<i64>,
    pub date: NaiveDate,
}

/// Loading for a delivery (table `ventecharge`). The sale is reached through the delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLoading {
    pub id: i64,
    pub id_livraison: i64,
    pub id_chargeur: Option<i64>,
    pub id_conducteur: Option<i64>,
    pub id_proprioutil: Option<i64>,
    pub date: NaiveDate,
}

/// Standing-timber sale (table `bspied`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingTimberSale {
    pub id: i64,
    pub id_acheteur: i64,
    pub contract_date: NaiveDate,
    #[serde(default)]
    pub places: Vec<String>,
    pub volume: f64,
    pub price_ht: f64,
}

impl StandingTimberSale {
    pub fn full_name(&self, buyer: &Actor) -> String {
        format!(
            "Bois sur pied {} - {} {}",
            buyer,
            join_names(&self.places),
            date_fr(self.contract_date)
        )
    }
}

/// Miscellaneous valorisation contract (table `chautre`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherValorisation {
    pub id: i64,
    pub id_client: i64,
    pub type_valo: ValoType,
    pub contract_date: NaiveDate,
    pub volume: f64,
    pub unit: Unit,
    pub unit_price: f64,
    #[serde(default)]
    pub places: Vec<String>,
}

impl OtherValorisation {
    pub fn full_name(&self, client: &Actor) -> String {
        format!(
            "{} {} - {} {}",
            self.type_valo.label(),
            client,
            join_names(&self.places),
            date_fr(self.contract_date)
        )
    }
}

/// Farmer firewood deal (table `chaufer`). `id_fermier` references `acteur`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerFirewood {
    pub id: i64,
    pub id_fermier: i64,
    pub date: NaiveDate,
    pub volume: f64,
    pub unit: Unit,
    #[serde(default)]
    pub places: Vec<String>,
}

impl FarmerFirewood {
    pub fn full_name(&self, farmer: &Actor) -> String {
        format!("Chauffage fermier {} {}", farmer, date_fr(self.date))
    }
}

/// Humidity measurement (table `humid`, measurers from `humid_acteur`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityMeasurement {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub measurers: Vec<i64>,
}

/// One row returned by a store collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum OperationRecord {
    ChipsSite(ChipsSite),
    ChipsOperation(ChipsOperation),
    ChipsTransport(ChipsTransport),
    ChipsStorage(ChipsStorage),
    ChipsSale(ChipsSale),
    SaleDelivery(SaleDelivery),
    SaleLoading(SaleLoading),
    StandingTimberSale(StandingTimberSale),
    OtherValorisation(OtherValorisation),
    FarmerFirewood(FarmerFirewood),
    HumidityMeasurement(HumidityMeasurement),
}

impl OperationRecord {
    pub fn id(&self) -> i64 {
        match self {
            OperationRecord::ChipsSite(r) => r.id,
            OperationRecord::ChipsOperation(r) => r.id,
            OperationRecord::ChipsTransport(r) => r.id,
            OperationRecord::ChipsStorage(r) => r.id,
            OperationRecord::ChipsSale(r) => r.id,
            OperationRecord::SaleDelivery(r) => r.id,
            OperationRecord::SaleLoading(r) => r.id,
            OperationRecord::StandingTimberSale(r) => r.id,
            OperationRecord::OtherValorisation(r) => r.id,
            OperationRecord::FarmerFirewood(r) => r.id,
            OperationRecord::HumidityMeasurement(r) => r.id,
        }
    }

    /// Date the activity took place; the timeline is ordered on it.
    pub fn date(&self) -> NaiveDate {
        match self {
            OperationRecord::ChipsSite(r) => r.start_date,
            OperationRecord::ChipsOperation(r) => r.start_date,
            OperationRecord::ChipsTransport(r) => r.date,
            OperationRecord::ChipsStorage(r) => r.date,
            OperationRecord::ChipsSale(r) => r.date,
            OperationRecord::SaleDelivery(r) => r.date,
            OperationRecord::SaleLoading(r) => r.date,
            OperationRecord::StandingTimberSale(r) => r.contract_date,
            OperationRecord::OtherValorisation(r) => r.contract_date,
            OperationRecord::FarmerFirewood(r) => r.date,
            OperationRecord::HumidityMeasurement(r) => r.date,
        }
    }

    /// Chips site the record belongs to, for the chips-site sub-tables.
    pub fn chips_site_id(&self) -> Option<i64> {
        match self {
            OperationRecord::ChipsSite(r) => Some(r.id),
            OperationRecord::ChipsOperation(r) => Some(r.id_chantier),
            OperationRecord::ChipsTransport(r) => Some(r.id_chantier),
            OperationRecord::ChipsStorage(r) => Some(r.id_chantier),
            _ => None,
        }
    }
}

// ************************** Activities *******************************

/// Uniform, read-only view of a priced operation used by the season reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ChantierKind,
    pub id_chantier: i64,
    pub date: NaiveDate,
    pub type_valo: ValoType,
    pub volume: f64,
    pub unit: Unit,
    /// Price excl. tax.
    pub price_ht: f64,
}

impl Activity {
    pub fn describe(&self) -> String {
        format!(
            "{} #{} ({}, {})",
            self.kind.type_chantier(),
            self.id_chantier,
            self.type_valo,
            self.date
        )
    }
}

impl From<&ChipsSite> for Activity {
    fn from(site: &ChipsSite) -> Self {
        // Chips are invoiced through their sales.
        Self {
            kind: ChantierKind::ChipsSite,
            id_chantier: site.id,
            date: site.start_date,
            type_valo: ValoType::Chips,
            volume: site.volume,
            unit: Unit::BulkCubicMeter,
            price_ht: 0.0,
        }
    }
}

impl From<&ChipsSale> for Activity {
    fn from(sale: &ChipsSale) -> Self {
        Self {
            kind: ChantierKind::ChipsSale,
            id_chantier: sale.id,
            date: sale.date,
            type_valo: ValoType::Chips,
            volume: sale.quantity,
            unit: Unit::BulkCubicMeter,
            price_ht: sale.quantity * sale.unit_price,
        }
    }
}

impl From<&StandingTimberSale> for Activity {
    fn from(sale: &StandingTimberSale) -> Self {
        Self {
            kind: ChantierKind::StandingTimber,
            id_chantier: sale.id,
            date: sale.contract_date,
            type_valo: ValoType::StandingTimber,
            volume: sale.volume,
            unit: Unit::CubicMeter,
            price_ht: sale.price_ht,
        }
    }
}

impl From<&OtherValorisation> for Activity {
    fn from(chantier: &OtherValorisation) -> Self {
        Self {
            kind: ChantierKind::OtherValorisation,
            id_chantier: chantier.id,
            date: chantier.contract_date,
            type_valo: chantier.type_valo,
            volume: chantier.volume,
            unit: chantier.unit,
            price_ht: chantier.volume * chantier.unit_price,
        }
    }
}

impl From<&FarmerFirewood> for Activity {
    fn from(chantier: &FarmerFirewood) -> Self {
        // Farmers cut for themselves; nothing is invoiced.
        Self {
            kind: ChantierKind::FarmerFirewood,
            id_chantier: chantier.id,
            date: chantier.date,
            type_valo: ValoType::FarmerFirewood,
            volume: chantier.volume,
            unit: chantier.unit,
            price_ht: 0.0,
        }
    }
}
