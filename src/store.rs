//! Read-only access to the cooperative's relational store.
//!
//! The reporting core never opens connections itself: the embedding
//! application implements [`Store`] over its database and the core issues
//! blocking queries through it. [`InMemoryStore`] is a complete
//! implementation over plain vectors, used by the tests and by tools that
//! load fixtures from JSON.

use crate::error::{ReportError, Result};
use crate::schema::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation tables that can reference an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationTable {
    ChipsOperation,
    ChipsTransport,
    ChipsStorage,
    ChipsSale,
    SaleDelivery,
    SaleLoading,
    StandingTimberSale,
    OtherValorisation,
    FarmerFirewood,
    HumidityMeasurement,
}

impl OperationTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            OperationTable::ChipsOperation => "plaqop",
            OperationTable::ChipsTransport => "plaqtrans",
            OperationTable::ChipsStorage => "plaqrange",
            OperationTable::ChipsSale => "venteplaq",
            OperationTable::SaleDelivery => "ventelivre",
            OperationTable::SaleLoading => "ventecharge",
            OperationTable::StandingTimberSale => "bspied",
            OperationTable::OtherValorisation => "chautre",
            OperationTable::FarmerFirewood => "chaufer",
            OperationTable::HumidityMeasurement => "humid",
        }
    }
}

impl fmt::Display for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Foreign-key columns holding an actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleColumn {
    Actor,
    Transporter,
    Driver,
    ToolOwner,
    Stacker,
    Deliverer,
    Loader,
    Client,
    Buyer,
    Farmer,
    Measurer,
}

impl RoleColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            RoleColumn::Actor => "id_acteur",
            RoleColumn::Transporter => "id_transporteur",
            RoleColumn::Driver => "id_conducteur",
            RoleColumn::ToolOwner => "id_proprioutil",
            RoleColumn::Stacker => "id_rangeur",
            RoleColumn::Deliverer => "id_livreur",
            RoleColumn::Loader => "id_chargeur",
            RoleColumn::Client => "id_client",
            RoleColumn::Buyer => "id_acheteur",
            RoleColumn::Farmer => "id_fermier",
            RoleColumn::Measurer => "humid_acteur.id_acteur",
        }
    }
}

impl fmt::Display for RoleColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Queries the reporting core needs from the relational store.
///
/// Single-record getters fail with [`ReportError::NotFound`]; collection
/// queries return an empty vector when nothing matches.
pub trait Store {
    fn get_actor(&self, id: i64) -> Result<Actor>;
    fn get_farmer(&self, id: i64) -> Result<Farmer>;
    fn get_commune(&self, id: i64) -> Result<Commune>;
    fn get_management_unit(&self, id: i64) -> Result<ManagementUnit>;
    fn get_parcel(&self, id: i64) -> Result<Parcel>;
    /// Chips site with its place names resolved.
    fn get_chips_site(&self, id: i64) -> Result<ChipsSite>;
    fn get_chips_sale(&self, id: i64) -> Result<ChipsSale>;
    fn get_sale_delivery(&self, id: i64) -> Result<SaleDelivery>;

    /// Rows of `table` whose `column` equals `id_actor`.
    fn select_by_role(
        &self,
        table: OperationTable,
        column: RoleColumn,
        id_actor: i64,
    ) -> Result<Vec<OperationRecord>>;

    /// Chantiers of one kind linked to a management unit through `chantier_ug`.
    fn select_by_management_unit(
        &self,
        kind: ChantierKind,
        id_ug: i64,
    ) -> Result<Vec<OperationRecord>>;

    /// Parcels a chantier was carried out on (`chantier_parcelle`).
    fn parcel_links(&self, kind: ChantierKind, id_chantier: i64) -> Result<Vec<ParcelLink>>;
}

/// Row of join table `chantier_ug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitLink {
    pub kind: ChantierKind,
    pub id_chantier: i64,
    pub id_ug: i64,
}

/// Row of join table `chantier_parcelle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChantierParcelLink {
    pub kind: ChantierKind,
    pub id_chantier: i64,
    #[serde(flatten)]
    pub link: ParcelLink,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryStore {
    pub actors: Vec<Actor>,
    pub farmers: Vec<Farmer>,
    pub communes: Vec<Commune>,
    pub management_units: Vec<ManagementUnit>,
    pub parcels: Vec<Parcel>,
    pub chips_sites: Vec<ChipsSite>,
    pub chips_operations: Vec<ChipsOperation>,
    pub chips_transports: Vec<ChipsTransport>,
    pub chips_storages: Vec<ChipsStorage>,
    pub chips_sales: Vec<ChipsSale>,
    pub sale_deliveries: Vec<SaleDelivery>,
    pub sale_loadings: Vec<SaleLoading>,
    pub standing_timber_sales: Vec<StandingTimberSale>,
    pub other_valorisations: Vec<OtherValorisation>,
    pub farmer_firewoods: Vec<FarmerFirewood>,
    pub humidity_measurements: Vec<HumidityMeasurement>,
    pub unit_links: Vec<UnitLink>,
    pub parcel_links: Vec<ChantierParcelLink>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn chantiers_of_unit(&self, kind: ChantierKind, id_ug: i64) -> Vec<i64> {
        self.unit_links
            .iter()
            .filter(|l| l.kind == kind && l.id_ug == id_ug)
            .map(|l| l.id_chantier)
            .collect()
    }
}

fn find<'a, T, F>(rows: &'a [T], entity: &'static str, id: i64, key: F) -> Result<&'a T>
where
    F: Fn(&T) -> i64,
{
    rows.iter()
        .find(|row| key(row) == id)
        .ok_or(ReportError::NotFound { entity, id })
}

fn unsupported(table: &str, column: &str) -> ReportError {
    ReportError::UnsupportedRole {
        table: table.to_string(),
        column: column.to_string(),
    }
}

impl Store for InMemoryStore {
    fn get_actor(&self, id: i64) -> Result<Actor> {
        find(&self.actors, "acteur", id, |a| a.id).cloned()
    }

    fn get_farmer(&self, id: i64) -> Result<Farmer> {
        find(&self.farmers, "fermier", id, |f| f.id).cloned()
    }

    fn get_commune(&self, id: i64) -> Result<Commune> {
        find(&self.communes, "commune", id, |c| c.id).cloned()
    }

    fn get_management_unit(&self, id: i64) -> Result<ManagementUnit> {
        find(&self.management_units, "ug", id, |u| u.id).cloned()
    }

    fn get_parcel(&self, id: i64) -> Result<Parcel> {
        find(&self.parcels, "parcelle", id, |p| p.id).cloned()
    }

    fn get_chips_site(&self, id: i64) -> Result<ChipsSite> {
        find(&self.chips_sites, "plaq", id, |s| s.id).cloned()
    }

    fn get_chips_sale(&self, id: i64) -> Result<ChipsSale> {
        find(&self.chips_sales, "venteplaq", id, |s| s.id).cloned()
    }

    fn get_sale_delivery(&self, id: i64) -> Result<SaleDelivery> {
        find(&self.sale_deliveries, "ventelivre", id, |d| d.id).cloned()
    }

    fn select_by_role(
        &self,
        table: OperationTable,
        column: RoleColumn,
        id_actor: i64,
    ) -> Result<Vec<OperationRecord>> {
        let is = |v: Option<i64>| v == Some(id_actor);

        let records = match (table, column) {
            (OperationTable::ChipsOperation, RoleColumn::Actor) => self
                .chips_operations
                .iter()
                .filter(|r| r.id_acteur == id_actor)
                .cloned()
                .map(OperationRecord::ChipsOperation)
                .collect(),

            (OperationTable::ChipsTransport, RoleColumn::Transporter) => self
                .chips_transports
                .iter()
                .filter(|r| is(r.id_transporteur))
                .cloned()
                .map(OperationRecord::ChipsTransport)
                .collect(),
            (OperationTable::ChipsTransport, RoleColumn::Driver) => self
                .chips_transports
                .iter()
                .filter(|r| is(r.id_conducteur))
                .cloned()
                .map(OperationRecord::ChipsTransport)
                .collect(),
            (OperationTable::ChipsTransport, RoleColumn::ToolOwner) => self
                .chips_transports
                .iter()
                .filter(|r| is(r.id_proprioutil))
                .cloned()
                .map(OperationRecord::ChipsTransport)
                .collect(),

            (OperationTable::ChipsStorage, RoleColumn::Stacker) => self
                .chips_storages
                .iter()
                .filter(|r| is(r.id_rangeur))
                .cloned()
                .map(OperationRecord::ChipsStorage)
                .collect(),
            (OperationTable::ChipsStorage, RoleColumn::Driver) => self
                .chips_storages
                .iter()
                .filter(|r| is(r.id_conducteur))
                .cloned()
                .map(OperationRecord::ChipsStorage)
                .collect(),
            (OperationTable::ChipsStorage, RoleColumn::ToolOwner) => self
                .chips_storages
                .iter()
                .filter(|r| is(r.id_proprioutil))
                .cloned()
                .map(OperationRecord::ChipsStorage)
                .collect(),

            (OperationTable::SaleDelivery, RoleColumn::Deliverer) => self
                .sale_deliveries
                .iter()
                .filter(|r| is(r.id_livreur))
                .cloned()
                .map(OperationRecord::SaleDelivery)
                .collect(),
            (OperationTable::SaleDelivery, RoleColumn::Driver) => self
                .sale_deliveries
                .iter()
                .filter(|r| is(r.id_conducteur))
                .cloned()
                .map(OperationRecord::SaleDelivery)
                .collect(),
            (OperationTable::SaleDelivery, RoleColumn::ToolOwner) => self
                .sale_deliveries
                .iter()
                .filter(|r| is(r.id_proprioutil))
                .cloned()
                .map(OperationRecord::SaleDelivery)
                .collect(),

            (OperationTable::SaleLoading, RoleColumn::Loader) => self
                .sale_loadings
                .iter()
                .filter(|r| is(r.id_chargeur))
                .cloned()
                .map(OperationRecord::SaleLoading)
                .collect(),
            (OperationTable::SaleLoading, RoleColumn::Driver) => self
                .sale_loadings
                .iter()
                .filter(|r| is(r.id_conducteur))
                .cloned()
                .map(OperationRecord::SaleLoading)
                .collect(),
            (OperationTable::SaleLoading, RoleColumn::ToolOwner) => self
                .sale_loadings
                .iter()
                .filter(|r| is(r.id_proprioutil))
                .cloned()
                .map(OperationRecord::SaleLoading)
                .collect(),

            (OperationTable::ChipsSale, RoleColumn::Client) => self
                .chips_sales
                .iter()
                .filter(|r| r.id_client == id_actor)
                .cloned()
                .map(OperationRecord::ChipsSale)
                .collect(),
            (OperationTable::StandingTimberSale, RoleColumn::Buyer) => self
                .standing_timber_sales
                .iter()
                .filter(|r| r.id_acheteur == id_actor)
                .cloned()
                .map(OperationRecord::StandingTimberSale)
                .collect(),
            (OperationTable::OtherValorisation, RoleColumn::Client) => self
                .other_valorisations
                .iter()
                .filter(|r| r.id_client == id_actor)
                .cloned()
                .map(OperationRecord::OtherValorisation)
                .collect(),
            (OperationTable::FarmerFirewood, RoleColumn::Farmer) => self
                .farmer_firewoods
                .iter()
                .filter(|r| r.id_fermier == id_actor)
                .cloned()
                .map(OperationRecord::FarmerFirewood)
                .collect(),
            (OperationTable::HumidityMeasurement, RoleColumn::Measurer) => self
                .humidity_measurements
                .iter()
                .filter(|r| r.measurers.contains(&id_actor))
                .cloned()
                .map(OperationRecord::HumidityMeasurement)
                .collect(),

            (table, column) => {
                return Err(unsupported(table.table_name(), column.column_name()));
            }
        };

        Ok(records)
    }

    fn select_by_management_unit(
        &self,
        kind: ChantierKind,
        id_ug: i64,
    ) -> Result<Vec<OperationRecord>> {
        let ids = self.chantiers_of_unit(kind, id_ug);

        let records = match kind {
            ChantierKind::ChipsSite => self
                .chips_sites
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(OperationRecord::ChipsSite)
                .collect(),
            ChantierKind::StandingTimber => self
                .standing_timber_sales
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(OperationRecord::StandingTimberSale)
                .collect(),
            ChantierKind::OtherValorisation => self
                .other_valorisations
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(OperationRecord::OtherValorisation)
                .collect(),
            ChantierKind::FarmerFirewood => self
                .farmer_firewoods
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .map(OperationRecord::FarmerFirewood)
                .collect(),
            ChantierKind::ChipsSale => {
                return Err(unsupported(kind.type_chantier(), "chantier_ug.id_ug"));
            }
        };

        Ok(records)
    }

    fn parcel_links(&self, kind: ChantierKind, id_chantier: i64) -> Result<Vec<ParcelLink>> {
        Ok(self
            .parcel_links
            .iter()
            .filter(|l| l.kind == kind && l.id_chantier == id_chantier)
            .map(|l| l.link.clone())
            .collect())
    }
}
