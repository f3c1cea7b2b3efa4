//! Activity timelines of an actor or a management unit.
//!
//! Every table that can reference the entity is described once in a static
//! table of sources. Building a timeline iterates that table, normalizes each
//! returned record into a [`TimelineEntry`] and merges everything, most recent
//! first. A record yields one entry per role the entity holds in it.

use crate::error::{Result, ResultExt};
use crate::schema::{Actor, ChantierKind, OperationRecord};
use crate::store::{OperationTable, RoleColumn, Store};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

/// One line of an actor or management-unit activity page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub role: String,
    /// Page of the activity.
    pub url: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLabel {
    Fixed(&'static str),
    /// Taken from the kind of chips operation (abatteur, débardeur...).
    ChipsOperationKind,
}

/// Which value of the record is substituted into the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKey {
    Record,
    ChipsSite,
    Sale,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlTemplate {
    pub prefix: &'static str,
    pub key: UrlKey,
    pub suffix: &'static str,
}

impl UrlTemplate {
    const fn new(prefix: &'static str, key: UrlKey, suffix: &'static str) -> Self {
        Self {
            prefix,
            key,
            suffix,
        }
    }

    pub fn render(&self, value: i64) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }
}

const CHIPS_SITE_OPS_URL: UrlTemplate =
    UrlTemplate::new("/chantier/plaquette/", UrlKey::ChipsSite, "/chantiers");
const SALE_URL: UrlTemplate = UrlTemplate::new("/vente/", UrlKey::Sale, "");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSource {
    pub table: OperationTable,
    pub column: RoleColumn,
    pub role: RoleLabel,
    pub url: UrlTemplate,
}

const fn role(
    table: OperationTable,
    column: RoleColumn,
    label: &'static str,
    url: UrlTemplate,
) -> RoleSource {
    RoleSource {
        table,
        column,
        role: RoleLabel::Fixed(label),
        url,
    }
}

/// Every place an actor can appear, in traversal order.
pub const ACTOR_ROLE_SOURCES: &[RoleSource] = &[
    RoleSource {
        table: OperationTable::ChipsOperation,
        column: RoleColumn::Actor,
        role: RoleLabel::ChipsOperationKind,
        url: CHIPS_SITE_OPS_URL,
    },
    role(
        OperationTable::ChipsTransport,
        RoleColumn::Transporter,
        "transporteur",
        CHIPS_SITE_OPS_URL,
    ),
    role(
        OperationTable::ChipsTransport,
        RoleColumn::Driver,
        "conducteur (transport)",
        CHIPS_SITE_OPS_URL,
    ),
    role(
        OperationTable::ChipsTransport,
        RoleColumn::ToolOwner,
        "propriétaire outil (transport)",
        CHIPS_SITE_OPS_URL,
    ),
    role(OperationTable::ChipsStorage, RoleColumn::Stacker, "rangeur", CHIPS_SITE_OPS_URL),
    role(
        OperationTable::ChipsStorage,
        RoleColumn::Driver,
        "conducteur (rangement)",
        CHIPS_SITE_OPS_URL,
    ),
    role(
        OperationTable::ChipsStorage,
        RoleColumn::ToolOwner,
        "propriétaire outil (rangement)",
        CHIPS_SITE_OPS_URL,
    ),
    role(OperationTable::SaleDelivery, RoleColumn::Deliverer, "livreur", SALE_URL),
    role(OperationTable::SaleDelivery, RoleColumn::Driver, "conducteur (livraison)", SALE_URL),
    role(
        OperationTable::SaleDelivery,
        RoleColumn::ToolOwner,
        "propriétaire outil (livraison)",
        SALE_URL,
    ),
    role(OperationTable::SaleLoading, RoleColumn::Loader, "chargeur", SALE_URL),
    role(OperationTable::SaleLoading, RoleColumn::Driver, "conducteur (chargement)", SALE_URL),
    role(
        OperationTable::SaleLoading,
        RoleColumn::ToolOwner,
        "propriétaire outil (chargement)",
        SALE_URL,
    ),
    role(OperationTable::ChipsSale, RoleColumn::Client, "client plaquettes", SALE_URL),
    role(
        OperationTable::StandingTimberSale,
        RoleColumn::Buyer,
        "client bois sur pied",
        UrlTemplate::new("/chantier/bois-sur-pied/", UrlKey::Year, ""),
    ),
    role(
        OperationTable::OtherValorisation,
        RoleColumn::Client,
        "client autres valorisations",
        UrlTemplate::new("/chantier/autre/liste/", UrlKey::Year, ""),
    ),
    role(
        OperationTable::FarmerFirewood,
        RoleColumn::Farmer,
        "fermier",
        UrlTemplate::new("/chantier/chauffage-fermier/liste/", UrlKey::Year, ""),
    ),
    role(
        OperationTable::HumidityMeasurement,
        RoleColumn::Measurer,
        "mesureur",
        UrlTemplate::new("/humidite/liste/", UrlKey::Year, ""),
    ),
];

/// Chantiers attached to a management unit through `chantier_ug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSource {
    pub kind: ChantierKind,
    pub role: &'static str,
    /// Prepended to the chantier name in the entry label.
    pub label_prefix: &'static str,
    pub url: UrlTemplate,
}

pub const UNIT_SOURCES: &[UnitSource] = &[
    UnitSource {
        kind: ChantierKind::ChipsSite,
        role: "plaquettes",
        label_prefix: "",
        url: UrlTemplate::new("/chantier/plaquette/", UrlKey::Record, ""),
    },
    UnitSource {
        kind: ChantierKind::OtherValorisation,
        role: "autres valorisations",
        label_prefix: "Chantier ",
        url: UrlTemplate::new("/chantier/autre/liste/", UrlKey::Year, ""),
    },
    UnitSource {
        kind: ChantierKind::FarmerFirewood,
        role: "chauffage fermier",
        label_prefix: "",
        url: UrlTemplate::new("/chantier/chauffage-fermier/liste/", UrlKey::Year, ""),
    },
];

fn chips_site_label<S: Store + ?Sized>(store: &S, id_chantier: i64) -> Result<String> {
    Ok(store
        .get_chips_site(id_chantier)
        .context("get_chips_site()")?
        .full_name())
}

fn sale_label<S: Store + ?Sized>(store: &S, id_vente: i64) -> Result<String> {
    let sale = store.get_chips_sale(id_vente).context("get_chips_sale()")?;
    let client = store.get_actor(sale.id_client).context("get_actor()")?;
    Ok(sale.full_name(&client))
}

fn sale_id<S: Store + ?Sized>(store: &S, record: &OperationRecord) -> Result<i64> {
    match record {
        OperationRecord::ChipsSale(r) => Ok(r.id),
        OperationRecord::SaleDelivery(r) => Ok(r.id_vente),
        OperationRecord::SaleLoading(r) => Ok(store
            .get_sale_delivery(r.id_livraison)
            .context("get_sale_delivery()")?
            .id_vente),
        other => Ok(other.id()),
    }
}

/// Human-readable name of the activity a record belongs to.
fn describe<S: Store + ?Sized>(store: &S, record: &OperationRecord) -> Result<String> {
    match record {
        OperationRecord::ChipsSite(r) => Ok(r.full_name()),
        OperationRecord::ChipsOperation(r) => chips_site_label(store, r.id_chantier),
        OperationRecord::ChipsTransport(r) => chips_site_label(store, r.id_chantier),
        OperationRecord::ChipsStorage(r) => chips_site_label(store, r.id_chantier),
        OperationRecord::ChipsSale(r) => sale_label(store, r.id),
        OperationRecord::SaleDelivery(r) => sale_label(store, r.id_vente),
        OperationRecord::SaleLoading(_) => {
            let id_vente = sale_id(store, record)?;
            Ok(format!("Chargement - {}", sale_label(store, id_vente)?))
        }
        OperationRecord::StandingTimberSale(r) => {
            let buyer = store.get_actor(r.id_acheteur).context("get_actor()")?;
            Ok(r.full_name(&buyer))
        }
        OperationRecord::OtherValorisation(r) => {
            let client = store.get_actor(r.id_client).context("get_actor()")?;
            Ok(r.full_name(&client))
        }
        OperationRecord::FarmerFirewood(r) => {
            let farmer = store.get_actor(r.id_fermier).context("get_actor()")?;
            Ok(r.full_name(&farmer))
        }
        OperationRecord::HumidityMeasurement(_) => Ok("Mesure humidité".to_string()),
    }
}

fn render_url<S: Store + ?Sized>(
    store: &S,
    template: &UrlTemplate,
    record: &OperationRecord,
) -> Result<String> {
    let value = match template.key {
        UrlKey::Record => record.id(),
        UrlKey::ChipsSite => record.chips_site_id().unwrap_or_else(|| record.id()),
        UrlKey::Sale => sale_id(store, record)?,
        UrlKey::Year => i64::from(record.date().year()),
    };
    Ok(template.render(value))
}

fn role_label(label: &RoleLabel, record: &OperationRecord) -> String {
    match (label, record) {
        (RoleLabel::Fixed(text), _) => text.to_string(),
        (RoleLabel::ChipsOperationKind, OperationRecord::ChipsOperation(op)) => {
            op.kind.role_name().to_string()
        }
        (RoleLabel::ChipsOperationKind, _) => String::new(),
    }
}

fn normalize<S: Store + ?Sized>(
    store: &S,
    record: &OperationRecord,
    role: String,
    url: &UrlTemplate,
) -> Result<TimelineEntry> {
    Ok(TimelineEntry {
        date: record.date(),
        role,
        url: render_url(store, url, record)?,
        label: describe(store, record)?,
    })
}

/// Most recent first; entries sharing a date keep their traversal order.
fn sort_by_date_desc(entries: &mut [TimelineEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Activities an actor took part in, most recent first.
pub fn build_actor_timeline<S>(store: &S, id_actor: i64) -> Result<Vec<TimelineEntry>>
where
    S: Store + ?Sized,
{
    let mut entries = Vec::new();

    for source in ACTOR_ROLE_SOURCES {
        let records = store
            .select_by_role(source.table, source.column, id_actor)
            .context(&format!(
                "select_by_role({}.{})",
                source.table, source.column
            ))?;

        for record in &records {
            let role = role_label(&source.role, record);
            entries.push(normalize(store, record, role, &source.url)?);
        }
    }

    sort_by_date_desc(&mut entries);
    debug!("Actor {}: {} timeline entries", id_actor, entries.len());

    Ok(entries)
}

/// Chantiers carried out on a management unit, most recent first.
pub fn build_unit_timeline<S>(store: &S, id_ug: i64) -> Result<Vec<TimelineEntry>>
where
    S: Store + ?Sized,
{
    let mut entries = Vec::new();

    for source in UNIT_SOURCES {
        let records = store
            .select_by_management_unit(source.kind, id_ug)
            .context(&format!(
                "select_by_management_unit({})",
                source.kind.type_chantier()
            ))?;

        for record in &records {
            let mut entry = normalize(store, record, source.role.to_string(), &source.url)?;
            entry.label.insert_str(0, source.label_prefix);
            entries.push(entry);
        }
    }

    sort_by_date_desc(&mut entries);
    debug!("UG {}: {} timeline entries", id_ug, entries.len());

    Ok(entries)
}

/// Actors imported from the SCTL register are never deletable; others only
/// while no activity references them.
pub fn is_actor_deletable<S>(store: &S, actor: &Actor) -> Result<bool>
where
    S: Store + ?Sized,
{
    if actor.is_sctl() {
        return Ok(false);
    }
    let timeline = build_actor_timeline(store, actor.id).context("build_actor_timeline()")?;
    Ok(timeline.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::schema::*;
    use crate::store::{InMemoryStore, UnitLink};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn actor(id: i64, name: &str) -> Actor {
        Actor {
            id,
            id_sctl: 0,
            last_name: name.to_string(),
            first_name: String::new(),
        }
    }

    fn chips_site(id: i64) -> ChipsSite {
        ChipsSite {
            id,
            start_date: date(2022, 2, 1),
            places: vec!["Le Cros".to_string()],
            volume: 100.0,
            surface: 1.5,
        }
    }

    #[test]
    fn test_every_actor_source_is_supported_by_the_store() {
        let store = InMemoryStore::new();
        for source in ACTOR_ROLE_SOURCES {
            assert!(
                store
                    .select_by_role(source.table, source.column, 1)
                    .is_ok(),
                "{}.{} not queryable",
                source.table,
                source.column
            );
        }
    }

    #[test]
    fn test_driver_and_tool_owner_yield_two_entries() {
        let mut store = InMemoryStore::new();
        store.actors.push(actor(5, "Petit"));
        store.chips_sites.push(chips_site(3));
        store.chips_transports.push(ChipsTransport {
            id: 1,
            id_chantier: 3,
            id_transporteur: None,
            id_conducteur: Some(5),
            id_proprioutil: Some(5),
            date: date(2022, 3, 4),
        });

        let timeline = build_actor_timeline(&store, 5).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].role, "conducteur (transport)");
        assert_eq!(timeline[1].role, "propriétaire outil (transport)");
        for entry in &timeline {
            assert_eq!(entry.url, "/chantier/plaquette/3/chantiers");
            assert_eq!(entry.label, "Chantier plaquettes Le Cros 01/02/2022");
        }
    }

    #[test]
    fn test_loading_resolves_sale_through_delivery() {
        let mut store = InMemoryStore::new();
        store.actors.push(actor(1, "Moreau"));
        store.actors.push(actor(2, "Client"));
        store.chips_sales.push(ChipsSale {
            id: 40,
            id_client: 2,
            date: date(2023, 1, 10),
            quantity: 30.0,
            unit_price: 25.0,
        });
        store.sale_deliveries.push(SaleDelivery {
            id: 50,
            id_vente: 40,
            id_livreur: None,
            id_conducteur: None,
            id_proprioutil: None,
            date: date(2023, 1, 11),
        });
        store.sale_loadings.push(SaleLoading {
            id: 60,
            id_livraison: 50,
            id_chargeur: Some(1),
            id_conducteur: None,
            id_proprioutil: Some(1),
            date: date(2023, 1, 11),
        });

        let timeline = build_actor_timeline(&store, 1).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].role, "chargeur");
        assert_eq!(timeline[1].role, "propriétaire outil (chargement)");
        assert_eq!(timeline[0].url, "/vente/40");
        assert_eq!(
            timeline[0].label,
            "Chargement - Vente plaquettes Client 10/01/2023"
        );
    }

    #[test]
    fn test_timeline_sorted_descending() {
        let mut store = InMemoryStore::new();
        store.actors.push(actor(1, "Bernard"));
        store.chips_sites.push(chips_site(3));
        store.chips_operations.push(ChipsOperation {
            id: 1,
            id_chantier: 3,
            id_acteur: 1,
            kind: ChipsOperationKind::Felling,
            start_date: date(2021, 1, 5),
        });
        store.humidity_measurements.push(HumidityMeasurement {
            id: 2,
            date: date(2023, 4, 1),
            measurers: vec![1, 9],
        });
        store.farmer_firewoods.push(FarmerFirewood {
            id: 3,
            id_fermier: 1,
            date: date(2022, 11, 2),
            volume: 6.0,
            unit: Unit::Stere,
            places: vec![],
        });

        let timeline = build_actor_timeline(&store, 1).unwrap();
        let roles: Vec<&str> = timeline.iter().map(|e| e.role.as_str()).collect();
        assert_eq!(roles, vec!["mesureur", "fermier", "abatteur"]);
        assert_eq!(timeline[0].url, "/humidite/liste/2023");
        assert_eq!(timeline[1].url, "/chantier/chauffage-fermier/liste/2022");
        assert!(timeline.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_missing_chips_site_aborts_build() {
        let mut store = InMemoryStore::new();
        store.chips_operations.push(ChipsOperation {
            id: 1,
            id_chantier: 99,
            id_acteur: 1,
            kind: ChipsOperationKind::Chipping,
            start_date: date(2021, 1, 5),
        });

        let err = build_actor_timeline(&store, 1).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ReportError::NotFound {
                entity: "plaq",
                id: 99
            }
        ));
    }

    #[test]
    fn test_unit_timeline() {
        let mut store = InMemoryStore::new();
        store.actors.push(actor(2, "Richard"));
        store.chips_sites.push(chips_site(3));
        store.other_valorisations.push(OtherValorisation {
            id: 7,
            id_client: 2,
            type_valo: ValoType::Firewood,
            contract_date: date(2022, 10, 1),
            volume: 20.0,
            unit: Unit::Stere,
            unit_price: 40.0,
            places: vec!["Le Cros".to_string()],
        });
        store.other_valorisations.push(OtherValorisation {
            id: 8,
            id_client: 2,
            type_valo: ValoType::Pulp,
            contract_date: date(2023, 10, 1),
            volume: 20.0,
            unit: Unit::Tonne,
            unit_price: 40.0,
            places: vec![],
        });
        store.unit_links.push(UnitLink {
            kind: ChantierKind::ChipsSite,
            id_chantier: 3,
            id_ug: 1,
        });
        store.unit_links.push(UnitLink {
            kind: ChantierKind::OtherValorisation,
            id_chantier: 7,
            id_ug: 1,
        });

        let timeline = build_unit_timeline(&store, 1).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].url, "/chantier/autre/liste/2022");
        assert_eq!(
            timeline[0].label,
            "Chantier Bois de chauffage Richard - Le Cros 01/10/2022"
        );
        assert_eq!(timeline[1].label, "Chantier plaquettes Le Cros 01/02/2022");
        assert_eq!(timeline[1].url, "/chantier/plaquette/3");
        assert_eq!(timeline[1].role, "plaquettes");
    }

    #[test]
    fn test_is_actor_deletable() {
        let mut store = InMemoryStore::new();
        let free = actor(1, "Laurent");
        let mut sctl = actor(2, "Dubois");
        sctl.id_sctl = 14;
        store.actors.push(free.clone());
        store.actors.push(sctl.clone());

        assert!(is_actor_deletable(&store, &free).unwrap());
        assert!(!is_actor_deletable(&store, &sctl).unwrap());

        store.humidity_measurements.push(HumidityMeasurement {
            id: 1,
            date: date(2022, 1, 1),
            measurers: vec![1],
        });
        assert!(!is_actor_deletable(&store, &free).unwrap());
    }
}
