use anyhow::Result;
use bdl_reporting::*;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const STORE_JSON: &str = r#"{
    "actors": [
        {"id": 1, "id_sctl": 12, "last_name": "GFA du Larzac"},
        {"id": 2, "id_sctl": 13, "last_name": "SCI Caussenarde"},
        {"id": 3, "last_name": "Bonnet", "first_name": "Paul"},
        {"id": 4, "last_name": "Fabre", "first_name": "Lucie"},
        {"id": 5, "last_name": "Chaufferie de Nant"},
        {"id": 6, "last_name": "Vidal", "first_name": "Marc"}
    ],
    "farmers": [{"id": 1, "last_name": "Fabre", "first_name": "Lucie"}],
    "communes": [{"id": 1, "name": "Nant"}],
    "management_units": [
        {"id": 1, "code": "II-4"},
        {"id": 2, "code": "I-12"},
        {"id": 3, "code": "XIX.5"},
        {"id": 4, "code": "I-3"}
    ],
    "parcels": [
        {"id": 10, "code": "A-101", "surface": 3.0, "id_proprietaire": 1, "id_commune": 1},
        {"id": 11, "code": "A-102", "surface": 8.0, "id_proprietaire": 2, "id_commune": 1}
    ],
    "chips_sites": [
        {"id": 1, "start_date": "2022-10-03", "places": ["Le Frontal"],
         "volume": 180.0, "surface": 2.2}
    ],
    "chips_operations": [
        {"id": 1, "id_chantier": 1, "id_acteur": 3, "kind": "AB", "start_date": "2022-10-03"},
        {"id": 2, "id_chantier": 1, "id_acteur": 3, "kind": "DC", "start_date": "2022-10-20"}
    ],
    "chips_transports": [
        {"id": 1, "id_chantier": 1, "id_conducteur": 3, "id_proprioutil": 3, "date": "2022-10-21"}
    ],
    "chips_sales": [
        {"id": 1, "id_client": 5, "date": "2023-01-16", "quantity": 60.0, "unit_price": 28.0}
    ],
    "sale_deliveries": [
        {"id": 1, "id_vente": 1, "id_livreur": 3, "date": "2023-01-17"}
    ],
    "other_valorisations": [
        {"id": 1, "id_client": 6, "type_valo": "CH", "contract_date": "2022-05-15",
         "volume": 10.0, "unit": "st", "unit_price": 50.0, "places": ["Le Frontal"]},
        {"id": 2, "id_client": 6, "type_valo": "CH", "contract_date": "2022-07-01",
         "volume": 15.0, "unit": "st", "unit_price": 40.0, "places": ["Le Frontal"]},
        {"id": 3, "id_client": 6, "type_valo": "PP", "contract_date": "2023-03-01",
         "volume": 20.0, "unit": "t", "unit_price": 30.0}
    ],
    "farmer_firewoods": [
        {"id": 1, "id_fermier": 4, "date": "2023-02-10", "volume": 6.0, "unit": "st"}
    ],
    "humidity_measurements": [
        {"id": 1, "date": "2022-11-15", "measurers": [3, 6]}
    ],
    "unit_links": [
        {"kind": "chips_site", "id_chantier": 1, "id_ug": 1},
        {"kind": "other_valorisation", "id_chantier": 1, "id_ug": 1},
        {"kind": "other_valorisation", "id_chantier": 2, "id_ug": 1},
        {"kind": "farmer_firewood", "id_chantier": 1, "id_ug": 1}
    ],
    "parcel_links": [
        {"kind": "other_valorisation", "id_chantier": 1, "id_parcelle": 10, "entiere": true},
        {"kind": "other_valorisation", "id_chantier": 1, "id_parcelle": 11, "entiere": false,
         "surface": 1.0},
        {"kind": "other_valorisation", "id_chantier": 2, "id_parcelle": 10, "entiere": true},
        {"kind": "other_valorisation", "id_chantier": 2, "id_parcelle": 11, "entiere": false,
         "surface": 1.0},
        {"kind": "other_valorisation", "id_chantier": 3, "id_parcelle": 11, "entiere": true},
        {"kind": "chips_sale", "id_chantier": 1, "id_parcelle": 10, "entiere": true}
    ]
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store() -> InMemoryStore {
    InMemoryStore::from_json_str(STORE_JSON).unwrap()
}

const JUNE_CONFIG: &str = r#"{"organization_name": "Bois du Larzac", "season_start": "06-01"}"#;

fn june_config() -> ReportConfig {
    ReportConfig::from_json_str(JUNE_CONFIG).unwrap()
}

fn other_valorisation_activities(store: &InMemoryStore) -> Vec<Activity> {
    store.other_valorisations.iter().map(Activity::from).collect()
}

#[test]
fn test_june_seasons_end_to_end() -> Result<()> {
    let store = store();
    let reporter = ActivityReporter::new(june_config(), &store)?;
    let activities = other_valorisation_activities(&store);

    let summaries = reporter.season_summaries(&activities)?;
    assert_eq!(summaries.len(), 2);

    let first = &summaries[0];
    assert_eq!(first.start, date(2021, 6, 1));
    assert_eq!(first.end, date(2022, 6, 1));
    assert_eq!(first.totals.len(), 1);
    let firewood = first.total_for(ValoType::Firewood).unwrap();
    assert_eq!(firewood.volume, 10.0);
    assert_eq!(firewood.unit, Unit::Stere);
    // 3 ha whole parcel for owner 1, 1 ha partial for owner 2.
    assert!((firewood.price_by_owner[&1] - 375.0).abs() < 1e-9);
    assert!((firewood.price_by_owner[&2] - 125.0).abs() < 1e-9);

    let second = &summaries[1];
    assert_eq!(second.boundary().label(), "2022-2023");
    let types: Vec<ValoType> = second.totals.iter().map(|t| t.type_valo).collect();
    assert_eq!(types, vec![ValoType::Firewood, ValoType::Pulp]);
    assert_eq!(second.totals[0].volume, 15.0);
    assert!((second.totals[0].total_price() - 600.0).abs() < 1e-9);

    let pulp = second.total_for(ValoType::Pulp).unwrap();
    assert_eq!(pulp.unit, Unit::Tonne);
    assert_eq!(pulp.price_by_owner.len(), 1);
    assert!((pulp.price_by_owner[&2] - 600.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_configured_first_year_and_last_date() -> Result<()> {
    let store = store();
    let activities = other_valorisation_activities(&store);
    let anchor = SeasonAnchor::parse("06-01")?;

    let summaries = compute_season_summaries(
        &store,
        anchor,
        2019,
        date(2022, 5, 31),
        &activities,
        UnitPolicy::LastWriteWins,
        OwnerPricePolicy::LastActivity,
    )?;

    // The last season ends on 2022-06-01: the July and March activities are left out.
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].start, date(2021, 6, 1));
    assert_eq!(summaries[0].totals.len(), 1);
    assert_eq!(summaries[0].total_for(ValoType::Firewood).unwrap().volume, 10.0);
    assert!(summaries[0].total_for(ValoType::Pulp).is_none());

    // With a later last date the March pulp sale falls in the 2022-2023 season.
    let summaries = compute_season_summaries(
        &store,
        anchor,
        2019,
        date(2022, 12, 31),
        &activities,
        UnitPolicy::LastWriteWins,
        OwnerPricePolicy::LastActivity,
    )?;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].boundary().label(), "2022-2023");
    assert!(summaries[1].total_for(ValoType::Pulp).is_some());

    Ok(())
}

#[test]
fn test_mixed_sources_are_totalled_per_valorisation() -> Result<()> {
    let store = store();
    let mut activities: Vec<Activity> = store.chips_sales.iter().map(Activity::from).collect();
    activities.extend(store.farmer_firewoods.iter().map(Activity::from));
    activities.extend(other_valorisation_activities(&store));

    let config = ReportConfig::from_json_str(r#"{"organization_name": "BDL"}"#)?;
    let summaries = process_season_summaries(&config, &store, &activities)?;

    let labels: Vec<String> = summaries.iter().map(|s| s.boundary().label()).collect();
    assert_eq!(labels, vec!["2022", "2023"]);

    let season_2023 = &summaries[1];
    let types: Vec<&str> = season_2023.totals.iter().map(|t| t.type_valo.code()).collect();
    assert_eq!(types, vec!["CF", "PP", "PQ"]);

    let chips = season_2023.total_for(ValoType::Chips).unwrap();
    assert_eq!(chips.unit, Unit::BulkCubicMeter);
    assert!((chips.price_by_owner[&1] - 1680.0).abs() < 1e-9);

    let farmer = season_2023.total_for(ValoType::FarmerFirewood).unwrap();
    assert_eq!(farmer.volume, 6.0);
    assert!(farmer.price_by_owner.is_empty());

    Ok(())
}

#[test]
fn test_strict_unit_policy_rejects_mixed_units() -> Result<()> {
    let mut store = store();
    store.other_valorisations[1].unit = Unit::CubicMeter;
    store.other_valorisations[1].contract_date = date(2022, 5, 20);

    let activities = other_valorisation_activities(&store);

    let lenient = ActivityReporter::new(june_config(), &store)?.season_summaries(&activities)?;
    assert_eq!(lenient[0].totals[0].unit, Unit::CubicMeter);
    assert_eq!(lenient[0].totals[0].volume, 25.0);

    let strict = ReportConfig::from_json_str(
        r#"{"organization_name": "BDL", "season_start": "06-01", "unit_policy": "strict"}"#,
    )?;
    let err = ActivityReporter::new(strict, &store)?
        .season_summaries(&activities)
        .unwrap_err();
    assert!(matches!(err.root_cause(), ReportError::MixedUnits { .. }));

    Ok(())
}

#[test]
fn test_owner_price_policies() -> Result<()> {
    let mut store = store();
    store.other_valorisations[1].contract_date = date(2022, 5, 20);
    let activities = other_valorisation_activities(&store);

    // Both firewood sales sit on owner 1 (3 ha) and owner 2 (1 ha).
    let last = ActivityReporter::new(june_config(), &store)?.season_summaries(&activities)?;
    let firewood = last[0].total_for(ValoType::Firewood).unwrap();
    assert_eq!(firewood.volume, 25.0);
    assert!((firewood.price_by_owner[&1] - 450.0).abs() < 1e-9);
    assert!((firewood.price_by_owner[&2] - 150.0).abs() < 1e-9);

    let accumulate = ReportConfig {
        owner_price_policy: OwnerPricePolicy::Accumulate,
        ..june_config()
    };
    let summed = ActivityReporter::new(accumulate, &store)?.season_summaries(&activities)?;
    let firewood = summed[0].total_for(ValoType::Firewood).unwrap();
    assert!((firewood.price_by_owner[&1] - 825.0).abs() < 1e-9);
    assert!((firewood.price_by_owner[&2] - 275.0).abs() < 1e-9);
    assert!((firewood.total_price() - 1100.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_integrity_fault_aborts_the_report() -> Result<()> {
    let mut store = store();
    store.parcels[0].surface = -1.0;

    let activities = other_valorisation_activities(&store);
    let err = ActivityReporter::new(june_config(), &store)?
        .season_summaries(&activities)
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ReportError::InvalidSurface { owner: 1, .. }
    ));
    Ok(())
}

#[test]
fn test_cancelling_surfaces_abort_the_report() -> Result<()> {
    // Owner surfaces that cancel out leave a float residue, not a usable total.
    let mut store = store();
    store.parcels[0].surface = 0.3;
    store.parcel_links[1].link.surface = -0.3;
    let activities = other_valorisation_activities(&store);
    let err = ActivityReporter::new(june_config(), &store)?
        .season_summaries(&activities)
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ReportError::InvalidSurface { owner: 2, .. }
    ));

    Ok(())
}

#[test]
fn test_summaries_json() -> Result<()> {
    let store = store();
    let reporter = ActivityReporter::new(june_config(), &store)?;
    let json = reporter.season_summaries_json(&other_valorisation_activities(&store))?;

    let value: serde_json::Value = serde_json::from_str(&json)?;
    let seasons = value.as_array().unwrap();
    assert_eq!(seasons.len(), 2);
    assert_eq!(seasons[0]["start"], "2021-06-01");
    assert_eq!(seasons[1]["totals"][1]["type_valo"], "PP");
    assert_eq!(seasons[1]["totals"][1]["unit"], "t");
    assert_eq!(seasons[1]["totals"][1]["price_by_owner"]["2"], 600.0);

    let decoded: Vec<SeasonSummary> = serde_json::from_str(&json)?;
    assert_eq!(decoded[0].total_for(ValoType::Firewood).unwrap().volume, 10.0);

    Ok(())
}

#[test]
fn test_actor_timeline() -> Result<()> {
    let store = store();
    let reporter = ActivityReporter::new(june_config(), &store)?;

    let timeline = reporter.actor_timeline(3)?;
    let roles: Vec<&str> = timeline.iter().map(|e| e.role.as_str()).collect();
    assert_eq!(
        roles,
        vec![
            "livreur",
            "mesureur",
            "conducteur (transport)",
            "propriétaire outil (transport)",
            "déchiqueteur",
            "abatteur",
        ]
    );

    assert_eq!(timeline[0].url, "/vente/1");
    assert_eq!(
        timeline[0].label,
        "Vente plaquettes Chaufferie de Nant 16/01/2023"
    );
    assert_eq!(timeline[1].url, "/humidite/liste/2022");
    assert_eq!(timeline[2].url, timeline[3].url);
    assert_eq!(timeline[2].url, "/chantier/plaquette/1/chantiers");
    assert_eq!(
        timeline[5].label,
        "Chantier plaquettes Le Frontal 03/10/2022"
    );
    assert!(timeline.windows(2).all(|w| w[0].date >= w[1].date));

    let client = reporter.actor_timeline(5)?;
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].role, "client plaquettes");

    Ok(())
}

#[test]
fn test_actor_deletability() -> Result<()> {
    let mut store = store();
    store.actors.push(Actor {
        id: 7,
        id_sctl: 0,
        last_name: "Nouveau".to_string(),
        first_name: String::new(),
    });
    let reporter = ActivityReporter::new(june_config(), &store)?;

    assert!(reporter.is_actor_deletable(7)?);
    assert!(!reporter.is_actor_deletable(3)?);
    // Owners imported from the SCTL register.
    assert!(!reporter.is_actor_deletable(1)?);

    let err = reporter.is_actor_deletable(99).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ReportError::NotFound { id: 99, .. }
    ));

    Ok(())
}

#[test]
fn test_unit_timeline_and_recap() -> Result<()> {
    let store = store();
    let reporter = ActivityReporter::new(june_config(), &store)?;

    let timeline = reporter.unit_timeline(1)?;
    let urls: Vec<&str> = timeline.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "/chantier/chauffage-fermier/liste/2023",
            "/chantier/plaquette/1",
            "/chantier/autre/liste/2022",
            "/chantier/autre/liste/2022",
        ]
    );
    assert_eq!(timeline[0].label, "Chauffage fermier Lucie Fabre 10/02/2023");

    let (recaps, years) = reporter.unit_recap(1)?;
    assert_eq!(years, vec![2023, 2022]);
    assert_eq!(recaps[&2023].farmer_firewood.quantity, 6.0);
    assert_eq!(recaps[&2022].chips.quantity, 180.0);
    assert_eq!(recaps[&2022].chips.surface, 2.2);
    assert_eq!(recaps[&2022].firewood.quantity, 25.0);
    assert!((recaps[&2022].firewood.profit - 1100.0).abs() < 1e-9);

    assert!(reporter.unit_timeline(2)?.is_empty());
    Ok(())
}

#[test]
fn test_unit_code_ordering() {
    let groups = group_units_by_roman_prefix(store().management_units);
    let codes: Vec<Vec<&str>> = groups
        .iter()
        .map(|g| g.iter().map(|u| u.code.as_str()).collect())
        .collect();
    assert_eq!(codes, vec![vec!["I-3", "I-12"], vec!["II-4"], vec!["XIX.5"]]);
}

#[test]
fn test_filter_recap() -> Result<()> {
    let store = store();
    let reporter = ActivityReporter::new(june_config(), &store)?;

    assert_eq!(
        reporter.filter_recap(&BTreeMap::new())?,
        "Aucun filtre, tout est affiché"
    );

    let mut filters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    filters.insert("parcelle".to_string(), vec!["10".to_string(), "11".to_string()]);
    filters.insert("essence".to_string(), vec!["CHE".to_string(), "PSY".to_string()]);
    filters.insert("commune".to_string(), vec!["1".to_string()]);

    let recap = reporter.filter_recap(&filters)?;
    assert_eq!(
        recap,
        "<table>\n\
         <tr><td>Commune :</td><td>Nant</td></tr>\n\
         <tr><td>Essences :</td><td>Chêne, Pin sylvestre</td></tr>\n\
         <tr><td>Parcelles :</td><td><a href=\"/parcelle/10\">A-101</a>, <a href=\"/parcelle/11\">A-102</a></td></tr>\n\
         </table>\n"
    );

    filters.insert("ug".to_string(), vec!["1x".to_string()]);
    assert!(matches!(
        reporter.filter_recap(&filters),
        Err(ReportError::InvalidFilter { .. })
    ));

    Ok(())
}
