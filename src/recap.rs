use crate::error::{ReportError, Result, ResultExt};
use crate::schema::{essence_label, ValoType};
use crate::store::Store;
use crate::utils::{date_fr, parse_iso_date};
use std::collections::BTreeMap;

pub const NO_FILTER: &str = "Aucun filtre, tout est affiché";

fn parse_id(filter: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ReportError::InvalidFilter {
            filter: filter.to_string(),
            value: value.to_string(),
        })
}

fn link(prefix: &str, id: i64, text: impl std::fmt::Display) -> String {
    format!("<a href=\"/{}/{}\">{}</a>", prefix, id, text)
}

fn row(label: &str, content: &str) -> String {
    format!("<tr><td>{} :</td><td>{}</td></tr>\n", label, content)
}

fn period(values: &[String]) -> Result<(&str, &str)> {
    match values {
        [start, end, ..] => Ok((start.as_str(), end.as_str())),
        _ => Err(ReportError::InvalidFilter {
            filter: "periode".to_string(),
            value: values.join(","),
        }),
    }
}

fn parse_filter_date(value: &str) -> Result<String> {
    let date = parse_iso_date(value).map_err(|_| ReportError::InvalidFilter {
        filter: "periode".to_string(),
        value: value.to_string(),
    })?;
    Ok(date_fr(date))
}

/// Summary of the filters of a search form, shown above its results.
///
/// Rows come out in a fixed order whatever the map order; unknown keys and
/// empty filters are ignored. Single-valued filters (`fermier`, `commune`,
/// `client`) only read their first value.
pub fn compute_filter_recap<S>(store: &S, filters: &BTreeMap<String, Vec<String>>) -> Result<String>
where
    S: Store + ?Sized,
{
    let active = |key: &str| filters.get(key).filter(|values| !values.is_empty());

    if filters.values().all(|values| values.is_empty()) {
        return Ok(NO_FILTER.to_string());
    }

    let mut html = String::from("<table>\n");

    if let Some(values) = active("periode") {
        let (start, end) = period(values)?;
        let content = format!(
            "{} - {}",
            parse_filter_date(start)?,
            parse_filter_date(end)?
        );
        html.push_str(&row("Période", &content));
    }

    if let Some(values) = active("proprio") {
        let mut links = Vec::with_capacity(values.len());
        for value in values {
            let owner = store
                .get_actor(parse_id("proprio", value)?)
                .context("get_actor()")?;
            links.push(link("acteur", owner.id, &owner));
        }
        html.push_str(&row("Propriétaire", &links.join(", ")));
    }

    if let Some(values) = active("fermier") {
        let farmer = store
            .get_farmer(parse_id("fermier", &values[0])?)
            .context("get_farmer()")?;
        html.push_str(&row("Fermier", &link("fermier", farmer.id, &farmer)));
    }

    if let Some(values) = active("commune") {
        let commune = store
            .get_commune(parse_id("commune", &values[0])?)
            .context("get_commune()")?;
        html.push_str(&row("Commune", &commune.to_string()));
    }

    if let Some(values) = active("client") {
        let client = store
            .get_actor(parse_id("client", &values[0])?)
            .context("get_actor()")?;
        html.push_str(&row("Client", &link("acteur", client.id, &client)));
    }

    if let Some(values) = active("essence") {
        let labels: Vec<&str> = values
            .iter()
            .map(|code| essence_label(code).unwrap_or(code.as_str()))
            .collect();
        html.push_str(&row("Essences", &labels.join(", ")));
    }

    if let Some(values) = active("valo") {
        let labels: Vec<&str> = values
            .iter()
            .map(|code| {
                ValoType::from_code(code)
                    .map(|v| v.label())
                    .unwrap_or(code.as_str())
            })
            .collect();
        html.push_str(&row("Valorisations", &labels.join(", ")));
    }

    if let Some(values) = active("ug") {
        let mut links = Vec::with_capacity(values.len());
        for value in values {
            let ug = store
                .get_management_unit(parse_id("ug", value)?)
                .context("get_management_unit()")?;
            links.push(link("ug", ug.id, &ug));
        }
        html.push_str(&row("UGs", &links.join(", ")));
    }

    if let Some(values) = active("parcelle") {
        let mut links = Vec::with_capacity(values.len());
        for value in values {
            let parcel = store
                .get_parcel(parse_id("parcelle", value)?)
                .context("get_parcel()")?;
            links.push(link("parcelle", parcel.id, &parcel));
        }
        html.push_str(&row("Parcelles", &links.join(", ")));
    }

    html.push_str("</table>\n");
    Ok(html)
}
