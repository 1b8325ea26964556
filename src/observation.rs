//! # Observation Assembly
//!
//! Combines the two fetched pages and the cycle's clock into one [`Record`]:
//! time of search, then the weather columns, then the tide columns.

use crate::extract::{extract, ExtractError, FieldRule};
use crate::layout::{TIME_OF_SEARCH, TIME_OF_SEARCH_FORMAT};
use crate::tide::{self, TideTable};
use crate::{FieldValue, Record};
use chrono::{DateTime, TimeZone};
use scraper::Html;
use std::fmt::Display;

/// Build the record for one cycle.
///
/// `now` drives both the Time of Search column and the tide section lookup, so
/// it must be taken fresh for every cycle.
pub fn build_record<Tz>(
    weather_html: &str,
    tide_html: &str,
    weather_rules: &[FieldRule],
    now: DateTime<Tz>,
) -> Result<Record, ExtractError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let weather = extract(&Html::parse_document(weather_html), weather_rules)?;
    let tides = TideTable::parse(&Html::parse_document(tide_html), now.date_naive())?;

    let mut fields = Vec::with_capacity(1 + weather.len() + tide::COLUMNS.len());
    fields.push((
        TIME_OF_SEARCH.to_string(),
        FieldValue::Text(now.format(TIME_OF_SEARCH_FORMAT).to_string()),
    ));
    fields.extend(weather.into_fields());
    fields.extend(tides.into_fields());

    Ok(Record::new(fields))
}

/// The full column set a record built from `weather_rules` will have.
pub fn columns(weather_rules: &[FieldRule]) -> Vec<String> {
    std::iter::once(TIME_OF_SEARCH.to_string())
        .chain(weather_rules.iter().map(|rule| rule.name.clone()))
        .chain(tide::COLUMNS.iter().map(|name| name.to_string()))
        .collect()
}
