//! # BBC Weather Page Layout
//!
//! Selectors for the forecast page at `https://www.bbc.com/weather/<location>`.
//! They are brittle by nature: any markup change on the BBC side shows up as
//! `N/A` columns (node gone) or a failed cycle (node moved onto something that
//! is not a number).

use crate::extract::FieldRule;
use crate::xpath::PathError;

/// First column of every record.
pub const TIME_OF_SEARCH: &str = "Time of Search";

/// Format of the [`TIME_OF_SEARCH`] column.
pub const TIME_OF_SEARCH_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Today's summary panel (daily high/low).
const DAYLINK: &str = r#"//*[@id="daylink-0"]/div[4]"#;

/// The first hour of the hourly forecast strip.
const HOUR: &str = r#"//*[@id="wr-forecast"]/div[4]/div/div[1]/div[2]/div/div/div/div[2]/ol/li[1]/button"#;

/// Sun times and environmental levels below the strip.
const ENVIRONMENT: &str = r#"//*[@id="wr-forecast"]/div[4]/div/div[1]/div[4]/div/div[1]"#;

/// Rules for the weather columns, in record order.
///
/// # Example
/// ```
/// let rules = weather_logger_lib::layout::weather_rules().unwrap();
/// assert_eq!(rules[0].name, "High Temperature(°C)");
/// assert_eq!(rules.len(), 16);
/// ```
pub fn weather_rules() -> Result<Vec<FieldRule>, PathError> {
    Ok(vec![
        FieldRule::float(
            "High Temperature(°C)",
            &format!("{DAYLINK}/div[1]/div/div[4]/div/div[1]/span[2]/span/span[1]"),
            "°",
        )?,
        FieldRule::float(
            "Low Temperature(°C)",
            &format!("{DAYLINK}/div[1]/div/div[4]/div/div[2]/span[2]/span/span[1]"),
            "°",
        )?,
        FieldRule::float(
            "Current Temperature(°C)",
            &format!("{HOUR}/div[1]/div[2]/div[3]/div[2]/div/div/div[2]/span/span[1]"),
            "°",
        )?,
        FieldRule::text("Weather Condition", &format!("{HOUR}/div[2]/div/span"))?,
        FieldRule::text(
            "Wind Speed(mph)",
            &format!("{HOUR}/div[1]/div[2]/div[3]/div[4]/div/span[3]/span/span[1]"),
        )?,
        FieldRule::float("Humidity(%)", &format!("{HOUR}/div[2]/div/div/div[1]/dl/dd[1]"), "%")?,
        FieldRule::text("Pressure(mb)", &format!("{HOUR}/div[2]/div/div/div[1]/dl/dd[2]"))?
            .with_suffix(" mb"),
        FieldRule::text("Visibility", &format!("{HOUR}/div[2]/div/div/div[1]/dl/dd[3]"))?,
        FieldRule::text("Location", r#"//*[@id="wr-location-name-id"]"#)?,
        FieldRule::text("Wind Direction", &format!("{HOUR}/div[2]/div/div/div[4]"))?.deep(),
        FieldRule::level("UV Index", &format!("{ENVIRONMENT}/div[2]/span[2]/span[1]/span[2]"))?,
        FieldRule::level("Pollen", &format!("{ENVIRONMENT}/div[2]/span[1]/span[1]/span[2]"))?
            .deep(),
        FieldRule::level("Pollution", &format!("{ENVIRONMENT}/div[2]/span[3]/span[1]/span[2]"))?
            .deep(),
        FieldRule::float(
            "Chance of Precipitation(%)",
            &format!("{HOUR}/div[1]/div[2]/div[3]/div[3]/div[2]"),
            "%",
        )?,
        FieldRule::text("Sunset", &format!("{ENVIRONMENT}/div[1]/span[2]/span[2]"))?,
        FieldRule::text("Sunrise", &format!("{ENVIRONMENT}/div[1]/span[1]/span[2]"))?,
    ])
}
