//! # Tide Table
//!
//! Reads today's four tides from the BBC coast-and-sea tide-table page.
//!
//! The page holds one section per day, `id="section-YYYY-MM-DD"`, each with a
//! four-row table:
//!
//! ```html
//! <section id="section-2024-07-11">
//!   <table><tbody>
//!     <tr><td><span>03:12</span></td><td>0.9</td></tr>  <!-- low, morning -->
//!     <tr><td><span>09:40</span></td><td>6.1</td></tr>  <!-- high, morning -->
//!     <tr><td><span>15:31</span></td><td>1.0</td></tr>  <!-- low, evening -->
//!     <tr><td><span>21:58</span></td><td>6.3</td></tr>  <!-- high, evening -->
//!   </tbody></table>
//! </section>
//! ```
//!
//! The section id depends on the date, so the rules are built per cycle from the
//! cycle's own clock rather than once at start-up.

use crate::extract::{extract_field, ExtractError, FieldRule};
use crate::xpath::PathError;
use crate::FieldValue;
use chrono::NaiveDate;
use scraper::Html;

/// Times and heights for one kind of tide.
#[derive(Clone, Debug, PartialEq)]
pub struct TideEntry {
    pub morning_time: FieldValue,
    pub morning_height: FieldValue,
    pub evening_time: FieldValue,
    pub evening_height: FieldValue,
}

/// Today's low and high tides.
#[derive(Clone, Debug, PartialEq)]
pub struct TideTable {
    pub low: TideEntry,
    pub high: TideEntry,
}

/// Table row holding each slot.
const LOW_MORNING: usize = 1;
const HIGH_MORNING: usize = 2;
const LOW_EVENING: usize = 3;
const HIGH_EVENING: usize = 4;

/// Column names, in record order.
pub const COLUMNS: [&str; 8] = [
    "Low Tide Morning Time",
    "Low Tide Morning Height(M)",
    "High Tide Morning Time",
    "High Tide Morning Height(M)",
    "Low Tide Evening Time",
    "Low Tide Evening Height(M)",
    "High Tide Evening Time",
    "High Tide Evening Height(M)",
];

fn time_rule(date: NaiveDate, row: usize) -> Result<FieldRule, PathError> {
    FieldRule::text(
        "time",
        &format!(r#"//*[@id="section-{date}"]/table/tbody/tr[{row}]/td[1]/span"#),
    )
}

fn height_rule(date: NaiveDate, row: usize) -> Result<FieldRule, PathError> {
    FieldRule::text(
        "height",
        &format!(r#"//*[@id="section-{date}"]/table/tbody/tr[{row}]/td[2]"#),
    )
}

fn slot(doc: &Html, date: NaiveDate, row: usize) -> Result<(FieldValue, FieldValue), ExtractError> {
    let time = extract_field(doc, &time_rule(date, row)?)?;
    let height = extract_field(doc, &height_rule(date, row)?)?;
    Ok((time, height))
}

impl TideTable {
    /// Read the table for `date`. Missing slots become `N/A`.
    pub fn parse(doc: &Html, date: NaiveDate) -> Result<Self, ExtractError> {
        let (low_morning_time, low_morning_height) = slot(doc, date, LOW_MORNING)?;
        let (high_morning_time, high_morning_height) = slot(doc, date, HIGH_MORNING)?;
        let (low_evening_time, low_evening_height) = slot(doc, date, LOW_EVENING)?;
        let (high_evening_time, high_evening_height) = slot(doc, date, HIGH_EVENING)?;

        Ok(TideTable {
            low: TideEntry {
                morning_time: low_morning_time,
                morning_height: low_morning_height,
                evening_time: low_evening_time,
                evening_height: low_evening_height,
            },
            high: TideEntry {
                morning_time: high_morning_time,
                morning_height: high_morning_height,
                evening_time: high_evening_time,
                evening_height: high_evening_height,
            },
        })
    }

    /// Flatten into `(column, value)` pairs matching [`COLUMNS`].
    pub fn into_fields(self) -> Vec<(String, FieldValue)> {
        let values = [
            self.low.morning_time,
            self.low.morning_height,
            self.high.morning_time,
            self.high.morning_height,
            self.low.evening_time,
            self.low.evening_height,
            self.high.evening_time,
            self.high.evening_height,
        ];
        COLUMNS
            .iter()
            .map(|name| name.to_string())
            .zip(values)
            .collect()
    }
}
