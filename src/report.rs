//! # Console Report
//!
//! Plain-text dump of a record for the terminal, one `Column: value` line per
//! field under a banner with the time of search.

use crate::layout::TIME_OF_SEARCH;
use crate::Record;
use std::fmt::Write;

const RULE: &str = "--------------------------";

/// Render `record` for stdout.
pub fn format_record(record: &Record) -> String {
    let mut out = String::new();
    if let Some(time) = record.get(TIME_OF_SEARCH) {
        let _ = writeln!(out, "{RULE}\n{time}\n{RULE}");
    }
    let _ = writeln!(out, "Weather data fetched:");
    for (name, value) in record.iter() {
        let _ = writeln!(out, "{name}: {value}");
    }
    out
}

/// Print `record` to stdout.
pub fn print_record(record: &Record) {
    println!("{}", format_record(record));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    #[test]
    fn test_format_record() {
        let record = Record::new(vec![
            (TIME_OF_SEARCH.to_string(), FieldValue::Text("2024-07-11 09:05".into())),
            ("High Temperature(°C)".to_string(), FieldValue::Float(21.0)),
            ("Sunset".to_string(), FieldValue::Unavailable),
        ]);

        assert_eq!(
            format_record(&record),
            "--------------------------\n\
             2024-07-11 09:05\n\
             --------------------------\n\
             Weather data fetched:\n\
             Time of Search: 2024-07-11 09:05\n\
             High Temperature(°C): 21.0\n\
             Sunset: N/A\n"
        );
    }
}
