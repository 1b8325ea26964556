//! # Recorders
//!
//! Where finished records go. Every configured [`Destination`] receives every
//! record, as a new last row.

use crate::config::Config;
use crate::csv_store::{CsvError, CsvStore};
use crate::sheets::{SheetError, SheetRecorder};
use crate::Record;
use std::fmt;
use thiserror::Error;

/// Errors raised by any destination.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// One place rows are written to.
#[derive(Clone, Debug)]
pub enum Destination {
    Csv(CsvStore),
    Sheet(SheetRecorder),
}

impl Destination {
    /// Append `record` as the newest row.
    pub async fn append(&self, record: &Record) -> Result<(), RecordError> {
        match self {
            Destination::Csv(store) => store.append(record)?,
            Destination::Sheet(sheet) => sheet.append(record).await?,
        }
        Ok(())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Csv(store) => write!(f, "csv:{}", store.path().display()),
            Destination::Sheet(sheet) => write!(
                f,
                "sheet:{}/{}",
                sheet.config().spreadsheet_id,
                sheet.config().worksheet
            ),
        }
    }
}

/// Build the destinations named in `config`. The sheet recorder shares `client`.
pub fn destinations(config: &Config, client: &reqwest::Client) -> Vec<Destination> {
    let mut out = Vec::new();
    if let Some(csv) = &config.csv {
        out.push(Destination::Csv(CsvStore::new(&csv.path)));
    }
    if let Some(sheet) = &config.sheet {
        out.push(Destination::Sheet(SheetRecorder::new(
            client.clone(),
            sheet.clone(),
        )));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetConfig;
    use std::path::PathBuf;

    #[test]
    fn test_destinations_follow_config() {
        let client = reqwest::Client::new();

        let config = Config::default();
        let dests = destinations(&config, &client);
        assert_eq!(dests.len(), 1);
        assert_eq!(dests[0].to_string(), "csv:bbc_weather.csv");

        let config = Config {
            csv: None,
            sheet: Some(SheetConfig {
                spreadsheet_id: "abc".to_string(),
                worksheet: "Sheet1".to_string(),
                key_file: PathBuf::from("key.json"),
                api_base: "https://sheets.googleapis.com".to_string(),
            }),
            ..Config::default()
        };
        let dests = destinations(&config, &client);
        assert_eq!(dests.len(), 1);
        assert_eq!(dests[0].to_string(), "sheet:abc/Sheet1");
    }
}
