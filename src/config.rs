//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! weather-config.toml file: which pages to read, how often, and where the
//! rows go.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_PATH: &str = "weather-config.toml";

/// Application configuration loaded from weather-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Pages to scrape
    pub sources: SourcesConfig,
    /// Loop timing
    pub schedule: ScheduleConfig,
    /// Local CSV destination
    pub csv: Option<CsvConfig>,
    /// Google Sheets destination
    pub sheet: Option<SheetConfig>,
}

/// Page locations and HTTP client settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// BBC Weather forecast page (London is 2643743)
    pub weather_url: String,
    /// BBC tide-table page for the port of interest
    pub tide_url: String,
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Driver loop timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Wait between cycles, after success and after failure alike
    pub interval_secs: u64,
    /// Stop after this many failed cycles in a row; retry forever when unset
    pub max_consecutive_failures: Option<u32>,
    /// IANA zone for Time of Search and the tide-table date
    pub timezone: String,
}

/// CSV file destination
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CsvConfig {
    pub path: PathBuf,
}

/// Google Sheets destination
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SheetConfig {
    /// The long id in the spreadsheet URL (`/spreadsheets/d/<id>/edit`)
    pub spreadsheet_id: String,
    /// Tab name
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    /// Service-account key file downloaded from the cloud console
    pub key_file: PathBuf,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_worksheet() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sources: SourcesConfig::default(),
            schedule: ScheduleConfig::default(),
            csv: Some(CsvConfig {
                path: PathBuf::from("bbc_weather.csv"),
            }),
            sheet: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            weather_url: "https://www.bbc.com/weather/2643743".to_string(),
            tide_url: "https://www.bbc.co.uk/weather/coast-and-sea/tide-tables/2/113".to_string(),
            user_agent: concat!("weather-logger/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_secs: 1800, // 30 minutes
            max_consecutive_failures: None,
            timezone: "Europe/London".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), "invalid config file format: {e}");
                    warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}
