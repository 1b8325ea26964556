//! # Driver Loop
//!
//! Runs the fetch → extract → record pipeline forever on a fixed interval.
//!
//! ```text
//!            ┌──────────── success: log ───────────┐
//!  cycle ────┤                                      ├──► sleep(interval) ──► cycle
//!            └──── failure: log, count failure ─────┘
//! ```
//!
//! The cycle clock is UTC converted into `schedule.timezone` (London unless
//! configured), since the tide page names its sections by UK date.
//!
//! A failed cycle is skipped, never partially retried. By default the loop never
//! gives up; `max_consecutive_failures` turns a permanently broken page or
//! credential into a clean exit instead of an endless stream of identical
//! errors.

use crate::config::{Config, ScheduleConfig, SourcesConfig};
use crate::extract::{ExtractError, FieldRule};
use crate::fetch::{FetchError, PageSource};
use crate::layout;
use crate::observation;
use crate::recorder::{Destination, RecordError};
use crate::xpath::PathError;
use crate::Record;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Display;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a single cycle was abandoned.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("recording failed: {0}")]
    Record(#[from] RecordError),
}

/// Why a driver could not be built from its configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("page layout: {0}")]
    Layout(#[from] PathError),

    #[error("unknown time zone `{0}`")]
    Timezone(String),
}

/// Why the loop stopped.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("giving up after {failures} consecutive failed cycles: {last}")]
    GaveUp {
        failures: u32,
        #[source]
        last: CycleError,
    },
}

/// The scrape-and-record pipeline plus its schedule.
pub struct Driver<S> {
    source: S,
    sources: SourcesConfig,
    schedule: ScheduleConfig,
    weather_rules: Vec<FieldRule>,
    destinations: Vec<Destination>,
    timezone: Tz,
}

impl<S: PageSource> Driver<S> {
    /// Compile the page layout, resolve the time zone and set up the pipeline.
    pub fn new(
        source: S,
        config: &Config,
        destinations: Vec<Destination>,
    ) -> Result<Self, SetupError> {
        let zone = &config.schedule.timezone;
        let timezone = zone
            .parse::<Tz>()
            .map_err(|_| SetupError::Timezone(zone.clone()))?;

        Ok(Driver {
            source,
            sources: config.sources.clone(),
            schedule: config.schedule.clone(),
            weather_rules: layout::weather_rules()?,
            destinations,
            timezone,
        })
    }

    /// `instant` on the configured clock.
    pub fn local_time(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.local_time(Utc::now())
    }

    /// Full column set of the records this driver produces.
    pub fn columns(&self) -> Vec<String> {
        observation::columns(&self.weather_rules)
    }

    /// Fetch both pages once, build the record for `now` and store it everywhere.
    ///
    /// Every destination is tried even if an earlier one fails; the first
    /// failure is returned.
    pub async fn run_cycle<Z>(&self, now: DateTime<Z>) -> Result<Record, CycleError>
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        let weather_html = self.source.fetch(&self.sources.weather_url).await?;
        let tide_html = self.source.fetch(&self.sources.tide_url).await?;

        let record =
            observation::build_record(&weather_html, &tide_html, &self.weather_rules, now)?;

        let missing = record.unavailable();
        if !missing.is_empty() {
            warn!(fields = ?missing, "fields not found on page");
        }

        let mut first_error = None;
        for destination in &self.destinations {
            if let Err(e) = destination.append(&record).await {
                error!(%destination, "append failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(record),
        }
    }

    /// Run cycles until the failure cap is hit (never, by default).
    ///
    /// `on_record` sees each successfully stored record.
    pub async fn run<F>(&self, mut on_record: F) -> Result<(), DriverError>
    where
        F: FnMut(&Record),
    {
        let mut failures = 0u32;
        loop {
            match self.run_cycle(self.now()).await {
                Ok(record) => {
                    failures = 0;
                    info!(
                        destinations = self.destinations.len(),
                        "weather data recorded"
                    );
                    on_record(&record);
                }
                Err(e) => {
                    failures += 1;
                    error!(failures, "cycle failed: {e}");
                    if let Some(max) = self.schedule.max_consecutive_failures {
                        if failures >= max {
                            return Err(DriverError::GaveUp { failures, last: e });
                        }
                    }
                    info!(
                        "retrying in {}s",
                        self.schedule.interval().as_secs()
                    );
                }
            }
            tokio::time::sleep(self.schedule.interval()).await;
        }
    }
}
