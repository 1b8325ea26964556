//! # Weather Logger Entry Point
//!
//! Loads the configuration, sets up logging and the destinations, then either
//! runs one scrape cycle (`--once`) or loops until interrupted.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use weather_logger_lib::config::{self, Config, CsvConfig};
use weather_logger_lib::driver::Driver;
use weather_logger_lib::fetch::HttpSource;
use weather_logger_lib::recorder;
use weather_logger_lib::report::print_record;

/// Scrape BBC Weather and a tide table on a schedule and append the readings
/// to a CSV file and/or a Google Sheet.
#[derive(Debug, Clone, Parser)]
#[command(name = "weather-logger", version)]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "PATH", default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Do not print each record to stdout
    #[arg(short, long)]
    quiet: bool,

    /// Write CSV rows here instead of the configured path
    #[arg(long, value_name = "PATH", conflicts_with = "no_csv")]
    csv: Option<PathBuf>,

    /// Skip the CSV destination even if configured
    #[arg(long)]
    no_csv: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn setup_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("weather_logger={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let mut config = Config::load_from_path(&args.config);
    if let Some(path) = &args.csv {
        config.csv = Some(CsvConfig { path: path.clone() });
    }
    if args.no_csv {
        config.csv = None;
    }

    let source = HttpSource::new(&config.sources).context("failed to build HTTP client")?;
    let destinations = recorder::destinations(&config, source.client());
    if destinations.is_empty() {
        warn!("no destinations configured, records will only be printed");
    }
    for destination in &destinations {
        info!(%destination, "recording to");
    }

    let driver = Driver::new(source, &config, destinations).context("invalid configuration")?;
    let show = |record: &weather_logger_lib::Record| {
        if !args.quiet {
            print_record(record);
        }
    };

    if args.once {
        let record = driver
            .run_cycle(driver.now())
            .await
            .context("scrape cycle failed")?;
        show(&record);
        return Ok(());
    }

    info!(
        interval_secs = config.schedule.interval_secs,
        "starting weather logger"
    );
    tokio::select! {
        result = driver.run(show) => result.context("weather logger stopped")?,
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
    }
    Ok(())
}
