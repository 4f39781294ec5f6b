//! `clear-telemetry`: retention sweep for recorded sessions and events.
//!
//! ```text
//! clear-telemetry [--before YYYY-MM-DD] [--dry-run]
//! ```

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clearsight::config::GatewayConfig;
use clearsight::service::SessionService;
use clearsight::store::{self, RetentionFilter};

/// Delete recorded sessions and events.
#[derive(Debug, Parser)]
#[command(name = "clear-telemetry", version, about)]
struct Args {
    /// Delete only data recorded before this date (YYYY-MM-DD, UTC).
    #[arg(long)]
    before: Option<String>,

    /// Report what would be deleted without deleting anything.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let filter = match args.before.as_deref() {
        Some(raw) => RetentionFilter::before(parse_cutoff(raw)?),
        None => RetentionFilter::all(),
    };

    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to load configuration")?;
    if !config.persistence_enabled {
        bail!("PERSISTENCE_ENABLED is false; there is no stored telemetry to clear");
    }

    let store = store::connect(&config)
        .await
        .context("failed to connect to the database")?;
    let report = SessionService::new(store)
        .purge(filter, args.dry_run)
        .await
        .context("purge failed")?;

    if report.dry_run {
        println!(
            "Would delete {} sessions and {} events",
            report.sessions, report.events
        );
    } else {
        println!(
            "Successfully deleted {} sessions and {} events",
            report.sessions, report.events
        );
    }
    Ok(())
}

/// Midnight UTC at the start of `raw`.
fn parse_cutoff(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
        bail!("Invalid date format. Use YYYY-MM-DD");
    };
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .context("Invalid date format. Use YYYY-MM-DD")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn cutoff_is_utc_midnight() {
        let Ok(cutoff) = parse_cutoff("2024-03-05") else {
            panic!("valid date rejected");
        };
        assert_eq!((cutoff.year(), cutoff.month(), cutoff.day()), (2024, 3, 5));
        assert_eq!((cutoff.hour(), cutoff.minute(), cutoff.second()), (0, 0, 0));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for raw in ["05/03/2024", "2024-13-01", "yesterday", ""] {
            let err = parse_cutoff(raw).err().map(|e| e.to_string());
            assert_eq!(err.as_deref(), Some("Invalid date format. Use YYYY-MM-DD"));
        }
    }

    #[test]
    fn flags_parse() {
        let parsed =
            Args::try_parse_from(["clear-telemetry", "--before", "2024-01-01", "--dry-run"]);
        let Ok(args) = parsed else {
            panic!("valid flags rejected");
        };
        assert_eq!(args.before.as_deref(), Some("2024-01-01"));
        assert!(args.dry_run);
    }
}
