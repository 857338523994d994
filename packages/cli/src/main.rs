#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for resolving addresses against an OSM `PostGIS` dataset.
//!
//! ```text
//! osm_geocoder_cli [--config geocoder.toml] forward "Main St 5, Springfield" [--center 52.5,13.4]
//! osm_geocoder_cli [--config geocoder.toml] reverse 52.5163 13.3777 [--limit 10]
//! ```
//!
//! Set `RUST_LOG=osm_geocoder=debug` to see strategy choice and radius
//! escalation.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use osm_geocoder::config::GeocoderConfig;
use osm_geocoder::deadline::Deadline;
use osm_geocoder::{GeocodeError, Geocoder, GeographicPoint};

#[derive(Parser)]
#[command(
    name = "osm_geocoder_cli",
    about = "Forward and reverse geocoding over OpenStreetMap buildings"
)]
struct Cli {
    /// Path to the geocoder TOML configuration
    #[arg(long, default_value = "geocoder.toml")]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a free-text address to coordinates
    Forward {
        /// Address text
        query: String,
        /// ISO country code (accepted, not used for filtering)
        #[arg(long)]
        country: Option<String>,
        /// Rank results by distance to this point, as `lat,lon`
        #[arg(long, value_parser = parse_center)]
        center: Option<GeographicPoint>,
        /// Request timeout in seconds, overriding the configuration
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Resolve a coordinate to the nearest building address
    Reverse {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Maximum grouped matches fetched per radius
        #[arg(long)]
        limit: Option<u32>,
        /// Request timeout in seconds, overriding the configuration
        #[arg(long)]
        timeout: Option<f64>,
    },
}

fn parse_center(value: &str) -> Result<GeographicPoint, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lon`, got '{value}'"))?;

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {lat},{lon}"));
    }

    Ok(GeographicPoint::new(lat, lon))
}

fn deadline_for(geocoder: &Geocoder, timeout: Option<f64>) -> Result<Deadline, String> {
    match timeout {
        None => Ok(geocoder.default_deadline()),
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Deadline::after)
            .map_err(|e| format!("invalid timeout {secs}: {e}")),
    }
}

/// Process exit status for a failed command: `2` when the request ran out
/// of time, `1` for anything else.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<GeocodeError>() {
        Some(GeocodeError::DeadlineExceeded(_)) => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GeocoderConfig::load(&cli.config)?;
    let geocoder = Geocoder::connect(&config).await?;

    match cli.command {
        Commands::Forward {
            query,
            country,
            center,
            timeout,
        } => {
            let deadline = deadline_for(&geocoder, timeout)?;
            let results = geocoder
                .forward_within(&query, country.as_deref(), center, deadline)
                .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No matches.");
            } else {
                for result in &results {
                    println!(
                        "{:>11.6} {:>11.6}  {}",
                        result.location.lat, result.location.lon, result.display_name
                    );
                }
            }
        }
        Commands::Reverse {
            lat,
            lon,
            limit,
            timeout,
        } => {
            let deadline = deadline_for(&geocoder, timeout)?;
            let limit = limit.unwrap_or(geocoder.settings().reverse_limit);
            let hit = geocoder.reverse_within(lat, lon, limit, deadline).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hit)?);
            } else if let Some(hit) = hit {
                println!("{:.1}m  {}", hit.distance, hit.display_name);
            } else {
                println!("No building nearby.");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(exit_code(e.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use osm_geocoder::config::ConfigError;
    use osm_geocoder::deadline::DeadlineExceeded;

    use super::*;

    #[test]
    fn parses_center() {
        let center = parse_center("52.5, 13.4").unwrap();
        assert!((center.lat - 52.5).abs() < f64::EPSILON);
        assert!((center.lon - 13.4).abs() < f64::EPSILON);

        let center = parse_center("-33.86,151.2").unwrap();
        assert!((center.lat + 33.86).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_center() {
        assert!(parse_center("52.5").is_err());
        assert!(parse_center("north,13.4").is_err());
        assert!(parse_center("95.0,13.4").is_err());
        assert!(parse_center("52.5,181").is_err());
    }

    #[test]
    fn cli_parses_forward_command() {
        let cli = Cli::try_parse_from([
            "osm_geocoder_cli",
            "forward",
            "Main St 5",
            "--center",
            "52.5,13.4",
            "--timeout",
            "2.5",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("geocoder.toml"));
        let Commands::Forward {
            query,
            center,
            timeout,
            country,
        } = cli.command
        else {
            panic!("expected forward command");
        };
        assert_eq!(query, "Main St 5");
        assert!(center.is_some());
        assert_eq!(timeout, Some(2.5));
        assert!(country.is_none());
    }

    #[test]
    fn cli_parses_negative_reverse_coordinates() {
        let cli = Cli::try_parse_from([
            "osm_geocoder_cli",
            "--config",
            "other.toml",
            "reverse",
            "-33.86",
            "151.2",
            "--limit",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("other.toml"));
        let Commands::Reverse {
            lat,
            lon,
            limit,
            timeout,
        } = cli.command
        else {
            panic!("expected reverse command");
        };
        assert!((lat + 33.86).abs() < f64::EPSILON);
        assert!((lon - 151.2).abs() < f64::EPSILON);
        assert_eq!(limit, Some(3));
        assert!(timeout.is_none());
    }

    #[test]
    fn deadline_errors_exit_alike_for_both_commands() {
        let timed_out: Box<dyn std::error::Error> =
            Box::new(GeocodeError::DeadlineExceeded(DeadlineExceeded));
        assert_eq!(exit_code(timed_out.as_ref()), 2);

        let bad_config: Box<dyn std::error::Error> =
            Box::new(GeocodeError::Config(ConfigError::Value {
                message: "database.pool_size must be at least 1".to_string(),
            }));
        assert_eq!(exit_code(bad_config.as_ref()), 1);

        let other: Box<dyn std::error::Error> = "invalid timeout".into();
        assert_eq!(exit_code(other.as_ref()), 1);
    }
}
