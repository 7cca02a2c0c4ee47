#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for resolving Taiwanese addresses and converting coordinates.
//!
//! ```text
//! coord_map resolve "新北市新店區北宜路二段100號" [--parallel] [--json]
//! coord_map variants "台北101"
//! coord_map parse "台北市大安區和平東路三段15巷7弄3號"
//! coord_map convert 121.5654 25.0330 --from wgs84 --to bd09
//! coord_map distance 121.5654 25.0330 121.5170 25.0478
//! coord_map locate --lat 25.0330 --lng 121.5654 --accuracy 15 --reverse
//! coord_map services
//! ```
//!
//! Set `RUST_LOG=debug` to see every provider query.

mod options;

use clap::{Parser, Subcommand};
use coord_map_address::DEFAULT_MAX_VARIANTS;
use coord_map_geocoder::CancelToken;
use coord_map_geocoder::service_registry::{all_services, enabled_services};
use coord_map_geocoder_models::{Resolution, ResolveOutcome, ResolverConfig};
use coord_map_transform::format::{Axis, format_coordinate, format_distance, to_degree_minute_second};
use coord_map_transform::system::{CoordinateSystem, convert};
use coord_map_transform::{
    Coordinate, haversine_distance_meters, is_in_offset_region, is_valid_coordinate, wgs84_to_bd09,
};
use serde::Serialize;

use crate::options::ResolveOptions;

#[derive(Parser)]
#[command(
    name = "coord_map",
    about = "Resolve Taiwanese addresses and convert between WGS84, GCJ02 and BD09"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an address to WGS84 and BD09 coordinates
    Resolve {
        /// Free-text address
        address: String,
        #[command(flatten)]
        options: ResolveOptions,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the query variants generated for an address
    Variants {
        /// Free-text address
        address: String,
        /// Maximum number of variants
        #[arg(long, default_value_t = DEFAULT_MAX_VARIANTS)]
        max: usize,
    },
    /// Show the parsed structure of an address as JSON
    Parse {
        /// Free-text address
        address: String,
    },
    /// Convert a coordinate between reference systems
    Convert {
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Source system (wgs84, gcj02, bd09)
        #[arg(long, default_value = "wgs84", value_parser = options::parse_system)]
        from: CoordinateSystem,
        /// Target system (wgs84, gcj02, bd09)
        #[arg(long, default_value = "bd09", value_parser = options::parse_system)]
        to: CoordinateSystem,
        /// Also print degrees, minutes and seconds
        #[arg(long)]
        dms: bool,
    },
    /// Great-circle distance between two WGS84 points
    Distance {
        #[arg(allow_negative_numbers = true)]
        lng1: f64,
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lng2: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
    },
    /// Express a device location in both systems
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Reported accuracy radius in meters
        #[arg(long)]
        accuracy: Option<f64>,
        /// Look up a display address for the location via Nominatim
        #[arg(long)]
        reverse: bool,
    },
    /// List the geocoding services compiled into this binary
    Services,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateReport {
    wgs84: Coordinate,
    bd09: Coordinate,
    accuracy_meters: Option<f64>,
    in_offset_region: bool,
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            address,
            options,
            json,
        } => {
            let config = options.into_config()?;
            let cancel = CancelToken::new();

            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, canceling resolution");
                    on_interrupt.cancel();
                }
            });

            let outcome = coord_map_geocoder::resolve_address(&address, &config, &cancel).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }

            if matches!(outcome, ResolveOutcome::NotFound { .. }) {
                std::process::exit(1);
            }
        }
        Commands::Variants { address, max } => {
            let set = coord_map_address::generate(&address, max);
            for (rank, variant) in set.variants.iter().enumerate() {
                println!("{rank:>2}  {variant}");
            }
            if let Some(entity) = &set.entity {
                println!(
                    "\nRecognized {} {} (confidence {:.2})",
                    entity.kind,
                    entity.key.as_deref().unwrap_or("(generic)"),
                    entity.confidence
                );
            }
        }
        Commands::Parse { address } => {
            let structure = coord_map_address::parse(&address);
            println!("{}", serde_json::to_string_pretty(&structure)?);
        }
        Commands::Convert {
            lng,
            lat,
            from,
            to,
            dms,
        } => {
            require_valid(lng, lat)?;
            let out = convert(Coordinate::new(lng, lat), from, to);
            println!(
                "{to}: {}, {}",
                format_coordinate(out.longitude, 6),
                format_coordinate(out.latitude, 6)
            );
            if dms {
                println!(
                    "{} {}",
                    to_degree_minute_second(out.latitude, Axis::Latitude),
                    to_degree_minute_second(out.longitude, Axis::Longitude)
                );
            }
        }
        Commands::Distance {
            lng1,
            lat1,
            lng2,
            lat2,
        } => {
            require_valid(lng1, lat1)?;
            require_valid(lng2, lat2)?;
            let meters = haversine_distance_meters(lng1, lat1, lng2, lat2);
            println!("{} ({meters:.1} m)", format_distance(meters));
        }
        Commands::Locate {
            lat,
            lng,
            accuracy,
            reverse,
        } => {
            require_valid(lng, lat)?;
            let address = if reverse {
                reverse_lookup(lat, lng).await?
            } else {
                None
            };

            let report = LocateReport {
                wgs84: Coordinate::new(lng, lat),
                bd09: wgs84_to_bd09(lng, lat),
                accuracy_meters: accuracy,
                in_offset_region: is_in_offset_region(lng, lat),
                address,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Services => {
            let enabled: Vec<String> = enabled_services().into_iter().map(|s| s.id).collect();

            println!("{:<14} {:<9} {:<8} BASE URL", "ID", "PRIORITY", "ENABLED");
            println!("{}", "-".repeat(72));
            for svc in all_services() {
                println!(
                    "{:<14} {:<9} {:<8} {}",
                    svc.id,
                    svc.priority,
                    if enabled.contains(&svc.id) { "yes" } else { "no" },
                    svc.base_url()
                );
            }
        }
    }

    Ok(())
}

fn require_valid(lng: f64, lat: f64) -> Result<(), Box<dyn std::error::Error>> {
    if is_valid_coordinate(lng, lat) {
        Ok(())
    } else {
        Err(format!("Invalid coordinate: longitude {lng}, latitude {lat}").into())
    }
}

async fn reverse_lookup(lat: f64, lng: f64) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .user_agent(ResolverConfig::default().user_agent)
        .build()?;
    let nominatim = all_services()
        .iter()
        .find_map(|s| s.nominatim(&client))
        .ok_or("No Nominatim service is configured")?;
    Ok(nominatim.reverse(lat, lng).await?)
}

fn print_outcome(outcome: &ResolveOutcome) {
    match outcome {
        ResolveOutcome::Found(resolution) => print_resolution("Found", resolution),
        ResolveOutcome::Estimated(resolution) => print_resolution("Estimated", resolution),
        ResolveOutcome::NotFound { suggestions } => {
            println!("No match.");
            if !suggestions.is_empty() {
                println!("Try: {}", suggestions.join(" / "));
            }
        }
        ResolveOutcome::Canceled => println!("Canceled."),
    }
}

fn print_resolution(label: &str, r: &Resolution) {
    println!(
        "{label}: {} (via {}, confidence {:.2}, {} precision)",
        r.display_address, r.source, r.confidence, r.precision
    );
    println!(
        "  WGS84 {}, {}",
        format_coordinate(r.wgs84.latitude, 6),
        format_coordinate(r.wgs84.longitude, 6)
    );
    println!(
        "  BD09  {}, {}",
        format_coordinate(r.bd09.latitude, 6),
        format_coordinate(r.bd09.longitude, 6)
    );
}
