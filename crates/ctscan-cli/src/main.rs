mod output;
mod scan;

use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use ctscan_core::{AppConfig, LocationCoords};
use ctscan_gemini::GeminiClient;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ctscan")]
#[command(about = "Find CT-scan centers city by city")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a city CSV and print the cities that would be loaded
    Cities {
        /// CSV file with `city` and `population` columns
        #[arg(long)]
        file: PathBuf,
    },
    /// List every pincode of one city
    Pincodes {
        #[arg(long)]
        city: String,
    },
    /// Look up scan centers for one pincode
    Centers {
        #[arg(long)]
        pincode: String,
        #[arg(long)]
        city: String,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Run full discovery for the cities in a CSV file
    Scan(ScanArgs),
}

#[derive(Debug, Clone, Copy, Default, Args)]
struct LocationArgs {
    /// Latitude to bias center lookups toward (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Longitude to bias center lookups toward (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn coords(self) -> Option<LocationCoords> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(LocationCoords {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    /// Flags win over the configured location.
    fn or_configured(self, configured: Option<LocationCoords>) -> Option<LocationCoords> {
        self.coords().or(configured)
    }
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// CSV file with `city` and `population` columns
    #[arg(long)]
    file: PathBuf,
    /// Only scan these cities (repeatable); default is every city in the file
    #[arg(long = "city")]
    cities: Vec<String>,
    /// Scan at most this many cities, largest first
    #[arg(long)]
    limit: Option<usize>,
    /// Proceed to the center scan without asking
    #[arg(long)]
    yes: bool,
    #[command(flatten)]
    location: LocationArgs,
    /// Print the final city snapshots as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        // Reading a CSV needs no API key.
        Commands::Cities { file } => {
            init_tracing("info")?;
            show_cities(&file)?;
        }
        Commands::Pincodes { city } => {
            let config = configure()?;
            let client = GeminiClient::from_config(&config)?;
            let pincodes = client.find_pincodes(&city).await?;
            for pincode in pincodes {
                println!("{pincode}");
            }
        }
        Commands::Centers {
            pincode,
            city,
            location,
        } => {
            let config = configure()?;
            let client = GeminiClient::from_config(&config)?;
            let location = location.or_configured(config.location);
            if location.is_none() {
                tracing::warn!("no location given; results will not be location-biased");
            }
            let centers = client.find_scan_centers(&pincode, &city, location).await?;
            output::print_centers(&centers);
        }
        Commands::Scan(args) => {
            let config = configure()?;
            scan::run(&config, &args).await?;
        }
    }

    Ok(())
}

/// Load the environment config and start logging at its level.
fn configure() -> anyhow::Result<AppConfig> {
    let config = ctscan_core::load_app_config_from_env()?;
    init_tracing(&config.log_level)?;
    Ok(config)
}

fn show_cities(file: &Path) -> anyhow::Result<()> {
    let cities = ctscan_core::load_cities(file)?;
    output::print_cities(&cities);
    Ok(())
}

/// Logs go to stderr so stdout stays clean for results.
fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
