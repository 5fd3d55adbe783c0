use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use nearcare::api::DEFAULT_FACILITY_CATEGORY;
use nearcare::config::{DEFAULT_LOCATION, FileConfig};
use nearcare::{
    FacilitySearch, NominatimClient, OverpassClient, SearchOutcome, SearchRequest, SearchState,
};

/// Find hospitals near a city or ZIP code using OpenStreetMap data
///
/// Examples:
///   # Hospitals within 50 km of New York
///   nearcare
///
///   # Search around a ZIP code with a smaller radius
///   nearcare 02115 -r 10000
///
///   # Clinics instead of hospitals, as JSON
///   nearcare "Lyon, France" --category clinic --json
#[derive(Parser, Debug)]
#[command(name = "nearcare")]
#[command(version, about, long_about = None)]
struct Args {
    /// City name or ZIP code (defaults to "New York")
    #[arg(value_name = "LOCATION")]
    location: Option<String>,

    /// Path to config file (optional, auto-searches nearcare.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search radius in meters
    #[arg(short = 'r', long)]
    radius: Option<u32>,

    /// OSM amenity value to search for (hospital, clinic, doctors, ...)
    #[arg(long)]
    category: Option<String>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = match args.config {
        Some(ref config_path) => FileConfig::from_path(config_path)?,
        None => FileConfig::load().unwrap_or_default(),
    };

    let verbose = args.verbose || file_config.verbose;
    init_tracing(verbose);

    let json = args.json || file_config.json;
    let location = args
        .location
        .clone()
        .or_else(|| file_config.location.clone())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let radius = args.radius.unwrap_or(file_config.radius);
    let category = args
        .category
        .clone()
        .unwrap_or_else(|| file_config.category.clone());

    tracing::debug!(api = ?file_config.api, %location, radius, %category, "configuration");

    let geocoder =
        NominatimClient::new(&file_config.api).context("Failed to create geocoding client")?;
    let facilities =
        OverpassClient::new(&file_config.api).context("Failed to create Overpass client")?;

    let request = SearchRequest::new(location.as_str())
        .with_radius(radius)
        .with_category(category.as_str());

    let total_start = Instant::now();
    let mut progress = StageProgress::new(json);
    let state = FacilitySearch::new(&geocoder, &facilities)
        .run_with(&request, |state| progress.enter(state, &request));

    match state {
        SearchState::Done(outcome) => {
            if json {
                let rendered = serde_json::to_string_pretty(&outcome)
                    .context("Failed to serialize search result")?;
                println!("{}", rendered);
            } else {
                print_outcome(&outcome, &request);
                println!();
                println!(
                    "Done! Total time: {:.1}s",
                    total_start.elapsed().as_secs_f32()
                );
            }
            Ok(())
        }
        SearchState::Failed(err) => bail!("{}", err),
        other => bail!("Search stopped in non-terminal state {:?}", other),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "nearcare=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// One spinner per pipeline stage, finished with a timing when the next stage starts
struct StageProgress {
    hidden: bool,
    spinner: Option<ProgressBar>,
    started: Instant,
}

impl StageProgress {
    fn new(hidden: bool) -> Self {
        Self {
            hidden,
            spinner: None,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, state: &SearchState, request: &SearchRequest) {
        match state {
            SearchState::Idle => {}
            SearchState::Geocoding => {
                self.start(format!("Geocoding \"{}\"...", request.location.trim()));
            }
            SearchState::Querying => {
                self.finish("Location resolved");
                self.start(format!(
                    "Searching for {} within {}m...",
                    category_label(&request.category),
                    request.radius_meters
                ));
            }
            SearchState::Normalizing => {
                self.finish("Facility data received");
                self.start("Normalizing results...".to_string());
            }
            SearchState::Done(outcome) => {
                self.finish(&format!("Found {} results", outcome.facilities.len()));
            }
            SearchState::Failed(_) => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.abandon_with_message("Failed");
                }
            }
        }
    }

    fn start(&mut self, message: String) {
        self.spinner = Some(if self.hidden {
            ProgressBar::hidden()
        } else {
            create_spinner(&message)
        });
        self.started = Instant::now();
    }

    fn finish(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!(
                "{} [{:.1}s]",
                message,
                self.started.elapsed().as_secs_f32()
            ));
        }
    }
}

fn category_label(category: &str) -> String {
    if category == DEFAULT_FACILITY_CATEGORY {
        "hospitals".to_string()
    } else {
        format!("\"{}\" facilities", category)
    }
}

fn print_outcome(outcome: &SearchOutcome, request: &SearchRequest) {
    println!();
    println!(
        "Your location: ({:.4}, {:.4})",
        outcome.origin.latitude, outcome.origin.longitude
    );
    println!();

    if outcome.is_empty() {
        println!(
            "No {} found within a {}km radius.",
            category_label(&request.category),
            request.radius_meters as f64 / 1000.0
        );
        return;
    }

    let name_width = outcome
        .facilities
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    println!(
        "{:<name_width$}  {:>10}  {:>11}  {:>9}",
        "Name", "Latitude", "Longitude", "Distance"
    );
    println!("{}", "-".repeat(name_width + 2 + 10 + 2 + 11 + 2 + 9));

    for facility in &outcome.facilities {
        let km = outcome.origin.distance_to(&facility.location) / 1000.0;
        println!(
            "{:<name_width$}  {:>10.5}  {:>11.5}  {:>6.1} km",
            facility.name, facility.location.latitude, facility.location.longitude, km
        );
    }

    println!();
    println!(
        "{} {} listed",
        outcome.facilities.len(),
        category_label(&request.category)
    );
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
