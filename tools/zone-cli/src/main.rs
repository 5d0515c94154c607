use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zone_core::{
    geometry::{self, convert},
    units::Distance,
    Engine, EngineConfig, QuestionStore, RecomputeOutcome,
};
use zone_transit::StaticTransitProvider;

mod input;
mod output;

use input::{read_boundary, read_config, read_state, read_stations};
use output::{hiding_zone_features, write_collection};

#[derive(Parser, Debug)]
#[command(
    name = "zone-cli",
    author,
    version,
    about = "Resolve hide-and-seek questions into feasible regions and hiding zones",
    long_about = "Reads an ordered list of answered questions and a play-area boundary, \
                  folds every question into the region the hider can still be in, and \
                  writes it as GeoJSON.\n\n\
                  Landmarks, administrative zones, coastlines and stations are looked up \
                  through an Overpass endpoint unless supplied on the command line."
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON engine config (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hiding radius around each station, in miles
    #[arg(long, global = true)]
    hiding_radius: Option<f64>,

    /// Overpass interpreter URL
    #[arg(long, global = true)]
    overpass_url: Option<String>,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the feasible region
    Resolve {
        /// Question list, or a Feature with the boundary and `properties.questions`
        #[arg(short, long)]
        state: PathBuf,

        /// Boundary GeoJSON (overrides a boundary carried by the state)
        #[arg(short, long)]
        boundary: Option<PathBuf>,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Write the feasible polygons instead of the mask around them
        #[arg(long)]
        direct: bool,
    },

    /// Write the hiding zones that survive every question
    Zones {
        /// Question list, or a Feature with the boundary and `properties.questions`
        #[arg(short, long)]
        state: PathBuf,

        /// Boundary GeoJSON (overrides a boundary carried by the state)
        #[arg(short, long)]
        boundary: Option<PathBuf>,

        /// Station points GeoJSON (looked up from Overpass when omitted)
        #[arg(long)]
        stations: Option<PathBuf>,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = read_config(args.config.as_deref())?;
    if let Some(miles) = args.hiding_radius {
        if !(miles > 0.0) {
            bail!("Hiding radius must be positive, got {miles}");
        }
        config.hiding_radius = Distance::miles(miles);
    }
    if let Some(url) = &args.overpass_url {
        config.overpass_url = url.clone();
    }
    Ok(config)
}

fn load_store(state: &Path, boundary: Option<&Path>) -> Result<QuestionStore> {
    log::info!("State: {}", state.display());
    let state = read_state(state)?;
    log::info!("  {} questions", state.questions.len());

    let boundary = match boundary {
        Some(path) => {
            log::info!("Boundary: {}", path.display());
            read_boundary(path)?
        }
        None => match state.boundary {
            Some(boundary) => boundary,
            None => bail!("No boundary: pass --boundary or use a state Feature with a geometry"),
        },
    };

    Ok(QuestionStore::new(boundary, state.questions))
}

async fn recompute(engine: &Engine) -> Result<()> {
    match engine.recompute().await {
        RecomputeOutcome::Committed { generation, empty } => {
            log::info!("  Generation {generation} committed");
            if empty {
                log::warn!("  The questions leave no place to hide");
            }
            Ok(())
        }
        RecomputeOutcome::Superseded { generation, latest } => {
            bail!("Recomputation {generation} was superseded by {latest}")
        }
        RecomputeOutcome::Failed(err) => Err(err).context("Failed to resolve questions"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    log::info!("=== Zone Resolver ===");
    let config = load_config(&args)?;
    log::info!("Hiding radius: {:.0} m", config.hiding_radius_m().get());

    match &args.command {
        Command::Resolve {
            state,
            boundary,
            output,
            direct,
        } => {
            let store = load_store(state, boundary.as_deref())?;

            log::info!("");
            log::info!("Resolving questions...");
            // Zones are not needed here, so skip the station lookup.
            let engine = Engine::overpass(config, store)
                .context("Failed to set up the query gateway")?
                .with_transit(Arc::new(StaticTransitProvider::new()));
            recompute(&engine).await?;

            let state = engine.state().await;
            let Some(region) = state.region() else {
                bail!("Nothing was resolved");
            };

            let feature = if *direct {
                let polygons = region.direct_polygons().context("Failed to invert the mask")?;
                log::info!(
                    "  Feasible area: {:.2} km²",
                    geometry::area_sq_meters(&polygons) / 1_000_000.0
                );
                convert::region_feature(&polygons, "feasible")
            } else {
                convert::region_feature(region.polygons(), region.representation().to_string().as_str())
            };

            write_collection(convert::collection(vec![feature]), output)?;
            log::info!("Output written to: {}", output.display());
        }

        Command::Zones {
            state,
            boundary,
            stations,
            output,
        } => {
            let store = load_store(state, boundary.as_deref())?;
            let mut engine =
                Engine::overpass(config, store).context("Failed to set up the query gateway")?;
            if let Some(path) = stations {
                log::info!("Stations: {}", path.display());
                engine = engine.with_transit(Arc::new(read_stations(path)?));
            }

            log::info!("");
            log::info!("Resolving questions and eliminating hiding zones...");
            recompute(&engine).await?;

            let state = engine.state().await;
            log::info!("  {} hiding zones remain", state.candidates.len());
            for candidate in &state.candidates {
                log::debug!("    {}", candidate.name());
            }

            write_collection(convert::collection(hiding_zone_features(&state.candidates)), output)?;
            log::info!("Output written to: {}", output.display());
        }
    }

    log::info!("Done!");
    Ok(())
}
