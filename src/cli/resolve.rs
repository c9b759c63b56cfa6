//! Resolve command handler
//!
//! Reads a GeoJSON Feature or FeatureCollection and prints climate
//! summaries as JSON on stdout.

use crate::cli::init_logging;
use crate::climate::{ClimateResolver, ClimateSummary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::TrailDocument;
use clap::Args;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

/// Resolve command arguments
#[derive(Args)]
pub struct ResolveArgs {
    /// GeoJSON file to read, or "-" for stdin
    pub file: Option<PathBuf>,

    /// Ignore input and resolve the current location by IP
    #[arg(long)]
    pub here: bool,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

/// Run the resolve command
pub async fn run(args: ResolveArgs) -> Result<()> {
    init_logging("warn");

    let config = Config::load()?;
    let resolver = ClimateResolver::new(&config)?;

    if args.here {
        let summary = resolver.resolve_without_geometry().await;
        return print_json(&summary, args.compact);
    }

    let input = read_input(args.file.as_ref())?;
    match TrailDocument::from_json(&input)? {
        TrailDocument::Feature(feature) => {
            let summary = resolver.resolve(&feature).await;
            print_json(&summary, args.compact)
        }
        TrailDocument::Collection(collection) => {
            let summaries: Vec<ClimateSummary> =
                resolver.resolve_collection(&collection.features).await;
            print_json(&summaries, args.compact)
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e))),
        _ => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", output);
    Ok(())
}
