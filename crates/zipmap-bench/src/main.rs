//! zipmap-bench: CLI tool for budget search experimentation and diagnostics.
//!
//! Loads route segments from a JSON file, runs the budget search with
//! configurable parameters, and prints per-iteration diagnostics
//! followed by the resulting path specs. Useful for:
//!
//! - Comparing merge strategies (`single-pass` vs `fixpoint`)
//! - Tuning the initial threshold, step and character budget
//! - Checking how close a dataset comes to the static map URL limit
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin zipmap-bench -- [OPTIONS] <PATHS_JSON>
//! ```
//!
//! The input is a JSON array of paths:
//!
//! ```text
//! [{"id": "polyline1", "coordinates": [{"lat": 38.5, "lng": -120.2}, ...]}, ...]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zipmap_export::StaticMapRequest;
use zipmap_pipeline::{ChunkLayout, MergeStrategy, Path, PathStyle, SearchConfig};

/// Budget search parameter experimentation and diagnostics for zipmap.
///
/// Runs the simplify/merge/encode search over the given paths and
/// prints per-iteration counts and the final path specs.
#[derive(Parser)]
#[command(name = "zipmap-bench", version)]
struct Cli {
    /// Path to a JSON file containing an array of paths.
    paths_json: PathBuf,

    /// Simplification threshold of the first iteration, in meters.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_INITIAL_THRESHOLD_M)]
    initial_threshold: f64,

    /// Threshold increase per iteration, in meters.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_THRESHOLD_STEP_M)]
    threshold_step: f64,

    /// Character budget across all path specs.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_MAX_CHARACTERS)]
    max_characters: usize,

    /// Iteration cap before giving up.
    #[arg(long, default_value_t = SearchConfig::DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// Path merging strategy.
    #[arg(long, value_enum, default_value_t = Merge::SinglePass)]
    merge: Merge,

    /// Encoded value layout.
    #[arg(long, value_enum, default_value_t = Layout::Compact)]
    layout: Layout,

    /// Stroke weight in pixels.
    #[arg(long, default_value_t = PathStyle::DEFAULT_WEIGHT)]
    weight: u32,

    /// Stroke color.
    #[arg(long, default_value = PathStyle::DEFAULT_COLOR)]
    color: String,

    /// Fill color.
    #[arg(long, default_value = PathStyle::DEFAULT_FILL_COLOR)]
    fill_color: String,

    /// Full search config as a JSON string.
    ///
    /// When provided, all other search parameter flags are ignored.
    /// The JSON must be a valid `SearchConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Also print the static map URL for the resulting path specs.
    #[arg(long)]
    url: bool,

    /// Log every search iteration to stderr.
    #[arg(long, short)]
    verbose: bool,
}

/// Path merging strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Merge {
    /// One pass in identifier order.
    SinglePass,
    /// Repeat passes until nothing merges.
    Fixpoint,
}

/// Encoded value layout selection.
#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// Standard variable-length values.
    Compact,
    /// Every value padded to six characters.
    FixedWidth,
}

/// Build a [`SearchConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<SearchConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(SearchConfig {
        initial_threshold_m: cli.initial_threshold,
        threshold_step_m: cli.threshold_step,
        max_characters: cli.max_characters,
        max_iterations: cli.max_iterations,
        merge_strategy: match cli.merge {
            Merge::SinglePass => MergeStrategy::SinglePass,
            Merge::Fixpoint => MergeStrategy::Fixpoint,
        },
        chunk_layout: match cli.layout {
            Layout::Compact => ChunkLayout::Compact,
            Layout::FixedWidth => ChunkLayout::FixedWidth,
        },
        style: PathStyle {
            weight: cli.weight,
            color: cli.color.clone(),
            fill_color: cli.fill_color.clone(),
        },
    })
}

/// Install a stderr subscriber honouring `RUST_LOG`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_paths(file: &std::path::Path) -> Result<Vec<Path>, String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Error reading {}: {e}", file.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", file.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let paths = match load_paths(&cli.paths_json) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Paths: {} ({} points)",
        paths.len(),
        paths.iter().map(Path::len).sum::<usize>(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!();
    debug!(file = %cli.paths_json.display(), "loaded paths");

    let (specs, diagnostics) =
        match zipmap_pipeline::find_fitting_pathspecs_with_diagnostics(&paths, &config) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Search error: {e}");
                return ExitCode::FAILURE;
            }
        };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
        println!();
        for spec in &specs {
            println!("{spec}");
        }
    }

    if cli.url {
        let url = zipmap_export::to_url(&specs, &StaticMapRequest::default());
        if !zipmap_export::fits_url_limit(&url) {
            eprintln!(
                "Warning: URL is {} characters, over the {} limit",
                url.chars().count(),
                zipmap_export::URL_LIMIT,
            );
        }
        println!("{url}");
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("zipmap-bench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_search_config() {
        let config = config_from_cli(&parse(&["paths.json"])).unwrap();
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "paths.json",
            "--max-characters",
            "900",
            "--merge",
            "fixpoint",
            "--layout",
            "fixed-width",
            "--color",
            "red",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.max_characters, 900);
        assert_eq!(config.merge_strategy, MergeStrategy::Fixpoint);
        assert_eq!(config.chunk_layout, ChunkLayout::FixedWidth);
        assert_eq!(config.style.color, "red");
        assert_eq!(config.style.fill_color, PathStyle::DEFAULT_FILL_COLOR);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = parse(&[
            "paths.json",
            "--max-characters",
            "900",
            "--config-json",
            r#"{"max_characters": 500}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.max_characters, 500);
        assert!((config.threshold_step_m - SearchConfig::DEFAULT_THRESHOLD_STEP_M).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["paths.json", "--config-json", "{"]);
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.contains("--config-json"));
    }
}
