//! Budget search: trade geometric detail for encoded size.
//!
//! Each iteration simplifies every path at the current threshold,
//! merges continuations, and encodes the survivors. If the combined
//! path specs fit the character budget they are returned; otherwise the
//! threshold grows by a fixed step and the search repeats.
//!
//! The search is bounded. It gives up with
//! [`PipelineError::BudgetUnreachable`] after
//! [`SearchConfig::max_iterations`], or as soon as an over-budget
//! iteration has already reduced every path to its endpoints, since a
//! larger threshold cannot remove anything more.

use tracing::{debug, info, warn};

use crate::diagnostics::{IterationDiagnostics, SearchDiagnostics};
use crate::encode::encode_deltas;
use crate::merge::PathMerger;
use crate::simplify::{SimplifiedPath, simplify_paths};
use crate::types::{EncodedPathSpec, Path, PipelineError, SearchConfig};

/// Output of one search iteration.
struct Attempt {
    specs: Vec<EncodedPathSpec>,
    diagnostics: IterationDiagnostics,
    /// Every path is down to at most its two endpoints.
    fully_reduced: bool,
}

/// Simplify, merge and encode all paths at one threshold.
fn attempt(
    paths: &[Path],
    iteration: u32,
    threshold_m: f64,
    config: &SearchConfig,
) -> Result<Attempt, PipelineError> {
    let simplified = simplify_paths(paths, threshold_m)?;
    let retained_points: usize = simplified
        .iter()
        .map(SimplifiedPath::retained_points)
        .sum();
    let fully_reduced = simplified.iter().all(|p| p.retained_points() <= 2);

    let merged = config.merge_strategy.merge(simplified);
    let surviving_paths = merged.len();

    let mut specs = Vec::with_capacity(merged.len());
    for path in merged.iter().filter(|p| !p.deltas.is_empty()) {
        specs.push(EncodedPathSpec {
            style: config.style.clone(),
            encoded: encode_deltas(&path.deltas, config.chunk_layout)?,
        });
    }
    let total_characters: usize = specs.iter().map(EncodedPathSpec::len).sum();

    Ok(Attempt {
        diagnostics: IterationDiagnostics {
            iteration,
            threshold_m,
            retained_points,
            surviving_paths,
            path_specs: specs.len(),
            total_characters,
        },
        specs,
        fully_reduced,
    })
}

/// Find path specs whose combined length fits the character budget.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid `config`,
/// [`PipelineError::Encoding`] if a coordinate cannot be encoded, and
/// [`PipelineError::BudgetUnreachable`] if no threshold within the
/// iteration cap fits the budget.
pub fn find_fitting_pathspecs(
    paths: &[Path],
    config: &SearchConfig,
) -> Result<Vec<EncodedPathSpec>, PipelineError> {
    find_fitting_pathspecs_with_diagnostics(paths, config).map(|(specs, _)| specs)
}

/// Like [`find_fitting_pathspecs`], also returning per-iteration diagnostics.
///
/// # Errors
///
/// See [`find_fitting_pathspecs`].
pub fn find_fitting_pathspecs_with_diagnostics(
    paths: &[Path],
    config: &SearchConfig,
) -> Result<(Vec<EncodedPathSpec>, SearchDiagnostics), PipelineError> {
    config.validate()?;

    let mut diagnostics = SearchDiagnostics {
        input_paths: paths.len(),
        input_points: paths.iter().map(Path::len).sum(),
        max_characters: config.max_characters,
        merge_strategy: format!("{:?}", config.merge_strategy),
        iterations: Vec::new(),
    };

    let mut last = None;
    for iteration in 0..config.max_iterations {
        let threshold_m = config.threshold_at(iteration);
        let result = attempt(paths, iteration, threshold_m, config)?;
        let stats = result.diagnostics.clone();
        diagnostics.iterations.push(result.diagnostics);

        debug!(
            iteration,
            threshold_m,
            retained_points = stats.retained_points,
            surviving_paths = stats.surviving_paths,
            total_characters = stats.total_characters,
            "budget search iteration",
        );

        if stats.total_characters <= config.max_characters {
            info!(
                iterations = iteration + 1,
                threshold_m,
                total_characters = stats.total_characters,
                max_characters = config.max_characters,
                "path specs fit character budget",
            );
            return Ok((result.specs, diagnostics));
        }

        let give_up = result.fully_reduced;
        last = Some(stats);
        if give_up {
            break;
        }
    }

    let (iterations, threshold_m, total_characters) = last.map_or(
        (0, config.initial_threshold_m, 0),
        |s| (s.iteration + 1, s.threshold_m, s.total_characters),
    );
    warn!(
        iterations,
        threshold_m,
        total_characters,
        max_characters = config.max_characters,
        "character budget unreachable",
    );
    Err(PipelineError::BudgetUnreachable {
        iterations,
        threshold_m,
        total_characters,
        max_characters: config.max_characters,
    })
}
