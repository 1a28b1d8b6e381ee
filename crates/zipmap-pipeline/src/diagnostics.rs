//! Search diagnostics: per-iteration counts for the budget search.
//!
//! Collected by
//! [`find_fitting_pathspecs_with_diagnostics`](crate::find_fitting_pathspecs_with_diagnostics)
//! for parameter tuning. Contains no timings, so two runs on the same
//! input produce identical diagnostics.

use serde::{Deserialize, Serialize};

/// Diagnostics collected from a successful budget search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDiagnostics {
    /// Number of input paths.
    pub input_paths: usize,
    /// Total points across all input paths.
    pub input_points: usize,
    /// Character budget the search had to meet.
    pub max_characters: usize,
    /// Merge strategy used, by name.
    pub merge_strategy: String,
    /// One entry per iteration, in order.
    pub iterations: Vec<IterationDiagnostics>,
}

/// Counts for one iteration of the budget search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationDiagnostics {
    /// Zero-based iteration index.
    pub iteration: u32,
    /// Simplification threshold in meters.
    pub threshold_m: f64,
    /// Points kept by simplification, summed over all paths.
    pub retained_points: usize,
    /// Paths left after merging (including ones too short to encode).
    pub surviving_paths: usize,
    /// Path specs emitted.
    pub path_specs: usize,
    /// Total characters across all emitted path specs.
    pub total_characters: usize,
}

impl SearchDiagnostics {
    /// The iteration whose output was returned.
    #[must_use]
    pub fn final_iteration(&self) -> Option<&IterationDiagnostics> {
        self.iterations.last()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Budget Search Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} paths, {} points  |  Budget: {} characters  |  Merge: {}",
            self.input_paths, self.input_points, self.max_characters, self.merge_strategy,
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:>5} {:>12} {:>10} {:>8} {:>8} {:>10}",
            "Iter", "Threshold", "Points", "Paths", "Specs", "Chars"
        ));
        lines.push("-".repeat(60));

        for it in &self.iterations {
            let marker = if it.total_characters <= self.max_characters {
                "  fits"
            } else {
                ""
            };
            lines.push(format!(
                "{:>5} {:>10.1} m {:>10} {:>8} {:>8} {:>10}{marker}",
                it.iteration,
                it.threshold_m,
                it.retained_points,
                it.surviving_paths,
                it.path_specs,
                it.total_characters,
            ));
        }

        if let Some(last) = self.final_iteration() {
            lines.push(String::new());
            lines.push(format!(
                "Retained {} of {} points ({:.1}% reduction) at {:.1} m",
                last.retained_points,
                self.input_points,
                reduction_percent(self.input_points, last.retained_points),
                last.threshold_m,
            ));
        }

        lines.join("\n")
    }
}

/// Percentage of `before` removed to reach `after`.
#[allow(clippy::cast_precision_loss)]
fn reduction_percent(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        (1.0 - after as f64 / before as f64) * 100.0
    }
}
