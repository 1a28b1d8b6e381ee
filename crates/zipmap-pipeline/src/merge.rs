//! Path merging: join simplified paths that continue one another.
//!
//! Route data often splits one physical line into several segments,
//! where each segment starts exactly where another ends. Encoding them
//! as one path saves the repeated absolute start point and the style
//! prefix. This module defines the [`PathMerger`] trait and the
//! [`MergeStrategy`] enum for runtime selection.
//!
//! Endpoint matching uses exact equality on the original coordinates,
//! never the rounded fixed-point values.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::simplify::SimplifiedPath;

/// Selects how simplified paths are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// One pass over the paths in identifier order.
    ///
    /// Each surviving path scans every other unconsumed path and absorbs
    /// those that start where it currently ends. A chain whose links
    /// appear in an unfavourable identifier order may be left in
    /// several pieces.
    #[default]
    SinglePass,

    /// Repeat [`SinglePass`](Self::SinglePass) until a full pass merges
    /// nothing, so chains always collapse completely.
    Fixpoint,
}

/// Trait for path merging strategies.
///
/// Input: simplified paths in any order.
/// Output: surviving paths ordered by identifier; absorbed paths are
/// removed.
pub trait PathMerger {
    /// Merge paths whose end coincides with another path's start.
    fn merge(&self, paths: Vec<SimplifiedPath>) -> Vec<SimplifiedPath>;
}

impl PathMerger for MergeStrategy {
    fn merge(&self, mut paths: Vec<SimplifiedPath>) -> Vec<SimplifiedPath> {
        paths.sort_by(|a, b| a.id.cmp(&b.id));
        match *self {
            Self::SinglePass => {
                merge_pass(&mut paths);
            }
            Self::Fixpoint => while merge_pass(&mut paths) > 0 {},
        }
        paths
    }
}

/// Run one merge pass over `paths` (already sorted), removing absorbed
/// paths. Returns the number of merges performed.
fn merge_pass(paths: &mut Vec<SimplifiedPath>) -> usize {
    let mut consumed = vec![false; paths.len()];
    let mut merges = 0;

    for i in 0..paths.len() {
        if consumed[i] || paths[i].deltas.is_empty() {
            continue;
        }
        for j in 0..paths.len() {
            if i == j || consumed[j] {
                continue;
            }
            let continues = matches!(
                (paths[i].last, paths[j].first),
                (Some(end), Some(start)) if end == start
            );
            if !continues {
                continue;
            }

            let absorbed = std::mem::take(&mut paths[j].deltas);
            let absorbed_last = paths[j].last;
            debug!(
                into = %paths[i].id,
                from = %paths[j].id,
                points = absorbed.len().saturating_sub(1),
                "merging continuation path",
            );
            paths[i].deltas.append_continuation(&absorbed);
            paths[i].last = absorbed_last;
            consumed[j] = true;
            merges += 1;
        }
    }

    let mut index = 0;
    paths.retain(|_| {
        let keep = !consumed[index];
        index += 1;
        keep
    });
    merges
}
