//! zipmap-pipeline: Route encoding and budget search (sans-IO).
//!
//! Turns named route segments into compact encoded path specs for a
//! static map renderer through:
//! distance-threshold simplification -> continuation merging ->
//! fixed-point polyline encoding, repeated with a growing threshold
//! until the output fits a character budget.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! coordinates and returns strings. Fetching route data and requesting
//! map images live elsewhere.

pub mod diagnostics;
pub mod encode;
pub mod merge;
pub mod search;
pub mod simplify;
pub mod types;

pub use diagnostics::{IterationDiagnostics, SearchDiagnostics};
pub use encode::{ChunkLayout, DecodeError, EncodingError};
pub use merge::{MergeStrategy, PathMerger};
pub use search::{find_fitting_pathspecs, find_fitting_pathspecs_with_diagnostics};
pub use simplify::SimplifiedPath;
pub use types::{
    Coordinate, DeltaSequence, EncodedPathSpec, Path, PathStyle, PipelineError, ScaledDelta,
    SearchConfig, group_tagged_points,
};
