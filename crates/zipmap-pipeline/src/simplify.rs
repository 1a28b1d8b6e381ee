//! Distance-threshold path simplification.
//!
//! Walks each path in order and keeps a point only when it lies more
//! than `min_distance` meters (great-circle) from the last kept point.
//! The path's first and last points are always kept, so merged and
//! encoded routes still start and end exactly where the input does.
//!
//! Kept points are emitted as a [`DeltaSequence`]: the first point in
//! absolute fixed-point units, every later one as the difference from
//! its predecessor. Differences are taken between already-scaled
//! positions, so summing them never drifts from the kept points.

use crate::encode::{EncodingError, scale};
use crate::types::{Coordinate, DeltaSequence, Path, PipelineError, ScaledDelta};

/// A path after simplification, ready for merging and encoding.
///
/// `first` and `last` are the path's original, unsimplified endpoints.
/// Merging compares these, never the rounded fixed-point values.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedPath {
    /// Identifier of the source path.
    pub id: String,
    /// Retained points as an absolute start plus deltas.
    pub deltas: DeltaSequence,
    /// Original first coordinate (`None` for an empty path).
    pub first: Option<Coordinate>,
    /// Original last coordinate (`None` for an empty path).
    pub last: Option<Coordinate>,
}

impl SimplifiedPath {
    /// Number of points retained by simplification (and merging).
    #[must_use]
    pub const fn retained_points(&self) -> usize {
        self.deltas.len()
    }
}

/// Working state of one simplification pass over a single path.
#[derive(Debug, Clone, Copy)]
struct SimplificationState {
    /// First coordinate of the path.
    initial: Coordinate,
    /// Most recently retained coordinate.
    retained: Coordinate,
    /// Fixed-point form of `retained`.
    retained_scaled: ScaledDelta,
    /// Most recently visited coordinate, retained or not.
    last_seen: Coordinate,
}

impl SimplificationState {
    /// Start a pass at the path's first coordinate, recording it as the
    /// absolute entry of `deltas`.
    fn start(first: Coordinate, deltas: &mut DeltaSequence) -> Result<Self, EncodingError> {
        let scaled = scale_coordinate(first)?;
        deltas.push(scaled);
        Ok(Self {
            initial: first,
            retained: first,
            retained_scaled: scaled,
            last_seen: first,
        })
    }

    /// Visit the next coordinate, retaining it if it is far enough away.
    fn visit(
        self,
        coordinate: Coordinate,
        min_distance: f64,
        deltas: &mut DeltaSequence,
    ) -> Result<Self, EncodingError> {
        let state = if coordinate.distance_m(self.retained) > min_distance {
            self.retain(coordinate, deltas)?
        } else {
            self
        };
        Ok(Self {
            last_seen: coordinate,
            ..state
        })
    }

    /// Force the path's true endpoint into `deltas` if the scan skipped it.
    fn finish(self, deltas: &mut DeltaSequence) -> Result<Self, EncodingError> {
        if self.last_seen == self.retained {
            Ok(self)
        } else {
            self.retain(self.last_seen, deltas)
        }
    }

    fn retain(
        self,
        coordinate: Coordinate,
        deltas: &mut DeltaSequence,
    ) -> Result<Self, EncodingError> {
        let scaled = scale_coordinate(coordinate)?;
        deltas.push(scaled.since(self.retained_scaled));
        Ok(Self {
            retained: coordinate,
            retained_scaled: scaled,
            ..self
        })
    }
}

/// Scale both components of a coordinate to fixed-point units.
fn scale_coordinate(coordinate: Coordinate) -> Result<ScaledDelta, EncodingError> {
    Ok(ScaledDelta::new(
        scale(coordinate.lat)?,
        scale(coordinate.lng)?,
    ))
}

/// Simplify one path at the given distance threshold (meters).
///
/// Empty paths produce an empty sequence and single-point paths a
/// one-entry sequence; neither is an error.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `min_distance` is not a
/// positive finite number, and [`PipelineError::Encoding`] if a
/// coordinate cannot be scaled.
pub fn simplify(path: &Path, min_distance: f64) -> Result<SimplifiedPath, PipelineError> {
    if !(min_distance.is_finite() && min_distance > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "min_distance must be positive and finite, got {min_distance}",
        )));
    }

    let mut deltas = DeltaSequence::default();
    let mut points = path.coordinates.iter().copied();

    let Some(first) = points.next() else {
        return Ok(SimplifiedPath {
            id: path.id.clone(),
            deltas,
            first: None,
            last: None,
        });
    };

    let mut state = SimplificationState::start(first, &mut deltas)?;
    for coordinate in points {
        state = state.visit(coordinate, min_distance, &mut deltas)?;
    }
    let state = state.finish(&mut deltas)?;

    Ok(SimplifiedPath {
        id: path.id.clone(),
        deltas,
        first: Some(state.initial),
        last: Some(state.last_seen),
    })
}

/// Simplify multiple paths, each independently.
///
/// # Errors
///
/// Returns the first error produced by [`simplify`].
pub fn simplify_paths(
    paths: &[Path],
    min_distance: f64,
) -> Result<Vec<SimplifiedPath>, PipelineError> {
    paths.iter().map(|p| simplify(p, min_distance)).collect()
}
