//! Shared types for the zipmap path-encoding pipeline.

use std::fmt;

use geo::Haversine;
use geo::line_measures::Distance;
use serde::{Deserialize, Serialize};

use crate::encode::{ChunkLayout, EncodingError};
use crate::merge::MergeStrategy;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (positive north).
    pub lat: f64,
    /// Longitude in degrees (positive east).
    pub lng: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another coordinate, in meters.
    ///
    /// Haversine formula on the mean Earth radius.
    #[must_use]
    pub fn distance_m(self, other: Self) -> f64 {
        Haversine.distance(self.to_geo(), other.to_geo())
    }

    /// `geo` points are `(x, y)`, i.e. longitude first.
    const fn to_geo(self) -> geo::Point<f64> {
        geo::Point(geo::Coord {
            x: self.lng,
            y: self.lat,
        })
    }
}

/// A named route segment: an identifier plus its points in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Identifier of the segment (e.g. `"polyline1"`).
    pub id: String,
    /// Points in original traversal order.
    pub coordinates: Vec<Coordinate>,
}

impl Path {
    /// Create a new path.
    #[must_use]
    pub fn new(id: impl Into<String>, coordinates: Vec<Coordinate>) -> Self {
        Self {
            id: id.into(),
            coordinates,
        }
    }

    /// Returns `true` if the path has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Returns the number of points in the path.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }
}

/// Group a flat stream of `(identifier, point)` pairs into paths.
///
/// Identifiers keep the order in which they first appear, and each
/// path keeps its points in stream order. This is the shape upstream
/// route data arrives in: one element per point, tagged with the
/// segment it belongs to.
#[must_use]
pub fn group_tagged_points<I, S>(points: I) -> Vec<Path>
where
    I: IntoIterator<Item = (S, Coordinate)>,
    S: Into<String>,
{
    let mut paths: Vec<Path> = Vec::new();

    for (id, coordinate) in points {
        let id = id.into();
        match paths.iter_mut().find(|p| p.id == id) {
            Some(path) => path.coordinates.push(coordinate),
            None => paths.push(Path::new(id, vec![coordinate])),
        }
    }

    paths
}

/// One fixed-point entry of a [`DeltaSequence`], in units of 1e-5 degrees.
///
/// The first entry of a sequence is an absolute position; every later
/// entry is a difference from the previously retained position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScaledDelta {
    /// Latitude component.
    pub lat: i32,
    /// Longitude component.
    pub lng: i32,
}

impl ScaledDelta {
    /// Create a new entry.
    #[must_use]
    pub const fn new(lat: i32, lng: i32) -> Self {
        Self { lat, lng }
    }

    /// Component-wise difference `self - origin`.
    #[must_use]
    pub const fn since(self, origin: Self) -> Self {
        Self {
            lat: self.lat.wrapping_sub(origin.lat),
            lng: self.lng.wrapping_sub(origin.lng),
        }
    }

    /// Component-wise sum `self + delta`.
    #[must_use]
    pub const fn offset_by(self, delta: Self) -> Self {
        Self {
            lat: self.lat.wrapping_add(delta.lat),
            lng: self.lng.wrapping_add(delta.lng),
        }
    }
}

/// An absolute scaled position followed by deltas between retained points.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaSequence(Vec<ScaledDelta>);

impl DeltaSequence {
    /// Create a sequence from raw entries. The first entry is absolute.
    #[must_use]
    pub const fn new(entries: Vec<ScaledDelta>) -> Self {
        Self(entries)
    }

    /// Returns `true` if the sequence has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries, which is also the number of retained points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all entries.
    #[must_use]
    pub fn entries(&self) -> &[ScaledDelta] {
        &self.0
    }

    /// Append one entry.
    pub fn push(&mut self, entry: ScaledDelta) {
        self.0.push(entry);
    }

    /// Append another sequence that starts where this one ends.
    ///
    /// The other sequence's absolute first entry is dropped: it names
    /// the same point as this sequence's current endpoint.
    pub fn append_continuation(&mut self, other: &Self) {
        self.0.extend(other.0.iter().skip(1));
    }

    /// Cumulatively sum the entries back into absolute scaled positions.
    #[must_use]
    pub fn reconstruct(&self) -> Vec<ScaledDelta> {
        let mut points = Vec::with_capacity(self.0.len());
        let mut current: Option<ScaledDelta> = None;
        for &entry in &self.0 {
            let next = current.map_or(entry, |c| c.offset_by(entry));
            points.push(next);
            current = Some(next);
        }
        points
    }
}

/// Stroke and fill style applied to every encoded path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathStyle {
    /// Stroke weight in pixels.
    pub weight: u32,
    /// Stroke color name.
    pub color: String,
    /// Fill color name.
    pub fill_color: String,
}

impl PathStyle {
    /// Default stroke weight.
    pub const DEFAULT_WEIGHT: u32 = 3;
    /// Default stroke color.
    pub const DEFAULT_COLOR: &'static str = "blue";
    /// Default fill color.
    pub const DEFAULT_FILL_COLOR: &'static str = "purple";
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            weight: Self::DEFAULT_WEIGHT,
            color: Self::DEFAULT_COLOR.to_owned(),
            fill_color: Self::DEFAULT_FILL_COLOR.to_owned(),
        }
    }
}

/// A style record plus one encoded polyline, ready for the map renderer.
///
/// Renders via [`Display`](fmt::Display) as
/// `weight:<int>|color:<name>|fillcolor:<name>|enc:<encoded>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPathSpec {
    /// Style applied to this path.
    pub style: PathStyle,
    /// Encoded polyline string.
    pub encoded: String,
}

impl EncodedPathSpec {
    /// Number of characters this spec contributes to the budget.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_string().chars().count()
    }

    /// Returns `true` if the encoded polyline is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }
}

impl fmt::Display for EncodedPathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weight:{}|color:{}|fillcolor:{}|enc:{}",
            self.style.weight, self.style.color, self.style.fill_color, self.encoded,
        )
    }
}

/// Configuration for the budget search.
///
/// Use [`SearchConfig::validate`] (called by the search itself) to
/// reject values the search cannot work with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Distance threshold of the first iteration, in meters.
    pub initial_threshold_m: f64,

    /// Amount the threshold grows after each over-budget iteration, in meters.
    pub threshold_step_m: f64,

    /// Maximum total characters across all encoded path specs.
    pub max_characters: usize,

    /// Upper bound on the number of iterations before giving up.
    pub max_iterations: u32,

    /// How simplified paths are joined end-to-start.
    pub merge_strategy: MergeStrategy,

    /// How many 5-bit groups each encoded value occupies.
    pub chunk_layout: ChunkLayout,

    /// Style applied to every emitted path spec.
    pub style: PathStyle,
}

impl SearchConfig {
    /// Default initial threshold in meters.
    pub const DEFAULT_INITIAL_THRESHOLD_M: f64 = 50.0;
    /// Default threshold step in meters.
    pub const DEFAULT_THRESHOLD_STEP_M: f64 = 25.0;
    /// Default character budget, leaving headroom under a 2048-character URL.
    pub const DEFAULT_MAX_CHARACTERS: usize = 1300;
    /// Default iteration cap (reaches a 10 km threshold with default step).
    pub const DEFAULT_MAX_ITERATIONS: u32 = 400;

    /// Threshold used by the zero-based `iteration`.
    #[must_use]
    pub fn threshold_at(&self, iteration: u32) -> f64 {
        self.threshold_step_m
            .mul_add(f64::from(iteration), self.initial_threshold_m)
    }

    /// Check the configuration for values the search cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when a threshold or step
    /// is not a positive finite number, when the iteration cap is zero,
    /// or when a style color is empty.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.initial_threshold_m.is_finite() && self.initial_threshold_m > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "initial_threshold_m must be positive and finite, got {}",
                self.initial_threshold_m,
            )));
        }
        if !(self.threshold_step_m.is_finite() && self.threshold_step_m > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold_step_m must be positive and finite, got {}",
                self.threshold_step_m,
            )));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_iterations must be at least 1".to_owned(),
            ));
        }
        if self.style.color.is_empty() || self.style.fill_color.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "style colors must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_threshold_m: Self::DEFAULT_INITIAL_THRESHOLD_M,
            threshold_step_m: Self::DEFAULT_THRESHOLD_STEP_M,
            max_characters: Self::DEFAULT_MAX_CHARACTERS,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            merge_strategy: MergeStrategy::default(),
            chunk_layout: ChunkLayout::default(),
            style: PathStyle::default(),
        }
    }
}

/// Errors that can occur while simplifying, encoding or searching.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A coordinate or delta could not be encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Search or simplification parameters are invalid.
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    /// The search gave up without fitting the character budget.
    #[error(
        "encoded paths still need {total_characters} characters (budget {max_characters}) \
         after {iterations} iterations at a {threshold_m} m threshold"
    )]
    BudgetUnreachable {
        /// Iterations performed before giving up.
        iterations: u32,
        /// Threshold of the last iteration, in meters.
        threshold_m: f64,
        /// Total characters produced by the last iteration.
        total_characters: usize,
        /// The budget that could not be met.
        max_characters: usize,
    },
}
