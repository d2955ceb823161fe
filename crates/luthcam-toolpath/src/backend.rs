//! Pluggable polygon offset and boolean backend.
//!
//! Ring construction only talks to [`OffsetBackend`], so the concrete
//! clipping algorithm can be swapped without touching the engine.

use crate::config::JoinStyle;
use luthcam_core::geometry::Point;
use thiserror::Error;

/// A closed point loop, counter-clockwise, last point not repeated.
pub type Contour = Vec<Point>;

/// Failure reported by a backend primitive.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Corner treatment passed to [`OffsetBackend::offset_polygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinSpec {
    pub style: JoinStyle,
    /// Maximum chord deviation for flattened arcs in mm.
    pub arc_tolerance: f64,
    /// Miter length limit as a multiple of the offset distance.
    pub miter_limit: f64,
}

/// Offset and boolean-difference primitives.
pub trait OffsetBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Offsets a closed loop by `delta`.
    ///
    /// Positive `delta` moves inward, negative outward, regardless of the
    /// input orientation. Returns zero or more counter-clockwise loops; an
    /// empty result means the loop collapsed.
    fn offset_polygon(
        &self,
        points: &[Point],
        delta: f64,
        join: &JoinSpec,
    ) -> Result<Vec<Contour>, BackendError>;

    /// Outer boundaries of every subject minus the union of `clips`.
    ///
    /// Subjects are expected to be disjoint, as produced by one offset call.
    ///
    /// A clip lying strictly inside a subject leaves the subject boundary
    /// untouched and produces no separate hole loop.
    fn difference_polygons(
        &self,
        subjects: &[Contour],
        clips: &[Contour],
    ) -> Result<Vec<Contour>, BackendError>;
}
