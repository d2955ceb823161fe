//! Offset backend built on `cavalier_contours`.
//!
//! Cavalier offsets produce true circular arcs (bulge vertices) at joins.
//! Those arcs are converted to points here according to the requested join
//! style, so the rest of the pipeline only ever sees polylines.

use crate::backend::{BackendError, Contour, JoinSpec, OffsetBackend};
use crate::config::JoinStyle;
use cavalier_contours::polyline::{
    BooleanOp, PlineOrientation, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use luthcam_core::geometry::{signed_area, Bounds, Point};

/// Bulges smaller than this are treated as straight lines.
const BULGE_EPSILON: f64 = 1e-9;

/// Cap on points emitted for one flattened arc.
const MAX_ARC_STEPS: usize = 1024;

/// [`OffsetBackend`] backed by `cavalier_contours` polylines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CavalierBackend;

impl CavalierBackend {
    pub fn new() -> Self {
        Self
    }
}

fn to_polyline(points: &[Point]) -> Polyline<f64> {
    let mut polyline = Polyline::new();
    for p in points {
        polyline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    polyline.set_is_closed(true);
    polyline
}

fn ccw_points(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    if signed_area(&pts) < 0.0 {
        pts.reverse();
    }
    pts
}

/// Boolean results come back clockwise; flip them so later clips and the
/// output see counter-clockwise regions.
fn into_ccw(mut polyline: Polyline<f64>) -> Polyline<f64> {
    if polyline.orientation() == PlineOrientation::Clockwise {
        polyline.invert_direction_mut();
    }
    polyline
}

fn polyline_bounds(polyline: &Polyline<f64>) -> Option<Bounds> {
    let first = polyline.vertex_data.first()?;
    let mut b = Bounds::new(first.x, first.y, first.x, first.y);
    for v in &polyline.vertex_data {
        b.include(&Point::new(v.x, v.y));
    }
    Some(b)
}

/// Geometry of the arc between two polyline vertices.
#[derive(Debug, Clone, Copy)]
struct BulgeArc {
    start: Point,
    end: Point,
    center: Point,
    radius: f64,
    /// Signed sweep in radians, positive counter-clockwise.
    sweep: f64,
}

impl BulgeArc {
    fn new(start: Point, end: Point, bulge: f64) -> Option<Self> {
        let chord = end - start;
        let len = chord.length();
        if len <= f64::EPSILON || bulge.abs() < BULGE_EPSILON {
            return None;
        }
        let sweep = 4.0 * bulge.atan();
        let radius = len * (1.0 + bulge * bulge) / (4.0 * bulge.abs());
        let left = Point::new(-chord.y / len, chord.x / len);
        let mid = start.lerp(&end, 0.5);
        let center = mid + left * (len * (1.0 - bulge * bulge) / (4.0 * bulge));
        Some(Self {
            start,
            end,
            center,
            radius,
            sweep,
        })
    }

    fn point_at(&self, fraction: f64) -> Point {
        let a = self.start.angle_from(&self.center) + self.sweep * fraction;
        Point::new(
            self.center.x + self.radius * a.cos(),
            self.center.y + self.radius * a.sin(),
        )
    }

    /// Unit tangent at the start in the direction of travel.
    fn start_tangent(&self) -> Option<Point> {
        let r = (self.start - self.center).perp();
        (if self.sweep > 0.0 { r } else { r * -1.0 }).normalized()
    }

    fn end_tangent(&self) -> Option<Point> {
        let r = (self.end - self.center).perp();
        (if self.sweep > 0.0 { r } else { r * -1.0 }).normalized()
    }

    /// Interior points of the flattened arc, excluding both endpoints.
    fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let step = if tolerance >= self.radius {
            std::f64::consts::FRAC_PI_2
        } else {
            2.0 * (1.0 - tolerance / self.radius).acos()
        };
        let steps = ((self.sweep.abs() / step.max(1e-6)).ceil() as usize).clamp(1, MAX_ARC_STEPS);
        (1..steps)
            .map(|k| self.point_at(k as f64 / steps as f64))
            .collect()
    }

    /// Bevel corner points lying on the tangent at the arc midpoint.
    fn square(&self) -> Vec<Point> {
        let reach = self.radius * (self.sweep.abs() / 4.0).tan();
        match (self.start_tangent(), self.end_tangent()) {
            (Some(t0), Some(t1)) => vec![self.start + t0 * reach, self.end - t1 * reach],
            _ => Vec::new(),
        }
    }

    /// Sharp corner, or a bevel when the miter would exceed `limit`.
    fn miter(&self, limit: f64) -> Vec<Point> {
        let half = self.sweep.abs() / 2.0;
        let cos_half = half.cos();
        if cos_half <= f64::EPSILON || 1.0 / cos_half > limit {
            return self.square();
        }
        match (self.point_at(0.5) - self.center).normalized() {
            Some(dir) => vec![self.center + dir * (self.radius / cos_half)],
            None => self.square(),
        }
    }
}

/// Converts a closed cavalier polyline into points, expanding bulges.
fn polyline_to_contour(polyline: &Polyline<f64>, join: &JoinSpec) -> Contour {
    let verts = &polyline.vertex_data;
    let n = verts.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let v0 = verts[i];
        let v1 = verts[(i + 1) % n];
        let start = Point::new(v0.x, v0.y);
        out.push(start);
        if let Some(arc) = BulgeArc::new(start, Point::new(v1.x, v1.y), v0.bulge) {
            match join.style {
                JoinStyle::Round => out.extend(arc.flatten(join.arc_tolerance)),
                JoinStyle::Square => out.extend(arc.square()),
                JoinStyle::Miter => out.extend(arc.miter(join.miter_limit)),
            }
        }
    }
    out
}

impl OffsetBackend for CavalierBackend {
    fn name(&self) -> &'static str {
        "cavalier"
    }

    fn offset_polygon(
        &self,
        points: &[Point],
        delta: f64,
        join: &JoinSpec,
    ) -> Result<Vec<Contour>, BackendError> {
        if points.len() < 3 {
            return Err(BackendError(format!(
                "cannot offset a loop of {} points",
                points.len()
            )));
        }
        if !delta.is_finite() {
            return Err(BackendError(format!("non-finite offset {delta}")));
        }

        let polyline = to_polyline(&ccw_points(points));
        let mut contours = Vec::new();
        for offset in polyline.parallel_offset(delta) {
            // Inward offsets of narrow regions can come back inverted.
            if offset.area() <= 0.0 {
                continue;
            }
            let contour = polyline_to_contour(&offset, join);
            if contour.len() >= 3 {
                contours.push(contour);
            }
        }
        Ok(contours)
    }

    fn difference_polygons(
        &self,
        subjects: &[Contour],
        clips: &[Contour],
    ) -> Result<Vec<Contour>, BackendError> {
        let mut regions: Vec<Polyline<f64>> = subjects
            .iter()
            .filter(|s| s.len() >= 3)
            .map(|s| to_polyline(&ccw_points(s)))
            .collect();

        for clip in clips.iter().filter(|c| c.len() >= 3) {
            let clip_pline = to_polyline(&ccw_points(clip));
            let Some(clip_bounds) = polyline_bounds(&clip_pline) else {
                continue;
            };
            let mut next = Vec::with_capacity(regions.len());
            for region in regions {
                let overlaps = polyline_bounds(&region).is_some_and(|b| b.intersects(&clip_bounds));
                if !overlaps {
                    next.push(region);
                    continue;
                }
                let result = region.boolean(&clip_pline, BooleanOp::Not);
                next.extend(result.pos_plines.into_iter().map(|r| into_ccw(r.pline)));
            }
            regions = next;
            if regions.is_empty() {
                break;
            }
        }

        Ok(regions
            .iter()
            .filter(|r| r.area() > 0.0)
            .map(|r| {
                r.vertex_data
                    .iter()
                    .map(|v| Point::new(v.x, v.y))
                    .collect::<Contour>()
            })
            .filter(|c| c.len() >= 3)
            .collect())
    }
}
