//! Path linking
//!
//! Turns the ring sequence into one ordered list of moves.
//!
//! - **Spiral**: after a loop is cut, the tool walks a little further along it
//!   (inside the angular search window) to the vertex closest to the next
//!   loop, then feeds straight across. No retract, unless the straight link
//!   would violate a keepout.
//! - **Lane**: every loop is entered at the vertex nearest the tool, with a
//!   retract, rapid and plunge in between.
//!
//! The linker is a small state machine (`NotStarted -> RingsLinked ->
//! Finalized`). Finalizing checks every cutting move against the keepout and
//! freezes the result into a [`LinkedPath`].

use crate::arc_fit::{sample_arc, ArcFitter, ArcFittingConfig, FitPiece, FittedArc};
use crate::config::{LinkConfig, PathStrategy, RingParams};
use crate::keepout::{KeepoutGuard, Violation};
use crate::rings::OffsetRing;
use crate::segment::{Motion, MoveKind, ToolpathSegment};
use luthcam_core::error::{GeometryError, PlanError};
use luthcam_core::geometry::{Bounds, PocketInput, Point, Polygon};
use luthcam_core::{CancelToken, GridIndex};
use std::f64::consts::{PI, TAU};
use tracing::{debug, info};

/// Linker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerState {
    NotStarted,
    RingsLinked,
    Finalized,
}

impl std::fmt::Display for LinkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::RingsLinked => write!(f, "RingsLinked"),
            Self::Finalized => write!(f, "Finalized"),
        }
    }
}

/// The frozen output of a [`PathLinker`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedPath {
    segments: Vec<ToolpathSegment>,
    strategy: PathStrategy,
    retracts: usize,
}

impl LinkedPath {
    pub fn segments(&self) -> &[ToolpathSegment] {
        &self.segments
    }

    pub fn strategy(&self) -> PathStrategy {
        self.strategy
    }

    /// Number of retract moves, the final one included.
    pub fn retract_count(&self) -> usize {
        self.retracts
    }

    pub fn into_segments(self) -> Vec<ToolpathSegment> {
        self.segments
    }
}

/// Where the tool currently is after cutting a loop.
struct Cursor<'r> {
    polygon: &'r Polygon,
    entry: usize,
}

/// Links offset rings into a toolpath.
pub struct PathLinker<'a> {
    guard: KeepoutGuard<'a>,
    config: LinkConfig,
    fitter: ArcFitter,
    state: LinkerState,
    segments: Vec<ToolpathSegment>,
    retracts: usize,
}

impl<'a> PathLinker<'a> {
    pub fn new(pocket: &'a PocketInput, params: &RingParams, config: LinkConfig) -> Self {
        Self {
            guard: KeepoutGuard::new(pocket, params),
            fitter: ArcFitter::new(ArcFittingConfig::new().tolerance(config.arc_tolerance)),
            config,
            state: LinkerState::NotStarted,
            segments: Vec::new(),
            retracts: 0,
        }
    }

    pub fn state(&self) -> LinkerState {
        self.state
    }

    /// Segments linked so far.
    pub fn segments(&self) -> &[ToolpathSegment] {
        &self.segments
    }

    fn transition(&mut self, operation: &str, from: LinkerState, to: LinkerState) -> Result<(), GeometryError> {
        if self.state != from {
            return Err(GeometryError::InvalidLinkerState {
                current: self.state.to_string(),
                operation: operation.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Links `rings` in index order.
    pub fn link_rings(&mut self, rings: &[OffsetRing]) -> Result<(), PlanError> {
        self.link_rings_with_cancel(rings, &CancelToken::new())
    }

    pub fn link_rings_with_cancel(
        &mut self,
        rings: &[OffsetRing],
        cancel: &CancelToken,
    ) -> Result<(), PlanError> {
        self.transition("link_rings", LinkerState::NotStarted, LinkerState::RingsLinked)?;

        let mut cursor: Option<Cursor<'_>> = None;
        for ring in rings {
            let mut remaining: Vec<&Polygon> = ring.loops().iter().collect();
            while !remaining.is_empty() {
                cancel.check()?;
                let pick = match &cursor {
                    None => 0,
                    Some(c) => nearest_loop(&remaining, &c.polygon.points()[c.entry]),
                };
                let polygon = remaining.remove(pick);
                let entry = match cursor.take() {
                    None => {
                        let entry = canonical_start(polygon.points());
                        self.push(ToolpathSegment::plunge(
                            polygon.points()[entry],
                            self.config.retract_height,
                            self.config.plunge_rate,
                        ));
                        entry
                    }
                    Some(prev) => self.link(&prev, polygon, ring.index()),
                };
                self.cut_loop(polygon, entry);
                cursor = Some(Cursor { polygon, entry });
            }
        }

        if let Some(c) = cursor {
            self.retract_at(c.polygon.points()[c.entry]);
        }

        info!(
            "Linked {} rings into {} segments ({} strategy, {} retracts)",
            rings.len(),
            self.segments.len(),
            self.config.strategy,
            self.retracts
        );
        Ok(())
    }

    /// Checks every cutting move and freezes the path.
    pub fn finalize(&mut self) -> Result<LinkedPath, GeometryError> {
        self.transition("finalize", LinkerState::RingsLinked, LinkerState::Finalized)?;
        for (index, segment) in self.segments.iter().enumerate() {
            if !segment.is_cutting() {
                continue;
            }
            if let Err(v) = check_segment(&self.guard, segment, self.config.arc_tolerance) {
                return Err(GeometryError::SegmentCrossesKeepout {
                    segment: index,
                    obstacle: v.obstacle.to_string(),
                    clearance: v.clearance,
                    required: v.required,
                });
            }
        }
        Ok(LinkedPath {
            segments: std::mem::take(&mut self.segments),
            strategy: self.config.strategy,
            retracts: self.retracts,
        })
    }

    fn push(&mut self, segment: ToolpathSegment) {
        let vertical = matches!(segment.kind, MoveKind::Plunge | MoveKind::Retract);
        if vertical || segment.start.distance_to(&segment.end) > f64::EPSILON {
            self.segments.push(segment);
        }
    }

    fn retract_at(&mut self, at: Point) {
        self.retracts += 1;
        self.push(ToolpathSegment::retract(
            at,
            self.config.retract_height,
            self.config.rapid_feed,
        ));
    }

    /// Retract, traverse and plunge from `from` to `to`.
    fn hop(&mut self, from: Point, to: Point) {
        self.retract_at(from);
        self.push(ToolpathSegment::rapid(from, to, self.config.rapid_feed));
        self.push(ToolpathSegment::plunge(
            to,
            self.config.retract_height,
            self.config.plunge_rate,
        ));
    }

    /// Moves from the end of `prev` onto `next`; returns the entry vertex.
    fn link(&mut self, prev: &Cursor<'_>, next: &Polygon, ring: usize) -> usize {
        let here = prev.polygon.points()[prev.entry];
        if self.config.strategy == PathStrategy::Spiral {
            let window = self.config.transition_window_deg.to_radians();
            let (walk, entry) = spiral_transition(prev.polygon, prev.entry, next, window);
            let exit = prev.polygon.points()[(prev.entry + walk) % prev.polygon.len()];
            let target = next.points()[entry];
            if self.guard.segment_is_clear(&exit, &target) {
                let pts = prev.polygon.points();
                let n = pts.len();
                for k in 0..walk {
                    let a = pts[(prev.entry + k) % n];
                    let b = pts[(prev.entry + k + 1) % n];
                    self.push(ToolpathSegment::line(MoveKind::Transition, a, b, self.config.feed_rate));
                }
                self.push(ToolpathSegment::line(
                    MoveKind::Transition,
                    exit,
                    target,
                    self.config.feed_rate,
                ));
                return entry;
            }
            debug!("Spiral link into ring {} blocked by keepout, retracting", ring);
        }
        let entry = nearest_vertex(next.points(), &here);
        self.hop(here, next.points()[entry]);
        entry
    }

    /// Cuts a full loop starting and ending at `entry`.
    fn cut_loop(&mut self, polygon: &Polygon, entry: usize) {
        let pts = polygon.points();
        let n = pts.len();
        let run: Vec<Point> = (0..=n).map(|k| pts[(entry + k) % n]).collect();
        let feed = self.config.feed_rate;

        if !self.config.fit_arcs {
            for w in run.windows(2) {
                self.push(ToolpathSegment::line(MoveKind::Cut, w[0], w[1], feed));
            }
            return;
        }

        let guard = &self.guard;
        let tolerance = self.config.arc_tolerance;
        let pieces = self
            .fitter
            .fit(&run, |arc| arc_is_clear(guard, arc, tolerance));
        for piece in pieces {
            let segment = match piece {
                FitPiece::Line(a, b) => ToolpathSegment::line(MoveKind::Cut, a, b, feed),
                FitPiece::Arc(arc) => ToolpathSegment::arc(
                    MoveKind::Cut,
                    arc.start,
                    arc.end,
                    arc.center,
                    arc.clockwise,
                    feed,
                ),
            };
            self.push(segment);
        }
    }
}

fn arc_is_clear(guard: &KeepoutGuard<'_>, arc: &FittedArc, tolerance: f64) -> bool {
    sample_arc(arc, tolerance)
        .windows(2)
        .all(|w| guard.segment_is_clear(&w[0], &w[1]))
}

fn check_segment(
    guard: &KeepoutGuard<'_>,
    segment: &ToolpathSegment,
    tolerance: f64,
) -> Result<(), Violation> {
    match segment.motion {
        Motion::Line => guard.check_segment(&segment.start, &segment.end),
        Motion::Arc {
            center,
            radius,
            clockwise,
        } => {
            let arc = FittedArc {
                start: segment.start,
                end: segment.end,
                center,
                radius,
                clockwise,
                sweep: segment.sweep(),
                point_count: 0,
            };
            for w in sample_arc(&arc, tolerance).windows(2) {
                guard.check_segment(&w[0], &w[1])?;
            }
            Ok(())
        }
    }
}

/// Index of the lowest vertex, leftmost on ties.
pub fn canonical_start(points: &[Point]) -> usize {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn nearest_vertex(points: &[Point], to: &Point) -> usize {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance_to(to).total_cmp(&b.distance_to(to)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn nearest_loop(loops: &[&Polygon], to: &Point) -> usize {
    loops
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.points()[nearest_vertex(p.points(), to)].distance_to(to)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        TAU - d
    } else {
        d
    }
}

/// Chooses the spiral transition between two loops.
///
/// Returns `(walk, entry)`: the number of vertices to walk forward on `prev`
/// from `prev_entry`, and the entry vertex on `next`. Both candidates are
/// restricted to the angular window around the current tool position, seen
/// from the centroid of `prev`; the closest pair wins.
pub fn spiral_transition(
    prev: &Polygon,
    prev_entry: usize,
    next: &Polygon,
    window: f64,
) -> (usize, usize) {
    let a_pts = prev.points();
    let b_pts = next.points();
    let n = a_pts.len();
    let center = prev.centroid();
    let heading = a_pts[prev_entry].angle_from(&center);

    let mut walk_candidates = vec![0usize];
    for k in 1..n {
        let p = a_pts[(prev_entry + k) % n];
        if angle_diff(p.angle_from(&center), heading) > window {
            break;
        }
        walk_candidates.push(k);
    }

    let mut b_candidates: Vec<usize> = (0..b_pts.len())
        .filter(|&j| angle_diff(b_pts[j].angle_from(&center), heading) <= window)
        .collect();
    if b_candidates.is_empty() {
        b_candidates = (0..b_pts.len()).collect();
    }

    let boxes: Vec<Bounds> = b_candidates
        .iter()
        .map(|&j| Bounds::of_segment(&b_pts[j], &b_pts[j]))
        .collect();
    let index = GridIndex::build(&boxes);

    let start = a_pts[prev_entry];
    let mut best = (0usize, b_candidates[0]);
    let mut best_dist = f64::INFINITY;
    for &j in &b_candidates {
        let d = start.distance_to(&b_pts[j]);
        if d < best_dist {
            best_dist = d;
            best = (0, j);
        }
    }

    for &k in &walk_candidates[1..] {
        let a = a_pts[(prev_entry + k) % n];
        let query = Bounds::of_segment(&a, &a).expand(best_dist);
        for slot in index.query(&query) {
            let j = b_candidates[slot];
            let d = a.distance_to(&b_pts[j]);
            if d < best_dist {
                best_dist = d;
                best = (k, j);
            }
        }
    }
    best
}

/// Links `rings` for `pocket` and finalizes in one call.
pub fn link_rings(
    pocket: &PocketInput,
    rings: &[OffsetRing],
    params: &RingParams,
    config: LinkConfig,
) -> Result<LinkedPath, PlanError> {
    let mut linker = PathLinker::new(pocket, params, config);
    linker.link_rings(rings)?;
    Ok(linker.finalize()?)
}
