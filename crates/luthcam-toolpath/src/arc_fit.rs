//! Arc fitting for flattened ring runs.
//!
//! Round joins leave long runs of short chords on a common circle. Merging
//! them back into single arc moves shortens the segment list and gives the
//! energy model the lower arc engagement.
//!
//! Fitting is greedy: starting at a point, the run is grown while a circle
//! through its first, middle and last points stays within tolerance of every
//! point and every chord.

use luthcam_core::geometry::Point;

/// Configuration for arc fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcFittingConfig {
    /// Maximum radial deviation of any input point or chord (mm).
    pub tolerance: f64,
    /// Arcs tighter than this stay as lines (mm).
    pub min_radius: f64,
    /// Arcs flatter than this stay as lines (mm).
    pub max_radius: f64,
    /// Minimum points in a fitted run.
    pub min_points: usize,
    /// Maximum points considered for one arc.
    pub max_points: usize,
    /// Maximum swept angle (radians).
    pub max_arc_angle: f64,
    /// Allowed relative difference between arc and polyline length.
    pub length_tolerance: f64,
}

impl Default for ArcFittingConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            min_radius: 0.05,
            max_radius: 1000.0,
            min_points: 4,
            max_points: 256,
            max_arc_angle: std::f64::consts::PI,
            length_tolerance: 0.05,
        }
    }
}

impl ArcFittingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn min_radius(mut self, radius: f64) -> Self {
        self.min_radius = radius;
        self
    }

    pub fn max_radius(mut self, radius: f64) -> Self {
        self.max_radius = radius;
        self
    }
}

/// An arc fitted through a run of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedArc {
    pub start: Point,
    pub end: Point,
    pub center: Point,
    pub radius: f64,
    pub clockwise: bool,
    /// Absolute swept angle in radians.
    pub sweep: f64,
    /// Number of input points covered, endpoints included.
    pub point_count: usize,
}

/// Output of fitting: either a fitted arc or a plain chord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitPiece {
    Line(Point, Point),
    Arc(FittedArc),
}

/// Greedy arc fitter.
#[derive(Debug, Clone, Default)]
pub struct ArcFitter {
    config: ArcFittingConfig,
}

impl ArcFitter {
    pub fn new(config: ArcFittingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArcFittingConfig {
        &self.config
    }

    /// Converts an open point sequence into lines and arcs covering the same
    /// path. `accept` can veto an arc, in which case its chords are kept.
    pub fn fit<F>(&self, points: &[Point], mut accept: F) -> Vec<FitPiece>
    where
        F: FnMut(&FittedArc) -> bool,
    {
        let mut pieces = Vec::new();
        let mut i = 0;
        while i + 1 < points.len() {
            if let Some(arc) = self.try_fit(&points[i..]) {
                if accept(&arc) {
                    pieces.push(FitPiece::Arc(arc));
                    i += arc.point_count - 1;
                    continue;
                }
            }
            pieces.push(FitPiece::Line(points[i], points[i + 1]));
            i += 1;
        }
        pieces
    }

    /// Longest valid arc starting at `points[0]`.
    fn try_fit(&self, points: &[Point]) -> Option<FittedArc> {
        let min = self.config.min_points.max(3);
        if points.len() < min {
            return None;
        }
        let max = points.len().min(self.config.max_points);
        let mut best = None;
        for end in min..=max {
            match self.fit_run(&points[..end]) {
                Some(arc) => best = Some(arc),
                None => break,
            }
        }
        best
    }

    fn fit_run(&self, run: &[Point]) -> Option<FittedArc> {
        let cfg = &self.config;
        let p1 = run[0];
        let p2 = run[run.len() / 2];
        let p3 = run[run.len() - 1];
        let center = circle_center(p1, p2, p3)?;
        let radius = p1.distance_to(&center);
        if radius < cfg.min_radius || radius > cfg.max_radius {
            return None;
        }

        // Every chord must turn the same way.
        let mut turn = 0.0f64;
        for w in run.windows(3) {
            let c = (w[1] - w[0]).cross(&(w[2] - w[1]));
            if c.abs() <= f64::EPSILON {
                return None;
            }
            if turn != 0.0 && c.signum() != turn {
                return None;
            }
            turn = c.signum();
        }
        let clockwise = turn < 0.0;

        let mut polyline_length = 0.0;
        for w in run.windows(2) {
            let chord = w[0].distance_to(&w[1]);
            polyline_length += chord;
            let half = chord / 2.0;
            if half >= radius {
                return None;
            }
            let sagitta = radius - (radius * radius - half * half).sqrt();
            if sagitta > cfg.tolerance {
                return None;
            }
        }
        if run
            .iter()
            .any(|p| (p.distance_to(&center) - radius).abs() > cfg.tolerance)
        {
            return None;
        }

        let a0 = p1.angle_from(&center);
        let a1 = p3.angle_from(&center);
        let sweep = (if clockwise { a0 - a1 } else { a1 - a0 }).rem_euclid(std::f64::consts::TAU);
        if sweep <= 0.0 || sweep > cfg.max_arc_angle {
            return None;
        }
        let arc_length = radius * sweep;
        if (arc_length - polyline_length).abs() / polyline_length > cfg.length_tolerance {
            return None;
        }

        Some(FittedArc {
            start: p1,
            end: p3,
            center,
            radius,
            clockwise,
            sweep,
            point_count: run.len(),
        })
    }
}

/// Center of the circle through three points, `None` when collinear.
fn circle_center(p1: Point, p2: Point, p3: Point) -> Option<Point> {
    let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));
    if d.abs() < 1e-10 {
        return None;
    }
    let s1 = p1.x * p1.x + p1.y * p1.y;
    let s2 = p2.x * p2.x + p2.y * p2.y;
    let s3 = p3.x * p3.x + p3.y * p3.y;
    Some(Point::new(
        (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d,
        (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d,
    ))
}

/// Points sampled along a fitted arc at most `tolerance` apart in sagitta,
/// endpoints included.
pub fn sample_arc(arc: &FittedArc, tolerance: f64) -> Vec<Point> {
    let step = if tolerance >= arc.radius {
        std::f64::consts::FRAC_PI_2
    } else {
        2.0 * (1.0 - tolerance / arc.radius).acos()
    };
    let steps = ((arc.sweep / step.max(1e-6)).ceil() as usize).clamp(1, 1024);
    let a0 = arc.start.angle_from(&arc.center);
    let dir = if arc.clockwise { -1.0 } else { 1.0 };
    (0..=steps)
        .map(|k| {
            let a = a0 + dir * arc.sweep * k as f64 / steps as f64;
            Point::new(
                arc.center.x + arc.radius * a.cos(),
                arc.center.y + arc.radius * a.sin(),
            )
        })
        .collect()
}
