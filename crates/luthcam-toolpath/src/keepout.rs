//! Clearance checks against islands and the pocket wall.
//!
//! The guard answers "is this point / segment far enough from every island
//! and from the outer boundary" using grid lookups, so a check only visits
//! obstacles near the query.

use crate::config::RingParams;
use luthcam_core::geometry::{segment_distance, segments_intersect, Bounds, PocketInput, Point};
use luthcam_core::GridIndex;

/// Slack for floating point noise on top of the flattening tolerance.
const CLEARANCE_EPSILON: f64 = 1e-7;

/// What a clearance check ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Obstacle {
    Island(usize),
    Wall,
}

impl std::fmt::Display for Obstacle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Island(i) => write!(f, "island {i}"),
            Self::Wall => write!(f, "outer boundary"),
        }
    }
}

/// A failed clearance check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub obstacle: Obstacle,
    /// Measured clearance in mm (zero when inside the obstacle).
    pub clearance: f64,
    /// Required clearance in mm.
    pub required: f64,
}

/// Clearance checker for one pocket.
///
/// Tool-center positions must stay `tool_radius + margin` away from every
/// island and from the wall, less the arc flattening tolerance.
#[derive(Debug)]
pub struct KeepoutGuard<'a> {
    pocket: &'a PocketInput,
    island_index: GridIndex,
    wall_index: GridIndex,
    required: f64,
}

impl<'a> KeepoutGuard<'a> {
    pub fn new(pocket: &'a PocketInput, params: &RingParams) -> Self {
        let island_boxes: Vec<Bounds> = pocket.islands().iter().map(|i| i.bounds()).collect();
        Self {
            pocket,
            island_index: GridIndex::build(&island_boxes),
            wall_index: GridIndex::build(&pocket.outer().edge_bounds()),
            required: (params.clearance() - params.arc_tolerance - CLEARANCE_EPSILON).max(0.0),
        }
    }

    /// Clearance the guard enforces, in mm.
    pub fn required(&self) -> f64 {
        self.required
    }

    pub fn pocket(&self) -> &PocketInput {
        self.pocket
    }

    /// Island indices whose box lies within the required clearance of `b`.
    pub fn islands_near(&self, b: &Bounds) -> Vec<usize> {
        self.island_index.query(&b.expand(self.required))
    }

    /// Checks a single point against one island.
    pub fn check_point_island(&self, p: &Point, island: usize) -> Result<(), Violation> {
        let Some(poly) = self.pocket.islands().get(island) else {
            return Ok(());
        };
        let clearance = if poly.contains_point(p) {
            0.0
        } else {
            poly.distance_to_point(p)
        };
        if clearance < self.required {
            return Err(Violation {
                obstacle: Obstacle::Island(island),
                clearance,
                required: self.required,
            });
        }
        Ok(())
    }

    /// Checks a straight tool-center move against islands and the wall.
    pub fn check_segment(&self, a: &Point, b: &Point) -> Result<(), Violation> {
        let query = Bounds::of_segment(a, b).expand(self.required);

        for island in self.island_index.query(&query) {
            let poly = &self.pocket.islands()[island];
            let inside = poly.contains_point(a) || poly.contains_point(b);
            let clearance = if inside {
                0.0
            } else {
                poly.edges()
                    .map(|(c, d)| segment_distance(a, b, &c, &d))
                    .fold(f64::INFINITY, f64::min)
            };
            if clearance < self.required {
                return Err(Violation {
                    obstacle: Obstacle::Island(island),
                    clearance,
                    required: self.required,
                });
            }
        }

        let outer = self.pocket.outer();
        let wall = outer.points();
        let n = wall.len();
        if !outer.contains_point(a) || !outer.contains_point(b) {
            return Err(Violation {
                obstacle: Obstacle::Wall,
                clearance: 0.0,
                required: self.required,
            });
        }
        for e in self.wall_index.query(&query) {
            let (c, d) = (wall[e], wall[(e + 1) % n]);
            let clearance = if segments_intersect(a, b, &c, &d) {
                0.0
            } else {
                segment_distance(a, b, &c, &d)
            };
            if clearance < self.required {
                return Err(Violation {
                    obstacle: Obstacle::Wall,
                    clearance,
                    required: self.required,
                });
            }
        }
        Ok(())
    }

    pub fn segment_is_clear(&self, a: &Point, b: &Point) -> bool {
        self.check_segment(a, b).is_ok()
    }
}
