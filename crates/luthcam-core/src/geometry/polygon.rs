//! Validated polygons and pocket inputs.
//!
//! A [`Polygon`] is an implicitly closed point loop normalised to
//! counter-clockwise orientation. A [`PocketInput`] pairs an outer boundary
//! with island keepouts and checks containment and overlap using grid
//! bucketing rather than pairwise comparison.

use super::point::{distance_to_segment, segments_intersect, Bounds, Point};
use crate::error::GeometryError;
use crate::spatial_index::GridIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::debug;

/// Points closer than this are treated as the same point.
pub const POINT_TOLERANCE: f64 = 1e-6;

/// Polygons with less absolute area than this are rejected.
pub const MIN_AREA: f64 = 1e-9;

/// An implicitly closed polygon in millimeters, stored counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Validates and normalises a point loop.
    pub fn new(points: Vec<Point>) -> Result<Self, GeometryError> {
        Self::labeled(points, "polygon")
    }

    /// Like [`Polygon::new`] with a label used in error messages.
    pub fn labeled(points: Vec<Point>, label: &str) -> Result<Self, GeometryError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate {
                label: label.to_string(),
                index,
            });
        }

        let mut cleaned: Vec<Point> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned
                .last()
                .is_none_or(|last| last.distance_to(&p) > POINT_TOLERANCE)
            {
                cleaned.push(p);
            }
        }
        while cleaned.len() > 1 {
            let first = cleaned[0];
            match cleaned.last() {
                Some(last) if last.distance_to(&first) <= POINT_TOLERANCE => {
                    cleaned.pop();
                }
                _ => break,
            }
        }

        let distinct = count_distinct(&cleaned);
        if distinct < 3 {
            return Err(GeometryError::TooFewPoints {
                label: label.to_string(),
                count: distinct,
            });
        }

        let area = signed_area(&cleaned);
        if area.abs() <= MIN_AREA {
            return Err(GeometryError::ZeroArea {
                label: label.to_string(),
            });
        }
        if area < 0.0 {
            cleaned.reverse();
        }

        Ok(Self { points: cleaned })
    }

    /// Axis-aligned rectangle with lower-left corner `(x, y)`.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        Self::new(vec![
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    /// Regular polygon inscribed in a circle.
    pub fn regular(center: Point, radius: f64, sides: usize) -> Result<Self, GeometryError> {
        let pts = (0..sides)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / sides as f64;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect();
        Self::new(pts)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates the closed edges `(p[i], p[i+1])`, wrapping at the end.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Signed area, positive for the stored counter-clockwise orientation.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| a.distance_to(&b)).sum()
    }

    pub fn bounds(&self) -> Bounds {
        // Non-empty by construction.
        Bounds::from_points(&self.points).unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Area centroid.
    pub fn centroid(&self) -> Point {
        let a = self.signed_area();
        let (mut cx, mut cy) = (0.0, 0.0);
        for (p, q) in self.edges() {
            let f = p.cross(&q);
            cx += (p.x + q.x) * f;
            cy += (p.y + q.y) * f;
        }
        Point::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Even-odd containment test. Points on the boundary may go either way.
    pub fn contains_point(&self, p: &Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from `p` to the nearest point of the boundary.
    pub fn distance_to_point(&self, p: &Point) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(p, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn edge_bounds(&self) -> Vec<Bounds> {
        self.edges().map(|(a, b)| Bounds::of_segment(&a, &b)).collect()
    }

    /// Finds a crossing between two non-adjacent edges.
    pub fn find_self_intersection(&self) -> Option<(usize, usize)> {
        let n = self.points.len();
        if n < 4 {
            return None;
        }
        let index = GridIndex::build(&self.edge_bounds());
        for i in 0..n {
            let (a1, a2) = (self.points[i], self.points[(i + 1) % n]);
            for j in index.query(&Bounds::of_segment(&a1, &a2)) {
                if j <= i || j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                let (b1, b2) = (self.points[j], self.points[(j + 1) % n]);
                if segments_intersect(&a1, &a2, &b1, &b2) {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

impl<'de> Deserialize<'de> for Polygon {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let points = Vec::<Point>::deserialize(deserializer)?;
        Polygon::new(points).map_err(serde::de::Error::custom)
    }
}

/// Shoelace area of an implicitly closed loop, positive when counter-clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| points[i].cross(&points[(i + 1) % n]))
        .sum::<f64>()
        / 2.0
}

/// Counts distinct points using hash-grid buckets of size [`POINT_TOLERANCE`].
fn count_distinct(points: &[Point]) -> usize {
    let key = |p: &Point| {
        (
            (p.x / POINT_TOLERANCE).floor() as i64,
            (p.y / POINT_TOLERANCE).floor() as i64,
        )
    };
    let mut buckets: HashMap<(i64, i64), Vec<Point>> = HashMap::new();
    let mut distinct = 0;
    for p in points {
        let (kx, ky) = key(p);
        let seen = (-1..=1).any(|dx| {
            (-1..=1).any(|dy| {
                buckets
                    .get(&(kx + dx, ky + dy))
                    .is_some_and(|b| b.iter().any(|q| q.distance_to(p) <= POINT_TOLERANCE))
            })
        });
        if !seen {
            distinct += 1;
            buckets.entry((kx, ky)).or_default().push(*p);
        }
    }
    distinct
}

/// A validated pocket: one outer boundary and zero or more islands.
///
/// Islands lie strictly inside the boundary and do not touch each other.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PocketInput {
    outer: Polygon,
    islands: Vec<Polygon>,
}

impl PocketInput {
    /// Validates raw point loops into a pocket.
    pub fn from_points(outer: Vec<Point>, islands: Vec<Vec<Point>>) -> Result<Self, GeometryError> {
        let outer = Polygon::labeled(outer, "outer")?;
        let islands = islands
            .into_iter()
            .enumerate()
            .map(|(i, pts)| Polygon::labeled(pts, &format!("island {i}")))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(outer, islands)
    }

    /// Checks self-intersection, containment and island overlap.
    pub fn new(outer: Polygon, islands: Vec<Polygon>) -> Result<Self, GeometryError> {
        if let Some((a, b)) = outer.find_self_intersection() {
            return Err(GeometryError::SelfIntersection {
                label: "outer".to_string(),
                edge_a: a,
                edge_b: b,
            });
        }
        for (i, island) in islands.iter().enumerate() {
            if let Some((a, b)) = island.find_self_intersection() {
                return Err(GeometryError::SelfIntersection {
                    label: format!("island {i}"),
                    edge_a: a,
                    edge_b: b,
                });
            }
        }

        check_containment(&outer, &islands)?;
        check_island_overlap(&islands)?;

        debug!(
            "Validated pocket with {} outer points and {} islands",
            outer.len(),
            islands.len()
        );
        Ok(Self { outer, islands })
    }

    pub fn outer(&self) -> &Polygon {
        &self.outer
    }

    pub fn islands(&self) -> &[Polygon] {
        &self.islands
    }

    /// Total vertex count of boundary and islands.
    pub fn vertex_count(&self) -> usize {
        self.outer.len() + self.islands.iter().map(Polygon::len).sum::<usize>()
    }
}

fn check_containment(outer: &Polygon, islands: &[Polygon]) -> Result<(), GeometryError> {
    if islands.is_empty() {
        return Ok(());
    }
    let outer_pts = outer.points();
    let n = outer_pts.len();
    let outer_index = GridIndex::build(&outer.edge_bounds());
    let outer_bounds = outer.bounds();

    for (i, island) in islands.iter().enumerate() {
        let ib = island.bounds();
        let strictly_inside_box = ib.min_x > outer_bounds.min_x
            && ib.min_y > outer_bounds.min_y
            && ib.max_x < outer_bounds.max_x
            && ib.max_y < outer_bounds.max_y;
        if !strictly_inside_box || !outer.contains_point(&island.points()[0]) {
            return Err(GeometryError::IslandOutsideBoundary { island: i });
        }
        for (a, b) in island.edges() {
            for e in outer_index.query(&Bounds::of_segment(&a, &b)) {
                if segments_intersect(&a, &b, &outer_pts[e], &outer_pts[(e + 1) % n]) {
                    return Err(GeometryError::IslandOutsideBoundary { island: i });
                }
            }
        }
    }
    Ok(())
}

fn check_island_overlap(islands: &[Polygon]) -> Result<(), GeometryError> {
    if islands.len() < 2 {
        return Ok(());
    }

    // Every island edge in one index, tagged with its owner.
    let mut owners = Vec::new();
    let mut edge_boxes = Vec::new();
    let mut edges = Vec::new();
    for (i, island) in islands.iter().enumerate() {
        for (a, b) in island.edges() {
            owners.push(i);
            edge_boxes.push(Bounds::of_segment(&a, &b));
            edges.push((a, b));
        }
    }
    let edge_index = GridIndex::build(&edge_boxes);
    for (k, (a, b)) in edges.iter().enumerate() {
        for m in edge_index.query(&edge_boxes[k]) {
            if owners[m] <= owners[k] {
                continue;
            }
            let (c, d) = edges[m];
            if segments_intersect(a, b, &c, &d) {
                return Err(GeometryError::IslandsOverlap {
                    first: owners[k],
                    second: owners[m],
                });
            }
        }
    }

    // No crossings left; an island can still sit entirely inside another.
    let boxes: Vec<Bounds> = islands.iter().map(Polygon::bounds).collect();
    let box_index = GridIndex::build(&boxes);
    for (i, island) in islands.iter().enumerate() {
        for j in box_index.query(&boxes[i]) {
            if j == i {
                continue;
            }
            if islands[j].contains_point(&island.points()[0]) {
                let (first, second) = if i < j { (i, j) } else { (j, i) };
                return Err(GeometryError::IslandsOverlap { first, second });
            }
        }
    }
    Ok(())
}
