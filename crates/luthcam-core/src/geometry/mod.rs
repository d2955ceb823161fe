//! Planar geometry primitives.

pub mod point;
pub mod polygon;

pub use point::{distance_to_segment, segment_distance, segments_intersect, Bounds, Point};
pub use polygon::{signed_area, PocketInput, Polygon, MIN_AREA, POINT_TOLERANCE};
