//! Feed rate unit conversion
//!
//! Feeds enter the planner in mm/min, the kinematic model works in mm/s.

/// mm/min to mm/s.
pub fn mm_per_min_to_mm_per_sec(feed: f64) -> f64 {
    feed / 60.0
}
