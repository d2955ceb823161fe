//! Per-segment time estimation under acceleration and jerk limits.

use crate::segment::{MoveKind, ToolpathSegment};
use luthcam_core::data::MachineProfile;
use luthcam_core::units::mm_per_min_to_mm_per_sec;
use serde::Serialize;

/// Fraction of the commanded feed the segment must be able to reach before
/// it is treated as cruising.
pub const REACH_THRESHOLD: f64 = 0.9;

/// Which part of the kinematic model produced a segment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionBranch {
    /// Zero-length segment, or no feed.
    Idle,
    /// Shorter than the two jerk ramps.
    JerkLimited,
    /// Long enough for the ramps but cannot reach 90% of the feed.
    ReachLimited,
    /// Reaches the commanded feed.
    Cruise,
}

/// Time estimate for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentTime {
    /// Seconds.
    pub time: f64,
    pub branch: MotionBranch,
}

/// Time for a move of `length` mm at `feed` mm/min.
///
/// The feed is used as given; clamping to the machine limits is the caller's
/// job (see [`MotionProfileEstimator::effective_feed`]).
pub fn segment_time(length: f64, feed: f64, machine: &MachineProfile) -> SegmentTime {
    if length.is_nan() || length <= 0.0 || feed.is_nan() || feed <= 0.0 {
        return SegmentTime {
            time: 0.0,
            branch: MotionBranch::Idle,
        };
    }
    let a = machine.acceleration();
    let j = machine.jerk();
    let v = mm_per_min_to_mm_per_sec(feed);

    let t_a = a / j;
    let s_a = 0.5 * a * t_a * t_a;
    let jerk_limited = 2.0 * (length / a).sqrt();

    if length < 2.0 * s_a {
        return SegmentTime {
            time: jerk_limited,
            branch: MotionBranch::JerkLimited,
        };
    }
    let v_reach = (2.0 * a * (length - 2.0 * s_a)).sqrt();
    if v_reach < REACH_THRESHOLD * v {
        SegmentTime {
            time: jerk_limited,
            branch: MotionBranch::ReachLimited,
        }
    } else {
        SegmentTime {
            time: 2.0 * t_a + (length - 2.0 * s_a) / v,
            branch: MotionBranch::Cruise,
        }
    }
}

/// Estimates segment times for one machine.
#[derive(Debug, Clone, Copy)]
pub struct MotionProfileEstimator<'m> {
    machine: &'m MachineProfile,
}

impl<'m> MotionProfileEstimator<'m> {
    pub fn new(machine: &'m MachineProfile) -> Self {
        Self { machine }
    }

    pub fn machine(&self) -> &MachineProfile {
        self.machine
    }

    /// Commanded feed clamped to what the machine allows for this move kind.
    pub fn effective_feed(&self, segment: &ToolpathSegment) -> f64 {
        let cap = match segment.kind {
            MoveKind::Rapid => self.machine.rapid_feed(),
            _ => self.machine.max_feed(),
        };
        segment.feed_rate.min(cap)
    }

    pub fn estimate(&self, segment: &ToolpathSegment) -> SegmentTime {
        segment_time(segment.length(), self.effective_feed(segment), self.machine)
    }

    /// One estimate per segment, in order.
    pub fn estimate_times(&self, segments: &[ToolpathSegment]) -> Vec<SegmentTime> {
        segments.iter().map(|s| self.estimate(s)).collect()
    }
}

/// Convenience wrapper around [`MotionProfileEstimator::estimate_times`].
pub fn estimate_times(segments: &[ToolpathSegment], machine: &MachineProfile) -> Vec<SegmentTime> {
    MotionProfileEstimator::new(machine).estimate_times(segments)
}
