//! Toolpath segment types and data structures.

use luthcam_core::geometry::Point;
use serde::Serialize;
use std::f64::consts::TAU;

/// Engagement factor of arc moves.
pub const ARC_ENGAGEMENT: f64 = 0.9;

/// Engagement factor of straight moves.
pub const LINE_ENGAGEMENT: f64 = 1.0;

/// Planar shape of a move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Motion {
    Line,
    Arc {
        center: Point,
        radius: f64,
        clockwise: bool,
    },
}

/// What a move does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Cutting along an offset ring
    Cut,
    /// Cutting link between rings without retracting
    Transition,
    /// Vertical feed down to cutting depth
    Plunge,
    /// Vertical move up to retract height
    Retract,
    /// Traverse at retract height
    Rapid,
}

impl MoveKind {
    /// True for moves that remove material.
    pub fn is_cutting(self) -> bool {
        matches!(self, MoveKind::Cut | MoveKind::Transition)
    }
}

/// A single segment of a toolpath.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolpathSegment {
    pub motion: Motion,
    pub kind: MoveKind,
    pub start: Point,
    pub end: Point,
    /// Nominal feed in mm/min.
    pub feed_rate: f64,
    /// 0.9 for arcs, 1.0 for lines.
    pub engagement_factor: f64,
    /// Vertical travel in mm (plunge and retract only).
    pub z_travel: f64,
}

impl ToolpathSegment {
    /// Creates a straight move.
    pub fn line(kind: MoveKind, start: Point, end: Point, feed_rate: f64) -> Self {
        Self {
            motion: Motion::Line,
            kind,
            start,
            end,
            feed_rate,
            engagement_factor: LINE_ENGAGEMENT,
            z_travel: 0.0,
        }
    }

    /// Creates a circular arc move.
    pub fn arc(
        kind: MoveKind,
        start: Point,
        end: Point,
        center: Point,
        clockwise: bool,
        feed_rate: f64,
    ) -> Self {
        Self {
            motion: Motion::Arc {
                center,
                radius: start.distance_to(&center),
                clockwise,
            },
            kind,
            start,
            end,
            feed_rate,
            engagement_factor: ARC_ENGAGEMENT,
            z_travel: 0.0,
        }
    }

    pub fn plunge(at: Point, depth: f64, feed_rate: f64) -> Self {
        Self {
            z_travel: depth,
            ..Self::line(MoveKind::Plunge, at, at, feed_rate)
        }
    }

    pub fn retract(at: Point, height: f64, feed_rate: f64) -> Self {
        Self {
            z_travel: height,
            ..Self::line(MoveKind::Retract, at, at, feed_rate)
        }
    }

    pub fn rapid(start: Point, end: Point, feed_rate: f64) -> Self {
        Self::line(MoveKind::Rapid, start, end, feed_rate)
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.motion, Motion::Arc { .. })
    }

    pub fn is_cutting(&self) -> bool {
        self.kind.is_cutting()
    }

    /// Absolute swept angle of an arc in radians, zero for lines.
    pub fn sweep(&self) -> f64 {
        match self.motion {
            Motion::Line => 0.0,
            Motion::Arc {
                center, clockwise, ..
            } => {
                let a0 = self.start.angle_from(&center);
                let a1 = self.end.angle_from(&center);
                let d = if clockwise { a0 - a1 } else { a1 - a0 };
                d.rem_euclid(TAU)
            }
        }
    }

    /// Length of the move in the XY plane.
    pub fn planar_length(&self) -> f64 {
        match self.motion {
            Motion::Line => self.start.distance_to(&self.end),
            Motion::Arc { radius, .. } => radius * self.sweep(),
        }
    }

    /// Total path length including vertical travel.
    pub fn length(&self) -> f64 {
        self.planar_length().hypot(self.z_travel)
    }
}
