//! Dominant kinematic constraint per segment.

use crate::segment::ToolpathSegment;
use luthcam_core::data::MachineProfile;
use luthcam_core::units::mm_per_min_to_mm_per_sec;
use serde::Serialize;

/// Feeds at or above this fraction of the machine maximum are feed-capped.
pub const FEED_CAP_RATIO: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    FeedCap,
    Accel,
    Jerk,
    None,
}

impl Bottleneck {
    pub const ALL: [Bottleneck; 4] = [
        Bottleneck::FeedCap,
        Bottleneck::Accel,
        Bottleneck::Jerk,
        Bottleneck::None,
    ];
}

impl std::fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeedCap => write!(f, "feed_cap"),
            Self::Accel => write!(f, "accel"),
            Self::Jerk => write!(f, "jerk"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Labels segments by a fixed priority chain: feed cap, then acceleration,
/// then jerk.
#[derive(Debug, Clone, Copy)]
pub struct BottleneckClassifier<'m> {
    machine: &'m MachineProfile,
}

impl<'m> BottleneckClassifier<'m> {
    pub fn new(machine: &'m MachineProfile) -> Self {
        Self { machine }
    }

    pub fn classify(&self, segment: &ToolpathSegment) -> Bottleneck {
        classify_move(segment.length(), segment.feed_rate, self.machine)
    }

    pub fn classify_all(&self, segments: &[ToolpathSegment]) -> Vec<Bottleneck> {
        segments.iter().map(|s| self.classify(s)).collect()
    }
}

/// Classifies a move of `length` mm at nominal `feed` mm/min.
pub fn classify_move(length: f64, feed: f64, machine: &MachineProfile) -> Bottleneck {
    if feed >= FEED_CAP_RATIO * machine.max_feed() {
        return Bottleneck::FeedCap;
    }
    let v = mm_per_min_to_mm_per_sec(feed);
    let a = machine.acceleration();
    if length < v * v / (2.0 * a) {
        return Bottleneck::Accel;
    }
    if length < v * v * v / (machine.jerk() * a) {
        return Bottleneck::Jerk;
    }
    Bottleneck::None
}

pub fn classify(segment: &ToolpathSegment, machine: &MachineProfile) -> Bottleneck {
    BottleneckClassifier::new(machine).classify(segment)
}

/// Segment counts per bottleneck class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BottleneckHistogram {
    pub feed_cap: usize,
    pub accel: usize,
    pub jerk: usize,
    pub none: usize,
}

impl BottleneckHistogram {
    pub fn record(&mut self, bottleneck: Bottleneck) {
        match bottleneck {
            Bottleneck::FeedCap => self.feed_cap += 1,
            Bottleneck::Accel => self.accel += 1,
            Bottleneck::Jerk => self.jerk += 1,
            Bottleneck::None => self.none += 1,
        }
    }

    pub fn count(&self, bottleneck: Bottleneck) -> usize {
        match bottleneck {
            Bottleneck::FeedCap => self.feed_cap,
            Bottleneck::Accel => self.accel,
            Bottleneck::Jerk => self.jerk,
            Bottleneck::None => self.none,
        }
    }

    pub fn total(&self) -> usize {
        self.feed_cap + self.accel + self.jerk + self.none
    }
}

impl FromIterator<Bottleneck> for BottleneckHistogram {
    fn from_iter<I: IntoIterator<Item = Bottleneck>>(iter: I) -> Self {
        let mut histogram = Self::default();
        for b in iter {
            histogram.record(b);
        }
        histogram
    }
}
