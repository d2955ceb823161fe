//! Machine kinematic profiles.

use crate::error::MachineProfileError;
use serde::{Deserialize, Serialize};

/// Kinematic limits of a CNC machine.
///
/// All limits are validated strictly positive and finite at construction;
/// deserialisation goes through the same checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MachineLimits", into = "MachineLimits")]
pub struct MachineProfile {
    max_feed: f64,
    acceleration: f64,
    jerk: f64,
    rapid_feed: f64,
}

/// Unvalidated machine limits as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineLimits {
    /// Maximum feed in mm/min.
    pub max_feed: f64,
    /// Acceleration in mm/s².
    pub acceleration: f64,
    /// Jerk in mm/s³.
    pub jerk: f64,
    /// Rapid traverse feed in mm/min.
    pub rapid_feed: f64,
}

impl MachineProfile {
    /// Creates a validated machine profile.
    ///
    /// * `max_feed` - mm/min
    /// * `acceleration` - mm/s²
    /// * `jerk` - mm/s³
    /// * `rapid_feed` - mm/min
    pub fn new(
        max_feed: f64,
        acceleration: f64,
        jerk: f64,
        rapid_feed: f64,
    ) -> Result<Self, MachineProfileError> {
        for (field, value) in [
            ("max_feed", max_feed),
            ("acceleration", acceleration),
            ("jerk", jerk),
            ("rapid_feed", rapid_feed),
        ] {
            if !value.is_finite() {
                return Err(MachineProfileError::NonFinite { field });
            }
            if value <= 0.0 {
                return Err(MachineProfileError::NonPositive { field, value });
            }
        }
        Ok(Self {
            max_feed,
            acceleration,
            jerk,
            rapid_feed,
        })
    }

    /// Small desktop router typical of hobby lutherie shops.
    pub fn desktop_router() -> Self {
        Self {
            max_feed: 3000.0,
            acceleration: 500.0,
            jerk: 5000.0,
            rapid_feed: 5000.0,
        }
    }

    /// Rigid production router.
    pub fn production_router() -> Self {
        Self {
            max_feed: 12000.0,
            acceleration: 1500.0,
            jerk: 30000.0,
            rapid_feed: 20000.0,
        }
    }

    /// Maximum feed in mm/min.
    pub fn max_feed(&self) -> f64 {
        self.max_feed
    }

    /// Acceleration in mm/s².
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Jerk in mm/s³.
    pub fn jerk(&self) -> f64 {
        self.jerk
    }

    /// Rapid traverse feed in mm/min.
    pub fn rapid_feed(&self) -> f64 {
        self.rapid_feed
    }
}

impl TryFrom<MachineLimits> for MachineProfile {
    type Error = MachineProfileError;

    fn try_from(l: MachineLimits) -> Result<Self, Self::Error> {
        MachineProfile::new(l.max_feed, l.acceleration, l.jerk, l.rapid_feed)
    }
}

impl From<MachineProfile> for MachineLimits {
    fn from(p: MachineProfile) -> Self {
        MachineLimits {
            max_feed: p.max_feed,
            acceleration: p.acceleration,
            jerk: p.jerk,
            rapid_feed: p.rapid_feed,
        }
    }
}
