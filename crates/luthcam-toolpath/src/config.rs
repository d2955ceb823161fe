//! Planning configuration
//!
//! [`PlanConfig`] carries every per-request knob of the pipeline. It loads
//! from JSON, fills missing fields with defaults and is validated before any
//! geometry work starts. [`RingParams`] and [`LinkConfig`] are the narrower
//! views handed to the ring engine and the linker.

use luthcam_core::error::{ParameterError, PlanError};
use serde::{Deserialize, Serialize};

/// Corner treatment for offset curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// Circular arc flattened to `arc_tolerance`
    #[default]
    Round,
    /// Flat bevel at the offset distance
    Square,
    /// Sharp corner, clamped by `miter_limit`
    Miter,
}

impl std::fmt::Display for JoinStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Round => write!(f, "round"),
            Self::Square => write!(f, "square"),
            Self::Miter => write!(f, "miter"),
        }
    }
}

/// How offset rings are stitched into one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStrategy {
    /// Short transitions between rings, no retracts
    #[default]
    Spiral,
    /// Retract and plunge between rings
    Lane,
}

impl std::fmt::Display for PathStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spiral => write!(f, "spiral"),
            Self::Lane => write!(f, "lane"),
        }
    }
}

/// Hard caps that bound work on pathological input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryLimits {
    pub max_islands: usize,
    /// Upper bound on the computed ring iteration bound.
    pub max_ring_iterations: usize,
    /// Total vertices across all emitted rings.
    pub max_vertices: usize,
    /// Bisection steps when searching for the center cleanup ring.
    pub cleanup_steps: usize,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            max_islands: 1000,
            max_ring_iterations: 10_000,
            max_vertices: 500_000,
            cleanup_steps: 24,
        }
    }
}

/// Inputs of the offset ring engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingParams {
    pub tool_diameter: f64,
    pub stepover_fraction: f64,
    pub margin: f64,
    pub join_style: JoinStyle,
    pub arc_tolerance: f64,
    pub miter_limit: f64,
    pub limits: GeometryLimits,
}

impl RingParams {
    pub fn tool_radius(&self) -> f64 {
        self.tool_diameter / 2.0
    }

    /// Absolute stepover in mm.
    pub fn stepover(&self) -> f64 {
        self.stepover_fraction * self.tool_diameter
    }

    /// Offset of the tool center from every wall and island.
    pub fn clearance(&self) -> f64 {
        self.tool_radius() + self.margin
    }
}

/// Inputs of the path linker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    pub strategy: PathStrategy,
    /// Cutting feed in mm/min.
    pub feed_rate: f64,
    /// Plunge feed in mm/min.
    pub plunge_rate: f64,
    /// Feed used for rapid traverses in mm/min.
    pub rapid_feed: f64,
    /// Height of retract moves above the cutting plane in mm.
    pub retract_height: f64,
    /// Half-width of the transition search window in degrees.
    pub transition_window_deg: f64,
    pub fit_arcs: bool,
    pub arc_tolerance: f64,
}

/// Complete configuration of one planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Tool diameter in mm
    pub tool_diameter: f64,
    /// Stepover as a fraction of tool diameter, in (0, 1]
    pub stepover_fraction: f64,
    /// Depth of cut per pass in mm
    pub stepdown: f64,
    /// Extra clearance kept from walls and islands in mm
    pub margin: f64,
    pub strategy: PathStrategy,
    pub join_style: JoinStyle,
    /// Maximum deviation of a flattened offset curve in mm
    pub arc_tolerance: f64,
    /// Miter length limit as a multiple of the offset distance
    pub miter_limit: f64,
    /// Cutting feed in mm/min
    pub feed_rate: f64,
    /// Plunge feed in mm/min
    pub plunge_rate: f64,
    /// Retract height in mm
    pub retract_height: f64,
    /// Spiral transition search window in degrees
    pub transition_window_deg: f64,
    /// Replace flattened ring runs with arc moves
    pub fit_arcs: bool,
    /// Heat series bin count
    pub heat_bins: usize,
    pub limits: GeometryLimits,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            tool_diameter: 6.0,
            stepover_fraction: 0.45,
            stepdown: 1.5,
            margin: 0.0,
            strategy: PathStrategy::Spiral,
            join_style: JoinStyle::Round,
            arc_tolerance: 0.01,
            miter_limit: 2.0,
            feed_rate: 1200.0,
            plunge_rate: 400.0,
            retract_height: 5.0,
            transition_window_deg: 45.0,
            fit_arcs: true,
            heat_bins: 120,
            limits: GeometryLimits::default(),
        }
    }
}

/// Accepted heat bin range.
pub const MIN_HEAT_BINS: usize = 10;
pub const MAX_HEAT_BINS: usize = 2000;

impl PlanConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PlanError> {
        let config: PlanConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON, readable by [`from_json_str`](Self::from_json_str).
    pub fn to_json_string(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every parameter against its accepted range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        ParameterError::check_positive("tool_diameter", self.tool_diameter)?;
        if !(self.stepover_fraction > 0.0 && self.stepover_fraction <= 1.0) {
            return Err(ParameterError::OutOfRange {
                name: "stepover_fraction".to_string(),
                value: self.stepover_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        ParameterError::check_positive("stepdown", self.stepdown)?;
        ParameterError::check_range("margin", self.margin, 0.0, f64::MAX)?;
        ParameterError::check_positive("arc_tolerance", self.arc_tolerance)?;
        ParameterError::check_range("miter_limit", self.miter_limit, 1.0, f64::MAX)?;
        ParameterError::check_positive("feed_rate", self.feed_rate)?;
        ParameterError::check_positive("plunge_rate", self.plunge_rate)?;
        ParameterError::check_range("retract_height", self.retract_height, 0.0, f64::MAX)?;
        if !(self.transition_window_deg > 0.0 && self.transition_window_deg <= 180.0) {
            return Err(ParameterError::OutOfRange {
                name: "transition_window_deg".to_string(),
                value: self.transition_window_deg,
                min: 0.0,
                max: 180.0,
            });
        }
        ParameterError::check_range(
            "heat_bins",
            self.heat_bins as f64,
            MIN_HEAT_BINS as f64,
            MAX_HEAT_BINS as f64,
        )?;
        if self.limits.max_ring_iterations == 0 || self.limits.max_vertices == 0 {
            return Err(ParameterError::InvalidValue {
                name: "limits".to_string(),
                reason: "iteration and vertex caps must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn ring_params(&self) -> RingParams {
        RingParams {
            tool_diameter: self.tool_diameter,
            stepover_fraction: self.stepover_fraction,
            margin: self.margin,
            join_style: self.join_style,
            arc_tolerance: self.arc_tolerance,
            miter_limit: self.miter_limit,
            limits: self.limits,
        }
    }

    /// Linker view; rapids run at the machine's rapid feed.
    pub fn link_config(&self, rapid_feed: f64) -> LinkConfig {
        LinkConfig {
            strategy: self.strategy,
            feed_rate: self.feed_rate,
            plunge_rate: self.plunge_rate,
            rapid_feed,
            retract_height: self.retract_height,
            transition_window_deg: self.transition_window_deg,
            fit_arcs: self.fit_arcs,
            arc_tolerance: self.arc_tolerance,
        }
    }

    /// Same request with the arc tolerance multiplied by `factor`.
    pub fn coarsened(&self, factor: f64) -> Self {
        Self {
            arc_tolerance: self.arc_tolerance * factor,
            ..self.clone()
        }
    }
}
