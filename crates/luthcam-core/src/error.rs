//! Error handling for LuthCAM
//!
//! Provides typed errors for every stage of pocket planning:
//! - Geometry errors (invalid input, keepout violations)
//! - Overflow errors (inputs exceeding iteration caps)
//! - Profile errors (machine and material validation)
//! - Timeline errors (heat series construction)
//!
//! All error types use `thiserror` and carry enough context (ring, segment,
//! island, parameter) to report a precise diagnostic.

use thiserror::Error;

/// Geometry error type
///
/// Raised for degenerate or invalid polygons and for computed geometry that
/// would violate an island keepout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Polygon has fewer than three distinct points
    #[error("{label} polygon has {count} distinct points, at least 3 required")]
    TooFewPoints {
        /// Which polygon ("outer" or "island N").
        label: String,
        /// Number of distinct points found.
        count: usize,
    },

    /// Polygon encloses no area
    #[error("{label} polygon has zero area")]
    ZeroArea {
        /// Which polygon.
        label: String,
    },

    /// A coordinate is NaN or infinite
    #[error("{label} polygon has a non-finite coordinate at point {index}")]
    NonFiniteCoordinate {
        /// Which polygon.
        label: String,
        /// Index of the offending point.
        index: usize,
    },

    /// Two non-adjacent edges of a polygon cross
    #[error("{label} polygon self-intersects between edges {edge_a} and {edge_b}")]
    SelfIntersection {
        /// Which polygon.
        label: String,
        /// First edge index.
        edge_a: usize,
        /// Second edge index.
        edge_b: usize,
    },

    /// An island is not strictly inside the outer boundary
    #[error("island {island} is not strictly inside the outer boundary")]
    IslandOutsideBoundary {
        /// Island index.
        island: usize,
    },

    /// Two islands touch or overlap
    #[error("islands {first} and {second} overlap")]
    IslandsOverlap {
        /// First island index.
        first: usize,
        /// Second island index.
        second: usize,
    },

    /// A computed ring comes closer to an island than the keepout allows
    #[error(
        "ring {ring} comes within {clearance:.4}mm of island {island} (required {required:.4}mm)"
    )]
    KeepoutViolation {
        /// Ring index.
        ring: usize,
        /// Island index.
        island: usize,
        /// Measured clearance in mm.
        clearance: f64,
        /// Required clearance in mm.
        required: f64,
    },

    /// A linked segment crosses an island keepout or the outer wall
    #[error(
        "segment {segment} comes within {clearance:.4}mm of {obstacle} (required {required:.4}mm)"
    )]
    SegmentCrossesKeepout {
        /// Segment index in path order.
        segment: usize,
        /// What was hit ("island N" or "outer boundary").
        obstacle: String,
        /// Measured clearance in mm.
        clearance: f64,
        /// Required clearance in mm.
        required: f64,
    },

    /// The tool plus margin does not fit anywhere inside the pocket
    #[error("no clearable area: tool diameter {tool_diameter}mm with margin {margin}mm does not fit")]
    NoClearableArea {
        /// Tool diameter in mm.
        tool_diameter: f64,
        /// Margin in mm.
        margin: f64,
    },

    /// The offset/boolean backend failed
    #[error("offset backend failed at ring {ring}: {reason}")]
    Backend {
        /// Ring index being built.
        ring: usize,
        /// Backend message.
        reason: String,
    },

    /// Linker operation called in the wrong state
    #[error("invalid linker state transition from {current} via {operation}")]
    InvalidLinkerState {
        /// Current state name.
        current: String,
        /// Operation that was attempted.
        operation: String,
    },
}

/// Overflow error type
///
/// Raised when input complexity exceeds a bounded iteration or size cap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryOverflowError {
    /// More islands than allowed
    #[error("{count} islands exceeds the limit of {limit}")]
    TooManyIslands {
        /// Islands supplied.
        count: usize,
        /// Configured cap.
        limit: usize,
    },

    /// Computed ring bound exceeds the hard cap
    #[error("ring iteration bound {bound} exceeds hard cap {cap}")]
    IterationBoundExceeded {
        /// Computed bound.
        bound: usize,
        /// Hard cap.
        cap: usize,
    },

    /// Ring generation reached its iteration bound without terminating
    #[error("ring generation did not terminate within {limit} iterations")]
    IterationCapReached {
        /// Iteration bound that was hit.
        limit: usize,
    },

    /// Emitted geometry exceeds the vertex budget
    #[error("ring {ring} pushes vertex count to {count}, limit is {limit}")]
    TooManyVertices {
        /// Ring index at which the budget ran out.
        ring: usize,
        /// Vertex count reached.
        count: usize,
        /// Configured cap.
        limit: usize,
    },
}

/// Machine profile error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MachineProfileError {
    /// A kinematic limit is zero or negative
    #[error("machine {field} must be strictly positive, got {value}")]
    NonPositive {
        /// Field name.
        field: &'static str,
        /// Supplied value.
        value: f64,
    },

    /// A kinematic limit is NaN or infinite
    #[error("machine {field} must be finite")]
    NonFinite {
        /// Field name.
        field: &'static str,
    },
}

/// Material profile error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialProfileError {
    /// Specific cutting energy is zero or negative
    #[error("specific cutting energy must be strictly positive, got {value} J/mm³")]
    NonPositiveEnergy {
        /// Supplied value.
        value: f64,
    },

    /// A heat fraction is negative
    #[error("{channel} heat fraction must not be negative, got {value}")]
    NegativeFraction {
        /// Channel name.
        channel: &'static str,
        /// Supplied value.
        value: f64,
    },

    /// Heat fractions do not sum to one
    #[error("heat fractions sum to {sum}, expected 1.0 ± 1e-6")]
    FractionSum {
        /// Actual sum.
        sum: f64,
    },

    /// A value is NaN or infinite
    #[error("material {field} must be finite")]
    NonFinite {
        /// Field name.
        field: &'static str,
    },
}

/// Timeline error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// Total cut time is zero so no bin width exists
    #[error("degenerate timeline: total cut time is zero")]
    DegenerateTimeline,

    /// Bin count outside the accepted range
    #[error("bin count {bins} outside {min}..={max}")]
    BinsOutOfRange {
        /// Requested bins.
        bins: usize,
        /// Minimum.
        min: usize,
        /// Maximum.
        max: usize,
    },

    /// Segment and time slices disagree in length
    #[error("{segments} segments but {times} segment times")]
    LengthMismatch {
        /// Segment count.
        segments: usize,
        /// Time count.
        times: usize,
    },
}

/// Configuration parameter error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// Value outside its accepted range
    #[error("parameter '{name}' = {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Parameter name.
        name: String,
        /// Supplied value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Value rejected for a reason other than range
    #[error("invalid value for '{name}': {reason}")]
    InvalidValue {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ParameterError {
    /// Checks `value` against an inclusive range.
    pub fn check_range(
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), ParameterError> {
        if !value.is_finite() || value < min || value > max {
            return Err(ParameterError::OutOfRange {
                name: name.to_string(),
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Checks that `value` is finite and strictly greater than zero.
    pub fn check_positive(name: &str, value: f64) -> std::result::Result<(), ParameterError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ParameterError::InvalidValue {
                name: name.to_string(),
                reason: format!("must be strictly positive, got {value}"),
            });
        }
        Ok(())
    }
}

/// Main error type for LuthCAM
///
/// A unified error type that can represent any failure of a planning request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Overflow error
    #[error(transparent)]
    Overflow(#[from] GeometryOverflowError),

    /// Machine profile error
    #[error(transparent)]
    Machine(#[from] MachineProfileError),

    /// Material profile error
    #[error(transparent)]
    Material(#[from] MaterialProfileError),

    /// Timeline error
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Configuration parameter error
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Planning exceeded its wall-clock budget
    #[error("planning timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Planning was cancelled cooperatively
    #[error("planning cancelled")]
    Cancelled,

    /// The worker executing the pipeline failed
    #[error("planning worker failed: {0}")]
    Worker(String),
}

impl PlanError {
    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlanError::Timeout { .. })
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, PlanError::Geometry(_))
    }

    /// Check if this is an overflow error
    pub fn is_overflow(&self) -> bool {
        matches!(self, PlanError::Overflow(_))
    }

    /// Check if this is a machine or material profile error
    pub fn is_profile_error(&self) -> bool {
        matches!(self, PlanError::Machine(_) | PlanError::Material(_))
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Config(err.to_string())
    }
}

/// Result type using PlanError
pub type Result<T> = std::result::Result<T, PlanError>;
