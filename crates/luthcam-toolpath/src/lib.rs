//! # LuthCAM Toolpath
//!
//! Pocket clearing for lutherie parts: offset rings around islands, linked
//! into a spiral or lane toolpath, then annotated with kinematic time,
//! bottleneck class and cutting energy.
//!
//! ## Pipeline
//!
//! ```text
//! PocketInput
//!   └── GeometryOffsetEngine   (rings, via OffsetBackend)
//!         └── PathLinker       (spiral / lane, keepout checked)
//!               ├── MotionProfileEstimator
//!               ├── BottleneckClassifier
//!               └── EnergyHeatModel
//!                     └── ToolpathPlan
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use luthcam_toolpath::{PlanConfig, ToolpathAssembler};
//!
//! let plan = ToolpathAssembler::new(PlanConfig::default()).plan(&pocket, &machine, &material)?;
//! println!("{:.1} s", plan.summary().total_time);
//! ```

pub mod arc_fit;
pub mod backend;
pub mod bottleneck;
pub mod cavalier;
pub mod config;
pub mod energy;
pub mod keepout;
pub mod linker;
pub mod motion;
pub mod plan;
pub mod rings;
pub mod segment;

pub use arc_fit::{ArcFitter, ArcFittingConfig, FitPiece, FittedArc};
pub use backend::{BackendError, Contour, JoinSpec, OffsetBackend};
pub use bottleneck::{Bottleneck, BottleneckClassifier, BottleneckHistogram};
pub use cavalier::CavalierBackend;
pub use config::{GeometryLimits, JoinStyle, LinkConfig, PathStrategy, PlanConfig, RingParams};
pub use energy::{compute_energy, compute_heat_timeseries, EnergyHeatModel, HeatSeries, SegmentEnergy};
pub use keepout::{KeepoutGuard, Obstacle, Violation};
pub use linker::{link_rings, LinkedPath, LinkerState, PathLinker};
pub use motion::{estimate_times, segment_time, MotionBranch, MotionProfileEstimator, SegmentTime};
pub use plan::{PlanSummary, PlannedSegment, ToolpathAssembler, ToolpathPlan};
pub use rings::{build_rings, iteration_bound, GeometryOffsetEngine, OffsetRing};
pub use segment::{Motion, MoveKind, ToolpathSegment};
