//! # LuthCAM
//!
//! Pocket-clearing toolpath planning for guitar lutherie, with kinematic and
//! thermal analytics:
//! - Offset rings around islands with a pluggable offset backend
//! - Spiral or lane linking with keepout checks
//! - Jerk-limited time estimates and bottleneck classification
//! - Cutting energy, heat partition and time-binned heat power
//!
//! ## Architecture
//!
//! 1. **luthcam-core** - Geometry, profiles, material library, errors
//! 2. **luthcam-toolpath** - Rings, linking, analytics, plan assembly
//! 3. **luthcam** - Facade, logging setup and the bounded planning service

pub mod service;

pub use luthcam_core::data;
pub use luthcam_core::geometry;

pub use luthcam_core::{
    init_standard_library, Bounds, CancelToken, GeometryError, GeometryOverflowError,
    MachineProfile, MachineProfileError, Material, MaterialCategory, MaterialId,
    MaterialLibrary, MaterialProfile, MaterialProfileError, ParameterError, PlanError,
    PocketInput, Point, Polygon, Result, TimelineError,
};

pub use luthcam_toolpath::{
    Bottleneck, BottleneckHistogram, GeometryLimits, HeatSeries, JoinStyle, MoveKind,
    PathStrategy, PlanConfig, PlanSummary, PlannedSegment, SegmentEnergy, ToolpathAssembler,
    ToolpathPlan, ToolpathSegment,
};

pub use service::{PlanRequest, PlanService, RetryPolicy, ServiceConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
