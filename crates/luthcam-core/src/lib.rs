//! # LuthCAM Core
//!
//! Core types for LuthCAM pocket planning.
//! Provides validated geometry, machine and material profiles, a grid
//! spatial index, cooperative cancellation and the shared error taxonomy.

pub mod cancel;
pub mod data;
pub mod error;
pub mod geometry;
pub mod spatial_index;
pub mod units;

pub use cancel::CancelToken;

pub use data::{
    init_standard_library, HeatPartition, MachineProfile, Material, MaterialCategory,
    MaterialId, MaterialLibrary, MaterialProfile,
};

pub use error::{
    GeometryError, GeometryOverflowError, MachineProfileError, MaterialProfileError,
    ParameterError, PlanError, Result, TimelineError,
};

pub use geometry::{Bounds, PocketInput, Point, Polygon};
pub use spatial_index::GridIndex;
