//! Machine and material data models.

pub mod machine;
pub mod materials;

pub use machine::{MachineLimits, MachineProfile};
pub use materials::{
    init_standard_library, HeatPartition, Material, MaterialCategory, MaterialId,
    MaterialLibrary, MaterialProfile, MaterialSpec,
};
