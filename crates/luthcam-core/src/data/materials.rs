//! Material profiles and the lutherie material library
//!
//! A [`MaterialProfile`] carries what the energy model needs: specific cutting
//! energy and the split of cutting heat between chip, tool and workpiece.
//! The [`MaterialLibrary`] bundles profiles for common instrument materials.

use crate::error::MaterialProfileError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tolerance on the heat-partition sum.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Split of cutting heat between chip, tool and workpiece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPartition {
    pub chip: f64,
    pub tool: f64,
    pub work: f64,
}

impl HeatPartition {
    pub fn new(chip: f64, tool: f64, work: f64) -> Self {
        Self { chip, tool, work }
    }

    pub fn sum(&self) -> f64 {
        self.chip + self.tool + self.work
    }
}

/// Validated cutting properties of a material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MaterialSpec", into = "MaterialSpec")]
pub struct MaterialProfile {
    specific_cutting_energy: f64,
    partition: HeatPartition,
}

/// Unvalidated material data as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// Specific cutting energy in J/mm³.
    pub sce: f64,
    pub chip: f64,
    pub tool: f64,
    pub work: f64,
}

impl MaterialProfile {
    /// Creates a material profile.
    ///
    /// * `specific_cutting_energy` - J/mm³, strictly positive
    /// * `partition` - non-negative fractions summing to 1.0 ± 1e-6
    pub fn new(
        specific_cutting_energy: f64,
        partition: HeatPartition,
    ) -> Result<Self, MaterialProfileError> {
        if !specific_cutting_energy.is_finite() {
            return Err(MaterialProfileError::NonFinite {
                field: "specific_cutting_energy",
            });
        }
        if specific_cutting_energy <= 0.0 {
            return Err(MaterialProfileError::NonPositiveEnergy {
                value: specific_cutting_energy,
            });
        }
        for (channel, value) in [
            ("chip", partition.chip),
            ("tool", partition.tool),
            ("work", partition.work),
        ] {
            if !value.is_finite() {
                return Err(MaterialProfileError::NonFinite { field: channel });
            }
            if value < 0.0 {
                return Err(MaterialProfileError::NegativeFraction { channel, value });
            }
        }
        let sum = partition.sum();
        if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
            return Err(MaterialProfileError::FractionSum { sum });
        }
        Ok(Self {
            specific_cutting_energy,
            partition,
        })
    }

    /// Shorthand for `new(sce, HeatPartition::new(chip, tool, work))`.
    pub fn from_parts(
        sce: f64,
        chip: f64,
        tool: f64,
        work: f64,
    ) -> Result<Self, MaterialProfileError> {
        Self::new(sce, HeatPartition::new(chip, tool, work))
    }

    /// Specific cutting energy in J/mm³.
    pub fn specific_cutting_energy(&self) -> f64 {
        self.specific_cutting_energy
    }

    pub fn partition(&self) -> HeatPartition {
        self.partition
    }

    pub fn chip_fraction(&self) -> f64 {
        self.partition.chip
    }

    pub fn tool_fraction(&self) -> f64 {
        self.partition.tool
    }

    pub fn work_fraction(&self) -> f64 {
        self.partition.work
    }
}

impl TryFrom<MaterialSpec> for MaterialProfile {
    type Error = MaterialProfileError;

    fn try_from(s: MaterialSpec) -> Result<Self, Self::Error> {
        MaterialProfile::from_parts(s.sce, s.chip, s.tool, s.work)
    }
}

impl From<MaterialProfile> for MaterialSpec {
    fn from(p: MaterialProfile) -> Self {
        MaterialSpec {
            sce: p.specific_cutting_energy,
            chip: p.partition.chip,
            tool: p.partition.tool,
            work: p.partition.work,
        }
    }
}

/// Material category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    /// Soundboard woods (spruce, cedar)
    Tonewood,
    /// Back, side and neck hardwoods
    Hardwood,
    /// Fingerboard and bridge woods
    Fretboard,
    /// Nut and saddle blanks
    NutAndSaddle,
    /// Inlay and hardware metals
    Metal,
    /// Carbon fiber and similar reinforcement
    Composite,
}

impl std::fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tonewood => write!(f, "Tonewood"),
            Self::Hardwood => write!(f, "Hardwood"),
            Self::Fretboard => write!(f, "Fretboard"),
            Self::NutAndSaddle => write!(f, "Nut and Saddle"),
            Self::Metal => write!(f, "Metal"),
            Self::Composite => write!(f, "Composite"),
        }
    }
}

/// Unique identifier for materials
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub String);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named material with its cutting profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub category: MaterialCategory,
    pub profile: MaterialProfile,
    /// Brittle materials chip at sudden engagement changes and favour lane
    /// clearing over spiral.
    pub brittle: bool,
    pub notes: String,
}

impl Material {
    pub fn new(id: &str, name: &str, category: MaterialCategory, profile: MaterialProfile) -> Self {
        Self {
            id: MaterialId(id.to_string()),
            name: name.to_string(),
            category,
            profile,
            brittle: false,
            notes: String::new(),
        }
    }
}

/// Library of material profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Material>,
}

impl MaterialLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material, replacing any with the same id
    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.id.clone(), material);
    }

    pub fn get_material(&self, id: &MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn remove_material(&mut self, id: &MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// All materials sorted by id.
    pub fn get_all_materials(&self) -> Vec<&Material> {
        let mut all: Vec<&Material> = self.materials.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn get_materials_by_category(&self, category: MaterialCategory) -> Vec<&Material> {
        let mut found: Vec<&Material> = self
            .materials
            .values()
            .filter(|m| m.category == category)
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// Search materials by name (partial match, case-insensitive)
    pub fn search_by_name(&self, query: &str) -> Vec<&Material> {
        let query_lower = query.to_lowercase();
        let mut found: Vec<&Material> = self
            .materials
            .values()
            .filter(|m| m.name.to_lowercase().contains(&query_lower))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Builds the standard lutherie library.
///
/// Specific cutting energies are shop estimates for carbide routing and
/// should be calibrated per machine.
pub fn init_standard_library() -> Result<MaterialLibrary, MaterialProfileError> {
    let presets: [(&str, &str, MaterialCategory, f64, [f64; 3], bool); 8] = [
        ("spruce_sitka", "Sitka Spruce", MaterialCategory::Tonewood, 0.04, [0.75, 0.10, 0.15], false),
        ("mahogany_honduran", "Honduran Mahogany", MaterialCategory::Hardwood, 0.08, [0.72, 0.13, 0.15], false),
        ("maple_hard", "Hard Maple", MaterialCategory::Hardwood, 0.12, [0.70, 0.16, 0.14], false),
        ("rosewood_indian", "Indian Rosewood", MaterialCategory::Fretboard, 0.14, [0.70, 0.18, 0.12], false),
        ("ebony_gaboon", "Gaboon Ebony", MaterialCategory::Fretboard, 0.20, [0.68, 0.20, 0.12], true),
        ("bone_bovine", "Bovine Bone", MaterialCategory::NutAndSaddle, 0.35, [0.60, 0.25, 0.15], true),
        ("brass_c360", "Brass C360", MaterialCategory::Metal, 0.80, [0.75, 0.15, 0.10], false),
        ("carbon_fiber", "Carbon Fiber Rod", MaterialCategory::Composite, 0.55, [0.70, 0.20, 0.10], true),
    ];

    let mut library = MaterialLibrary::new();
    for (id, name, category, sce, [chip, tool, work], brittle) in presets {
        let mut material = Material::new(
            id,
            name,
            category,
            MaterialProfile::from_parts(sce, chip, tool, work)?,
        );
        material.brittle = brittle;
        library.add_material(material);
    }
    Ok(library)
}
