//! Configuration for the analysis and growing passes.
//!
//! Every bound the passes rely on (branch cap, per-group id cap, search budget,
//! iteration count) is an explicit field here. Configs load from YAML or JSON
//! through [`common::load_config`].

use std::path::Path;

use serde::{Deserialize, Serialize};

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Fragments with fewer voxels are dropped after each brick scan.
    /// Only applied to multi-brick volumes; single-brick volumes keep everything.
    pub size_floor: u32,
    /// Maximum number of cells collected by one graph traversal.
    pub branch_cap: usize,
    /// Edges seen on fewer touching voxel pairs are not followed during traversal.
    pub min_contact: u32,
    /// Maximum candidates tried when searching a collision-free replacement id.
    pub max_id_attempts: u32,
    /// Optional lower bound of the size window. Raises the size floor during
    /// analysis, for single-brick volumes too, and bounds [`count`] from below
    /// (exclusive).
    ///
    /// [`count`]: crate::ComponentAnalyzer::count
    pub min_size: Option<u32>,
    /// Optional upper bound (exclusive) of the size window used by counting.
    pub max_size: Option<u32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            size_floor: 5,
            branch_cap: 256,
            min_contact: 1,
            max_id_attempts: 1 << 16,
            min_size: None,
            max_size: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) {
        assert!(self.branch_cap >= 1, "branch_cap must be at least 1");
        assert!(self.min_contact >= 1, "min_contact must be at least 1");
        assert!(self.max_id_attempts >= 1, "max_id_attempts must be at least 1");
        if let (Some(lo), Some(hi)) = (self.min_size, self.max_size) {
            assert!(lo < hi, "min_size {lo} must be below max_size {hi}");
        }
    }

    pub fn from_file(path: &Path) -> common::SerdeFormatResult<Self> {
        common::load_config(path)
    }
}

// ============================================================================
// Grower
// ============================================================================

/// How S0 treats voxels that already carry a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeedPolicy {
    /// Reseed every masked voxel and clear unmasked ones. Finalized voxels are kept.
    #[default]
    Fresh,
    /// Seed only masked voxels whose label is zero, preserving prior growth.
    KeepExisting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowerConfig {
    pub seed_policy: SeedPolicy,
    /// Number of reverse+forward grow pass pairs per brick.
    pub grow_iterations: usize,
    /// Work group extent in voxels along x, y, z.
    pub work_group: [usize; 3],
    /// Distinct ids a single work group may report during counting.
    pub max_group_ids: usize,
    /// Regions with fewer voxels do not produce markers.
    pub size_threshold: u64,
}

impl Default for GrowerConfig {
    fn default() -> Self {
        Self {
            seed_policy: SeedPolicy::Fresh,
            grow_iterations: 2,
            work_group: [8, 8, 8],
            max_group_ids: 10,
            size_threshold: 10,
        }
    }
}

impl GrowerConfig {
    pub fn validate(&self) {
        assert!(
            self.work_group.iter().all(|&n| n > 0),
            "work_group extents must be positive, got {:?}",
            self.work_group
        );
        assert!(self.max_group_ids >= 1, "max_group_ids must be at least 1");
    }

    pub fn from_file(path: &Path) -> common::SerdeFormatResult<Self> {
        common::load_config(path)
    }
}
