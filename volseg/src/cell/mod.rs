//! Per-fragment statistics.
//!
//! A [`Cell`] accumulates statistics for one labeled fragment inside one brick.
//! Fragments are identified by a [`CellKey`] that packs the brick id into the
//! high 32 bits and the label into the low 32 bits. [`CelpList`] owns all cells
//! of an analysis run.

mod list;
mod pca;


pub use list::{CellId, CelpList};
pub use pca::Pca;

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

// ============================================================================
// Keys
// ============================================================================

/// Composite `(brick, label)` key, ordered brick-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey(u64);

impl CellKey {
    #[inline]
    pub const fn new(label: u32, brick: u32) -> Self {
        Self(((brick as u64) << 32) | label as u64)
    }

    #[inline]
    pub const fn label(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn brick(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.brick(), self.label())
    }
}

// ============================================================================
// Samples
// ============================================================================

/// One voxel contributing to a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSample {
    /// Normalized intensity in (0, 1].
    pub value: f64,
    /// Voxel lies on the fragment's surface.
    pub surface: bool,
    /// Global voxel coordinate.
    pub pos: DVec3,
}

/// Reading of one colocalization channel at a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColocSample {
    pub value: f64,
}

impl ColocSample {
    #[inline]
    pub fn present(self) -> bool {
        self.value > 0.0
    }
}

// ============================================================================
// Cell
// ============================================================================

/// Axis-aligned bounds over accumulated voxel positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds3 {
    #[inline]
    fn point(p: DVec3) -> Self {
        Self { min: p, max: p }
    }

    #[inline]
    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min + DVec3::ONE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    key: CellKey,
    size_ui: u32,
    size_d: f64,
    ext_ui: u32,
    ext_d: f64,
    int2: f64,
    min: f64,
    max: f64,
    pos: DVec3,
    bounds: Option<Bounds3>,
    pca: Pca,
    coloc_ui: Vec<u32>,
    coloc_d: Vec<f64>,
}

impl Cell {
    pub fn new(key: CellKey) -> Self {
        Self {
            key,
            size_ui: 0,
            size_d: 0.0,
            ext_ui: 0,
            ext_d: 0.0,
            int2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            pos: DVec3::ZERO,
            bounds: None,
            pca: Pca::default(),
            coloc_ui: Vec::new(),
            coloc_d: Vec::new(),
        }
    }

    /// Add one voxel. `spacing` scales the position fed into the shape
    /// accumulator; `coloc` holds one reading per colocalization channel.
    pub fn inc(&mut self, sample: &VoxelSample, spacing: DVec3, coloc: Option<&[ColocSample]>) {
        let v = sample.value;
        self.size_ui += 1;
        self.size_d += v;
        if sample.surface {
            self.ext_ui += 1;
            self.ext_d += v;
        }
        self.int2 += v * v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.pos += sample.pos;
        let b = Bounds3::point(sample.pos);
        self.bounds = Some(self.bounds.map_or(b, |cur| cur.union(b)));
        self.pca.add_point(sample.pos * spacing);

        if let Some(coloc) = coloc {
            if self.coloc_ui.len() < coloc.len() {
                self.coloc_ui.resize(coloc.len(), 0);
                self.coloc_d.resize(coloc.len(), 0.0);
            }
            for (c, s) in coloc.iter().enumerate() {
                self.coloc_ui[c] += s.present() as u32;
                self.coloc_d[c] += s.value;
            }
        }
    }

    /// Fold another cell's statistics into this one. Keys are untouched.
    pub fn merge(&mut self, other: &Cell) {
        self.size_ui += other.size_ui;
        self.size_d += other.size_d;
        self.ext_ui += other.ext_ui;
        self.ext_d += other.ext_d;
        self.int2 += other.int2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.pos += other.pos;
        self.bounds = match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        self.pca.merge(&other.pca);

        if self.coloc_ui.len() < other.coloc_ui.len() {
            self.coloc_ui.resize(other.coloc_ui.len(), 0);
            self.coloc_d.resize(other.coloc_d.len(), 0.0);
        }
        for (c, (&n, &d)) in other.coloc_ui.iter().zip(&other.coloc_d).enumerate() {
            self.coloc_ui[c] += n;
            self.coloc_d[c] += d;
        }
    }

    /// Overwrite every statistic with `other`'s, keeping this cell's key.
    pub fn copy_stats_from(&mut self, other: &Cell) {
        let key = self.key;
        self.clone_from(other);
        self.key = key;
    }

    #[inline]
    pub fn key(&self) -> CellKey {
        self.key
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.key.label()
    }

    #[inline]
    pub fn brick(&self) -> u32 {
        self.key.brick()
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.key = CellKey::new(id, self.key.brick());
    }

    #[inline]
    pub fn size_ui(&self) -> u32 {
        self.size_ui
    }

    #[inline]
    pub fn size_d(&self, scale: f64) -> f64 {
        self.size_d * scale
    }

    #[inline]
    pub fn ext_ui(&self) -> u32 {
        self.ext_ui
    }

    #[inline]
    pub fn ext_d(&self, scale: f64) -> f64 {
        self.ext_d * scale
    }

    pub fn mean(&self, scale: f64) -> f64 {
        if self.size_ui == 0 {
            return 0.0;
        }
        self.size_d / self.size_ui as f64 * scale
    }

    /// Population standard deviation of voxel values.
    pub fn std(&self, scale: f64) -> f64 {
        if self.size_ui == 0 {
            return 0.0;
        }
        let n = self.size_ui as f64;
        let mean = self.size_d / n;
        let var = (self.int2 + n * mean * mean - 2.0 * mean * self.size_d) / n;
        var.max(0.0).sqrt() * scale
    }

    pub fn min(&self, scale: f64) -> f64 {
        if self.size_ui == 0 {
            return 0.0;
        }
        self.min * scale
    }

    pub fn max(&self, scale: f64) -> f64 {
        if self.size_ui == 0 {
            return 0.0;
        }
        self.max * scale
    }

    /// Mean voxel position scaled by spacing.
    pub fn center(&self, spacing: DVec3) -> DVec3 {
        if self.size_ui == 0 {
            return DVec3::ZERO;
        }
        self.pos / self.size_ui as f64 * spacing
    }

    pub fn bounds(&self) -> Option<Bounds3> {
        self.bounds
    }

    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    /// Principal axis lengths, longest first.
    pub fn pca_lengths(&self) -> DVec3 {
        self.pca.lengths()
    }

    pub fn coloc_channels(&self) -> usize {
        self.coloc_ui.len()
    }

    /// Voxels where colocalization channel `c` is nonzero.
    pub fn coloc_size_ui(&self, c: usize) -> u32 {
        self.coloc_ui.get(c).copied().unwrap_or(0)
    }

    /// Sum of colocalization channel `c` over the fragment.
    pub fn coloc_size_d(&self, c: usize) -> f64 {
        self.coloc_d.get(c).copied().unwrap_or(0.0)
    }
}
