//! Accumulated shape of one grown region.

use std::collections::BTreeSet;

use glam::DVec3;

use super::kernels::RegionShape;
use super::Marker;
use crate::brick::ID_MASK;
use crate::cell::CellKey;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BranchPoint {
    pub key: CellKey,
    pub sum: u64,
    /// Sum of global voxel positions.
    pub ctr: DVec3,
    /// Finalized regions this one touches, done bit cleared.
    pub cids: BTreeSet<u32>,
    pub bricks: BTreeSet<u32>,
}

impl BranchPoint {
    pub fn from_shape(key: CellKey, shape: &RegionShape, origin: [usize; 3]) -> Self {
        let origin = DVec3::new(origin[0] as f64, origin[1] as f64, origin[2] as f64);
        Self {
            key,
            sum: shape.count,
            ctr: shape.pos_sum + origin * shape.count as f64,
            cids: shape.finalized.iter().map(|&c| c & ID_MASK).collect(),
            bricks: BTreeSet::from([key.brick()]),
        }
    }

    /// Fold another fragment of the same region in. The key stays.
    pub fn merge(&mut self, other: &BranchPoint) {
        self.sum += other.sum;
        self.ctr += other.ctr;
        self.cids.extend(other.cids.iter().copied());
        self.bricks.extend(other.bricks.iter().copied());
    }

    pub fn centroid(&self) -> DVec3 {
        if self.sum == 0 {
            return DVec3::ZERO;
        }
        self.ctr / self.sum as f64
    }

    pub fn into_marker(self, spacing: DVec3) -> Marker {
        Marker {
            position: self.centroid() * spacing,
            id: self.key.label() & ID_MASK,
            size: self.sum,
            connections: self.cids,
            bricks: self.bricks,
        }
    }
}
