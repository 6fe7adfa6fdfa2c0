//! Dense working copies of brick channels.
//!
//! Brick grids may be pitched. Passes copy the extent into dense x-fastest
//! buffers, work on those, and write results back explicitly.

use std::sync::atomic::{AtomicU32, Ordering};

use common::Grid3;

use super::Brick;

#[inline]
pub(crate) fn dense_index(dims: [usize; 3], i: usize, j: usize, k: usize) -> usize {
    (k * dims[1] + j) * dims[0] + i
}

#[inline]
pub(crate) fn dense_coords(dims: [usize; 3], idx: usize) -> [usize; 3] {
    let i = idx % dims[0];
    let j = (idx / dims[0]) % dims[1];
    let k = idx / (dims[0] * dims[1]);
    [i, j, k]
}

/// Read-only channel copies for the statistics scan.
#[derive(Debug)]
pub(crate) struct AnalyzeScratch {
    pub dims: [usize; 3],
    /// Normalized intensity.
    pub data: Vec<f64>,
    pub mask: Option<Vec<u8>>,
    pub label: Vec<u32>,
}

impl AnalyzeScratch {
    pub fn load(brick: &Brick, with_mask: bool) -> Self {
        Self {
            dims: brick.dims(),
            data: brick.data().pack_normalized(),
            mask: if with_mask {
                brick.mask().map(Grid3::pack)
            } else {
                None
            },
            label: brick.label().pack(),
        }
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        dense_index(self.dims, i, j, k)
    }

    #[inline]
    pub fn label_at(&self, i: usize, j: usize, k: usize) -> u32 {
        self.label[self.index(i, j, k)]
    }
}

/// Label buffer shared by parallel grow kernels.
///
/// Kernels read and write with relaxed atomics. Voxels of one work group may
/// observe writes from neighboring groups mid-pass; growth tolerates that since
/// every write only raises a label toward its component maximum.
#[derive(Debug)]
pub(crate) struct LabelScratch {
    dims: [usize; 3],
    labels: Vec<AtomicU32>,
}

impl LabelScratch {
    pub fn load(label: &Grid3<u32>) -> Self {
        Self {
            dims: label.dims(),
            labels: label.rows().flatten().map(|&v| AtomicU32::new(v)).collect(),
        }
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        dense_index(self.dims, i, j, k)
    }

    #[inline]
    pub fn get(&self, idx: usize) -> u32 {
        self.labels[idx].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, idx: usize, value: u32) {
        self.labels[idx].store(value, Ordering::Relaxed);
    }

    pub fn to_dense(&self) -> Vec<u32> {
        self.labels
            .iter()
            .map(|v| v.load(Ordering::Relaxed))
            .collect()
    }

    /// Write the buffer back into the brick's label grid, leaving padding as is.
    pub fn store(&self, label: &mut Grid3<u32>) {
        label.unpack(&self.to_dense());
    }
}
