//! Synthetic volume builders shared by unit tests.

use common::Grid3;
use glam::DVec3;

use crate::brick::{BrickVolume, Intensity};

pub fn dense_intensity(dims: [usize; 3], value: u8) -> Intensity {
    Intensity::U8(Grid3::new_filled(dims[0], dims[1], dims[2], value))
}

pub fn labels_from_fn(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> u32) -> Grid3<u32> {
    let mut out = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for k in 0..dims[2] {
        for j in 0..dims[1] {
            for i in 0..dims[0] {
                out.push(f(i, j, k));
            }
        }
    }
    Grid3::new(dims[0], dims[1], dims[2], out)
}

pub fn mask_from_fn(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> bool) -> Grid3<u8> {
    let labels = labels_from_fn(dims, |i, j, k| f(i, j, k) as u32);
    Grid3::new(
        dims[0],
        dims[1],
        dims[2],
        labels.pack().into_iter().map(|v| (v * 255) as u8).collect(),
    )
}

/// Labeled volume with uniform intensity 128, split into bricks.
pub fn labeled_volume(
    dims: [usize; 3],
    brick_dims: [usize; 3],
    f: impl Fn(usize, usize, usize) -> u32,
) -> BrickVolume {
    BrickVolume::from_dense(
        dense_intensity(dims, 128),
        None,
        labels_from_fn(dims, f),
        brick_dims,
        DVec3::ONE,
    )
    .unwrap()
}

/// Unlabeled volume whose mask selects voxels where `f` is true.
pub fn masked_volume(
    dims: [usize; 3],
    brick_dims: [usize; 3],
    f: impl Fn(usize, usize, usize) -> bool,
) -> BrickVolume {
    BrickVolume::from_dense(
        dense_intensity(dims, 128),
        Some(mask_from_fn(dims, f)),
        labels_from_fn(dims, |_, _, _| 0),
        brick_dims,
        DVec3::ONE,
    )
    .unwrap()
}

pub fn in_box(p: [usize; 3], lo: [usize; 3], hi: [usize; 3]) -> bool {
    (0..3).all(|a| p[a] >= lo[a] && p[a] < hi[a])
}
