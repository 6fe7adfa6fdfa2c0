//! Per-brick statistics scan.

use std::collections::BTreeMap;

use glam::DVec3;
use hashbrown::HashMap;
use rayon::prelude::*;

use super::ColocalChannel;
use crate::border::on_brick_boundary;
use crate::brick::{AnalyzeScratch, Brick};
use crate::cell::{Cell, CellKey, ColocSample, VoxelSample};

const NEIGHBORS_6: [[isize; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Accumulate one cell per nonzero label of `brick`, in label order.
///
/// Z-slices are scanned in parallel into slice-local maps and folded in slice
/// order, so the result does not depend on scheduling.
pub(super) fn scan_brick(
    brick: &Brick,
    selection_only: bool,
    spacing: DVec3,
    channels: Option<&[Box<dyn ColocalChannel>]>,
) -> Vec<Cell> {
    let scratch = AnalyzeScratch::load(brick, selection_only);
    let [_, _, nz] = scratch.dims;

    let slices: Vec<HashMap<u32, Cell>> = (0..nz)
        .into_par_iter()
        .map(|k| scan_slice(&scratch, brick, k, spacing, channels))
        .collect();

    let mut cells: BTreeMap<u32, Cell> = BTreeMap::new();
    for slice in slices {
        for (label, cell) in slice {
            match cells.get_mut(&label) {
                Some(existing) => existing.merge(&cell),
                None => {
                    cells.insert(label, cell);
                }
            }
        }
    }
    cells.into_values().collect()
}

fn scan_slice(
    scratch: &AnalyzeScratch,
    brick: &Brick,
    k: usize,
    spacing: DVec3,
    channels: Option<&[Box<dyn ColocalChannel>]>,
) -> HashMap<u32, Cell> {
    let [nx, ny, _] = scratch.dims;
    let origin = DVec3::new(
        brick.origin()[0] as f64,
        brick.origin()[1] as f64,
        brick.origin()[2] as f64,
    );
    let mut cells: HashMap<u32, Cell> = HashMap::new();
    let mut coloc_buf: Vec<ColocSample> = Vec::new();

    for j in 0..ny {
        for i in 0..nx {
            let idx = scratch.index(i, j, k);
            if let Some(mask) = &scratch.mask {
                if mask[idx] == 0 {
                    continue;
                }
            }
            let label = scratch.label[idx];
            if label == 0 {
                continue;
            }
            let value = scratch.data[idx];
            if value <= 0.0 {
                continue;
            }

            let sample = VoxelSample {
                value,
                surface: is_surface(scratch, [i, j, k], label),
                pos: origin + DVec3::new(i as f64, j as f64, k as f64),
            };
            let coloc = match channels {
                Some(channels) => {
                    coloc_buf.clear();
                    coloc_buf.extend(channels.iter().map(|c| ColocSample {
                        value: c.sample(brick.id(), i, j, k),
                    }));
                    Some(coloc_buf.as_slice())
                }
                None => None,
            };

            cells
                .entry(label)
                .or_insert_with(|| Cell::new(CellKey::new(label, brick.id())))
                .inc(&sample, spacing, coloc);
        }
    }
    cells
}

/// A voxel is on the surface when it touches the brick boundary or any
/// 6-neighbor carries a different label.
fn is_surface(scratch: &AnalyzeScratch, p: [usize; 3], label: u32) -> bool {
    if on_brick_boundary(scratch.dims, p) {
        return true;
    }
    NEIGHBORS_6.iter().any(|d| {
        let i = (p[0] as isize + d[0]) as usize;
        let j = (p[1] as isize + d[1]) as usize;
        let k = (p[2] as isize + d[2]) as usize;
        scratch.label_at(i, j, k) != label
    })
}
