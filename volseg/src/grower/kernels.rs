//! Data-parallel grow kernels over one brick's label scratch.
//!
//! Each function is one full-brick dispatch; callers sequence them. Point-wise
//! kernels split the brick by voxel, neighborhood kernels by work group.

use std::collections::BTreeMap;

use arrayvec::ArrayVec;
use glam::DVec3;
use hashbrown::HashMap;
use rayon::prelude::*;

use super::work_groups::WorkGroups;
use crate::brick::{LabelScratch, DONE_BIT};
use crate::config::SeedPolicy;

/// Neighbor ids recorded per id and group during connection finding.
pub(crate) const CONNECTION_SLOTS: usize = 6;
/// Finalized neighbor ids recorded per region and group during shape collection.
pub(crate) const FINALIZED_SLOTS: usize = 3;

const NEIGHBORS_6: [[isize; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

const NEIGHBORS_26: [[isize; 3]; 26] = neighbors_26();

const fn neighbors_26() -> [[isize; 3]; 26] {
    let mut out = [[0isize; 3]; 26];
    let mut n = 0;
    let mut dz = -1;
    while dz <= 1 {
        let mut dy = -1;
        while dy <= 1 {
            let mut dx = -1;
            while dx <= 1 {
                if dx != 0 || dy != 0 || dz != 0 {
                    out[n] = [dx, dy, dz];
                    n += 1;
                }
                dx += 1;
            }
            dy += 1;
        }
        dz += 1;
    }
    out
}

#[inline]
fn is_growing(v: u32) -> bool {
    v != 0 && v & DONE_BIT == 0
}

#[inline]
fn step(dims: [usize; 3], p: [usize; 3], d: [isize; 3]) -> Option<[usize; 3]> {
    let mut q = [0usize; 3];
    for a in 0..3 {
        let c = p[a] as isize + d[a];
        if c < 0 || c >= dims[a] as isize {
            return None;
        }
        q[a] = c as usize;
    }
    Some(q)
}

/// Visit every voxel of `[lo, hi)` x-fastest, or in exact reverse.
#[inline]
fn sweep(lo: [usize; 3], hi: [usize; 3], reverse: bool, mut f: impl FnMut([usize; 3])) {
    let ex = hi[0] - lo[0];
    let ey = hi[1] - lo[1];
    let n = ex * ey * (hi[2] - lo[2]);
    for t in 0..n {
        let t = if reverse { n - 1 - t } else { t };
        f([lo[0] + t % ex, lo[1] + (t / ex) % ey, lo[2] + t / (ex * ey)]);
    }
}

// ============================================================================
// S0: seed
// ============================================================================

/// Give each masked voxel a unique id (flat index + 1). Finalized voxels are
/// never touched.
pub(crate) fn seed(labels: &LabelScratch, mask: &[u8], policy: SeedPolicy) {
    (0..labels.len()).into_par_iter().for_each(|idx| {
        let v = labels.get(idx);
        if v & DONE_BIT != 0 {
            return;
        }
        if mask[idx] == 0 {
            if policy == SeedPolicy::Fresh && v != 0 {
                labels.set(idx, 0);
            }
            return;
        }
        if policy == SeedPolicy::KeepExisting && v != 0 {
            return;
        }
        labels.set(idx, idx as u32 + 1);
    });
}

// ============================================================================
// S1/S2: grow
// ============================================================================

/// One max-propagation pass over 26-neighborhoods, each group swept in the
/// given direction.
pub(crate) fn grow(labels: &LabelScratch, groups: &WorkGroups, reverse: bool) {
    let dims = groups.dims();
    (0..groups.len()).into_par_iter().for_each(|g| {
        let (lo, hi) = groups.bounds(g);
        sweep(lo, hi, reverse, |p| {
            let idx = labels.index(p[0], p[1], p[2]);
            let v = labels.get(idx);
            if !is_growing(v) {
                return;
            }
            let mut m = v;
            for d in NEIGHBORS_26 {
                if let Some(q) = step(dims, p, d) {
                    let n = labels.get(labels.index(q[0], q[1], q[2]));
                    if is_growing(n) && n > m {
                        m = n;
                    }
                }
            }
            if m != v {
                labels.set(idx, m);
            }
        });
    });
}

// ============================================================================
// S3: count
// ============================================================================

/// Distinct growing ids, at most `cap` per group, sorted and deduplicated
/// across groups.
pub(crate) fn count(labels: &LabelScratch, groups: &WorkGroups, cap: usize) -> Vec<u32> {
    let per_group: Vec<Vec<u32>> = (0..groups.len())
        .into_par_iter()
        .map(|g| {
            let (lo, hi) = groups.bounds(g);
            let mut ids = Vec::with_capacity(cap);
            sweep(lo, hi, false, |p| {
                let v = labels.get(labels.index(p[0], p[1], p[2]));
                if is_growing(v) && ids.len() < cap && !ids.contains(&v) {
                    ids.push(v);
                }
            });
            ids
        })
        .collect();

    let mut all: Vec<u32> = per_group.into_iter().flatten().collect();
    all.sort_unstable();
    all.dedup();
    all
}

// ============================================================================
// S4: find connections
// ============================================================================

/// For each id in `ids` (sorted), the distinct growing ids found next to it
/// through 6-neighborhoods, up to [`CONNECTION_SLOTS`] per group.
pub(crate) fn find_connections(
    labels: &LabelScratch,
    groups: &WorkGroups,
    ids: &[u32],
) -> Vec<(u32, ArrayVec<u32, CONNECTION_SLOTS>)> {
    let dims = groups.dims();
    let per_group: Vec<Vec<(u32, ArrayVec<u32, CONNECTION_SLOTS>)>> = (0..groups.len())
        .into_par_iter()
        .map(|g| {
            let (lo, hi) = groups.bounds(g);
            let mut slots: HashMap<u32, ArrayVec<u32, CONNECTION_SLOTS>> = HashMap::new();
            sweep(lo, hi, false, |p| {
                let v = labels.get(labels.index(p[0], p[1], p[2]));
                if ids.binary_search(&v).is_err() {
                    return;
                }
                for d in NEIGHBORS_6 {
                    let Some(q) = step(dims, p, d) else {
                        continue;
                    };
                    let m = labels.get(labels.index(q[0], q[1], q[2]));
                    if m == v || !is_growing(m) {
                        continue;
                    }
                    let slot = slots.entry(v).or_default();
                    if !slot.contains(&m) {
                        let _ = slot.try_push(m);
                    }
                }
            });
            slots.into_iter().collect()
        })
        .collect();

    per_group.into_iter().flatten().collect()
}

// ============================================================================
// S5: rewrite merged ids
// ============================================================================

pub(crate) fn rewrite(labels: &LabelScratch, remap: &HashMap<u32, u32>) {
    (0..labels.len()).into_par_iter().for_each(|idx| {
        let v = labels.get(idx);
        if !is_growing(v) {
            return;
        }
        if let Some(&r) = remap.get(&v) {
            labels.set(idx, r);
        }
    });
}

// ============================================================================
// S6: shape
// ============================================================================

/// Voxel count, local position sum and finalized neighbor ids of one region.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RegionShape {
    pub count: u64,
    pub pos_sum: DVec3,
    pub finalized: Vec<u32>,
}

// count, position sum, finalized neighbors
type ShapeAcc = (u64, DVec3, ArrayVec<u32, FINALIZED_SLOTS>);

/// Shape of every region in `reps` (sorted). Finalized neighbors are found
/// through 26-neighborhoods, up to [`FINALIZED_SLOTS`] per group.
pub(crate) fn shape(
    labels: &LabelScratch,
    groups: &WorkGroups,
    reps: &[u32],
) -> BTreeMap<u32, RegionShape> {
    let dims = groups.dims();
    let per_group: Vec<HashMap<u32, ShapeAcc>> = (0..groups.len())
        .into_par_iter()
        .map(|g| {
            let (lo, hi) = groups.bounds(g);
            let mut acc: HashMap<u32, ShapeAcc> = HashMap::new();
            sweep(lo, hi, false, |p| {
                let v = labels.get(labels.index(p[0], p[1], p[2]));
                if reps.binary_search(&v).is_err() {
                    return;
                }
                let entry = acc.entry(v).or_default();
                entry.0 += 1;
                entry.1 += DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64);
                for d in NEIGHBORS_26 {
                    let Some(q) = step(dims, p, d) else {
                        continue;
                    };
                    let m = labels.get(labels.index(q[0], q[1], q[2]));
                    if m != v && m & DONE_BIT != 0 && !entry.2.contains(&m) {
                        let _ = entry.2.try_push(m);
                    }
                }
            });
            acc
        })
        .collect();

    let mut out: BTreeMap<u32, RegionShape> = BTreeMap::new();
    for group in per_group {
        for (id, (count, pos, finalized)) in group {
            let shape = out.entry(id).or_default();
            shape.count += count;
            shape.pos_sum += pos;
            for f in finalized {
                if !shape.finalized.contains(&f) {
                    shape.finalized.push(f);
                }
            }
        }
    }
    out
}

// ============================================================================
// S7: finalize
// ============================================================================

/// Mark every growing voxel done.
pub(crate) fn finalize(labels: &LabelScratch) {
    (0..labels.len()).into_par_iter().for_each(|idx| {
        let v = labels.get(idx);
        if is_growing(v) {
            labels.set(idx, v | DONE_BIT);
        }
    });
}
