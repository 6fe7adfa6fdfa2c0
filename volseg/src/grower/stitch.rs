//! Joining grown regions across shared brick faces.

use std::collections::BTreeMap;

use arrayvec::ArrayVec;
use hashbrown::{HashMap, HashSet};

use super::branch_point::BranchPoint;
use super::id_union::IdUnion;
use crate::border::for_each_contact;
use crate::brick::{BrickVolume, Face, DONE_BIT};
use crate::cell::CellKey;

/// Cross-brick neighbor ids recorded per region and face.
const STITCH_SLOTS: usize = 3;

/// Union regions that touch across faces between two bricks that both grew
/// new regions. Each unordered brick pair is compared once. Returns the
/// number of pairs compared.
pub(crate) fn stitch_bricks(
    volume: &BrickVolume,
    grown: &[bool],
    points: &BTreeMap<CellKey, BranchPoint>,
    union: &mut IdUnion<CellKey>,
) -> usize {
    let mut checked: HashSet<(u32, u32)> = HashSet::new();

    for brick in volume.bricks() {
        let bid = brick.id();
        if !grown[bid as usize] {
            continue;
        }
        for face in Face::ALL {
            let nid = brick.neighbor(face);
            if nid == bid || !grown[nid as usize] {
                continue;
            }
            if !checked.insert((bid.min(nid), bid.max(nid))) {
                continue;
            }

            let other = volume.brick(nid);
            let near = brick.label();
            let far = other.label();
            let mut found: HashMap<u32, ArrayVec<u32, STITCH_SLOTS>> = HashMap::new();
            for_each_contact(brick.dims(), other.dims(), face, |p, q| {
                let v0 = near[(p[0], p[1], p[2])];
                let v1 = far[(q[0], q[1], q[2])];
                if v0 == 0 || v0 & DONE_BIT != 0 || v1 == 0 || v1 & DONE_BIT != 0 {
                    return;
                }
                if !points.contains_key(&CellKey::new(v0, bid)) {
                    return;
                }
                let slot = found.entry(v0).or_default();
                if !slot.contains(&v1) {
                    let _ = slot.try_push(v1);
                }
            });

            for (v0, far_ids) in found {
                for v1 in far_ids {
                    union.union(CellKey::new(v0, bid), CellKey::new(v1, nid));
                }
            }
        }
    }

    let pairs = checked.len();
    tracing::debug!("Stitched {} brick pairs", pairs);
    pairs
}

/// Combine points that share a set. Each merged point keeps the key of its
/// smallest member.
pub(crate) fn merge_points(
    points: BTreeMap<CellKey, BranchPoint>,
    union: &mut IdUnion<CellKey>,
) -> Vec<BranchPoint> {
    let mut merged: BTreeMap<CellKey, BranchPoint> = BTreeMap::new();
    for (key, bp) in points {
        let root = union.find(key);
        match merged.get_mut(&root) {
            Some(existing) => existing.merge(&bp),
            None => {
                merged.insert(root, bp);
            }
        }
    }
    let mut out: Vec<BranchPoint> = merged.into_values().collect();
    out.sort_by_key(|bp| bp.key);
    out
}
