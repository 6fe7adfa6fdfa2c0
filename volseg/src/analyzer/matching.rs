//! Cross-brick fragment linking and set-wide size aggregation.

use crate::border::for_each_contact;
use crate::brick::{BrickVolume, Face};
use crate::cell::{Cell, CellId, CellKey, CelpList};
use crate::graph::CellGraph;
use crate::progress::{report, ProgressCallback, Stage};

/// Link every pair of fragments touching across a shared brick face.
///
/// Each brick compares only its positive faces, so every shared face is
/// visited once.
pub(super) fn match_bricks(
    volume: &BrickVolume,
    comps: &CelpList,
    graph: &mut CellGraph,
    selection_only: bool,
    progress: &ProgressCallback,
) {
    let total = volume.brick_count();
    for (idx, brick) in volume.bricks().iter().enumerate() {
        if selection_only && !brick.has_mask() {
            continue;
        }
        for face in Face::POSITIVE {
            let nid = brick.neighbor(face);
            if nid == brick.id() {
                continue;
            }
            let other = volume.brick(nid);
            if selection_only && !other.has_mask() {
                continue;
            }

            let near = brick.label();
            let far = other.label();
            for_each_contact(brick.dims(), other.dims(), face, |p, q| {
                let l1 = near[(p[0], p[1], p[2])];
                let l2 = far[(q[0], q[1], q[2])];
                if l1 == 0 || l2 == 0 {
                    return;
                }
                let (Some(a), Some(b)) = (
                    comps.id_of(CellKey::new(l1, brick.id())),
                    comps.id_of(CellKey::new(l2, nid)),
                ) else {
                    return;
                };
                graph.link(a, b);
            });
        }
        report(progress, Stage::Match, idx, total);
    }
}

/// Give every member of a linked set the set's aggregate statistics and raise
/// the list's maximum size to the largest set.
pub(super) fn update_max_comp_size(comps: &mut CelpList, graph: &mut CellGraph, branch_cap: usize) {
    graph.clear_visited();
    let seeds: Vec<CellId> = graph.vertices().collect();
    let mut members = Vec::new();

    for seed in seeds {
        if graph.visited(seed) {
            continue;
        }
        members.clear();
        if !graph.linked_comps(seed, &mut members, branch_cap) {
            continue;
        }

        let mut total = Cell::new(CellKey::new(0, 0));
        for &m in &members {
            total.merge(comps.cell(m));
        }
        comps.observe_size(total.size_ui());
        for &m in &members {
            comps.cell_mut(m).copy_stats_from(&total);
        }
    }
}
