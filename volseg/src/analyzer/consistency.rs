//! Id consistency repair across linked fragments.
//!
//! Fragments of one component carry unrelated ids in different bricks. Repair
//! renumbers them so every member's id agrees with the set's base id modulo
//! [`COLOR_PERIOD`], rewriting the label channel in place.

use common::Grid3;
use hashbrown::HashSet;

use super::report::COLOR_PERIOD;
use crate::brick::{BrickVolume, DONE_BIT, ID_MASK};
use crate::cell::{CellId, CelpList};
use crate::config::AnalyzerConfig;
use crate::graph::CellGraph;

pub(super) fn make_color_consistent(
    volume: &mut BrickVolume,
    comps: &mut CelpList,
    graph: &mut CellGraph,
    config: &AnalyzerConfig,
) {
    if volume.brick_count() <= 1 {
        return;
    }

    graph.clear_visited();
    let ids: Vec<CellId> = comps.ids().collect();
    let mut members = Vec::new();
    let mut renumbered = 0usize;
    let mut exhausted = 0usize;

    for seed in ids {
        if graph.visited(seed) {
            continue;
        }
        members.clear();
        if !graph.linked_comps(seed, &mut members, config.branch_cap) {
            continue;
        }

        let base = comps.cell(members[0]).id();
        for &m in &members[1..] {
            let cell = comps.cell(m);
            let old = cell.id();
            if base.abs_diff(old) % COLOR_PERIOD == 0 {
                continue;
            }
            let brick = cell.brick();
            let label = volume.brick_mut(brick).label_mut();
            match find_free_id(label, base, config.max_id_attempts) {
                Some(new_id) => {
                    replace_id(label, old, new_id);
                    comps.relabel(m, new_id);
                    renumbered += 1;
                }
                None => {
                    tracing::warn!(
                        "No free id congruent to {} in brick {} after {} attempts, fragment {} left unchanged",
                        base,
                        brick,
                        config.max_id_attempts,
                        old
                    );
                    exhausted += 1;
                }
            }
        }
    }

    comps.retain_consistent();
    tracing::debug!(
        "Consistency repair: {} fragments renumbered, {} left unchanged",
        renumbered,
        exhausted
    );
}

/// First id congruent to `base` modulo [`COLOR_PERIOD`] that is absent from
/// `label`, tried in steps of the period starting at `base` itself.
///
/// The search walks the id bits only, wrapping within [`ID_MASK`] and skipping a
/// zero id. The done bit of `base` is carried onto every candidate.
pub(super) fn find_free_id(label: &Grid3<u32>, base: u32, max_attempts: u32) -> Option<u32> {
    let present: HashSet<u32> = label.rows().flatten().copied().collect();
    let done = base & DONE_BIT;
    let start = base & ID_MASK;
    let mut id = start;
    for _ in 0..max_attempts {
        let candidate = id | done;
        if id != 0 && !present.contains(&candidate) {
            return Some(candidate);
        }
        id = id.wrapping_add(COLOR_PERIOD) & ID_MASK;
        if id == start {
            break;
        }
    }
    None
}

fn replace_id(label: &mut Grid3<u32>, old: u32, new: u32) {
    let [nx, ny, nz] = label.dims();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let v = label.get_mut(i, j, k);
                if *v == old {
                    *v = new;
                }
            }
        }
    }
}
