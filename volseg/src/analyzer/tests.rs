use std::sync::{Arc, Mutex};

use common::Grid3;
use glam::DVec3;

use super::*;
use crate::brick::{BitDepth, Intensity};
use crate::testing::{in_box, labeled_volume, labels_from_fn, mask_from_fn};

/// Two 4x4x4 bricks side by side in x. Brick 0's last layer carries 7,
/// brick 1's first layer carries 9.
fn straddling_volume() -> BrickVolume {
    labeled_volume([8, 4, 4], [4, 4, 4], |i, _, _| match i {
        3 => 7,
        4 => 9,
        _ => 0,
    })
}

fn keys_and_sizes(analyzer: &ComponentAnalyzer) -> Vec<(CellKey, u32)> {
    analyzer
        .comps()
        .iter()
        .map(|(k, c)| (k, c.size_ui()))
        .collect()
}

#[test]
fn test_empty_volume_returns_false() {
    let mut volume = BrickVolume::new([0, 0, 0], DVec3::ONE, BitDepth::U8, Vec::new()).unwrap();
    let mut analyzer = ComponentAnalyzer::default();
    assert!(!analyzer.analyze(&mut volume, AnalyzeOptions::default()));
    assert_eq!(analyzer.list_size(), 0);
}

#[test]
fn test_single_brick_one_entry_per_label() {
    let mut volume = labeled_volume([8, 8, 8], [8, 8, 8], |i, j, k| {
        if in_box([i, j, k], [0, 0, 0], [4, 4, 4]) {
            1
        } else if in_box([i, j, k], [5, 5, 5], [8, 8, 8]) {
            2
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::default();
    assert!(analyzer.analyze(&mut volume, AnalyzeOptions::default()));

    assert_eq!(
        keys_and_sizes(&analyzer),
        vec![(CellKey::new(1, 0), 64), (CellKey::new(2, 0), 27)]
    );
    assert_eq!(analyzer.comp_size(), 2);
    assert_eq!(analyzer.graph().vertex_count(), 0);
}

#[test]
fn test_single_brick_keeps_tiny_fragment() {
    let mut volume = labeled_volume([6, 6, 6], [6, 6, 6], |i, j, k| {
        if j == 2 && k == 2 && (1..4).contains(&i) {
            5
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let cell = analyzer.comps().get(CellKey::new(5, 0)).unwrap();
    assert_eq!(cell.size_ui(), 3);
}

#[test]
fn test_multi_brick_size_floor_drops_small_fragments() {
    let mut volume = labeled_volume([8, 4, 4], [4, 4, 4], |i, j, k| {
        if i == 1 && j == 1 && k < 3 {
            4
        } else if i >= 5 {
            6
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    assert!(analyzer.comps().get(CellKey::new(4, 0)).is_none());
    assert!(analyzer.comps().get(CellKey::new(6, 1)).is_some());
}

#[test]
fn test_zero_intensity_voxels_skipped() {
    let dims = [4, 4, 4];
    let data = Grid3::new(
        4,
        4,
        4,
        (0..64).map(|n| if n % 2 == 0 { 0 } else { 200 }).collect::<Vec<u8>>(),
    );
    let mut volume = BrickVolume::from_dense(
        Intensity::U8(data),
        None,
        labels_from_fn(dims, |_, _, _| 3),
        dims,
        DVec3::ONE,
    )
    .unwrap();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let cell = analyzer.comps().get(CellKey::new(3, 0)).unwrap();
    assert_eq!(cell.size_ui(), 32);
    assert!((cell.mean(255.0) - 200.0).abs() < 1e-9);
}

#[test]
fn test_surface_counts_cube_shell() {
    let mut volume = labeled_volume([5, 5, 5], [5, 5, 5], |i, j, k| {
        in_box([i, j, k], [1, 1, 1], [4, 4, 4]) as u32
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let cell = analyzer.comps().get(CellKey::new(1, 0)).unwrap();
    assert_eq!(cell.size_ui(), 27);
    assert_eq!(cell.ext_ui(), 26);
    assert_eq!(cell.center(DVec3::ONE), DVec3::splat(2.0));
}

#[test]
fn test_straddling_region_counted_once() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let a = analyzer.comps().id_of(CellKey::new(7, 0)).unwrap();
    let b = analyzer.comps().id_of(CellKey::new(9, 1)).unwrap();
    assert_eq!(analyzer.graph().edge_count(), 1);
    assert_eq!(analyzer.graph().contact(a, b), Some(16));
    assert_eq!(analyzer.list_size(), 2);
    assert_eq!(analyzer.comp_size(), analyzer.list_size() - 1);
}

#[test]
fn test_linked_members_share_aggregate_stats() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let a = analyzer.comps().get(CellKey::new(7, 0)).unwrap();
    let b = analyzer.comps().get(CellKey::new(9, 1)).unwrap();
    assert_eq!(a.size_ui(), 32);
    assert_eq!(b.size_ui(), 32);
    assert_eq!(a.center(DVec3::ONE), b.center(DVec3::ONE));
    assert_eq!(analyzer.comps().max_size(), 32);
    // ids are untouched without consistency repair
    assert_eq!(a.id(), 7);
    assert_eq!(b.id(), 9);
}

#[test]
fn test_degenerate_bricks_skipped_in_multi_brick() {
    let mut volume = labeled_volume([8, 1, 1], [4, 1, 1], |_, _, _| 1);
    let mut analyzer = ComponentAnalyzer::default();
    assert!(analyzer.analyze(&mut volume, AnalyzeOptions::default()));
    assert_eq!(analyzer.list_size(), 0);

    let mut single = labeled_volume([4, 1, 1], [4, 1, 1], |_, _, _| 1);
    analyzer.analyze(&mut single, AnalyzeOptions::default());
    assert_eq!(analyzer.list_size(), 1);
}

#[test]
fn test_consistency_rewrites_linked_ids() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            consistent: true,
            ..Default::default()
        },
    );

    // Base is the first member in key order: (7, brick 0). Id 7 is free in brick 1.
    let labels = volume.dense_labels();
    assert_eq!(labels[(4, 0, 0)], 7);
    assert_eq!(labels[(4, 3, 3)], 7);
    assert!(analyzer.comps().get(CellKey::new(9, 1)).is_none());
    assert!(analyzer.comps().get(CellKey::new(7, 1)).is_some());
    assert_eq!(analyzer.list_size(), 2);
    assert_eq!(analyzer.comp_size(), 1);
}

#[test]
fn test_consistency_steps_past_collisions() {
    // Brick 1 already uses 7 for an unrelated fragment away from the face.
    let mut volume = labeled_volume([8, 4, 4], [4, 4, 4], |i, _, _| match i {
        3 => 7,
        4 => 9,
        7 => 7,
        _ => 0,
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            consistent: true,
            ..Default::default()
        },
    );

    let labels = volume.dense_labels();
    assert_eq!(labels[(4, 1, 1)], 7 + COLOR_PERIOD);
    assert_eq!(labels[(7, 1, 1)], 7);
    assert!(analyzer.comps().get(CellKey::new(7 + COLOR_PERIOD, 1)).is_some());
    assert!(analyzer.comps().get(CellKey::new(7, 1)).is_some());

    // Every graph edge now joins ids congruent modulo the color period.
    let comps = analyzer.comps();
    let graph = analyzer.graph();
    let ids: Vec<CellId> = graph.vertices().collect();
    for &a in &ids {
        for &b in &ids {
            if graph.contact(a, b).is_some() {
                let (ia, ib) = (comps.cell(a).id(), comps.cell(b).id());
                assert_eq!(ia.abs_diff(ib) % COLOR_PERIOD, 0);
            }
        }
    }
}

#[test]
fn test_consistency_skips_congruent_ids() {
    let mut volume = labeled_volume([8, 4, 4], [4, 4, 4], |i, _, _| match i {
        3 => 2,
        4 => 2 + COLOR_PERIOD,
        _ => 0,
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            consistent: true,
            ..Default::default()
        },
    );
    assert_eq!(volume.dense_labels()[(4, 0, 0)], 2 + COLOR_PERIOD);
}

#[test]
fn test_find_free_id_exhaustion() {
    let label = Grid3::new(2, 1, 1, vec![10, 10 + COLOR_PERIOD]);
    assert_eq!(consistency::find_free_id(&label, 10, 2), None);
    assert_eq!(
        consistency::find_free_id(&label, 10, 3),
        Some(10 + 2 * COLOR_PERIOD)
    );
}

#[test]
fn test_find_free_id_keeps_done_bit_of_base() {
    use crate::brick::{DONE_BIT, ID_MASK};

    let label = Grid3::new(2, 1, 1, vec![64 | DONE_BIT, 62 | DONE_BIT]);
    assert_eq!(
        consistency::find_free_id(&label, 64 | DONE_BIT, 4),
        Some((64 + COLOR_PERIOD) | DONE_BIT)
    );

    let free = Grid3::new(1, 1, 1, vec![62 | DONE_BIT]);
    assert_eq!(
        consistency::find_free_id(&free, 64 | DONE_BIT, 1),
        Some(64 | DONE_BIT)
    );

    // Wrapping stays inside the id bits.
    let top = ID_MASK - 10;
    let found = consistency::find_free_id(&Grid3::new(1, 1, 1, vec![top]), top, 2).unwrap();
    assert_eq!(found & DONE_BIT, 0);
    assert_eq!(found, top.wrapping_add(COLOR_PERIOD) & ID_MASK);
}

#[test]
fn test_find_free_id_skips_zero() {
    // One step past this base wraps the id bits to exactly zero.
    let base = crate::brick::ID_MASK + 1 - COLOR_PERIOD;
    let label = Grid3::new(1, 1, 1, vec![base]);
    assert_eq!(consistency::find_free_id(&label, base, 3), Some(COLOR_PERIOD));
}

#[test]
fn test_analyze_is_idempotent() {
    let mut volume = labeled_volume([8, 8, 4], [4, 4, 4], |i, j, _| {
        if i < 6 && j < 6 {
            1 + (i / 4) as u32
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let first = keys_and_sizes(&analyzer);
    let first_comps = analyzer.comp_size();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    assert_eq!(keys_and_sizes(&analyzer), first);
    assert_eq!(analyzer.comp_size(), first_comps);
}

#[test]
fn test_comps_at_point() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let keys = analyzer.comps_at_point(&volume, DVec3::new(3.2, 1.0, 2.4));
    assert_eq!(
        keys.into_iter().collect::<Vec<_>>(),
        vec![CellKey::new(7, 0), CellKey::new(9, 1)]
    );
    assert!(analyzer
        .comps_at_point(&volume, DVec3::new(1.0, 1.0, 1.0))
        .is_empty());
    assert!(analyzer
        .comps_at_point(&volume, DVec3::new(20.0, 1.0, 1.0))
        .is_empty());
    assert!(analyzer
        .comps_at_point(&volume, DVec3::new(-3.0, 1.0, 1.0))
        .is_empty());
}

#[test]
fn test_selection_only_counts_masked_voxels() {
    let dims = [4, 4, 4];
    let labels = labels_from_fn(dims, |_, _, _| 1);
    let mask = mask_from_fn(dims, |i, _, _| i < 2);
    let mut volume = BrickVolume::from_dense(
        Intensity::U8(Grid3::new_filled(4, 4, 4, 50)),
        Some(mask),
        labels.clone(),
        dims,
        DVec3::ONE,
    )
    .unwrap();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            selection_only: true,
            ..Default::default()
        },
    );
    assert_eq!(
        analyzer.comps().get(CellKey::new(1, 0)).unwrap().size_ui(),
        32
    );

    let mut unmasked = BrickVolume::from_dense(
        Intensity::U8(Grid3::new_filled(4, 4, 4, 50)),
        None,
        labels,
        dims,
        DVec3::ONE,
    )
    .unwrap();
    assert!(analyzer.analyze(
        &mut unmasked,
        AnalyzeOptions {
            selection_only: true,
            ..Default::default()
        },
    ));
    assert_eq!(analyzer.list_size(), 0);
}

#[test]
fn test_selection_only_ignores_unmasked_neighbor_brick() {
    let mut volume = straddling_volume();
    volume
        .brick_mut(0)
        .set_mask(Some(Grid3::new_filled(4, 4, 4, 255u8)))
        .unwrap();
    let selection = AnalyzeOptions {
        selection_only: true,
        ..Default::default()
    };
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, selection);
    assert_eq!(analyzer.list_size(), 1);
    assert!(analyzer.comps().get(CellKey::new(7, 0)).is_some());
    assert_eq!(analyzer.graph().edge_count(), 0);

    volume
        .brick_mut(1)
        .set_mask(Some(Grid3::new_filled(4, 4, 4, 255u8)))
        .unwrap();
    analyzer.analyze(&mut volume, selection);
    assert_eq!(analyzer.list_size(), 2);
    assert_eq!(analyzer.graph().edge_count(), 1);
}

#[test]
fn test_count_applies_size_window() {
    // Labels 1, 2 and 3 cover 8, 16 and 32 voxels.
    let mut volume = labeled_volume([8, 8, 1], [8, 8, 1], |i, j, _| match (i, j) {
        (0..=3, 0..=1) => 1,
        (0..=3, 2..=5) => 2,
        (4..=7, 0..=7) => 3,
        _ => 0,
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let all = analyzer.count();
    assert_eq!(all.count, 3);
    assert_eq!(all.voxels, 56);

    let mut analyzer = ComponentAnalyzer::new(AnalyzerConfig {
        min_size: Some(8),
        max_size: Some(32),
        ..Default::default()
    });
    let mut volume = BrickVolume::from_dense(
        Intensity::U8(Grid3::new_filled(8, 8, 1, 100)),
        None,
        volume.dense_labels(),
        [8, 8, 1],
        DVec3::new(0.5, 2.0, 3.0),
    )
    .unwrap();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    let windowed = analyzer.count();
    assert_eq!(windowed.count, 1);
    assert_eq!(windowed.voxels, 16);
    assert!((windowed.physical_size - 48.0).abs() < 1e-9);
}

#[test]
fn test_min_size_raises_single_brick_floor() {
    let mut volume = labeled_volume([6, 6, 6], [6, 6, 6], |i, j, k| {
        if i == 0 && j == 0 && k == 0 {
            5
        } else if i >= 3 {
            1
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::new(AnalyzerConfig {
        min_size: Some(2),
        ..Default::default()
    });
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    assert!(analyzer.comps().get(CellKey::new(5, 0)).is_none());
    assert!(analyzer.comps().get(CellKey::new(1, 0)).is_some());
}

#[test]
fn test_celps_from_keys() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let alone = analyzer.celps_from_keys(&[CellKey::new(7, 0)], false);
    assert_eq!(alone.len(), 1);
    assert_eq!(alone.get(CellKey::new(7, 0)), analyzer.comps().get(CellKey::new(7, 0)));
    assert_eq!(alone.spacing(), analyzer.comps().spacing());
    assert_eq!(alone.max_size(), analyzer.comps().max_size());

    let linked = analyzer.celps_from_keys(&[CellKey::new(7, 0)], true);
    let keys: Vec<CellKey> = linked.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![CellKey::new(7, 0), CellKey::new(9, 1)]);

    // Repeated and unknown keys add nothing.
    let mixed = analyzer.celps_from_keys(
        &[CellKey::new(9, 1), CellKey::new(9, 1), CellKey::new(42, 0)],
        true,
    );
    assert_eq!(mixed.len(), 2);
    assert!(analyzer.celps_from_keys(&[CellKey::new(42, 0)], true).is_empty());
}

struct HalfChannel;

impl ColocalChannel for HalfChannel {
    fn name(&self) -> &str {
        "half"
    }

    fn sample(&self, _brick: u32, i: usize, _j: usize, _k: usize) -> f64 {
        if i < 2 {
            0.5
        } else {
            0.0
        }
    }
}

#[test]
fn test_colocalization_counts() {
    let mut volume = labeled_volume([4, 4, 4], [4, 4, 4], |_, _, _| 1);
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.add_channel(Box::new(HalfChannel));
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            colocalize: true,
            ..Default::default()
        },
    );
    let cell = analyzer.comps().get(CellKey::new(1, 0)).unwrap();
    assert_eq!(cell.coloc_size_ui(0), 32);
    assert!((cell.coloc_size_d(0) - 16.0).abs() < 1e-12);

    let mut out = Vec::new();
    analyzer.write_comp_list(&mut out, false, None).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.lines().next().unwrap().ends_with("\thalfN\thalfI"));
}

#[test]
fn test_write_comp_list_single_brick() {
    let mut volume = labeled_volume([4, 4, 4], [4, 4, 4], |i, _, _| (i < 2) as u32);
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let mut out = Vec::new();
    analyzer.write_comp_list(&mut out, false, None).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ID\tPosX\tPosY\tPosZ\tSumN"));
    assert!(lines[0].ends_with("PcaL"));
    let fields: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(fields.len(), 15);
    assert_eq!(fields[0], "1");
    assert_eq!(fields[4], "32");
    let sum_i: f64 = fields[5].parse().unwrap();
    assert!((sum_i - 4096.0).abs() < 1e-6);
}

#[test]
fn test_write_comp_list_multi_brick_one_row_per_set() {
    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let mut out = Vec::new();
    analyzer
        .write_comp_list(&mut out, true, Some("vol"))
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "A total of 1 component(s) in the list");
    assert!(lines[1].starts_with("\tID\tBRICK_ID\tPosX"));
    assert_eq!(lines.len(), 3);
    assert!(lines[2].starts_with("vol\t7\t0\t"));
}

#[test]
fn test_colors_follow_color_period() {
    assert_eq!(label_color(7), label_color(7 + COLOR_PERIOD));
    assert_ne!(label_color(7), label_color(8));
    for c in label_color(123) {
        assert!((0.0..=1.0).contains(&c));
    }

    let mut volume = straddling_volume();
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(
        &mut volume,
        AnalyzeOptions {
            consistent: true,
            ..Default::default()
        },
    );
    let a = analyzer.comps().get(CellKey::new(7, 0)).unwrap().id();
    let b = analyzer.comps().get(CellKey::new(7, 1)).unwrap().id();
    assert_eq!(analyzer.color_of(a), analyzer.color_of(b));
    assert_eq!(analyzer.color_of(a), Some(label_color(7)));
    assert_eq!(analyzer.color_of(0), None);
}

#[test]
fn test_size_ratio() {
    let mut volume = labeled_volume([8, 8, 8], [8, 8, 8], |i, j, k| {
        if in_box([i, j, k], [0, 0, 0], [2, 2, 2]) {
            1
        } else if in_box([i, j, k], [4, 4, 4], [8, 8, 8]) {
            2
        } else {
            0
        }
    });
    let mut analyzer = ComponentAnalyzer::default();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());
    assert_eq!(analyzer.size_ratio(1, 0), 0.0);
    assert_eq!(analyzer.size_ratio(2, 0), 1.0);
    assert_eq!(analyzer.size_ratio(3, 0), 0.0);
}

#[test]
fn test_progress_reported_per_brick() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut analyzer = ComponentAnalyzer::default().with_progress(ProgressCallback::new(
        move |p: crate::Progress| sink.lock().unwrap().push(p),
    ));
    let mut volume = straddling_volume();
    analyzer.analyze(&mut volume, AnalyzeOptions::default());

    let events = events.lock().unwrap();
    let scans = events.iter().filter(|p| p.stage == Stage::Scan).count();
    let matches = events.iter().filter(|p| p.stage == Stage::Match).count();
    assert_eq!(scans, 2);
    assert_eq!(matches, 2);
    assert!(events.iter().all(|p| p.total == 2));
}
