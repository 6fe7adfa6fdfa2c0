//! Region growing from a mask.
//!
//! Each masked voxel starts with its own id. Repeated max-propagation passes
//! flood every blob with its largest id; leftover splits are merged on the host
//! and rewritten. Regions touching across brick faces are then joined, every
//! grown voxel is marked done, and each large enough region is reported to a
//! [`MarkerSink`].
//!
//! Per brick, the dispatch sequence is:
//!
//! | Stage | Work |
//! |-------|------|
//! | S0 | seed masked voxels |
//! | S1/S2 | reverse and forward grow passes, repeated |
//! | S3 | collect surviving ids per work group |
//! | S4 | find ids touching other ids |
//! | S5 | union touching ids, rewrite to the largest |
//! | S6 | voxel count, position sum and finalized neighbors per region |
//!
//! S7 (done bit) runs over all processed bricks after cross-brick stitching.

mod branch_point;
mod id_union;
mod kernels;
mod stitch;
mod work_groups;


use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;

use branch_point::BranchPoint;
use id_union::IdUnion;
use work_groups::WorkGroups;

use crate::brick::{BrickVolume, LabelScratch};
use crate::cell::CellKey;
use crate::config::GrowerConfig;
use crate::progress::{report as report_progress, ProgressCallback, Stage};

/// One grown region.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Centroid in physical units.
    pub position: DVec3,
    pub id: u32,
    /// Voxel count.
    pub size: u64,
    /// Previously finalized regions this one touches.
    pub connections: BTreeSet<u32>,
    /// Bricks the region spans.
    pub bricks: BTreeSet<u32>,
}

/// Receiver for grown regions.
pub trait MarkerSink {
    fn add_marker(&mut self, marker: Marker);
}

impl MarkerSink for Vec<Marker> {
    fn add_marker(&mut self, marker: Marker) {
        self.push(marker);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowReport {
    pub bricks_processed: usize,
    /// Regions after cross-brick merging, before the size threshold.
    pub regions: usize,
    pub markers: usize,
}

#[derive(Debug, Default)]
pub struct RegionGrower {
    config: GrowerConfig,
    progress: ProgressCallback,
}

impl RegionGrower {
    pub fn new(config: GrowerConfig) -> Self {
        config.validate();
        Self {
            config,
            progress: ProgressCallback::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &GrowerConfig {
        &self.config
    }

    /// Grow regions in every masked brick of `volume`, rewriting its label
    /// channels, and hand each region of at least `size_threshold` voxels to
    /// `sink`.
    pub fn compute(&self, volume: &mut BrickVolume, sink: &mut dyn MarkerSink) -> GrowReport {
        let mut report = GrowReport::default();
        let total = volume.brick_count();
        if total == 0 {
            tracing::debug!("Region growing skipped: volume has no bricks");
            return report;
        }

        let mut points: BTreeMap<CellKey, BranchPoint> = BTreeMap::new();
        let mut active = vec![false; total];
        let mut grown = vec![false; total];

        for idx in 0..total {
            let brick = volume.brick_mut(idx as u32);
            let Some(mask) = brick.mask() else {
                continue;
            };
            if brick.active_dims() < 2 {
                tracing::debug!("Brick {} is degenerate ({:?}), skipped", brick.id(), brick.dims());
                continue;
            }
            let mask = mask.pack();
            if mask.iter().all(|&m| m == 0) {
                continue;
            }

            active[idx] = true;
            report.bricks_processed += 1;

            let labels = LabelScratch::load(brick.label());
            let regions = self.grow_brick(&labels, &mask, brick.id(), brick.origin());
            labels.store(brick.label_mut());

            tracing::debug!("Brick {}: {} regions grown", brick.id(), regions.len());
            grown[idx] = !regions.is_empty();
            for bp in regions {
                points.insert(bp.key, bp);
            }
            report_progress(&self.progress, Stage::Grow, idx, total);
        }

        let mut union = IdUnion::default();
        if report.bricks_processed > 1 && points.len() > 1 {
            stitch::stitch_bricks(volume, &grown, &points, &mut union);
        }

        for idx in (0..total).filter(|&i| active[i]) {
            let brick = volume.brick_mut(idx as u32);
            let labels = LabelScratch::load(brick.label());
            kernels::finalize(&labels);
            labels.store(brick.label_mut());
            report_progress(&self.progress, Stage::Finalize, idx, total);
        }

        let merged = stitch::merge_points(points, &mut union);
        report.regions = merged.len();
        let spacing = volume.spacing();
        for bp in merged {
            if bp.sum < self.config.size_threshold {
                continue;
            }
            sink.add_marker(bp.into_marker(spacing));
            report.markers += 1;
        }

        tracing::info!(
            "Region growing: {} bricks processed, {} regions, {} markers",
            report.bricks_processed,
            report.regions,
            report.markers
        );
        report
    }

    /// Run S0 through S6 on one brick's label scratch.
    fn grow_brick(
        &self,
        labels: &LabelScratch,
        mask: &[u8],
        brick_id: u32,
        origin: [usize; 3],
    ) -> Vec<BranchPoint> {
        let groups = WorkGroups::new(labels.dims(), self.config.work_group);

        kernels::seed(labels, mask, self.config.seed_policy);
        for _ in 0..self.config.grow_iterations {
            kernels::grow(labels, &groups, true);
            kernels::grow(labels, &groups, false);
        }

        let ids = kernels::count(labels, &groups, self.config.max_group_ids);
        if ids.is_empty() {
            return Vec::new();
        }

        let mut local = IdUnion::default();
        for &id in &ids {
            local.insert(id);
        }
        for (id, neighbors) in kernels::find_connections(labels, &groups, &ids) {
            for n in neighbors {
                local.union(id, n);
            }
        }
        let remap = local.remap();
        if !remap.is_empty() {
            kernels::rewrite(labels, &remap);
        }

        let mut reps: Vec<u32> = ids.iter().map(|&id| local.find(id)).collect();
        reps.sort_unstable();
        reps.dedup();

        kernels::shape(labels, &groups, &reps)
            .iter()
            .map(|(&id, shape)| BranchPoint::from_shape(CellKey::new(id, brick_id), shape, origin))
            .collect()
    }
}
