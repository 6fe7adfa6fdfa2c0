//! Static component analysis of an already-labeled bricked volume.
//!
//! # Pipeline
//!
//! 1. Scan each brick into per-label [`Cell`]s, applying the size floor
//! 2. Link fragments touching across brick faces in a [`CellGraph`]
//! 3. Copy each connected set's aggregate statistics onto its members
//! 4. Optionally renumber fragments so each connected set shares one id
//!    modulo [`COLOR_PERIOD`]
//!
//! The results stay queryable until the next [`ComponentAnalyzer::analyze`].

mod consistency;
mod matching;
mod report;
mod scan;

#[cfg(test)]
mod tests;

pub use report::{label_color, COLOR_PERIOD};

use std::collections::BTreeSet;

use glam::DVec3;

use crate::brick::BrickVolume;
use crate::cell::{Cell, CellId, CellKey, CelpList};
use crate::config::AnalyzerConfig;
use crate::graph::CellGraph;
use crate::progress::{report as report_progress, ProgressCallback, Stage};

/// Summary returned by [`ComponentAnalyzer::count`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompCount {
    pub count: usize,
    pub voxels: u64,
    /// Voxel count times the voxel volume.
    pub physical_size: f64,
}

/// A secondary channel sampled per voxel for colocalization statistics.
pub trait ColocalChannel: Send + Sync {
    /// Column name used in the component list header.
    fn name(&self) -> &str;

    /// Value at local voxel `(i, j, k)` of brick `brick`. Zero means absent.
    fn sample(&self, brick: u32, i: usize, j: usize, k: usize) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Only count voxels inside each brick's mask; bricks without a mask are skipped.
    pub selection_only: bool,
    /// Renumber linked fragments so their ids agree modulo [`COLOR_PERIOD`].
    pub consistent: bool,
    /// Sample the attached colocalization channels.
    pub colocalize: bool,
}

pub struct ComponentAnalyzer {
    config: AnalyzerConfig,
    comps: CelpList,
    graph: CellGraph,
    channels: Vec<Box<dyn ColocalChannel>>,
    progress: ProgressCallback,
    multi_brick: bool,
    colocalized: bool,
    value_scale: f64,
}

impl std::fmt::Debug for ComponentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentAnalyzer")
            .field("config", &self.config)
            .field("cells", &self.comps.len())
            .field("vertices", &self.graph.vertex_count())
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl Default for ComponentAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl ComponentAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        config.validate();
        let graph = CellGraph::new(config.min_contact);
        Self {
            config,
            comps: CelpList::default(),
            graph,
            channels: Vec::new(),
            progress: ProgressCallback::none(),
            multi_brick: false,
            colocalized: false,
            value_scale: 1.0,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn add_channel(&mut self, channel: Box<dyn ColocalChannel>) {
        self.channels.push(channel);
    }

    pub fn clear_channels(&mut self) {
        self.channels.clear();
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn comps(&self) -> &CelpList {
        &self.comps
    }

    pub fn graph(&self) -> &CellGraph {
        &self.graph
    }

    /// Analyze every brick of `volume`. Returns false when the volume has no
    /// bricks. With `options.consistent` the volume's label channels may be
    /// rewritten.
    pub fn analyze(&mut self, volume: &mut BrickVolume, options: AnalyzeOptions) -> bool {
        self.comps.clear(volume.spacing());
        self.graph.clear();
        self.colocalized = false;

        let total = volume.brick_count();
        if total == 0 {
            tracing::debug!("Component analysis skipped: volume has no bricks");
            return false;
        }

        self.multi_brick = total > 1;
        self.value_scale = volume.bit_depth().max_value();
        let mut size_floor = if self.multi_brick {
            self.config.size_floor
        } else {
            0
        };
        if let Some(min) = self.config.min_size {
            size_floor = size_floor.max(min);
        }
        let channels = if options.colocalize && !self.channels.is_empty() {
            Some(self.channels.as_slice())
        } else {
            None
        };

        for (idx, brick) in volume.bricks().iter().enumerate() {
            if options.selection_only && !brick.has_mask() {
                tracing::debug!("Brick {} has no mask, skipped in selection mode", brick.id());
                continue;
            }
            if self.multi_brick && brick.active_dims() < 2 {
                tracing::debug!("Brick {} is degenerate ({:?}), skipped", brick.id(), brick.dims());
                continue;
            }

            let cells = scan::scan_brick(brick, options.selection_only, volume.spacing(), channels);
            let found = cells.len();
            let mut kept = 0usize;
            for cell in cells {
                if cell.size_ui() < size_floor {
                    continue;
                }
                self.comps.observe_size(cell.size_ui());
                self.comps.insert(cell);
                kept += 1;
            }
            tracing::debug!(
                "Brick {}: {} fragments, {} above size floor {}",
                brick.id(),
                found,
                kept,
                size_floor
            );
            report_progress(&self.progress, Stage::Scan, idx, total);
        }
        self.colocalized = channels.is_some();

        if self.multi_brick {
            matching::match_bricks(
                volume,
                &self.comps,
                &mut self.graph,
                options.selection_only,
                &self.progress,
            );
            matching::update_max_comp_size(&mut self.comps, &mut self.graph, self.config.branch_cap);

            if options.consistent {
                consistency::make_color_consistent(
                    volume,
                    &mut self.comps,
                    &mut self.graph,
                    &self.config,
                );
                report_progress(&self.progress, Stage::Consistency, total - 1, total);
            }
        }

        tracing::info!(
            "Component analysis: {} bricks, {} fragments, {} cross-brick links",
            total,
            self.comps.len(),
            self.graph.edge_count()
        );
        true
    }

    /// Number of fragments in the list.
    pub fn list_size(&self) -> usize {
        self.comps.len()
    }

    /// Number of components after merging fragments linked across bricks.
    pub fn comp_size(&mut self) -> usize {
        self.graph.clear_visited();
        let vertices: Vec<CellId> = self.graph.vertices().collect();
        let mut members = Vec::new();
        let mut sets = 0;
        for v in vertices {
            if self.graph.visited(v) {
                continue;
            }
            members.clear();
            self.graph.linked_comps(v, &mut members, self.config.branch_cap);
            sets += 1;
        }
        self.comps.len() + sets - self.graph.vertex_count()
    }

    /// Fragments whose voxel count lies strictly inside the configured size
    /// window, with their total voxel count and physical volume.
    pub fn count(&self) -> CompCount {
        let lo = self.config.min_size.unwrap_or(0);
        let hi = self.config.max_size;
        let mut out = CompCount::default();
        for (_, cell) in self.comps.iter() {
            let size = cell.size_ui();
            if size > lo && hi.map_or(true, |hi| size < hi) {
                out.count += 1;
                out.voxels += size as u64;
            }
        }
        let spacing = self.comps.spacing();
        out.physical_size = out.voxels as f64 * spacing.x * spacing.y * spacing.z;
        out
    }

    /// Copy the cells under `keys` into a new list. With `links`, every
    /// fragment linked to one of them is copied as well. Unknown keys are
    /// ignored; the new list keeps this list's spacing and size range.
    pub fn celps_from_keys(&mut self, keys: &[CellKey], links: bool) -> CelpList {
        let mut out = CelpList::new(self.comps.spacing());
        out.copy_size_range(&self.comps);
        let mut members = Vec::new();

        for &key in keys {
            let Some(id) = self.comps.id_of(key) else {
                continue;
            };
            copy_cell(&mut out, self.comps.cell(id));
            if !links {
                continue;
            }
            self.graph.clear_visited();
            members.clear();
            self.graph
                .linked_comps(id, &mut members, self.config.branch_cap);
            for &m in &members {
                copy_cell(&mut out, self.comps.cell(m));
            }
        }
        out
    }

    /// Keys of the component under a voxel-space point, including every
    /// fragment linked to it. Empty for points outside the volume or on
    /// unlabeled voxels.
    pub fn comps_at_point(&mut self, volume: &BrickVolume, point: DVec3) -> BTreeSet<CellKey> {
        let mut keys = BTreeSet::new();
        let rounded = (point + DVec3::splat(0.5)).floor();
        if rounded.min_element() < 0.0 {
            return keys;
        }
        let global = [rounded.x as usize, rounded.y as usize, rounded.z as usize];
        let dims = volume.dims();
        if (0..3).any(|a| global[a] >= dims[a]) {
            return keys;
        }
        let Some((brick, [i, j, k])) = volume.brick_at(global) else {
            return keys;
        };
        let label = brick.label()[(i, j, k)];
        if label == 0 {
            return keys;
        }

        let key = CellKey::new(label, brick.id());
        keys.insert(key);
        if let Some(id) = self.comps.id_of(key) {
            self.graph.clear_visited();
            let mut members = Vec::new();
            self.graph
                .linked_comps(id, &mut members, self.config.branch_cap);
            keys.extend(members.into_iter().map(|m| self.comps.cell(m).key()));
        }
        keys
    }

    /// Id-based color of a label, `None` for background. Linked fragments
    /// share a color after consistency repair since their ids agree modulo
    /// [`COLOR_PERIOD`].
    pub fn color_of(&self, label: u32) -> Option<[f32; 3]> {
        (label != 0).then(|| label_color(label))
    }

    /// Fragment size normalized into [0, 1] over the list's size range.
    pub fn size_ratio(&self, label: u32, brick: u32) -> f64 {
        let Some(cell) = self.comps.get(CellKey::new(label, brick)) else {
            return 0.0;
        };
        let (lo, hi) = (self.comps.min_size(), self.comps.max_size());
        if hi <= lo {
            return 1.0;
        }
        ((cell.size_ui().saturating_sub(lo)) as f64 / (hi - lo) as f64).clamp(0.0, 1.0)
    }

    /// Write the tab-separated component list.
    pub fn write_comp_list<W: std::io::Write>(
        &mut self,
        out: &mut W,
        verbose: bool,
        row_prefix: Option<&str>,
    ) -> crate::Result<()> {
        let comp_size = if verbose { Some(self.comp_size()) } else { None };
        let names: Vec<&str> = if self.colocalized {
            self.channels.iter().map(|c| c.name()).collect()
        } else {
            Vec::new()
        };
        report::write_comp_list(
            out,
            report::ReportContext {
                comps: &self.comps,
                graph: &mut self.graph,
                branch_cap: self.config.branch_cap,
                multi_brick: self.multi_brick,
                value_scale: self.value_scale,
                channels: &names,
                comp_size,
                row_prefix,
            },
        )
    }
}

fn copy_cell(out: &mut CelpList, cell: &Cell) {
    if out.id_of(cell.key()).is_none() {
        out.insert(cell.clone());
    }
}
