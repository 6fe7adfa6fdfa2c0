//! Tab-separated component list and per-id colors.

use std::io::Write;

use crate::cell::{Cell, CelpList};
use crate::graph::CellGraph;

/// Ids congruent modulo this period map to the same color.
pub const COLOR_PERIOD: u32 = 253;

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;

/// Deterministic fully saturated color for a label id.
pub fn label_color(id: u32) -> [f32; 3] {
    let hue = ((id % COLOR_PERIOD) as f64 * GOLDEN_RATIO_CONJUGATE).fract();
    hsv_to_rgb(hue * 6.0)
}

fn hsv_to_rgb(h: f64) -> [f32; 3] {
    let sector = h.floor();
    let f = (h - sector) as f32;
    let (q, t) = (1.0 - f, f);
    match sector as u32 % 6 {
        0 => [1.0, t, 0.0],
        1 => [q, 1.0, 0.0],
        2 => [0.0, 1.0, t],
        3 => [0.0, q, 1.0],
        4 => [t, 0.0, 1.0],
        _ => [1.0, 0.0, q],
    }
}

pub(super) struct ReportContext<'a> {
    pub comps: &'a CelpList,
    pub graph: &'a mut CellGraph,
    pub branch_cap: usize,
    pub multi_brick: bool,
    /// Multiplier turning normalized intensities back into raw values.
    pub value_scale: f64,
    pub channels: &'a [&'a str],
    pub comp_size: Option<usize>,
    pub row_prefix: Option<&'a str>,
}

pub(super) fn write_comp_list<W: Write>(out: &mut W, mut ctx: ReportContext<'_>) -> crate::Result<()> {
    if let Some(n) = ctx.comp_size {
        writeln!(out, "A total of {n} component(s) in the list")?;
    }

    write_header(out, &ctx)?;

    ctx.graph.clear_visited();
    let spacing = ctx.comps.spacing();
    let voxel_volume = spacing.x * spacing.y * spacing.z;
    let mut members = Vec::new();

    for (key, cell) in ctx.comps.iter() {
        if ctx.multi_brick {
            let Some(id) = ctx.comps.id_of(key) else {
                continue;
            };
            if ctx.graph.visited(id) {
                continue;
            }
            members.clear();
            ctx.graph.linked_comps(id, &mut members, ctx.branch_cap);
        }
        write_row(out, &ctx, cell, voxel_volume)?;
    }
    Ok(())
}

fn write_header<W: Write>(out: &mut W, ctx: &ReportContext<'_>) -> std::io::Result<()> {
    if ctx.row_prefix.is_some() {
        write!(out, "\t")?;
    }
    write!(out, "ID\t")?;
    if ctx.multi_brick {
        write!(out, "BRICK_ID\t")?;
    }
    write!(
        out,
        "PosX\tPosY\tPosZ\tSumN\tSumI\tPhysN\tPhysI\tSurfN\tSurfI\tMean\tSigma\tMin\tMax\tPcaL"
    )?;
    for name in ctx.channels {
        write!(out, "\t{name}N\t{name}I")?;
    }
    writeln!(out)
}

fn write_row<W: Write>(
    out: &mut W,
    ctx: &ReportContext<'_>,
    cell: &Cell,
    voxel_volume: f64,
) -> std::io::Result<()> {
    let scale = ctx.value_scale;
    if let Some(prefix) = ctx.row_prefix {
        write!(out, "{prefix}\t")?;
    }
    write!(out, "{}\t", cell.id())?;
    if ctx.multi_brick {
        write!(out, "{}\t", cell.brick())?;
    }
    let center = cell.center(ctx.comps.spacing());
    write!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        center.x,
        center.y,
        center.z,
        cell.size_ui(),
        cell.size_d(scale),
        cell.size_ui() as f64 * voxel_volume,
        cell.size_d(scale * voxel_volume),
        cell.ext_ui(),
        cell.ext_d(scale),
        cell.mean(scale),
        cell.std(scale),
        cell.min(scale),
        cell.max(scale),
        cell.pca_lengths().x,
    )?;
    for c in 0..ctx.channels.len() {
        write!(out, "\t{}\t{}", cell.coloc_size_ui(c), cell.coloc_size_d(c))?;
    }
    writeln!(out)
}
