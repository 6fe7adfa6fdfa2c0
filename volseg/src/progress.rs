//! Progress reporting for analysis and growing passes.

use common::Callback;

/// Progress information, emitted once per processed brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    /// Index of the brick just processed.
    pub current: usize,
    /// Number of bricks in the volume.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-brick statistics scan.
    Scan,
    /// Face matching between neighboring bricks.
    Match,
    /// Id consistency repair (emitted once at the end).
    Consistency,
    /// Per-brick grow dispatch sequence.
    Grow,
    /// Done-bit finalization.
    Finalize,
}

pub type ProgressCallback = Callback<Progress>;

pub(crate) fn report(callback: &ProgressCallback, stage: Stage, current: usize, total: usize) {
    callback.emit(Progress {
        stage,
        current,
        total,
    });
}
