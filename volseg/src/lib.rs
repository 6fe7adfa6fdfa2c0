//! Volseg - component analysis and region growing on bricked volumes.
//!
//! A large 3-D volume is split into bricks that are scanned one at a time.
//! This crate provides:
//! - Per-brick component statistics ([`Cell`], [`CelpList`])
//! - Cross-brick fragment stitching ([`CellGraph`])
//! - Static analysis of an already-labeled volume ([`ComponentAnalyzer`])
//! - Bounded parallel region growing from a mask ([`RegionGrower`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use volseg::{AnalyzeOptions, AnalyzerConfig, BrickVolume, ComponentAnalyzer};
//!
//! let mut volume = BrickVolume::from_dense(data, None, labels, [128, 128, 64], spacing)?;
//! let mut analyzer = ComponentAnalyzer::new(AnalyzerConfig::default());
//! analyzer.analyze(&mut volume, AnalyzeOptions::default());
//!
//! println!("{} components in {} fragments", analyzer.comp_size(), analyzer.list_size());
//! analyzer.write_comp_list(&mut std::io::stdout(), true, None)?;
//! ```

pub(crate) mod border;
pub mod brick;
pub mod cell;
pub mod config;
pub mod error;
pub mod graph;
pub mod progress;

mod analyzer;
mod grower;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Volume storage
// ============================================================================

pub use brick::{BitDepth, Brick, BrickVolume, Face, Intensity, DONE_BIT, ID_MASK};

// ============================================================================
// Statistics model
// ============================================================================

pub use cell::{Cell, CellId, CellKey, CelpList, ColocSample, Pca, VoxelSample};
pub use graph::CellGraph;

// ============================================================================
// Passes
// ============================================================================

pub use analyzer::{
    label_color, AnalyzeOptions, ColocalChannel, CompCount, ComponentAnalyzer, COLOR_PERIOD,
};
pub use grower::{GrowReport, Marker, MarkerSink, RegionGrower};

// ============================================================================
// Configuration, progress, errors
// ============================================================================

pub use config::{AnalyzerConfig, GrowerConfig, SeedPolicy};
pub use error::{Error, Result};
pub use progress::{Progress, ProgressCallback, Stage};
