//! Error types for volume construction and report output.
//!
//! Analysis and growing never fail: missing inputs make them return early.

use thiserror::Error;

use crate::brick::BitDepth;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Brick dimensions must be nonzero, got {0:?}")]
    EmptyBrickDims([usize; 3]),

    #[error("Brick at {origin:?}: {channel} channel has dims {actual:?}, expected {expected:?}")]
    ChannelDims {
        origin: [usize; 3],
        channel: &'static str,
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("Brick at {origin:?} with dims {dims:?} exceeds volume dims {volume:?}")]
    BrickOutOfBounds {
        origin: [usize; 3],
        dims: [usize; 3],
        volume: [usize; 3],
    },

    #[error("Brick at {origin:?} stores {actual:?} data, volume uses {expected:?}")]
    BitDepthMismatch {
        origin: [usize; 3],
        expected: BitDepth,
        actual: BitDepth,
    },

    #[error("Two bricks share origin {0:?}")]
    DuplicateOrigin([usize; 3]),

    #[error("Failed to write component list: {0}")]
    Write(#[from] std::io::Error),
}
