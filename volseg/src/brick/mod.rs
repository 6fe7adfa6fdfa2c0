//! Bricked volume storage.
//!
//! A [`BrickVolume`] is a list of [`Brick`]s, each an axis-aligned sub-box of
//! the volume with its own intensity, optional mask and label channels. Face
//! neighbors are derived from brick origins when the volume is assembled; a
//! face with no neighbor points back at the brick itself.

mod scratch;


pub(crate) use scratch::{AnalyzeScratch, LabelScratch};

use common::Grid3;
use glam::DVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// High bit marking a voxel whose region has been finalized by the grower.
pub const DONE_BIT: u32 = 0x8000_0000;
/// Bits of a label that carry the region id.
pub const ID_MASK: u32 = 0x7FFF_FFFF;

// ============================================================================
// Faces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    /// The three faces the analyzer matches across; every shared face is one of
    /// these for exactly one of the two bricks touching it.
    pub const POSITIVE: [Face; 3] = [Face::PosX, Face::PosY, Face::PosZ];

    #[inline]
    pub fn axis(self) -> usize {
        match self {
            Face::NegX | Face::PosX => 0,
            Face::NegY | Face::PosY => 1,
            Face::NegZ | Face::PosZ => 2,
        }
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Face::PosX | Face::PosY | Face::PosZ)
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::NegX => Face::PosX,
            Face::PosX => Face::NegX,
            Face::NegY => Face::PosY,
            Face::PosY => Face::NegY,
            Face::NegZ => Face::PosZ,
            Face::PosZ => Face::NegZ,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Intensity channel
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    U8,
    U16,
}

impl BitDepth {
    /// Largest raw value, used to normalize samples into [0, 1].
    #[inline]
    pub fn max_value(self) -> f64 {
        match self {
            BitDepth::U8 => u8::MAX as f64,
            BitDepth::U16 => u16::MAX as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intensity {
    U8(Grid3<u8>),
    U16(Grid3<u16>),
}

impl Intensity {
    pub fn bit_depth(&self) -> BitDepth {
        match self {
            Intensity::U8(_) => BitDepth::U8,
            Intensity::U16(_) => BitDepth::U16,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        match self {
            Intensity::U8(g) => g.dims(),
            Intensity::U16(g) => g.dims(),
        }
    }

    /// Normalized sample in [0, 1].
    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        match self {
            Intensity::U8(g) => g[(i, j, k)] as f64 / BitDepth::U8.max_value(),
            Intensity::U16(g) => g[(i, j, k)] as f64 / BitDepth::U16.max_value(),
        }
    }

    /// Dense normalized copy of the extent.
    pub fn pack_normalized(&self) -> Vec<f64> {
        let scale = 1.0 / self.bit_depth().max_value();
        match self {
            Intensity::U8(g) => g.rows().flatten().map(|&v| v as f64 * scale).collect(),
            Intensity::U16(g) => g.rows().flatten().map(|&v| v as f64 * scale).collect(),
        }
    }

    fn sub_box(&self, origin: [usize; 3], dims: [usize; 3]) -> Intensity {
        match self {
            Intensity::U8(g) => Intensity::U8(copy_box(g, origin, dims)),
            Intensity::U16(g) => Intensity::U16(copy_box(g, origin, dims)),
        }
    }
}

// ============================================================================
// Brick
// ============================================================================

#[derive(Debug, Clone)]
pub struct Brick {
    id: u32,
    origin: [usize; 3],
    data: Intensity,
    mask: Option<Grid3<u8>>,
    label: Grid3<u32>,
    neighbors: [u32; 6],
}

impl Brick {
    /// Channel grids may be pitched independently but must share one extent.
    pub fn new(
        origin: [usize; 3],
        data: Intensity,
        mask: Option<Grid3<u8>>,
        label: Grid3<u32>,
    ) -> Result<Self> {
        let dims = data.dims();
        if dims.contains(&0) {
            return Err(Error::EmptyBrickDims(dims));
        }
        if label.dims() != dims {
            return Err(Error::ChannelDims {
                origin,
                channel: "label",
                expected: dims,
                actual: label.dims(),
            });
        }
        if let Some(mask) = &mask {
            if mask.dims() != dims {
                return Err(Error::ChannelDims {
                    origin,
                    channel: "mask",
                    expected: dims,
                    actual: mask.dims(),
                });
            }
        }

        Ok(Self {
            id: 0,
            origin,
            data,
            mask,
            label,
            neighbors: [0; 6],
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn origin(&self) -> [usize; 3] {
        self.origin
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.label.dims()
    }

    pub fn voxel_count(&self) -> usize {
        self.label.extent_len()
    }

    /// Number of axes with more than one voxel.
    pub fn active_dims(&self) -> usize {
        self.dims().iter().filter(|&&n| n > 1).count()
    }

    #[inline]
    pub fn data(&self) -> &Intensity {
        &self.data
    }

    #[inline]
    pub fn mask(&self) -> Option<&Grid3<u8>> {
        self.mask.as_ref()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn set_mask(&mut self, mask: Option<Grid3<u8>>) -> Result<()> {
        if let Some(m) = &mask {
            if m.dims() != self.dims() {
                return Err(Error::ChannelDims {
                    origin: self.origin,
                    channel: "mask",
                    expected: self.dims(),
                    actual: m.dims(),
                });
            }
        }
        self.mask = mask;
        Ok(())
    }

    #[inline]
    pub fn label(&self) -> &Grid3<u32> {
        &self.label
    }

    #[inline]
    pub fn label_mut(&mut self) -> &mut Grid3<u32> {
        &mut self.label
    }

    /// Id of the brick across `face`, or this brick's own id when there is none.
    #[inline]
    pub fn neighbor(&self, face: Face) -> u32 {
        self.neighbors[face.index()]
    }

    /// True if the global voxel coordinate lies inside this brick.
    pub fn contains(&self, global: [usize; 3]) -> bool {
        let dims = self.dims();
        (0..3).all(|a| global[a] >= self.origin[a] && global[a] < self.origin[a] + dims[a])
    }

    fn end(&self) -> [usize; 3] {
        let dims = self.dims();
        [
            self.origin[0] + dims[0],
            self.origin[1] + dims[1],
            self.origin[2] + dims[2],
        ]
    }
}

// ============================================================================
// Volume
// ============================================================================

#[derive(Debug, Clone)]
pub struct BrickVolume {
    dims: [usize; 3],
    spacing: DVec3,
    bit_depth: BitDepth,
    bricks: Vec<Brick>,
}

impl BrickVolume {
    /// Assemble a volume from bricks. Ids are assigned in the given order.
    /// Two bricks are face neighbors when one starts exactly where the other
    /// ends and both share the same origin on the other two axes.
    pub fn new(
        dims: [usize; 3],
        spacing: DVec3,
        bit_depth: BitDepth,
        mut bricks: Vec<Brick>,
    ) -> Result<Self> {
        let mut by_origin: HashMap<[usize; 3], u32> = HashMap::with_capacity(bricks.len());

        for (idx, brick) in bricks.iter_mut().enumerate() {
            let end = brick.end();
            if (0..3).any(|a| end[a] > dims[a]) {
                return Err(Error::BrickOutOfBounds {
                    origin: brick.origin,
                    dims: brick.dims(),
                    volume: dims,
                });
            }
            if brick.data.bit_depth() != bit_depth {
                return Err(Error::BitDepthMismatch {
                    origin: brick.origin,
                    expected: bit_depth,
                    actual: brick.data.bit_depth(),
                });
            }
            brick.id = idx as u32;
            if by_origin.insert(brick.origin, brick.id).is_some() {
                return Err(Error::DuplicateOrigin(brick.origin));
            }
        }

        let mut neighbors: Vec<[u32; 6]> = bricks.iter().map(|b| [b.id; 6]).collect();
        for brick in &bricks {
            let end = brick.end();
            for face in Face::POSITIVE {
                let mut origin = brick.origin;
                origin[face.axis()] = end[face.axis()];
                if let Some(&other) = by_origin.get(&origin) {
                    neighbors[brick.id as usize][face.index()] = other;
                    neighbors[other as usize][face.opposite().index()] = brick.id;
                }
            }
        }
        for (brick, n) in bricks.iter_mut().zip(neighbors) {
            brick.neighbors = n;
        }

        Ok(Self {
            dims,
            spacing,
            bit_depth,
            bricks,
        })
    }

    /// Split dense channels into a regular grid of bricks of at most
    /// `brick_dims` voxels. Bricks are numbered x-fastest.
    pub fn from_dense(
        data: Intensity,
        mask: Option<Grid3<u8>>,
        label: Grid3<u32>,
        brick_dims: [usize; 3],
        spacing: DVec3,
    ) -> Result<Self> {
        let dims = data.dims();
        if brick_dims.contains(&0) {
            return Err(Error::EmptyBrickDims(brick_dims));
        }
        if label.dims() != dims {
            return Err(Error::ChannelDims {
                origin: [0; 3],
                channel: "label",
                expected: dims,
                actual: label.dims(),
            });
        }
        if let Some(m) = &mask {
            if m.dims() != dims {
                return Err(Error::ChannelDims {
                    origin: [0; 3],
                    channel: "mask",
                    expected: dims,
                    actual: m.dims(),
                });
            }
        }

        let mut bricks = Vec::new();
        for oz in (0..dims[2]).step_by(brick_dims[2]) {
            for oy in (0..dims[1]).step_by(brick_dims[1]) {
                for ox in (0..dims[0]).step_by(brick_dims[0]) {
                    let origin = [ox, oy, oz];
                    let sub = [
                        brick_dims[0].min(dims[0] - ox),
                        brick_dims[1].min(dims[1] - oy),
                        brick_dims[2].min(dims[2] - oz),
                    ];
                    bricks.push(Brick::new(
                        origin,
                        data.sub_box(origin, sub),
                        mask.as_ref().map(|m| copy_box(m, origin, sub)),
                        copy_box(&label, origin, sub),
                    )?);
                }
            }
        }

        Self::new(dims, spacing, data.bit_depth(), bricks)
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    #[inline]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    #[inline]
    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    #[inline]
    pub fn brick(&self, id: u32) -> &Brick {
        &self.bricks[id as usize]
    }

    #[inline]
    pub fn brick_mut(&mut self, id: u32) -> &mut Brick {
        &mut self.bricks[id as usize]
    }

    pub fn bricks(&self) -> &[Brick] {
        &self.bricks
    }

    pub fn bricks_mut(&mut self) -> &mut [Brick] {
        &mut self.bricks
    }

    /// Brick containing a global voxel and the voxel's local coordinate in it.
    pub fn brick_at(&self, global: [usize; 3]) -> Option<(&Brick, [usize; 3])> {
        let brick = self.bricks.iter().find(|b| b.contains(global))?;
        let o = brick.origin;
        Some((brick, [global[0] - o[0], global[1] - o[1], global[2] - o[2]]))
    }

    /// Gather every brick's label channel into one dense grid.
    pub fn dense_labels(&self) -> Grid3<u32> {
        let [nx, ny, nz] = self.dims;
        let mut out = Grid3::new_default(nx, ny, nz);
        for brick in &self.bricks {
            let [bx, by, bz] = brick.dims();
            let [ox, oy, oz] = brick.origin;
            for k in 0..bz {
                for j in 0..by {
                    for i in 0..bx {
                        out[(ox + i, oy + j, oz + k)] = brick.label[(i, j, k)];
                    }
                }
            }
        }
        out
    }
}

fn copy_box<T: Copy>(src: &Grid3<T>, origin: [usize; 3], dims: [usize; 3]) -> Grid3<T> {
    let mut voxels = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for k in 0..dims[2] {
        for j in 0..dims[1] {
            let start = src.offset(origin[0], origin[1] + j, origin[2] + k);
            voxels.extend_from_slice(&src.storage()[start..start + dims[0]]);
        }
    }
    Grid3::new(dims[0], dims[1], dims[2], voxels)
}
