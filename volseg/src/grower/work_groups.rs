//! Tiling of a brick into fixed-size work groups.

/// A brick split into boxes of at most `extent` voxels. Kernels run one rayon
/// task per group.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkGroups {
    dims: [usize; 3],
    extent: [usize; 3],
    counts: [usize; 3],
}

impl WorkGroups {
    pub fn new(dims: [usize; 3], extent: [usize; 3]) -> Self {
        let extent = [
            extent[0].clamp(1, dims[0].max(1)),
            extent[1].clamp(1, dims[1].max(1)),
            extent[2].clamp(1, dims[2].max(1)),
        ];
        let counts = [
            dims[0].div_ceil(extent[0]),
            dims[1].div_ceil(extent[1]),
            dims[2].div_ceil(extent[2]),
        ];
        Self {
            dims,
            extent,
            counts,
        }
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    /// Half-open voxel box `[lo, hi)` of group `g`.
    pub fn bounds(&self, g: usize) -> ([usize; 3], [usize; 3]) {
        let gx = g % self.counts[0];
        let gy = (g / self.counts[0]) % self.counts[1];
        let gz = g / (self.counts[0] * self.counts[1]);
        let lo = [
            gx * self.extent[0],
            gy * self.extent[1],
            gz * self.extent[2],
        ];
        let hi = [
            (lo[0] + self.extent[0]).min(self.dims[0]),
            (lo[1] + self.extent[1]).min(self.dims[1]),
            (lo[2] + self.extent[2]).min(self.dims[2]),
        ];
        (lo, hi)
    }
}
