//! Pitched 3-D voxel grid.
//!
//! Storage may be padded: each row holds `pitch_x >= nx` elements and each
//! slice holds `pitch_y >= ny` rows. Code that wants a dense view copies the
//! extent out with [`Grid3::pack`] and writes results back with [`Grid3::unpack`].

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid3<T> {
    voxels: Vec<T>,
    nx: usize,
    ny: usize,
    nz: usize,
    pitch_x: usize,
    pitch_y: usize,
}

impl<T> Grid3<T> {
    /// Dense grid, no padding.
    pub fn new(nx: usize, ny: usize, nz: usize, voxels: Vec<T>) -> Self {
        Self::with_pitch(nx, ny, nz, nx, ny, voxels)
    }

    pub fn with_pitch(
        nx: usize,
        ny: usize,
        nz: usize,
        pitch_x: usize,
        pitch_y: usize,
        voxels: Vec<T>,
    ) -> Self {
        assert!(pitch_x >= nx, "row pitch {pitch_x} smaller than nx {nx}");
        assert!(pitch_y >= ny, "slice pitch {pitch_y} smaller than ny {ny}");
        assert_eq!(
            voxels.len(),
            pitch_x * pitch_y * nz,
            "voxel count must equal pitch_x * pitch_y * nz"
        );
        Self {
            voxels,
            nx,
            ny,
            nz,
            pitch_x,
            pitch_y,
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Number of voxels inside the extent (padding excluded).
    #[inline]
    pub fn extent_len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.pitch_x == self.nx && self.pitch_y == self.ny
    }

    /// Storage offset of voxel `(i, j, k)`.
    #[inline]
    pub fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        (k * self.pitch_y + j) * self.pitch_x + i
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> &T {
        &self.voxels[self.offset(i, j, k)]
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize, j: usize, k: usize) -> &mut T {
        let offset = self.offset(i, j, k);
        &mut self.voxels[offset]
    }

    /// Raw storage including padding.
    #[inline]
    pub fn storage(&self) -> &[T] {
        &self.voxels
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut [T] {
        &mut self.voxels
    }

    /// Iterate storage rows of the extent, one `&[T]` of length `nx` per `(j, k)`.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.nz).flat_map(move |k| {
            (0..self.ny).map(move |j| {
                let start = self.offset(0, j, k);
                &self.voxels[start..start + self.nx]
            })
        })
    }
}

impl<T: Copy> Grid3<T> {
    /// Copy the extent into a dense x-fastest vector.
    pub fn pack(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.extent_len());
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Write a dense x-fastest vector back into the extent.
    pub fn unpack(&mut self, dense: &[T]) {
        assert_eq!(dense.len(), self.extent_len(), "dense length mismatch");
        if self.nx == 0 {
            return;
        }
        for (row_idx, src) in dense.chunks_exact(self.nx).enumerate() {
            let j = row_idx % self.ny;
            let k = row_idx / self.ny;
            let start = self.offset(0, j, k);
            self.voxels[start..start + self.nx].copy_from_slice(src);
        }
    }
}

impl<T: Default + Clone> Grid3<T> {
    pub fn new_default(nx: usize, ny: usize, nz: usize) -> Self {
        Self::new(nx, ny, nz, vec![T::default(); nx * ny * nz])
    }
}

impl<T: Clone> Grid3<T> {
    pub fn new_filled(nx: usize, ny: usize, nz: usize, value: T) -> Self {
        Self::new(nx, ny, nz, vec![value; nx * ny * nz])
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.voxels.fill(value);
    }
}

impl<T> Index<(usize, usize, usize)> for Grid3<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &Self::Output {
        self.get(i, j, k)
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Grid3<T> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut Self::Output {
        self.get_mut(i, j, k)
    }
}
