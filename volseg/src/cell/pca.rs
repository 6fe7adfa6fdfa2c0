//! Streaming second-moment accumulator for fragment shape.

use glam::DVec3;
use nalgebra::{Matrix3, SymmetricEigen};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pca {
    n: u64,
    sum: DVec3,
    // xx, yy, zz, xy, xz, yz
    sq: [f64; 6],
}

impl Pca {
    #[inline]
    pub fn add_point(&mut self, p: DVec3) {
        self.n += 1;
        self.sum += p;
        self.sq[0] += p.x * p.x;
        self.sq[1] += p.y * p.y;
        self.sq[2] += p.z * p.z;
        self.sq[3] += p.x * p.y;
        self.sq[4] += p.x * p.z;
        self.sq[5] += p.y * p.z;
    }

    pub fn merge(&mut self, other: &Pca) {
        self.n += other.n;
        self.sum += other.sum;
        for (a, b) in self.sq.iter_mut().zip(other.sq) {
            *a += b;
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn covariance(&self) -> Matrix3<f64> {
        if self.n == 0 {
            return Matrix3::zeros();
        }
        let n = self.n as f64;
        let m = self.sum / n;
        let xx = self.sq[0] / n - m.x * m.x;
        let yy = self.sq[1] / n - m.y * m.y;
        let zz = self.sq[2] / n - m.z * m.z;
        let xy = self.sq[3] / n - m.x * m.y;
        let xz = self.sq[4] / n - m.x * m.z;
        let yz = self.sq[5] / n - m.y * m.z;
        Matrix3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz)
    }

    /// Lengths of the principal axes, longest first.
    ///
    /// Each length is `sqrt(12 * lambda)`: the extent of a uniform segment with
    /// the same variance as the point cloud along that axis.
    pub fn lengths(&self) -> DVec3 {
        if self.n < 2 {
            return DVec3::ZERO;
        }
        let eigen = SymmetricEigen::new(self.covariance());
        let mut l = [
            eigen.eigenvalues[0].max(0.0),
            eigen.eigenvalues[1].max(0.0),
            eigen.eigenvalues[2].max(0.0),
        ];
        l.sort_by(|a, b| b.total_cmp(a));
        DVec3::new(
            (12.0 * l[0]).sqrt(),
            (12.0 * l[1]).sqrt(),
            (12.0 * l[2]).sqrt(),
        )
    }
}
