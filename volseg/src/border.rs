//! Voxel pairs across a shared brick face.
//!
//! Bricks are not padded with each other's voxels, so a face contact pairs the
//! outermost layer of one brick with the outermost layer of its neighbor. Only
//! the overlapping extent of the two faces is visited.

use crate::brick::Face;

/// Call `f(near, far)` for every pair of local coordinates touching across
/// `face` of the near brick.
pub(crate) fn for_each_contact(
    near_dims: [usize; 3],
    far_dims: [usize; 3],
    face: Face,
    mut f: impl FnMut([usize; 3], [usize; 3]),
) {
    let axis = face.axis();
    let (near_layer, far_layer) = if face.is_positive() {
        (near_dims[axis] - 1, 0)
    } else {
        (0, far_dims[axis] - 1)
    };

    // The two in-plane axes, in x, y, z order.
    let (u, v) = match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let nu = near_dims[u].min(far_dims[u]);
    let nv = near_dims[v].min(far_dims[v]);

    for b in 0..nv {
        for a in 0..nu {
            let mut near = [0; 3];
            near[axis] = near_layer;
            near[u] = a;
            near[v] = b;
            let mut far = near;
            far[axis] = far_layer;
            f(near, far);
        }
    }
}

/// True if a local coordinate lies on any outer face of a brick.
#[inline]
pub(crate) fn on_brick_boundary(dims: [usize; 3], p: [usize; 3]) -> bool {
    (0..3).any(|a| p[a] == 0 || p[a] + 1 == dims[a])
}
