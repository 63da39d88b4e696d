//! 2D geometry operations on the XZ plane
//!
//! Contour extraction works on integer voxel-corner coordinates in a Y-up
//! coordinate system, so these helpers operate on the XZ plane with `i32`
//! lattice points.

/// Twice the signed area of the triangle `(a, b, c)` on the XZ plane.
///
/// Positive when `c` lies to the right of the directed line `a -> b`
/// (looking down the Y axis), negative to the left, zero when collinear.
#[inline]
pub fn tri_area_2d(ax: i32, az: i32, bx: i32, bz: i32, cx: i32, cz: i32) -> i32 {
    (bx - ax) * (cz - az) - (cx - ax) * (bz - az)
}

/// Check if point `c` is left of or on the directed line `a -> b` (XZ plane).
#[inline]
pub fn left_on_2d(ax: i32, az: i32, bx: i32, bz: i32, cx: i32, cz: i32) -> bool {
    tri_area_2d(ax, az, bx, bz, cx, cz) <= 0
}

/// Squared distance from the point `(x, z)` to the segment `(px, pz) -> (qx, qz)`
/// on the XZ plane.
///
/// Endpoints are handled as segment distance, not line distance. The result is
/// squared so callers can compare against a squared tolerance without taking
/// a root.
pub fn distance_pt_seg_sqr_2d(x: i32, z: i32, px: i32, pz: i32, qx: i32, qz: i32) -> f32 {
    let pqx = (qx - px) as f32;
    let pqz = (qz - pz) as f32;
    let mut dx = (x - px) as f32;
    let mut dz = (z - pz) as f32;
    let d = pqx * pqx + pqz * pqz;

    if d > 0.0 {
        let t = ((pqx * dx + pqz * dz) / d).clamp(0.0, 1.0);
        dx = px as f32 + t * pqx - x as f32;
        dz = pz as f32 + t * pqz - z as f32;
    }

    dx * dx + dz * dz
}

/// Previous index in a ring of `n` elements.
#[inline]
pub fn prev_index(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

/// Next index in a ring of `n` elements.
#[inline]
pub fn next_index(i: usize, n: usize) -> usize {
    (i + 1) % n
}
