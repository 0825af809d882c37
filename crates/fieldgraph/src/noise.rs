//! Deterministic 3D gradient noise.
//!
//! Classic lattice noise with integer-hash gradient selection, used by the
//! dissolve kernels for spatially staggered fade timings. The same inputs
//! always produce the same field, so kernel dispatches stay reproducible
//! across runs and hosts.

use glam::Vec3;

/// Avalanching integer hash (Wang-style) mixing lattice coordinates.
fn hash(mut x: u32) -> u32 {
    x = x.wrapping_mul(0x27d4_eb2d) ^ (x >> 15);
    x = x.wrapping_mul(0x8559_ebb5) ^ (x >> 13);
    x ^ (x >> 16)
}

fn lattice_hash(ix: i32, iy: i32, iz: i32) -> u32 {
    let mixed = (ix as u32)
        .wrapping_mul(0x9e37_79b1)
        .wrapping_add((iy as u32).wrapping_mul(0x85eb_ca77))
        .wrapping_add((iz as u32).wrapping_mul(0xc2b2_ae3d));
    hash(mixed)
}

/// One of the twelve edge gradients of the cube, picked by hash.
fn gradient(h: u32) -> Vec3 {
    const GRADS: [[f32; 3]; 12] = [
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
        [1.0, -1.0, 0.0],
        [-1.0, -1.0, 0.0],
        [1.0, 0.0, 1.0],
        [-1.0, 0.0, 1.0],
        [1.0, 0.0, -1.0],
        [-1.0, 0.0, -1.0],
        [0.0, 1.0, 1.0],
        [0.0, -1.0, 1.0],
        [0.0, 1.0, -1.0],
        [0.0, -1.0, -1.0],
    ];
    Vec3::from_array(GRADS[(h % 12) as usize])
}

/// Quintic fade curve, zero first and second derivatives at the cell edges.
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Samples scalar gradient noise at `p`. Output stays within roughly
/// `[-1, 1]`; callers remap rather than clamp.
pub fn noise3(p: Vec3) -> f32 {
    let cell = p.floor();
    let frac = p - cell;
    let (ix, iy, iz) = (cell.x as i32, cell.y as i32, cell.z as i32);

    let mut corner = [0.0f32; 8];
    for (n, slot) in corner.iter_mut().enumerate() {
        let (dx, dy, dz) = ((n & 1) as i32, ((n >> 1) & 1) as i32, ((n >> 2) & 1) as i32);
        let grad = gradient(lattice_hash(ix + dx, iy + dy, iz + dz));
        let offset = frac - Vec3::new(dx as f32, dy as f32, dz as f32);
        *slot = grad.dot(offset);
    }

    let u = fade(frac.x);
    let v = fade(frac.y);
    let w = fade(frac.z);

    let x00 = lerp(corner[0], corner[1], u);
    let x10 = lerp(corner[2], corner[3], u);
    let x01 = lerp(corner[4], corner[5], u);
    let x11 = lerp(corner[6], corner[7], u);
    let y0 = lerp(x00, x10, v);
    let y1 = lerp(x01, x11, v);
    lerp(y0, y1, w)
}

/// Three decorrelated scalar samples packed into a vector, for positional
/// jitter. Offsets keep the channels from sharing lattice alignment.
pub fn noise3_vec3(p: Vec3) -> Vec3 {
    Vec3::new(
        noise3(p),
        noise3(p + Vec3::new(31.416, 27.183, 14.142)),
        noise3(p + Vec3::new(-17.321, 57.722, 23.606)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let p = Vec3::new(1.25, -3.5, 0.75);
        assert_eq!(noise3(p), noise3(p));
        assert_eq!(noise3_vec3(p), noise3_vec3(p));
    }

    #[test]
    fn stays_within_unit_range() {
        for i in 0..1000 {
            let t = i as f32 * 0.173;
            let p = Vec3::new(t.sin() * 40.0, t * 0.7 - 20.0, (t * 1.3).cos() * 25.0);
            let n = noise3(p);
            assert!((-1.0..=1.0).contains(&n), "noise3({p:?}) = {n} out of range");
        }
    }

    #[test]
    fn varies_over_space() {
        let a = noise3(Vec3::new(0.4, 0.4, 0.4));
        let b = noise3(Vec3::new(5.7, 1.9, -2.3));
        assert_ne!(a, b);
    }
}
