//! Procedural geometry for the pinch demo.

use glam::Vec3;
use scheduler::probe::TriangleMesh;

/// UV sphere with `sectors` longitude divisions and `stacks` latitude
/// divisions. Vertex order runs pole to pole, ring by ring.
pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> TriangleMesh {
    use std::f32::consts::PI;

    let mut positions = Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();
        for sector in 0..=sectors {
            let theta = 2.0 * PI * sector as f32 / sectors as f32;
            positions.push(
                Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin()) * radius,
            );
        }
    }

    let ring = sectors + 1;
    let mut triangles = Vec::with_capacity((stacks * sectors * 2) as usize);
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * ring + sector;
            let b = a + ring;
            if stack > 0 {
                triangles.push([a, b, a + 1]);
            }
            if stack + 1 < stacks {
                triangles.push([a + 1, b, b + 1]);
            }
        }
    }

    TriangleMesh {
        positions,
        triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_has_expected_counts() {
        let mesh = uv_sphere(1.0, 8, 6);
        assert_eq!(mesh.positions.len(), 9 * 7);
        // Pole stacks contribute one triangle per sector, the middle four
        // stacks two each: 8 + 8 + 4 * 16.
        assert_eq!(mesh.triangles.len(), 80);
    }

    #[test]
    fn all_vertices_sit_on_the_radius() {
        let mesh = uv_sphere(2.5, 12, 8);
        for p in &mesh.positions {
            assert!((p.length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn triangle_indices_are_in_bounds() {
        let mesh = uv_sphere(1.0, 10, 5);
        let count = mesh.positions.len() as u32;
        for tri in &mesh.triangles {
            assert!(tri.iter().all(|&i| i < count));
        }
    }
}
