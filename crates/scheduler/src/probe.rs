//! Pointer-to-simulation interaction probes.
//!
//! Two probe styles cover the demos: a continuous world-space probe that
//! ray-casts the pointer against the rendered mesh and writes the
//! single-slot `pointer` uniform, and a discrete lattice probe that picks a
//! target cell per click and pushes an influence event. The lattice probe
//! draws its cell from a seeded RNG rather than the pointer position, so
//! every click scatters a wave from somewhere new.

use glam::{Mat4, Vec2, Vec3, Vec4};
use rand::prelude::*;

use fieldgraph::{InfluenceEvent, Simulation, POINTER_UNIFORM};

/// Orbit-style perspective camera: yaw/pitch around a target at a distance.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, fov_y: f32, aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance,
            yaw: 0.0,
            pitch: 0.0,
            fov_y,
            aspect,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        let limit = std::f32::consts::FRAC_PI_2 - 0.05;
        self.pitch = (self.pitch + delta_pitch).clamp(-limit, limit);
    }

    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a pointer position in normalized device
    /// coordinates (both axes in `[-1, 1]`, y up).
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let origin = self.position();
        let forward = (self.target - origin).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_h = (self.fov_y * 0.5).tan();
        let half_w = half_h * self.aspect;
        let direction =
            (forward + right * ndc.x * half_w + up * ndc.y * half_h).normalize_or_zero();
        Ray { origin, direction }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Mesh surface the world-space probe casts against, supplied by the
/// geometry collaborator.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

/// Nearest intersection of a probe ray with the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldHit {
    pub point: Vec3,
    pub distance: f32,
}

/// Möller–Trumbore ray/triangle intersection; returns the ray parameter of
/// the hit, front or back face alike.
fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge_ab = b - a;
    let edge_ac = c - a;
    let p = ray.direction.cross(edge_ac);
    let det = edge_ab.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let to_origin = ray.origin - a;
    let u = to_origin.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = to_origin.cross(edge_ab);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge_ac.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Converts pointer events into simulation inputs.
pub struct InteractionProbe {
    rng: StdRng,
}

impl InteractionProbe {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Casts the pointer through `camera` into `mesh` and returns the
    /// nearest intersection, if any.
    pub fn resolve(&self, ndc: Vec2, camera: &OrbitCamera, mesh: &TriangleMesh) -> Option<WorldHit> {
        let ray = camera.ray(ndc);
        let mut nearest: Option<WorldHit> = None;
        for triangle in &mesh.triangles {
            let a = mesh.positions[triangle[0] as usize];
            let b = mesh.positions[triangle[1] as usize];
            let c = mesh.positions[triangle[2] as usize];
            if let Some(t) = intersect_triangle(&ray, a, b, c) {
                if nearest.map_or(true, |hit| t < hit.distance) {
                    nearest = Some(WorldHit {
                        point: ray.origin + ray.direction * t,
                        distance: t,
                    });
                }
            }
        }
        nearest
    }

    /// Writes the probe result into the `pointer` uniform: `{point, 1}` on a
    /// hit, `w = 0` otherwise.
    pub fn write_pointer(sim: &mut Simulation, hit: Option<&WorldHit>) {
        let value = match hit {
            Some(hit) => Vec4::new(hit.point.x, hit.point.y, hit.point.z, 1.0),
            None => Vec4::ZERO,
        };
        let _ = sim.context_mut().set_vec4(POINTER_UNIFORM, value);
    }

    /// Picks the lattice cell a click lands on:
    /// `col = floor(rand * side)`, `row = floor(rand * side)`.
    pub fn lattice_click(&mut self, side: u32, timestamp: f32) -> InfluenceEvent {
        let col = (self.rng.gen::<f32>() * side as f32).floor();
        let row = (self.rng.gen::<f32>() * side as f32).floor();
        InfluenceEvent {
            location: row * side as f32 + col,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit quad in the xy plane at z = 0, facing +z.
    fn quad() -> TriangleMesh {
        TriangleMesh {
            positions: vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    fn camera() -> OrbitCamera {
        // Looking down -z from (0, 0, 5).
        OrbitCamera::new(5.0, std::f32::consts::FRAC_PI_4, 1.0)
    }

    #[test]
    fn center_ray_hits_quad_center() {
        let probe = InteractionProbe::new(1);
        let hit = probe.resolve(Vec2::ZERO, &camera(), &quad()).expect("hit");
        assert!(hit.point.length() < 1e-5);
        assert!((hit.distance - 5.0).abs() < 1e-4);
    }

    #[test]
    fn miss_returns_none() {
        let probe = InteractionProbe::new(1);
        // Far off to the side, outside the quad footprint.
        assert!(probe.resolve(Vec2::new(0.95, 0.0), &camera(), &quad()).is_none());
    }

    #[test]
    fn nearest_of_stacked_triangles_wins() {
        let mut mesh = quad();
        let base = mesh.positions.len() as u32;
        // A second quad closer to the camera.
        for p in quad().positions {
            mesh.positions.push(p + Vec3::new(0.0, 0.0, 2.0));
        }
        mesh.triangles.push([base, base + 1, base + 2]);
        mesh.triangles.push([base, base + 2, base + 3]);

        let probe = InteractionProbe::new(1);
        let hit = probe.resolve(Vec2::ZERO, &camera(), &mesh).expect("hit");
        assert!((hit.distance - 3.0).abs() < 1e-4);
        assert!((hit.point.z - 2.0).abs() < 1e-4);
    }

    #[test]
    fn pointer_uniform_reflects_hits_and_misses() {
        use fieldgraph::{
            KernelBuilder, SimContext, Simulation, StateBufferStore, UniformValue,
        };
        let store = StateBufferStore::new(1);
        let mut ctx = SimContext::new();
        ctx.declare(POINTER_UNIFORM, UniformValue::Vec4(Vec4::ZERO));
        let init = KernelBuilder::new("init").build(&store, &ctx).unwrap();
        let update = KernelBuilder::new("update").build(&store, &ctx).unwrap();
        let mut sim = Simulation::new(store, ctx, init, update);

        let hit = WorldHit {
            point: Vec3::new(1.0, 2.0, 3.0),
            distance: 4.0,
        };
        InteractionProbe::write_pointer(&mut sim, Some(&hit));
        assert_eq!(
            sim.context().get(POINTER_UNIFORM),
            Some(&UniformValue::Vec4(Vec4::new(1.0, 2.0, 3.0, 1.0)))
        );
        InteractionProbe::write_pointer(&mut sim, None);
        assert_eq!(
            sim.context().get(POINTER_UNIFORM),
            Some(&UniformValue::Vec4(Vec4::ZERO))
        );
    }

    #[test]
    fn lattice_click_stays_on_the_lattice() {
        let mut probe = InteractionProbe::new(9);
        for _ in 0..100 {
            let event = probe.lattice_click(16, 1.0);
            let cell = event.location;
            assert_eq!(cell, cell.floor());
            assert!((0.0..256.0).contains(&cell));
        }
    }

    #[test]
    fn lattice_click_is_deterministic_per_seed() {
        let mut a = InteractionProbe::new(5);
        let mut b = InteractionProbe::new(5);
        for _ in 0..10 {
            assert_eq!(a.lattice_click(8, 0.0), b.lattice_click(8, 0.0));
        }
    }
}
