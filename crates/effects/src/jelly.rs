//! Spring-relaxation mesh with a direct-displacement pinch.
//!
//! Every vertex is tethered to its rest position by a spring and damped
//! toward standstill. While the probe reports a hit, a pinch branch bypasses
//! the spring and pulls vertices straight toward the probe point, scaled by
//! `max(0, brush_radius - distance) * brush_strength`; distance falloff
//! means far-away probe points simply do nothing.

use glam::Vec3;

use fieldgraph::{
    ComponentWidth, Expr, GraphError, KernelBuilder, SimContext, Simulation, StateBufferStore,
    UniformValue, POINTER_UNIFORM,
};

use crate::{BuiltDemo, DemoBindings};

pub const ELASTICITY: &str = "elasticity";
pub const DAMPING: &str = "damping";
pub const BRUSH_RADIUS: &str = "brush_radius";
pub const BRUSH_STRENGTH: &str = "brush_strength";

/// Builds the jelly simulation over the given rest positions (one element
/// per mesh vertex).
pub fn jelly(rest_positions: &[Vec3]) -> Result<BuiltDemo, GraphError> {
    let count = rest_positions.len();
    let mut store = StateBufferStore::new(count);
    let base_position = store.allocate("base_position", ComponentWidth::Vec3, count)?;
    let position = store.allocate("position", ComponentWidth::Vec3, count)?;
    let velocity = store.allocate("velocity", ComponentWidth::Vec3, count)?;

    let lanes: Vec<f32> = rest_positions
        .iter()
        .flat_map(|p| p.to_array())
        .collect();
    store.seed(base_position, &lanes)?;
    store.seed(position, &lanes)?;

    let mut ctx = SimContext::new();
    ctx.declare(ELASTICITY, UniformValue::Float(0.04))
        .declare(DAMPING, UniformValue::Float(0.94))
        .declare(BRUSH_RADIUS, UniformValue::Float(0.25))
        .declare(BRUSH_STRENGTH, UniformValue::Float(0.22))
        .declare(POINTER_UNIFORM, UniformValue::Vec4(glam::Vec4::ZERO));

    let mut init = KernelBuilder::new("jelly_init");
    init.assign(position, Expr::element(base_position));
    init.assign(velocity, fieldgraph::vec3(0.0, 0.0, 0.0));
    let init = init.build(&store, &ctx)?;

    let mut update = KernelBuilder::new("jelly_update");
    let pointer = Expr::uniform(POINTER_UNIFORM);
    update.if_then(pointer.clone().w().eq(1.0), |k| {
        let current = Expr::element(position);
        let dist = k.local(current.clone().distance(pointer.clone().xyz()));
        let direction = k.local((pointer.clone().xyz() - current).normalize());
        let power = k.local(
            (Expr::uniform(BRUSH_RADIUS) - dist).max(0.0) * Expr::uniform(BRUSH_STRENGTH),
        );
        // Pinching moves the position directly rather than applying a
        // force; the spring below then relaxes it back.
        k.add_assign(position, direction * power);
    });
    let force = update.local(
        Expr::uniform(ELASTICITY) * (Expr::element(base_position) - Expr::element(position)),
    );
    update.add_assign(velocity, force);
    update.mul_assign(velocity, Expr::uniform(DAMPING));
    update.add_assign(position, Expr::element(velocity));
    let update = update.build(&store, &ctx)?;

    Ok(BuiltDemo {
        sim: Simulation::new(store, ctx, init, update),
        bindings: DemoBindings {
            position,
            color: None,
            progress: None,
            random: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    fn vertex_positions() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        ]
    }

    fn displacement(sim: &Simulation, position: fieldgraph::BufferHandle, rest: &[Vec3]) -> f32 {
        let view = sim.store().attribute_view(position);
        rest.iter()
            .enumerate()
            .map(|(i, p)| {
                let q = Vec3::new(view[i * 3], view[i * 3 + 1], view[i * 3 + 2]);
                (q - *p).length()
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn rest_state_is_a_fixed_point() {
        let rest = vertex_positions();
        let mut demo = jelly(&rest).unwrap();
        demo.sim.dispatch_init().unwrap();
        for _ in 0..10 {
            demo.sim.dispatch_update().unwrap();
        }
        assert!(displacement(&demo.sim, demo.bindings.position, &rest) < 1e-6);
    }

    #[test]
    fn spring_converges_with_brush_inactive() {
        let rest = vertex_positions();
        let mut demo = jelly(&rest).unwrap();
        demo.sim.dispatch_init().unwrap();
        // Kick every vertex with a nonzero velocity.
        let velocity = demo.sim.store().handle("velocity").unwrap();
        let kicked: Vec<f32> = rest.iter().flat_map(|_| [0.3, -0.2, 0.1]).collect();
        demo.sim.store_mut().seed(velocity, &kicked).unwrap();

        for _ in 0..400 {
            demo.sim.dispatch_update().unwrap();
        }
        assert!(
            displacement(&demo.sim, demo.bindings.position, &rest) < 1e-3,
            "spring failed to converge"
        );
    }

    #[test]
    fn pinch_pulls_vertices_toward_probe() {
        let rest = vertex_positions();
        let mut demo = jelly(&rest).unwrap();
        demo.sim.dispatch_init().unwrap();
        let probe = Vec3::new(0.1, 0.1, 0.2);
        demo.sim
            .context_mut()
            .set_vec4(POINTER_UNIFORM, Vec4::new(probe.x, probe.y, probe.z, 1.0))
            .unwrap();
        demo.sim.dispatch_update().unwrap();

        let view = demo.sim.store().attribute_view(demo.bindings.position);
        let moved = Vec3::new(view[0], view[1], view[2]);
        let before = (rest[0] - probe).length();
        let after = (moved - probe).length();
        assert!(after < before, "vertex did not move toward the probe");
    }

    #[test]
    fn probe_far_outside_mesh_is_damped_to_nothing() {
        let rest = vertex_positions();
        let mut demo = jelly(&rest).unwrap();
        demo.sim.dispatch_init().unwrap();
        demo.sim
            .context_mut()
            .set_vec4(POINTER_UNIFORM, Vec4::new(50.0, 50.0, 50.0, 1.0))
            .unwrap();
        demo.sim.dispatch_update().unwrap();
        assert!(displacement(&demo.sim, demo.bindings.position, &rest) < 1e-6);
    }

    #[test]
    fn default_uniform_values() {
        let demo = jelly(&vertex_positions()).unwrap();
        let ctx = demo.sim.context();
        assert_eq!(ctx.get_float(ELASTICITY), Some(0.04));
        assert_eq!(ctx.get_float(DAMPING), Some(0.94));
        assert_eq!(ctx.get_float(BRUSH_RADIUS), Some(0.25));
        assert_eq!(ctx.get_float(BRUSH_STRENGTH), Some(0.22));
        assert_eq!(ctx.get(POINTER_UNIFORM), Some(&UniformValue::Vec4(Vec4::ZERO)));
    }
}
