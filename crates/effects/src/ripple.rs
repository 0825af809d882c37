//! Click-driven wavefront reveal over an image lattice.
//!
//! Every element is one texel-sized tile of a side² lattice. A click pushes
//! a `(cell, timestamp)` influence event; each frame, every element scans
//! the live events and compares the ring radius `(now - t0) * velocity`
//! against its own lattice distance to the event cell. Elements inside the
//! one-cell band get a one-unit progress decrement. The band check
//! re-fires on every frame an element stays inside it; there is
//! deliberately no per-event latch.

use std::f32::consts::{PI, TAU};

use fieldgraph::{
    vec2, vec3, vec4, ComponentWidth, Expr, GraphError, ImageGrid, InfluenceBinding,
    InfluenceRingBuffer, KernelBuilder, SimContext, Simulation, StateBufferStore, UniformValue,
    DELTA_TIME_UNIFORM, TIME_UNIFORM,
};
use glam::Vec2;

use crate::grid::{assign_grid_position, grid_coords};
use crate::{BuiltDemo, DemoBindings};

pub const WAVE_VELOCITY: &str = "wave_velocity";
pub const AMPLITUDE: &str = "amplitude";
pub const PROGRESS_DAMPING: &str = "progress_damping";
pub const INFLUENCES: &str = "influences";
pub const INFLUENCE_COUNT: &str = "influence_count";

/// Upper bound on live influence events; every element scans at most this
/// many per frame, which keeps the per-frame cost at O(N · M).
pub const MAX_EVENTS: usize = 50;

/// Builds the ripple simulation over a `side`² lattice colored by `image`.
pub fn ripple(side: u32, image: ImageGrid) -> Result<BuiltDemo, GraphError> {
    let count = (side * side) as usize;
    let mut store = StateBufferStore::new(count);
    let position = store.allocate("position", ComponentWidth::Vec3, count)?;
    let rotation = store.allocate("rotation", ComponentWidth::Vec3, count)?;
    let color = store.allocate("color", ComponentWidth::Vec4, count)?;
    let progress = store.allocate("progress", ComponentWidth::Scalar, count)?;

    let mut ctx = SimContext::new();
    ctx.declare(WAVE_VELOCITY, UniformValue::Float(30.0))
        .declare(AMPLITUDE, UniformValue::Float(10.0))
        .declare(PROGRESS_DAMPING, UniformValue::Float(0.2))
        .declare(TIME_UNIFORM, UniformValue::Float(0.0))
        .declare(DELTA_TIME_UNIFORM, UniformValue::Float(0.0))
        .declare(INFLUENCES, UniformValue::Vec2Array(vec![Vec2::ZERO; MAX_EVENTS]))
        .declare(INFLUENCE_COUNT, UniformValue::Float(0.0))
        .declare_image("image", image);

    let side_f = side as f32;
    let count_f = count as f32;

    let mut init = KernelBuilder::new("ripple_init");
    let coords = grid_coords(&mut init, side);
    assign_grid_position(&mut init, position, &coords, side);
    init.assign(rotation, vec3(0.0, 0.0, 0.0));
    init.assign(color, Expr::sample("image", coords.uv.clone()));
    init.assign(progress, 1.0);
    let init = init.build(&store, &ctx)?;

    let mut update = KernelBuilder::new("ripple_update");
    let coords = grid_coords(&mut update, side);
    update.assign(
        progress,
        (Expr::element(progress)
            + Expr::uniform(DELTA_TIME_UNIFORM) * Expr::uniform(PROGRESS_DAMPING))
        .clamp(0.0, 1.0),
    );
    let uv = coords.uv.clone();
    update.repeat(Expr::uniform(INFLUENCE_COUNT), move |k, slot| {
        let event = k.local(Expr::uniform_at(INFLUENCES, slot));
        let cell = k.local(event.clone().x());
        let elapsed = k.local(Expr::uniform(TIME_UNIFORM) - event.y());
        k.if_then(cell.clone().less_than(count_f), move |k| {
            let cell_uv = k.local(
                (vec2(cell.clone().modulo(side_f), (cell / side_f).floor()) + 0.5) / side_f,
            );
            let dist = k.local(((uv - cell_uv) * side_f).length());
            let wave_dist = elapsed * Expr::uniform(WAVE_VELOCITY);
            k.if_then((wave_dist - dist).abs().less_than(1.0), |k| {
                k.sub_assign(progress, 1.0);
            });
        });
    });
    update.assign(progress, Expr::element(progress).clamp(0.0, 1.0));

    // Tiles lift out of the plane while the ring crosses them.
    let lift = update.local(
        Expr::element(progress)
            .remap01(0.0, 0.1)
            .clamp(0.0, 1.0),
    );
    update.assign_z(position, (lift * PI).sin() * Expr::uniform(AMPLITUDE));

    // Idle tiles are grayscale; the traveling ring restores the original
    // color mid-transition (cosine bell over progress).
    let original = update.local(Expr::sample("image", coords.uv.clone()));
    let level = update.local(original.clone().xyz().luminance());
    let strength = update.local(
        (((Expr::element(progress) * TAU).cos() + 1.0) * 0.5).one_minus(),
    );
    update.assign(
        color,
        vec4(level.clone(), level.clone(), level, 1.0).mix(original, strength),
    );
    let update = update.build(&store, &ctx)?;

    let sim = Simulation::new(store, ctx, init, update).with_influences(
        InfluenceRingBuffer::new(MAX_EVENTS),
        InfluenceBinding {
            list: INFLUENCES.into(),
            count: INFLUENCE_COUNT.into(),
        },
    );

    Ok(BuiltDemo {
        sim,
        bindings: DemoBindings {
            position,
            color: Some(color),
            progress: Some(progress),
            random: None,
        },
    })
}
