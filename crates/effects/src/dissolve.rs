//! Noise-staggered dissolve between two images.
//!
//! A single global `threshold` fans out into per-element completion
//! thresholds: the reset kernel re-derives each element's base progress
//! from gradient noise sampled at its position, so fade timings stagger
//! spatially from one control. Once an element's base progress crosses the
//! threshold, vec3 noise starts displacing it while the render binding
//! scales it away over a randomised fade window.

use fieldgraph::{
    ComponentWidth, Expr, GraphError, ImageGrid, KernelBuilder, SimContext, Simulation,
    StateBufferStore, UniformValue, DELTA_TIME_UNIFORM, TIME_UNIFORM,
};
use rand::prelude::*;

use crate::grid::{assign_grid_position, grid_coords};
use crate::{BuiltDemo, DemoBindings};

pub const THRESHOLD: &str = "threshold";
pub const OFFSET: &str = "offset";
pub const FADE_DURATION: &str = "fade_duration";
pub const PROGRESS_DAMPING: &str = "progress_damping";

/// Builds the dissolve simulation over a `side`² lattice fading from
/// `image` toward `image_target`. `seed` fixes the per-element stagger.
pub fn dissolve(
    side: u32,
    image: ImageGrid,
    image_target: ImageGrid,
    seed: u64,
) -> Result<BuiltDemo, GraphError> {
    let count = (side * side) as usize;
    let mut store = StateBufferStore::new(count);
    let position = store.allocate("position", ComponentWidth::Vec3, count)?;
    let base_position = store.allocate("base_position", ComponentWidth::Vec3, count)?;
    let color = store.allocate("color", ComponentWidth::Vec4, count)?;
    let base_progress = store.allocate("base_progress", ComponentWidth::Scalar, count)?;
    let progress = store.allocate("progress", ComponentWidth::Scalar, count)?;
    let random = store.allocate("random", ComponentWidth::Scalar, count)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let stagger: Vec<f32> = (0..count).map(|_| rng.gen::<f32>()).collect();
    store.seed(random, &stagger)?;

    let mut ctx = SimContext::new();
    ctx.declare(THRESHOLD, UniformValue::Float(0.44))
        .declare(OFFSET, UniformValue::Float(0.08))
        .declare(FADE_DURATION, UniformValue::Float(2.0))
        .declare(PROGRESS_DAMPING, UniformValue::Float(0.01))
        .declare(TIME_UNIFORM, UniformValue::Float(0.0))
        .declare(DELTA_TIME_UNIFORM, UniformValue::Float(0.0))
        .declare_image("image", image)
        .declare_image("image_target", image_target);

    let mut init = KernelBuilder::new("dissolve_init");
    let coords = grid_coords(&mut init, side);
    assign_grid_position(&mut init, position, &coords, side);
    init.assign(base_position, Expr::element(position));
    init.assign(color, Expr::sample("image", coords.uv.clone()));
    let init = init.build(&store, &ctx)?;

    // Noise is sampled at the *current* position, then the position is
    // restored; resetting mid-flight reshuffles the stagger.
    let mut reset = KernelBuilder::new("dissolve_reset");
    reset.assign(
        base_progress,
        Expr::noise(Expr::element(position) * 0.01)
            .remap(-1.0, 1.0, 0.0, Expr::uniform(THRESHOLD))
            + Expr::uniform(OFFSET),
    );
    reset.assign(progress, Expr::element(base_progress));
    reset.assign(position, Expr::element(base_position));
    let reset = reset.build(&store, &ctx)?;

    let mut update = KernelBuilder::new("dissolve_update");
    let coords = grid_coords(&mut update, side);
    update.if_then(Expr::element(base_progress).less_than(1.0), |k| {
        k.add_assign(
            base_progress,
            Expr::uniform(DELTA_TIME_UNIFORM) * Expr::uniform(PROGRESS_DAMPING),
        );
        // The visible progress ramps quadratically.
        k.assign(progress, Expr::element(base_progress).pow2());
        k.if_then(
            Expr::element(base_progress).greater_eq(Expr::uniform(THRESHOLD)),
            |k| {
                k.add_assign(position, Expr::noise_vec3(Expr::element(position) * 0.01));
            },
        );
    });
    update.assign(
        color,
        Expr::sample("image", coords.uv.clone()).mix(
            Expr::sample("image_target", coords.uv.clone()),
            0.0,
        ),
    );
    let update = update.build(&store, &ctx)?;

    let sim = Simulation::new(store, ctx, init, update).with_reset(reset);

    Ok(BuiltDemo {
        sim,
        bindings: DemoBindings {
            position,
            color: Some(color),
            progress: Some(base_progress),
            random: Some(random),
        },
    })
}
