//! Simulation instance: buffers, uniforms, influence ring, and kernels.
//!
//! One [`Simulation`] owns everything a demo needs between frames. The
//! element count is fixed for its lifetime; changing it means building a new
//! instance. Kernels are built once at assembly and never mutated afterwards
//! (live parameters are uniforms, not kernel structure).

use glam::Vec2;

use crate::context::{SimContext, UniformValue};
use crate::error::GraphError;
use crate::influence::{InfluenceEvent, InfluenceRingBuffer};
use crate::kernel::Kernel;
use crate::store::StateBufferStore;

/// Uniform the scheduler writes the current time into, when declared.
pub const TIME_UNIFORM: &str = "time";
/// Uniform the scheduler writes the frame delta into, when declared.
pub const DELTA_TIME_UNIFORM: &str = "delta_time";
/// Single-slot probe uniform: `xyz` is the hit point, `w` is 1 while the
/// probe reports a hit and 0 otherwise.
pub const POINTER_UNIFORM: &str = "pointer";

/// Names of the uniform pair mirroring the influence ring into kernels.
#[derive(Debug, Clone)]
pub struct InfluenceBinding {
    pub list: String,
    pub count: String,
}

/// A complete simulation instance.
pub struct Simulation {
    store: StateBufferStore,
    context: SimContext,
    ring: InfluenceRingBuffer,
    influence_binding: Option<InfluenceBinding>,
    init: Kernel,
    update: Kernel,
    reset: Option<Kernel>,
}

impl Simulation {
    pub fn new(
        store: StateBufferStore,
        context: SimContext,
        init: Kernel,
        update: Kernel,
    ) -> Self {
        Self {
            store,
            context,
            ring: InfluenceRingBuffer::new(0),
            influence_binding: None,
            init,
            update,
            reset: None,
        }
    }

    /// Attaches a reset kernel (re-derives per-element state on demand).
    pub fn with_reset(mut self, reset: Kernel) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Attaches an influence ring mirrored into the named uniforms before
    /// every update dispatch. The `list` uniform must be a vec2 array of the
    /// ring's capacity and `count` a float.
    pub fn with_influences(mut self, ring: InfluenceRingBuffer, binding: InfluenceBinding) -> Self {
        self.ring = ring;
        self.influence_binding = Some(binding);
        self
    }

    pub fn element_count(&self) -> usize {
        self.store.element_count()
    }

    pub fn store(&self) -> &StateBufferStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateBufferStore {
        &mut self.store
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.context
    }

    pub fn ring(&self) -> &InfluenceRingBuffer {
        &self.ring
    }

    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    /// Queues an interaction event. Host-side only; the next update dispatch
    /// observes it through the uniform mirror.
    pub fn push_influence(&mut self, event: InfluenceEvent) {
        self.ring.push(event);
    }

    /// Writes the clock uniforms when the demo declares them.
    pub fn set_clock(&mut self, time: f32, delta_time: f32) {
        let _ = self.context.set_float(TIME_UNIFORM, time);
        let _ = self.context.set_float(DELTA_TIME_UNIFORM, delta_time);
    }

    /// Runs the one-shot init kernel.
    pub fn dispatch_init(&mut self) -> Result<(), GraphError> {
        self.init.dispatch(&mut self.store, &self.context)
    }

    /// Runs the reset kernel, when the demo has one.
    pub fn dispatch_reset(&mut self) -> Result<(), GraphError> {
        match &self.reset {
            Some(reset) => reset.dispatch(&mut self.store, &self.context),
            None => Ok(()),
        }
    }

    /// Mirrors the influence ring into its uniforms, then runs the update
    /// kernel. The mirror happens strictly before the dispatch so the kernel
    /// scan reads a stable snapshot of the ring.
    pub fn dispatch_update(&mut self) -> Result<(), GraphError> {
        if let Some(binding) = &self.influence_binding {
            let slots: Vec<Vec2> = self
                .ring
                .slots()
                .iter()
                .map(|event| Vec2::new(event.location, event.timestamp))
                .collect();
            self.context.set(&binding.list, UniformValue::Vec2Array(slots))?;
            self.context
                .set_float(&binding.count, self.ring.active_count() as f32)?;
        }
        self.update.dispatch(&mut self.store, &self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::kernel::KernelBuilder;
    use crate::store::ComponentWidth;

    fn counting_sim(capacity: usize) -> Simulation {
        let mut store = StateBufferStore::new(4);
        let hits = store.allocate("hits", ComponentWidth::Scalar, 4).unwrap();
        let mut ctx = SimContext::new();
        ctx.declare(
            "influences",
            UniformValue::Vec2Array(vec![Vec2::ZERO; capacity]),
        );
        ctx.declare("influence_count", UniformValue::Float(0.0));

        let init = KernelBuilder::new("init");
        let init = init.build(&store, &ctx).unwrap();

        let mut update = KernelBuilder::new("update");
        update.repeat(Expr::uniform("influence_count"), |b, _| {
            b.add_assign(hits, 1.0);
        });
        let update = update.build(&store, &ctx).unwrap();

        Simulation::new(store, ctx, init, update).with_influences(
            InfluenceRingBuffer::new(capacity),
            InfluenceBinding {
                list: "influences".into(),
                count: "influence_count".into(),
            },
        )
    }

    #[test]
    fn update_scans_mirrored_ring() {
        let mut sim = counting_sim(3);
        sim.push_influence(InfluenceEvent {
            location: 1.0,
            timestamp: 0.0,
        });
        sim.push_influence(InfluenceEvent {
            location: 2.0,
            timestamp: 0.0,
        });
        sim.dispatch_update().unwrap();
        let hits = sim.store().attribute_view(
            // First allocation in counting_sim.
            crate::store::BufferHandle(0),
        );
        assert_eq!(hits, &[2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn clock_uniforms_are_optional() {
        let mut sim = counting_sim(1);
        // Neither clock uniform is declared; this must not error.
        sim.set_clock(1.5, 0.016);
        assert!(sim.context().get_float(TIME_UNIFORM).is_none());
    }
}
