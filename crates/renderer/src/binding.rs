//! Render binding: state buffers → per-instance attribute streams.
//!
//! Read-only with respect to the store. Each frame the binding gathers the
//! demo's attribute views and composes the final per-instance position,
//! color, and scale; the window loop uploads the result to the instance
//! buffer. Must be rebuilt (together with the pipeline) if the element
//! count ever changes, which in practice means a new simulation.

use fieldgraph::{BufferHandle, Simulation};

use crate::pipeline::InstanceData;

/// How an instance's quad scale derives from simulation state.
pub enum ScaleRule {
    Constant(f32),
    /// The dissolve fade: progress remapped over a per-element randomised
    /// window `[threshold, threshold + fade_duration * progress_damping *
    /// (0.1 + 0.9 * random)]` from full size down to zero.
    FadeRemap {
        progress: BufferHandle,
        random: BufferHandle,
        threshold: String,
        fade_duration: String,
        progress_damping: String,
        base: f32,
    },
}

/// Where an instance's color comes from.
pub enum ColorRule {
    Constant([f32; 4]),
    Buffer(BufferHandle),
}

/// Per-demo composition of the instance stream.
pub struct RenderBinding {
    position: BufferHandle,
    color: ColorRule,
    scale: ScaleRule,
}

impl RenderBinding {
    pub fn new(position: BufferHandle, color: ColorRule, scale: ScaleRule) -> Self {
        Self {
            position,
            color,
            scale,
        }
    }

    /// Gathers the instance stream for the current buffer state.
    pub fn compose(&self, sim: &Simulation, out: &mut Vec<InstanceData>) {
        let count = sim.element_count();
        let positions = sim.store().attribute_view(self.position);
        out.clear();
        out.reserve(count);
        for i in 0..count {
            out.push(InstanceData {
                position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                scale: self.scale_for(sim, i),
                color: self.color_for(sim, i),
            });
        }
    }

    fn color_for(&self, sim: &Simulation, i: usize) -> [f32; 4] {
        match &self.color {
            ColorRule::Constant(color) => *color,
            ColorRule::Buffer(handle) => {
                let view = sim.store().attribute_view(*handle);
                [view[i * 4], view[i * 4 + 1], view[i * 4 + 2], view[i * 4 + 3]]
            }
        }
    }

    fn scale_for(&self, sim: &Simulation, i: usize) -> f32 {
        match &self.scale {
            ScaleRule::Constant(scale) => *scale,
            ScaleRule::FadeRemap {
                progress,
                random,
                threshold,
                fade_duration,
                progress_damping,
                base,
            } => {
                let ctx = sim.context();
                let threshold = ctx.get_float(threshold).expect("fade uniforms declared");
                let duration = ctx.get_float(fade_duration).expect("fade uniforms declared");
                let damping = ctx
                    .get_float(progress_damping)
                    .expect("fade uniforms declared");
                let progress = sim.store().attribute_view(*progress)[i];
                let random = sim.store().attribute_view(*random)[i];

                let window_end = threshold + duration * damping * (0.1 + 0.9 * random);
                let span = window_end - threshold;
                let t = if span.abs() < f32::EPSILON {
                    1.0
                } else {
                    (progress - threshold) / span
                };
                (1.0 - t).clamp(0.0, 1.0) * base
            }
        }
    }
}
