//! Windowed wgpu presentation for fieldlab simulations.
//!
//! The crate glues the winit preview window, the wgpu instanced pipeline,
//! and the frame scheduler together:
//!
//! ```text
//!   fieldlab CLI
//!        │ RunConfig
//!        ▼
//!   run() ──▶ winit event loop ──▶ FrameScheduler::beat ──▶ GpuRenderer
//!                    │                                          │
//!                    └─▶ pointer events ─▶ InteractionProbe ────┘
//! ```
//!
//! Each beat re-uploads the simulation's attribute views as per-instance
//! vertex data; the canonical buffer state stays host-side because kernel
//! lowering to a GPU backend is out of scope here.

mod binding;
mod context;
mod mesh;
mod pipeline;
mod window;

pub use binding::{ColorRule, RenderBinding, ScaleRule};
pub use mesh::uv_sphere;
pub use pipeline::InstanceData;
pub use window::run;

use effects::BuiltDemo;
use scheduler::probe::{OrbitCamera, TriangleMesh};

/// GPU device failures named by the error taxonomy: setup-time acquisition
/// failures and mid-session device loss. Both are fatal for the instance.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to initialise GPU device: {0}")]
    Init(String),
    #[error("GPU device lost: {0}")]
    Lost(String),
}

/// How pointer input feeds the simulation.
pub enum InteractionMode {
    /// Pointer-move ray-casts against `mesh` and drives the pinch uniform.
    Pinch { mesh: TriangleMesh },
    /// Clicks push a pseudo-randomly chosen lattice cell into the ring.
    LatticeClick { side: u32 },
    /// Clicks dispatch the simulation's reset kernel.
    ClickReset,
}

/// Everything `run` needs to present one demo.
pub struct RunConfig {
    pub title: String,
    pub demo: BuiltDemo,
    pub binding: RenderBinding,
    pub interaction: InteractionMode,
    pub camera: OrbitCamera,
    pub window_size: (u32, u32),
    /// Seed for the lattice probe's pseudo-random cell draw.
    pub probe_seed: u64,
}
