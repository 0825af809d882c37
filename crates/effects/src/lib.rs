//! Demo simulations built on the fieldgraph IR.
//!
//! Each builder assembles the buffers, uniforms, and kernels of one demo
//! and hands back the [`Simulation`] together with the buffer handles the
//! render binding consumes: a pinchable spring-relaxation mesh, a
//! click-driven wavefront image reveal, and a noise-staggered dissolve.

pub mod dissolve;
mod grid;
pub mod jelly;
pub mod ripple;

pub use dissolve::dissolve;
pub use jelly::jelly;
pub use ripple::ripple;

use fieldgraph::{BufferHandle, Simulation};

/// Buffer handles a render binding needs from a demo.
#[derive(Debug, Clone, Copy)]
pub struct DemoBindings {
    pub position: BufferHandle,
    pub color: Option<BufferHandle>,
    pub progress: Option<BufferHandle>,
    pub random: Option<BufferHandle>,
}

/// A fully assembled demo: the simulation plus its render-facing handles.
pub struct BuiltDemo {
    pub sim: Simulation,
    pub bindings: DemoBindings,
}
