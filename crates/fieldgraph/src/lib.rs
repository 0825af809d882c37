//! Core engine for fieldlab: a declarative per-element compute graph over
//! fixed-capacity state buffers.
//!
//! The moving parts and how data flows between them:
//!
//! ```text
//!   probe / controls          clock
//!        │                      │
//!        ▼                      ▼
//!   InfluenceRingBuffer ──▶ SimContext (uniforms, images)
//!                               │
//!                               ▼
//!   Kernel (typed expression graph) ──▶ StateBufferStore
//!                                            │
//!                                            ▼
//!                                   attribute views ──▶ render binding
//! ```
//!
//! Kernels are built once per simulation from a typed expression IR and
//! dispatched once per frame over every element. All cross-element reads
//! observe the buffer state as of dispatch start, and writes always target
//! the invocation's own element, so a dispatch is order-independent and
//! safe to parallelise or lower to a GPU compute pass later.

mod context;
mod error;
mod expr;
mod influence;
mod kernel;
pub mod noise;
mod sim;
mod store;
mod value;

pub use context::{ImageGrid, SimContext, UniformValue};
pub use error::GraphError;
pub use expr::{step, vec2, vec3, vec4, Expr};
pub use influence::{InfluenceEvent, InfluenceRingBuffer};
pub use kernel::{Kernel, KernelBuilder};
pub use sim::{
    InfluenceBinding, Simulation, DELTA_TIME_UNIFORM, POINTER_UNIFORM, TIME_UNIFORM,
};
pub use store::{BufferHandle, ComponentWidth, StateBufferStore};
pub use value::{Ty, Value};
