/// Errors raised while assembling or dispatching a simulation graph.
///
/// Setup-time variants (`Capacity`, `GraphBuild`) surface before a simulation
/// ever runs; `ArityMismatch` fires when a kernel built for one store is
/// dispatched against another.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("buffer '{name}' holds {requested} elements but the store is sized for {expected}")]
    Capacity {
        name: String,
        requested: usize,
        expected: usize,
    },
    #[error("kernel graph is malformed: {0}")]
    GraphBuild(String),
    #[error("kernel '{kernel}' has arity {arity} but the store holds {elements} elements")]
    ArityMismatch {
        kernel: String,
        arity: usize,
        elements: usize,
    },
}

impl GraphError {
    pub(crate) fn build(message: impl Into<String>) -> Self {
        GraphError::GraphBuild(message.into())
    }
}
