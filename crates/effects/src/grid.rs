//! Shared helpers for the side² lattice demos.

use fieldgraph::{vec2, BufferHandle, Expr, KernelBuilder};

/// Lattice coordinate of the current element, derived from the flat index:
/// `col = i mod side`, `row = i div side`, plus the texel-centered UV.
pub(crate) struct GridCoords {
    pub col: Expr,
    pub row: Expr,
    pub uv: Expr,
}

pub(crate) fn grid_coords(k: &mut KernelBuilder, side: u32) -> GridCoords {
    let side = side as f32;
    let col = k.local(Expr::index().modulo(side));
    let row = k.local((Expr::index() / side).floor());
    let uv = k.local((vec2(col.clone(), row.clone()) + 0.5) / side);
    GridCoords { col, row, uv }
}

/// Centers the lattice on the origin, one unit of spacing per cell.
pub(crate) fn assign_grid_position(
    k: &mut KernelBuilder,
    position: BufferHandle,
    coords: &GridCoords,
    side: u32,
) {
    let half = side as f32 * 0.5;
    k.assign_x(position, coords.col.clone() - half + 0.5);
    k.assign_y(position, coords.row.clone() - half + 0.5);
    k.assign_z(position, 0.0);
}
