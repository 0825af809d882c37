//! Fixed-capacity per-element state buffers.
//!
//! A [`StateBufferStore`] owns every buffer belonging to one simulation
//! instance. All buffers share the store's element count `N`, fixed at
//! creation: index `i` denotes the same element in every buffer. Buffers are
//! mutated only by kernel dispatches; the render side reads them through
//! [`StateBufferStore::attribute_view`].

use crate::error::GraphError;
use crate::value::{Ty, Value};

/// Lane count of one buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentWidth {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl ComponentWidth {
    pub fn lanes(self) -> usize {
        match self {
            ComponentWidth::Scalar => 1,
            ComponentWidth::Vec2 => 2,
            ComponentWidth::Vec3 => 3,
            ComponentWidth::Vec4 => 4,
        }
    }

    pub fn ty(self) -> Ty {
        match self {
            ComponentWidth::Scalar => Ty::Float,
            ComponentWidth::Vec2 => Ty::Vec2,
            ComponentWidth::Vec3 => Ty::Vec3,
            ComponentWidth::Vec4 => Ty::Vec4,
        }
    }
}

/// Non-owning reference to a buffer in a [`StateBufferStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) usize);

#[derive(Debug)]
struct BufferSlot {
    name: String,
    width: ComponentWidth,
    data: Vec<f32>,
}

/// Owns the named, fixed-length state buffers of one simulation.
#[derive(Debug)]
pub struct StateBufferStore {
    element_count: usize,
    buffers: Vec<BufferSlot>,
}

impl StateBufferStore {
    pub fn new(element_count: usize) -> Self {
        Self {
            element_count,
            buffers: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Allocates a zero-filled buffer. `count` must equal the store's element
    /// count; there is no partial reallocation, a different `N` means a new
    /// store and a new simulation instance.
    pub fn allocate(
        &mut self,
        name: &str,
        width: ComponentWidth,
        count: usize,
    ) -> Result<BufferHandle, GraphError> {
        if count != self.element_count {
            return Err(GraphError::Capacity {
                name: name.to_string(),
                requested: count,
                expected: self.element_count,
            });
        }
        if self.buffers.iter().any(|slot| slot.name == name) {
            return Err(GraphError::build(format!("buffer '{name}' already allocated")));
        }
        let handle = BufferHandle(self.buffers.len());
        self.buffers.push(BufferSlot {
            name: name.to_string(),
            width,
            data: vec![0.0; count * width.lanes()],
        });
        Ok(handle)
    }

    /// Overwrites a buffer with host-provided initial values (flat lanes).
    pub fn seed(&mut self, handle: BufferHandle, values: &[f32]) -> Result<(), GraphError> {
        let slot = self.slot_mut(handle);
        if values.len() != slot.data.len() {
            return Err(GraphError::Capacity {
                name: slot.name.clone(),
                requested: values.len() / slot.width.lanes(),
                expected: slot.data.len() / slot.width.lanes(),
            });
        }
        slot.data.copy_from_slice(values);
        Ok(())
    }

    /// Per-element read stream for render binding, `lanes * N` floats.
    pub fn attribute_view(&self, handle: BufferHandle) -> &[f32] {
        &self.slot(handle).data
    }

    pub fn name(&self, handle: BufferHandle) -> &str {
        &self.slot(handle).name
    }

    pub fn width(&self, handle: BufferHandle) -> ComponentWidth {
        self.slot(handle).width
    }

    pub fn contains(&self, handle: BufferHandle) -> bool {
        handle.0 < self.buffers.len()
    }

    /// Looks a buffer up by the name it was allocated under.
    pub fn handle(&self, name: &str) -> Option<BufferHandle> {
        self.buffers
            .iter()
            .position(|slot| slot.name == name)
            .map(BufferHandle)
    }

    pub(crate) fn value(&self, handle: BufferHandle, index: usize) -> Value {
        let slot = self.slot(handle);
        value_from_lanes(&slot.data, slot.width, index)
    }

    pub(crate) fn set_value(&mut self, handle: BufferHandle, index: usize, value: Value) {
        let slot = self.slot_mut(handle);
        let lanes = slot.width.lanes();
        slot.data[index * lanes..(index + 1) * lanes].copy_from_slice(&value.lanes());
    }

    pub(crate) fn set_lane(&mut self, handle: BufferHandle, index: usize, lane: usize, value: f32) {
        let slot = self.slot_mut(handle);
        let lanes = slot.width.lanes();
        slot.data[index * lanes + lane] = value;
    }

    pub(crate) fn snapshot(&self, handle: BufferHandle) -> Vec<f32> {
        self.slot(handle).data.clone()
    }

    fn slot(&self, handle: BufferHandle) -> &BufferSlot {
        &self.buffers[handle.0]
    }

    fn slot_mut(&mut self, handle: BufferHandle) -> &mut BufferSlot {
        &mut self.buffers[handle.0]
    }
}

/// Reads element `index` out of a flat lane slice.
pub(crate) fn value_from_lanes(data: &[f32], width: ComponentWidth, index: usize) -> Value {
    let lanes = width.lanes();
    Value::from_lanes(&data[index * lanes..(index + 1) * lanes])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_rejects_mismatched_count() {
        let mut store = StateBufferStore::new(16);
        let err = store.allocate("position", ComponentWidth::Vec3, 8).unwrap_err();
        assert!(matches!(err, GraphError::Capacity { requested: 8, expected: 16, .. }));
    }

    #[test]
    fn allocate_rejects_duplicate_name() {
        let mut store = StateBufferStore::new(4);
        store.allocate("progress", ComponentWidth::Scalar, 4).unwrap();
        let err = store.allocate("progress", ComponentWidth::Scalar, 4).unwrap_err();
        assert!(matches!(err, GraphError::GraphBuild(_)));
    }

    #[test]
    fn seed_rejects_short_slice() {
        let mut store = StateBufferStore::new(3);
        let handle = store.allocate("velocity", ComponentWidth::Vec3, 3).unwrap();
        let err = store.seed(handle, &[0.0; 6]).unwrap_err();
        assert!(matches!(err, GraphError::Capacity { .. }));
    }

    #[test]
    fn seed_then_view_round_trips() {
        let mut store = StateBufferStore::new(2);
        let handle = store.allocate("progress", ComponentWidth::Scalar, 2).unwrap();
        store.seed(handle, &[0.25, 0.75]).unwrap();
        assert_eq!(store.attribute_view(handle), &[0.25, 0.75]);
        assert_eq!(store.value(handle, 1), Value::Float(0.75));
    }
}
