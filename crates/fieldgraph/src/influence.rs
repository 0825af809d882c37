//! Bounded interaction-event queue.
//!
//! Host-side input handlers push timestamped events; the update kernel scans
//! the live slots once per element each frame. The buffer is circular: once
//! full, a push overwrites the oldest slot in place. Pushes only happen
//! between beats, never while a dispatch is reading the mirrored uniforms,
//! so the kernel always scans a stable snapshot.

/// One interaction event. `location` is demo-defined: the flat lattice cell
/// index for grid demos. World-space probe hits travel through the
/// single-slot `pointer` uniform instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluenceEvent {
    pub location: f32,
    pub timestamp: f32,
}

impl InfluenceEvent {
    /// Slot filler for never-written entries: an unreachable location that
    /// fails the kernel's `index < count` guard.
    fn sentinel() -> Self {
        Self {
            location: f32::INFINITY,
            timestamp: 0.0,
        }
    }
}

/// Fixed-capacity circular event list.
#[derive(Debug, Clone)]
pub struct InfluenceRingBuffer {
    slots: Vec<InfluenceEvent>,
    cursor: usize,
    len: usize,
}

impl InfluenceRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![InfluenceEvent::sentinel(); capacity],
            cursor: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current logical length, the dynamic trip count of the kernel scan.
    pub fn active_count(&self) -> usize {
        self.len
    }

    /// Writes `event` at the cursor, advances it modulo capacity, and
    /// saturates the logical length. Once full this overwrites the oldest
    /// slot; nothing shifts.
    pub fn push(&mut self, event: InfluenceEvent) {
        if self.slots.is_empty() {
            return;
        }
        self.slots[self.cursor] = event;
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    /// Resets the logical length without deallocating or rewriting slots.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }

    /// All slots in physical order. Only the first `active_count()` slots are
    /// live before the first wrap; afterwards every slot is.
    pub fn slots(&self) -> &[InfluenceEvent] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(location: f32) -> InfluenceEvent {
        InfluenceEvent {
            location,
            timestamp: location * 10.0,
        }
    }

    #[test]
    fn saturates_at_capacity() {
        let mut ring = InfluenceRingBuffer::new(3);
        for i in 0..7 {
            ring.push(event(i as f32));
        }
        assert_eq!(ring.active_count(), 3);
    }

    #[test]
    fn overwrites_oldest_in_place() {
        // Push E1..E4 into capacity 3: slot (4-1) % 3 == 0 holds the latest,
        // and the surviving set is exactly {E2, E3, E4}.
        let mut ring = InfluenceRingBuffer::new(3);
        for i in 1..=4 {
            ring.push(event(i as f32));
        }
        assert_eq!(ring.active_count(), 3);
        assert_eq!(ring.slots()[0], event(4.0));
        assert_eq!(ring.slots()[1], event(2.0));
        assert_eq!(ring.slots()[2], event(3.0));
    }

    #[test]
    fn partial_fill_keeps_insertion_order() {
        let mut ring = InfluenceRingBuffer::new(5);
        ring.push(event(1.0));
        ring.push(event(2.0));
        assert_eq!(ring.active_count(), 2);
        assert_eq!(ring.slots()[0], event(1.0));
        assert_eq!(ring.slots()[1], event(2.0));
        assert!(ring.slots()[2].location.is_infinite());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut ring = InfluenceRingBuffer::new(2);
        ring.push(event(1.0));
        ring.clear();
        assert_eq!(ring.active_count(), 0);
        assert_eq!(ring.capacity(), 2);
        ring.push(event(3.0));
        assert_eq!(ring.slots()[0], event(3.0));
    }

    #[test]
    fn zero_capacity_ignores_pushes() {
        let mut ring = InfluenceRingBuffer::new(0);
        ring.push(event(1.0));
        assert_eq!(ring.active_count(), 0);
    }
}
