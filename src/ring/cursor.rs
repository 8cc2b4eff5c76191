//! # Slot Cursor
//!
//! The pure index arithmetic behind a per-eye texture ring.
//!
//! ## Plain English
//!
//! Picture three numbered canvases on a lazy susan. Each frame we
//! rotate to the next canvas and paint on it, while the compositor
//! is still free to look at the one we handed it last frame.

/// Tracks the current slot of a fixed-size texture ring.
///
/// ## Properties
/// - Advances modulo the slot count, exactly once per frame
/// - Never skips and never repeats out of order
/// - Index is always in `[0, slot_count)`
#[derive(Clone, Copy, Debug)]
pub struct SlotCursor {
    current: usize,
    slot_count: usize,
}

impl SlotCursor {
    /// Creates a cursor over `slot_count` slots.
    ///
    /// The cursor starts on the last slot so the first `advance()`
    /// lands on slot 0; callers advance before every write, including
    /// the first.
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count > 0, "ring must have at least one slot");
        Self {
            current: slot_count - 1,
            slot_count,
        }
    }

    /// Moves to the next slot and returns its index.
    ///
    /// Must be called exactly once per frame, before any write or
    /// submission referencing "current".
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slot_count;
        self.current
    }

    /// The index of the current slot.
    pub fn current(&self) -> usize {
        self.current
    }

    /// The number of slots in the ring.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_advance_lands_on_zero() {
        let mut cursor = SlotCursor::new(3);
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.current(), 0);
    }

    #[test]
    fn test_wraps_exactly_at_slot_count() {
        let n = 3;
        let mut cursor = SlotCursor::new(n);

        // N advances walk 0..N-1, the N+1th wraps back to 0.
        let sequence: Vec<usize> = (0..=n).map(|_| cursor.advance()).collect();
        assert_eq!(sequence, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_never_skips_or_repeats() {
        for n in 1..=3 {
            let mut cursor = SlotCursor::new(n);
            let mut previous = cursor.current();

            for _ in 0..n * 4 {
                let index = cursor.advance();
                assert!(index < n);
                assert_eq!(index, (previous + 1) % n);
                previous = index;
            }
        }
    }

    #[test]
    fn test_single_slot_ring() {
        let mut cursor = SlotCursor::new(1);
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 0);
    }

    #[test]
    #[should_panic(expected = "at least one slot")]
    fn test_zero_slots_rejected() {
        let _ = SlotCursor::new(0);
    }
}
