//! DMX512 frames and the updates delivered by a frame source.
//!
//! Slots are numbered from 1 to 512 at every public boundary. Slot `n` is
//! stored at byte index `n - 1`.

use std::fmt;

/// Number of slots in a DMX512 universe.
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Highest valid slot number.
pub const MAX_SLOT: u16 = DMX_UNIVERSE_SIZE as u16;

/// Returns true if `slot` is a valid 1-based slot number.
pub fn is_valid_slot(slot: u16) -> bool {
    (1..=MAX_SLOT).contains(&slot)
}

/// One complete DMX frame.
///
/// A packet may carry fewer than 512 slots; `len` records how many were
/// present. Slots past `len` read as absent rather than zero.
#[derive(Clone, PartialEq, Eq)]
pub struct DmxFrame {
    data: [u8; DMX_UNIVERSE_SIZE],
    len: usize,
}

impl DmxFrame {
    /// A full-length frame with every slot at zero.
    pub fn blackout() -> Self {
        Self {
            data: [0u8; DMX_UNIVERSE_SIZE],
            len: DMX_UNIVERSE_SIZE,
        }
    }

    /// Build a frame from received slot data. Anything past 512 bytes is ignored.
    pub fn from_slice(values: &[u8]) -> Self {
        let len = values.len().min(DMX_UNIVERSE_SIZE);
        let mut data = [0u8; DMX_UNIVERSE_SIZE];
        data[..len].copy_from_slice(&values[..len]);
        Self { data, len }
    }

    /// Number of slots carried by this frame.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the frame carries no slots at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value of a 1-based slot, or `None` if the slot is out of range or
    /// was not carried by the packet.
    pub fn get(&self, slot: u16) -> Option<u8> {
        if slot == 0 || usize::from(slot) > self.len {
            return None;
        }
        Some(self.data[usize::from(slot) - 1])
    }

    /// Set a 1-based slot, extending `len` if needed. Out of range slots are ignored.
    pub fn set(&mut self, slot: u16, value: u8) {
        if !is_valid_slot(slot) {
            return;
        }
        let index = usize::from(slot) - 1;
        self.data[index] = value;
        self.len = self.len.max(index + 1);
    }

    /// The carried slots as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::blackout()
    }
}

impl fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero = self.as_slice().iter().filter(|v| **v != 0).count();
        f.debug_struct("DmxFrame")
            .field("len", &self.len)
            .field("non_zero", &non_zero)
            .finish()
    }
}

/// What a frame source hands to the engine: a universe, a frame, and an
/// optional error reported by the source for this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxUpdate {
    /// Universe the frame belongs to
    pub universe: u16,
    /// Slot data
    pub frame: DmxFrame,
    /// Set when the source flagged this frame as unusable
    pub error: Option<String>,
}

impl DmxUpdate {
    /// A good frame for `universe`.
    pub fn new(universe: u16, frame: DmxFrame) -> Self {
        Self {
            universe,
            frame,
            error: None,
        }
    }

    /// A frame the source flagged with an error.
    pub fn with_error(universe: u16, frame: DmxFrame, error: impl Into<String>) -> Self {
        Self {
            universe,
            frame,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_numbering_is_one_based() {
        let mut values = [0u8; 512];
        values[0] = 11;
        values[511] = 99;
        let frame = DmxFrame::from_slice(&values);

        assert_eq!(frame.get(0), None);
        assert_eq!(frame.get(1), Some(11));
        assert_eq!(frame.get(512), Some(99));
        assert_eq!(frame.get(513), None);
    }

    #[test]
    fn test_short_frame() {
        let frame = DmxFrame::from_slice(&[1, 2, 3]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.get(3), Some(3));
        assert_eq!(frame.get(4), None);
        assert_eq!(frame.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_oversized_input_is_truncated() {
        let frame = DmxFrame::from_slice(&[7u8; 600]);
        assert_eq!(frame.len(), DMX_UNIVERSE_SIZE);
    }

    #[test]
    fn test_set_extends_length() {
        let mut frame = DmxFrame::from_slice(&[]);
        assert!(frame.is_empty());

        frame.set(10, 255);
        assert_eq!(frame.len(), 10);
        assert_eq!(frame.get(10), Some(255));
        assert_eq!(frame.get(9), Some(0));

        frame.set(0, 1);
        frame.set(600, 1);
        assert_eq!(frame.len(), 10);
    }
}
