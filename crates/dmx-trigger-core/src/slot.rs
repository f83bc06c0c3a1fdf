//! Ordered actions bound to a single slot.

use crate::action::Action;

/// The actions configured for one slot, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotActions {
    slot: u16,
    actions: Vec<Action>,
}

impl SlotActions {
    /// Create a group for a 1-based slot number
    pub fn new(slot: u16, actions: Vec<Action>) -> Self {
        Self { slot, actions }
    }

    /// The slot this group is bound to
    pub fn slot(&self) -> u16 {
        self.slot
    }

    /// Actions in firing order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if the group has no actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
