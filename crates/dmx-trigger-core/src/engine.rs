//! The trigger engine: per-slot transition tracking and action dispatch.

use std::collections::{BTreeMap, HashMap};

use crate::action::Transition;
use crate::context::Context;
use crate::frame::{DmxFrame, DmxUpdate};
use crate::slot::SlotActions;
use crate::supervisor::CommandLauncher;

/// Counters for one processed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Tracked slots whose value changed (including first observations)
    pub slots_changed: usize,
    /// Actions whose effects all completed
    pub actions_fired: usize,
    /// Actions whose effects failed
    pub actions_failed: usize,
}

/// Watches one universe and fires actions on slot transitions.
///
/// Slots are processed in ascending order and actions in configuration
/// order, so identical frame sequences always produce identical effects.
#[derive(Debug)]
pub struct TriggerEngine {
    universe: u16,
    context: Context,
    groups: BTreeMap<u16, SlotActions>,
    /// Last seen value per tracked slot. Only slots with actions get an entry.
    previous: HashMap<u16, u8>,
}

impl TriggerEngine {
    /// Create an engine from a loaded context and slot mapping.
    pub fn new(universe: u16, context: Context, groups: BTreeMap<u16, SlotActions>) -> Self {
        let previous = HashMap::with_capacity(groups.len());
        Self {
            universe,
            context,
            groups,
            previous,
        }
    }

    /// The universe this engine accepts
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Shared variables
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Number of slots with actions
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of slots with recorded state
    pub fn tracked_slots(&self) -> usize {
        self.previous.len()
    }

    /// Last recorded value of a slot
    pub fn previous_value(&self, slot: u16) -> Option<u8> {
        self.previous.get(&slot).copied()
    }

    /// Handle an update from a frame source.
    ///
    /// Updates for other universes, or flagged with an error, are dropped
    /// without touching any state and `None` is returned.
    pub fn accept(
        &mut self,
        update: &DmxUpdate,
        launcher: &mut dyn CommandLauncher,
    ) -> Option<FrameReport> {
        if update.universe != self.universe {
            tracing::trace!("Ignoring frame for universe {}", update.universe);
            return None;
        }
        if let Some(error) = &update.error {
            tracing::debug!("Dropping frame for universe {}: {}", update.universe, error);
            return None;
        }
        Some(self.process_frame(&update.frame, launcher))
    }

    /// Evaluate every configured slot against a new frame.
    pub fn process_frame(
        &mut self,
        frame: &DmxFrame,
        launcher: &mut dyn CommandLauncher,
    ) -> FrameReport {
        let mut report = FrameReport::default();

        for (&slot, group) in &self.groups {
            let Some(current) = frame.get(slot) else {
                continue;
            };
            let previous = self.previous.get(&slot).copied();
            if previous == Some(current) {
                continue;
            }
            report.slots_changed += 1;

            let transition = Transition::new(previous, current);
            let mut slot_published = false;

            for (index, action) in group.actions().iter().enumerate() {
                if !action.evaluate(&transition) {
                    continue;
                }
                if !slot_published {
                    self.context.set_slot(slot, current);
                    slot_published = true;
                }
                match action.fire(slot, &mut self.context, launcher) {
                    Ok(()) => report.actions_fired += 1,
                    Err(e) => {
                        report.actions_failed += 1;
                        tracing::warn!("Slot {} action #{} failed: {}", slot, index + 1, e);
                    }
                }
            }

            self.previous.insert(slot, current);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Effect, Predicate};
    use crate::error::Result;
    use crate::supervisor::CommandLine;

    #[derive(Default)]
    struct Recorder {
        launched: Vec<String>,
    }

    impl CommandLauncher for Recorder {
        fn launch(&mut self, command: &CommandLine) -> Result<()> {
            self.launched.push(command.to_string());
            Ok(())
        }
    }

    fn engine_with(slot: u16, actions: Vec<Action>) -> TriggerEngine {
        let mut groups = BTreeMap::new();
        groups.insert(slot, SlotActions::new(slot, actions));
        TriggerEngine::new(1, Context::new(), groups)
    }

    #[test]
    fn test_first_observation_records_state() {
        let mut engine = engine_with(
            5,
            vec![Action::new(
                Predicate::Exact(0),
                vec![Effect::command(["zero"]).unwrap()],
            )],
        );
        let mut recorder = Recorder::default();

        let report = engine.process_frame(&DmxFrame::blackout(), &mut recorder);

        assert_eq!(report.slots_changed, 1);
        assert_eq!(report.actions_fired, 1);
        assert_eq!(engine.previous_value(5), Some(0));
        assert_eq!(engine.tracked_slots(), 1);
    }

    #[test]
    fn test_slot_missing_from_short_frame_is_skipped() {
        let mut engine = engine_with(
            100,
            vec![Action::new(
                Predicate::AnyChange,
                vec![Effect::command(["x"]).unwrap()],
            )],
        );
        let mut recorder = Recorder::default();

        let report = engine.process_frame(&DmxFrame::from_slice(&[255; 50]), &mut recorder);

        assert_eq!(report, FrameReport::default());
        assert_eq!(engine.previous_value(100), None);
        assert!(recorder.launched.is_empty());
    }

    #[test]
    fn test_slot_variables_published_before_firing() {
        let mut engine = engine_with(
            7,
            vec![Action::new(
                Predicate::AnyChange,
                vec![Effect::command(["set", "${slot_offset}", "${slot_value}"]).unwrap()],
            )],
        );
        let mut recorder = Recorder::default();
        let mut frame = DmxFrame::blackout();
        frame.set(7, 200);

        engine.process_frame(&frame, &mut recorder);

        assert_eq!(recorder.launched, vec!["set 7 200"]);
        assert_eq!(engine.context().get("slot_value"), Some("200"));
    }

    #[test]
    fn test_slot_variables_untouched_without_match() {
        let mut engine = engine_with(
            7,
            vec![Action::new(
                Predicate::Exact(1),
                vec![Effect::command(["x"]).unwrap()],
            )],
        );
        engine.process_frame(&DmxFrame::blackout(), &mut Recorder::default());
        assert_eq!(engine.context().get("slot_offset"), None);
    }

    #[test]
    fn test_accept_filters_universe_and_errors() {
        let mut engine = engine_with(
            1,
            vec![Action::new(
                Predicate::AnyChange,
                vec![Effect::command(["x"]).unwrap()],
            )],
        );
        let mut recorder = Recorder::default();
        let mut frame = DmxFrame::blackout();
        frame.set(1, 9);

        assert!(engine
            .accept(&DmxUpdate::new(2, frame.clone()), &mut recorder)
            .is_none());
        assert!(engine
            .accept(&DmxUpdate::with_error(1, frame.clone(), "bad"), &mut recorder)
            .is_none());
        assert_eq!(engine.tracked_slots(), 0);

        let report = engine.accept(&DmxUpdate::new(1, frame), &mut recorder);
        assert_eq!(report.map(|r| r.actions_fired), Some(1));
    }
}
