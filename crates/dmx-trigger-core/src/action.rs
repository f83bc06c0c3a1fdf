//! Trigger actions: a predicate over a slot transition plus the effects to
//! run when it matches.
//!
//! Evaluation is pure. Only [`Action::fire`] touches the context or launches
//! processes.

use crate::context::Context;
use crate::error::{Result, TriggerError};
use crate::supervisor::{CommandLauncher, CommandLine};
use serde::{Deserialize, Serialize};

/// Value assumed for a slot that has not been observed yet.
pub const UNOBSERVED_VALUE: u8 = 0;

/// A change of one slot's value between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Value in the previous frame, `None` on first observation
    pub previous: Option<u8>,
    /// Value in the current frame
    pub current: u8,
}

impl Transition {
    /// Create a transition
    pub fn new(previous: Option<u8>, current: u8) -> Self {
        Self { previous, current }
    }

    /// Previous value, or [`UNOBSERVED_VALUE`] on first observation.
    pub fn old_value(&self) -> u8 {
        self.previous.unwrap_or(UNOBSERVED_VALUE)
    }

    /// True on first observation or when the value went up.
    pub fn is_rising(&self) -> bool {
        match self.previous {
            Some(previous) => self.current > previous,
            None => true,
        }
    }

    /// True when a known value went down.
    pub fn is_falling(&self) -> bool {
        self.previous
            .is_some_and(|previous| self.current < previous)
    }
}

/// Condition on a slot transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// New value equals the target
    Exact(u8),
    /// New value lies within `low..=high`
    Range {
        /// Lower bound (inclusive)
        low: u8,
        /// Upper bound (inclusive)
        high: u8,
    },
    /// Value crossed the threshold upwards
    Rising(u8),
    /// Value crossed the threshold downwards
    Falling(u8),
    /// Value differs from the previous one
    AnyChange,
}

impl Predicate {
    /// Evaluate against a transition.
    pub fn matches(&self, transition: &Transition) -> bool {
        let old = transition.old_value();
        let new = transition.current;
        match *self {
            Predicate::Exact(target) => new == target,
            Predicate::Range { low, high } => (low..=high).contains(&new),
            Predicate::Rising(threshold) => old < threshold && new >= threshold,
            Predicate::Falling(threshold) => old >= threshold && new < threshold,
            Predicate::AnyChange => new != old,
        }
    }
}

/// Restricts an action to transitions in one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Any transition
    #[default]
    Either,
    /// Only when the value goes up (or on first observation)
    Rising,
    /// Only when the value goes down
    Falling,
}

impl Direction {
    /// Check whether the transition moves in this direction.
    pub fn allows(&self, transition: &Transition) -> bool {
        match self {
            Direction::Either => true,
            Direction::Rising => transition.is_rising(),
            Direction::Falling => transition.is_falling(),
        }
    }
}

/// A single side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Launch a program. Program and arguments are templates.
    Command {
        /// Program to run (looked up in `PATH`)
        program: String,
        /// Arguments
        args: Vec<String>,
    },
    /// Write variables. Values are templates, applied in order.
    Assign(Vec<(String, String)>),
}

impl Effect {
    /// Build a command effect from an argv-style list.
    ///
    /// Returns `None` if the list is empty.
    pub fn command<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Effect::Command {
            program,
            args: argv.collect(),
        })
    }

    fn apply(
        &self,
        slot: u16,
        context: &mut Context,
        launcher: &mut dyn CommandLauncher,
    ) -> Result<()> {
        match self {
            Effect::Command { program, args } => {
                let program = context.interpolate(program);
                if program.is_empty() {
                    return Err(TriggerError::EmptyProgram { slot });
                }
                let command = CommandLine {
                    program,
                    args: args.iter().map(|arg| context.interpolate(arg)).collect(),
                };
                tracing::debug!("Slot {}: launching {}", slot, command);
                launcher.launch(&command)?;
            }
            Effect::Assign(assignments) => {
                for (name, template) in assignments {
                    let value = context.interpolate(template);
                    tracing::trace!("Slot {}: {} = {:?}", slot, name, value);
                    context.set(name.clone(), value);
                }
            }
        }
        Ok(())
    }
}

/// A configured rule bound to one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    predicate: Predicate,
    direction: Direction,
    effects: Vec<Effect>,
}

impl Action {
    /// Create an action that fires in either direction
    pub fn new(predicate: Predicate, effects: Vec<Effect>) -> Self {
        Self {
            predicate,
            direction: Direction::Either,
            effects,
        }
    }

    /// Restrict the action to one direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// The predicate
    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// The direction qualifier
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Effects in firing order
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Whether this action should fire for the transition.
    pub fn evaluate(&self, transition: &Transition) -> bool {
        self.direction.allows(transition) && self.predicate.matches(transition)
    }

    /// Run the effects in order. Stops at the first failing effect.
    pub fn fire(
        &self,
        slot: u16,
        context: &mut Context,
        launcher: &mut dyn CommandLauncher,
    ) -> Result<()> {
        for effect in &self.effects {
            effect.apply(slot, context, launcher)?;
        }
        Ok(())
    }
}
