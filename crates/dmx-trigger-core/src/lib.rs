//! DMX Trigger Core - value-triggered action engine
//!
//! This crate contains the engine that turns a stream of DMX512 frames into
//! side effects:
//! - Shared variable context with `${name}` templating
//! - Actions (predicate over a slot transition + effects)
//! - Per-slot action groups and the trigger engine
//! - Child process launching and non-blocking reaping
//! - Configuration loading (TOML / RON / JSON)
//!
//! Slots are numbered 1 to 512 throughout.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use dmx_trigger_core::{
//!     Action, CommandLauncher, CommandLine, Context, DmxFrame, Effect, Predicate, SlotActions,
//!     TriggerEngine,
//! };
//!
//! struct Print;
//! impl CommandLauncher for Print {
//!     fn launch(&mut self, command: &CommandLine) -> dmx_trigger_core::Result<()> {
//!         println!("{}", command);
//!         Ok(())
//!     }
//! }
//!
//! let on = Action::new(Predicate::Exact(255), vec![Effect::command(["echo", "on"]).unwrap()]);
//! let mut groups = BTreeMap::new();
//! groups.insert(10, SlotActions::new(10, vec![on]));
//!
//! let mut engine = TriggerEngine::new(1, Context::new(), groups);
//! let mut frame = DmxFrame::blackout();
//! frame.set(10, 255);
//! let report = engine.process_frame(&frame, &mut Print);
//! assert_eq!(report.actions_fired, 1);
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod frame;
pub mod slot;
pub mod supervisor;

pub use action::{Action, Direction, Effect, Predicate, Transition, UNOBSERVED_VALUE};
pub use config::{ActionConfig, SlotConfig, TriggerConfig, DEFAULT_UNIVERSE};
pub use context::{Context, SLOT_OFFSET_VARIABLE, SLOT_VALUE_VARIABLE};
pub use engine::{FrameReport, TriggerEngine};
pub use error::{ConfigError, Result, TriggerError};
pub use frame::{DmxFrame, DmxUpdate, DMX_UNIVERSE_SIZE, MAX_SLOT};
pub use slot::SlotActions;
pub use supervisor::{CommandLauncher, CommandLine, ProcessSupervisor, TerminationFlag};
