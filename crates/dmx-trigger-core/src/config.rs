//! Trigger configuration files.
//!
//! A configuration is loaded once at startup from TOML, RON or JSON
//! (chosen by file extension), validated, and then split into the values the
//! engine owns: the initial [`Context`] and the slot to [`SlotActions`]
//! mapping.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::action::{Action, Direction, Effect, Predicate};
use crate::context::{is_valid_variable_name, Context};
use crate::error::ConfigError;
use crate::frame::is_valid_slot;
use crate::slot::SlotActions;

/// Maximum accepted configuration file size (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Universe used when neither the file nor the command line names one.
pub const DEFAULT_UNIVERSE: u16 = 1;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Universe to watch
    #[serde(default)]
    pub universe: Option<u16>,
    /// Initial context variables
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Slot rules, in file order
    #[serde(default, rename = "slot")]
    pub slots: Vec<SlotConfig>,
}

/// Actions for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotConfig {
    /// 1-based slot number
    pub slot: u16,
    /// Actions in firing order
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionConfig>,
}

/// One action as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    /// Trigger condition
    pub when: Predicate,
    /// Direction qualifier
    #[serde(default)]
    pub direction: Direction,
    /// Command to launch, program first
    #[serde(default)]
    pub run: Option<Vec<String>>,
    /// Variables to set after the command was launched, in file order
    #[serde(default)]
    pub set: IndexMap<String, String>,
}

impl TriggerConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_limit(path, MAX_CONFIG_FILE_SIZE)
    }

    fn load_with_limit(path: &Path, limit: u64) -> Result<Self, ConfigError> {
        let size = std::fs::metadata(path)?.len();
        if size > limit {
            return Err(ConfigError::FileTooLarge { size, limit });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");
        let content = std::fs::read_to_string(path)?;

        let config: TriggerConfig = match extension {
            "toml" => toml::from_str(&content)?,
            "ron" => ron::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => return Err(ConfigError::UnsupportedFormat(extension.to_string())),
        };

        config.validate()?;
        tracing::debug!(
            "Loaded {} slot entries and {} variables from {:?}",
            config.slots.len(),
            config.variables.len(),
            path
        );
        Ok(config)
    }

    /// Check slot numbers, ranges, commands and variable names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.variables.keys() {
            check_variable_name(name)?;
        }

        for slot in &self.slots {
            if !is_valid_slot(slot.slot) {
                return Err(ConfigError::InvalidSlot(slot.slot));
            }
            for (i, action) in slot.actions.iter().enumerate() {
                let index = i + 1;
                if let Predicate::Range { low, high } = action.when {
                    if low > high {
                        return Err(ConfigError::InvalidRange {
                            slot: slot.slot,
                            low,
                            high,
                        });
                    }
                }
                match &action.run {
                    Some(argv) if argv.first().map_or(true, |p| p.is_empty()) => {
                        return Err(ConfigError::EmptyCommand {
                            slot: slot.slot,
                            index,
                        });
                    }
                    None if action.set.is_empty() => {
                        return Err(ConfigError::NoEffect {
                            slot: slot.slot,
                            index,
                        });
                    }
                    _ => {}
                }
                for name in action.set.keys() {
                    check_variable_name(name)?;
                }
            }
        }
        Ok(())
    }

    /// Universe from the file, or [`DEFAULT_UNIVERSE`].
    pub fn universe_or_default(&self) -> u16 {
        self.universe.unwrap_or(DEFAULT_UNIVERSE)
    }

    /// Split into the engine's initial context and slot mapping.
    ///
    /// Entries for the same slot are merged in file order. Slots that end up
    /// without actions are left out.
    pub fn into_parts(self) -> (Context, BTreeMap<u16, SlotActions>) {
        let context: Context = self.variables.into_iter().collect();

        let mut merged: BTreeMap<u16, Vec<Action>> = BTreeMap::new();
        for slot in self.slots {
            merged
                .entry(slot.slot)
                .or_default()
                .extend(slot.actions.into_iter().map(ActionConfig::into_action));
        }

        let groups = merged
            .into_iter()
            .filter(|(_, actions)| !actions.is_empty())
            .map(|(slot, actions)| (slot, SlotActions::new(slot, actions)))
            .collect();

        (context, groups)
    }
}

impl ActionConfig {
    fn into_action(self) -> Action {
        let mut effects = Vec::with_capacity(2);
        if let Some(command) = self.run.and_then(Effect::command) {
            effects.push(command);
        }
        if !self.set.is_empty() {
            effects.push(Effect::Assign(self.set.into_iter().collect()));
        }
        Action::new(self.when, effects).with_direction(self.direction)
    }
}

fn check_variable_name(name: &str) -> Result<(), ConfigError> {
    if is_valid_variable_name(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidVariableName(name.to_string()))
    }
}
