//! Error types for the trigger engine and its configuration loader.

use thiserror::Error;

/// Errors raised while firing action effects.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// The command could not be launched (missing binary, fd or process limits, ...)
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that was being launched
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The command resolved to an empty program name after interpolation
    #[error("command for slot {slot} resolved to an empty program")]
    EmptyProgram {
        /// Slot whose action produced the command
        slot: u16,
    },

    /// Launcher rejected the command for another reason
    #[error("launch rejected: {0}")]
    Rejected(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Errors raised while loading and validating a trigger configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// RON parse error
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension not recognised
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the size limit
    #[error("Config file too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Maximum accepted size in bytes
        limit: u64,
    },

    /// Slot number outside 1..=512
    #[error("Invalid slot {0} (must be 1-512)")]
    InvalidSlot(u16),

    /// Range predicate with low > high
    #[error("Invalid range {low}-{high} on slot {slot}")]
    InvalidRange {
        /// Slot carrying the action
        slot: u16,
        /// Lower bound
        low: u8,
        /// Upper bound
        high: u8,
    },

    /// Action with neither a command nor assignments
    #[error("Action #{index} on slot {slot} has no effect (needs `run` or `set`)")]
    NoEffect {
        /// Slot carrying the action
        slot: u16,
        /// Position of the action within the slot, starting at 1
        index: usize,
    },

    /// `run` list without a program
    #[error("Action #{index} on slot {slot} has an empty command")]
    EmptyCommand {
        /// Slot carrying the action
        slot: u16,
        /// Position of the action within the slot, starting at 1
        index: usize,
    },

    /// Variable name that cannot be referenced from a template
    #[error("Invalid variable name: {0:?}")]
    InvalidVariableName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_display() {
        let err = TriggerError::Spawn {
            program: "missing-tool".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("failed to spawn 'missing-tool'"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidRange {
            slot: 4,
            low: 200,
            high: 10,
        };
        assert_eq!(err.to_string(), "Invalid range 200-10 on slot 4");

        let err = ConfigError::FileTooLarge { size: 10, limit: 5 };
        assert!(err.to_string().contains("limit 5"));
    }
}
