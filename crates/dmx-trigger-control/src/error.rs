//! Error types for DMX frame sources
use thiserror::Error;

/// Frame source errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// I/O error on the socket
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Packet could not be decoded
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Universe outside the protocol's range
    #[error("Invalid universe {universe} for {protocol} (must be {min}-{max})")]
    InvalidUniverse {
        /// Protocol name
        protocol: &'static str,
        /// Requested universe
        universe: u16,
        /// Smallest valid universe
        min: u16,
        /// Largest valid universe
        max: u16,
    },

    /// Protocol support was compiled out
    #[error("{0} support is not enabled in this build")]
    ProtocolDisabled(&'static str),
}

impl ControlError {
    /// True for errors that only affect a single packet.
    pub fn is_packet_error(&self) -> bool {
        matches!(self, ControlError::InvalidPacket(_))
    }
}

/// Result type for frame source operations
pub type Result<T> = std::result::Result<T, ControlError>;
