//! DMX Trigger Control - network frame sources
//!
//! This crate receives DMX512 frames from the network and hands them to the
//! trigger engine as [`DmxUpdate`](dmx_trigger_core::DmxUpdate)s:
//! - **Art-Net**: ArtDmx packets on UDP 6454
//! - **sACN**: E1.31 data packets on the universe's multicast group
//!
//! ## Feature Flags
//!
//! - `artnet`: Art-Net input (default)
//! - `sacn`: sACN input (default)
//!
//! ## Modules
//!
//! - [`dmx`] - Protocol decoding and receivers
//! - [`error`] - Error types

#[cfg(not(any(feature = "artnet", feature = "sacn")))]
compile_error!("enable at least one of the `artnet` or `sacn` features");

/// Error types
pub mod error;

/// DMX input (Art-Net, sACN)
pub mod dmx;

// Re-exports
pub use dmx::{DmxReceiver, Protocol};
pub use error::{ControlError, Result};

#[cfg(feature = "artnet")]
pub use dmx::ArtNetReceiver;
#[cfg(feature = "sacn")]
pub use dmx::SacnReceiver;
