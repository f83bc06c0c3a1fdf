//! DMX input system
//!
//! This module receives DMX512 via Art-Net and sACN and turns each packet
//! into a [`DmxUpdate`] for the trigger engine.
//!
//! ## Art-Net
//!
//! Art-Net is a UDP broadcast protocol for DMX transmission over Ethernet.
//! - Listens on UDP port 6454
//! - Supports 32768 universes (15-bit port address)
//! - Delivers every universe heard; filtering happens in the engine
//!
//! ## sACN (E1.31)
//!
//! sACN (Streaming ACN) is a multicast protocol for DMX transmission.
//! - Joins IP multicast group 239.255.x.x on port 5568
//! - Supports 63999 universes
//! - Late packets are dropped using the per-source sequence number
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dmx_trigger_control::dmx::{DmxReceiver, Protocol};
//!
//! # async fn run() -> dmx_trigger_control::Result<()> {
//! let mut receiver = DmxReceiver::bind(Protocol::ArtNet, 1, "0.0.0.0".parse().unwrap()).await?;
//! let update = receiver.recv_update().await?;
//! println!("universe {} carried {} slots", update.universe, update.frame.len());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "artnet")]
pub mod artnet;
#[cfg(feature = "sacn")]
pub mod sacn;

#[cfg(feature = "artnet")]
pub use artnet::{ArtDmxPacket, ArtNetReceiver, ARTNET_PORT};
#[cfg(feature = "sacn")]
pub use sacn::{SacnPacket, SacnReceiver, SACN_PORT};

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use dmx_trigger_core::DmxUpdate;
use serde::{Deserialize, Serialize};

use crate::{error::ControlError, Result};

/// Network transport for DMX input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Art-Net 4
    #[default]
    ArtNet,
    /// E1.31 streaming ACN
    Sacn,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::ArtNet => write!(f, "Art-Net"),
            Protocol::Sacn => write!(f, "sACN"),
        }
    }
}

/// A bound receiver for either protocol
pub enum DmxReceiver {
    /// Art-Net input
    #[cfg(feature = "artnet")]
    ArtNet(ArtNetReceiver),
    /// sACN input
    #[cfg(feature = "sacn")]
    Sacn(SacnReceiver),
}

impl DmxReceiver {
    /// Bind a receiver on the protocol's standard port.
    ///
    /// # Arguments
    /// * `protocol` - Transport to listen on
    /// * `universe` - Universe to watch (used to pick the sACN multicast group)
    /// * `ip` - Local address to bind, usually `0.0.0.0`
    pub async fn bind(protocol: Protocol, universe: u16, ip: IpAddr) -> Result<Self> {
        match protocol {
            #[cfg(feature = "artnet")]
            Protocol::ArtNet => {
                if universe > artnet::MAX_ARTNET_UNIVERSE {
                    return Err(ControlError::InvalidUniverse {
                        protocol: "Art-Net",
                        universe,
                        min: 0,
                        max: artnet::MAX_ARTNET_UNIVERSE,
                    });
                }
                let receiver = ArtNetReceiver::bind(SocketAddr::new(ip, ARTNET_PORT)).await?;
                Ok(DmxReceiver::ArtNet(receiver))
            }
            #[cfg(feature = "sacn")]
            Protocol::Sacn => {
                let receiver = SacnReceiver::bind(SocketAddr::new(ip, SACN_PORT), universe).await?;
                Ok(DmxReceiver::Sacn(receiver))
            }
            #[allow(unreachable_patterns)]
            other => Err(ControlError::ProtocolDisabled(match other {
                Protocol::ArtNet => "Art-Net",
                Protocol::Sacn => "sACN",
            })),
        }
    }

    /// The protocol this receiver speaks
    pub fn protocol(&self) -> Protocol {
        match self {
            #[cfg(feature = "artnet")]
            DmxReceiver::ArtNet(_) => Protocol::ArtNet,
            #[cfg(feature = "sacn")]
            DmxReceiver::Sacn(_) => Protocol::Sacn,
        }
    }

    /// Wait for the next DMX update. Cancel safe.
    pub async fn recv_update(&mut self) -> Result<DmxUpdate> {
        match self {
            #[cfg(feature = "artnet")]
            DmxReceiver::ArtNet(receiver) => receiver.recv_update().await,
            #[cfg(feature = "sacn")]
            DmxReceiver::Sacn(receiver) => receiver.recv_update().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::ArtNet.to_string(), "Art-Net");
        assert_eq!(Protocol::Sacn.to_string(), "sACN");
        assert_eq!(Protocol::default(), Protocol::ArtNet);
    }

    #[test]
    fn test_protocol_serialization() {
        assert_eq!(serde_json::to_string(&Protocol::Sacn).unwrap(), "\"sacn\"");
        let parsed: Protocol = serde_json::from_str("\"artnet\"").unwrap();
        assert_eq!(parsed, Protocol::ArtNet);
    }

    #[cfg(feature = "artnet")]
    #[tokio::test]
    async fn test_artnet_universe_out_of_range() {
        let ip = "127.0.0.1".parse().unwrap();
        let result = DmxReceiver::bind(Protocol::ArtNet, 0x8000, ip).await;
        assert!(matches!(result, Err(ControlError::InvalidUniverse { .. })));
    }

    #[cfg(feature = "sacn")]
    #[tokio::test]
    async fn test_sacn_universe_out_of_range() {
        let result = DmxReceiver::bind(Protocol::Sacn, 0, "127.0.0.1".parse().unwrap()).await;
        assert!(matches!(result, Err(ControlError::InvalidUniverse { .. })));
    }
}
