//! Art-Net protocol implementation (Art-Net 4, ArtDmx only)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.
//! Only OpDmx packets carry slot data; every other opcode is skipped.

use std::net::SocketAddr;

use dmx_trigger_core::{DmxFrame, DmxUpdate};
use tokio::net::UdpSocket;

use crate::{error::ControlError, Result};

/// Standard Art-Net UDP port
pub const ARTNET_PORT: u16 = 6454;

/// Highest 15-bit Art-Net port address
pub const MAX_ARTNET_UNIVERSE: u16 = 0x7FFF;

const HEADER: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;
const DMX_OFFSET: usize = 18;

/// A decoded ArtDmx packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmxPacket {
    /// Sequence number (0 = sequencing disabled)
    pub sequence: u8,
    /// Physical input port of the sender
    pub physical: u8,
    /// 15-bit port address (Net, Sub-Net, Universe)
    pub universe: u16,
    /// Slot data
    pub frame: DmxFrame,
}

impl ArtDmxPacket {
    /// Decode a datagram.
    ///
    /// Returns `Ok(None)` for valid Art-Net packets that are not OpDmx.
    pub fn parse(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < 10 || &buf[0..8] != HEADER {
            return Err(ControlError::InvalidPacket(
                "missing Art-Net header".to_string(),
            ));
        }

        // OpCode is little-endian
        let opcode = u16::from_le_bytes([buf[8], buf[9]]);
        if opcode != OP_DMX {
            return Ok(None);
        }

        if buf.len() < DMX_OFFSET {
            return Err(ControlError::InvalidPacket(format!(
                "ArtDmx packet too short: {} bytes",
                buf.len()
            )));
        }

        // Protocol version is big-endian
        let version = u16::from_be_bytes([buf[10], buf[11]]);
        if version < PROTOCOL_VERSION {
            return Err(ControlError::InvalidPacket(format!(
                "unsupported Art-Net protocol version {}",
                version
            )));
        }

        let universe = u16::from_le_bytes([buf[14], buf[15]]) & MAX_ARTNET_UNIVERSE;

        // Length is big-endian
        let length = usize::from(u16::from_be_bytes([buf[16], buf[17]]));
        if length == 0 || length > 512 {
            return Err(ControlError::InvalidPacket(format!(
                "invalid ArtDmx length {}",
                length
            )));
        }
        if buf.len() < DMX_OFFSET + length {
            return Err(ControlError::InvalidPacket(format!(
                "ArtDmx truncated: header says {} slots, got {}",
                length,
                buf.len() - DMX_OFFSET
            )));
        }

        Ok(Some(Self {
            sequence: buf[12],
            physical: buf[13],
            universe,
            frame: DmxFrame::from_slice(&buf[DMX_OFFSET..DMX_OFFSET + length]),
        }))
    }

    /// Encode as an OpDmx datagram.
    pub fn encode(&self) -> Vec<u8> {
        let data = self.frame.as_slice();
        // ArtDmx lengths must be even
        let length = data.len() + data.len() % 2;
        let mut packet = vec![0u8; DMX_OFFSET + length];

        packet[0..8].copy_from_slice(HEADER);
        packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());
        packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        packet[12] = self.sequence;
        packet[13] = self.physical;
        packet[14..16].copy_from_slice(&(self.universe & MAX_ARTNET_UNIVERSE).to_le_bytes());
        packet[16..18].copy_from_slice(&(length as u16).to_be_bytes());
        packet[DMX_OFFSET..DMX_OFFSET + data.len()].copy_from_slice(data);

        packet
    }
}

/// Art-Net receiver producing DMX updates for every universe it hears.
pub struct ArtNetReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl ArtNetReceiver {
    /// Bind a receiver.
    ///
    /// # Arguments
    /// * `addr` - Local address, typically `0.0.0.0:6454`
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        socket.set_broadcast(true)?;

        tracing::info!("Art-Net receiver listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            buf: vec![0u8; 1024],
        })
    }

    /// Local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next ArtDmx packet.
    ///
    /// Non-DMX Art-Net traffic (polls, replies, ...) is skipped. This method
    /// is cancel safe.
    pub async fn recv_update(&mut self) -> Result<DmxUpdate> {
        loop {
            let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
            match ArtDmxPacket::parse(&self.buf[..len])? {
                Some(packet) => {
                    tracing::trace!(
                        "ArtDmx from {} universe {} seq {} ({} slots)",
                        peer,
                        packet.universe,
                        packet.sequence,
                        packet.frame.len()
                    );
                    return Ok(DmxUpdate::new(packet.universe, packet.frame));
                }
                None => tracing::trace!("Skipping non-DMX Art-Net packet from {}", peer),
            }
        }
    }
}
