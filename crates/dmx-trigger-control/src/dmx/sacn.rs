//! sACN (E1.31) protocol implementation
//!
//! sACN (Streaming ACN) is a protocol for transmitting DMX512 over IP multicast.
//! The receiver joins the multicast group of one universe and decodes E1.31
//! data packets.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use dmx_trigger_core::{DmxFrame, DmxUpdate};
use tokio::net::UdpSocket;

use crate::{error::ControlError, Result};

/// Standard sACN UDP port
pub const SACN_PORT: u16 = 5568;

/// Lowest valid sACN universe
pub const MIN_SACN_UNIVERSE: u16 = 1;

/// Highest valid sACN universe
pub const MAX_SACN_UNIVERSE: u16 = 63999;

const ACN_PACKET_IDENTIFIER: [u8; 12] = [
    0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00,
];
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;

const OPTION_PREVIEW_DATA: u8 = 0x80;
const OPTION_STREAM_TERMINATED: u8 = 0x40;

/// Offset of the DMX start code
const START_CODE_OFFSET: usize = 125;

/// Packets whose sequence number is this many steps behind the last one are
/// considered out of order (E1.31 section 6.7.2).
const SEQUENCE_WINDOW: i16 = 20;

/// Multicast group for a universe: 239.255.{hi}.{lo}
pub fn multicast_group(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

/// Check a universe number against the E1.31 range
pub fn validate_universe(universe: u16) -> Result<()> {
    if (MIN_SACN_UNIVERSE..=MAX_SACN_UNIVERSE).contains(&universe) {
        Ok(())
    } else {
        Err(ControlError::InvalidUniverse {
            protocol: "sACN",
            universe,
            min: MIN_SACN_UNIVERSE,
            max: MAX_SACN_UNIVERSE,
        })
    }
}

/// A decoded E1.31 data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SacnPacket {
    /// Component ID of the source
    pub cid: [u8; 16],
    /// Human readable source name
    pub source_name: String,
    /// Source priority (0-200)
    pub priority: u8,
    /// Sequence number
    pub sequence: u8,
    /// Option flags
    pub options: u8,
    /// Universe
    pub universe: u16,
    /// Slot data (start code not included)
    pub frame: DmxFrame,
}

impl SacnPacket {
    /// Decode a datagram.
    ///
    /// Returns `Ok(None)` for well-formed E1.31 packets that carry no
    /// level data (synchronization, discovery, alternate start codes).
    pub fn parse(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < 22 || buf[4..16] != ACN_PACKET_IDENTIFIER {
            return Err(ControlError::InvalidPacket(
                "missing ACN packet identifier".to_string(),
            ));
        }

        let root_vector = read_u32(buf, 18);
        if root_vector != VECTOR_ROOT_E131_DATA {
            return Ok(None);
        }

        if buf.len() < 44 {
            return Err(ControlError::InvalidPacket(format!(
                "E1.31 packet too short: {} bytes",
                buf.len()
            )));
        }
        if read_u32(buf, 40) != VECTOR_E131_DATA_PACKET {
            return Ok(None);
        }

        if buf.len() <= START_CODE_OFFSET {
            return Err(ControlError::InvalidPacket(format!(
                "E1.31 data packet too short: {} bytes",
                buf.len()
            )));
        }
        if buf[117] != VECTOR_DMP_SET_PROPERTY {
            return Err(ControlError::InvalidPacket(format!(
                "unexpected DMP vector 0x{:02x}",
                buf[117]
            )));
        }

        // Property value count includes the start code
        let count = usize::from(read_u16(buf, 123));
        if count == 0 || count > 513 || buf.len() < START_CODE_OFFSET + count {
            return Err(ControlError::InvalidPacket(format!(
                "invalid property value count {}",
                count
            )));
        }
        if buf[START_CODE_OFFSET] != 0x00 {
            return Ok(None);
        }

        let mut cid = [0u8; 16];
        cid.copy_from_slice(&buf[22..38]);

        let name_bytes = &buf[44..108];
        let name_len = name_bytes.iter().position(|b| *b == 0).unwrap_or(64);
        let source_name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        Ok(Some(Self {
            cid,
            source_name,
            priority: buf[108],
            sequence: buf[111],
            options: buf[112],
            universe: read_u16(buf, 113),
            frame: DmxFrame::from_slice(&buf[START_CODE_OFFSET + 1..START_CODE_OFFSET + count]),
        }))
    }

    /// True if the source marked this packet as preview-only
    pub fn is_preview(&self) -> bool {
        self.options & OPTION_PREVIEW_DATA != 0
    }

    /// True if the source announced it is stopping
    pub fn is_stream_terminated(&self) -> bool {
        self.options & OPTION_STREAM_TERMINATED != 0
    }

    /// Encode as an E1.31 data packet.
    pub fn encode(&self) -> Vec<u8> {
        let data = self.frame.as_slice();
        let total = START_CODE_OFFSET + 1 + data.len();
        let mut packet = vec![0u8; total];
        let mut offset = 0;

        // Root Layer
        packet[offset..offset + 2].copy_from_slice(&0x0010u16.to_be_bytes());
        offset += 2;
        packet[offset..offset + 2].copy_from_slice(&0x0000u16.to_be_bytes());
        offset += 2;
        packet[offset..offset + 12].copy_from_slice(&ACN_PACKET_IDENTIFIER);
        offset += 12;
        packet[offset..offset + 2].copy_from_slice(&flags_and_length(total - 16));
        offset += 2;
        packet[offset..offset + 4].copy_from_slice(&VECTOR_ROOT_E131_DATA.to_be_bytes());
        offset += 4;
        packet[offset..offset + 16].copy_from_slice(&self.cid);
        offset += 16;

        // Framing Layer
        packet[offset..offset + 2].copy_from_slice(&flags_and_length(total - 38));
        offset += 2;
        packet[offset..offset + 4].copy_from_slice(&VECTOR_E131_DATA_PACKET.to_be_bytes());
        offset += 4;
        let name = self.source_name.as_bytes();
        let copy_len = name.len().min(63);
        packet[offset..offset + copy_len].copy_from_slice(&name[..copy_len]);
        offset += 64;
        packet[offset] = self.priority;
        offset += 1;
        // Synchronization address: none
        offset += 2;
        packet[offset] = self.sequence;
        offset += 1;
        packet[offset] = self.options;
        offset += 1;
        packet[offset..offset + 2].copy_from_slice(&self.universe.to_be_bytes());
        offset += 2;

        // DMP Layer
        packet[offset..offset + 2].copy_from_slice(&flags_and_length(total - 115));
        offset += 2;
        packet[offset] = VECTOR_DMP_SET_PROPERTY;
        offset += 1;
        packet[offset] = 0xa1;
        offset += 1;
        packet[offset..offset + 2].copy_from_slice(&0x0000u16.to_be_bytes());
        offset += 2;
        packet[offset..offset + 2].copy_from_slice(&0x0001u16.to_be_bytes());
        offset += 2;
        packet[offset..offset + 2].copy_from_slice(&((data.len() + 1) as u16).to_be_bytes());
        offset += 2;

        // Start code 0x00, then slot data
        packet[offset] = 0x00;
        offset += 1;
        packet[offset..].copy_from_slice(data);

        packet
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn flags_and_length(length: usize) -> [u8; 2] {
    (0x7000u16 | (length as u16 & 0x0FFF)).to_be_bytes()
}

/// Wildcard address with the requested port.
fn listen_addr(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), addr.port()),
        SocketAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), addr.port()),
    }
}

fn multicast_interface(addr: SocketAddr) -> Ipv4Addr {
    match addr {
        SocketAddr::V4(v4) => *v4.ip(),
        SocketAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    }
}

/// Tracks the last sequence number per source to drop late packets.
#[derive(Debug, Default)]
struct SequenceTracker {
    last: HashMap<[u8; 16], u8>,
}

impl SequenceTracker {
    /// Returns false if the packet arrived out of order.
    fn accept(&mut self, cid: [u8; 16], sequence: u8) -> bool {
        if let Some(&last) = self.last.get(&cid) {
            let diff = i16::from(sequence.wrapping_sub(last) as i8);
            if diff <= 0 && diff > -SEQUENCE_WINDOW {
                return false;
            }
        }
        self.last.insert(cid, sequence);
        true
    }

    fn forget(&mut self, cid: &[u8; 16]) {
        self.last.remove(cid);
    }
}

/// sACN receiver for a single universe.
pub struct SacnReceiver {
    socket: UdpSocket,
    universe: u16,
    sequences: SequenceTracker,
    buf: Vec<u8>,
}

impl SacnReceiver {
    /// Bind a receiver and join the universe's multicast group.
    ///
    /// # Arguments
    /// * `addr` - Interface to join the group on, and the port to listen on
    ///   (typically `0.0.0.0:5568`)
    /// * `universe` - sACN universe (1-63999)
    ///
    /// The socket listens on every local address so multicast datagrams are
    /// delivered even when `addr` names a unicast interface. If the group
    /// cannot be joined the receiver still accepts unicast packets.
    pub async fn bind(addr: SocketAddr, universe: u16) -> Result<Self> {
        validate_universe(universe)?;

        let socket = UdpSocket::bind(listen_addr(addr)).await?;
        let group = multicast_group(universe);
        let interface = multicast_interface(addr);
        if let Err(e) = socket.join_multicast_v4(group, interface) {
            tracing::warn!(
                "Could not join sACN multicast group {} on {}: {}",
                group,
                interface,
                e
            );
        }

        tracing::info!(
            "sACN receiver for universe {} listening on {}",
            universe,
            socket.local_addr()?
        );

        Ok(Self {
            socket,
            universe,
            sequences: SequenceTracker::default(),
            buf: vec![0u8; 1144],
        })
    }

    /// The universe this receiver joined
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next level data packet.
    ///
    /// Preview and stream-terminated packets are returned with `error` set.
    /// Out of order and non-level packets are skipped. This method is cancel
    /// safe.
    pub async fn recv_update(&mut self) -> Result<DmxUpdate> {
        loop {
            let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
            let Some(packet) = SacnPacket::parse(&self.buf[..len])? else {
                tracing::trace!("Skipping non-level sACN packet from {}", peer);
                continue;
            };

            if packet.is_stream_terminated() {
                self.sequences.forget(&packet.cid);
                tracing::info!(
                    "sACN source '{}' terminated universe {}",
                    packet.source_name,
                    packet.universe
                );
                return Ok(DmxUpdate::with_error(
                    packet.universe,
                    packet.frame,
                    "stream terminated by source",
                ));
            }

            if !self.sequences.accept(packet.cid, packet.sequence) {
                tracing::debug!(
                    "Dropping out of order sACN packet {} from '{}'",
                    packet.sequence,
                    packet.source_name
                );
                continue;
            }

            if packet.is_preview() {
                return Ok(DmxUpdate::with_error(
                    packet.universe,
                    packet.frame,
                    "preview data",
                ));
            }

            return Ok(DmxUpdate::new(packet.universe, packet.frame));
        }
    }
}
