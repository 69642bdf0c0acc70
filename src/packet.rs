//! Packet data model and wire codec (spec §3, §4.1, §6).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::HEADER_SIZE;
use crate::error::HudpError;

/// Which logical channel a packet belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelType {
    /// In-order, at-most-once delivery with bounded-effort retransmission.
    Reliable = 0,
    /// Fire-and-forget, best-effort, unordered delivery.
    Unreliable = 1,
}

impl ChannelType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ChannelType::Reliable),
            1 => Some(ChannelType::Unreliable),
            _ => None,
        }
    }
}

/// A single H-UDP frame.
///
/// An acknowledgement is represented as an ordinary `Packet` with
/// `channel_type == Reliable`, `seq_num == 0`, an empty `payload`, and
/// `ack_num` set to the sequence being acknowledged (spec §6). The wire format
/// makes no structural distinction between a data frame and an acknowledgement;
/// the receiving side infers the difference solely from the empty payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    /// Which channel this frame travels on.
    pub channel_type: ChannelType,
    /// Sequence number, monotonic per channel per sender. Unused (always 0) on
    /// acknowledgement frames.
    pub seq_num: u32,
    /// Sequence being acknowledged; meaningful only on acknowledgement frames.
    pub ack_num: u32,
    /// Seconds since the Unix epoch, stamped by the sender at (re)transmission.
    pub timestamp: f64,
    /// Frame payload, 0..=`MAX_PAYLOAD_SIZE` bytes. Empty iff this is an
    /// acknowledgement frame.
    pub payload: Box<[u8]>,
}

impl Packet {
    /// Returns the current wall-clock time in seconds since the Unix epoch, as
    /// used for the `timestamp` field.
    pub fn now_secs() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs_f64()
    }

    /// Serializes this packet to its wire representation: a [`HEADER_SIZE`]-byte
    /// header in network byte order, followed by the raw payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());

        buf.push(self.channel_type as u8);
        buf.extend_from_slice(&self.seq_num.to_be_bytes());
        buf.extend_from_slice(&self.ack_num.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        buf
    }

    /// Parses a wire frame. Fails with [`HudpError::MalformedFrame`] if `data`
    /// is shorter than the fixed header; an unrecognized `channel_type` byte is
    /// not an error here — it is surfaced as `None` channel classification for
    /// the receiver to silently drop (spec §4.1).
    pub fn deserialize(data: &[u8]) -> Result<RawFrame, HudpError> {
        if data.len() < HEADER_SIZE {
            return Err(HudpError::MalformedFrame {
                len: data.len(),
                header: HEADER_SIZE,
            });
        }

        let channel_byte = data[0];
        let seq_num = u32::from_be_bytes(data[1..5].try_into().unwrap());
        let ack_num = u32::from_be_bytes(data[5..9].try_into().unwrap());
        let timestamp = f64::from_be_bytes(data[9..17].try_into().unwrap());
        let payload: Box<[u8]> = data[HEADER_SIZE..].into();

        Ok(RawFrame {
            channel_byte,
            seq_num,
            ack_num,
            timestamp,
            payload,
        })
    }
}

/// The result of parsing a wire frame, before the channel byte has been
/// validated against the known [`ChannelType`] values.
///
/// Kept distinct from [`Packet`] because an unknown channel byte is a frame
/// that parsed successfully but carries no known channel — the receiver drops
/// it silently rather than treating it as a [`HudpError::MalformedFrame`].
pub struct RawFrame {
    channel_byte: u8,
    seq_num: u32,
    ack_num: u32,
    timestamp: f64,
    payload: Box<[u8]>,
}

impl RawFrame {
    /// Classifies this frame into a [`Packet`], or `None` if the channel byte
    /// is not one of the known values.
    pub fn into_packet(self) -> Option<Packet> {
        let channel_type = ChannelType::from_byte(self.channel_byte)?;
        Some(Packet {
            channel_type,
            seq_num: self.seq_num,
            ack_num: self.ack_num,
            timestamp: self.timestamp,
            payload: self.payload,
        })
    }
}
