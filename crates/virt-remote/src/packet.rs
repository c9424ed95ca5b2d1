//! libvirt RPC packet encoding/decoding.
//!
//! Every packet on the wire looks like:
//!
//! ```plaintext
//! +------------+------------+------------+------------+
//! | length (4) | program(4) | version(4) |procedure(4)|
//! +------------+------------+------------+------------+
//! |  type (4)  | serial (4) | status (4) |   payload  |
//! +------------+------------+------------+------------+
//! ```
//!
//! All multi-byte values are big-endian. The length counts itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::{REMOTE_PROGRAM, REMOTE_PROTOCOL_VERSION};

/// Packet header size in bytes (not including length field).
pub const HEADER_SIZE: usize = 24;

/// Maximum packet size (4 MB).
pub const MAX_PACKET_SIZE: usize = 4 * 1024 * 1024;

/// RPC message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// Request/call message.
    Call = 0,
    /// Reply message.
    Reply = 1,
    /// Async event message.
    Message = 2,
    /// Stream data.
    Stream = 3,
}

impl MessageType {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Call),
            1 => Some(Self::Reply),
            2 => Some(Self::Message),
            3 => Some(Self::Stream),
            _ => None,
        }
    }
}

/// RPC message status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    /// Payload is a `remote_error`.
    Error = 1,
    /// More stream data follows.
    Continue = 2,
}

impl Status {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Continue),
            _ => None,
        }
    }
}

/// An RPC packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub msg_type: MessageType,
    /// Pairs a reply with its call.
    pub serial: u32,
    pub status: Status,
    pub payload: Bytes,
}

impl Packet {
    /// Create a new call packet.
    pub fn new_call(procedure: u32, serial: u32, payload: Bytes) -> Self {
        Self {
            program: REMOTE_PROGRAM,
            version: REMOTE_PROTOCOL_VERSION,
            procedure,
            msg_type: MessageType::Call,
            serial,
            status: Status::Ok,
            payload,
        }
    }

    /// Create a reply packet, as the daemon would send it.
    pub fn new_reply(procedure: u32, serial: u32, status: Status, payload: Bytes) -> Self {
        Self {
            msg_type: MessageType::Reply,
            status,
            ..Self::new_call(procedure, serial, payload)
        }
    }

    /// Encode the packet to bytes, length prefix included.
    pub fn encode(&self) -> Result<BytesMut, PacketError> {
        let total_len = 4 + HEADER_SIZE + self.payload.len();
        if total_len > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge(total_len));
        }

        let mut buf = BytesMut::with_capacity(total_len);
        buf.put_u32(total_len as u32);
        buf.put_u32(self.program);
        buf.put_u32(self.version);
        buf.put_u32(self.procedure);
        buf.put_u32(self.msg_type as u32);
        buf.put_u32(self.serial);
        buf.put_u32(self.status as u32);
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }

    /// Decode a packet from bytes.
    ///
    /// The input should NOT include the length prefix.
    pub fn decode(mut data: Bytes) -> Result<Self, PacketError> {
        if data.len() < HEADER_SIZE {
            return Err(PacketError::TooShort);
        }

        let program = data.get_u32();
        let version = data.get_u32();
        let procedure = data.get_u32();
        let msg_type = data.get_u32();
        let serial = data.get_u32();
        let status = data.get_u32();

        if program != REMOTE_PROGRAM {
            return Err(PacketError::UnknownProgram(program));
        }

        let msg_type =
            MessageType::from_u32(msg_type).ok_or(PacketError::InvalidMessageType(msg_type))?;
        let status = Status::from_u32(status).ok_or(PacketError::InvalidStatus(status))?;

        Ok(Self {
            program,
            version,
            procedure,
            msg_type,
            serial,
            status,
            payload: data,
        })
    }
}

/// Packet parsing/encoding error.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("packet too short")]
    TooShort,
    #[error("unknown program: {0:#x}")]
    UnknownProgram(u32),
    #[error("invalid message type: {0}")]
    InvalidMessageType(u32),
    #[error("invalid status: {0}")]
    InvalidStatus(u32),
    #[error("packet too large: {0} bytes")]
    TooLarge(usize),
}
