#![cfg(feature = "std")]

//! Fixed-layout datagram encoding.
//!
//! Layout: `kind: u8`, `sequence: u32` (little-endian), then the payload of
//! that kind. Every payload has a fixed size, so a datagram is either exactly
//! the right length or malformed.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::domain::{DirectionalUpdate, ProjectileInfo, TargetSpawnInfo};
use crate::protocol::{Packet, PacketBody, PacketKind};

/// Bytes taken by the kind tag and sequence number.
pub const HEADER_LEN: usize = 5;

/// Upper bound on any encoded packet; larger datagrams are rejected unread.
pub const MAX_DATAGRAM_LEN: usize = 64;

#[derive(Serialize, Deserialize)]
struct DieRollPayload {
    round: u32,
    roll: u32,
}

#[derive(Serialize, Deserialize)]
struct RoundPayload {
    round: u32,
}

#[derive(Serialize, Deserialize)]
struct GameLengthPayload {
    seconds: u32,
}

#[derive(Serialize, Deserialize)]
struct PausePayload {
    ack: bool,
}

/// Reasons a datagram could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than the header needs.
    Truncated { len: usize },
    /// Datagram exceeds [`MAX_DATAGRAM_LEN`].
    TooLarge { len: usize },
    /// Kind tag does not name a packet kind.
    UnknownKind(u8),
    /// Payload has the wrong size or invalid contents for its kind.
    Malformed { kind: PacketKind, reason: String },
    /// Serialization failed.
    Encode(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated { len } => {
                write!(f, "Datagram truncated: {} bytes (header needs {})", len, HEADER_LEN)
            }
            CodecError::TooLarge { len } => {
                write!(f, "Datagram too large: {} bytes (max: {})", len, MAX_DATAGRAM_LEN)
            }
            CodecError::UnknownKind(tag) => write!(f, "Unknown packet kind: {}", tag),
            CodecError::Malformed { kind, reason } => {
                write!(f, "Malformed {:?} payload: {}", kind, reason)
            }
            CodecError::Encode(reason) => write!(f, "Encode error: {}", reason),
        }
    }
}

impl std::error::Error for CodecError {}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn write_payload<T: Serialize>(out: &mut Vec<u8>, payload: &T) -> Result<(), CodecError> {
    let bytes = options()
        .serialize(payload)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    out.extend_from_slice(&bytes);
    Ok(())
}

fn read_payload<T: DeserializeOwned>(kind: PacketKind, bytes: &[u8]) -> Result<T, CodecError> {
    options().deserialize(bytes).map_err(|e| CodecError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

fn expect_empty(kind: PacketKind, bytes: &[u8]) -> Result<(), CodecError> {
    if bytes.is_empty() {
        Ok(())
    } else {
        Err(CodecError::Malformed {
            kind,
            reason: format!("unexpected {} payload bytes", bytes.len()),
        })
    }
}

fn require_finite(kind: PacketKind, finite: bool) -> Result<(), CodecError> {
    if finite {
        Ok(())
    } else {
        Err(CodecError::Malformed {
            kind,
            reason: "non-finite coordinate".to_string(),
        })
    }
}

/// Encode a packet into a datagram.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(MAX_DATAGRAM_LEN);
    write_payload(&mut out, &(packet.kind() as u8, packet.sequence))?;
    match packet.body {
        PacketBody::DieRoll { round, roll } => {
            write_payload(&mut out, &DieRollPayload { round, roll })?
        }
        PacketBody::DieRollAck { round } | PacketBody::RestartDieRoll { round } => {
            write_payload(&mut out, &RoundPayload { round })?
        }
        PacketBody::NewGameLength { seconds } => {
            write_payload(&mut out, &GameLengthPayload { seconds })?
        }
        PacketBody::DirectionalUpdate(update) => write_payload(&mut out, &update)?,
        PacketBody::TargetSpawned(info) => write_payload(&mut out, &info)?,
        PacketBody::ProjectileFired(info) => write_payload(&mut out, &info)?,
        PacketBody::PeerPaused { ack } => write_payload(&mut out, &PausePayload { ack })?,
        PacketBody::Heartbeat
        | PacketBody::PlayerReady
        | PacketBody::ReadyAck
        | PacketBody::GameCancelled
        | PacketBody::ActionLayerReady
        | PacketBody::ActionLayerReadyAck
        | PacketBody::PeerResumed
        | PacketBody::ResumeAck
        | PacketBody::PeerQuit => {}
    }
    Ok(out)
}

/// Decode a datagram. Any deviation from the fixed layout is an error.
pub fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: bytes.len() });
    }
    if bytes.len() > MAX_DATAGRAM_LEN {
        return Err(CodecError::TooLarge { len: bytes.len() });
    }
    let tag = bytes[0];
    let kind = PacketKind::from_u8(tag).ok_or(CodecError::UnknownKind(tag))?;
    let (_, sequence): (u8, u32) = read_payload(kind, &bytes[..HEADER_LEN])?;
    let payload = &bytes[HEADER_LEN..];

    let body = match kind {
        PacketKind::DieRoll => {
            let p: DieRollPayload = read_payload(kind, payload)?;
            PacketBody::DieRoll {
                round: p.round,
                roll: p.roll,
            }
        }
        PacketKind::DieRollAck => {
            let p: RoundPayload = read_payload(kind, payload)?;
            PacketBody::DieRollAck { round: p.round }
        }
        PacketKind::RestartDieRoll => {
            let p: RoundPayload = read_payload(kind, payload)?;
            PacketBody::RestartDieRoll { round: p.round }
        }
        PacketKind::NewGameLength => {
            let p: GameLengthPayload = read_payload(kind, payload)?;
            PacketBody::NewGameLength { seconds: p.seconds }
        }
        PacketKind::DirectionalUpdate => {
            let update: DirectionalUpdate = read_payload(kind, payload)?;
            require_finite(kind, update.is_finite())?;
            PacketBody::DirectionalUpdate(update)
        }
        PacketKind::TargetSpawned => {
            let info: TargetSpawnInfo = read_payload(kind, payload)?;
            require_finite(kind, info.is_finite())?;
            PacketBody::TargetSpawned(info)
        }
        PacketKind::ProjectileFired => {
            let info: ProjectileInfo = read_payload(kind, payload)?;
            require_finite(kind, info.is_finite())?;
            PacketBody::ProjectileFired(info)
        }
        PacketKind::PeerPaused => {
            let p: PausePayload = read_payload(kind, payload)?;
            PacketBody::PeerPaused { ack: p.ack }
        }
        PacketKind::Heartbeat => {
            expect_empty(kind, payload)?;
            PacketBody::Heartbeat
        }
        PacketKind::PlayerReady => {
            expect_empty(kind, payload)?;
            PacketBody::PlayerReady
        }
        PacketKind::ReadyAck => {
            expect_empty(kind, payload)?;
            PacketBody::ReadyAck
        }
        PacketKind::GameCancelled => {
            expect_empty(kind, payload)?;
            PacketBody::GameCancelled
        }
        PacketKind::ActionLayerReady => {
            expect_empty(kind, payload)?;
            PacketBody::ActionLayerReady
        }
        PacketKind::ActionLayerReadyAck => {
            expect_empty(kind, payload)?;
            PacketBody::ActionLayerReadyAck
        }
        PacketKind::PeerResumed => {
            expect_empty(kind, payload)?;
            PacketBody::PeerResumed
        }
        PacketKind::ResumeAck => {
            expect_empty(kind, payload)?;
            PacketBody::ResumeAck
        }
        PacketKind::PeerQuit => {
            expect_empty(kind, payload)?;
            PacketBody::PeerQuit
        }
    };
    Ok(Packet::new(sequence, body))
}
