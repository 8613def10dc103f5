use crate::domain::{DirectionalUpdate, ProjectileInfo, TargetSpawnInfo};

#[cfg(feature = "std")]
pub mod codec;

/// Wire tag of every packet. The discriminant is the first byte on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    DieRoll = 0,
    DieRollAck = 1,
    RestartDieRoll = 2,
    Heartbeat = 3,
    NewGameLength = 4,
    PlayerReady = 5,
    ReadyAck = 6,
    GameCancelled = 7,
    ActionLayerReady = 8,
    ActionLayerReadyAck = 9,
    DirectionalUpdate = 10,
    TargetSpawned = 11,
    ProjectileFired = 12,
    PeerPaused = 13,
    PeerResumed = 14,
    ResumeAck = 15,
    PeerQuit = 16,
}

impl PacketKind {
    pub const ALL: [PacketKind; 17] = [
        PacketKind::DieRoll,
        PacketKind::DieRollAck,
        PacketKind::RestartDieRoll,
        PacketKind::Heartbeat,
        PacketKind::NewGameLength,
        PacketKind::PlayerReady,
        PacketKind::ReadyAck,
        PacketKind::GameCancelled,
        PacketKind::ActionLayerReady,
        PacketKind::ActionLayerReadyAck,
        PacketKind::DirectionalUpdate,
        PacketKind::TargetSpawned,
        PacketKind::ProjectileFired,
        PacketKind::PeerPaused,
        PacketKind::PeerResumed,
        PacketKind::ResumeAck,
        PacketKind::PeerQuit,
    ];

    pub fn from_u8(tag: u8) -> Option<PacketKind> {
        PacketKind::ALL.get(tag as usize).copied()
    }

    /// Gameplay notices that are sent without acknowledgement.
    pub fn is_relay(self) -> bool {
        matches!(
            self,
            PacketKind::DirectionalUpdate | PacketKind::TargetSpawned | PacketKind::ProjectileFired
        )
    }
}

/// Kind-specific packet contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketBody {
    DieRoll { round: u32, roll: u32 },
    DieRollAck { round: u32 },
    RestartDieRoll { round: u32 },
    Heartbeat,
    NewGameLength { seconds: u32 },
    PlayerReady,
    ReadyAck,
    GameCancelled,
    ActionLayerReady,
    ActionLayerReadyAck,
    DirectionalUpdate(DirectionalUpdate),
    TargetSpawned(TargetSpawnInfo),
    ProjectileFired(ProjectileInfo),
    /// `ack` is set on the reply confirming the receiver is paused too.
    PeerPaused { ack: bool },
    PeerResumed,
    ResumeAck,
    PeerQuit,
}

impl PacketBody {
    pub fn kind(&self) -> PacketKind {
        match self {
            PacketBody::DieRoll { .. } => PacketKind::DieRoll,
            PacketBody::DieRollAck { .. } => PacketKind::DieRollAck,
            PacketBody::RestartDieRoll { .. } => PacketKind::RestartDieRoll,
            PacketBody::Heartbeat => PacketKind::Heartbeat,
            PacketBody::NewGameLength { .. } => PacketKind::NewGameLength,
            PacketBody::PlayerReady => PacketKind::PlayerReady,
            PacketBody::ReadyAck => PacketKind::ReadyAck,
            PacketBody::GameCancelled => PacketKind::GameCancelled,
            PacketBody::ActionLayerReady => PacketKind::ActionLayerReady,
            PacketBody::ActionLayerReadyAck => PacketKind::ActionLayerReadyAck,
            PacketBody::DirectionalUpdate(_) => PacketKind::DirectionalUpdate,
            PacketBody::TargetSpawned(_) => PacketKind::TargetSpawned,
            PacketBody::ProjectileFired(_) => PacketKind::ProjectileFired,
            PacketBody::PeerPaused { .. } => PacketKind::PeerPaused,
            PacketBody::PeerResumed => PacketKind::PeerResumed,
            PacketBody::ResumeAck => PacketKind::ResumeAck,
            PacketBody::PeerQuit => PacketKind::PeerQuit,
        }
    }
}

/// A sequenced packet exchanged between the two peers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    pub sequence: u32,
    pub body: PacketBody,
}

impl Packet {
    pub fn new(sequence: u32, body: PacketBody) -> Self {
        Self { sequence, body }
    }

    pub fn kind(&self) -> PacketKind {
        self.body.kind()
    }
}
