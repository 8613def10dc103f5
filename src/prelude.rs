//! Commonly used types and utilities for ease of import.

pub use crate::{
    AutoPilot, DirectionalChange, DirectionalUpdate, EntityPool, GameMode, GameState, Handle,
    IdlePilot, LocalInput, MatchOverReason, MatchPhase, PeerIdentifier, Pilot, PoolError,
    SimConfig, SimEvent, SimulationLoop, SyncConfig, SyncError, SyncEvent, SyncProtocol,
    SyncState, TargetSpawnInfo, TargetType, Vec2,
};

#[cfg(feature = "std")]
pub use crate::{init_logging, MatchNode, MatchSummary, NodeConfig, PeerSession};

#[cfg(feature = "std")]
pub use crate::transport::{
    in_memory::{InMemoryConnector, InMemoryTransport},
    tcp::{TcpAcceptor, TcpConnector, TcpTransport},
    Connector, Transport,
};
