#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod common;
pub mod config;
pub mod domain;
pub mod entity;
pub mod events;
mod game;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
pub mod node;
pub mod pilot;
pub mod pool;
pub mod prelude;
pub mod protocol;
#[cfg(feature = "std")]
pub mod session;
pub mod sim;
pub mod sync;
pub mod timer;
#[cfg(feature = "std")]
pub mod transport;

pub use common::*;
pub use config::{SimConfig, SyncConfig};
pub use domain::*;
pub use entity::{Body, Projectile, Ship, ShipRole, ShipStatus};
pub use events::{MatchOverReason, SimEvent, SimEventKind, SyncEvent, SyncEventKind};
pub use game::*;
#[cfg(feature = "std")]
pub use logging::init_logging;
#[cfg(feature = "std")]
pub use node::{MatchNode, MatchSummary, NodeConfig};
pub use pilot::{AutoPilot, IdlePilot, Pilot};
pub use pool::{EntityPool, Handle};
pub use protocol::{Packet, PacketBody, PacketKind};
#[cfg(feature = "std")]
pub use session::PeerSession;
pub use sim::{LocalInput, SimulationLoop};
pub use sync::{Milestone, SyncProtocol, SyncState};
#[cfg(feature = "std")]
pub use transport::tcp::TcpTransport;
