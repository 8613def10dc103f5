//! Error types shared by the pool and the sync protocol.

use crate::sync::SyncState;

/// Errors returned by EntityPool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Handle index is outside the pool.
    InvalidHandle,
    /// Slot was released and handed out again since this handle was issued.
    StaleHandle,
    /// Slot is already free.
    NotInUse,
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PoolError::InvalidHandle => write!(f, "Handle does not belong to this pool"),
            PoolError::StaleHandle => write!(f, "Handle refers to a reused slot"),
            PoolError::NotInUse => write!(f, "Slot is not in use"),
        }
    }
}

/// Errors returned when a caller operation does not fit the protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// Operation is not allowed in the current state.
    InvalidState {
        operation: &'static str,
        state: SyncState,
    },
    /// Only the elected leader may do this.
    NotLeader,
    /// Peer identity was already assigned for this match.
    AlreadyAssigned,
}

impl core::fmt::Display for SyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SyncError::InvalidState { operation, state } => {
                write!(f, "Cannot {} while {:?}", operation, state)
            }
            SyncError::NotLeader => write!(f, "Only player one may change match options"),
            SyncError::AlreadyAssigned => write!(f, "Peer identity is already assigned"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {}

#[cfg(feature = "std")]
impl std::error::Error for SyncError {}
