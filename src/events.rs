//! Typed notifications raised by the sync protocol and the simulation.
//!
//! An [`EventBus`] keeps a bounded queue that the owner drains with `poll`,
//! and also hands each event to subscribers registered for its kind.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use log::warn;

use crate::domain::{
    DirectionalUpdate, PeerIdentifier, ProjectileInfo, TargetSpawnInfo, TargetType,
};
use crate::sync::Milestone;

/// Events that can be filtered by a plain kind tag.
pub trait Event: Clone {
    type Kind: Copy + PartialEq;

    fn kind(&self) -> Self::Kind;
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOverReason {
    TimeExpired,
    LocalQuit,
    PeerQuit,
    Cancelled,
    SessionLost,
    ConnectionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncEvent {
    ConnectionFailed,
    PeerDisconnected,
    ConnectionInterrupted,
    ConnectionRestored,
    SessionLost,
    RestartingDieRoll { round: u32 },
    DieRollFinished(PeerIdentifier),
    GameLengthReceived(u32),
    PeerCancelledGame,
    ReadinessReached(Milestone),
    PeerPaused,
    PeerResumed,
    ResumeAcknowledged,
    PeerQuit,
    RemoteDirectionalUpdate(DirectionalUpdate),
    RemoteTargetSpawned(TargetSpawnInfo),
    RemoteProjectileFired(ProjectileInfo),
    MatchOver(MatchOverReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEventKind {
    ConnectionFailed,
    PeerDisconnected,
    ConnectionInterrupted,
    ConnectionRestored,
    SessionLost,
    RestartingDieRoll,
    DieRollFinished,
    GameLengthReceived,
    PeerCancelledGame,
    ReadinessReached,
    PeerPaused,
    PeerResumed,
    ResumeAcknowledged,
    PeerQuit,
    RemoteDirectionalUpdate,
    RemoteTargetSpawned,
    RemoteProjectileFired,
    MatchOver,
}

impl Event for SyncEvent {
    type Kind = SyncEventKind;

    fn kind(&self) -> SyncEventKind {
        match self {
            SyncEvent::ConnectionFailed => SyncEventKind::ConnectionFailed,
            SyncEvent::PeerDisconnected => SyncEventKind::PeerDisconnected,
            SyncEvent::ConnectionInterrupted => SyncEventKind::ConnectionInterrupted,
            SyncEvent::ConnectionRestored => SyncEventKind::ConnectionRestored,
            SyncEvent::SessionLost => SyncEventKind::SessionLost,
            SyncEvent::RestartingDieRoll { .. } => SyncEventKind::RestartingDieRoll,
            SyncEvent::DieRollFinished(_) => SyncEventKind::DieRollFinished,
            SyncEvent::GameLengthReceived(_) => SyncEventKind::GameLengthReceived,
            SyncEvent::PeerCancelledGame => SyncEventKind::PeerCancelledGame,
            SyncEvent::ReadinessReached(_) => SyncEventKind::ReadinessReached,
            SyncEvent::PeerPaused => SyncEventKind::PeerPaused,
            SyncEvent::PeerResumed => SyncEventKind::PeerResumed,
            SyncEvent::ResumeAcknowledged => SyncEventKind::ResumeAcknowledged,
            SyncEvent::PeerQuit => SyncEventKind::PeerQuit,
            SyncEvent::RemoteDirectionalUpdate(_) => SyncEventKind::RemoteDirectionalUpdate,
            SyncEvent::RemoteTargetSpawned(_) => SyncEventKind::RemoteTargetSpawned,
            SyncEvent::RemoteProjectileFired(_) => SyncEventKind::RemoteProjectileFired,
            SyncEvent::MatchOver(_) => SyncEventKind::MatchOver,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Countdown(u32),
    CountdownFinished,
    TimeRemaining(u32),
    /// Local ship snapshot taken at the end of a running tick.
    LocalDirectionalUpdate(DirectionalUpdate),
    RemoteUpdateApplied(DirectionalUpdate),
    /// `relay` is set when the peer has not seen this spawn yet.
    TargetSpawned { info: TargetSpawnInfo, relay: bool },
    ProjectileFired {
        info: ProjectileInfo,
        owner: PeerIdentifier,
        relay: bool,
    },
    TargetDestroyed {
        target_type: TargetType,
        by: PeerIdentifier,
        points: u32,
    },
    ShipDisabled(PeerIdentifier),
    ShipRestored(PeerIdentifier),
    ScoreChanged { player: PeerIdentifier, score: u32 },
    MatchOver(MatchOverReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimEventKind {
    Countdown,
    CountdownFinished,
    TimeRemaining,
    LocalDirectionalUpdate,
    RemoteUpdateApplied,
    TargetSpawned,
    ProjectileFired,
    TargetDestroyed,
    ShipDisabled,
    ShipRestored,
    ScoreChanged,
    MatchOver,
}

impl Event for SimEvent {
    type Kind = SimEventKind;

    fn kind(&self) -> SimEventKind {
        match self {
            SimEvent::Countdown(_) => SimEventKind::Countdown,
            SimEvent::CountdownFinished => SimEventKind::CountdownFinished,
            SimEvent::TimeRemaining(_) => SimEventKind::TimeRemaining,
            SimEvent::LocalDirectionalUpdate(_) => SimEventKind::LocalDirectionalUpdate,
            SimEvent::RemoteUpdateApplied(_) => SimEventKind::RemoteUpdateApplied,
            SimEvent::TargetSpawned { .. } => SimEventKind::TargetSpawned,
            SimEvent::ProjectileFired { .. } => SimEventKind::ProjectileFired,
            SimEvent::TargetDestroyed { .. } => SimEventKind::TargetDestroyed,
            SimEvent::ShipDisabled(_) => SimEventKind::ShipDisabled,
            SimEvent::ShipRestored(_) => SimEventKind::ShipRestored,
            SimEvent::ScoreChanged { .. } => SimEventKind::ScoreChanged,
            SimEvent::MatchOver(_) => SimEventKind::MatchOver,
        }
    }
}

/// Default queue bound before the oldest undrained events are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Token returned by `subscribe`, used to remove the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

struct Subscription<E: Event> {
    id: SubscriptionId,
    /// Empty means every kind.
    kinds: Vec<E::Kind>,
    callback: Callback<E>,
}

pub struct EventBus<E: Event> {
    queue: VecDeque<E>,
    capacity: usize,
    subscribers: Vec<Subscription<E>>,
    next_id: u32,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)),
            capacity: capacity.max(1),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Call `callback` for every published event whose kind is in `kinds`.
    pub fn subscribe<F>(&mut self, kinds: &[E::Kind], callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.subscribers.push(Subscription {
            id,
            kinds: kinds.to_vec(),
            callback: Box::new(callback),
        });
        id
    }

    pub fn subscribe_all<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.subscribe(&[], callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, event: E) {
        let kind = event.kind();
        for sub in self.subscribers.iter_mut() {
            if sub.kinds.is_empty() || sub.kinds.contains(&kind) {
                (sub.callback)(&event);
            }
        }
        if self.queue.len() >= self.capacity {
            warn!("event queue full, dropping oldest event");
            self.queue.pop_front();
        }
        self.queue.push_back(event);
    }

    pub fn poll(&mut self) -> Option<E> {
        self.queue.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop queued events. Subscriptions stay registered.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
