//! Die-roll leader election.

use alloc::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::DIE_ROLL_RANGE;
use crate::domain::PeerIdentifier;

/// Source of election rolls.
pub trait DieSource: Send {
    fn roll(&mut self) -> u32;
}

/// Uniform rolls in `0..DIE_ROLL_RANGE`.
pub struct RandomDie {
    rng: SmallRng,
}

impl RandomDie {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl DieSource for RandomDie {
    fn roll(&mut self) -> u32 {
        self.rng.random_range(0..DIE_ROLL_RANGE)
    }
}

/// Replays fixed rolls, then falls back to random ones.
pub struct ScriptedDie {
    rolls: VecDeque<u32>,
    fallback: RandomDie,
}

impl ScriptedDie {
    pub fn new<I: IntoIterator<Item = u32>>(rolls: I) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: RandomDie::new(0),
        }
    }
}

impl DieSource for ScriptedDie {
    fn roll(&mut self) -> u32 {
        self.rolls.pop_front().unwrap_or_else(|| self.fallback.roll())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundCheck {
    /// From an abandoned round.
    Stale,
    Current,
    /// Peer is ahead; catch up before recording.
    Newer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Tie,
    Decided(PeerIdentifier),
}

/// Rolls and acknowledgement of the current round.
#[derive(Debug, Clone, Default)]
pub struct Election {
    round: u32,
    started: bool,
    local: Option<u32>,
    peer: Option<u32>,
    acknowledged: bool,
}

impl Election {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn local_roll(&self) -> Option<u32> {
        self.local
    }

    pub fn peer_roll(&self) -> Option<u32> {
        self.peer
    }

    /// Our roll is out and not yet acknowledged.
    pub fn awaiting_ack(&self) -> bool {
        self.local.is_some() && !self.acknowledged
    }

    pub fn set_local(&mut self, roll: u32) {
        self.started = true;
        self.local = Some(roll);
        self.acknowledged = false;
    }

    pub fn check_round(&self, round: u32) -> RoundCheck {
        match round.cmp(&self.round) {
            core::cmp::Ordering::Less => RoundCheck::Stale,
            core::cmp::Ordering::Equal => RoundCheck::Current,
            core::cmp::Ordering::Greater => RoundCheck::Newer,
        }
    }

    pub fn record_peer(&mut self, roll: u32) {
        self.peer = Some(roll);
    }

    /// Returns true when the ack matched our outstanding roll.
    pub fn record_ack(&mut self, round: u32) -> bool {
        if round == self.round && self.local.is_some() && !self.acknowledged {
            self.acknowledged = true;
            true
        } else {
            false
        }
    }

    /// Move to `round`, forgetting both rolls.
    pub fn advance(&mut self, round: u32) {
        self.round = round;
        self.local = None;
        self.peer = None;
        self.acknowledged = false;
    }

    /// A tie is visible as soon as both rolls are known. A decision also
    /// needs the peer to have acknowledged our roll.
    pub fn evaluate(&self) -> Outcome {
        match (self.local, self.peer) {
            (Some(local), Some(peer)) if local == peer => Outcome::Tie,
            (Some(local), Some(peer)) if self.acknowledged => {
                if local > peer {
                    Outcome::Decided(PeerIdentifier::One)
                } else {
                    Outcome::Decided(PeerIdentifier::Two)
                }
            }
            _ => Outcome::Pending,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
