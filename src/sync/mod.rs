//! Peer synchronization protocol.
//!
//! [`SyncProtocol`] is a pure state machine. It never touches a socket or a
//! clock: the driver feeds it packets and the current time, drains outgoing
//! packets with [`SyncProtocol::poll_transmit`] and reacts to the events it
//! raises.

mod election;
mod liveness;
mod readiness;

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::time::Duration;

use log::{debug, info, warn};

use crate::common::SyncError;
use crate::config::SyncConfig;
use crate::domain::{DirectionalUpdate, PeerIdentifier, ProjectileInfo, TargetSpawnInfo};
use crate::events::{EventBus, MatchOverReason, SubscriptionId, SyncEvent, SyncEventKind};
use crate::game::{GameState, MatchPhase};
use crate::protocol::{Packet, PacketBody};
use crate::timer::IntervalTimer;

pub use election::{DieSource, Election, Outcome, RandomDie, RoundCheck, ScriptedDie};
pub use liveness::{Liveness, LivenessPoll};
pub use readiness::{Milestone, Readiness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Idle,
    Connecting,
    ElectingLeader,
    AwaitingReadiness,
    Active,
    Paused,
    Terminated,
}

pub struct SyncProtocol {
    config: SyncConfig,
    state: SyncState,
    local_id: PeerIdentifier,
    die: Box<dyn DieSource>,
    election: Election,
    readiness: Readiness,
    liveness: Liveness,
    retry: IntervalTimer,
    retries: u32,
    next_sequence: u32,
    last_accepted: u32,
    pause_pending: bool,
    resume_pending: bool,
    /// Follower only: the leader's match length has arrived.
    length_received: bool,
    failure_reported: bool,
    now: Duration,
    outbox: VecDeque<Packet>,
    events: EventBus<SyncEvent>,
}

impl SyncProtocol {
    pub fn new(config: SyncConfig, die: Box<dyn DieSource>) -> Self {
        Self {
            config,
            state: SyncState::Idle,
            local_id: PeerIdentifier::Undecided,
            die,
            election: Election::new(),
            readiness: Readiness::new(),
            liveness: Liveness::new(&config),
            retry: IntervalTimer::new(config.handshake_retry_interval),
            retries: 0,
            next_sequence: 1,
            last_accepted: 0,
            pause_pending: false,
            resume_pending: false,
            length_received: false,
            failure_reported: false,
            now: Duration::ZERO,
            outbox: VecDeque::new(),
            events: EventBus::new(),
        }
    }

    /// Protocol with uniformly random die rolls.
    pub fn with_seed(config: SyncConfig, seed: u64) -> Self {
        Self::new(config, Box::new(RandomDie::new(seed)))
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn local_id(&self) -> PeerIdentifier {
        self.local_id
    }

    pub fn is_leader(&self) -> bool {
        self.local_id == PeerIdentifier::One
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Link went quiet and the reconnect window is open.
    pub fn needs_reconnect(&self) -> bool {
        self.liveness.is_interrupted()
    }

    pub fn last_accepted_sequence(&self) -> u32 {
        self.last_accepted
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SyncState::Terminated
    }

    pub fn poll_transmit(&mut self) -> Option<Packet> {
        self.outbox.pop_front()
    }

    pub fn has_pending_transmit(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn poll_event(&mut self) -> Option<SyncEvent> {
        self.events.poll()
    }

    pub fn subscribe<F>(&mut self, kinds: &[SyncEventKind], callback: F) -> SubscriptionId
    where
        F: FnMut(&SyncEvent) + Send + 'static,
    {
        self.events.subscribe(kinds, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn begin_connect(&mut self) -> Result<(), SyncError> {
        self.require(&[SyncState::Idle], "connect")?;
        self.set_state(SyncState::Connecting);
        Ok(())
    }

    pub fn connection_established(&mut self, now: Duration) -> Result<(), SyncError> {
        self.require(&[SyncState::Idle, SyncState::Connecting], "establish a connection")?;
        self.now = now;
        self.set_state(SyncState::ElectingLeader);
        Ok(())
    }

    /// The link could not be set up.
    pub fn connection_failed(&mut self, game: &mut GameState) {
        if self.state == SyncState::Terminated {
            return;
        }
        if !self.failure_reported {
            self.failure_reported = true;
            self.events.publish(SyncEvent::ConnectionFailed);
        }
        game.set_phase(MatchPhase::Over);
        self.terminate(MatchOverReason::ConnectionFailed);
    }

    /// Roll the die and tell the peer.
    pub fn start_election(&mut self, now: Duration, game: &mut GameState) -> Result<(), SyncError> {
        self.require(&[SyncState::ElectingLeader], "start the election")?;
        if self.election.started() {
            return Ok(());
        }
        self.now = now;
        game.set_phase(MatchPhase::DeterminingPeers);
        self.roll_and_send();
        self.try_decide(game);
        Ok(())
    }

    /// Leader only: choose the match length.
    pub fn send_game_length(&mut self, seconds: u32, game: &mut GameState) -> Result<u32, SyncError> {
        self.require(&[SyncState::AwaitingReadiness], "set the game length")?;
        if !self.is_leader() {
            return Err(SyncError::NotLeader);
        }
        let stored = game.set_game_length(seconds);
        self.send(PacketBody::NewGameLength { seconds: stored });
        Ok(stored)
    }

    /// Announce readiness for the current milestone.
    pub fn send_readiness(&mut self, now: Duration, game: &mut GameState) -> Result<Milestone, SyncError> {
        self.require(&[SyncState::AwaitingReadiness], "send readiness")?;
        let Some(milestone) = self.readiness.current() else {
            return Err(self.invalid("send readiness"));
        };
        self.now = now;
        self.readiness.mark_sent(milestone);
        self.send_ready_packet(milestone, game);
        self.arm_retry();
        Ok(milestone)
    }

    pub fn cancel_game(&mut self, game: &mut GameState) -> Result<(), SyncError> {
        self.require(&[SyncState::AwaitingReadiness], "cancel the game")?;
        self.send(PacketBody::GameCancelled);
        game.reset();
        self.terminate(MatchOverReason::Cancelled);
        Ok(())
    }

    pub fn send_directional_update(&mut self, update: DirectionalUpdate) -> Result<(), SyncError> {
        self.require(&[SyncState::Active], "relay a directional update")?;
        self.send(PacketBody::DirectionalUpdate(update));
        Ok(())
    }

    pub fn send_target_spawned(&mut self, info: TargetSpawnInfo) -> Result<(), SyncError> {
        self.require(&[SyncState::Active], "relay a spawned target")?;
        self.send(PacketBody::TargetSpawned(info));
        Ok(())
    }

    pub fn send_projectile_fired(&mut self, info: ProjectileInfo) -> Result<(), SyncError> {
        self.require(&[SyncState::Active], "relay a fired projectile")?;
        self.send(PacketBody::ProjectileFired(info));
        Ok(())
    }

    pub fn send_pause(&mut self, now: Duration, game: &mut GameState) -> Result<(), SyncError> {
        self.require(&[SyncState::Active], "pause")?;
        self.now = now;
        self.set_state(SyncState::Paused);
        game.pause();
        self.pause_pending = true;
        self.send(PacketBody::PeerPaused { ack: false });
        self.arm_retry();
        Ok(())
    }

    /// Ask the peer to resume. We stay paused until it acknowledges.
    pub fn send_resume(&mut self, now: Duration) -> Result<(), SyncError> {
        self.require(&[SyncState::Paused], "resume")?;
        self.now = now;
        self.resume_pending = true;
        self.send(PacketBody::PeerResumed);
        self.arm_retry();
        Ok(())
    }

    /// Leave the match. The notice is sent once and not acknowledged.
    pub fn send_quit(&mut self, game: &mut GameState) -> Result<(), SyncError> {
        if matches!(self.state, SyncState::Idle | SyncState::Terminated) {
            return Err(self.invalid("quit"));
        }
        self.send(PacketBody::PeerQuit);
        game.set_phase(MatchPhase::Over);
        self.terminate(MatchOverReason::LocalQuit);
        Ok(())
    }

    /// The match clock ran out; stop without telling the peer.
    pub fn finish(&mut self, game: &mut GameState) {
        if self.state == SyncState::Terminated {
            return;
        }
        game.set_phase(MatchPhase::Over);
        self.stop_timers();
        self.set_state(SyncState::Terminated);
    }

    /// The transport dropped but a reconnect may follow.
    pub fn peer_disconnected(&mut self, now: Duration, game: &mut GameState) {
        match self.state {
            SyncState::Active | SyncState::Paused => {
                self.now = now;
                self.events.publish(SyncEvent::PeerDisconnected);
                if self.liveness.interrupt(now) {
                    self.events.publish(SyncEvent::ConnectionInterrupted);
                }
            }
            SyncState::Idle | SyncState::Terminated => {}
            _ => self.transport_failed(game),
        }
    }

    /// Unrecoverable transport fault.
    pub fn transport_failed(&mut self, game: &mut GameState) {
        if self.state == SyncState::Terminated || self.failure_reported {
            return;
        }
        self.failure_reported = true;
        warn!("transport failed in {:?}", self.state);
        self.events.publish(SyncEvent::PeerDisconnected);
        game.set_phase(MatchPhase::Over);
        self.terminate(MatchOverReason::SessionLost);
    }

    /// Assign the local role. A role is fixed for the rest of the match.
    pub fn assign_identity(&mut self, id: PeerIdentifier) -> Result<(), SyncError> {
        if self.local_id != PeerIdentifier::Undecided {
            return Err(SyncError::AlreadyAssigned);
        }
        self.local_id = id;
        Ok(())
    }

    /// Run timers up to `now`.
    pub fn poll(&mut self, now: Duration, game: &mut GameState) {
        if matches!(self.state, SyncState::Idle | SyncState::Terminated) {
            return;
        }
        self.now = now;

        if self.retry.poll(now) > 0 {
            if self.has_unacked() {
                self.retries += 1;
                if self.retries > self.config.max_handshake_retries {
                    warn!("no acknowledgement after {} retries", self.config.max_handshake_retries);
                    self.session_lost(game);
                    return;
                }
                self.retransmit(game);
            } else {
                self.retry.cancel();
                self.retries = 0;
            }
        }

        if matches!(self.state, SyncState::Active | SyncState::Paused) {
            let signal = self.liveness.poll(now);
            if signal.send_heartbeat {
                self.send(PacketBody::Heartbeat);
            }
            if signal.interrupted {
                info!("peer silent, waiting for it to come back");
                self.events.publish(SyncEvent::ConnectionInterrupted);
            }
            if signal.lost {
                self.session_lost(game);
            }
        }
    }

    /// Decode and handle one datagram. Malformed input is dropped.
    #[cfg(feature = "std")]
    pub fn handle_datagram(&mut self, bytes: &[u8], now: Duration, game: &mut GameState) {
        match crate::protocol::codec::decode(bytes) {
            Ok(packet) => self.handle_packet(packet, now, game),
            Err(e) => debug!("dropping datagram: {}", e),
        }
    }

    pub fn handle_packet(&mut self, packet: Packet, now: Duration, game: &mut GameState) {
        if matches!(self.state, SyncState::Idle | SyncState::Terminated) {
            debug!("ignoring {:?} while {:?}", packet.kind(), self.state);
            return;
        }
        if packet.sequence <= self.last_accepted {
            debug!(
                "dropping {:?} seq {} (last accepted {})",
                packet.kind(),
                packet.sequence,
                self.last_accepted
            );
            return;
        }
        self.last_accepted = packet.sequence;
        self.now = now;
        if self.liveness.touch(now) {
            info!("peer traffic resumed");
            self.events.publish(SyncEvent::ConnectionRestored);
        }

        match packet.body {
            PacketBody::DieRoll { round, roll } => self.on_die_roll(round, roll, game),
            PacketBody::DieRollAck { round } => self.on_die_roll_ack(round, game),
            PacketBody::RestartDieRoll { round } => self.on_restart(round, game),
            PacketBody::Heartbeat => {}
            PacketBody::NewGameLength { seconds } => self.on_game_length(seconds, game),
            PacketBody::PlayerReady => self.on_ready(Milestone::PlayerReady),
            PacketBody::ActionLayerReady => self.on_ready(Milestone::ActionLayer),
            PacketBody::ReadyAck => self.on_ready_ack(Milestone::PlayerReady),
            PacketBody::ActionLayerReadyAck => self.on_ready_ack(Milestone::ActionLayer),
            PacketBody::GameCancelled => self.on_cancelled(game),
            PacketBody::DirectionalUpdate(update) => {
                self.on_relay(SyncEvent::RemoteDirectionalUpdate(update))
            }
            PacketBody::TargetSpawned(info) => self.on_relay(SyncEvent::RemoteTargetSpawned(info)),
            PacketBody::ProjectileFired(info) => {
                self.on_relay(SyncEvent::RemoteProjectileFired(info))
            }
            PacketBody::PeerPaused { ack } => self.on_paused(ack, game),
            PacketBody::PeerResumed => self.on_resumed(game),
            PacketBody::ResumeAck => self.on_resume_ack(game),
            PacketBody::PeerQuit => self.on_quit(game),
        }
    }

    /// Back to Idle with every timer and queue cleared, and `game` reset for
    /// the next match.
    pub fn teardown(&mut self, game: &mut GameState) {
        self.stop_timers();
        self.outbox.clear();
        self.events.clear();
        self.election.reset();
        self.readiness.reset();
        self.local_id = PeerIdentifier::Undecided;
        self.next_sequence = 1;
        self.last_accepted = 0;
        self.pause_pending = false;
        self.resume_pending = false;
        self.length_received = false;
        self.failure_reported = false;
        game.reset();
        game.reset_game_length();
        self.set_state(SyncState::Idle);
    }

    fn on_die_roll(&mut self, round: u32, roll: u32, game: &mut GameState) {
        if self.state == SyncState::Connecting {
            self.set_state(SyncState::ElectingLeader);
        }
        match self.election.check_round(round) {
            RoundCheck::Stale => {
                debug!("stale die roll from round {}", round);
                return;
            }
            RoundCheck::Newer if self.state == SyncState::ElectingLeader => {
                self.enter_round(round);
            }
            RoundCheck::Newer => {
                warn!("die roll for round {} after the election", round);
                return;
            }
            RoundCheck::Current => {}
        }
        // Re-acknowledge even after deciding; our earlier ack may be lost.
        self.send(PacketBody::DieRollAck { round });
        if self.state == SyncState::ElectingLeader {
            self.election.record_peer(roll);
            self.try_decide(game);
        }
    }

    fn on_die_roll_ack(&mut self, round: u32, game: &mut GameState) {
        if self.state != SyncState::ElectingLeader {
            return;
        }
        if self.election.record_ack(round) {
            self.retries = 0;
            self.try_decide(game);
        }
    }

    fn on_restart(&mut self, round: u32, game: &mut GameState) {
        if self.state != SyncState::ElectingLeader {
            warn!("restart request outside the election");
            return;
        }
        let next = round.wrapping_add(1);
        if next > self.election.round() {
            self.enter_round(next);
            self.try_decide(game);
        }
    }

    fn on_game_length(&mut self, seconds: u32, game: &mut GameState) {
        if self.state != SyncState::AwaitingReadiness || self.is_leader() {
            warn!("unexpected game length while {:?}", self.state);
            return;
        }
        let stored = game.set_game_length(seconds);
        self.length_received = true;
        self.events.publish(SyncEvent::GameLengthReceived(stored));
    }

    fn on_ready(&mut self, milestone: Milestone) {
        match self.state {
            SyncState::AwaitingReadiness => {
                if milestone == Milestone::PlayerReady && !self.is_leader() && !self.length_received {
                    // Unacked, so the leader resends the length with it.
                    debug!("holding PlayerReady until the match length arrives");
                    return;
                }
                self.send(milestone.ack_packet());
                self.readiness.record_remote(milestone);
                self.check_readiness();
            }
            SyncState::Active | SyncState::Paused => {
                // Peer missed our ack.
                self.send(milestone.ack_packet());
            }
            _ => warn!("unexpected {:?} ready while {:?}", milestone, self.state),
        }
    }

    fn on_ready_ack(&mut self, milestone: Milestone) {
        if self.state != SyncState::AwaitingReadiness {
            return;
        }
        if self.readiness.record_ack(milestone) {
            self.retries = 0;
            self.check_readiness();
        }
    }

    fn on_cancelled(&mut self, game: &mut GameState) {
        if self.state != SyncState::AwaitingReadiness {
            warn!("cancel notice while {:?}", self.state);
            return;
        }
        info!("peer cancelled the game");
        self.events.publish(SyncEvent::PeerCancelledGame);
        game.reset();
        self.terminate(MatchOverReason::Cancelled);
    }

    fn on_relay(&mut self, event: SyncEvent) {
        if matches!(self.state, SyncState::Active | SyncState::Paused) {
            self.events.publish(event);
        } else {
            warn!("relay packet while {:?}", self.state);
        }
    }

    fn on_paused(&mut self, ack: bool, game: &mut GameState) {
        if ack {
            if self.pause_pending {
                self.pause_pending = false;
                self.retries = 0;
            }
            return;
        }
        match self.state {
            SyncState::Active => {
                self.set_state(SyncState::Paused);
                game.pause();
                self.events.publish(SyncEvent::PeerPaused);
            }
            SyncState::Paused => {
                // Both sides paused at once.
                self.pause_pending = false;
            }
            _ => {
                warn!("pause request while {:?}", self.state);
                return;
            }
        }
        self.send(PacketBody::PeerPaused { ack: true });
    }

    fn on_resumed(&mut self, game: &mut GameState) {
        match self.state {
            SyncState::Paused => {
                self.resume_pending = false;
                self.pause_pending = false;
                self.set_state(SyncState::Active);
                game.resume();
                self.events.publish(SyncEvent::PeerResumed);
            }
            // Duplicate: our ack was lost.
            SyncState::Active => {}
            _ => {
                warn!("resume request while {:?}", self.state);
                return;
            }
        }
        self.send(PacketBody::ResumeAck);
    }

    fn on_resume_ack(&mut self, game: &mut GameState) {
        if self.state != SyncState::Paused || !self.resume_pending {
            return;
        }
        self.resume_pending = false;
        self.pause_pending = false;
        self.retries = 0;
        self.set_state(SyncState::Active);
        game.resume();
        self.events.publish(SyncEvent::ResumeAcknowledged);
    }

    fn on_quit(&mut self, game: &mut GameState) {
        info!("peer quit");
        self.events.publish(SyncEvent::PeerQuit);
        game.set_phase(MatchPhase::Over);
        self.terminate(MatchOverReason::PeerQuit);
    }

    fn roll_and_send(&mut self) {
        let roll = self.die.roll();
        self.election.set_local(roll);
        debug!("rolled {} in round {}", roll, self.election.round());
        self.send(PacketBody::DieRoll {
            round: self.election.round(),
            roll,
        });
        self.arm_retry();
    }

    /// Abandon the current round for `round`, rolling again if we had rolled.
    fn enter_round(&mut self, round: u32) {
        let rolled = self.election.started();
        self.election.advance(round);
        self.events.publish(SyncEvent::RestartingDieRoll { round });
        if rolled {
            self.roll_and_send();
        }
    }

    fn try_decide(&mut self, game: &mut GameState) {
        match self.election.evaluate() {
            Outcome::Pending => {}
            Outcome::Tie => {
                let round = self.election.round();
                info!("die roll tie in round {}, rolling again", round);
                self.send(PacketBody::RestartDieRoll { round });
                self.enter_round(round.wrapping_add(1));
            }
            Outcome::Decided(id) => {
                if let Err(e) = self.assign_identity(id) {
                    warn!("{}", e);
                    return;
                }
                info!("election decided: we are {:?}", id);
                self.set_state(SyncState::AwaitingReadiness);
                game.set_phase(MatchPhase::SettingOptions);
                self.events.publish(SyncEvent::DieRollFinished(id));
            }
        }
    }

    fn check_readiness(&mut self) {
        while let Some(milestone) = self.readiness.take_completed() {
            info!("readiness reached: {:?}", milestone);
            self.events.publish(SyncEvent::ReadinessReached(milestone));
            if milestone == Milestone::ActionLayer {
                self.set_state(SyncState::Active);
                self.liveness.start(self.now);
                break;
            }
        }
    }

    fn send_ready_packet(&mut self, milestone: Milestone, game: &GameState) {
        // The length goes out ahead of every PlayerReady, and the follower
        // only acks once it has one.
        if milestone == Milestone::PlayerReady && self.is_leader() {
            self.send(PacketBody::NewGameLength {
                seconds: game.game_length(),
            });
        }
        self.send(milestone.ready_packet());
    }

    fn has_unacked(&self) -> bool {
        (self.state == SyncState::ElectingLeader && self.election.awaiting_ack())
            || (self.state == SyncState::AwaitingReadiness && self.readiness.unacked().is_some())
            || self.pause_pending
            || self.resume_pending
    }

    fn retransmit(&mut self, game: &mut GameState) {
        if self.state == SyncState::ElectingLeader && self.election.awaiting_ack() {
            if let Some(roll) = self.election.local_roll() {
                self.send(PacketBody::DieRoll {
                    round: self.election.round(),
                    roll,
                });
            }
        }
        if self.state == SyncState::AwaitingReadiness {
            if let Some(milestone) = self.readiness.unacked() {
                self.send_ready_packet(milestone, game);
            }
        }
        if self.pause_pending {
            self.send(PacketBody::PeerPaused { ack: false });
        }
        if self.resume_pending {
            self.send(PacketBody::PeerResumed);
        }
    }

    fn arm_retry(&mut self) {
        if !self.retry.is_armed() {
            self.retries = 0;
            self.retry.start(self.now);
        }
    }

    fn session_lost(&mut self, game: &mut GameState) {
        if self.state == SyncState::Terminated {
            return;
        }
        warn!("session lost");
        self.events.publish(SyncEvent::SessionLost);
        game.set_phase(MatchPhase::Over);
        self.terminate(MatchOverReason::SessionLost);
    }

    fn terminate(&mut self, reason: MatchOverReason) {
        self.stop_timers();
        self.set_state(SyncState::Terminated);
        self.events.publish(SyncEvent::MatchOver(reason));
    }

    fn stop_timers(&mut self) {
        self.retry.cancel();
        self.retries = 0;
        self.liveness.stop();
    }

    fn send(&mut self, body: PacketBody) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.outbox.push_back(Packet::new(sequence, body));
    }

    fn set_state(&mut self, state: SyncState) {
        if self.state != state {
            debug!("sync {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn require(&self, allowed: &[SyncState], operation: &'static str) -> Result<(), SyncError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> SyncError {
        SyncError::InvalidState {
            operation,
            state: self.state,
        }
    }
}
