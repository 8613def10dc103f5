#![cfg(feature = "std")]

//! Async driver for one networked match.
//!
//! A single task owns the session, the protocol, the simulation and the game
//! state. It waits on the next datagram, the simulation tick, the protocol
//! timer and any redial in flight, and handles whichever comes first to
//! completion before waiting again, so none of the state needs a lock.

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

use crate::config::{SimConfig, SyncConfig};
use crate::domain::PeerIdentifier;
use crate::events::{MatchOverReason, SimEvent, SyncEvent};
use crate::game::{GameMode, GameState};
use crate::pilot::Pilot;
use crate::session::{PeerSession, Redial};
use crate::sim::SimulationLoop;
use crate::sync::{DieSource, Milestone, SyncProtocol, SyncState};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeConfig {
    pub sync: SyncConfig,
    pub sim: SimConfig,
    /// Length the leader proposes; `None` keeps the default.
    pub game_length: Option<u32>,
    pub seed: u64,
    /// How often protocol timers are checked.
    pub protocol_poll: Duration,
    /// Upper bound on a single reconnect attempt.
    pub reconnect_attempt: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            sim: SimConfig::default(),
            game_length: None,
            seed: 0,
            protocol_poll: Duration::from_millis(50),
            reconnect_attempt: Duration::from_secs(1),
        }
    }
}

/// Result of a finished match as seen by this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub player_id: PeerIdentifier,
    pub scores: [u32; 2],
    pub reason: MatchOverReason,
    pub ticks: u64,
}

impl MatchSummary {
    pub fn local_score(&self) -> u32 {
        self.player_id.index().map_or(0, |i| self.scores[i])
    }
}

pub struct MatchNode {
    config: NodeConfig,
    session: PeerSession,
    pilot: Box<dyn Pilot>,
    sync: SyncProtocol,
    game: GameState,
    sim: Option<SimulationLoop>,
    redial: Option<Redial>,
    rng: SmallRng,
    origin: Instant,
    outcome: Option<MatchOverReason>,
}

impl MatchNode {
    pub fn new(config: NodeConfig, session: PeerSession, pilot: Box<dyn Pilot>) -> Self {
        let sync = SyncProtocol::with_seed(config.sync, config.seed);
        Self::with_protocol(config, session, pilot, sync)
    }

    /// Node whose election rolls come from `die`.
    pub fn with_die(
        config: NodeConfig,
        session: PeerSession,
        pilot: Box<dyn Pilot>,
        die: Box<dyn DieSource>,
    ) -> Self {
        let sync = SyncProtocol::new(config.sync, die);
        Self::with_protocol(config, session, pilot, sync)
    }

    fn with_protocol(
        config: NodeConfig,
        session: PeerSession,
        pilot: Box<dyn Pilot>,
        sync: SyncProtocol,
    ) -> Self {
        Self {
            config,
            session,
            pilot,
            sync,
            game: GameState::new(GameMode::Multi),
            sim: None,
            redial: None,
            rng: SmallRng::seed_from_u64(config.seed.wrapping_add(1)),
            origin: Instant::now(),
            outcome: None,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn sync(&self) -> &SyncProtocol {
        &self.sync
    }

    pub fn sim(&self) -> Option<&SimulationLoop> {
        self.sim.as_ref()
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Clear the previous match: protocol back to Idle, world released and
    /// game state reset. `run` does this itself when needed.
    pub fn teardown(&mut self) {
        self.redial = None;
        if let Some(sim) = self.sim.as_mut() {
            sim.teardown();
        }
        self.sim = None;
        self.sync.teardown(&mut self.game);
        self.outcome = None;
    }

    /// Play one match to the end.
    pub async fn run(&mut self) -> anyhow::Result<MatchSummary> {
        if self.sync.state() != SyncState::Idle {
            self.teardown();
        }
        self.origin = Instant::now();
        self.outcome = None;
        self.sync.begin_connect()?;

        if !self.session.is_connected() {
            if let Err(e) = self.session.connect().await {
                warn!("could not reach peer: {}", e);
                self.sync.connection_failed(&mut self.game);
                self.pump().await;
                return Ok(self.summary(MatchOverReason::ConnectionFailed));
            }
        }

        let now = self.now();
        self.sync.connection_established(now)?;
        self.sync.start_election(now, &mut self.game)?;
        self.pump().await;

        let mut tick = interval(self.config.sim.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut timers = interval(self.config.protocol_poll);
        timers.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.outcome.is_none() {
            tokio::select! {
                received = self.session.recv(), if self.session.is_connected() => {
                    match received {
                        Ok(bytes) => {
                            let now = self.now();
                            self.sync.handle_datagram(&bytes, now, &mut self.game);
                        }
                        Err(_) => self.link_failed(),
                    }
                }
                redialed = next_redial(&mut self.redial), if self.redial.is_some() => {
                    self.redial = None;
                    match redialed {
                        Ok(transport) => {
                            info!("link re-established");
                            self.session.install(transport);
                        }
                        Err(e) => debug!("reconnect failed: {}", e),
                    }
                }
                _ = tick.tick() => self.on_tick(),
                _ = timers.tick() => {
                    let now = self.now();
                    self.sync.poll(now, &mut self.game);
                    self.start_redial();
                }
            }
            self.pump().await;
        }

        self.redial = None;
        let reason = self.outcome.unwrap_or(MatchOverReason::SessionLost);
        if let Err(e) = self.session.disconnect().await {
            debug!("disconnect: {}", e);
        }
        let summary = self.summary(reason);
        info!(
            "match finished as {:?}: {:?}, scores {:?}",
            summary.player_id, summary.reason, summary.scores
        );
        Ok(summary)
    }

    fn summary(&self, reason: MatchOverReason) -> MatchSummary {
        MatchSummary {
            player_id: self.sync.local_id(),
            scores: self.game.scores(),
            reason,
            ticks: self.sim.as_ref().map_or(0, |s| s.ticks()),
        }
    }

    fn on_tick(&mut self) {
        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        if let Some(input) = self.pilot.next_input(&mut self.rng, sim) {
            sim.inject_local_input(input);
        }
        sim.tick(self.config.sim.tick_interval, &mut self.game);
    }

    fn link_failed(&mut self) {
        let now = self.now();
        if self.session.can_reconnect() {
            self.sync.peer_disconnected(now, &mut self.game);
        } else {
            self.sync.transport_failed(&mut self.game);
        }
    }

    /// Start dialing in the background if the link is down. At most one
    /// attempt runs at a time.
    fn start_redial(&mut self) {
        if self.redial.is_some() || self.session.is_connected() || self.sync.is_terminated() {
            return;
        }
        self.redial = self.session.redial(self.config.reconnect_attempt);
    }

    /// Route events and send queued packets until both are drained.
    async fn pump(&mut self) {
        loop {
            self.route_events();
            if !self.sync.has_pending_transmit() {
                break;
            }
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        while let Some(packet) = self.sync.poll_transmit() {
            if !self.session.is_connected() {
                debug!("link down, dropping {:?}", packet.kind());
                continue;
            }
            if let Err(e) = self.session.send_packet(&packet).await {
                warn!("send failed: {}", e);
                self.link_failed();
            }
        }
    }

    fn route_events(&mut self) {
        loop {
            let mut progressed = false;
            while let Some(event) = self.sync.poll_event() {
                progressed = true;
                self.on_sync_event(event);
            }
            let sim_events: Vec<SimEvent> = match self.sim.as_mut() {
                Some(sim) => core::iter::from_fn(|| sim.poll_event()).collect(),
                None => Vec::new(),
            };
            for event in sim_events {
                progressed = true;
                self.on_sim_event(event);
            }
            if !progressed {
                break;
            }
        }
    }

    fn on_sync_event(&mut self, event: SyncEvent) {
        let now = self.now();
        match event {
            SyncEvent::DieRollFinished(id) => {
                self.sim = Some(SimulationLoop::new(
                    self.config.sim,
                    GameMode::Multi,
                    id,
                    self.config.seed ^ 0x5eed,
                ));
                if self.sync.is_leader() {
                    if let Some(length) = self.config.game_length {
                        if let Err(e) = self.sync.send_game_length(length, &mut self.game) {
                            warn!("{}", e);
                        }
                    }
                }
                if let Err(e) = self.sync.send_readiness(now, &mut self.game) {
                    warn!("{}", e);
                }
            }
            SyncEvent::ReadinessReached(Milestone::PlayerReady) => {
                if let Err(e) = self.sync.send_readiness(now, &mut self.game) {
                    warn!("{}", e);
                }
            }
            SyncEvent::ReadinessReached(Milestone::ActionLayer) => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.start_match(&mut self.game);
                }
            }
            SyncEvent::GameLengthReceived(seconds) => info!("match length set to {} s", seconds),
            SyncEvent::RemoteDirectionalUpdate(update) => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.apply_remote_update(update);
                }
            }
            SyncEvent::RemoteTargetSpawned(info) => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.spawn_remote_target(info);
                }
            }
            SyncEvent::RemoteProjectileFired(info) => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.fire_remote_projectile(info);
                }
            }
            SyncEvent::MatchOver(reason) => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.end_match(reason, &mut self.game);
                }
                self.outcome.get_or_insert(reason);
            }
            other => debug!("sync event {:?}", other),
        }
    }

    fn on_sim_event(&mut self, event: SimEvent) {
        self.pilot.handle_event(&event);
        let relayed = match event {
            SimEvent::LocalDirectionalUpdate(update) => self.sync.send_directional_update(update),
            SimEvent::TargetSpawned { info, relay: true } => self.sync.send_target_spawned(info),
            SimEvent::ProjectileFired {
                info, relay: true, ..
            } => self.sync.send_projectile_fired(info),
            SimEvent::MatchOver(reason) => {
                self.sync.finish(&mut self.game);
                self.outcome.get_or_insert(reason);
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = relayed {
            debug!("not relayed: {}", e);
        }
    }
}

async fn next_redial(redial: &mut Option<Redial>) -> anyhow::Result<Box<dyn Transport>> {
    match redial.as_mut() {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}
