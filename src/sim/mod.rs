//! Fixed-step match simulation.
//!
//! `tick` is driven at a constant interval by the owner. Each running tick
//! applies local and remote input, moves everything, resolves collisions,
//! spawns targets, drops offscreen ones and finally runs the match clock.

mod collision;
mod spawn;

use alloc::vec::Vec;
use core::time::Duration;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::common::PoolError;
use crate::config::{
    SimConfig, PLAYER_MAX_SPEED_MULTI, PLAYER_MAX_SPEED_SINGLE, PROJECTILE_MUZZLE_GAP,
    PROJECTILE_RANGE,
};
use crate::domain::{
    DirectionalChange, DirectionalUpdate, PeerIdentifier, ProjectileInfo, TargetSpawnInfo,
};
use crate::entity::{Moving, Projectile, Ship, ShipStatus};
use crate::events::{EventBus, MatchOverReason, SimEvent, SimEventKind, SubscriptionId};
use crate::game::{GameMode, GameState, MatchPhase};
use crate::pool::{EntityPool, Handle};
use crate::timer::IntervalTimer;

pub use spawn::spawn_interval;

/// Input produced on this device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalInput {
    Steer(DirectionalChange),
    Fire,
}

pub struct SimulationLoop {
    config: SimConfig,
    mode: GameMode,
    local_id: PeerIdentifier,
    local_ship: Ship,
    remote_ship: Option<Ship>,
    projectiles: Vec<Projectile>,
    pool: EntityPool,
    rng: SmallRng,
    /// Match time, advanced only by Starting and Running ticks.
    clock: Duration,
    seconds: IntervalTimer,
    countdown: u32,
    time_remaining: u32,
    last_spawn: Duration,
    pending_input: Vec<LocalInput>,
    pending_remote: Option<DirectionalUpdate>,
    events: EventBus<SimEvent>,
    ticks: u64,
    started: bool,
    over: bool,
}

impl SimulationLoop {
    pub fn new(config: SimConfig, mode: GameMode, local_id: PeerIdentifier, seed: u64) -> Self {
        let max_speed = match mode {
            GameMode::Single => PLAYER_MAX_SPEED_SINGLE,
            GameMode::Multi => PLAYER_MAX_SPEED_MULTI,
        };
        let remote_ship = match mode {
            GameMode::Single => None,
            GameMode::Multi => Some(Ship::player(local_id.opponent(), max_speed)),
        };
        Self {
            config,
            mode,
            local_id,
            local_ship: Ship::player(local_id, max_speed),
            remote_ship,
            projectiles: Vec::new(),
            pool: EntityPool::from_config(&config),
            rng: SmallRng::seed_from_u64(seed),
            clock: Duration::ZERO,
            seconds: IntervalTimer::new(Duration::from_secs(1)),
            countdown: config.countdown_start,
            time_remaining: 0,
            last_spawn: Duration::ZERO,
            pending_input: Vec::new(),
            pending_remote: None,
            events: EventBus::new(),
            ticks: 0,
            started: false,
            over: false,
        }
    }

    /// Begin the countdown for a fresh match.
    pub fn start_match(&mut self, game: &mut GameState) {
        self.reset_world();
        self.clock = Duration::ZERO;
        self.seconds.start(self.clock);
        self.countdown = self.config.countdown_start;
        self.time_remaining = game.game_length();
        self.last_spawn = Duration::ZERO;
        self.ticks = 0;
        self.started = true;
        self.over = false;
        info!(
            "match starting: {:?} as {:?}, {} s",
            self.mode, self.local_id, self.time_remaining
        );
        if self.countdown == 0 {
            self.finish_countdown(game);
        } else {
            game.set_phase(MatchPhase::Starting);
            self.events.publish(SimEvent::Countdown(self.countdown));
        }
    }

    /// Queue local input for the next running tick.
    pub fn inject_local_input(&mut self, input: LocalInput) {
        self.pending_input.push(input);
    }

    /// Keep the newest remote snapshot; it is applied on the next tick.
    pub fn apply_remote_update(&mut self, update: DirectionalUpdate) {
        if self.remote_ship.is_some() {
            self.pending_remote = Some(update);
        }
    }

    /// Mirror a target spawned by the peer.
    pub fn spawn_remote_target(&mut self, info: TargetSpawnInfo) -> Option<Handle> {
        if !self.accepts_remote() {
            return None;
        }
        let handle = self.acquire_target(info);
        if handle.is_some() {
            self.events.publish(SimEvent::TargetSpawned { info, relay: false });
        }
        handle
    }

    /// Mirror a projectile fired by the peer.
    pub fn fire_remote_projectile(&mut self, info: ProjectileInfo) {
        if !self.accepts_remote() {
            return;
        }
        let owner = self.local_id.opponent();
        self.projectiles.push(Projectile::new(&info, owner));
        self.events.publish(SimEvent::ProjectileFired {
            info,
            owner,
            relay: false,
        });
    }

    /// Take a target from the pool and put it into play at `info`.
    pub fn acquire_target(&mut self, info: TargetSpawnInfo) -> Option<Handle> {
        let Some(handle) = self.pool.acquire(info.target_type) else {
            warn!("no free {:?} target", info.target_type);
            return None;
        };
        match self.pool.get_mut(handle) {
            Ok(ship) => {
                ship.spawn(&info, self.clock);
                Some(handle)
            }
            Err(e) => {
                warn!("fresh target handle rejected: {}", e);
                None
            }
        }
    }

    pub fn release_target(&mut self, handle: Handle) -> Result<(), PoolError> {
        self.pool.release(handle)
    }

    /// Advance the match by one step of `dt`.
    pub fn tick(&mut self, dt: Duration, game: &mut GameState) {
        if self.over || !self.started {
            return;
        }
        match game.phase() {
            MatchPhase::Starting => {
                // Ships hold still during the countdown.
                self.pending_input.clear();
                self.ticks += 1;
                self.clock += dt;
                self.run_clock(game);
            }
            MatchPhase::Running => {
                self.ticks += 1;
                self.clock += dt;
                self.run_tick(dt, game);
            }
            _ => {}
        }
    }

    /// End the match early, e.g. on quit or session loss.
    pub fn end_match(&mut self, reason: MatchOverReason, game: &mut GameState) {
        self.finish(reason, game);
    }

    /// Drop all match state. Subscriptions survive.
    pub fn teardown(&mut self) {
        self.reset_world();
        self.seconds.cancel();
        self.events.clear();
        self.started = false;
        self.over = false;
    }

    pub fn poll_event(&mut self) -> Option<SimEvent> {
        self.events.poll()
    }

    pub fn subscribe<F>(&mut self, kinds: &[SimEventKind], callback: F) -> SubscriptionId
    where
        F: FnMut(&SimEvent) + Send + 'static,
    {
        self.events.subscribe(kinds, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn local_id(&self) -> PeerIdentifier {
        self.local_id
    }

    pub fn local_ship(&self) -> &Ship {
        &self.local_ship
    }

    pub fn remote_ship(&self) -> Option<&Ship> {
        self.remote_ship.as_ref()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    /// Targets currently in play.
    pub fn targets(&self) -> Vec<(Handle, &Ship)> {
        self.pool
            .handles()
            .into_iter()
            .filter_map(|h| self.pool.get(h).ok().map(|ship| (h, ship)))
            .collect()
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Single-player devices and player one spawn targets.
    pub fn is_spawn_authority(&self) -> bool {
        self.mode == GameMode::Single || self.local_id == PeerIdentifier::One
    }

    fn accepts_remote(&self) -> bool {
        self.started && !self.over && self.mode == GameMode::Multi
    }

    fn run_tick(&mut self, dt: Duration, game: &mut GameState) {
        let now = self.clock;

        for input in core::mem::take(&mut self.pending_input) {
            match input {
                LocalInput::Steer(change) => {
                    self.local_ship.apply_directional_change(change);
                }
                LocalInput::Fire => self.fire_local(),
            }
        }

        if let (Some(update), Some(remote)) = (self.pending_remote.take(), self.remote_ship.as_mut()) {
            remote.apply_snapshot(&update);
            self.events.publish(SimEvent::RemoteUpdateApplied(update));
        }

        self.update_statuses(now);

        self.local_ship.advance(dt);
        if let Some(remote) = self.remote_ship.as_mut() {
            remote.advance(dt);
        }
        for projectile in self.projectiles.iter_mut() {
            projectile.advance(dt);
        }
        self.projectiles.retain(|p| !p.arrived());
        let lifetime = self.config.target_minimum_lifetime;
        for handle in self.pool.handles() {
            if let Ok(target) = self.pool.get_mut(handle) {
                target.advance(dt);
                target.update_lifetime(now, lifetime);
            }
        }

        collision::resolve(self, game);

        if self.config.spawning_enabled && self.is_spawn_authority() {
            spawn::maybe_spawn(self, game);
        }

        self.release_offscreen();

        if self.mode == GameMode::Multi {
            self.events
                .publish(SimEvent::LocalDirectionalUpdate(self.local_ship.snapshot()));
        }

        self.run_clock(game);
    }

    fn fire_local(&mut self) {
        if self.local_ship.is_disabled() {
            debug!("fire ignored while disabled");
            return;
        }
        let body = &self.local_ship.body;
        let info = ProjectileInfo {
            start: body
                .position
                .advance(body.heading, body.radius + PROJECTILE_MUZZLE_GAP),
            destination: body.position.advance(body.heading, PROJECTILE_RANGE),
        };
        self.projectiles.push(Projectile::new(&info, self.local_id));
        self.events.publish(SimEvent::ProjectileFired {
            info,
            owner: self.local_id,
            relay: self.mode == GameMode::Multi,
        });
    }

    fn update_statuses(&mut self, now: Duration) {
        let invincible = self.config.invincible_time;
        let ships = core::iter::once(&mut self.local_ship).chain(self.remote_ship.as_mut());
        for ship in ships {
            if let Some(ShipStatus::Invincible { .. }) = ship.update_status(now, invincible) {
                if let Some(owner) = ship.owner() {
                    self.events.publish(SimEvent::ShipRestored(owner));
                }
            }
        }
    }

    fn release_offscreen(&mut self) {
        for handle in self.pool.handles() {
            let gone = match self.pool.get(handle) {
                Ok(ship) => {
                    ship.is_offscreen()
                        && ship
                            .target_state()
                            .is_some_and(|t| t.minimum_lifetime_expired)
                }
                Err(_) => false,
            };
            if gone {
                if let Err(e) = self.pool.release(handle) {
                    warn!("offscreen release failed: {}", e);
                }
            }
        }
    }

    fn run_clock(&mut self, game: &mut GameState) {
        for _ in 0..self.seconds.poll(self.clock) {
            if self.over {
                break;
            }
            if game.phase() == MatchPhase::Starting {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown == 0 {
                    self.finish_countdown(game);
                } else {
                    self.events.publish(SimEvent::Countdown(self.countdown));
                }
            } else {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                self.events.publish(SimEvent::TimeRemaining(self.time_remaining));
                if self.time_remaining == 0 {
                    self.finish(MatchOverReason::TimeExpired, game);
                }
            }
        }
    }

    fn finish_countdown(&mut self, game: &mut GameState) {
        game.mark_countdown_finished();
        game.set_phase(MatchPhase::Running);
        self.last_spawn = self.clock;
        self.events.publish(SimEvent::CountdownFinished);
    }

    fn finish(&mut self, reason: MatchOverReason, game: &mut GameState) {
        if self.over {
            return;
        }
        self.over = true;
        game.set_phase(MatchPhase::Over);
        let released = self.pool.release_all();
        self.projectiles.clear();
        self.pending_input.clear();
        self.pending_remote = None;
        self.seconds.cancel();
        info!("match over ({:?}), released {} targets", reason, released);
        self.events.publish(SimEvent::MatchOver(reason));
    }

    fn reset_world(&mut self) {
        self.pool.release_all();
        self.projectiles.clear();
        self.pending_input.clear();
        self.pending_remote = None;
        self.local_ship.reset();
        if let Some(remote) = self.remote_ship.as_mut() {
            remote.reset();
        }
    }
}
