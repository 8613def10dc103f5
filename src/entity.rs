//! Ships and projectiles.
//!
//! Every entity has a circular [`Body`]. A [`Ship`] is either the player's
//! craft or a target, distinguished by [`ShipRole`]; projectiles are separate
//! because they carry a fixed path and an owner instead of a shield.

use core::time::Duration;

use crate::config::{
    target_profile, PLAYER_MAX_SHIELD, PLAYER_RADIUS, PLAYER_START_Y, PROJECTILE_RADIUS,
    PROJECTILE_SPEED, SCREEN_HEIGHT, SCREEN_WIDTH,
};
use crate::domain::{
    normalize_heading, DirectionalChange, DirectionalUpdate, PeerIdentifier, ProjectileInfo,
    TargetSpawnInfo, TargetType, Vec2,
};

/// Per-type target constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetProfile {
    pub target_type: TargetType,
    pub shield: u32,
    pub speed: f32,
    pub radius: f32,
    pub score_awarded: u32,
    pub pool_capacity: usize,
    pub appearance_weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Target,
    Projectile,
}

pub trait Moving {
    fn advance(&mut self, dt: Duration);
}

pub trait Collidable {
    fn body(&self) -> &Body;

    fn entity_kind(&self) -> EntityKind;

    fn overlaps(&self, other: &dyn Collidable) -> bool {
        self.body().overlaps(other.body())
    }

    /// Entities of the same kind pass through each other.
    fn collides_with(&self, other: &dyn Collidable) -> bool {
        self.entity_kind() != other.entity_kind() && self.overlaps(other)
    }
}

/// Kinematic state and collision circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    /// Degrees, 0 = up, clockwise.
    pub heading: f32,
    pub speed: f32,
    /// Drawn orientation, follows heading once per tick.
    pub rotation: f32,
    pub radius: f32,
    /// Set when this body was hit during the current tick.
    pub collided: bool,
}

impl Body {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            heading: 0.0,
            speed: 0.0,
            rotation: 0.0,
            radius,
            collided: false,
        }
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        self.position.distance(other.position) < self.radius + other.radius
    }

    /// Move along the heading by `speed * dt`.
    pub fn step(&mut self, dt: Duration) {
        let distance = self.speed * dt.as_secs_f32();
        if distance != 0.0 {
            self.position = self.position.advance(self.heading, distance);
        }
        self.rotation = self.heading;
    }

    /// True when no part of the circle is on screen.
    pub fn is_offscreen(&self) -> bool {
        self.position.x + self.radius < 0.0
            || self.position.x - self.radius > SCREEN_WIDTH
            || self.position.y + self.radius < 0.0
            || self.position.y - self.radius > SCREEN_HEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shield {
    pub current: u32,
    pub maximum: u32,
}

impl Shield {
    pub fn full(maximum: u32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Take one point of damage. Returns true once the shield is gone.
    pub fn reduce(&mut self) -> bool {
        self.current = self.current.saturating_sub(1);
        self.current == 0
    }

    pub fn restore(&mut self) {
        self.current = self.maximum;
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipStatus {
    Active,
    /// Shield was depleted; ignores steering until repaired.
    Disabled { until: Duration },
    /// Grace period after repair.
    Invincible { until: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub owner: PeerIdentifier,
    pub status: ShipStatus,
    pub max_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetState {
    pub target_type: TargetType,
    pub score_awarded: u32,
    pub in_use: bool,
    pub minimum_lifetime_expired: bool,
    pub spawned_at: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShipRole {
    Player(PlayerState),
    Target(TargetState),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ship {
    pub body: Body,
    pub shield: Shield,
    pub role: ShipRole,
}

/// Starting point of a player's ship.
pub fn player_start(owner: PeerIdentifier) -> Vec2 {
    let x = match owner {
        PeerIdentifier::Two => SCREEN_WIDTH * 2.0 / 3.0,
        PeerIdentifier::One => SCREEN_WIDTH / 3.0,
        PeerIdentifier::Undecided => SCREEN_WIDTH / 2.0,
    };
    Vec2::new(x, PLAYER_START_Y)
}

impl Ship {
    pub fn player(owner: PeerIdentifier, max_speed: f32) -> Self {
        Self {
            body: Body::new(player_start(owner), PLAYER_RADIUS),
            shield: Shield::full(PLAYER_MAX_SHIELD),
            role: ShipRole::Player(PlayerState {
                owner,
                status: ShipStatus::Active,
                max_speed,
            }),
        }
    }

    /// An idle target waiting in the pool.
    pub fn target(target_type: TargetType) -> Self {
        let profile = target_profile(target_type);
        Self {
            body: Body::new(Vec2::ZERO, profile.radius),
            shield: Shield::full(profile.shield),
            role: ShipRole::Target(TargetState {
                target_type,
                score_awarded: profile.score_awarded,
                in_use: false,
                minimum_lifetime_expired: false,
                spawned_at: Duration::ZERO,
            }),
        }
    }

    pub fn owner(&self) -> Option<PeerIdentifier> {
        match self.role {
            ShipRole::Player(p) => Some(p.owner),
            ShipRole::Target(_) => None,
        }
    }

    pub fn status(&self) -> Option<ShipStatus> {
        match self.role {
            ShipRole::Player(p) => Some(p.status),
            ShipRole::Target(_) => None,
        }
    }

    pub fn target_state(&self) -> Option<&TargetState> {
        match &self.role {
            ShipRole::Target(t) => Some(t),
            ShipRole::Player(_) => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.status(), Some(ShipStatus::Disabled { .. }))
    }

    /// Players take damage only while Active; targets only while spawned.
    pub fn can_take_damage(&self) -> bool {
        match &self.role {
            ShipRole::Player(p) => p.status == ShipStatus::Active,
            ShipRole::Target(t) => t.in_use,
        }
    }

    /// Steering input. Returns false when the ship ignored it.
    pub fn apply_directional_change(&mut self, change: DirectionalChange) -> bool {
        let ShipRole::Player(player) = &self.role else {
            return false;
        };
        if matches!(player.status, ShipStatus::Disabled { .. }) {
            return false;
        }
        if !change.heading.is_finite() || !change.speed.is_finite() {
            return false;
        }
        self.body.heading = normalize_heading(change.heading);
        self.body.speed = change.speed.clamp(0.0, player.max_speed);
        true
    }

    /// Overwrite kinematics with the peer's view of this ship.
    pub fn apply_snapshot(&mut self, update: &DirectionalUpdate) {
        self.body.heading = normalize_heading(update.heading);
        self.body.speed = update.speed;
        self.body.position = update.position;
        self.body.rotation = update.rotation;
    }

    pub fn snapshot(&self) -> DirectionalUpdate {
        DirectionalUpdate {
            heading: self.body.heading,
            speed: self.body.speed,
            position: self.body.position,
            rotation: self.body.rotation,
        }
    }

    /// Returns true when the shield is depleted.
    pub fn reduce_shield(&mut self) -> bool {
        self.shield.reduce()
    }

    pub fn disable(&mut self, now: Duration, repair_time: Duration) {
        if let ShipRole::Player(player) = &mut self.role {
            player.status = ShipStatus::Disabled {
                until: now + repair_time,
            };
            self.shield.restore();
            self.body.speed = 0.0;
        }
    }

    /// Advance the Disabled → Invincible → Active cycle. Returns the new
    /// status when it changed.
    pub fn update_status(&mut self, now: Duration, invincible_time: Duration) -> Option<ShipStatus> {
        let ShipRole::Player(player) = &mut self.role else {
            return None;
        };
        let next = match player.status {
            ShipStatus::Disabled { until } if now >= until => ShipStatus::Invincible {
                until: now + invincible_time,
            },
            ShipStatus::Invincible { until } if now >= until => ShipStatus::Active,
            _ => return None,
        };
        player.status = next;
        Some(next)
    }

    /// Put a pooled target into play.
    pub fn spawn(&mut self, info: &TargetSpawnInfo, now: Duration) {
        let profile = target_profile(info.target_type);
        if let ShipRole::Target(target) = &mut self.role {
            target.in_use = true;
            target.minimum_lifetime_expired = false;
            target.spawned_at = now;
        }
        self.shield.restore();
        self.body.position = info.position;
        self.body.heading = normalize_heading(info.heading);
        self.body.rotation = self.body.heading;
        self.body.speed = profile.speed;
        self.body.collided = false;
    }

    /// Return to the pristine state: targets go idle, players go home.
    pub fn reset(&mut self) {
        self.shield.restore();
        self.body.collided = false;
        self.body.speed = 0.0;
        self.body.heading = 0.0;
        self.body.rotation = 0.0;
        match &mut self.role {
            ShipRole::Target(target) => {
                target.in_use = false;
                target.minimum_lifetime_expired = false;
                target.spawned_at = Duration::ZERO;
                self.body.position = Vec2::ZERO;
            }
            ShipRole::Player(player) => {
                player.status = ShipStatus::Active;
                self.body.position = player_start(player.owner);
            }
        }
    }

    pub fn is_offscreen(&self) -> bool {
        self.body.is_offscreen()
    }

    /// Mark the minimum lifetime as passed once enough time has gone by.
    pub fn update_lifetime(&mut self, now: Duration, minimum_lifetime: Duration) {
        if let ShipRole::Target(target) = &mut self.role {
            if target.in_use && !target.minimum_lifetime_expired {
                target.minimum_lifetime_expired = now.saturating_sub(target.spawned_at) >= minimum_lifetime;
            }
        }
    }
}

impl Moving for Ship {
    fn advance(&mut self, dt: Duration) {
        self.body.step(dt);
        if let ShipRole::Player(_) = self.role {
            // Players stay on screen.
            self.body.position.x = self.body.position.x.clamp(0.0, SCREEN_WIDTH);
            self.body.position.y = self.body.position.y.clamp(0.0, SCREEN_HEIGHT);
        }
    }
}

impl Collidable for Ship {
    fn body(&self) -> &Body {
        &self.body
    }

    fn entity_kind(&self) -> EntityKind {
        match self.role {
            ShipRole::Player(_) => EntityKind::Player,
            ShipRole::Target(_) => EntityKind::Target,
        }
    }
}

/// Projectile travelling in a straight line from `start` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub body: Body,
    pub owner: PeerIdentifier,
    pub start: Vec2,
    pub destination: Vec2,
    arrived: bool,
}

impl Projectile {
    pub fn new(info: &ProjectileInfo, owner: PeerIdentifier) -> Self {
        let mut body = Body::new(info.start, PROJECTILE_RADIUS);
        body.heading = info.start.heading_to(info.destination);
        body.rotation = body.heading;
        body.speed = PROJECTILE_SPEED;
        Self {
            body,
            owner,
            start: info.start,
            destination: info.destination,
            arrived: info.start == info.destination,
        }
    }

    pub fn info(&self) -> ProjectileInfo {
        ProjectileInfo {
            start: self.start,
            destination: self.destination,
        }
    }

    /// Reached the end of its path; ready to discard.
    pub fn arrived(&self) -> bool {
        self.arrived
    }
}

impl Moving for Projectile {
    fn advance(&mut self, dt: Duration) {
        if self.arrived {
            return;
        }
        let step = self.body.speed * dt.as_secs_f32();
        if self.body.position.distance(self.destination) <= step {
            self.body.position = self.destination;
            self.arrived = true;
        } else {
            self.body.step(dt);
        }
    }
}

impl Collidable for Projectile {
    fn body(&self) -> &Body {
        &self.body
    }

    fn entity_kind(&self) -> EntityKind {
        EntityKind::Projectile
    }
}
