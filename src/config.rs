use core::time::Duration;

use crate::entity::TargetProfile;
use crate::domain::TargetType;

pub const SCREEN_WIDTH: f32 = 480.0;
pub const SCREEN_HEIGHT: f32 = 320.0;

/// Simulation step, 40 ticks per second.
pub const TICK_INTERVAL: Duration = Duration::from_millis(25);

pub const PLAYER_START_Y: f32 = 50.0;
pub const PLAYER_RADIUS: f32 = 16.0;
pub const PLAYER_MAX_SHIELD: u32 = 5;
pub const PLAYER_MAX_SPEED_SINGLE: f32 = 100.0;
pub const PLAYER_MAX_SPEED_MULTI: f32 = 50.0;

pub const SHIP_REPAIR_TIME: Duration = Duration::from_secs(3);
pub const SHIP_INVINCIBLE_TIME: Duration = Duration::from_secs(3);

pub const PROJECTILE_SPEED: f32 = 300.0;
pub const PROJECTILE_RANGE: f32 = 400.0;
pub const PROJECTILE_RADIUS: f32 = 3.0;
/// Gap between a ship's bounds and the muzzle point.
pub const PROJECTILE_MUZZLE_GAP: f32 = 4.0;

pub const TARGET_MINIMUM_LIFETIME: Duration = Duration::from_secs(2);

pub const SMALL_TARGET: TargetProfile = TargetProfile {
    target_type: TargetType::Small,
    shield: 1,
    speed: 80.0,
    radius: 12.0,
    score_awarded: 10,
    pool_capacity: 16,
    appearance_weight: 80,
};

pub const LARGE_TARGET: TargetProfile = TargetProfile {
    target_type: TargetType::Large,
    shield: 3,
    speed: 40.0,
    radius: 24.0,
    score_awarded: 30,
    pool_capacity: 8,
    appearance_weight: 20,
};

pub const TARGET_PROFILES: [TargetProfile; 2] = [SMALL_TARGET, LARGE_TARGET];

pub fn target_profile(target_type: TargetType) -> &'static TargetProfile {
    &TARGET_PROFILES[target_type.index()]
}

/// Fastest spawn interval in seconds, reached when the clock runs out.
pub const MAXIMUM_SPAWN_RATE: f32 = 0.5;
/// Extra spawn interval in seconds at the start of the match.
pub const SPAWN_RATE_MODIFIER: f32 = 1.5;

pub const COUNTDOWN_START: u32 = 3;

pub const DEFAULT_GAME_LENGTH: u32 = 60;
pub const MIN_GAME_LENGTH: u32 = 10;
pub const MAX_GAME_LENGTH: u32 = 300;

/// Die rolls are drawn from `0..DIE_ROLL_RANGE`.
pub const DIE_ROLL_RANGE: u32 = 1_000_000;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);
pub const HEARTBEAT_TIMEOUT_MULTIPLIER: u32 = 6;
pub const RECONNECT_WINDOW: Duration = Duration::from_secs(10);
pub const HANDSHAKE_RETRY_INTERVAL: Duration = Duration::from_millis(250);
pub const MAX_HANDSHAKE_RETRIES: u32 = 40;

/// Protocol timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout_multiplier: u32,
    pub reconnect_window: Duration,
    pub handshake_retry_interval: Duration,
    pub max_handshake_retries: u32,
}

impl SyncConfig {
    /// Silence after which the link counts as interrupted.
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_timeout_multiplier
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_timeout_multiplier: HEARTBEAT_TIMEOUT_MULTIPLIER,
            reconnect_window: RECONNECT_WINDOW,
            handshake_retry_interval: HANDSHAKE_RETRY_INTERVAL,
            max_handshake_retries: MAX_HANDSHAKE_RETRIES,
        }
    }
}

/// Simulation knobs. Tests turn spawning off to keep worlds scripted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub tick_interval: Duration,
    pub countdown_start: u32,
    pub small_target_capacity: usize,
    pub large_target_capacity: usize,
    pub target_minimum_lifetime: Duration,
    pub repair_time: Duration,
    pub invincible_time: Duration,
    pub spawning_enabled: bool,
}

impl SimConfig {
    pub fn capacity(&self, target_type: TargetType) -> usize {
        match target_type {
            TargetType::Small => self.small_target_capacity,
            TargetType::Large => self.large_target_capacity,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            countdown_start: COUNTDOWN_START,
            small_target_capacity: SMALL_TARGET.pool_capacity,
            large_target_capacity: LARGE_TARGET.pool_capacity,
            target_minimum_lifetime: TARGET_MINIMUM_LIFETIME,
            repair_time: SHIP_REPAIR_TIME,
            invincible_time: SHIP_INVINCIBLE_TIME,
            spawning_enabled: true,
        }
    }
}
