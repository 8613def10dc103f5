use core::time::Duration;

use log::debug;
use rand::Rng;

use super::SimulationLoop;
use crate::config::{
    target_profile, MAXIMUM_SPAWN_RATE, SCREEN_HEIGHT, SCREEN_WIDTH, SPAWN_RATE_MODIFIER,
    TARGET_PROFILES,
};
use crate::domain::{normalize_heading, TargetSpawnInfo, TargetType, Vec2};
use crate::events::SimEvent;
use crate::game::{GameMode, GameState};

/// Time between spawns. Shrinks linearly as the clock runs down.
pub fn spawn_interval(time_remaining: u32, game_length: u32) -> Duration {
    let fraction = if game_length == 0 {
        0.0
    } else {
        (time_remaining.min(game_length) as f32) / (game_length as f32)
    };
    Duration::from_secs_f32(MAXIMUM_SPAWN_RATE + SPAWN_RATE_MODIFIER * fraction)
}

fn choose_type<R: Rng>(rng: &mut R) -> TargetType {
    let total: u32 = TARGET_PROFILES.iter().map(|p| p.appearance_weight).sum();
    let mut draw = rng.random_range(0..total.max(1));
    for profile in TARGET_PROFILES.iter() {
        if draw < profile.appearance_weight {
            return profile.target_type;
        }
        draw -= profile.appearance_weight;
    }
    TargetType::Small
}

/// Point just past a random screen edge, heading back across the screen.
fn spawn_point<R: Rng>(rng: &mut R, target_type: TargetType) -> TargetSpawnInfo {
    let radius = target_profile(target_type).radius;
    let spread: f32 = rng.random_range(-60.0..60.0);
    let (position, heading) = match rng.random_range(0..4u8) {
        0 => (
            Vec2::new(rng.random_range(0.0..SCREEN_WIDTH), SCREEN_HEIGHT + radius),
            180.0 + spread,
        ),
        1 => (
            Vec2::new(SCREEN_WIDTH + radius, rng.random_range(0.0..SCREEN_HEIGHT)),
            270.0 + spread,
        ),
        2 => (
            Vec2::new(rng.random_range(0.0..SCREEN_WIDTH), -radius),
            spread,
        ),
        _ => (
            Vec2::new(-radius, rng.random_range(0.0..SCREEN_HEIGHT)),
            90.0 + spread,
        ),
    };
    TargetSpawnInfo {
        target_type,
        heading: normalize_heading(heading),
        position,
    }
}

pub(super) fn maybe_spawn(sim: &mut SimulationLoop, game: &GameState) {
    let interval = spawn_interval(sim.time_remaining, game.game_length());
    if sim.clock.saturating_sub(sim.last_spawn) < interval {
        return;
    }
    let target_type = choose_type(&mut sim.rng);
    let info = spawn_point(&mut sim.rng, target_type);
    match sim.acquire_target(info) {
        Some(_) => {
            sim.last_spawn = sim.clock;
            sim.events.publish(SimEvent::TargetSpawned {
                info,
                relay: sim.mode == GameMode::Multi,
            });
        }
        // Pool is full; try again next tick.
        None => debug!("spawn skipped, {:?} pool exhausted", target_type),
    }
}
