//! Sources of local input for a ship.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::domain::DirectionalChange;
use crate::entity::ShipRole;
use crate::events::SimEvent;
use crate::sim::{LocalInput, SimulationLoop};

/// Interface implemented by anything that flies the local ship.
pub trait Pilot: Send {
    /// Input for the coming tick, if any.
    fn next_input(&mut self, rng: &mut SmallRng, sim: &SimulationLoop) -> Option<LocalInput>;

    /// Inform the pilot of something that happened in the match.
    fn handle_event(&mut self, _event: &SimEvent) {}
}

/// Never touches the controls.
pub struct IdlePilot;

impl Pilot for IdlePilot {
    fn next_input(&mut self, _rng: &mut SmallRng, _sim: &SimulationLoop) -> Option<LocalInput> {
        None
    }
}

/// Steers towards the nearest target and fires at a fixed cadence.
pub struct AutoPilot {
    steer_every: u32,
    fire_every: u32,
    ticks: u32,
}

impl AutoPilot {
    pub fn new() -> Self {
        Self::with_cadence(10, 16)
    }

    pub fn with_cadence(steer_every: u32, fire_every: u32) -> Self {
        Self {
            steer_every: steer_every.max(1),
            fire_every: fire_every.max(1),
            ticks: 0,
        }
    }
}

impl Default for AutoPilot {
    fn default() -> Self {
        Self::new()
    }
}

impl Pilot for AutoPilot {
    fn next_input(&mut self, rng: &mut SmallRng, sim: &SimulationLoop) -> Option<LocalInput> {
        self.ticks = self.ticks.wrapping_add(1);
        if sim.local_ship().is_disabled() {
            return None;
        }
        if self.ticks % self.fire_every == 0 {
            return Some(LocalInput::Fire);
        }
        if self.ticks % self.steer_every != 0 {
            return None;
        }
        let ship = sim.local_ship();
        let position = ship.body.position;
        let nearest = sim
            .targets()
            .into_iter()
            .map(|(_, target)| target.body.position)
            .min_by(|a, b| position.distance(*a).total_cmp(&position.distance(*b)));
        let heading = match nearest {
            Some(target) => position.heading_to(target),
            None => rng.random_range(0.0..360.0),
        };
        let max_speed = match ship.role {
            ShipRole::Player(p) => p.max_speed,
            ShipRole::Target(_) => 0.0,
        };
        Some(LocalInput::Steer(DirectionalChange {
            heading,
            speed: rng.random_range(0.25..=1.0) * max_speed,
        }))
    }
}
