use alloc::vec::Vec;

use log::{debug, warn};

use super::SimulationLoop;
use crate::entity::{Collidable, Ship};
use crate::events::SimEvent;
use crate::game::GameState;

/// Resolve every overlap of this tick.
///
/// A body marked collided is skipped for the rest of the tick, so several
/// projectiles landing on one target in the same tick count once.
pub(super) fn resolve(sim: &mut SimulationLoop, game: &mut GameState) {
    let now = sim.clock;
    let repair_time = sim.config.repair_time;
    let SimulationLoop {
        projectiles,
        pool,
        local_ship,
        remote_ship,
        events,
        ..
    } = sim;

    local_ship.body.collided = false;
    if let Some(remote) = remote_ship.as_mut() {
        remote.body.collided = false;
    }
    let targets = pool.handles();
    for &handle in &targets {
        if let Ok(target) = pool.get_mut(handle) {
            target.body.collided = false;
        }
    }

    let mut raised = Vec::new();

    for projectile in projectiles.iter_mut() {
        projectile.body.collided = false;

        for &handle in &targets {
            let Ok(target) = pool.get_mut(handle) else {
                continue;
            };
            if target.body.collided || !target.can_take_damage() {
                continue;
            }
            if !projectile.collides_with(&*target) {
                continue;
            }
            projectile.body.collided = true;
            target.body.collided = true;
            if target.reduce_shield() {
                let (target_type, points) = match target.target_state() {
                    Some(state) => (state.target_type, state.score_awarded),
                    None => continue,
                };
                match pool.release(handle) {
                    Ok(()) => {
                        let score = game.reward_player(projectile.owner, points);
                        debug!(
                            "{:?} destroyed a {:?} target for {} points",
                            projectile.owner, target_type, points
                        );
                        raised.push(SimEvent::TargetDestroyed {
                            target_type,
                            by: projectile.owner,
                            points,
                        });
                        raised.push(SimEvent::ScoreChanged {
                            player: projectile.owner,
                            score,
                        });
                    }
                    Err(e) => warn!("destroyed target could not be released: {}", e),
                }
            }
            break;
        }
        if projectile.body.collided {
            continue;
        }

        let ships = core::iter::once(&mut *local_ship).chain(remote_ship.as_mut());
        for ship in ships {
            if ship.owner() == Some(projectile.owner) {
                continue;
            }
            if ship.body.collided || !ship.can_take_damage() {
                continue;
            }
            if projectile.collides_with(&*ship) {
                projectile.body.collided = true;
                ship.body.collided = true;
                damage_player(ship, now, repair_time, &mut raised);
                break;
            }
        }
    }

    projectiles.retain(|p| !p.body.collided);

    let ships = core::iter::once(&mut *local_ship).chain(remote_ship.as_mut());
    for ship in ships {
        if ship.body.collided || !ship.can_take_damage() {
            continue;
        }
        for &handle in &targets {
            let Ok(target) = pool.get_mut(handle) else {
                continue;
            };
            if target.body.collided || !target.can_take_damage() {
                continue;
            }
            if ship.collides_with(&*target) {
                ship.body.collided = true;
                target.body.collided = true;
                damage_player(ship, now, repair_time, &mut raised);
                break;
            }
        }
    }

    for event in raised {
        events.publish(event);
    }
}

fn damage_player(
    ship: &mut Ship,
    now: core::time::Duration,
    repair_time: core::time::Duration,
    raised: &mut Vec<SimEvent>,
) {
    if ship.reduce_shield() {
        ship.disable(now, repair_time);
        if let Some(owner) = ship.owner() {
            debug!("{:?} disabled", owner);
            raised.push(SimEvent::ShipDisabled(owner));
        }
    }
}
