use std::time::Duration;

use dogfight::entity::{Collidable, EntityKind, Projectile, Ship};
use dogfight::{PeerIdentifier, ProjectileInfo, TargetSpawnInfo, TargetType, Vec2};

fn projectile_at(position: Vec2) -> Projectile {
    let info = ProjectileInfo {
        start: position,
        destination: Vec2::new(position.x, position.y + 100.0),
    };
    Projectile::new(&info, PeerIdentifier::One)
}

fn target_at(position: Vec2) -> Ship {
    let mut target = Ship::target(TargetType::Small);
    target.spawn(
        &TargetSpawnInfo {
            target_type: TargetType::Small,
            heading: 0.0,
            position,
        },
        Duration::ZERO,
    );
    target
}

#[test]
fn kinds_follow_the_role() {
    assert_eq!(projectile_at(Vec2::ZERO).entity_kind(), EntityKind::Projectile);
    assert_eq!(target_at(Vec2::ZERO).entity_kind(), EntityKind::Target);
    assert_eq!(
        Ship::player(PeerIdentifier::Two, 50.0).entity_kind(),
        EntityKind::Player
    );
}

#[test]
fn projectile_hits_an_overlapping_target() {
    let target = target_at(Vec2::new(100.0, 100.0));
    assert!(projectile_at(Vec2::new(100.0, 105.0)).collides_with(&target));
    assert!(target.collides_with(&projectile_at(Vec2::new(100.0, 105.0))));
    assert!(!projectile_at(Vec2::new(300.0, 300.0)).collides_with(&target));
}

#[test]
fn same_kind_passes_through() {
    let a = projectile_at(Vec2::new(50.0, 50.0));
    let b = projectile_at(Vec2::new(50.0, 50.0));
    assert!(a.overlaps(&b));
    assert!(!a.collides_with(&b));

    let one = Ship::player(PeerIdentifier::One, 50.0);
    let mut two = Ship::player(PeerIdentifier::Two, 50.0);
    two.body.position = one.body.position;
    assert!(one.overlaps(&two));
    assert!(!one.collides_with(&two));
}

#[test]
fn player_collides_with_a_target() {
    let player = Ship::player(PeerIdentifier::One, 50.0);
    let target = target_at(player.body.position);
    assert!(player.collides_with(&target));
}
