mod common;

use std::time::Duration;

use common::{count_kind, Link, Peer};
use dogfight::{
    MatchOverReason, MatchPhase, Packet, PacketBody, PacketKind, PeerIdentifier, SyncError,
    SyncEvent, SyncState,
};

#[test]
fn higher_roll_becomes_player_one() {
    let mut link = Link::new(vec![42], vec![17]);
    link.elect();

    assert_eq!(link.a.sync.local_id(), PeerIdentifier::One);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::Two);
    assert!(link.a.sync.is_leader());
    assert!(!link.b.sync.is_leader());
    assert_eq!(link.a.game.phase(), MatchPhase::SettingOptions);
    assert_eq!(link.b.game.phase(), MatchPhase::SettingOptions);

    assert!(link
        .a
        .events()
        .contains(&SyncEvent::DieRollFinished(PeerIdentifier::One)));
    assert!(link
        .b
        .events()
        .contains(&SyncEvent::DieRollFinished(PeerIdentifier::Two)));
}

#[test]
fn first_mover_with_lower_roll_becomes_player_two() {
    let mut link = Link::new(vec![3], vec![999_999]);
    link.elect();
    assert_eq!(link.a.sync.local_id(), PeerIdentifier::Two);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::One);
}

#[test]
fn tie_restarts_the_roll() {
    let mut link = Link::new(vec![5, 900], vec![5, 100]);
    link.elect();

    assert_eq!(link.a.sync.local_id(), PeerIdentifier::One);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::Two);
    assert_eq!(link.a.sync.election().round(), 1);
    assert_eq!(link.b.sync.election().round(), 1);
    // Rolls from the tied round are gone.
    assert_eq!(link.a.sync.election().peer_roll(), Some(100));
    assert_eq!(link.b.sync.election().peer_roll(), Some(900));

    let a_events = link.a.events();
    let b_events = link.b.events();
    assert!(a_events.contains(&SyncEvent::RestartingDieRoll { round: 1 }));
    assert!(b_events.contains(&SyncEvent::RestartingDieRoll { round: 1 }));
    assert_eq!(
        a_events
            .iter()
            .filter(|e| matches!(e, SyncEvent::DieRollFinished(_)))
            .count(),
        1
    );
}

#[test]
fn repeated_ties_keep_rolling() {
    let mut link = Link::new(vec![7, 7, 7, 8], vec![7, 7, 7, 2]);
    link.elect();
    assert_eq!(link.a.sync.election().round(), 3);
    assert_eq!(link.a.sync.local_id(), PeerIdentifier::One);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::Two);
}

#[test]
fn lost_roll_is_retransmitted() {
    let mut link = Link::new(vec![42], vec![17]);
    link.connect();
    // First die roll from A never arrives.
    let dropped = link.a.outbox();
    assert_eq!(count_kind(&dropped, PacketKind::DieRoll), 1);
    link.deliver_b_to_a();
    link.deliver_a_to_b();
    assert_eq!(link.b.sync.state(), SyncState::ElectingLeader);

    link.advance(Duration::from_millis(250));
    link.exchange();
    assert_eq!(link.a.sync.local_id(), PeerIdentifier::One);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::Two);
}

#[test]
fn roll_from_an_abandoned_round_is_ignored() {
    let mut link = Link::new(vec![5, 900], vec![5, 100]);
    link.elect();
    let before = link.b.sync.election().peer_roll();

    let stale = Packet::new(
        link.b.sync.last_accepted_sequence() + 1,
        PacketBody::DieRoll { round: 0, roll: 1 },
    );
    link.b.receive(&stale, link.now);
    assert_eq!(link.b.sync.election().peer_roll(), before);
    assert_eq!(link.b.sync.local_id(), PeerIdentifier::Two);
    assert!(link.b.outbox().is_empty());
}

#[test]
fn unanswered_election_gives_up() {
    let mut peer = Peer::new(vec![1]);
    let mut now = Duration::ZERO;
    peer.sync.begin_connect().unwrap();
    peer.sync.connection_established(now).unwrap();
    peer.sync.start_election(now, &mut peer.game).unwrap();

    for _ in 0..(12_000 / 50) {
        now += Duration::from_millis(50);
        peer.sync.poll(now, &mut peer.game);
        peer.outbox();
    }

    assert!(peer.sync.is_terminated());
    assert!(peer.game.is_over());
    let events = peer.events();
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == SyncEvent::MatchOver(MatchOverReason::SessionLost))
            .count(),
        1
    );
    assert!(events.contains(&SyncEvent::SessionLost));
}

#[test]
fn election_cannot_start_before_the_link_is_up() {
    let mut peer = Peer::new(vec![1]);
    let err = peer
        .sync
        .start_election(Duration::ZERO, &mut peer.game)
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::InvalidState {
            state: SyncState::Idle,
            ..
        }
    ));
}

#[test]
fn identity_is_assigned_once() {
    let mut link = Link::new(vec![42], vec![17]);
    link.elect();
    assert_eq!(
        link.a.sync.assign_identity(PeerIdentifier::Two),
        Err(SyncError::AlreadyAssigned)
    );
    assert_eq!(link.a.sync.local_id(), PeerIdentifier::One);
}
