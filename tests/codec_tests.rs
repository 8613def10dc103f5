use dogfight::protocol::codec::{decode, encode, CodecError, HEADER_LEN, MAX_DATAGRAM_LEN};
use dogfight::{
    DirectionalUpdate, Packet, PacketBody, PacketKind, ProjectileInfo, TargetSpawnInfo,
    TargetType, Vec2,
};

fn sample(kind: PacketKind) -> PacketBody {
    match kind {
        PacketKind::DieRoll => PacketBody::DieRoll {
            round: 2,
            roll: 654_321,
        },
        PacketKind::DieRollAck => PacketBody::DieRollAck { round: 2 },
        PacketKind::RestartDieRoll => PacketBody::RestartDieRoll { round: 1 },
        PacketKind::Heartbeat => PacketBody::Heartbeat,
        PacketKind::NewGameLength => PacketBody::NewGameLength { seconds: 90 },
        PacketKind::PlayerReady => PacketBody::PlayerReady,
        PacketKind::ReadyAck => PacketBody::ReadyAck,
        PacketKind::GameCancelled => PacketBody::GameCancelled,
        PacketKind::ActionLayerReady => PacketBody::ActionLayerReady,
        PacketKind::ActionLayerReadyAck => PacketBody::ActionLayerReadyAck,
        PacketKind::DirectionalUpdate => PacketBody::DirectionalUpdate(DirectionalUpdate {
            heading: 45.0,
            speed: 30.5,
            position: Vec2::new(120.0, 64.25),
            rotation: 44.0,
        }),
        PacketKind::TargetSpawned => PacketBody::TargetSpawned(TargetSpawnInfo {
            target_type: TargetType::Large,
            heading: 200.0,
            position: Vec2::new(-24.0, 100.0),
        }),
        PacketKind::ProjectileFired => PacketBody::ProjectileFired(ProjectileInfo {
            start: Vec2::new(160.0, 70.0),
            destination: Vec2::new(160.0, 470.0),
        }),
        PacketKind::PeerPaused => PacketBody::PeerPaused { ack: true },
        PacketKind::PeerResumed => PacketBody::PeerResumed,
        PacketKind::ResumeAck => PacketBody::ResumeAck,
        PacketKind::PeerQuit => PacketBody::PeerQuit,
    }
}

#[test]
fn every_kind_decodes_to_itself() {
    for (i, kind) in PacketKind::ALL.iter().enumerate() {
        let packet = Packet::new(1_000 + i as u32, sample(*kind));
        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes[0], *kind as u8);
        assert!(bytes.len() <= MAX_DATAGRAM_LEN);
        assert_eq!(decode(&bytes).unwrap(), packet);
    }
}

#[test]
fn header_is_tag_then_little_endian_sequence() {
    let bytes = encode(&Packet::new(0x0102_0304, PacketBody::Heartbeat)).unwrap();
    assert_eq!(bytes, vec![PacketKind::Heartbeat as u8, 0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn fixed_payload_sizes() {
    let len = |body| encode(&Packet::new(1, body)).unwrap().len();
    assert_eq!(len(sample(PacketKind::Heartbeat)), HEADER_LEN);
    assert_eq!(len(sample(PacketKind::DieRoll)), HEADER_LEN + 8);
    assert_eq!(len(sample(PacketKind::NewGameLength)), HEADER_LEN + 4);
    assert_eq!(len(sample(PacketKind::PeerPaused)), HEADER_LEN + 1);
    assert_eq!(len(sample(PacketKind::DirectionalUpdate)), HEADER_LEN + 20);
    assert_eq!(len(sample(PacketKind::ProjectileFired)), HEADER_LEN + 16);
}

#[test]
fn short_datagram_is_truncated() {
    assert_eq!(decode(&[]), Err(CodecError::Truncated { len: 0 }));
    assert_eq!(decode(&[3, 1, 0, 0]), Err(CodecError::Truncated { len: 4 }));
}

#[test]
fn oversized_datagram_is_rejected() {
    let bytes = vec![3u8; MAX_DATAGRAM_LEN + 1];
    assert_eq!(
        decode(&bytes),
        Err(CodecError::TooLarge {
            len: MAX_DATAGRAM_LEN + 1
        })
    );
}

#[test]
fn unknown_kind_is_rejected() {
    assert_eq!(decode(&[17, 1, 0, 0, 0]), Err(CodecError::UnknownKind(17)));
    assert_eq!(decode(&[255, 1, 0, 0, 0]), Err(CodecError::UnknownKind(255)));
}

#[test]
fn missing_payload_bytes_are_malformed() {
    let mut bytes = encode(&Packet::new(9, sample(PacketKind::DieRoll))).unwrap();
    bytes.pop();
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::DieRoll,
            ..
        })
    ));
}

#[test]
fn trailing_bytes_are_malformed() {
    let mut bytes = encode(&Packet::new(9, PacketBody::PlayerReady)).unwrap();
    bytes.push(0);
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::PlayerReady,
            ..
        })
    ));

    let mut bytes = encode(&Packet::new(9, sample(PacketKind::NewGameLength))).unwrap();
    bytes.push(0);
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::NewGameLength,
            ..
        })
    ));
}

#[test]
fn invalid_bool_is_malformed() {
    let mut bytes = encode(&Packet::new(4, PacketBody::PeerPaused { ack: false })).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = 2;
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::PeerPaused,
            ..
        })
    ));
}

#[test]
fn non_finite_coordinates_are_malformed() {
    let packet = Packet::new(
        4,
        PacketBody::DirectionalUpdate(DirectionalUpdate {
            heading: f32::NAN,
            speed: 1.0,
            position: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        }),
    );
    let bytes = encode(&packet).unwrap();
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::DirectionalUpdate,
            ..
        })
    ));

    let packet = Packet::new(
        5,
        PacketBody::ProjectileFired(ProjectileInfo {
            start: Vec2::new(0.0, 0.0),
            destination: Vec2::new(f32::INFINITY, 0.0),
        }),
    );
    let bytes = encode(&packet).unwrap();
    assert!(decode(&bytes).is_err());
}

#[test]
fn unknown_target_type_is_malformed() {
    let mut bytes = encode(&Packet::new(6, sample(PacketKind::TargetSpawned))).unwrap();
    // Variant index of the target type follows the header.
    bytes[HEADER_LEN] = 9;
    assert!(matches!(
        decode(&bytes),
        Err(CodecError::Malformed {
            kind: PacketKind::TargetSpawned,
            ..
        })
    ));
}

#[test]
fn malformed_datagram_is_dropped_by_the_protocol() {
    use dogfight::{GameMode, GameState, SyncConfig, SyncProtocol, SyncState};
    use std::time::Duration;

    let mut sync = SyncProtocol::with_seed(SyncConfig::default(), 1);
    let mut game = GameState::new(GameMode::Multi);
    sync.begin_connect().unwrap();
    sync.handle_datagram(&[200, 1, 0, 0, 0], Duration::ZERO, &mut game);
    sync.handle_datagram(&[0, 1], Duration::ZERO, &mut game);
    assert_eq!(sync.state(), SyncState::Connecting);
    assert_eq!(sync.last_accepted_sequence(), 0);
    assert!(sync.poll_event().is_none());
}
