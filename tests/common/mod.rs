#![allow(dead_code)]

use std::time::Duration;

use dogfight::protocol::codec;
use dogfight::sync::ScriptedDie;
use dogfight::{
    GameMode, GameState, Packet, PacketKind, SyncConfig, SyncEvent, SyncProtocol, SyncState,
};

pub struct Peer {
    pub sync: SyncProtocol,
    pub game: GameState,
}

impl Peer {
    pub fn new(rolls: Vec<u32>) -> Self {
        Self {
            sync: SyncProtocol::new(SyncConfig::default(), Box::new(ScriptedDie::new(rolls))),
            game: GameState::new(GameMode::Multi),
        }
    }

    pub fn events(&mut self) -> Vec<SyncEvent> {
        std::iter::from_fn(|| self.sync.poll_event()).collect()
    }

    pub fn outbox(&mut self) -> Vec<Packet> {
        std::iter::from_fn(|| self.sync.poll_transmit()).collect()
    }

    /// Feed one packet through the wire encoding.
    pub fn receive(&mut self, packet: &Packet, now: Duration) {
        let bytes = codec::encode(packet).expect("encode");
        self.sync.handle_datagram(&bytes, now, &mut self.game);
    }
}

/// Two peers joined by a perfect link and a shared virtual clock.
pub struct Link {
    pub a: Peer,
    pub b: Peer,
    pub now: Duration,
}

impl Link {
    pub fn new(a_rolls: Vec<u32>, b_rolls: Vec<u32>) -> Self {
        Self {
            a: Peer::new(a_rolls),
            b: Peer::new(b_rolls),
            now: Duration::ZERO,
        }
    }

    pub fn connect(&mut self) {
        for peer in [&mut self.a, &mut self.b] {
            peer.sync.begin_connect().expect("connect");
            peer.sync.connection_established(self.now).expect("established");
            peer.sync
                .start_election(self.now, &mut peer.game)
                .expect("election");
        }
    }

    pub fn deliver_a_to_b(&mut self) -> usize {
        let packets = self.a.outbox();
        for p in &packets {
            self.b.receive(p, self.now);
        }
        packets.len()
    }

    pub fn deliver_b_to_a(&mut self) -> usize {
        let packets = self.b.outbox();
        for p in &packets {
            self.a.receive(p, self.now);
        }
        packets.len()
    }

    /// Shuttle packets both ways until neither side has anything to send.
    pub fn exchange(&mut self) -> usize {
        let mut total = 0;
        loop {
            let moved = self.deliver_a_to_b() + self.deliver_b_to_a();
            if moved == 0 {
                return total;
            }
            total += moved;
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        self.a.sync.poll(self.now, &mut self.a.game);
        self.b.sync.poll(self.now, &mut self.b.game);
    }

    pub fn elect(&mut self) {
        self.connect();
        self.exchange();
        assert_eq!(self.a.sync.state(), SyncState::AwaitingReadiness);
        assert_eq!(self.b.sync.state(), SyncState::AwaitingReadiness);
    }

    /// Run the election and both readiness milestones.
    pub fn activate(&mut self) {
        self.elect();
        for _ in 0..2 {
            for peer in [&mut self.a, &mut self.b] {
                peer.sync
                    .send_readiness(self.now, &mut peer.game)
                    .expect("readiness");
            }
            self.exchange();
        }
        assert_eq!(self.a.sync.state(), SyncState::Active);
        assert_eq!(self.b.sync.state(), SyncState::Active);
        self.a.events();
        self.b.events();
    }
}

pub fn count_kind(packets: &[Packet], kind: PacketKind) -> usize {
    packets.iter().filter(|p| p.kind() == kind).count()
}
