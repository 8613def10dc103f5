use crate::protocol::PacketBody;

/// Points both peers must reach together before play continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Milestone {
    /// Both players accepted the options.
    PlayerReady,
    /// Both devices built their match world.
    ActionLayer,
}

impl Milestone {
    fn index(self) -> usize {
        match self {
            Milestone::PlayerReady => 0,
            Milestone::ActionLayer => 1,
        }
    }

    pub fn next(self) -> Option<Milestone> {
        match self {
            Milestone::PlayerReady => Some(Milestone::ActionLayer),
            Milestone::ActionLayer => None,
        }
    }

    pub fn ready_packet(self) -> PacketBody {
        match self {
            Milestone::PlayerReady => PacketBody::PlayerReady,
            Milestone::ActionLayer => PacketBody::ActionLayerReady,
        }
    }

    pub fn ack_packet(self) -> PacketBody {
        match self {
            Milestone::PlayerReady => PacketBody::ReadyAck,
            Milestone::ActionLayer => PacketBody::ActionLayerReadyAck,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Handshake {
    local_sent: bool,
    local_acked: bool,
    remote_ready: bool,
}

impl Handshake {
    fn complete(&self) -> bool {
        self.local_acked && self.remote_ready
    }
}

/// Progress through the two milestones in order.
#[derive(Debug, Clone)]
pub struct Readiness {
    current: Option<Milestone>,
    handshakes: [Handshake; 2],
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            current: Some(Milestone::PlayerReady),
            handshakes: [Handshake::default(); 2],
        }
    }

    /// Milestone being negotiated, `None` once both are done.
    pub fn current(&self) -> Option<Milestone> {
        self.current
    }

    /// Milestone whose ready packet is out and unacknowledged.
    pub fn unacked(&self) -> Option<Milestone> {
        let m = self.current?;
        let h = &self.handshakes[m.index()];
        (h.local_sent && !h.local_acked).then_some(m)
    }

    pub fn mark_sent(&mut self, milestone: Milestone) {
        self.handshakes[milestone.index()].local_sent = true;
    }

    pub fn record_ack(&mut self, milestone: Milestone) -> bool {
        let h = &mut self.handshakes[milestone.index()];
        if h.local_sent && !h.local_acked {
            h.local_acked = true;
            true
        } else {
            false
        }
    }

    /// Remote ready for any milestone is kept, even ahead of the current one.
    pub fn record_remote(&mut self, milestone: Milestone) {
        self.handshakes[milestone.index()].remote_ready = true;
    }

    /// If the current milestone is complete, move past it and return it.
    pub fn take_completed(&mut self) -> Option<Milestone> {
        let m = self.current?;
        if self.handshakes[m.index()].complete() {
            self.current = m.next();
            Some(m)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
