use core::time::Duration;

use crate::config::SyncConfig;
use crate::timer::{Deadline, IntervalTimer};

/// What a liveness poll asks the protocol to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessPoll {
    pub send_heartbeat: bool,
    pub interrupted: bool,
    pub lost: bool,
}

/// Heartbeat schedule plus silence detection.
#[derive(Debug, Clone)]
pub struct Liveness {
    heartbeat: IntervalTimer,
    timeout: Duration,
    window: Duration,
    last_received: Duration,
    reconnect: Deadline,
    interrupted: bool,
    lost: bool,
}

impl Liveness {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            heartbeat: IntervalTimer::new(config.heartbeat_interval),
            timeout: config.heartbeat_timeout(),
            window: config.reconnect_window,
            last_received: Duration::ZERO,
            reconnect: Deadline::new(),
            interrupted: false,
            lost: false,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.heartbeat.start(now);
        self.last_received = now;
        self.interrupted = false;
        self.lost = false;
        self.reconnect.cancel();
    }

    pub fn stop(&mut self) {
        self.heartbeat.cancel();
        self.reconnect.cancel();
        self.interrupted = false;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Record traffic. Returns true when this ends an interruption.
    pub fn touch(&mut self, now: Duration) -> bool {
        self.last_received = now;
        if self.interrupted && !self.lost {
            self.interrupted = false;
            self.reconnect.cancel();
            true
        } else {
            false
        }
    }

    /// Open the reconnect window now. Returns false if it was already open.
    pub fn interrupt(&mut self, now: Duration) -> bool {
        if self.interrupted || self.lost {
            return false;
        }
        self.interrupted = true;
        self.reconnect.arm(now, self.window);
        true
    }

    pub fn poll(&mut self, now: Duration) -> LivenessPoll {
        let mut out = LivenessPoll::default();
        if !self.heartbeat.is_armed() || self.lost {
            return out;
        }
        out.send_heartbeat = self.heartbeat.poll(now) > 0;
        if !self.interrupted && now.saturating_sub(self.last_received) > self.timeout {
            out.interrupted = self.interrupt(now);
        }
        if self.interrupted && self.reconnect.expired(now) {
            self.lost = true;
            out.lost = true;
            self.stop();
        }
        out
    }
}
