use crate::config::{DEFAULT_GAME_LENGTH, MAX_GAME_LENGTH, MIN_GAME_LENGTH};
use crate::domain::PeerIdentifier;

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    NotStarted,
    DeterminingPeers,
    SettingOptions,
    /// Countdown before play.
    Starting,
    Running,
    Paused,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    Single,
    Multi,
}

/// Phase, scores and options of the current match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    mode: GameMode,
    phase: MatchPhase,
    game_length: u32,
    scores: [u32; 2],
    countdown_finished: bool,
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            phase: MatchPhase::NotStarted,
            game_length: DEFAULT_GAME_LENGTH,
            scores: [0; 2],
            countdown_finished: false,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: MatchPhase) {
        if self.phase != phase {
            log::debug!("match phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase == MatchPhase::Over
    }

    /// Match length in seconds.
    pub fn game_length(&self) -> u32 {
        self.game_length
    }

    /// Store a new match length, clamped to the allowed range. Returns the
    /// value actually stored.
    pub fn set_game_length(&mut self, seconds: u32) -> u32 {
        self.game_length = seconds.clamp(MIN_GAME_LENGTH, MAX_GAME_LENGTH);
        self.game_length
    }

    pub fn reset_game_length(&mut self) {
        self.game_length = DEFAULT_GAME_LENGTH;
    }

    pub fn score(&self, player: PeerIdentifier) -> u32 {
        player.index().map_or(0, |i| self.scores[i])
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    /// Add points and return the new score. `Undecided` earns nothing.
    pub fn reward_player(&mut self, player: PeerIdentifier, points: u32) -> u32 {
        match player.index() {
            Some(i) => {
                self.scores[i] = self.scores[i].saturating_add(points);
                self.scores[i]
            }
            None => 0,
        }
    }

    pub fn countdown_finished(&self) -> bool {
        self.countdown_finished
    }

    pub fn mark_countdown_finished(&mut self) {
        self.countdown_finished = true;
    }

    pub fn pause(&mut self) {
        if matches!(self.phase, MatchPhase::Starting | MatchPhase::Running) {
            self.set_phase(MatchPhase::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == MatchPhase::Paused {
            let phase = if self.countdown_finished {
                MatchPhase::Running
            } else {
                MatchPhase::Starting
            };
            self.set_phase(phase);
        }
    }

    /// Back to a fresh match. The chosen game length is kept.
    pub fn reset(&mut self) {
        self.phase = MatchPhase::NotStarted;
        self.scores = [0; 2];
        self.countdown_finished = false;
    }
}
