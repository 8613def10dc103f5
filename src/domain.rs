//! Value types shared by the simulation and the wire protocol.

/// Point or displacement in screen coordinates (origin bottom-left, y up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        libm::sqrtf(dx * dx + dy * dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Point reached by travelling `distance` along `heading` (degrees,
    /// 0 = up, clockwise).
    pub fn advance(self, heading: f32, distance: f32) -> Vec2 {
        let radians = heading.to_radians();
        Vec2 {
            x: self.x + libm::sinf(radians) * distance,
            y: self.y + libm::cosf(radians) * distance,
        }
    }

    /// Heading in degrees that points from `self` towards `target`.
    pub fn heading_to(self, target: Vec2) -> f32 {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        normalize_heading(libm::atan2f(dx, dy).to_degrees())
    }
}

/// Wrap a heading into `[0, 360)`.
pub fn normalize_heading(heading: f32) -> f32 {
    let wrapped = heading % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Role assigned to each device by the die roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerIdentifier {
    #[default]
    Undecided,
    One,
    Two,
}

impl PeerIdentifier {
    /// The other player. `Undecided` has no opponent.
    pub fn opponent(self) -> PeerIdentifier {
        match self {
            PeerIdentifier::One => PeerIdentifier::Two,
            PeerIdentifier::Two => PeerIdentifier::One,
            PeerIdentifier::Undecided => PeerIdentifier::Undecided,
        }
    }

    /// Index into per-player arrays such as scores.
    pub fn index(self) -> Option<usize> {
        match self {
            PeerIdentifier::One => Some(0),
            PeerIdentifier::Two => Some(1),
            PeerIdentifier::Undecided => None,
        }
    }
}

/// Kinds of target ship. Small ones are common and fragile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetType {
    Small,
    Large,
}

impl TargetType {
    pub const ALL: [TargetType; 2] = [TargetType::Small, TargetType::Large];

    pub fn index(self) -> usize {
        match self {
            TargetType::Small => 0,
            TargetType::Large => 1,
        }
    }
}

/// Kinematic snapshot of a player ship at send time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionalUpdate {
    pub heading: f32,
    pub speed: f32,
    pub position: Vec2,
    pub rotation: f32,
}

impl DirectionalUpdate {
    pub fn is_finite(&self) -> bool {
        self.heading.is_finite()
            && self.speed.is_finite()
            && self.rotation.is_finite()
            && self.position.is_finite()
    }
}

/// Details the peer needs to mirror a spawned target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetSpawnInfo {
    pub target_type: TargetType,
    pub heading: f32,
    pub position: Vec2,
}

impl TargetSpawnInfo {
    pub fn is_finite(&self) -> bool {
        self.heading.is_finite() && self.position.is_finite()
    }
}

/// Path of a fired projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectileInfo {
    pub start: Vec2,
    pub destination: Vec2,
}

impl ProjectileInfo {
    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.destination.is_finite()
    }
}

/// New heading and speed produced by the steering input mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalChange {
    pub heading: f32,
    pub speed: f32,
}
