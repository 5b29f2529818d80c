/// Core types for the zenoh-pong library
use crate::error::{PongError, Result};
use crate::node::name_generator;

/// Unique node identifier
///
/// NodeId must be a valid single-chunk keyexpr:
/// - Non-empty UTF-8 string
/// - Cannot contain: / * $ ? # @
/// - Must be a single chunk (no slashes)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a new node ID with a human-readable name
    /// and a numeric suffix for uniqueness
    pub fn generate() -> Self {
        NodeId(name_generator::generate_unique_name())
    }

    /// Create from a specific name (must be unique and keyexpr-compatible)
    /// Returns error if name contains invalid characters
    pub fn from_name(name: String) -> Result<Self> {
        Self::validate(&name)?;
        Ok(NodeId(name))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that a string can be used as NodeId (single keyexpr chunk)
    fn validate(s: &str) -> Result<()> {
        if s.is_empty() {
            return Err(PongError::InvalidNodeName(
                "Node name cannot be empty".to_string(),
            ));
        }

        for ch in s.chars() {
            if matches!(ch, '/' | '*' | '$' | '?' | '#' | '@') {
                return Err(PongError::InvalidNodeName(format!(
                    "Node name '{}' contains invalid character '{}'",
                    s, ch
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static per-node identifier carried in role claims.
///
/// When two nodes claim authority at the same time the lower id wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(pub u8);

impl BusId {
    /// Pick a random bus id
    pub fn random() -> Self {
        BusId(rand::random::<u8>())
    }
}

impl std::fmt::Display for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node role in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRole {
    /// No role yet - waiting for a local move or a remote claim
    #[default]
    Unassigned,
    /// Runs the physics engine and publishes ground truth
    Authority,
    /// Renders state received from the authority and relays input
    Replica,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Unassigned => write!(f, "unassigned"),
            NodeRole::Authority => write!(f, "authority"),
            NodeRole::Replica => write!(f, "replica"),
        }
    }
}

/// Side of the field a paddle lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The other side of the field
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Discrete movement intent sampled from an input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    #[default]
    Still,
    MoveUp,
    MoveDown,
}

impl Intent {
    /// Wire encoding (0 = still, 1 = up, 2 = down)
    pub fn to_byte(self) -> u8 {
        match self {
            Intent::Still => 0,
            Intent::MoveUp => 1,
            Intent::MoveDown => 2,
        }
    }

    /// Decode the wire encoding, `None` for unknown values
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Intent::Still),
            1 => Some(Intent::MoveUp),
            2 => Some(Intent::MoveDown),
            _ => None,
        }
    }

    /// Vertical direction in screen space (up is negative)
    pub fn direction(self) -> i32 {
        match self {
            Intent::Still => 0,
            Intent::MoveUp => -1,
            Intent::MoveDown => 1,
        }
    }

    pub fn is_moving(self) -> bool {
        self != Intent::Still
    }
}

/// Session lifecycle phase of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No role assigned yet
    #[default]
    WaitingForRole,
    /// Game running
    Playing,
    /// Short break after a point, counting down to the serve
    Paused {
        /// Ticks left before play resumes
        remaining_ticks: u32,
    },
    /// A side reached the winning score
    GameOver,
    /// Restart requested, waiting for the authority's acknowledgement
    Resetting,
}

impl SessionPhase {
    /// Playing or in the serve pause
    pub fn is_in_play(&self) -> bool {
        matches!(self, SessionPhase::Playing | SessionPhase::Paused { .. })
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::WaitingForRole => write!(f, "Waiting for role..."),
            SessionPhase::Playing => write!(f, "Playing"),
            SessionPhase::Paused { remaining_ticks } => {
                write!(f, "Paused ({} ticks to serve)", remaining_ticks)
            }
            SessionPhase::GameOver => write!(f, "Game over"),
            SessionPhase::Resetting => write!(f, "Resetting..."),
        }
    }
}

/// Points of both sides, relative to the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    /// Points of the side owned by the authority
    pub authority: u8,
    /// Points of the other side
    pub other: u8,
}

impl Score {
    pub fn new(authority: u8, other: u8) -> Self {
        Self { authority, other }
    }

    /// Highest of both scores
    pub fn leader_points(&self) -> u8 {
        self.authority.max(self.other)
    }

    /// Whether either side has reached `threshold`
    pub fn reached(&self, threshold: u8) -> bool {
        self.leader_points() >= threshold
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02} - {:02}", self.authority, self.other)
    }
}

/// The replicated part of the game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub left_paddle: i32,
    pub right_paddle: i32,
    pub ball: (i32, i32),
    pub score: Score,
}

impl Snapshot {
    /// Paddle position of `side`
    pub fn paddle(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left_paddle,
            Side::Right => self.right_paddle,
        }
    }

    pub fn set_paddle(&mut self, side: Side, position: i32) {
        match side {
            Side::Left => self.left_paddle = position,
            Side::Right => self.right_paddle = position,
        }
    }
}

/// Result of a finished match as seen from one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Won,
    Lost,
}

/// Everything a render sink needs to draw one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishableState {
    pub role: NodeRole,
    pub phase: SessionPhase,
    /// Side controlled by this node, `None` while unassigned
    pub local_side: Option<Side>,
    /// Side owned by the authority
    pub authority_side: Side,
    pub snapshot: Snapshot,
    pub winning_score: u8,
    pub screen_width: i32,
}

impl PublishableState {
    /// Points of the given side
    pub fn points(&self, side: Side) -> u8 {
        if side == self.authority_side {
            self.snapshot.score.authority
        } else {
            self.snapshot.score.other
        }
    }

    /// Win or loss of the local side once a side reached the winning score
    pub fn outcome(&self) -> Option<MatchOutcome> {
        let side = self.local_side?;
        if !self.snapshot.score.reached(self.winning_score) {
            return None;
        }
        if self.points(side) >= self.winning_score {
            Some(MatchOutcome::Won)
        } else {
            Some(MatchOutcome::Lost)
        }
    }

    /// Same state flipped horizontally, so a left-side player sees
    /// its own paddle on the right
    pub fn mirrored(&self) -> Self {
        let mut mirrored = self.clone();
        mirrored.snapshot.left_paddle = self.snapshot.right_paddle;
        mirrored.snapshot.right_paddle = self.snapshot.left_paddle;
        mirrored.snapshot.ball.0 = self.screen_width - self.snapshot.ball.0;
        mirrored.local_side = self.local_side.map(Side::opposite);
        mirrored.authority_side = self.authority_side.opposite();
        mirrored
    }
}
