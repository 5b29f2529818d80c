//! Configuration for a node and for the game it plays

use serde::Deserialize;

use crate::error::{PongError, Result};
use crate::protocol::FrameIds;
use crate::types::{BusId, NodeId, Score, Side, Snapshot};

/// How a paddle reacts to a held intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaddleDrive {
    /// Pixels moved per active tick
    pub speed: i32,

    /// Press-style input: after the first step the paddle waits this many
    /// ticks before it keeps moving every tick. `None` moves every tick.
    pub hold_threshold: Option<u32>,
}

impl Default for PaddleDrive {
    fn default() -> Self {
        Self {
            speed: 2,
            hold_threshold: None,
        }
    }
}

/// Field geometry and rules, shared by every node of a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    pub paddle_height: i32,
    pub paddle_width: i32,
    pub ball_radius: i32,

    /// Top edge of both paddles at the start of a match
    pub paddle_start: i32,

    /// Ball velocity at the start of a match; its magnitude is reused for serves
    pub ball_velocity: [i32; 2],

    /// Points needed to win
    pub winning_score: u8,

    /// Ticks the ball rests in the center after a point
    pub serve_pause_ticks: u32,

    /// Side whose paddle belongs to the authority
    pub authority_side: Side,

    pub left: PaddleDrive,
    pub right: PaddleDrive,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_width: 128,
            screen_height: 64,
            paddle_height: 20,
            paddle_width: 4,
            ball_radius: 3,
            paddle_start: 22,
            ball_velocity: [1, 1],
            winning_score: 5,
            serve_pause_ticks: 200, // 2 s at 100 Hz
            authority_side: Side::Right,
            left: PaddleDrive::default(),
            right: PaddleDrive::default(),
        }
    }
}

impl GameConfig {
    /// Highest top edge a paddle may reach
    pub fn paddle_max(&self) -> i32 {
        self.screen_height - self.paddle_height
    }

    /// Ball center at the start of a match and after each point
    pub fn ball_center(&self) -> (i32, i32) {
        (self.screen_width / 2, self.screen_height / 2)
    }

    /// Replicated state at the start of a match
    pub fn initial_snapshot(&self) -> Snapshot {
        Snapshot {
            left_paddle: self.paddle_start,
            right_paddle: self.paddle_start,
            ball: self.ball_center(),
            score: Score::default(),
        }
    }

    /// Drive settings of one paddle
    pub fn drive(&self, side: Side) -> PaddleDrive {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Check that the geometry is playable and fits the one-byte wire coordinates
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(PongError::InvalidConfig(reason));

        if !(1..=u8::MAX as i32).contains(&self.screen_width)
            || !(1..=u8::MAX as i32).contains(&self.screen_height)
        {
            return invalid(format!(
                "screen {}x{} does not fit one-byte coordinates",
                self.screen_width, self.screen_height
            ));
        }
        if self.paddle_height <= 0 || self.paddle_height >= self.screen_height {
            return invalid(format!(
                "paddle height {} must be within the screen height {}",
                self.paddle_height, self.screen_height
            ));
        }
        if self.paddle_width <= 0 || self.ball_radius < 0 {
            return invalid("paddle width must be positive and ball radius non-negative".into());
        }
        if 2 * (self.paddle_width + self.ball_radius) >= self.screen_width {
            return invalid("paddles and ball leave no room to play".into());
        }
        if !(0..=self.paddle_max()).contains(&self.paddle_start) {
            return invalid(format!(
                "paddle start {} outside [0, {}]",
                self.paddle_start,
                self.paddle_max()
            ));
        }
        if self.ball_velocity[0] == 0 {
            return invalid("ball needs a horizontal velocity".into());
        }
        if self.winning_score == 0 {
            return invalid("winning score must be at least 1".into());
        }
        if self.left.speed < 0 || self.right.speed < 0 {
            return invalid("paddle speeds must be non-negative".into());
        }
        Ok(())
    }
}

/// How a node obtains its role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolePolicy {
    /// First node to move becomes authority
    #[default]
    FirstMover,
    /// Dedicated host: authority from the first tick
    ForceAuthority,
    /// Thin client: never claims, waits for an authority
    ForceReplica,
}

/// Retransmission settings for control frames sent on a lossy bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redundancy {
    /// Copies of each frame
    pub copies: u8,
    /// Ticks between two copies (0 sends them all at once)
    pub spacing_ticks: u32,
}

impl Default for Redundancy {
    fn default() -> Self {
        Self {
            copies: 3,
            spacing_ticks: 1,
        }
    }
}

/// Main configuration for a node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node identifier, keys the node's traffic on the bus
    pub node_id: NodeId,

    /// Tie-break identifier carried in role claims
    pub bus_id: BusId,

    pub role_policy: RolePolicy,

    /// Control loop period in milliseconds
    pub tick_interval_ms: u64,

    /// Identifier namespace
    pub frame_ids: FrameIds,

    /// Retransmission of role claims and reset requests
    pub redundancy: Redundancy,

    /// Authority re-broadcasts its claim every this many ticks (0 disables)
    pub claim_beacon_ticks: u32,

    /// Upper bound of frames drained from the bus in one tick
    pub max_frames_per_tick: usize,

    /// Warn once when a peer has been silent this many ticks (0 disables)
    pub peer_silence_warn_ticks: u32,

    /// Key expression prefix for bus traffic
    pub keyexpr_prefix: String,

    pub game: GameConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::generate(),
            bus_id: BusId::random(),
            role_policy: RolePolicy::default(),
            tick_interval_ms: 10,
            frame_ids: FrameIds::default(),
            redundancy: Redundancy::default(),
            claim_beacon_ticks: 100,
            max_frames_per_tick: 256,
            peer_silence_warn_ticks: 300,
            keyexpr_prefix: "zenoh/pong".to_string(),
            game: GameConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node identifier
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = node_id;
        self
    }

    /// Set the tie-break identifier
    pub fn with_bus_id(mut self, bus_id: BusId) -> Self {
        self.bus_id = bus_id;
        self
    }

    /// Set how the node obtains its role
    pub fn with_role_policy(mut self, role_policy: RolePolicy) -> Self {
        self.role_policy = role_policy;
        self
    }

    /// Set the control loop period in milliseconds
    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    /// Use the identifier namespace of another group
    pub fn with_group(mut self, group: u16) -> Result<Self> {
        self.frame_ids = FrameIds::for_group(group)?;
        Ok(self)
    }

    /// Set the retransmission of control frames
    pub fn with_redundancy(mut self, redundancy: Redundancy) -> Self {
        self.redundancy = redundancy;
        self
    }

    /// Set the claim beacon period in ticks
    pub fn with_claim_beacon_ticks(mut self, ticks: u32) -> Self {
        self.claim_beacon_ticks = ticks;
        self
    }

    /// Set the key expression prefix
    pub fn with_keyexpr_prefix(mut self, prefix: String) -> Self {
        self.keyexpr_prefix = prefix;
        self
    }

    /// Set the game rules
    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    /// Check the whole configuration before a node starts
    pub fn validate(&self) -> Result<()> {
        self.game.validate()?;
        if self.redundancy.copies == 0 {
            return Err(PongError::InvalidConfig(
                "control frames need at least one copy".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(PongError::InvalidConfig(
                "tick interval must be at least 1 ms".to_string(),
            ));
        }
        if self.max_frames_per_tick == 0 {
            return Err(PongError::InvalidConfig(
                "at least one frame must be drained per tick".to_string(),
            ));
        }
        Ok(())
    }
}
