//! Fixed-step game simulation, run by the authority only
//!
//! All arithmetic is on integer pixels. One call to [`PhysicsEngine::step`]
//! advances the paddles, then the ball, then resolves wall and paddle
//! collisions and finally checks whether the ball left the field.

use crate::config::{GameConfig, PaddleDrive};
use crate::protocol::message::to_wire_coordinate;
use crate::types::{Intent, Score, Side, Snapshot};

/// Gate for press-style paddle control
///
/// With a threshold, an intent moves the paddle on its first tick, then
/// holds it until the intent has been active for more than `threshold`
/// ticks, after which it moves every tick.
#[derive(Debug, Clone)]
pub struct HoldGate {
    threshold: Option<u32>,
    active_ticks: u32,
    last: Intent,
}

impl HoldGate {
    pub fn new(threshold: Option<u32>) -> Self {
        Self {
            threshold,
            active_ticks: 0,
            last: Intent::Still,
        }
    }

    /// Whether the paddle moves this tick
    pub fn should_move(&mut self, intent: Intent) -> bool {
        if intent != self.last {
            self.active_ticks = 0;
            self.last = intent;
        }
        if !intent.is_moving() {
            return false;
        }
        let Some(threshold) = self.threshold else {
            return true;
        };
        let first = self.active_ticks == 0;
        self.active_ticks = self.active_ticks.saturating_add(1);
        first || self.active_ticks > threshold
    }

    pub fn reset(&mut self) {
        self.active_ticks = 0;
        self.last = Intent::Still;
    }
}

#[derive(Debug, Clone)]
pub struct Paddle {
    /// Top edge
    pub position: i32,
    pub intent: Intent,
    drive: PaddleDrive,
    gate: HoldGate,
}

impl Paddle {
    fn new(position: i32, drive: PaddleDrive) -> Self {
        Self {
            position,
            intent: Intent::Still,
            drive,
            gate: HoldGate::new(drive.hold_threshold),
        }
    }

    fn advance(&mut self, max: i32) {
        if self.gate.should_move(self.intent) {
            let step = self.intent.direction() * self.drive.speed;
            self.position = (self.position + step).clamp(0, max);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
}

/// A point scored during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    /// Side that won the point
    pub scorer: Side,
    /// Score after the point
    pub score: Score,
    /// The point ended the match
    pub game_over: bool,
}

/// Authoritative simulation of one match
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    config: GameConfig,
    left: Paddle,
    right: Paddle,
    ball: Ball,
    score: Score,
}

impl PhysicsEngine {
    pub fn new(config: GameConfig) -> Self {
        let start = config.paddle_start;
        let (x, y) = config.ball_center();
        Self {
            left: Paddle::new(start, config.drive(Side::Left)),
            right: Paddle::new(start, config.drive(Side::Right)),
            ball: Ball {
                x,
                y,
                vx: config.ball_velocity[0],
                vy: config.ball_velocity[1],
            },
            score: Score::default(),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Live intent of one paddle; the latest value wins
    pub fn set_intent(&mut self, side: Side, intent: Intent) {
        self.paddle_mut(side).intent = intent;
    }

    /// Place the ball, e.g. to set up a situation in tests
    pub fn set_ball(&mut self, ball: Ball) {
        self.ball = ball;
    }

    /// Current replicated state
    ///
    /// The ball may overhang the field edge before it counts as out; the
    /// snapshot holds it at the edge so replicas see the same coordinates.
    pub fn snapshot(&self) -> Snapshot {
        let on_wire = |value: i32| i32::from(to_wire_coordinate(value));
        Snapshot {
            left_paddle: self.left.position,
            right_paddle: self.right.position,
            ball: (on_wire(self.ball.x), on_wire(self.ball.y)),
            score: self.score,
        }
    }

    /// Back to the start of a match: score zero, ball and paddles centered
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) -> (Snapshot, Option<ScoreEvent>) {
        let max = self.config.paddle_max();
        self.left.advance(max);
        self.right.advance(max);

        let prev_x = self.ball.x;
        self.ball.x += self.ball.vx;
        self.ball.y += self.ball.vy;

        self.bounce_walls();
        self.bounce_paddles(prev_x);
        let event = self.check_exit();

        (self.snapshot(), event)
    }

    fn bounce_walls(&mut self) {
        let r = self.config.ball_radius;
        let ball = &mut self.ball;
        if ball.y - r <= 0 && ball.vy < 0 {
            ball.vy = -ball.vy;
            ball.y = r;
        } else if ball.y + r >= self.config.screen_height && ball.vy > 0 {
            ball.vy = -ball.vy;
            ball.y = self.config.screen_height - r;
        }
    }

    fn overlaps(&self, side: Side) -> bool {
        let top = self.paddle(side).position;
        let r = self.config.ball_radius;
        self.ball.y + r >= top && self.ball.y - r <= top + self.config.paddle_height
    }

    fn bounce_paddles(&mut self, prev_x: i32) {
        let r = self.config.ball_radius;
        let pw = self.config.paddle_width;

        if self.ball.vx > 0 {
            // Leading edge crossed the right paddle's face this tick
            let plane = self.config.screen_width - pw;
            if prev_x + r <= plane && self.ball.x + r >= plane && self.overlaps(Side::Right) {
                self.ball.vx = -self.ball.vx;
                self.ball.x = plane - r;
            }
        } else if self.ball.vx < 0 {
            let plane = pw;
            if prev_x - r >= plane && self.ball.x - r <= plane && self.overlaps(Side::Left) {
                self.ball.vx = -self.ball.vx;
                self.ball.x = plane + r;
            }
        }
    }

    fn check_exit(&mut self) -> Option<ScoreEvent> {
        let r = self.config.ball_radius;
        let scorer = if self.ball.x - r > self.config.screen_width {
            Side::Left
        } else if self.ball.x + r < 0 {
            Side::Right
        } else {
            return None;
        };

        if scorer == self.config.authority_side {
            self.score.authority = self.score.authority.saturating_add(1);
        } else {
            self.score.other = self.score.other.saturating_add(1);
        }
        self.serve_toward(scorer.opposite());

        Some(ScoreEvent {
            scorer,
            score: self.score,
            game_over: self.score.reached(self.config.winning_score),
        })
    }

    /// Re-center the ball heading for `side`
    fn serve_toward(&mut self, side: Side) {
        let (x, y) = self.config.ball_center();
        let speed = self.config.ball_velocity[0].abs();
        self.ball = Ball {
            x,
            y,
            vx: match side {
                Side::Left => -speed,
                Side::Right => speed,
            },
            vy: self.config.ball_velocity[1],
        };
    }
}
