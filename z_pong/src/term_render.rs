use std::time::{Duration, Instant};

use console::Term;
use zenoh_pong::{MatchOutcome, NodeRole, PublishableState, RenderSink, SessionPhase, Side};

/// Field pixels covered by one terminal cell
const CELL_WIDTH: i32 = 2;
const CELL_HEIGHT: i32 = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TermCell {
    Empty,
    Paddle,
    Ball,
    Net,
    BorderVertical,
    BorderHorizontal,
    BorderCorner,
}

pub trait TermStyle {
    fn display(&self, cell: TermCell) -> &'static str;
}

pub struct PlainTermStyle;

impl TermStyle for PlainTermStyle {
    fn display(&self, cell: TermCell) -> &'static str {
        match cell {
            TermCell::Empty => " ",
            TermCell::Paddle => "#",
            TermCell::Ball => "O",
            TermCell::Net => ":",
            TermCell::BorderVertical => "|",
            TermCell::BorderHorizontal => "-",
            TermCell::BorderCorner => "+",
        }
    }
}

pub struct AnsiTermStyle;

impl TermStyle for AnsiTermStyle {
    fn display(&self, cell: TermCell) -> &'static str {
        match cell {
            TermCell::Empty => "\x1b[0m ",
            TermCell::Paddle => "\x1b[0;36m█",
            TermCell::Ball => "\x1b[0;33m●",
            TermCell::Net => "\x1b[0;90m┊",
            TermCell::BorderVertical => "\x1b[0m│",
            TermCell::BorderHorizontal => "\x1b[0m─",
            TermCell::BorderCorner => "\x1b[0m+",
        }
    }
}

/// Rasterize the field of `state` into terminal cells, border included
pub fn field_cells(
    state: &PublishableState,
    screen_height: i32,
    paddle_height: i32,
    paddle_width: i32,
) -> Vec<Vec<TermCell>> {
    let cols = (state.screen_width + CELL_WIDTH - 1) / CELL_WIDTH;
    let rows = (screen_height + CELL_HEIGHT - 1) / CELL_HEIGHT;
    let snapshot = &state.snapshot;
    let (ball_x, ball_y) = snapshot.ball;
    let paddle_cols = (paddle_width + CELL_WIDTH - 1) / CELL_WIDTH;

    let mut border = vec![TermCell::BorderHorizontal; cols as usize];
    border.insert(0, TermCell::BorderCorner);
    border.push(TermCell::BorderCorner);

    let mut lines = vec![border.clone()];
    for row in 0..rows {
        let top = row * CELL_HEIGHT;
        let bottom = top + CELL_HEIGHT;
        let mut line = vec![TermCell::BorderVertical];
        for col in 0..cols {
            let left = col * CELL_WIDTH;
            let right = left + CELL_WIDTH;
            let covers =
                |x: i32, y0: i32, y1: i32| x >= left && x < right && y1 > top && y0 < bottom;

            let cell = if covers(ball_x, ball_y, ball_y + 1) {
                TermCell::Ball
            } else if col < paddle_cols
                && covers(left, snapshot.left_paddle, snapshot.left_paddle + paddle_height)
            {
                TermCell::Paddle
            } else if col >= cols - paddle_cols
                && covers(left, snapshot.right_paddle, snapshot.right_paddle + paddle_height)
            {
                TermCell::Paddle
            } else if col == cols / 2 && row % 2 == 0 {
                TermCell::Net
            } else {
                TermCell::Empty
            };
            line.push(cell);
        }
        line.push(TermCell::BorderVertical);
        lines.push(line);
    }
    lines.push(border);
    lines
}

/// Status line above the field
pub fn status_line(state: &PublishableState) -> String {
    let score = format!(
        "{:02} : {:02}",
        state.points(Side::Left),
        state.points(Side::Right)
    );
    let side = match (state.role, state.local_side) {
        (NodeRole::Unassigned, _) | (_, None) => "move to claim the serve".to_string(),
        (role, Some(side)) => format!("{} playing {:?}", role, side),
    };
    let phase = match (state.phase, state.outcome()) {
        (SessionPhase::GameOver, Some(MatchOutcome::Won)) => {
            "You win! Press r to play again".to_string()
        }
        (SessionPhase::GameOver, Some(MatchOutcome::Lost)) => {
            "You lose. Press r to play again".to_string()
        }
        (phase, _) => phase.to_string(),
    };
    format!("{}   [{}]   {}", score, side, phase)
}

/// Terminal render sink, throttled to a fixed frame rate
pub struct TermRender<S> {
    term: Term,
    style: S,
    mirror: bool,
    screen_height: i32,
    paddle_height: i32,
    paddle_width: i32,
    frame_interval: Duration,
    last_frame: Option<Instant>,
}

impl<S: TermStyle> TermRender<S> {
    pub fn new(term: Term, style: S, game: &zenoh_pong::GameConfig, mirror: bool) -> Self {
        Self {
            term,
            style,
            mirror,
            screen_height: game.screen_height,
            paddle_height: game.paddle_height,
            paddle_width: game.paddle_width,
            frame_interval: Duration::from_millis(50), // 20 FPS
            last_frame: None,
        }
    }

    /// Text lines of one frame
    pub fn lines(&self, state: &PublishableState) -> Vec<String> {
        // A left-side player sees itself on the right when mirroring
        let view = if self.mirror && state.local_side == Some(Side::Left) {
            state.mirrored()
        } else {
            state.clone()
        };

        let mut lines = vec![status_line(&view)];
        for row in field_cells(&view, self.screen_height, self.paddle_height, self.paddle_width) {
            let line: String = row.into_iter().map(|cell| self.style.display(cell)).collect();
            lines.push(line);
        }
        lines
    }

    fn draw(&self, state: &PublishableState) -> std::io::Result<()> {
        self.term.move_cursor_to(0, 0)?;
        for line in self.lines(state) {
            self.term.clear_line()?;
            self.term.write_line(&line)?;
        }
        self.term.flush()
    }
}

impl<S: TermStyle> RenderSink for TermRender<S> {
    fn present(&mut self, state: &PublishableState) {
        let now = Instant::now();
        if self
            .last_frame
            .is_some_and(|last| now.duration_since(last) < self.frame_interval)
        {
            return;
        }
        self.last_frame = Some(now);
        if let Err(e) = self.draw(state) {
            tracing::debug!("Failed to draw frame: {}", e);
        }
    }
}
