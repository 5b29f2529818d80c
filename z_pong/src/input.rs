use std::time::{Duration, Instant};

use zenoh_pong::{InputSample, InputSource, Intent};

/// Key presses understood by the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Up,
    Down,
    Restart,
}

impl KeyEvent {
    pub fn from_key(key: &console::Key) -> Option<Self> {
        match key {
            console::Key::ArrowUp | console::Key::Char('w') => Some(KeyEvent::Up),
            console::Key::ArrowDown | console::Key::Char('s') => Some(KeyEvent::Down),
            console::Key::Char('r') | console::Key::Enter => Some(KeyEvent::Restart),
            _ => None,
        }
    }
}

/// Keyboard input source
///
/// Terminals report key presses and auto-repeat but no releases, so a
/// direction is held for `latch` after its last press.
pub struct KeyboardInput {
    events: flume::Receiver<KeyEvent>,
    latch: Duration,
    held: Option<(Intent, Instant)>,
}

impl KeyboardInput {
    pub fn new(events: flume::Receiver<KeyEvent>, latch: Duration) -> Self {
        Self {
            events,
            latch,
            held: None,
        }
    }

    pub fn poll_at(&mut self, now: Instant) -> InputSample {
        let mut restart = false;
        for event in self.events.try_iter() {
            match event {
                KeyEvent::Up => self.held = Some((Intent::MoveUp, now)),
                KeyEvent::Down => self.held = Some((Intent::MoveDown, now)),
                KeyEvent::Restart => restart = true,
            }
        }

        let intent = match self.held {
            Some((intent, pressed)) if now.duration_since(pressed) < self.latch => intent,
            _ => {
                self.held = None;
                Intent::Still
            }
        };
        InputSample { intent, restart }
    }
}

impl InputSource for KeyboardInput {
    fn poll(&mut self) -> InputSample {
        self.poll_at(Instant::now())
    }
}
