//! Keyboard pointer navigation for the scroll and grab interceptors.
//!
//! Holding a direction key repeats it; once it has been held for longer
//! than the ramp-up time every further repeat moves one sensitivity step
//! faster.  Releasing the key resets the speed.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Navigation keys and speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub left: char,
    pub down: char,
    pub up: char,
    pub right: char,
    /// Pixels per key repeat while dragging.
    pub move_pixel_sensitivity: i32,
    pub move_rampup_time_ms: u64,
    /// Wheel steps per key repeat while scrolling.
    pub scroll_sensitivity: i32,
    pub scroll_rampup_time_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            left: 'h',
            down: 'j',
            up: 'k',
            right: 'l',
            move_pixel_sensitivity: 10,
            move_rampup_time_ms: 500,
            scroll_sensitivity: 5,
            scroll_rampup_time_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Pointer movement, screen axes (`+y` is down).
    Move,
    /// Wheel scrolling (`+y` scrolls up).
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Down,
    Up,
    Right,
}

/// Turns navigation key presses into `(dx, dy)` deltas.
pub struct Navigator {
    mode: NavigationMode,
    left: char,
    down: char,
    up: char,
    right: char,
    step: i32,
    rampup: Duration,
    pressed_since: Option<Instant>,
    speed: i32,
}

impl Navigator {
    pub fn new(mode: NavigationMode, config: &NavigationConfig) -> Self {
        let (step, rampup_ms) = match mode {
            NavigationMode::Move => (config.move_pixel_sensitivity, config.move_rampup_time_ms),
            NavigationMode::Scroll => (config.scroll_sensitivity, config.scroll_rampup_time_ms),
        };
        Self {
            mode,
            left: config.left,
            down: config.down,
            up: config.up,
            right: config.right,
            step,
            rampup: Duration::from_millis(rampup_ms),
            pressed_since: None,
            speed: step,
        }
    }

    fn direction(&self, key: char) -> Option<Direction> {
        let key = key.to_lowercase().next().unwrap_or(key);
        if key == self.left {
            Some(Direction::Left)
        } else if key == self.down {
            Some(Direction::Down)
        } else if key == self.up {
            Some(Direction::Up)
        } else if key == self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }

    /// Delta for a (possibly repeated) press of `key` at `now`, or `None`
    /// for keys that are not navigation keys.
    pub fn key_pressed(&mut self, key: char, now: Instant) -> Option<(i32, i32)> {
        let direction = self.direction(key)?;
        match self.pressed_since {
            None => self.pressed_since = Some(now),
            Some(since) if now.duration_since(since) >= self.rampup => {
                self.speed = self.speed.saturating_add(self.step);
            }
            Some(_) => {}
        }

        let s = self.speed;
        Some(match (direction, self.mode) {
            (Direction::Left, _) => (-s, 0),
            (Direction::Right, _) => (s, 0),
            (Direction::Up, NavigationMode::Move) => (0, -s),
            (Direction::Down, NavigationMode::Move) => (0, s),
            (Direction::Up, NavigationMode::Scroll) => (0, s),
            (Direction::Down, NavigationMode::Scroll) => (0, -s),
        })
    }

    pub fn key_released(&mut self) {
        self.pressed_since = None;
        self.speed = self.step;
    }
}
