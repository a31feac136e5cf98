use chess::Color;
use std::time::Instant;

/// Outcome of advancing the clocks by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No clock is running.
    Idle,
    /// The active clock counted down and still has time left.
    Running,
    /// The active clock reached zero; the named side ran out of time.
    Flagged(Color),
}

/// Countdown clocks for both sides. At most one side runs at a time.
pub struct ClockPair {
    white_time_ms: u64,
    black_time_ms: u64,
    initial_ms: u64,
    active: Option<Color>,
    last_tick: Option<Instant>,
}

impl ClockPair {
    pub fn new(initial_ms: u64) -> Self {
        ClockPair {
            white_time_ms: initial_ms,
            black_time_ms: initial_ms,
            initial_ms,
            active: None,
            last_tick: None,
        }
    }

    /// Reset both sides to a fresh time budget and stop the countdown.
    pub fn reset(&mut self, initial_ms: u64) {
        self.white_time_ms = initial_ms;
        self.black_time_ms = initial_ms;
        self.initial_ms = initial_ms;
        self.active = None;
        self.last_tick = None;
    }

    pub fn initial_ms(&self) -> u64 {
        self.initial_ms
    }

    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_time_ms,
            Color::Black => self.black_time_ms,
        }
    }

    /// Overwrite one side's remaining time, used when resuming a stored game.
    pub fn set_remaining(&mut self, color: Color, ms: u64) {
        match color {
            Color::White => self.white_time_ms = ms,
            Color::Black => self.black_time_ms = ms,
        }
    }

    pub fn active_side(&self) -> Option<Color> {
        self.active
    }

    /// Start counting down for one side from this instant.
    pub fn activate(&mut self, color: Color, now: Instant) {
        self.active = Some(color);
        self.last_tick = Some(now);
    }

    /// Stop both clocks without touching the remaining times.
    pub fn deactivate(&mut self) {
        self.active = None;
        self.last_tick = None;
    }

    /// Advance the active clock by the wall time elapsed since the previous tick.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let color = match self.active {
            Some(color) => color,
            None => return TickOutcome::Idle,
        };
        let elapsed = match self.last_tick {
            Some(last) => now.duration_since(last).as_millis() as u64,
            None => 0,
        };
        self.last_tick = Some(now);
        let remaining = match color {
            Color::White => {
                self.white_time_ms = self.white_time_ms.saturating_sub(elapsed);
                self.white_time_ms
            }
            Color::Black => {
                self.black_time_ms = self.black_time_ms.saturating_sub(elapsed);
                self.black_time_ms
            }
        };
        if remaining == 0 {
            self.deactivate();
            TickOutcome::Flagged(color)
        } else {
            TickOutcome::Running
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod clock_tests;
