//! Eased tween between two values
//!
//! A tween is a single timed segment: a start value, an end value, a
//! duration, an optional start delay, and an easing curve. Position is
//! tracked along the forward axis regardless of playback direction, so
//! reversing mid-flight replays the same curve backwards from the
//! current position and lands exactly on the original start value.

use crate::easing::Easing;
use crate::interpolate::Interpolate;

/// Playback direction of a tween
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayDirection {
    #[default]
    Forward,
    Reverse,
}

/// A single eased animation segment
#[derive(Clone, Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration_ms: u32,
    delay_ms: u32,
    easing: Easing,
    /// Position along the forward axis, 0.0 to duration_ms
    position_ms: f32,
    /// Delay remaining before motion starts
    delay_left_ms: f32,
    direction: PlayDirection,
    playing: bool,
}

impl Tween {
    /// Create a tween from `from` to `to` over `duration_ms`
    pub fn new(from: f32, to: f32, duration_ms: u32) -> Self {
        Self {
            from,
            to,
            duration_ms,
            delay_ms: 0,
            easing: Easing::default(),
            position_ms: 0.0,
            delay_left_ms: 0.0,
            direction: PlayDirection::Forward,
            playing: false,
        }
    }

    /// Set the easing curve (builder pattern)
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set the start delay in milliseconds (builder pattern)
    pub fn delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Start from the beginning, playing forward with the full delay
    pub fn start(&mut self) {
        self.position_ms = 0.0;
        self.delay_left_ms = self.delay_ms as f32;
        self.direction = PlayDirection::Forward;
        self.playing = true;
    }

    /// Continue from the current position in the given direction
    ///
    /// Unlike [`start`](Tween::start) this does not reset position and
    /// does not re-apply the delay.
    pub fn play(&mut self, direction: PlayDirection) {
        self.direction = direction;
        self.delay_left_ms = 0.0;
        self.playing = true;
    }

    /// Flip playback direction from the current position
    ///
    /// The delay is skipped; the value retraces the same eased curve.
    pub fn reverse(&mut self) {
        let flipped = match self.direction {
            PlayDirection::Forward => PlayDirection::Reverse,
            PlayDirection::Reverse => PlayDirection::Forward,
        };
        self.play(flipped);
    }

    /// Stop without changing position
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Jump to the end of the current direction and stop
    pub fn finish(&mut self) {
        self.position_ms = match self.direction {
            PlayDirection::Forward => self.duration_ms as f32,
            PlayDirection::Reverse => 0.0,
        };
        self.delay_left_ms = 0.0;
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn direction(&self) -> PlayDirection {
        self.direction
    }

    /// Progress along the forward axis, 0.0 to 1.0
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return match self.direction {
                PlayDirection::Forward => 1.0,
                PlayDirection::Reverse => 0.0,
            };
        }
        (self.position_ms / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    /// Current interpolated value
    pub fn value(&self) -> f32 {
        let eased = self.easing.apply(self.progress());
        self.from.lerp(&self.to, eased)
    }

    /// Advance by delta time (in milliseconds)
    pub fn tick(&mut self, dt_ms: f32) {
        if !self.playing {
            return;
        }

        let mut dt_ms = dt_ms;
        if self.delay_left_ms > 0.0 {
            if dt_ms < self.delay_left_ms {
                self.delay_left_ms -= dt_ms;
                return;
            }
            dt_ms -= self.delay_left_ms;
            self.delay_left_ms = 0.0;
        }

        match self.direction {
            PlayDirection::Forward => {
                self.position_ms += dt_ms;
                if self.position_ms >= self.duration_ms as f32 {
                    self.position_ms = self.duration_ms as f32;
                    self.playing = false;
                }
            }
            PlayDirection::Reverse => {
                self.position_ms -= dt_ms;
                if self.position_ms <= 0.0 {
                    self.position_ms = 0.0;
                    self.playing = false;
                }
            }
        }
    }
}
