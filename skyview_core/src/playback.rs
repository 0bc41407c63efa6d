//! Playback controller: frame index, play/pause, interval.
//!
//! The controller is a plain state machine. It does not own a timer; the
//! viewer runtime asks for [`PlaybackController::timer_period`] and calls
//! [`PlaybackController::tick`] when the period elapses. Whenever
//! [`PlaybackController::timer_key`] changes the runtime re-arms its timer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::PlaybackConfig;

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_frame: usize,
    pub is_playing: bool,
    pub playback_speed_ms: u64,
}

/// Everything the playback timer depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub is_playing: bool,
    pub speed_ms: u64,
    pub frame_count: usize,
    pub interacting: bool,
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    limits: PlaybackConfig,
    frame_count: usize,
    current_frame: usize,
    is_playing: bool,
    speed_ms: u64,
    interacting: bool,
}

impl PlaybackController {
    pub fn new(limits: PlaybackConfig) -> Self {
        Self {
            speed_ms: limits.clamp_speed(limits.default_speed_ms),
            limits,
            frame_count: 0,
            current_frame: 0,
            is_playing: false,
            interacting: false,
        }
    }

    /// Resets for a newly loaded log: frame 0, stopped, not interacting.
    ///
    /// The playback speed is kept.
    pub fn load(&mut self, frame_count: usize) {
        self.frame_count = frame_count;
        self.current_frame = 0;
        self.is_playing = false;
        self.interacting = false;
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn max_frame(&self) -> usize {
        self.frame_count.saturating_sub(1)
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    /// True when there is something to play.
    pub fn is_enabled(&self) -> bool {
        self.frame_count > 0
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_frame: self.current_frame,
            is_playing: self.is_playing,
            playback_speed_ms: self.speed_ms,
        }
    }

    /// Flips play/pause. Has no effect on an empty log.
    pub fn toggle(&mut self) -> bool {
        if self.is_enabled() {
            self.is_playing = !self.is_playing;
        }
        self.is_playing
    }

    pub fn play(&mut self) {
        if self.is_enabled() {
            self.is_playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Jumps to frame 0 without changing play state. Returns true if the frame changed.
    pub fn reset(&mut self) -> bool {
        self.set_frame(0)
    }

    /// Moves to `frame`, clamped to the last frame. Returns true if the frame changed.
    pub fn scrub(&mut self, frame: usize) -> bool {
        self.set_frame(frame.min(self.max_frame()))
    }

    fn set_frame(&mut self, frame: usize) -> bool {
        let changed = self.current_frame != frame;
        self.current_frame = frame;
        changed
    }

    /// Sets the playback interval, clamped to the configured limits.
    pub fn set_speed(&mut self, speed_ms: u64) -> u64 {
        self.speed_ms = self.limits.clamp_speed(speed_ms);
        self.speed_ms
    }

    /// Shortens the interval by one step.
    pub fn speed_up(&mut self) -> u64 {
        self.set_speed(self.speed_ms.saturating_sub(self.limits.speed_step_ms))
    }

    /// Lengthens the interval by one step.
    pub fn slow_down(&mut self) -> u64 {
        self.set_speed(self.speed_ms.saturating_add(self.limits.speed_step_ms))
    }

    pub fn set_interacting(&mut self, interacting: bool) {
        self.interacting = interacting;
    }

    /// Interval of the recurring timer, `None` when it must not run.
    pub fn timer_period(&self) -> Option<Duration> {
        (self.is_playing && !self.interacting && self.is_enabled()).then(|| Duration::from_millis(self.speed_ms))
    }

    pub fn timer_key(&self) -> TimerKey {
        TimerKey {
            is_playing: self.is_playing,
            speed_ms: self.speed_ms,
            frame_count: self.frame_count,
            interacting: self.interacting,
        }
    }

    /// Advances one frame, wrapping to 0 after the last.
    ///
    /// Returns the new frame, or `None` when playback is stopped, the user is
    /// interacting, or there are no frames.
    pub fn tick(&mut self) -> Option<usize> {
        self.timer_period()?;
        self.current_frame = if self.current_frame >= self.max_frame() {
            0
        } else {
            self.current_frame + 1
        };
        Some(self.current_frame)
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}
