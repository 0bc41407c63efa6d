//! Viewer configuration.

use std::time::Duration;

use crate::layout::RenderConfig;
use crate::traces::TRAIL_WINDOW;

/// Playback interval limits in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Interval used when a viewer starts (default: 250)
    pub default_speed_ms: u64,

    /// Fastest allowed interval (default: 50)
    pub min_speed_ms: u64,

    /// Slowest allowed interval (default: 1000)
    pub max_speed_ms: u64,

    /// Increment for speed up / slow down (default: 50)
    pub speed_step_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed_ms: 250,
            min_speed_ms: 50,
            max_speed_ms: 1000,
            speed_step_ms: 50,
        }
    }
}

impl PlaybackConfig {
    /// Clamps an interval into `[min_speed_ms, max_speed_ms]`.
    pub fn clamp_speed(&self, speed_ms: u64) -> u64 {
        let (lo, hi) = if self.min_speed_ms <= self.max_speed_ms {
            (self.min_speed_ms, self.max_speed_ms)
        } else {
            (self.max_speed_ms, self.min_speed_ms)
        };
        speed_ms.clamp(lo.max(1), hi.max(1))
    }
}

/// Configuration for a viewer session.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Name used in log lines
    pub name: String,

    pub playback: PlaybackConfig,

    /// Steps of trail drawn behind each drone (default: 100)
    pub trail_window: usize,

    /// Goal radius when the log does not set one (default: 1.0)
    pub default_goal_threshold: f64,

    /// Drone radius when the log does not set one (default: 0.1)
    pub default_drone_radius: f64,

    pub render: RenderConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            name: "skyview".to_string(),
            playback: PlaybackConfig::default(),
            trail_window: TRAIL_WINDOW,
            default_goal_threshold: 1.0,
            default_drone_radius: 0.1,
            render: RenderConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_playback_speed(mut self, speed_ms: u64) -> Self {
        self.playback.default_speed_ms = self.playback.clamp_speed(speed_ms);
        self
    }

    pub fn with_trail_window(mut self, window: usize) -> Self {
        self.trail_window = window.max(1);
        self
    }

    pub fn with_default_drone_radius(mut self, radius: f64) -> Self {
        self.default_drone_radius = radius;
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Default playback interval as a duration.
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.playback.clamp_speed(self.playback.default_speed_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();

        assert_eq!(config.playback.default_speed_ms, 250);
        assert_eq!(config.trail_window, 100);
        assert_eq!(config.default_goal_threshold, 1.0);
        assert!(config.render.responsive);
        assert!(!config.render.display_logo);
        assert_eq!(config.default_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_speed_is_clamped() {
        let config = ViewerConfig::default().with_playback_speed(5);
        assert_eq!(config.playback.default_speed_ms, 50);

        let config = ViewerConfig::default().with_playback_speed(60_000);
        assert_eq!(config.playback.default_speed_ms, 1000);
    }
}
