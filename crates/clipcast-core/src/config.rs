use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PixelFormat;

// MARK: - CaptureSettings

/// User-facing recording settings.
///
/// Read once at session start; a running session never observes changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Target frame rate for video recordings.
    pub video_frame_rate: u32,
    /// Target frame rate for GIF recordings.
    pub gif_frame_rate: u32,
    /// Maximum GIF output width in pixels; wider captures are downscaled.
    pub gif_max_width: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            video_frame_rate: 30,
            gif_frame_rate: 10,
            gif_max_width: 640,
        }
    }
}

impl CaptureSettings {
    /// Delay between GIF frames, `1 / gif_frame_rate`.
    pub fn gif_frame_delay(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.gif_frame_rate.max(1) as f64)
    }
}

// MARK: - StreamConfig

/// Capture-source configuration for one session.
///
/// Derived from [`CaptureSettings`] when a recording starts and immutable
/// for the session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Lower bound on the interval between delivered frames.
    pub min_frame_interval: Duration,
    /// Source-side frame queue depth.
    pub queue_depth: u32,
    pub shows_cursor: bool,
    pub pixel_format: PixelFormat,
}

impl StreamConfig {
    /// Configuration for a video recording session.
    pub fn for_video(settings: &CaptureSettings) -> Self {
        Self {
            min_frame_interval: interval_for(settings.video_frame_rate),
            queue_depth: 8,
            shows_cursor: true,
            pixel_format: PixelFormat::Bgra,
        }
    }

    /// Configuration for a GIF recording session. The cursor is always
    /// captured for GIFs.
    pub fn for_gif(settings: &CaptureSettings) -> Self {
        Self {
            min_frame_interval: interval_for(settings.gif_frame_rate),
            queue_depth: 5,
            shows_cursor: true,
            pixel_format: PixelFormat::Bgra,
        }
    }

    /// Configuration for a single-still screenshot. The cursor is never
    /// captured in screenshots.
    pub fn for_screenshot() -> Self {
        Self {
            min_frame_interval: interval_for(60),
            queue_depth: 1,
            shows_cursor: false,
            pixel_format: PixelFormat::Bgra,
        }
    }

    /// The frame rate implied by `min_frame_interval`, rounded.
    pub fn frames_per_second(&self) -> u32 {
        let secs = self.min_frame_interval.as_secs_f64();
        if secs <= 0.0 {
            return 60;
        }
        (1.0 / secs).round().max(1.0) as u32
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let settings: CaptureSettings = serde_json::from_str("{}").expect("empty object");
        assert_eq!(settings, CaptureSettings::default());

        let settings: CaptureSettings =
            serde_json::from_str(r#"{"gif_frame_rate": 15}"#).expect("partial object");
        assert_eq!(settings.gif_frame_rate, 15);
        assert_eq!(settings.video_frame_rate, 30);
    }

    #[test]
    fn video_config_matches_settings() {
        let settings = CaptureSettings { video_frame_rate: 60, ..Default::default() };
        let config = StreamConfig::for_video(&settings);
        assert_eq!(config.frames_per_second(), 60);
        assert_eq!(config.queue_depth, 8);
        assert!(config.shows_cursor);
    }

    #[test]
    fn gif_config_forces_cursor_on() {
        let settings = CaptureSettings { gif_frame_rate: 10, ..Default::default() };
        let config = StreamConfig::for_gif(&settings);
        assert!(config.shows_cursor);
        assert_eq!(config.queue_depth, 5);
        assert_eq!(config.min_frame_interval, Duration::from_millis(100));
    }

    #[test]
    fn screenshot_config_hides_cursor() {
        let config = StreamConfig::for_screenshot();
        assert!(!config.shows_cursor);
        assert_eq!(config.queue_depth, 1);
    }

    #[test]
    fn gif_frame_delay_is_reciprocal_of_rate() {
        let settings = CaptureSettings { gif_frame_rate: 20, ..Default::default() };
        assert_eq!(settings.gif_frame_delay(), Duration::from_millis(50));
    }

    #[test]
    fn zero_rate_does_not_panic() {
        let settings = CaptureSettings { gif_frame_rate: 0, video_frame_rate: 0, ..Default::default() };
        assert!(settings.gif_frame_delay() > Duration::ZERO);
        assert!(StreamConfig::for_video(&settings).frames_per_second() >= 1);
    }
}
