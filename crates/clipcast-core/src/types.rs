use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// MARK: - Rect

/// Axis-aligned rectangle in display-local points (origin top-left, Y-down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

// MARK: - CaptureRegion

/// What to capture: a rectangle on one display, plus the display's
/// backing scale factor. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Selection in display-local points.
    pub source_rect: Rect,
    /// Opaque display handle (X screen number on Linux).
    pub display_id: u32,
    /// Points-to-pixels scale factor, > 0.
    pub scale_factor: f64,
}

impl CaptureRegion {
    pub fn new(source_rect: Rect, display_id: u32, scale_factor: f64) -> Self {
        Self { source_rect, display_id, scale_factor }
    }

    /// Output width in pixels, rounded down.
    pub fn pixel_width(&self) -> u32 {
        (self.source_rect.width * self.scale_factor) as u32
    }

    /// Output height in pixels, rounded down.
    pub fn pixel_height(&self) -> u32 {
        (self.source_rect.height * self.scale_factor) as u32
    }

    /// Top-left corner in pixels, rounded down.
    pub fn pixel_origin(&self) -> (u32, u32) {
        (
            (self.source_rect.x * self.scale_factor) as u32,
            (self.source_rect.y * self.scale_factor) as u32,
        )
    }
}

// MARK: - PixelFormat

/// Raw pixel layout of captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra,
    /// 4 bytes per pixel: Blue, Green, Red, unused.
    Bgrx,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        4
    }

    /// GStreamer caps name for this format.
    pub fn caps_name(&self) -> &'static str {
        match self {
            Self::Bgra => "BGRA",
            Self::Bgrx => "BGRx",
        }
    }
}

// MARK: - FrameStatus

/// Per-frame completion status reported by the capture source.
///
/// Only [`Complete`](Self::Complete) frames carry actual screen content;
/// the others mark partial updates or idle/blank delivery ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Complete,
    Partial,
    Idle,
    Blank,
}

impl FrameStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

// MARK: - Frame

/// One captured frame as pushed by the capture source.
///
/// Ownership transfers to whichever pipeline accepts it; `data` is
/// reference-counted so tests can clone frames cheaply.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel payload, `width * height * 4` bytes.
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Monotonic media time of capture.
    pub pts: Duration,
    pub status: FrameStatus,
    pub format: PixelFormat,
}

impl Frame {
    /// Expected payload size for the declared geometry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}
