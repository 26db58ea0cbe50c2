//! Frame ingest — the callback boundary between the capture source and
//! the encoders.
//!
//! Both loops run on the delivery task, one frame at a time, in arrival
//! order, and never block on encoder readiness: a frame the encoder cannot
//! take right now is dropped, not queued.

use std::path::PathBuf;
use std::time::Duration;

use clipcast_core::{CaptureError, Frame, PixelFormat};
use image::RgbaImage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ── SampleSink ────────────────────────────────────────────────────────────────

/// The encoder-facing side of the video recording pipeline.
///
/// [`VideoRecorder`](crate::VideoRecorder) is generic over this trait, so
/// the session state machine can run against an in-memory sink as well as
/// the real [`Mp4Writer`](crate::Mp4Writer).
pub trait SampleSink: Send + 'static {
    /// Whether the encoder can accept another frame without blocking.
    fn is_ready(&self) -> bool;

    /// Open the write session with its time origin at `origin`.
    fn begin_session(&mut self, origin: Duration) -> Result<(), CaptureError>;

    /// Submit one frame for encoding.
    fn push(&mut self, frame: &Frame) -> Result<(), CaptureError>;

    /// Flush everything accepted so far and close the output, returning its
    /// path. May block; the recorder runs it on a blocking worker.
    fn finalize(self) -> Result<PathBuf, CaptureError>;
}

// ── Video ingest ──────────────────────────────────────────────────────────────

pub(crate) struct VideoIngestReport<S> {
    pub sink: S,
    /// Whether the write session was ever opened (at least one frame accepted).
    pub started: bool,
    pub accepted: u64,
    pub dropped: u64,
}

/// Consume frames until the channel closes, feeding the sink.
///
/// The first complete frame opens the write session at its own timestamp,
/// establishing the output's time origin. Frames the source marked as
/// partial, idle, or blank never reach the sink. If opening the session
/// fails the frame is dropped and the next complete frame retries.
pub(crate) async fn run_video_ingest<S: SampleSink>(
    mut frames: mpsc::Receiver<Frame>,
    mut sink: S,
) -> VideoIngestReport<S> {
    let mut started = false;
    let mut accepted = 0u64;
    let mut dropped = 0u64;

    while let Some(frame) = frames.recv().await {
        if !frame.status.is_complete() {
            continue;
        }
        if frame.data.len() != frame.expected_len() {
            warn!(
                "discarding frame with malformed pixel data ({} bytes for {}×{})",
                frame.data.len(),
                frame.width,
                frame.height
            );
            continue;
        }

        if !started {
            match sink.begin_session(frame.pts) {
                Ok(()) => started = true,
                Err(e) => {
                    warn!("could not open write session: {e}");
                    continue;
                }
            }
        }

        if sink.is_ready() {
            match sink.push(&frame) {
                Ok(()) => accepted += 1,
                Err(e) => warn!("frame submission failed: {e}"),
            }
        } else {
            dropped += 1;
            debug!("encoder not ready, dropping frame at {:?}", frame.pts);
        }
    }

    VideoIngestReport { sink, started, accepted, dropped }
}

// ── GIF ingest ────────────────────────────────────────────────────────────────

/// Accumulate every delivered frame as an RGBA image until the channel
/// closes, then hand the buffer back through the task's join handle.
///
/// Unlike the video path there is no completion-status filter here: every
/// sample whose payload matches its geometry is kept. Memory grows linearly
/// with recording length.
pub(crate) async fn run_gif_ingest(mut frames: mpsc::Receiver<Frame>) -> Vec<RgbaImage> {
    let mut buffer = Vec::new();
    while let Some(frame) = frames.recv().await {
        match frame_to_rgba(&frame) {
            Some(image) => buffer.push(image),
            None => warn!("discarding frame with malformed pixel data"),
        }
    }
    buffer
}

/// Convert a raw BGRA/BGRx frame into an RGBA image.
///
/// Returns `None` when the payload does not match the declared geometry.
pub(crate) fn frame_to_rgba(frame: &Frame) -> Option<RgbaImage> {
    if frame.data.len() != frame.expected_len() {
        return None;
    }
    let mut pixels = frame.data.to_vec();
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
        if frame.format == PixelFormat::Bgrx {
            px[3] = 0xff;
        }
    }
    RgbaImage::from_raw(frame.width, frame.height, pixels)
}
