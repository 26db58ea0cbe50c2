//! clipcast-capture — frame sources for the recording pipelines.
//!
//! A capture source turns a [`CaptureRegion`] plus a [`StreamConfig`] into
//! an ordered stream of [`Frame`]s, delivered through a bounded channel:
//!
//! ```text
//! ximagesrc (region crop)
//!     │
//! videoconvert
//!     │
//! videorate (drop-only, min_frame_interval)
//!     │
//!  appsink  ─────► tokio channel ─────► recording pipeline
//! ```
//!
//! The channel receiver is the delivery lane: the pipeline's ingest task is
//! its single consumer and sees frames one at a time, in capture order.

pub mod scripted;

#[cfg(target_os = "linux")]
pub mod screen;

use anyhow::Result;
use async_trait::async_trait;
use clipcast_core::{CaptureRegion, Frame, StreamConfig};
use tokio::sync::mpsc;

pub use scripted::{ScriptedHandle, ScriptedSource};

#[cfg(target_os = "linux")]
pub use screen::ScreenCapturer;

/// A push-based frame producer with an awaitable start/stop lifecycle.
///
/// # Contract
///
/// * Frames arrive on the returned channel in capture order.
/// * The channel capacity is the configured queue depth; a full queue drops
///   frames at the source rather than stalling capture.
/// * After `stop_capture` returns, the producing side has shut down: the
///   receiver yields whatever was already delivered and then closes. That
///   close is the acknowledgment pipelines rely on before reading state
///   shared with their ingest task.
#[async_trait]
pub trait CaptureSource: Send {
    /// Configure the source and begin producing frames.
    async fn start_capture(
        &mut self,
        region: &CaptureRegion,
        config: &StreamConfig,
    ) -> Result<mpsc::Receiver<Frame>>;

    /// Stop producing frames. No frame is delivered after this returns.
    async fn stop_capture(&mut self) -> Result<()>;
}
