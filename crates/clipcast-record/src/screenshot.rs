//! Single-still capture: one frame in, one PNG out.
//!
//! Unlike the recording pipelines there is no session state here. The
//! source is started with the cursor hidden, the first complete frame is
//! taken, and the source is stopped again before the PNG is written.

use std::path::PathBuf;

use clipcast_capture::CaptureSource;
use clipcast_core::{CaptureError, CaptureRegion, StreamConfig};
use image::ImageFormat;
use tracing::{debug, info};

use crate::ingest;

/// Capture one still from `source` and write it to `output` as PNG.
///
/// Frames the source marked partial, idle, or blank are skipped; the first
/// complete frame with a well-formed payload wins. Fails with
/// [`CaptureError::NoFrames`] when the stream ends without one.
pub async fn capture(
    mut source: Box<dyn CaptureSource>,
    region: CaptureRegion,
    output: PathBuf,
) -> Result<PathBuf, CaptureError> {
    let config = StreamConfig::for_screenshot();
    let mut frames = source
        .start_capture(&region, &config)
        .await
        .map_err(|e| CaptureError::source(format!("{e:#}")))?;

    let mut still = None;
    while let Some(frame) = frames.recv().await {
        if !frame.status.is_complete() {
            debug!("skipping {:?} frame while waiting for a still", frame.status);
            continue;
        }
        if let Some(image) = ingest::frame_to_rgba(&frame) {
            still = Some(image);
            break;
        }
    }

    source
        .stop_capture()
        .await
        .map_err(|e| CaptureError::source(format!("{e:#}")))?;

    let Some(image) = still else {
        return Err(CaptureError::NoFrames);
    };

    tokio::task::spawn_blocking(move || {
        image
            .save_with_format(&output, ImageFormat::Png)
            .map_err(|e| CaptureError::save_failed(format!("writing {}: {e}", output.display())))?;
        info!("screenshot written to {}", output.display());
        Ok(output)
    })
    .await
    .map_err(|e| CaptureError::save_failed(format!("encode task failed: {e}")))?
}
