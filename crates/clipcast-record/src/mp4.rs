//! GStreamer H.264/MP4 writer.
//!
//! # Encoder priority (highest to lowest)
//!
//! | Encoder        | Backend   | Notes |
//! |----------------|-----------|-------|
//! | `vaapih264enc` | VA-API HW | Intel / AMD iGPU |
//! | `nvh264enc`    | NVENC HW  | NVIDIA GPU |
//! | `x264enc`      | Software  | CPU fallback, always available |
//!
//! # Pipeline
//!
//! ```text
//! appsrc (raw frames, bounded queue)
//!   → videoconvert
//!   → <best-encoder>
//!   → h264parse
//!   → mp4mux
//!   → filesink
//! ```
//!
//! The pipeline stays in `Null` until [`begin_session`](Mp4Writer) runs, so
//! a session that never accepts a frame leaves nothing on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipcast_core::{CaptureError, Frame, StreamConfig};
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use tracing::{debug, info, warn};

use crate::ingest::SampleSink;

// ── Encoder selection ─────────────────────────────────────────────────────────

/// Return the GStreamer element name of the best available H.264 encoder,
/// plus a property string to insert after the element name.
fn select_encoder() -> (&'static str, &'static str) {
    let candidates: &[(&str, &str)] = &[
        ("vaapih264enc", "rate-control=cbr quality-level=6"),
        ("nvh264enc", "preset=low-latency-hq rc-mode=cbr"),
        ("x264enc", "speed-preset=veryfast key-int-max=60"),
    ];
    for (name, props) in candidates {
        if gstreamer::ElementFactory::find(name).is_some() {
            info!("H.264 encoder selected: {}", name);
            return (name, props);
        }
    }
    // x264enc should always be available if gst-plugins-ugly is installed.
    warn!("No preferred H.264 encoder found; falling back to x264enc");
    ("x264enc", "")
}

// ── Mp4Writer ─────────────────────────────────────────────────────────────────

/// Incremental H.264/MP4 writer with a lazily opened write session.
///
/// Feed frames through the ingest loop; finish with [`SampleSink::finalize`].
pub struct Mp4Writer {
    pipeline: gstreamer::Pipeline,
    appsrc: AppSrc,
    output: PathBuf,
    frame_duration: gstreamer::ClockTime,
    /// Timestamp of the first accepted frame; time zero of the output.
    origin: Option<Duration>,
}

impl Mp4Writer {
    /// Build the encode pipeline bound to `output` and the given pixel
    /// dimensions. No file is created and nothing runs until a write
    /// session opens.
    pub fn create(
        output: &Path,
        width: u32,
        height: u32,
        config: &StreamConfig,
    ) -> Result<Self, CaptureError> {
        gstreamer::init().map_err(|e| CaptureError::save_failed(format!("GStreamer init: {e}")))?;

        let fps = config.frames_per_second();
        let (enc_name, enc_props) = select_encoder();

        let desc = format!(
            "appsrc name=src is-live=true format=time block=false max-buffers={depth} \
                 caps=\"video/x-raw,format={fmt},width={width},height={height},\
                        framerate={fps}/1\" \
             ! videoconvert \
             ! {enc_name} {enc_props} \
             ! h264parse \
             ! mp4mux \
             ! filesink name=out sync=false",
            depth = config.queue_depth.max(1),
            fmt = config.pixel_format.caps_name(),
        );
        debug!("writer pipeline: {}", desc);

        let pipeline = gstreamer::parse::launch(&desc)
            .map_err(|e| CaptureError::save_failed(format!("parsing writer pipeline: {e}")))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| CaptureError::save_failed("expected a Pipeline"))?;

        let appsrc: AppSrc = pipeline
            .by_name("src")
            .ok_or_else(|| CaptureError::save_failed("finding appsrc 'src'"))?
            .downcast::<AppSrc>()
            .map_err(|_| CaptureError::save_failed("expected AppSrc"))?;

        // Set the location as a property so paths with spaces survive.
        let filesink = pipeline
            .by_name("out")
            .ok_or_else(|| CaptureError::save_failed("finding filesink 'out'"))?;
        filesink.set_property("location", output.to_string_lossy().as_ref());

        Ok(Self {
            pipeline,
            appsrc,
            output: output.to_path_buf(),
            frame_duration: gstreamer::ClockTime::from_nseconds(1_000_000_000 / fps.max(1) as u64),
            origin: None,
        })
    }

}

impl SampleSink for Mp4Writer {
    /// Whether the appsrc queue can take another frame without blocking.
    fn is_ready(&self) -> bool {
        let max = self.appsrc.max_buffers();
        max == 0 || self.appsrc.current_level_buffers() < max
    }

    /// Open the write session: the output's time zero is `origin`, and the
    /// pipeline starts running (creating the file).
    fn begin_session(&mut self, origin: Duration) -> Result<(), CaptureError> {
        self.origin = Some(origin);
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CaptureError::save_failed(format!("starting writer pipeline: {e}")))?;
        debug!("write session opened at origin {:?}", origin);
        Ok(())
    }

    /// Submit one raw frame. Its PTS is rebased against the session origin.
    fn push(&mut self, frame: &Frame) -> Result<(), CaptureError> {
        let origin = self
            .origin
            .ok_or_else(|| CaptureError::save_failed("write session not open"))?;
        let pts = frame.pts.checked_sub(origin).unwrap_or_default();

        let mut buf = gstreamer::Buffer::with_size(frame.data.len())
            .map_err(|e| CaptureError::save_failed(format!("allocating buffer: {e}")))?;
        {
            let buf_mut = buf.get_mut().unwrap();
            buf_mut.set_pts(gstreamer::ClockTime::from_nseconds(pts.as_nanos() as u64));
            buf_mut.set_duration(self.frame_duration);
            let mut map = buf_mut
                .map_writable()
                .map_err(|_| CaptureError::save_failed("mapping buffer"))?;
            map.copy_from_slice(&frame.data);
        }

        self.appsrc
            .push_buffer(buf)
            .map_err(|e| CaptureError::save_failed(format!("appsrc push_buffer: {e:?}")))?;
        Ok(())
    }

    /// Signal end-of-stream, wait for the muxer to flush, and close the
    /// file.
    ///
    /// The pipeline's own error is reported when it has one.
    fn finalize(self) -> Result<PathBuf, CaptureError> {
        if self.origin.is_none() {
            // Session never opened: nothing written, no file created.
            return Err(CaptureError::NoFrames);
        }

        let _ = self.appsrc.end_of_stream();

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| CaptureError::save_failed("writer pipeline has no bus"))?;
        let msg = bus.timed_pop_filtered(
            gstreamer::ClockTime::NONE,
            &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
        );
        let result = match msg {
            Some(msg) => match msg.view() {
                gstreamer::MessageView::Error(e) => {
                    Err(CaptureError::save_failed(e.error().to_string()))
                }
                _ => Ok(self.output.clone()),
            },
            None => Err(CaptureError::save_failed("writer finished without a result")),
        };

        let _ = self.pipeline.set_state(gstreamer::State::Null);
        if let Ok(path) = &result {
            info!("video written to {}", path.display());
        }
        result
    }
}

impl Drop for Mp4Writer {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
